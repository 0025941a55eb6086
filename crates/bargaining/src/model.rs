use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub const CURRENCY_CODE: &str = "BDT";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("id must be a positive integer")]
    Invalid,
}

/// Server-assigned bargain identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct BargainId(u64);

impl BargainId {
    #[must_use]
    pub fn new(raw: u64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Recovers the id from a detail-page path such as `/bargaining/42/`.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let mut segments = path.split('/').filter(|segment| !segment.is_empty());
        while let Some(segment) = segments.next() {
            if segment == "bargaining" {
                return segments.next()?.parse::<u64>().ok().and_then(Self::new);
            }
        }
        None
    }
}

impl TryFrom<u64> for BargainId {
    type Error = IdError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(IdError::Invalid)
    }
}

impl From<BargainId> for u64 {
    fn from(id: BargainId) -> Self {
        id.0
    }
}

impl FromStr for BargainId {
    type Err = IdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or(IdError::Invalid)
    }
}

impl fmt::Display for BargainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ProductId(u64);

impl ProductId {
    #[must_use]
    pub fn new(raw: u64) -> Option<Self> {
        (raw > 0).then_some(Self(raw))
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl TryFrom<u64> for ProductId {
    type Error = IdError;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(IdError::Invalid)
    }
}

impl From<ProductId> for u64 {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl FromStr for ProductId {
    type Err = IdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<u64>()
            .ok()
            .and_then(Self::new)
            .ok_or(IdError::Invalid)
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PriceError {
    #[error("amount must not be empty")]
    Empty,
    #[error("amount must be a number with at most two decimals")]
    Invalid,
    #[error("amount must be greater than zero")]
    NonPositive,
}

/// Positive monetary amount held in minor units (paisa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Price {
    minor_units: u64,
}

impl Price {
    pub fn from_minor_units(minor_units: u64) -> Result<Self, PriceError> {
        if minor_units == 0 {
            return Err(PriceError::NonPositive);
        }
        Ok(Self { minor_units })
    }

    #[must_use]
    pub fn minor_units(self) -> u64 {
        self.minor_units
    }

    /// Display form used in notices, e.g. `"500.00 BDT"`.
    #[must_use]
    pub fn formatted(self) -> String {
        format!(
            "{}.{:02} {CURRENCY_CODE}",
            self.minor_units / 100,
            self.minor_units % 100
        )
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }

        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(PriceError::Invalid);
        }
        if fraction.len() > 2
            || !whole.bytes().all(|byte| byte.is_ascii_digit())
            || !fraction.bytes().all(|byte| byte.is_ascii_digit())
        {
            return Err(PriceError::Invalid);
        }

        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<u64>().map_err(|_| PriceError::Invalid)?
        };
        let fraction_units = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<u64>().map_err(|_| PriceError::Invalid)? * 10,
            _ => fraction.parse::<u64>().map_err(|_| PriceError::Invalid)?,
        };
        let minor_units = whole_units
            .checked_mul(100)
            .and_then(|units| units.checked_add(fraction_units))
            .ok_or(PriceError::Invalid)?;

        if negative || minor_units == 0 {
            return Err(PriceError::NonPositive);
        }
        Ok(Self { minor_units })
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.minor_units / 100;
        let fraction = self.minor_units % 100;
        if fraction == 0 {
            write!(f, "{whole}")
        } else {
            write!(f, "{whole}.{fraction:02}")
        }
    }
}

impl Serialize for Price {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPrice {
    Text(String),
    Number(serde_json::Number),
}

impl RawPrice {
    fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawPrice::deserialize(deserializer)?.into_text();
        raw.parse::<Price>().map_err(serde::de::Error::custom)
    }
}

/// Lenient decoder for server-echoed prices: unparseable values become `None`.
pub(crate) fn deserialize_lenient_price<'de, D>(deserializer: D) -> Result<Option<Price>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawPrice>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.into_text().parse::<Price>().ok()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BargainStatus {
    Pending,
    Countered,
    Accepted,
    Rejected,
    Expired,
    Completed,
}

impl BargainStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Countered => "countered",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Completed => "completed",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "countered" | "counter_pending" | "counter-pending" => Some(Self::Countered),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            "expired" => Some(Self::Expired),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Whether the server still accepts responses for this bargain.
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, Self::Pending | Self::Countered)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for BargainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Intent posted to the respond endpoint for a single submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Accept,
    Reject,
    Counter {
        counter_offer: Price,
        message: String,
    },
}

impl PendingAction {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Counter { .. } => "counter",
        }
    }

    /// Status the server moves the bargain into when this action succeeds.
    #[must_use]
    pub fn implied_status(&self) -> BargainStatus {
        match self {
            Self::Accept => BargainStatus::Accepted,
            Self::Reject => BargainStatus::Rejected,
            Self::Counter { .. } => BargainStatus::Countered,
        }
    }
}

/// Client-side mirror of a bargain, refreshed from the server after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BargainRequest {
    pub id: BargainId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub original_offer: Price,
    pub status: BargainStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counter_offer: Option<Price>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl BargainRequest {
    /// The offer currently on the table.
    #[must_use]
    pub fn current_offer(&self) -> Price {
        self.counter_offer.unwrap_or(self.original_offer)
    }

    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == BargainStatus::Expired
            || self.expires_at.is_some_and(|expires_at| now > expires_at)
    }

    /// Percentage below `list_price`, rounded to two decimals. Negative when the
    /// offer exceeds the list price.
    #[must_use]
    pub fn discount_percentage(&self, list_price: Price) -> f64 {
        let list = list_price.minor_units() as f64;
        let offer = self.current_offer().minor_units() as f64;
        (((list - offer) / list) * 100.0 * 100.0).round() / 100.0
    }

    /// Adopts the state a successful mutation implies. Terminal bargains are left as is.
    pub fn adopt(&mut self, status: BargainStatus, counter_offer: Option<Price>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = status;
        if status == BargainStatus::Countered {
            self.counter_offer = counter_offer.or(self.counter_offer);
        }
    }
}
