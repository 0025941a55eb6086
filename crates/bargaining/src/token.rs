//! Anti-forgery token lookup.
//!
//! Resolution order is page metadata first (the `csrf-token` meta tag, then the
//! hidden `csrfmiddlewaretoken` form input), then the `csrftoken` cookie.
//! Absence is an expected result: callers must stop and tell the user rather
//! than submit with an empty credential.

use std::fmt;

use crate::config::{CSRF_COOKIE, CSRF_FORM_FIELD, CSRF_META_NAME};

#[derive(Clone, PartialEq, Eq)]
pub struct CsrfToken(String);

impl CsrfToken {
    /// Returns `None` for blank input.
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CsrfToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CsrfToken(<redacted>)")
    }
}

pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<CsrfToken>;
}

/// Token sources scraped from (or supplied for) the current page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    meta_token: Option<String>,
    form_token: Option<String>,
    cookie_header: Option<String>,
}

impl PageContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scrapes the meta tag and hidden form input from an HTML document.
    #[must_use]
    pub fn from_html(html: &str) -> Self {
        Self {
            meta_token: find_tag_attribute(html, "meta", "name", CSRF_META_NAME, "content"),
            form_token: find_tag_attribute(html, "input", "name", CSRF_FORM_FIELD, "value"),
            cookie_header: None,
        }
    }

    #[must_use]
    pub fn with_meta_token(mut self, token: impl Into<String>) -> Self {
        self.meta_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_form_token(mut self, token: impl Into<String>) -> Self {
        self.form_token = Some(token.into());
        self
    }

    /// Sets the raw `Cookie` header (`name=value; other=value`).
    #[must_use]
    pub fn with_cookie_header(mut self, header: impl Into<String>) -> Self {
        self.cookie_header = Some(header.into());
        self
    }

    /// Appends one cookie pair to the cookie header.
    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: &str) -> Self {
        let pair = format!("{name}={value}");
        self.cookie_header = Some(match self.cookie_header.take() {
            Some(existing) if !existing.trim().is_empty() => format!("{existing}; {pair}"),
            _ => pair,
        });
        self
    }

    /// Looks up a cookie by exact name, percent-decoding its value.
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.cookie_header.as_deref()?;
        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| percent_decode(value))
    }
}

impl TokenProvider for PageContext {
    fn token(&self) -> Option<CsrfToken> {
        self.meta_token
            .as_deref()
            .and_then(CsrfToken::new)
            .or_else(|| self.form_token.as_deref().and_then(CsrfToken::new))
            .or_else(|| {
                self.cookie(CSRF_COOKIE)
                    .as_deref()
                    .and_then(CsrfToken::new)
            })
    }
}

/// Finds `<tag ... key="wanted" ... target="value">` and returns `value`.
fn find_tag_attribute(
    html: &str,
    tag: &str,
    key: &str,
    wanted: &str,
    target: &str,
) -> Option<String> {
    // ASCII lowercasing keeps byte offsets aligned with `html`.
    let lowered = html.to_ascii_lowercase();
    let opener = format!("<{tag}");
    let mut cursor = 0usize;

    while let Some(found) = lowered[cursor..].find(opener.as_str()) {
        let start = cursor + found + opener.len();
        let end = lowered[start..]
            .find('>')
            .map_or(html.len(), |offset| start + offset);
        cursor = end;

        let next = html[start..].chars().next();
        if !next.is_some_and(|ch| ch.is_ascii_whitespace() || ch == '/' || ch == '>') {
            continue;
        }

        let attributes = parse_attributes(&html[start..end]);
        let matches = attributes
            .iter()
            .any(|(name, value)| name == key && value == wanted);
        if !matches {
            continue;
        }
        if let Some((_, value)) = attributes.into_iter().find(|(name, _)| name == target) {
            return Some(value);
        }
    }
    None
}

fn parse_attributes(body: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut rest = body.trim_start();

    while !rest.is_empty() {
        let name_end = rest
            .find(|ch: char| ch == '=' || ch.is_ascii_whitespace() || ch == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_end].to_ascii_lowercase();
        rest = rest[name_end..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let quote = after_eq.chars().next().filter(|ch| *ch == '"' || *ch == '\'');
            if let Some(quote) = quote {
                let inner = &after_eq[1..];
                let close = inner.find(quote).unwrap_or(inner.len());
                rest = inner.get(close + 1..).unwrap_or("");
                inner[..close].to_string()
            } else {
                let value_end = after_eq
                    .find(|ch: char| ch.is_ascii_whitespace())
                    .unwrap_or(after_eq.len());
                rest = &after_eq[value_end..];
                after_eq[..value_end].trim_end_matches('/').to_string()
            }
        } else {
            if name.is_empty() {
                // Stray '/' or similar; skip one character.
                rest = rest.get(1..).unwrap_or("");
            }
            String::new()
        };

        if !name.is_empty() {
            attributes.push((name, value));
        }
        rest = rest.trim_start();
    }
    attributes
}

fn percent_decode(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned(),
    }
}
