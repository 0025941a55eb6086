use std::sync::Arc;

use reqwest::StatusCode;
use reqwest::cookie::CookieStore;
use reqwest::header::{LOCATION, REFERER};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::config::{BargainingConfig, CSRF_COOKIE, CSRF_HEADER, SESSION_COOKIE};
use crate::model::{
    BargainId, BargainStatus, PendingAction, Price, ProductId, deserialize_lenient_price,
};
use crate::surface::NavigationTarget;
use crate::token::{CsrfToken, PageContext};

#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("action path is empty")]
    InvalidPath,
    #[error("csrf token missing")]
    CredentialMissing,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("read error: {0}")]
    Read(String),
    #[error("http error ({status}): {body}")]
    HttpStatus { status: StatusCode, body: String },
    #[error("login required (redirected to {location})")]
    LoginRequired { location: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// The `{success, message?, ...}` body every mutating endpoint returns.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    /// Payment endpoints report failures under `error` instead of `message`.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_price")]
    pub agreed_price: Option<Price>,
    #[serde(default, deserialize_with = "deserialize_lenient_quantity")]
    pub quantity: Option<u32>,
    #[serde(default, deserialize_with = "deserialize_lenient_text")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|text| !text.trim().is_empty())
}

/// Accepts `2` or `"2"`; anything else reads as absent.
fn deserialize_lenient_quantity<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(number)) => number.as_u64().and_then(|raw| u32::try_from(raw).ok()),
        Some(Value::String(text)) => text.trim().parse::<u32>().ok(),
        _ => None,
    })
}

fn deserialize_lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => Some(text),
        _ => None,
    })
}

impl ResponseEnvelope {
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        non_blank(self.message.as_deref()).or_else(|| non_blank(self.error.as_deref()))
    }

    #[must_use]
    pub fn reported_status(&self) -> Option<BargainStatus> {
        self.status.as_deref().and_then(BargainStatus::parse)
    }

    #[must_use]
    pub fn redirect_target(&self) -> Option<NavigationTarget> {
        let url = self
            .redirect_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())?;
        Some(NavigationTarget {
            url: url.to_string(),
            agreed_price: self.agreed_price,
            quantity: self.quantity,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RespondForm {
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counter_offer: Option<Price>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&PendingAction> for RespondForm {
    fn from(action: &PendingAction) -> Self {
        match action {
            PendingAction::Accept | PendingAction::Reject => Self {
                action: action.as_str(),
                counter_offer: None,
                message: None,
            },
            PendingAction::Counter {
                counter_offer,
                message,
            } => Self {
                action: action.as_str(),
                counter_offer: Some(*counter_offer),
                message: Some(message.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateOfferForm {
    pub product_id: ProductId,
    pub offered_price: Price,
    pub message: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BargainRequestForm {
    pub product_id: ProductId,
    pub offered_price: Price,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageForm {
    pub message: String,
}

/// Form-POST transport for the bargaining endpoints.
#[derive(Debug, Clone)]
pub struct ActionClient {
    base_url: String,
    login_path: String,
    origin: reqwest::Url,
    jar: Arc<reqwest::cookie::Jar>,
    http: reqwest::Client,
}

impl ActionClient {
    pub fn new(config: &BargainingConfig) -> Result<Self, ActionError> {
        let origin = reqwest::Url::parse(&config.base_url)
            .map_err(|error| ActionError::InvalidBaseUrl(error.to_string()))?;
        let jar = Arc::new(reqwest::cookie::Jar::default());
        if let Some(session_id) = config.session_id.as_deref() {
            jar.add_cookie_str(&format!("{SESSION_COOKIE}={session_id}; Path=/"), &origin);
        }

        let http = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout)
            .build()
            .map_err(|error| ActionError::Transport(error.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            login_path: config.login_path.clone(),
            origin,
            jar,
            http,
        })
    }

    /// Stores `token` as the `csrftoken` cookie so it accompanies the header
    /// when the token was supplied out of band rather than loaded from a page.
    #[must_use]
    pub fn with_csrf_cookie(self, token: &CsrfToken) -> Self {
        self.jar.add_cookie_str(
            &format!("{CSRF_COOKIE}={}; Path=/", token.as_str()),
            &self.origin,
        );
        self
    }

    /// The `Cookie` header this client sends to its own origin.
    #[must_use]
    pub fn cookie_header(&self) -> Option<String> {
        self.jar
            .cookies(&self.origin)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    #[must_use]
    pub fn create_path() -> &'static str {
        "/bargaining/create/"
    }

    #[must_use]
    pub fn request_path() -> &'static str {
        "/bargaining/request/"
    }

    #[must_use]
    pub fn respond_path(id: BargainId) -> String {
        format!("/bargaining/{id}/respond/")
    }

    #[must_use]
    pub fn message_path(id: BargainId) -> String {
        format!("/bargaining/{id}/message/")
    }

    pub async fn respond(
        &self,
        id: BargainId,
        action: &PendingAction,
        token: Option<&CsrfToken>,
    ) -> Result<ResponseEnvelope, ActionError> {
        let form = RespondForm::from(action);
        self.submit(Self::respond_path(id).as_str(), &form, token)
            .await
    }

    pub async fn create_offer(
        &self,
        form: &CreateOfferForm,
        token: Option<&CsrfToken>,
    ) -> Result<ResponseEnvelope, ActionError> {
        self.submit(Self::create_path(), form, token).await
    }

    pub async fn request_bargain(
        &self,
        form: &BargainRequestForm,
        token: Option<&CsrfToken>,
    ) -> Result<ResponseEnvelope, ActionError> {
        self.submit(Self::request_path(), form, token).await
    }

    pub async fn send_message(
        &self,
        id: BargainId,
        form: &MessageForm,
        token: Option<&CsrfToken>,
    ) -> Result<ResponseEnvelope, ActionError> {
        self.submit(Self::message_path(id).as_str(), form, token)
            .await
    }

    /// Loads a page and collects its CSRF sources: meta tag, hidden input and cookies.
    pub async fn fetch_page_context(&self, path: &str) -> Result<PageContext, ActionError> {
        let url = self.endpoint(path).ok_or(ActionError::InvalidPath)?;
        let response = self
            .http
            .get(url.as_str())
            .header("x-request-id", request_id())
            .send()
            .await
            .map_err(|error| ActionError::Transport(error.to_string()))?;

        let status = response.status();
        self.check_login_redirect(&response)?;
        let cookie_header = response
            .cookies()
            .map(|cookie| format!("{}={}", cookie.name(), cookie.value()))
            .collect::<Vec<_>>()
            .join("; ");
        let bytes = response
            .bytes()
            .await
            .map_err(|error| ActionError::Read(error.to_string()))?;
        if !status.is_success() {
            return Err(format_http_error(status, &bytes));
        }

        let page = PageContext::from_html(&String::from_utf8_lossy(&bytes));
        if cookie_header.is_empty() {
            Ok(page)
        } else {
            Ok(page.with_cookie_header(cookie_header))
        }
    }

    /// Posts `form` with the token header and decodes the response envelope.
    ///
    /// Fails with [`ActionError::CredentialMissing`] before touching the
    /// network when `token` is absent.
    pub async fn submit<F>(
        &self,
        path: &str,
        form: &F,
        token: Option<&CsrfToken>,
    ) -> Result<ResponseEnvelope, ActionError>
    where
        F: Serialize + ?Sized,
    {
        let token = token.ok_or(ActionError::CredentialMissing)?;
        let url = self.endpoint(path).ok_or(ActionError::InvalidPath)?;
        let request_id = request_id();
        tracing::debug!(path, request_id = %request_id, "submitting bargaining action");

        let response = self
            .http
            .post(url.as_str())
            .header(CSRF_HEADER, token.as_str())
            .header(REFERER, format!("{}/", self.base_url))
            .header("x-request-id", request_id.as_str())
            .form(form)
            .send()
            .await
            .map_err(|error| ActionError::Transport(error.to_string()))?;

        self.check_login_redirect(&response)?;
        decode_envelope(response).await
    }

    fn check_login_redirect(&self, response: &reqwest::Response) -> Result<(), ActionError> {
        if !response.status().is_redirection() {
            return Ok(());
        }
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        if is_login_location(location, &self.login_path) {
            return Err(ActionError::LoginRequired {
                location: location.to_string(),
            });
        }
        Ok(())
    }
}

pub fn format_http_error(status: StatusCode, body: &[u8]) -> ActionError {
    let body = String::from_utf8_lossy(body).trim().to_string();
    let body = if body.is_empty() {
        "<empty>".to_string()
    } else {
        body
    };
    ActionError::HttpStatus { status, body }
}

async fn decode_envelope(response: reqwest::Response) -> Result<ResponseEnvelope, ActionError> {
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|error| ActionError::Read(error.to_string()))?;

    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }

    serde_json::from_slice::<ResponseEnvelope>(&bytes)
        .map_err(|error| ActionError::Malformed(error.to_string()))
}

fn is_login_location(location: &str, login_path: &str) -> bool {
    let without_query = location.split(['?', '#']).next().unwrap_or_default();
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |index| &rest[index..]),
        None => without_query,
    };
    !login_path.is_empty() && path.starts_with(login_path)
}

fn request_id() -> String {
    format!("req_{}", Uuid::new_v4().simple())
}
