use reqwest::StatusCode;

use crate::model::PriceError;
use crate::operation::Operation;
use crate::rails::http::ActionError;
use crate::surface::Severity;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection and try again.";
pub const MALFORMED_RESPONSE_MESSAGE: &str = "Unexpected response from server. Please try again.";
pub const MISSING_TOKEN_MESSAGE: &str = "CSRF token not found. Please refresh the page.";
pub const NO_BARGAIN_SELECTED_MESSAGE: &str = "No bargain selected";
pub const ALREADY_IN_FLIGHT_MESSAGE: &str = "This request is already being processed. Please wait.";
pub const SERVER_ERROR_MESSAGE: &str = "Server error occurred. Please try again later.";
pub const ZERO_QUANTITY_MESSAGE: &str = "Quantity must be at least 1";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid amount: {0}")]
    Amount(#[from] PriceError),
    #[error("message must not be blank")]
    BlankMessage,
    #[error("quantity must be at least 1")]
    ZeroQuantity,
}

/// Coarse classification of a non-success HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpFailure {
    AccessDenied,
    NotFound,
    ServerError,
    Other,
}

impl HttpFailure {
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => Self::AccessDenied,
            404 => Self::NotFound,
            500 => Self::ServerError,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NegotiationError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("csrf token missing")]
    CredentialMissing,
    #[error("no bargain selected")]
    NoBargainSelected,
    #[error("control already in flight")]
    AlreadyInFlight,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("http status {status}")]
    HttpStatus {
        status: StatusCode,
        failure: HttpFailure,
    },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error("rejected by server")]
    BusinessRejection { message: Option<String> },
}

impl From<ActionError> for NegotiationError {
    fn from(error: ActionError) -> Self {
        match error {
            ActionError::CredentialMissing => Self::CredentialMissing,
            ActionError::InvalidBaseUrl(detail) => Self::Transport(detail),
            ActionError::InvalidPath => Self::Transport("action path is empty".to_string()),
            ActionError::Transport(detail) | ActionError::Read(detail) => Self::Transport(detail),
            ActionError::LoginRequired { .. } => Self::HttpStatus {
                status: StatusCode::FOUND,
                failure: HttpFailure::AccessDenied,
            },
            ActionError::HttpStatus { status, .. } => Self::HttpStatus {
                status,
                failure: HttpFailure::from_status(status),
            },
            ActionError::Malformed(detail) => Self::MalformedResponse(detail),
        }
    }
}

impl NegotiationError {
    /// The single notice shown for this failure of `operation`.
    #[must_use]
    pub fn user_message(&self, operation: Operation) -> String {
        match self {
            Self::Validation(ValidationError::Amount(_)) => {
                operation.invalid_amount_message().to_string()
            }
            Self::Validation(ValidationError::BlankMessage) => {
                operation.blank_message_message().to_string()
            }
            Self::Validation(ValidationError::ZeroQuantity) => ZERO_QUANTITY_MESSAGE.to_string(),
            Self::CredentialMissing => MISSING_TOKEN_MESSAGE.to_string(),
            Self::NoBargainSelected => NO_BARGAIN_SELECTED_MESSAGE.to_string(),
            Self::AlreadyInFlight => ALREADY_IN_FLIGHT_MESSAGE.to_string(),
            Self::Transport(_) => NETWORK_ERROR_MESSAGE.to_string(),
            Self::HttpStatus { failure, .. } => match failure {
                HttpFailure::AccessDenied => operation.access_denied_message().to_string(),
                HttpFailure::NotFound => operation.not_found_message().to_string(),
                HttpFailure::ServerError => SERVER_ERROR_MESSAGE.to_string(),
                HttpFailure::Other => operation.generic_error().to_string(),
            },
            Self::MalformedResponse(_) => MALFORMED_RESPONSE_MESSAGE.to_string(),
            Self::BusinessRejection { message } => message
                .as_deref()
                .filter(|message| !message.trim().is_empty())
                .unwrap_or(operation.failure_default())
                .to_string(),
        }
    }

    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Validation(_) | Self::NoBargainSelected | Self::AlreadyInFlight => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            Self::HttpStatus {
                failure: HttpFailure::AccessDenied,
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification_matches_notice_table() {
        assert_eq!(
            HttpFailure::from_status(StatusCode::UNAUTHORIZED),
            HttpFailure::AccessDenied
        );
        assert_eq!(
            HttpFailure::from_status(StatusCode::FORBIDDEN),
            HttpFailure::AccessDenied
        );
        assert_eq!(
            HttpFailure::from_status(StatusCode::NOT_FOUND),
            HttpFailure::NotFound
        );
        assert_eq!(
            HttpFailure::from_status(StatusCode::INTERNAL_SERVER_ERROR),
            HttpFailure::ServerError
        );
        assert_eq!(
            HttpFailure::from_status(StatusCode::BAD_GATEWAY),
            HttpFailure::Other
        );
    }

    #[test]
    fn business_rejection_prefers_server_text() {
        let error = NegotiationError::BusinessRejection {
            message: Some("Offer expired".to_string()),
        };
        assert_eq!(error.user_message(Operation::Accept), "Offer expired");

        let padded = NegotiationError::BusinessRejection {
            message: Some("  Offer expired  ".to_string()),
        };
        assert_eq!(padded.user_message(Operation::Accept), "  Offer expired  ");

        let blank = NegotiationError::BusinessRejection {
            message: Some(" ".to_string()),
        };
        assert_eq!(blank.user_message(Operation::Accept), "Failed to accept offer");

        let silent = NegotiationError::BusinessRejection { message: None };
        assert_eq!(
            silent.user_message(Operation::Reject),
            "Failed to reject offer"
        );
    }

    #[test]
    fn login_redirect_counts_as_access_denied() {
        let error = NegotiationError::from(ActionError::LoginRequired {
            location: "/accounts/login/".to_string(),
        });
        assert!(error.is_access_denied());
        assert_eq!(
            error.user_message(Operation::RequestBargain),
            "Access denied. Please log in to make bargain requests."
        );
    }

    #[test]
    fn local_failures_are_warnings() {
        assert_eq!(
            NegotiationError::Validation(ValidationError::BlankMessage).severity(),
            Severity::Warning
        );
        assert_eq!(
            NegotiationError::Transport("reset".to_string()).severity(),
            Severity::Error
        );
        assert_eq!(
            NegotiationError::Validation(ValidationError::Amount(PriceError::NonPositive))
                .user_message(Operation::Counter),
            "Please enter a valid counter offer amount"
        );
    }
}
