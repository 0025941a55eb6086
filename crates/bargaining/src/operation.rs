/// Controller operations, each with its own user-facing wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Accept,
    Reject,
    Counter,
    CreateOffer,
    RequestBargain,
    SendMessage,
}

impl Operation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::Counter => "counter",
            Self::CreateOffer => "create_offer",
            Self::RequestBargain => "request_bargain",
            Self::SendMessage => "send_message",
        }
    }

    /// Blocking yes/no prompt shown before the request, if any.
    #[must_use]
    pub fn confirm_prompt(self) -> Option<&'static str> {
        match self {
            Self::Accept => Some("Are you sure you want to accept this offer?"),
            Self::Reject => Some("Are you sure you want to reject this offer?"),
            _ => None,
        }
    }

    /// Notice shown on success when the server sends no message of its own.
    #[must_use]
    pub fn success_default(self) -> &'static str {
        match self {
            Self::Accept => "Offer accepted successfully!",
            Self::Reject => "Offer rejected successfully!",
            Self::Counter => "Counter offer sent successfully!",
            Self::CreateOffer => "Bargain request sent successfully!",
            Self::RequestBargain => "Bargain request sent!",
            Self::SendMessage => "Message sent!",
        }
    }

    /// Shown for `{success: false}` without a server message.
    #[must_use]
    pub fn failure_default(self) -> &'static str {
        match self {
            Self::Accept => "Failed to accept offer",
            Self::Reject => "Failed to reject offer",
            Self::Counter => "Failed to send counter offer",
            Self::CreateOffer | Self::RequestBargain => "Failed to send bargain request",
            Self::SendMessage => "Failed to send message",
        }
    }

    /// Shown for HTTP statuses without a dedicated message.
    #[must_use]
    pub fn generic_error(self) -> &'static str {
        match self {
            Self::Accept => "An error occurred while accepting the offer",
            Self::Reject => "An error occurred while rejecting the offer",
            Self::Counter => "An error occurred while sending the counter offer",
            Self::CreateOffer | Self::RequestBargain => {
                "An error occurred while sending the bargain request"
            }
            Self::SendMessage => "An error occurred while sending the message",
        }
    }

    #[must_use]
    pub fn invalid_amount_message(self) -> &'static str {
        match self {
            Self::Counter => "Please enter a valid counter offer amount",
            _ => "Please enter a valid offer amount",
        }
    }

    #[must_use]
    pub fn blank_message_message(self) -> &'static str {
        match self {
            Self::Counter => "Please provide a message explaining your counter offer",
            _ => "Message cannot be empty",
        }
    }

    #[must_use]
    pub fn not_found_message(self) -> &'static str {
        match self {
            Self::CreateOffer | Self::RequestBargain => {
                "Product not found. Please refresh the page."
            }
            _ => "Bargain not found. Please refresh the page.",
        }
    }

    #[must_use]
    pub fn access_denied_message(self) -> &'static str {
        match self {
            Self::RequestBargain => "Access denied. Please log in to make bargain requests.",
            _ => "Access denied. Please log in and try again.",
        }
    }
}
