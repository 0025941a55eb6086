use crate::model::{BargainId, Price};

/// Open counter-offer form for one bargain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSession {
    pub bargain_id: BargainId,
    pub original_offer: Option<Price>,
    pub price_input: String,
    pub message_input: String,
}

/// Counter-offer editor state, owned by whoever manages the input surface.
///
/// Transitions consume the value and return the next one, so there is no
/// shared "currently open bargain" to forget to clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CounterOfferEditor {
    #[default]
    Closed,
    Open(EditorSession),
}

impl CounterOfferEditor {
    /// Opens (or re-targets) the editor. Inputs typed so far are kept.
    #[must_use]
    pub fn open(self, bargain_id: BargainId, original_offer: Option<Price>) -> Self {
        let (price_input, message_input) = match self {
            Self::Open(session) => (session.price_input, session.message_input),
            Self::Closed => (String::new(), String::new()),
        };
        Self::Open(EditorSession {
            bargain_id,
            original_offer,
            price_input,
            message_input,
        })
    }

    /// Closes the editor; all fields are cleared.
    #[must_use]
    pub fn close(self) -> Self {
        Self::Closed
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    #[must_use]
    pub fn session(&self) -> Option<&EditorSession> {
        match self {
            Self::Open(session) => Some(session),
            Self::Closed => None,
        }
    }

    #[must_use]
    pub fn current_bargain_id(&self) -> Option<BargainId> {
        self.session().map(|session| session.bargain_id)
    }

    /// Records typed input. Ignored while closed.
    #[must_use]
    pub fn with_inputs(self, price: impl Into<String>, message: impl Into<String>) -> Self {
        match self {
            Self::Open(mut session) => {
                session.price_input = price.into();
                session.message_input = message.into();
                Self::Open(session)
            }
            Self::Closed => Self::Closed,
        }
    }
}
