use std::sync::Arc;
use std::time::Duration;

use crate::config::{BargainingConfig, NavigationTiming};
use crate::editor::CounterOfferEditor;
use crate::error::{NegotiationError, ValidationError};
use crate::inflight::{ControlKey, InFlightControls, InFlightGuard};
use crate::model::{
    BargainId, BargainRequest, BargainStatus, PendingAction, Price, ProductId,
};
use crate::operation::Operation;
use crate::rails::http::{
    ActionClient, ActionError, BargainRequestForm, CreateOfferForm, MessageForm,
    ResponseEnvelope,
};
use crate::surface::{DialogSurface, NavigationTarget, Navigator, Severity};
use crate::token::{CsrfToken, TokenProvider};

/// Page change scheduled after a successful action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FollowUp {
    Redirect {
        target: NavigationTarget,
        delay: Duration,
    },
    Reload {
        delay: Duration,
    },
    Stay,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Status the bargain is in after the action, when known.
    pub status: Option<BargainStatus>,
    pub message: String,
    pub follow_up: FollowUp,
    pub counter_offer: Option<Price>,
}

impl Completion {
    /// Mirrors the completed action onto a locally held bargain.
    pub fn apply_to(&self, request: &mut BargainRequest) {
        if let Some(status) = self.status {
            request.adopt(status, self.counter_offer);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegotiationOutcome {
    /// The user answered "no" to the confirm prompt. Nothing was sent.
    Declined,
    Completed(Completion),
    /// Already reported to the user; carried for callers that want the cause.
    Failed(NegotiationError),
}

impl NegotiationOutcome {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    #[must_use]
    pub fn completion(&self) -> Option<&Completion> {
        match self {
            Self::Completed(completion) => Some(completion),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&NegotiationError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Drives the buyer/seller negotiation actions.
///
/// Every operation recovers at this boundary: failures are shown to the user
/// exactly once and returned as [`NegotiationOutcome::Failed`].
pub struct NegotiationController {
    client: ActionClient,
    tokens: Arc<dyn TokenProvider>,
    dialogs: Arc<dyn DialogSurface>,
    navigator: Arc<dyn Navigator>,
    controls: InFlightControls,
    timing: NavigationTiming,
    login_path: String,
}

impl NegotiationController {
    pub fn new(
        config: &BargainingConfig,
        tokens: Arc<dyn TokenProvider>,
        dialogs: Arc<dyn DialogSurface>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ActionError> {
        let client = ActionClient::new(config)?;
        Ok(Self::with_client(client, config, tokens, dialogs, navigator))
    }

    /// Reuses `client`, and with it any cookies it already holds (for
    /// example from [`ActionClient::fetch_page_context`]).
    #[must_use]
    pub fn with_client(
        client: ActionClient,
        config: &BargainingConfig,
        tokens: Arc<dyn TokenProvider>,
        dialogs: Arc<dyn DialogSurface>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            client,
            tokens,
            dialogs,
            navigator,
            controls: InFlightControls::new(),
            timing: config.timing,
            login_path: config.login_path.clone(),
        }
    }

    #[must_use]
    pub fn client(&self) -> &ActionClient {
        &self.client
    }

    #[must_use]
    pub fn controls(&self) -> &InFlightControls {
        &self.controls
    }

    pub async fn request_accept(&self, id: BargainId) -> NegotiationOutcome {
        self.respond(Operation::Accept, id, PendingAction::Accept)
            .await
    }

    pub async fn request_reject(&self, id: BargainId) -> NegotiationOutcome {
        self.respond(Operation::Reject, id, PendingAction::Reject)
            .await
    }

    pub async fn request_counter(
        &self,
        id: BargainId,
        amount: &str,
        message: &str,
    ) -> NegotiationOutcome {
        let counter_offer = match amount.parse::<Price>() {
            Ok(price) => price,
            Err(error) => return self.fail(Operation::Counter, ValidationError::from(error).into()),
        };
        if message.trim().is_empty() {
            return self.fail(Operation::Counter, ValidationError::BlankMessage.into());
        }

        let action = PendingAction::Counter {
            counter_offer,
            message: message.to_string(),
        };
        self.respond(Operation::Counter, id, action).await
    }

    /// Counter for whichever bargain the editor is open on. The editor is
    /// closed on success and handed back unchanged otherwise.
    pub async fn submit_counter_offer(
        &self,
        editor: CounterOfferEditor,
        amount: &str,
        message: &str,
    ) -> (CounterOfferEditor, NegotiationOutcome) {
        let Some(id) = editor.current_bargain_id() else {
            let outcome = self.fail(Operation::Counter, NegotiationError::NoBargainSelected);
            return (editor, outcome);
        };

        let editor = editor.with_inputs(amount, message);
        let outcome = self.request_counter(id, amount, message).await;
        if outcome.is_completed() {
            (editor.close(), outcome)
        } else {
            (editor, outcome)
        }
    }

    #[must_use]
    pub fn open_counter_offer_editor(
        &self,
        editor: CounterOfferEditor,
        id: BargainId,
        original_offer: Option<Price>,
    ) -> CounterOfferEditor {
        tracing::debug!(bargain_id = %id, "opening counter offer editor");
        editor.open(id, original_offer)
    }

    #[must_use]
    pub fn close_counter_offer_editor(&self, editor: CounterOfferEditor) -> CounterOfferEditor {
        editor.close()
    }

    pub async fn create_initial_offer(
        &self,
        product_id: ProductId,
        amount: &str,
        message: &str,
        quantity: u32,
    ) -> NegotiationOutcome {
        let operation = Operation::CreateOffer;
        let offered_price = match amount.parse::<Price>() {
            Ok(price) => price,
            Err(error) => return self.fail(operation, ValidationError::from(error).into()),
        };
        if quantity == 0 {
            return self.fail(operation, ValidationError::ZeroQuantity.into());
        }

        let form = CreateOfferForm {
            product_id,
            offered_price,
            message: message.to_string(),
            quantity,
        };
        let result = match self.begin(ControlKey::Product(product_id)) {
            Ok((_guard, token)) => checked(self.client.create_offer(&form, Some(&token)).await),
            Err(error) => Err(error),
        };
        match result {
            Ok(envelope) => self.complete(
                operation,
                &envelope,
                Some(envelope.reported_status().unwrap_or(BargainStatus::Pending)),
                None,
                FollowUp::Stay,
            ),
            Err(error) => self.fail(operation, error),
        }
    }

    /// Product-page bargain request. Access denied also sends the user to the
    /// login page.
    pub async fn submit_bargain_request(
        &self,
        product_id: ProductId,
        amount: &str,
        message: &str,
    ) -> NegotiationOutcome {
        let operation = Operation::RequestBargain;
        let offered_price = match amount.parse::<Price>() {
            Ok(price) => price,
            Err(error) => return self.fail(operation, ValidationError::from(error).into()),
        };

        let form = BargainRequestForm {
            product_id,
            offered_price,
            message: message.to_string(),
        };
        let result = match self.begin(ControlKey::Product(product_id)) {
            Ok((_guard, token)) => checked(self.client.request_bargain(&form, Some(&token)).await),
            Err(error) => Err(error),
        };
        match result {
            Ok(envelope) => self.complete(
                operation,
                &envelope,
                Some(envelope.reported_status().unwrap_or(BargainStatus::Pending)),
                None,
                FollowUp::Stay,
            ),
            Err(error) => self.fail(operation, error),
        }
    }

    pub async fn send_message(&self, id: BargainId, message: &str) -> NegotiationOutcome {
        let operation = Operation::SendMessage;
        if message.trim().is_empty() {
            return self.fail(operation, ValidationError::BlankMessage.into());
        }

        let form = MessageForm {
            message: message.trim().to_string(),
        };
        let result = match self.begin(ControlKey::Bargain(id)) {
            Ok((_guard, token)) => checked(self.client.send_message(id, &form, Some(&token)).await),
            Err(error) => Err(error),
        };
        match result {
            Ok(envelope) => {
                let follow_up = FollowUp::Reload {
                    delay: self.timing.reload_delay,
                };
                self.complete(
                    operation,
                    &envelope,
                    envelope.reported_status(),
                    None,
                    follow_up,
                )
            }
            Err(error) => self.fail(operation, error),
        }
    }

    async fn respond(
        &self,
        operation: Operation,
        id: BargainId,
        action: PendingAction,
    ) -> NegotiationOutcome {
        if let Some(prompt) = operation.confirm_prompt() {
            if !self.dialogs.confirm(prompt).await {
                tracing::debug!(bargain_id = %id, action = action.as_str(), "action declined");
                return NegotiationOutcome::Declined;
            }
        }

        let result = match self.begin(ControlKey::Bargain(id)) {
            Ok((_guard, token)) => checked(self.client.respond(id, &action, Some(&token)).await),
            Err(error) => Err(error),
        };
        match result {
            Ok(envelope) => {
                let follow_up = match (&action, envelope.redirect_target()) {
                    (PendingAction::Accept, Some(target)) => FollowUp::Redirect {
                        target,
                        delay: self.timing.redirect_delay,
                    },
                    _ => FollowUp::Reload {
                        delay: self.timing.reload_delay,
                    },
                };
                let counter_offer = match &action {
                    PendingAction::Counter { counter_offer, .. } => Some(*counter_offer),
                    PendingAction::Accept | PendingAction::Reject => None,
                };
                let status = envelope
                    .reported_status()
                    .unwrap_or_else(|| action.implied_status());
                self.complete(operation, &envelope, Some(status), counter_offer, follow_up)
            }
            Err(error) => self.fail(operation, error),
        }
    }

    /// Disables the control for `key` and resolves the token. The guard must
    /// be held until the response has been handled.
    fn begin(&self, key: ControlKey) -> Result<(InFlightGuard, CsrfToken), NegotiationError> {
        let guard = self
            .controls
            .try_begin(key)
            .ok_or(NegotiationError::AlreadyInFlight)?;
        let token = self
            .tokens
            .token()
            .ok_or(NegotiationError::CredentialMissing)?;
        Ok((guard, token))
    }

    fn complete(
        &self,
        operation: Operation,
        envelope: &ResponseEnvelope,
        status: Option<BargainStatus>,
        counter_offer: Option<Price>,
        follow_up: FollowUp,
    ) -> NegotiationOutcome {
        let message = envelope
            .server_message()
            .unwrap_or(operation.success_default())
            .to_string();
        self.dialogs.notify(&message, Severity::Success);

        match &follow_up {
            FollowUp::Redirect { target, delay } => {
                tracing::info!(
                    operation = operation.as_str(),
                    redirect = %target.url,
                    "bargaining action completed"
                );
                self.navigator.schedule_redirect(target, *delay);
            }
            FollowUp::Reload { delay } => {
                tracing::info!(operation = operation.as_str(), "bargaining action completed");
                self.navigator.schedule_reload(*delay);
            }
            FollowUp::Stay => {
                tracing::info!(operation = operation.as_str(), "bargaining action completed");
            }
        }

        NegotiationOutcome::Completed(Completion {
            status,
            message,
            follow_up,
            counter_offer,
        })
    }

    fn fail(&self, operation: Operation, error: NegotiationError) -> NegotiationOutcome {
        tracing::warn!(
            operation = operation.as_str(),
            error = %error,
            "bargaining action failed"
        );
        self.dialogs
            .notify(&error.user_message(operation), error.severity());

        if operation == Operation::RequestBargain && error.is_access_denied() {
            let login = NavigationTarget::new(self.login_path.clone());
            self.navigator
                .schedule_redirect(&login, self.timing.login_redirect_delay);
        }
        NegotiationOutcome::Failed(error)
    }
}

/// Turns a `{success: false}` envelope into a business rejection.
fn checked(
    result: Result<ResponseEnvelope, ActionError>,
) -> Result<ResponseEnvelope, NegotiationError> {
    let envelope = result?;
    if !envelope.success {
        return Err(NegotiationError::BusinessRejection {
            message: envelope.server_message().map(str::to_string),
        });
    }
    Ok(envelope)
}
