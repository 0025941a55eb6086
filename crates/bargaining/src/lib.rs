pub mod config;
pub mod controller;
pub mod editor;
pub mod error;
pub mod inflight;
pub mod model;
pub mod operation;
pub mod rails;
pub mod surface;
pub mod token;

pub use config::{BargainingConfig, ConfigError, NavigationTiming};
pub use controller::{Completion, FollowUp, NegotiationController, NegotiationOutcome};
pub use editor::{CounterOfferEditor, EditorSession};
pub use error::{HttpFailure, NegotiationError, ValidationError};
pub use inflight::{ControlKey, InFlightControls, InFlightGuard};
pub use model::{
    BargainId, BargainRequest, BargainStatus, PendingAction, Price, PriceError, ProductId,
};
pub use operation::Operation;
pub use rails::http::{ActionClient, ActionError, ResponseEnvelope};
pub use surface::{
    DialogSurface, NavigationTarget, Navigator, RecordingSurface, Severity, SurfaceEvent,
};
pub use token::{CsrfToken, PageContext, TokenProvider};
