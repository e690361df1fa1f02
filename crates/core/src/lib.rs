//! Core of the parley dialog gateway.
//!
//! - `runtime` holds the active credentials/workspace snapshot
//! - `forwarder` turns gateway operations into backend calls
//! - `augment` derives disambiguation text for message responses
//! - `backend` is the capability interface the HTTP client implements

pub mod augment;
pub mod backend;
pub mod config;
pub mod domain;
pub mod errors;
#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;
pub mod forwarder;
pub mod runtime;

pub use augment::{ConfidenceTier, DisambiguationPolicy};
pub use backend::{BackendConnector, Credentials, DialogBackend};
pub use domain::intent::{CreateIntentRequest, IntentExample, IntentRecord, UpdateIntentRequest};
pub use domain::message::{MessageExchange, MessageOutput, MessageRequest, RecognizedIntent};
pub use domain::workspace::{WorkspaceRecord, WorkspaceStatus};
pub use errors::{BackendError, ForwardError, ForwardOperation};
pub use forwarder::{Acknowledgement, ReconfigureRequest, RequestForwarder};
pub use runtime::{RuntimeConfig, RuntimeConfigStore, RuntimeSnapshot};
