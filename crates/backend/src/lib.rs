pub mod http;

pub use http::{BackendEndpoint, HttpConnector, HttpDialogBackend};
