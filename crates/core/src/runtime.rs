//! Active credentials and workspace shared by every forwarded request.
//!
//! The store keeps a single `Arc<RuntimeSnapshot>` and replaces it wholesale
//! on every change, so a request that took a snapshot sees one consistent
//! credentials/workspace/backend triple for its whole lifetime.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::backend::{BackendConnector, Credentials, DialogBackend};

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub credentials: Credentials,
    pub active_workspace_id: String,
}

pub struct RuntimeSnapshot {
    pub config: RuntimeConfig,
    pub backend: Arc<dyn DialogBackend>,
}

impl RuntimeSnapshot {
    pub fn workspace_id(&self) -> &str {
        &self.config.active_workspace_id
    }
}

impl fmt::Debug for RuntimeSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeSnapshot").field("config", &self.config).finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct RuntimeConfigStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    defaults: RuntimeConfig,
    connector: Arc<dyn BackendConnector>,
    active: RwLock<Arc<RuntimeSnapshot>>,
}

impl RuntimeConfigStore {
    pub fn new(defaults: RuntimeConfig, connector: Arc<dyn BackendConnector>) -> Self {
        let backend = connector.connect(&defaults.credentials);
        let active = RuntimeSnapshot { config: defaults.clone(), backend };
        let active = RwLock::new(Arc::new(active));
        Self { inner: Arc::new(StoreInner { defaults, connector, active }) }
    }

    pub fn defaults(&self) -> &RuntimeConfig {
        &self.inner.defaults
    }

    pub fn get(&self) -> RuntimeConfig {
        self.snapshot().config.clone()
    }

    pub fn snapshot(&self) -> Arc<RuntimeSnapshot> {
        let guard = self.inner.active.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Replaces the active configuration. Anything not supplied reverts to the
    /// process defaults rather than to the currently active value, and the
    /// backend handle is always rebuilt.
    pub fn set(&self, credentials: Option<Credentials>, workspace_id: Option<String>) {
        let credentials_source = if credentials.is_some() { "request" } else { "default" };
        let workspace_source = if workspace_id.is_some() { "request" } else { "default" };

        let config = RuntimeConfig {
            credentials: credentials.unwrap_or_else(|| self.inner.defaults.credentials.clone()),
            active_workspace_id: workspace_id
                .unwrap_or_else(|| self.inner.defaults.active_workspace_id.clone()),
        };
        let backend = self.inner.connector.connect(&config.credentials);

        info!(
            event_name = "runtime.config.replaced",
            identity = %config.credentials.identity,
            credentials_source,
            workspace_id = %config.active_workspace_id,
            workspace_source,
            "runtime configuration replaced"
        );
        self.swap(RuntimeSnapshot { config, backend });
    }

    /// Points subsequent requests at another workspace, keeping the active
    /// credentials and backend handle.
    pub fn select_workspace(&self, workspace_id: impl Into<String>) {
        let workspace_id = workspace_id.into();
        let current = self.snapshot();
        let config = RuntimeConfig {
            credentials: current.config.credentials.clone(),
            active_workspace_id: workspace_id,
        };

        info!(
            event_name = "runtime.workspace.selected",
            workspace_id = %config.active_workspace_id,
            previous_workspace_id = %current.config.active_workspace_id,
            "active workspace selected"
        );
        self.swap(RuntimeSnapshot { config, backend: Arc::clone(&current.backend) });
    }

    fn swap(&self, next: RuntimeSnapshot) {
        let mut guard = self.inner.active.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Arc::new(next);
    }
}

impl fmt::Debug for RuntimeConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeConfigStore")
            .field("defaults", &self.inner.defaults)
            .field("active", &self.snapshot().config)
            .finish()
    }
}
