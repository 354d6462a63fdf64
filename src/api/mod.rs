use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::graph_utils::error::VaultError;

pub mod identity;
pub mod service;

/// Called after every successful API mutation, e.g. to autosave.
pub type MutationHook = Arc<dyn Fn() + Send + Sync>;

// Bumped by the server on each successful mutation so the GUI knows to refetch
static MUTATION_EPOCH: AtomicU64 = AtomicU64::new(0);

pub fn bump_mutation_epoch() {
    MUTATION_EPOCH.fetch_add(1, Ordering::Relaxed);
}

pub fn mutation_epoch() -> u64 {
    MUTATION_EPOCH.load(Ordering::Relaxed)
}

pub fn http_status(err: &VaultError) -> u16 {
    match err {
        VaultError::Unauthenticated(_) => 401,
        VaultError::NotFound { .. } => 404,
        VaultError::Validation(_) => 400,
        VaultError::Conflict(_) => 409,
        VaultError::TransientIo(_) => 503,
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

pub fn error_body(err: &VaultError) -> ErrorBody {
    ErrorBody { error: ErrorDetail { code: err.code(), message: err.to_string() } }
}

// Server lifecycle API (feature-gated). Non-API builds get no-op stubs.
#[cfg(feature = "api")]
pub mod server;

#[cfg(not(feature = "api"))]
pub mod server {
    use super::identity::LocalIdentity;
    use super::service::VaultService;
    use super::MutationHook;
    use crate::persistence::settings::AppSettings;

    pub fn start_server(_cfg: &AppSettings, _service: VaultService<LocalIdentity>, _hook: Option<MutationHook>) -> anyhow::Result<()> { Ok(()) }
    pub fn run_blocking(_cfg: &AppSettings, _service: VaultService<LocalIdentity>, _hook: Option<MutationHook>) -> anyhow::Result<()> {
        anyhow::bail!("built without the `api` feature")
    }
    pub fn stop_server() {}
    pub fn is_running() -> bool { false }
}
