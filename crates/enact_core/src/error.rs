use std::sync::Arc;

use shared::domain::ScopeId;
use thiserror::Error;

/// Errors surfaced by scopes, tasks and the mount bridge.
///
/// `Halted` is ordinary control flow: it is what a task reports after being
/// cancelled and is never a failure. Everything else is.
#[derive(Debug, Clone, Error)]
pub enum EnactError {
    #[error("operation halted")]
    Halted,
    #[error("{0:#}")]
    Failed(Arc<anyhow::Error>),
    #[error("scope {0} is no longer alive")]
    ScopeClosed(ScopeId),
    #[error("no `{0}` available in scope")]
    MissingContext(&'static str),
    #[error("teardown of scope {scope} failed: {cause:#}")]
    Teardown {
        scope: ScopeId,
        cause: Arc<anyhow::Error>,
    },
    #[error("race requires at least one operation")]
    EmptyRace,
    #[error("timer period must be greater than zero")]
    ZeroPeriod,
}

impl EnactError {
    /// Wraps a body/producer error. An `EnactError` that travelled through
    /// `anyhow` is unwrapped so a halted join stays a halt.
    pub fn failed(err: anyhow::Error) -> Self {
        match err.downcast::<EnactError>() {
            Ok(inner) => inner,
            Err(err) => Self::Failed(Arc::new(err)),
        }
    }

    pub(crate) fn teardown(scope: ScopeId, cause: anyhow::Error) -> Self {
        Self::Teardown {
            scope,
            cause: Arc::new(cause),
        }
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, Self::Halted)
    }
}
