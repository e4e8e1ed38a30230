use std::future::Future;

use futures::future::LocalBoxFuture;
use shared::domain::ScopeId;
use tokio::sync::oneshot;

use crate::{error::EnactError, scope::Scope};

/// A deferred unit of work for [`Scope::race`]: it receives the child scope
/// it runs in.
pub type Operation<T> = Box<dyn FnOnce(Scope) -> LocalBoxFuture<'static, anyhow::Result<T>>>;

pub fn op<F, Fut, T>(body: F) -> Operation<T>
where
    F: FnOnce(Scope) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<T>> + 'static,
{
    Box::new(move |scope| Box::pin(body(scope)))
}

/// Handle to a spawned task.
///
/// Dropping the handle does not stop the task; it keeps running until it
/// finishes or its scope is destroyed.
pub struct Task<T> {
    scope: Scope,
    outcome: oneshot::Receiver<Result<T, EnactError>>,
}

impl<T> Task<T> {
    pub(crate) fn new(scope: Scope, outcome: oneshot::Receiver<Result<T, EnactError>>) -> Self {
        Self { scope, outcome }
    }

    pub fn id(&self) -> ScopeId {
        self.scope.id()
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn is_running(&self) -> bool {
        self.scope.is_alive()
    }

    /// Cancels the task and waits until it and all of its descendants have
    /// unwound.
    pub async fn halt(&self) -> Result<(), EnactError> {
        self.scope.destroy().await
    }

    pub async fn join(self) -> Result<T, EnactError> {
        self.outcome.await.unwrap_or(Err(EnactError::Halted))
    }
}

impl<T> std::fmt::Debug for Task<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("scope", &self.scope).finish()
    }
}
