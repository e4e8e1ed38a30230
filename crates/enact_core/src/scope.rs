//! Cancellation scopes kept in an arena of parent-indexed nodes.
//!
//! A [`Scope`] is a cheap handle (`ScopeId` + shared arena). Nodes only know
//! their parent's id, so the tree has no ownership cycles; teardown walks the
//! child ids depth-first and a node is removed from the arena once it is
//! fully closed.
//!
//! A scope is either *driven* (it belongs to a spawned task, whose driver
//! future runs the teardown after the body stops) or free-standing (created
//! with [`Scope::create_scope`], torn down directly by [`Scope::destroy`]).

use std::{
    any::{type_name, Any, TypeId},
    cell::RefCell,
    collections::HashMap,
    future::Future,
    rc::Rc,
};

use futures::future::{select_all, LocalBoxFuture};
use shared::domain::{ScopeId, ScopeState};
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, warn};

use crate::{
    error::EnactError,
    task::{Operation, Task},
};

type Finalizer = Box<dyn FnOnce() -> LocalBoxFuture<'static, anyhow::Result<()>>>;
type Closed = Option<Result<(), EnactError>>;

struct ScopeNode {
    label: &'static str,
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    state: ScopeState,
    driven: bool,
    teardown_started: bool,
    cancel: watch::Sender<bool>,
    closed: watch::Sender<Closed>,
    failure: Option<EnactError>,
    finalizers: Vec<Finalizer>,
    contexts: HashMap<TypeId, Rc<dyn Any>>,
}

#[derive(Default)]
struct ScopeArena {
    next_id: u64,
    nodes: HashMap<ScopeId, ScopeNode>,
}

impl ScopeArena {
    fn insert(&mut self, label: &'static str, parent: Option<ScopeId>, driven: bool) -> ScopeId {
        let id = ScopeId(self.next_id);
        self.next_id += 1;
        let (cancel, _) = watch::channel(false);
        let (closed, _) = watch::channel(None);
        self.nodes.insert(
            id,
            ScopeNode {
                label,
                parent,
                children: Vec::new(),
                state: ScopeState::Alive,
                driven,
                teardown_started: false,
                cancel,
                closed,
                failure: None,
                finalizers: Vec::new(),
                contexts: HashMap::new(),
            },
        );
        if let Some(parent) = parent.and_then(|parent| self.nodes.get_mut(&parent)) {
            parent.children.push(id);
        }
        id
    }

    fn detach(&mut self, parent: ScopeId, child: ScopeId) {
        if let Some(node) = self.nodes.get_mut(&parent) {
            node.children.retain(|id| *id != child);
        }
    }

    fn remove(&mut self, id: ScopeId) {
        if let Some(node) = self.nodes.remove(&id) {
            if let Some(parent) = node.parent {
                self.detach(parent, id);
            }
        }
    }
}

/// Handle to a node in the scope tree.
#[derive(Clone)]
pub struct Scope {
    id: ScopeId,
    arena: Rc<RefCell<ScopeArena>>,
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id)
            .field("label", &self.label())
            .field("state", &self.state())
            .finish()
    }
}

impl Scope {
    /// Creates a new tree and returns its root.
    pub fn root(label: &'static str) -> Self {
        let arena = Rc::new(RefCell::new(ScopeArena::default()));
        let id = arena.borrow_mut().insert(label, None, false);
        debug!(scope = id.0, label, "root scope created");
        Self { id, arena }
    }

    pub fn id(&self) -> ScopeId {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.arena
            .borrow()
            .nodes
            .get(&self.id)
            .map_or("<closed>", |node| node.label)
    }

    /// Scopes removed from the arena report `Destroyed`.
    pub fn state(&self) -> ScopeState {
        self.arena
            .borrow()
            .nodes
            .get(&self.id)
            .map_or(ScopeState::Destroyed, |node| node.state)
    }

    pub fn is_alive(&self) -> bool {
        self.state() == ScopeState::Alive
    }

    pub fn parent(&self) -> Option<Scope> {
        let parent = self.arena.borrow().nodes.get(&self.id)?.parent?;
        Some(self.handle(parent))
    }

    pub fn children(&self) -> Vec<ScopeId> {
        self.arena
            .borrow()
            .nodes
            .get(&self.id)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Handle to another node of the same tree. Contexts store ids, not
    /// handles, so the arena never owns a reference to itself.
    pub(crate) fn handle(&self, id: ScopeId) -> Scope {
        Scope {
            id,
            arena: Rc::clone(&self.arena),
        }
    }

    fn child(&self, label: &'static str, driven: bool) -> Result<Scope, EnactError> {
        let mut arena = self.arena.borrow_mut();
        match arena.nodes.get(&self.id) {
            Some(node) if node.state == ScopeState::Alive => {}
            _ => return Err(EnactError::ScopeClosed(self.id)),
        }
        let id = arena.insert(label, Some(self.id), driven);
        debug!(scope = id.0, parent = self.id.0, label, driven, "scope created");
        Ok(self.handle(id))
    }

    /// Creates a free-standing child scope. It lives until [`Scope::destroy`]
    /// is called on it or on an ancestor.
    pub fn create_scope(&self, label: &'static str) -> Result<Scope, EnactError> {
        self.child(label, false)
    }

    pub fn set_context<C: 'static>(&self, value: C) {
        if let Some(node) = self.arena.borrow_mut().nodes.get_mut(&self.id) {
            node.contexts.insert(TypeId::of::<C>(), Rc::new(value));
        }
    }

    /// Looks `C` up on this scope, then on each ancestor.
    pub fn context<C: 'static>(&self) -> Option<Rc<C>> {
        let arena = self.arena.borrow();
        let mut cursor = Some(self.id);
        while let Some(id) = cursor {
            let node = arena.nodes.get(&id)?;
            if let Some(value) = node.contexts.get(&TypeId::of::<C>()) {
                return Rc::clone(value).downcast::<C>().ok();
            }
            cursor = node.parent;
        }
        None
    }

    pub fn expect_context<C: 'static>(&self) -> Result<Rc<C>, EnactError> {
        self.context::<C>()
            .ok_or(EnactError::MissingContext(type_name::<C>()))
    }

    /// Registers cleanup that runs when this scope is torn down, after all of
    /// its children have closed. Finalizers run in reverse registration order.
    pub fn ensure<F, Fut>(&self, cleanup: F) -> Result<(), EnactError>
    where
        F: FnOnce() -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        let mut arena = self.arena.borrow_mut();
        match arena.nodes.get_mut(&self.id) {
            Some(node) if node.state == ScopeState::Alive => {
                node.finalizers.push(Box::new(move || Box::pin(cleanup())));
                Ok(())
            }
            _ => Err(EnactError::ScopeClosed(self.id)),
        }
    }

    /// Spawns `body` as a task in a new child scope. If the task fails, the
    /// failure is fatal to this scope as well.
    pub fn spawn<F, Fut, T>(&self, body: F) -> Result<Task<T>, EnactError>
    where
        F: FnOnce(Scope) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<T>> + 'static,
        T: 'static,
    {
        self.spawn_with("task", body, Some(self.clone()))
    }

    /// Spawns a task whose failure is reported to `on_failure` (or only to the
    /// task's joiner when `None`).
    pub(crate) fn spawn_with<F, Fut, T>(
        &self,
        label: &'static str,
        body: F,
        on_failure: Option<Scope>,
    ) -> Result<Task<T>, EnactError>
    where
        F: FnOnce(Scope) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<T>> + 'static,
        T: 'static,
    {
        let scope = self.child(label, true)?;
        let mut cancel = scope
            .cancel_receiver()
            .ok_or(EnactError::ScopeClosed(scope.id))?;
        let (outcome_tx, outcome_rx) = oneshot::channel();
        let driver = scope.clone();

        tokio::task::spawn_local(async move {
            let body = body(driver.clone());
            let outcome = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => Err(EnactError::Halted),
                result = body => result.map_err(EnactError::failed),
            };
            // A child failure cancels us; report that failure instead of the halt.
            let outcome = match (outcome, driver.take_failure()) {
                (Err(EnactError::Halted), Some(failure)) => Err(failure),
                (outcome, _) => outcome,
            };
            let teardown = driver.teardown().await;
            let outcome = match (outcome, teardown) {
                (Ok(_), Err(err)) => Err(err),
                (outcome, _) => outcome,
            };

            if let Err(err) = &outcome {
                if !err.is_halted() {
                    match &on_failure {
                        Some(target) => {
                            warn!(
                                scope = driver.id.0,
                                target = target.id.0,
                                error = %err,
                                "task failed; propagating"
                            );
                            target.fail(err.clone());
                        }
                        None => debug!(scope = driver.id.0, error = %err, "task failed"),
                    }
                }
            }
            let _ = outcome_tx.send(outcome);
        });

        Ok(Task::new(scope, outcome_rx))
    }

    /// Runs every operation concurrently in its own child scope. The first
    /// to settle wins; the rest are halted (and fully torn down) before this
    /// returns.
    pub async fn race<T: 'static>(&self, operations: Vec<Operation<T>>) -> Result<T, EnactError> {
        if operations.is_empty() {
            return Err(EnactError::EmptyRace);
        }

        let mut contenders = Vec::with_capacity(operations.len());
        for operation in operations {
            match self.spawn_with("race", operation, None) {
                Ok(task) => contenders.push(task),
                Err(err) => {
                    for task in contenders.iter().rev() {
                        let _ = task.halt().await;
                    }
                    return Err(err);
                }
            }
        }

        let scopes: Vec<Scope> = contenders.iter().map(|task| task.scope().clone()).collect();
        let joins = contenders
            .into_iter()
            .map(|task| Box::pin(task.join()))
            .collect::<Vec<_>>();
        let (winner, index, _pending) = select_all(joins).await;

        for (position, scope) in scopes.iter().enumerate().rev() {
            if position == index {
                continue;
            }
            if let Err(err) = scope.destroy().await {
                warn!(scope = scope.id.0, error = %err, "race loser teardown failed");
            }
        }
        winner
    }

    /// Halts this scope and everything below it. Resolves once the whole
    /// subtree has closed, with the first teardown error if any finalizer
    /// failed.
    pub fn destroy(&self) -> LocalBoxFuture<'static, Result<(), EnactError>> {
        let scope = self.clone();
        Box::pin(async move {
            let (driven, started, mut closed) = {
                let arena = scope.arena.borrow();
                match arena.nodes.get(&scope.id) {
                    Some(node) => (node.driven, node.teardown_started, node.closed.subscribe()),
                    None => return Ok(()),
                }
            };

            if driven {
                scope.signal_halt();
            } else if !started {
                return scope.teardown().await;
            }
            wait_closed(&mut closed).await
        })
    }

    /// Moves the scope to `Destroying` without starting its teardown. New
    /// work and render publications are refused from here on; a later
    /// [`Scope::destroy`] performs the teardown.
    pub(crate) fn seal(&self) {
        if let Some(node) = self.arena.borrow_mut().nodes.get_mut(&self.id) {
            if node.state == ScopeState::Alive {
                node.state = ScopeState::Destroying;
            }
        }
    }

    /// Non-blocking halt: flips the cancellation flag. Driven scopes pick it
    /// up at their current await point and tear themselves down.
    pub(crate) fn signal_halt(&self) {
        let mut arena = self.arena.borrow_mut();
        if let Some(node) = arena.nodes.get_mut(&self.id) {
            if node.state == ScopeState::Alive {
                node.state = ScopeState::Destroying;
            }
            node.cancel.send_replace(true);
        }
    }

    /// Records a fatal failure. The first failure wins.
    pub(crate) fn fail(&self, failure: EnactError) {
        let driven = {
            let mut arena = self.arena.borrow_mut();
            let Some(node) = arena.nodes.get_mut(&self.id) else {
                return;
            };
            if node.state != ScopeState::Alive {
                return;
            }
            node.failure.get_or_insert(failure.clone());
            if !node.driven {
                node.state = ScopeState::Destroying;
                node.teardown_started = true;
            }
            node.driven
        };

        if driven {
            self.signal_halt();
            return;
        }

        error!(scope = self.id.0, label = self.label(), error = %failure, "scope failed; tearing down");
        let scope = self.clone();
        tokio::task::spawn_local(async move {
            if let Err(err) = scope.teardown().await {
                error!(scope = scope.id.0, error = %err, "teardown after failure did not complete cleanly");
            }
        });
    }

    fn take_failure(&self) -> Option<EnactError> {
        self.arena
            .borrow_mut()
            .nodes
            .get_mut(&self.id)
            .and_then(|node| node.failure.take())
    }

    fn cancel_receiver(&self) -> Option<watch::Receiver<bool>> {
        self.arena
            .borrow()
            .nodes
            .get(&self.id)
            .map(|node| node.cancel.subscribe())
    }

    fn last_child(&self) -> Option<Scope> {
        let id = *self.arena.borrow().nodes.get(&self.id)?.children.last()?;
        Some(self.handle(id))
    }

    /// Closes children (newest first), then runs finalizers, then removes
    /// the node.
    async fn teardown(&self) -> Result<(), EnactError> {
        let label = {
            let mut arena = self.arena.borrow_mut();
            let Some(node) = arena.nodes.get_mut(&self.id) else {
                return Ok(());
            };
            if node.state == ScopeState::Alive {
                node.state = ScopeState::Destroying;
            }
            node.teardown_started = true;
            node.label
        };
        debug!(scope = self.id.0, label, "scope teardown started");

        let mut first_error = None;
        while let Some(child) = self.last_child() {
            if let Err(err) = child.destroy().await {
                first_error.get_or_insert(err);
            }
            self.arena.borrow_mut().detach(self.id, child.id);
        }

        let finalizers = self
            .arena
            .borrow_mut()
            .nodes
            .get_mut(&self.id)
            .map(|node| std::mem::take(&mut node.finalizers))
            .unwrap_or_default();
        for finalizer in finalizers.into_iter().rev() {
            if let Err(err) = finalizer().await {
                warn!(scope = self.id.0, label, error = %format!("{err:#}"), "finalizer failed");
                first_error.get_or_insert(EnactError::teardown(self.id, err));
            }
        }

        let result = first_error.map_or(Ok(()), Err);
        {
            let mut arena = self.arena.borrow_mut();
            if let Some(node) = arena.nodes.get_mut(&self.id) {
                node.state = ScopeState::Destroyed;
                node.closed.send_replace(Some(result.clone()));
            }
            arena.remove(self.id);
        }
        debug!(scope = self.id.0, label, "scope closed");
        result
    }
}

async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    // A dropped sender means the node is gone; treat it as cancelled.
    let _ = cancel.wait_for(|flag| *flag).await;
}

async fn wait_closed(closed: &mut watch::Receiver<Closed>) -> Result<(), EnactError> {
    let waited = closed
        .wait_for(Option::is_some)
        .await
        .map(|value| value.clone());
    let outcome = match waited {
        Ok(value) => value,
        Err(_) => closed.borrow().clone(),
    };
    outcome.unwrap_or(Ok(()))
}

#[cfg(test)]
impl Scope {
    pub(crate) fn arena_handles(&self) -> usize {
        Rc::strong_count(&self.arena)
    }
}

#[cfg(test)]
#[path = "tests/scope_tests.rs"]
mod tests;
