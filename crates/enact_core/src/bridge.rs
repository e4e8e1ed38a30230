//! Mounting components into render slots.
//!
//! Each mount point owns at most one live component scope. Remounting starts
//! destroying the old scope without waiting and hands the pending teardown
//! to the new body, which awaits it before running, so two generations of
//! one mount point never overlap.

use std::{
    any::type_name,
    cell::RefCell,
    future::Future,
    rc::Rc,
    sync::atomic::{AtomicU64, Ordering},
};

use futures::{
    future::{LocalBoxFuture, Shared},
    FutureExt,
};
use shared::domain::{MountId, ScopeId};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::{
    error::EnactError,
    node::UiNode,
    render::{render, RenderChannel, RenderSlot},
    scope::Scope,
    task::Task,
};

static NEXT_MOUNT: AtomicU64 = AtomicU64::new(1);

/// A component body. It runs inside its own scope; a returned node becomes
/// the mount's content, and `render` may publish any number of times before
/// that.
pub trait Component<P>: 'static {
    fn run(&self, scope: Scope, props: P) -> LocalBoxFuture<'static, anyhow::Result<Option<UiNode>>>;
}

impl<P, F, Fut> Component<P> for F
where
    F: Fn(Scope, P) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<Option<UiNode>>> + 'static,
{
    fn run(&self, scope: Scope, props: P) -> LocalBoxFuture<'static, anyhow::Result<Option<UiNode>>> {
        Box::pin((self)(scope, props))
    }
}

/// Marks the scope nested mounts attach to.
struct ComponentHost(ScopeId);

/// Owns the root of every component tree it mounts.
pub struct ScopeManager {
    root: Scope,
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeManager {
    pub fn new() -> Self {
        Self {
            root: Scope::root("bridge"),
        }
    }

    pub fn root(&self) -> &Scope {
        &self.root
    }

    /// Mounts `component` with `props`. The task resolves with the body's
    /// outcome; a failed body has already torn its scope down.
    pub fn mount<P, C>(&self, component: C, props: P) -> Result<(MountHandle<P>, Task<()>), EnactError>
    where
        P: Clone + 'static,
        C: Component<P>,
    {
        let handle = MountHandle::new(self.root.clone(), Rc::new(component), type_name::<C>());
        let task = handle.start(props)?;
        info!(mount = handle.id().0, label = handle.label(), "component mounted");
        Ok((handle, task))
    }

    /// Destroys every mount under this manager.
    pub async fn shutdown(&self) -> Result<(), EnactError> {
        self.root.destroy().await
    }
}

type PendingTeardown = Shared<LocalBoxFuture<'static, ()>>;

struct MountPoint<P> {
    id: MountId,
    label: &'static str,
    host: Scope,
    component: Rc<dyn Component<P>>,
    slot: RenderSlot,
    current: RefCell<Option<Scope>>,
    destroying: RefCell<Option<PendingTeardown>>,
    props: RefCell<Option<P>>,
}

/// Handle to one mount point.
pub struct MountHandle<P> {
    point: Rc<MountPoint<P>>,
}

impl<P> Clone for MountHandle<P> {
    fn clone(&self) -> Self {
        Self {
            point: Rc::clone(&self.point),
        }
    }
}

impl<P> std::fmt::Debug for MountHandle<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountHandle")
            .field("id", &self.point.id)
            .field("label", &self.point.label)
            .field("scope", &*self.point.current.borrow())
            .finish()
    }
}

impl<P: Clone + 'static> MountHandle<P> {
    fn new(host: Scope, component: Rc<dyn Component<P>>, label: &'static str) -> Self {
        Self {
            point: Rc::new(MountPoint {
                id: MountId(NEXT_MOUNT.fetch_add(1, Ordering::Relaxed)),
                label,
                host,
                component,
                slot: RenderSlot::new(),
                current: RefCell::new(None),
                destroying: RefCell::new(None),
                props: RefCell::new(None),
            }),
        }
    }

    pub fn id(&self) -> MountId {
        self.point.id
    }

    pub fn label(&self) -> &'static str {
        self.point.label
    }

    pub fn slot(&self) -> &RenderSlot {
        &self.point.slot
    }

    /// The slot as a node for embedding in a parent tree.
    pub fn node(&self) -> UiNode {
        UiNode::Slot(self.point.slot.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UiNode>> {
        self.point.slot.subscribe()
    }

    /// The live component scope, if any.
    pub fn scope(&self) -> Option<Scope> {
        self.point.current.borrow().clone()
    }

    pub fn props(&self) -> Option<P> {
        self.point.props.borrow().clone()
    }

    fn start(&self, props: P) -> Result<Task<()>, EnactError> {
        let point = &self.point;
        let previous = point.destroying.borrow().clone();
        let scope = point.host.create_scope(point.label)?;
        scope.set_context(RenderChannel::new(point.slot.clone(), scope.id()));
        scope.set_context(ComponentHost(scope.id()));
        *point.current.borrow_mut() = Some(scope.clone());
        *point.props.borrow_mut() = Some(props.clone());

        let component = Rc::clone(&point.component);
        let mount = point.id;
        scope.spawn_with(
            point.label,
            move |body: Scope| async move {
                if let Some(previous) = previous {
                    debug!(mount = mount.0, "waiting for previous teardown");
                    previous.await;
                }
                if let Some(node) = component.run(body.clone(), props).await? {
                    render(&body, node)?;
                }
                anyhow::Ok(())
            },
            Some(scope.clone()),
        )
    }

    fn begin_teardown(&self) {
        let Some(old) = self.point.current.borrow_mut().take() else {
            return;
        };
        old.seal();
        let previous = self.point.destroying.borrow_mut().take();
        let mount = self.point.id;
        let teardown = async move {
            let destroy = async {
                if let Err(err) = old.destroy().await {
                    error!(mount = mount.0, scope = old.id().0, error = %err, "component teardown failed");
                }
            };
            match previous {
                Some(previous) => {
                    futures::join!(previous, destroy);
                }
                None => destroy.await,
            }
        }
        .boxed_local()
        .shared();
        tokio::task::spawn_local(teardown.clone());
        *self.point.destroying.borrow_mut() = Some(teardown);
    }

    /// Starts a fresh generation with `props`. The old scope is torn down in
    /// the background; the new body runs once that teardown has finished.
    pub fn remount(&self, props: P) -> Result<Task<()>, EnactError> {
        self.begin_teardown();
        let task = self.start(props)?;
        debug!(mount = self.point.id.0, label = self.point.label, "component remounted");
        Ok(task)
    }

    /// Remounts only when `props` differ from the current ones.
    pub fn set_props(&self, props: P) -> Result<Option<Task<()>>, EnactError>
    where
        P: PartialEq,
    {
        if self.point.props.borrow().as_ref() == Some(&props) && self.point.current.borrow().is_some() {
            return Ok(None);
        }
        self.remount(props).map(Some)
    }

    /// Destroys the current scope and waits for every pending teardown.
    /// Teardown errors are logged, never returned.
    pub async fn unmount(&self) {
        self.begin_teardown();
        let pending = self.point.destroying.borrow().clone();
        if let Some(pending) = pending {
            pending.await;
        }
        info!(mount = self.point.id.0, label = self.point.label, "component unmounted");
    }
}

/// Mounts `component` under the nearest enclosing component and returns its
/// handle; embed [`MountHandle::node`] to show its output.
///
/// A failing child body is contained: the error is logged and tears down
/// the child's own scope only, leaving the enclosing component running with
/// an empty child slot.
pub fn mount_child<P, C>(scope: &Scope, component: C, props: P) -> Result<MountHandle<P>, EnactError>
where
    P: Clone + 'static,
    C: Component<P>,
{
    let host = scope
        .context::<ComponentHost>()
        .map(|host| scope.handle(host.0))
        .unwrap_or_else(|| scope.clone());
    let handle = MountHandle::new(host, Rc::new(component), type_name::<C>());
    handle.start(props)?;
    debug!(mount = handle.id().0, parent = scope.id().0, label = handle.label(), "child mounted");
    Ok(handle)
}

#[cfg(test)]
#[path = "tests/bridge_tests.rs"]
mod tests;
