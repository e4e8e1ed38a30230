use std::{fmt, rc::Rc};

use shared::domain::ScopeId;
use tokio::sync::watch;
use tracing::debug;

use crate::{
    error::EnactError,
    node::{UiEvent, UiNode},
    scope::Scope,
};

/// The retained output of one mount point. The host reads it through
/// [`RenderSlot::subscribe`].
#[derive(Clone)]
pub struct RenderSlot {
    content: Rc<watch::Sender<Option<UiNode>>>,
}

impl RenderSlot {
    pub fn new() -> Self {
        let (content, _) = watch::channel(None);
        Self {
            content: Rc::new(content),
        }
    }

    pub fn current(&self) -> Option<UiNode> {
        self.content.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<UiNode>> {
        self.content.subscribe()
    }

    /// Plain text of the current content, nested slots included.
    pub fn text(&self) -> String {
        self.current()
            .map(|node| node.text_content())
            .unwrap_or_default()
    }

    pub fn markup(&self) -> String {
        self.current().map(|node| node.markup()).unwrap_or_default()
    }

    /// Delivers `event` to the element with the given `id`. Returns whether a
    /// handler ran.
    pub fn dispatch(&self, id: &str, event: &UiEvent) -> bool {
        self.current()
            .and_then(|node| node.find(id))
            .is_some_and(|element| element.dispatch(event))
    }

    pub(crate) fn replace(&self, node: Option<UiNode>) {
        self.content.send_replace(node);
    }
}

impl Default for RenderSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for RenderSlot {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.content, &other.content)
    }
}

impl fmt::Debug for RenderSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RenderSlot").field(&*self.content.borrow()).finish()
    }
}

/// Scope-owned handle to a [`RenderSlot`], stored as a scope context.
pub struct RenderChannel {
    slot: RenderSlot,
    owner: ScopeId,
}

impl RenderChannel {
    pub fn new(slot: RenderSlot, owner: ScopeId) -> Self {
        Self { slot, owner }
    }

    /// Replaces the slot content on behalf of `via`, any scope of the
    /// owner's tree. Dropped once the owner is being torn down.
    pub fn publish(&self, via: &Scope, node: Option<UiNode>) -> bool {
        if !via.handle(self.owner).is_alive() {
            debug!(scope = self.owner.0, "render after teardown dropped");
            return false;
        }
        self.slot.replace(node);
        true
    }
}

/// Publishes `node` as the output of the component `scope` belongs to.
pub fn render(scope: &Scope, node: impl Into<UiNode>) -> Result<(), EnactError> {
    scope
        .expect_context::<RenderChannel>()?
        .publish(scope, Some(node.into()));
    Ok(())
}

/// Empties the output of the component `scope` belongs to.
pub fn clear(scope: &Scope) -> Result<(), EnactError> {
    scope.expect_context::<RenderChannel>()?.publish(scope, None);
    Ok(())
}
