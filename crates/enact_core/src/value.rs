//! Reactive value cells.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use futures::StreamExt;

use crate::{
    computed::{Computed, Emitter, Subscription},
    error::EnactError,
    node::UiNode,
    scope::Scope,
    signal::{Signal, SignalStream},
};

type Equality<T> = Box<dyn Fn(&T, &T) -> bool>;

struct ValueInner<T> {
    current: RefCell<T>,
    version: Cell<u64>,
    changes: Signal<T>,
    same: Equality<T>,
}

/// A mutable cell that broadcasts every change.
///
/// Setting a value equal to the current one is a no-op: nothing is
/// broadcast and no waiter wakes up. Handles are cheap clones of the same
/// cell.
pub struct Value<T> {
    inner: Rc<ValueInner<T>>,
}

impl<T> Clone for Value<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("current", &*self.inner.current.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Value<T> {
    pub fn new(initial: T) -> Self {
        Self::with_equality(initial, |a, b| a == b)
    }
}

impl<T: Clone + 'static> Value<T> {
    /// Creates a cell that uses `same` to decide whether a `set` is a change.
    pub fn with_equality(initial: T, same: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            inner: Rc::new(ValueInner {
                current: RefCell::new(initial),
                version: Cell::new(0),
                changes: Signal::new(),
                same: Box::new(same),
            }),
        }
    }

    pub fn current(&self) -> T {
        self.inner.current.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.current.borrow())
    }

    /// Number of effective changes so far.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Stores `value` and broadcasts it if it differs from the current one.
    /// Returns whether anything changed.
    pub fn set(&self, value: T) -> bool {
        if self.matches(&value) {
            return false;
        }
        *self.inner.current.borrow_mut() = value.clone();
        self.inner.version.set(self.inner.version.get() + 1);
        self.inner.changes.send(value);
        true
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) -> bool {
        let next = f(&self.inner.current.borrow());
        self.set(next)
    }

    /// Resolves once the cell holds a value equal to `expected`. Returns
    /// without suspending when it already does.
    pub async fn is(&self, expected: T) -> bool {
        if self.matches(&expected) {
            return true;
        }
        let mut changes = self.inner.changes.subscribe();
        while let Some(next) = changes.next().await {
            if (self.inner.same)(&next, &expected) {
                return true;
            }
        }
        false
    }

    /// Every later change, without the current value.
    pub fn changes(&self) -> SignalStream<T> {
        self.inner.changes.subscribe()
    }

    /// A computed view of this cell. Each subscriber first sees the value
    /// current at subscription time, then every later change in order.
    pub fn computed(&self) -> Computed<T> {
        let value = self.clone();
        Computed::per_subscriber(move |emitter: Emitter<T>| {
            // Attach before reading so nothing set in between is lost.
            let mut changes = value.changes();
            let first = value.current();
            async move {
                emitter.emit(first).await;
                while let Some(next) = changes.next().await {
                    emitter.emit(next).await;
                }
                Ok(())
            }
        })
    }

    pub fn subscribe(&self, scope: &Scope) -> Result<Subscription<T>, EnactError> {
        self.computed().subscribe(scope)
    }

    fn matches(&self, other: &T) -> bool {
        (self.inner.same)(&self.inner.current.borrow(), other)
    }
}

impl<T: Clone + fmt::Display + 'static> Value<T> {
    /// Mounts a text node that follows this cell; see [`Computed::react`].
    pub fn react(&self, scope: &Scope) -> Result<UiNode, EnactError> {
        self.computed().react(scope)
    }
}

#[cfg(test)]
#[path = "tests/value_tests.rs"]
mod tests;
