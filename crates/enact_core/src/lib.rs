//! Structured-concurrency components over a retained UI tree.
//!
//! Everything here is single-threaded: run it on a current-thread runtime
//! inside a [`tokio::task::LocalSet`].

pub mod bridge;
pub mod computed;
pub mod error;
pub mod interval;
pub mod node;
pub mod render;
pub mod scope;
pub mod signal;
pub mod stream;
pub mod task;
pub mod value;

pub use bridge::{mount_child, Component, MountHandle, ScopeManager};
pub use computed::{compute, Computed, Emitter, Subscription};
pub use error::EnactError;
pub use interval::{active_timers, interval, Interval};
pub use node::{Element, EventKind, UiEvent, UiNode};
pub use render::{clear, render, RenderChannel, RenderSlot};
pub use scope::Scope;
pub use shared::domain::{MountId, ScopeId, ScopeState};
pub use stream::map;
pub use task::{op, Operation, Task};
pub use value::Value;
