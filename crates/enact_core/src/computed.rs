//! Producer-driven streams.

use std::{
    fmt,
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use futures::{future::LocalBoxFuture, Stream, StreamExt};

use crate::{
    bridge::mount_child,
    error::EnactError,
    node::UiNode,
    render::render,
    scope::Scope,
    signal::{Channel, ChannelStream},
    task::Task,
};

type Producer<T> = Rc<dyn Fn(Emitter<T>) -> LocalBoxFuture<'static, anyhow::Result<()>>>;

/// Handed to a producer; `emit` suspends while a subscriber still holds an
/// unread value.
pub struct Emitter<T> {
    channel: Channel<T>,
}

impl<T> Clone for Emitter<T> {
    fn clone(&self) -> Self {
        Self {
            channel: self.channel.clone(),
        }
    }
}

impl<T: Clone> Emitter<T> {
    pub async fn emit(&self, value: T) {
        self.channel.send(value).await;
    }
}

/// A stream defined by a producer body.
///
/// Every [`Computed::subscribe`] starts the producer in a resource scope
/// owned by the subscriber's scope. Streams built with [`compute`] share one
/// channel between all subscriptions, and a subscriber only sees values
/// emitted after it attached.
pub struct Computed<T> {
    producer: Producer<T>,
    hub: Option<Channel<T>>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            producer: Rc::clone(&self.producer),
            hub: self.hub.clone(),
        }
    }
}

impl<T> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("shared", &self.hub.is_some())
            .finish()
    }
}

pub fn compute<T, F, Fut>(producer: F) -> Computed<T>
where
    T: Clone + 'static,
    F: Fn(Emitter<T>) -> Fut + 'static,
    Fut: Future<Output = anyhow::Result<()>> + 'static,
{
    Computed {
        producer: Rc::new(move |emitter| Box::pin(producer(emitter))),
        hub: Some(Channel::new()),
    }
}

impl<T: Clone + 'static> Computed<T> {
    /// Like [`compute`], but every subscription gets its own channel fed by
    /// its own producer run.
    pub fn per_subscriber<F, Fut>(producer: F) -> Self
    where
        F: Fn(Emitter<T>) -> Fut + 'static,
        Fut: Future<Output = anyhow::Result<()>> + 'static,
    {
        Self {
            producer: Rc::new(move |emitter| Box::pin(producer(emitter))),
            hub: None,
        }
    }

    /// Attaches to the stream and starts the producer under `scope`. A
    /// producer failure is fatal to `scope`.
    pub fn subscribe(&self, scope: &Scope) -> Result<Subscription<T>, EnactError> {
        let channel = self.hub.clone().unwrap_or_default();
        let values = channel.subscribe();
        let run = (self.producer)(Emitter { channel });
        let producer = scope.spawn_with("computed", move |_| run, Some(scope.clone()))?;
        Ok(Subscription { values, producer })
    }
}

impl<T: Clone + fmt::Display + 'static> Computed<T> {
    /// Mounts a nested component that renders every emitted value as text
    /// and returns the slot to embed in the caller's tree.
    pub fn react(&self, scope: &Scope) -> Result<UiNode, EnactError> {
        let computed = self.clone();
        let mount = mount_child(
            scope,
            move |scope: Scope, (): ()| {
                let computed = computed.clone();
                async move {
                    let mut values = computed.subscribe(&scope)?;
                    while let Some(value) = values.next().await {
                        render(&scope, UiNode::text(value.to_string()))?;
                    }
                    anyhow::Ok(None)
                }
            },
            (),
        )?;
        Ok(mount.node())
    }
}

/// A live attachment to a [`Computed`]. Dropping it halts the producer.
pub struct Subscription<T> {
    values: ChannelStream<T>,
    producer: Task<()>,
}

impl<T> Subscription<T> {
    pub fn producer(&self) -> &Task<()> {
        &self.producer
    }
}

impl<T> Stream for Subscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.values.poll_next_unpin(cx)
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.producer.scope().signal_halt();
    }
}

#[cfg(test)]
#[path = "tests/computed_tests.rs"]
mod tests;
