//! Multicast primitives.
//!
//! * [`Signal`]: fire-and-forget send from synchronous code (a `Value::set`,
//!   a UI handler). Every subscriber gets its own unbounded queue, so nothing
//!   is dropped and per-subscriber order is preserved.
//! * [`Channel`]: async send with one pending value per subscriber. A
//!   subscriber that has not pulled its previous value stalls the sender.
//!
//! Both only deliver values sent after a subscriber attached.

use std::{cell::RefCell, rc::Rc};

use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, UnboundedReceiverStream};

pub type SignalStream<T> = UnboundedReceiverStream<T>;
pub type ChannelStream<T> = ReceiverStream<T>;

pub struct Signal<T> {
    subscribers: Rc<RefCell<Vec<mpsc::UnboundedSender<T>>>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Rc::clone(&self.subscribers),
        }
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self {
            subscribers: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T: Clone> Signal<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of subscribers the value reached.
    pub fn send(&self, value: T) -> usize {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|tx| tx.send(value.clone()).is_ok());
        subscribers.len()
    }

    pub fn subscribe(&self) -> SignalStream<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.borrow_mut().push(tx);
        UnboundedReceiverStream::new(rx)
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

pub struct Channel<T> {
    subscribers: Rc<RefCell<Vec<mpsc::Sender<T>>>>,
}

impl<T> Clone for Channel<T> {
    fn clone(&self) -> Self {
        Self {
            subscribers: Rc::clone(&self.subscribers),
        }
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            subscribers: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T: Clone> Channel<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `value` to every current subscriber, suspending on any
    /// subscriber that still holds an unread value.
    pub async fn send(&self, value: T) {
        let targets = self.subscribers.borrow().clone();
        for tx in targets {
            // A closed receiver is pruned below.
            let _ = tx.send(value.clone()).await;
        }
        self.subscribers.borrow_mut().retain(|tx| !tx.is_closed());
    }

    pub fn subscribe(&self) -> ChannelStream<T> {
        let (tx, rx) = mpsc::channel(1);
        self.subscribers.borrow_mut().push(tx);
        ReceiverStream::new(rx)
    }

    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|tx| !tx.is_closed());
        subscribers.len()
    }
}

#[cfg(test)]
#[path = "tests/signal_tests.rs"]
mod tests;
