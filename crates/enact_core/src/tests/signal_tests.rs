use futures::{FutureExt, StreamExt};
use tokio::task::LocalSet;

use super::*;

#[test]
fn signal_only_reaches_current_subscribers() {
    let signal = Signal::new();
    signal.send(1);
    let mut late = signal.subscribe();
    assert_eq!(signal.send(2), 1);

    assert_eq!(late.next().now_or_never(), Some(Some(2)));
    assert!(late.next().now_or_never().is_none());
}

#[test]
fn signal_forgets_dropped_subscribers() {
    let signal = Signal::new();
    let kept = signal.subscribe();
    drop(signal.subscribe());

    assert_eq!(signal.send("x"), 1);
    assert_eq!(signal.subscriber_count(), 1);
    drop(kept);
    assert_eq!(signal.subscriber_count(), 0);
}

#[tokio::test]
async fn channel_send_waits_for_unread_values() {
    LocalSet::new()
        .run_until(async {
            let channel = Channel::new();
            let mut values = channel.subscribe();

            channel.send(1).await;
            assert!(channel.send(2).now_or_never().is_none());

            assert_eq!(values.next().await, Some(1));
            let sender = channel.clone();
            let pending = tokio::task::spawn_local(async move { sender.send(2).await });
            assert_eq!(values.next().await, Some(2));
            pending.await.unwrap();
        })
        .await;
}

#[tokio::test]
async fn channel_skips_closed_subscribers() {
    let channel = Channel::new();
    drop(channel.subscribe());
    let mut open = channel.subscribe();

    channel.send("ok").await;

    assert_eq!(open.next().await, Some("ok"));
    assert_eq!(channel.subscriber_count(), 1);
}
