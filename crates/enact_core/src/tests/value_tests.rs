use std::{cell::Cell, rc::Rc, time::Duration};

use futures::FutureExt;
use tokio::{task::LocalSet, time::sleep};

use super::*;

async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

fn drain<T>(stream: &mut SignalStream<T>) -> Vec<T> {
    let mut seen = Vec::new();
    while let Some(Some(value)) = stream.next().now_or_never() {
        seen.push(value);
    }
    seen
}

#[test]
fn setting_an_equal_value_broadcasts_nothing() {
    let value = Value::new(1);
    let mut changes = value.changes();

    assert!(!value.set(1));
    assert!(value.set(2));
    assert!(!value.set(2));
    assert!(value.set(3));

    assert_eq!(drain(&mut changes), [2, 3]);
    assert_eq!(value.version(), 2);
    assert_eq!(value.current(), 3);
}

#[test]
fn custom_equality_decides_what_counts_as_a_change() {
    let value = Value::with_equality(1.0_f64, |a: &f64, b: &f64| (a - b).abs() < 0.5);
    let mut changes = value.changes();

    assert!(!value.set(1.2));
    assert_eq!(value.current(), 1.0);
    assert!(value.set(2.0));
    assert_eq!(drain(&mut changes), [2.0]);
}

#[test]
fn update_derives_from_the_current_value() {
    let count = Value::new(0_u32);
    count.update(|n| n + 1);
    count.update(|n| n + 1);

    assert_eq!(count.current(), 2);
    assert_eq!(count.with(|n| n * 10), 20);
}

#[test]
fn is_returns_immediately_when_already_equal() {
    let running = Value::new(false);
    assert_eq!(running.is(false).now_or_never(), Some(true));
    assert_eq!(running.is(true).now_or_never(), None);
}

#[tokio::test(start_paused = true)]
async fn is_skips_non_matching_values() {
    LocalSet::new()
        .run_until(async {
            let stage = Value::new(0);
            let reached = Rc::new(Cell::new(false));
            let flag = reached.clone();
            let waiter = stage.clone();
            tokio::task::spawn_local(async move {
                if waiter.is(3).await {
                    flag.set(true);
                }
            });
            settle().await;

            stage.set(1);
            stage.set(2);
            settle().await;
            assert!(!reached.get());

            stage.set(3);
            settle().await;
            assert!(reached.get());
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_current_value_then_every_change() {
    LocalSet::new()
        .run_until(async {
            let root = Scope::root("test");
            let name = Value::new("a");
            let mut first = name.subscribe(&root).unwrap();
            name.set("b");
            let mut second = name.subscribe(&root).unwrap();
            name.set("c");

            assert_eq!(first.next().await, Some("a"));
            assert_eq!(first.next().await, Some("b"));
            assert_eq!(first.next().await, Some("c"));
            assert_eq!(second.next().await, Some("b"));
            assert_eq!(second.next().await, Some("c"));

            name.set("c");
            name.set("d");
            assert_eq!(first.next().await, Some("d"));
            assert_eq!(second.next().await, Some("d"));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn slow_subscriber_still_gets_every_change_in_order() {
    LocalSet::new()
        .run_until(async {
            let root = Scope::root("test");
            let count = Value::new(0);
            let mut view = count.subscribe(&root).unwrap();
            for n in 1..=5 {
                count.set(n);
            }
            settle().await;

            let mut seen = Vec::new();
            for _ in 0..6 {
                seen.push(view.next().await.unwrap());
            }
            assert_eq!(seen, [0, 1, 2, 3, 4, 5]);
        })
        .await;
}
