use std::time::Duration;

use enact_core::{ScopeManager, UiEvent};
use tokio::{task::LocalSet, time::sleep};
use workflows::counter;

async fn settle() {
    sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn clicking_increments_the_count() {
    LocalSet::new()
        .run_until(async {
            let manager = ScopeManager::new();
            let (handle, task) = manager.mount(counter, 0).expect("mount counter");
            task.join().await.expect("counter body");
            settle().await;
            assert_eq!(handle.slot().text(), "count is 0");

            assert!(handle.slot().dispatch("count", &UiEvent::Click));
            assert!(handle.slot().dispatch("count", &UiEvent::Click));
            settle().await;
            assert_eq!(handle.slot().text(), "count is 2");
            assert_eq!(
                handle.slot().markup(),
                "<button id=\"count\" type=\"button\">count is 2</button>"
            );
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn remounting_starts_from_the_new_initial_count() {
    LocalSet::new()
        .run_until(async {
            let manager = ScopeManager::new();
            let (handle, _task) = manager.mount(counter, 0).expect("mount counter");
            settle().await;
            handle.slot().dispatch("count", &UiEvent::Click);
            settle().await;
            assert_eq!(handle.slot().text(), "count is 1");

            handle.set_props(10).expect("remount").expect("props changed");
            sleep(Duration::from_millis(5)).await;
            assert_eq!(handle.slot().text(), "count is 10");
        })
        .await;
}
