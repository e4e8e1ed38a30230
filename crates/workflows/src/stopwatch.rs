use std::time::Duration;

use enact_core::{interval, map, op, render, Element, Scope, UiNode, Value};
use futures::StreamExt;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopwatchProps {
    pub tick: Duration,
}

impl Default for StopwatchProps {
    fn default() -> Self {
        Self { tick: DEFAULT_TICK }
    }
}

/// Seconds with millisecond precision, e.g. `1.250`.
pub fn format_elapsed(elapsed: Duration) -> String {
    format!("{:.3}", elapsed.as_secs_f64())
}

/// Start/stop timer. `#start` and `#stop` buttons toggle it; `#elapsed`
/// shows the seconds since the last start.
pub async fn stopwatch(scope: Scope, props: StopwatchProps) -> anyhow::Result<Option<UiNode>> {
    let running = Value::new(false);
    let elapsed = Value::new(format_elapsed(Duration::ZERO));

    {
        let running = running.clone();
        let elapsed = elapsed.clone();
        scope.spawn(move |scope| drive(scope, running, elapsed, props.tick))?;
    }

    let display = elapsed.react(&scope)?;
    let mut states = running.subscribe(&scope)?;
    while let Some(is_running) = states.next().await {
        let start = running.clone();
        let stop = running.clone();
        render(
            &scope,
            UiNode::fragment([
                UiNode::from(
                    Element::new("h3")
                        .child("Time passed: ")
                        .child(Element::new("span").attr("id", "elapsed").child(display.clone())),
                ),
                UiNode::from(
                    Element::new("button")
                        .attr("id", "start")
                        .attr("type", "button")
                        .flag("disabled", is_running)
                        .on_click(move || {
                            start.set(true);
                        })
                        .child("Start"),
                ),
                UiNode::from(
                    Element::new("button")
                        .attr("id", "stop")
                        .attr("type", "button")
                        .flag("disabled", !is_running)
                        .on_click(move || {
                            stop.set(false);
                        })
                        .child("Stop"),
                ),
            ]),
        )?;
    }
    Ok(None)
}

async fn drive(
    scope: Scope,
    running: Value<bool>,
    elapsed: Value<String>,
    tick: Duration,
) -> anyhow::Result<()> {
    loop {
        running.is(true).await;
        let started = Instant::now();
        elapsed.set(format_elapsed(Duration::ZERO));
        debug!(scope = scope.id().0, "stopwatch started");

        let stopped = running.clone();
        let display = elapsed.clone();
        scope
            .race(vec![
                op(move |_| async move {
                    stopped.is(false).await;
                    anyhow::Ok(())
                }),
                op(move |_| async move {
                    let mut ticks = map(interval(tick, ())?, |()| Instant::now());
                    while let Some(now) = ticks.next().await {
                        display.set(format_elapsed(now - started));
                    }
                    anyhow::Ok(())
                }),
            ])
            .await?;
        debug!(scope = scope.id().0, "stopwatch stopped");
    }
}
