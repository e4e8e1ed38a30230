//! Terminal stand-in for a renderer: samples a mount's slot once per frame
//! and prints the markup whenever it changed.

use std::{io::Write, time::Duration};

use enact_core::RenderSlot;
use tokio::time::{self, Instant, MissedTickBehavior};

pub struct FramePrinter<W> {
    out: W,
    last: Option<String>,
    frames: usize,
}

impl<W: Write> FramePrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last: None,
            frames: 0,
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn commit(&mut self, slot: &RenderSlot) -> std::io::Result<bool> {
        self.commit_markup(slot.markup())
    }

    /// Writes `markup` as a new frame unless it equals the previous one.
    pub fn commit_markup(&mut self, markup: String) -> std::io::Result<bool> {
        if self.last.as_deref() == Some(markup.as_str()) {
            return Ok(false);
        }
        writeln!(self.out, "[frame {:>3}] {markup}", self.frames)?;
        self.frames += 1;
        self.last = Some(markup);
        Ok(true)
    }

    /// Samples `slot` every `frame` for `total`.
    pub async fn run(&mut self, slot: &RenderSlot, frame: Duration, total: Duration) -> anyhow::Result<()> {
        let deadline = Instant::now() + total;
        let mut ticks = time::interval(frame);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticks.tick().await;
            self.commit(slot)?;
            if Instant::now() >= deadline {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/host_tests.rs"]
mod tests;
