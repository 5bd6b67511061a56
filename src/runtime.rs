use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::broadcast::FULL_RESYNC_INTERVAL_MS;
use crate::events::ContentChange;
use crate::protocol::SurfaceEvent;

/// Cadence of the periodic speed evaluation.
pub const EVAL_TICK_MS: u64 = 2_000;

/// Unified event type consumed by the host loop
#[derive(Clone, Debug)]
pub enum EngineEvent {
    /// One ordered batch of edits from the host editor.
    Edit(Vec<ContentChange>),
    /// Inbound message from the presentation surface.
    Surface(SurfaceEvent),
    EvalTick,
    ResyncTick,
    /// Host input is exhausted; the loop should wind down.
    Shutdown,
}

/// Source of host events (edits, surface messages)
pub trait EventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError>;
}

/// Event source fed by an mpsc channel, typically from a reader thread
pub struct ChannelEventSource {
    rx: Receiver<EngineEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<EngineEvent>) -> Self {
        Self { rx }
    }
}

impl EventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<EngineEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the host loop one event at a time, interleaving
/// the evaluation and resync cadences with host events
pub struct Runner<E: EventSource> {
    source: E,
    eval_every: Duration,
    resync_every: Duration,
    next_eval: Instant,
    next_resync: Instant,
}

impl<E: EventSource> Runner<E> {
    pub fn new(source: E) -> Self {
        Self::with_cadence(
            source,
            Duration::from_millis(EVAL_TICK_MS),
            Duration::from_millis(FULL_RESYNC_INTERVAL_MS as u64),
        )
    }

    /// Custom cadences, mainly so tests stay fast.
    pub fn with_cadence(source: E, eval_every: Duration, resync_every: Duration) -> Self {
        let now = Instant::now();
        Self {
            source,
            eval_every,
            resync_every,
            next_eval: now + eval_every,
            next_resync: now + resync_every,
        }
    }

    /// Blocks until the next host event, or returns whichever tick comes
    /// due first.
    pub fn step(&mut self) -> EngineEvent {
        let timeout = self
            .next_eval
            .min(self.next_resync)
            .saturating_duration_since(Instant::now());
        match self.source.recv_timeout(timeout) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                self.due_tick()
            }
        }
    }

    fn due_tick(&mut self) -> EngineEvent {
        if self.next_eval <= self.next_resync {
            self.next_eval += self.eval_every;
            EngineEvent::EvalTick
        } else {
            self.next_resync += self.resync_every;
            EngineEvent::ResyncTick
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::sync::mpsc;

    #[test]
    fn step_returns_eval_tick_on_timeout() {
        let (_tx, rx) = mpsc::channel();
        let source = ChannelEventSource::new(rx);
        let mut runner = Runner::with_cadence(
            source,
            Duration::from_millis(1),
            Duration::from_millis(50),
        );

        // With no events available, step should yield the evaluation tick
        assert_matches!(runner.step(), EngineEvent::EvalTick);
    }

    #[test]
    fn step_passes_through_events() {
        let (tx, rx) = mpsc::channel();
        tx.send(EngineEvent::Surface(SurfaceEvent::Ready)).unwrap();
        let source = ChannelEventSource::new(rx);
        let mut runner = Runner::with_cadence(
            source,
            Duration::from_millis(10),
            Duration::from_millis(10),
        );

        assert_matches!(runner.step(), EngineEvent::Surface(SurfaceEvent::Ready));
    }

    #[test]
    fn ticks_interleave_by_deadline() {
        let (_tx, rx) = mpsc::channel();
        let source = ChannelEventSource::new(rx);
        let mut runner = Runner::with_cadence(
            source,
            Duration::from_millis(2),
            Duration::from_millis(5),
        );

        // deadlines at 2, 4, 5, 6 ms: two eval ticks, then a resync tick
        let mut ticks = Vec::new();
        for _ in 0..4 {
            match runner.step() {
                EngineEvent::EvalTick => ticks.push("eval"),
                EngineEvent::ResyncTick => ticks.push("resync"),
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(ticks, vec!["eval", "eval", "resync", "eval"]);
    }

    #[test]
    fn shutdown_passes_through() {
        let (tx, rx) = mpsc::channel();
        tx.send(EngineEvent::Shutdown).unwrap();
        let source = ChannelEventSource::new(rx);
        let mut runner = Runner::new(source);

        assert_matches!(runner.step(), EngineEvent::Shutdown);
    }
}
