use crate::protocol::SurfaceMessage;
use chrono::{DateTime, Utc};
use std::io::Write;
use std::sync::mpsc::Sender;
use std::sync::Mutex;

/// Minimum gap between full heatmap snapshots pushed to the surface.
pub const FULL_RESYNC_INTERVAL_MS: i64 = 5_000;

/// Receiving end of the presentation surface. Implementations must not
/// block the caller; delivery is best-effort.
pub trait SurfaceSink {
    fn post(&self, message: &SurfaceMessage);
}

/// Sink that forwards messages over an mpsc channel, dropping them once
/// the receiver is gone.
pub struct ChannelSink {
    tx: Sender<SurfaceMessage>,
}

impl ChannelSink {
    pub fn new(tx: Sender<SurfaceMessage>) -> Self {
        Self { tx }
    }
}

impl SurfaceSink for ChannelSink {
    fn post(&self, message: &SurfaceMessage) {
        let _ = self.tx.send(message.clone());
    }
}

/// Sink that writes one JSON line per message, for piping to a renderer.
pub struct JsonLineSink<W: Write> {
    out: Mutex<W>,
}

impl<W: Write> JsonLineSink<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }
}

impl<W: Write> SurfaceSink for JsonLineSink<W> {
    fn post(&self, message: &SurfaceMessage) {
        let Ok(line) = serde_json::to_string(message) else {
            return;
        };
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{line}");
            let _ = out.flush();
        }
    }
}

/// Attachment point for the active presentation surface, plus the
/// bookkeeping that paces periodic full resyncs.
///
/// At most one surface is attached at a time; attaching replaces any
/// previous sink. While detached, posts are swallowed.
pub struct SurfaceLink {
    sink: Option<Box<dyn SurfaceSink>>,
    last_full_update: Option<DateTime<Utc>>,
}

impl SurfaceLink {
    pub fn new() -> Self {
        Self {
            sink: None,
            last_full_update: None,
        }
    }

    pub fn attach(&mut self, sink: Box<dyn SurfaceSink>) {
        self.sink = Some(sink);
    }

    pub fn detach(&mut self) {
        self.sink = None;
        self.last_full_update = None;
    }

    pub fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    /// Best-effort delivery; a detached surface swallows the message.
    pub fn post(&self, message: &SurfaceMessage) {
        if let Some(sink) = &self.sink {
            sink.post(message);
        }
    }

    /// Note that a full snapshot just went out.
    pub fn mark_full_update(&mut self, now: DateTime<Utc>) {
        self.last_full_update = Some(now);
    }

    /// True when no snapshot went out within the resync interval.
    pub fn needs_full_resync(&self, now: DateTime<Utc>) -> bool {
        match self.last_full_update {
            Some(at) => (now - at).num_milliseconds() >= FULL_RESYNC_INTERVAL_MS,
            None => true,
        }
    }

    pub fn last_full_update(&self) -> Option<DateTime<Utc>> {
        self.last_full_update
    }
}

impl Default for SurfaceLink {
    fn default() -> Self {
        Self::new()
    }
}
