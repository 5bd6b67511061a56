use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tracing::warn;

use crate::broadcast::{SurfaceLink, SurfaceSink};
use crate::config::Config;
use crate::estimator::SpeedEstimator;
use crate::events::{self, ContentChange, LogicalKey};
use crate::feedback;
use crate::heatmap::KeyHeatmap;
use crate::history::{SpeedHistory, SpeedSample};
use crate::protocol::{SurfaceEvent, SurfaceMessage};
use crate::store::{StateStore, HISTORY_KEY, KEY_PRESS_KEY};

/// Host-facing outcome of an inbound surface message.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceReply {
    Handled,
    /// Hand the current speed series to a history view. The view applies
    /// its own time-range filtering.
    ShowHistory(Vec<SpeedSample>),
}

/// One typing-telemetry session: the speed window, the bounded history,
/// the key heatmap, and the link to the presentation surface.
///
/// All operations take an explicit `now` so hosts (and tests) control the
/// clock. Every mutation runs on the caller's thread; the engine is meant
/// to be driven from a single event loop.
pub struct TypingTelemetry {
    config: Config,
    estimator: SpeedEstimator,
    history: SpeedHistory,
    heatmap: KeyHeatmap,
    link: SurfaceLink,
    store: Box<dyn StateStore>,
}

impl TypingTelemetry {
    /// Build a session over `store`, restoring any persisted history and
    /// key counters. Unreadable records are dropped with a warning.
    pub fn new(config: Config, store: Box<dyn StateStore>, now: DateTime<Utc>) -> Self {
        let mut history = SpeedHistory::new(config.history_max_entries);
        if let Some(samples) = load_record::<Vec<SpeedSample>>(store.as_ref(), HISTORY_KEY) {
            history.preload(samples);
        }

        let mut heatmap = KeyHeatmap::new();
        if let Some(counts) = load_record::<HashMap<LogicalKey, u64>>(store.as_ref(), KEY_PRESS_KEY)
        {
            heatmap.preload(counts);
        }

        Self {
            estimator: SpeedEstimator::new(config.idle_time_threshold, now),
            history,
            heatmap,
            link: SurfaceLink::new(),
            store,
            config,
        }
    }

    pub fn is_collecting(&self) -> bool {
        self.estimator.state.collecting
    }

    /// Toggle collection. Either direction resets the live window; the
    /// history and heatmap are left untouched.
    pub fn set_collecting(&mut self, collecting: bool, now: DateTime<Utc>) {
        if self.estimator.state.collecting == collecting {
            return;
        }
        self.estimator.state.collecting = collecting;
        self.estimator.reset_window(now);
    }

    /// Ingest one ordered batch of content changes from the host editor.
    /// No-op while collection is off.
    pub fn handle_edit(&mut self, changes: &[ContentChange], now: DateTime<Utc>) {
        if !self.is_collecting() {
            return;
        }

        let window_restarted = self
            .estimator
            .on_activity(events::inserted_chars(changes), now);
        if window_restarted {
            self.link.post(&SurfaceMessage::Reset {
                clear_history: false,
                clear_key_heatmap: false,
            });
        }

        let keys = events::extract_keys(changes);
        if !keys.is_empty() {
            for &key in &keys {
                self.heatmap.record(key);
            }
            if self.config.save_history {
                persist_record(self.store.as_ref(), KEY_PRESS_KEY, self.heatmap.counts());
            }
            self.link.post(&SurfaceMessage::UpdateKeyHeat { keys });
        }

        self.refresh_speed(now);
    }

    /// Periodic speed evaluation. Runs on a fixed cadence while collecting
    /// so the estimate decays to zero without further edits.
    pub fn on_eval_tick(&mut self, now: DateTime<Utc>) {
        if !self.is_collecting() {
            return;
        }
        self.refresh_speed(now);
    }

    /// Periodic full-state resync toward the surface, self-paced so an
    /// attach does not double the traffic.
    pub fn on_resync_tick(&mut self, now: DateTime<Utc>) {
        if !self.is_collecting() || !self.link.is_attached() {
            return;
        }
        if self.link.needs_full_resync(now) {
            self.post_full_heatmap(now);
        }
    }

    /// Attach a presentation surface and bring it fully up to date.
    pub fn attach_surface(&mut self, sink: Box<dyn SurfaceSink>, now: DateTime<Utc>) {
        self.link.attach(sink);
        self.post_speed_update();
        self.post_full_heatmap(now);
    }

    pub fn detach_surface(&mut self) {
        self.link.detach();
    }

    pub fn has_surface(&self) -> bool {
        self.link.is_attached()
    }

    /// Dispatch one inbound message from the presentation surface.
    pub fn handle_surface_event(&mut self, event: SurfaceEvent, now: DateTime<Utc>) -> SurfaceReply {
        match event {
            SurfaceEvent::Ready => {
                self.post_speed_update();
                self.post_full_heatmap(now);
                SurfaceReply::Handled
            }
            SurfaceEvent::HeatmapReady => {
                self.post_full_heatmap(now);
                SurfaceReply::Handled
            }
            SurfaceEvent::ResetStats => {
                self.reset_stats(now);
                SurfaceReply::Handled
            }
            SurfaceEvent::ShowHistory { .. } => SurfaceReply::ShowHistory(self.history.to_vec()),
        }
    }

    /// Clear the live window, the history and the heatmap, in memory and
    /// in the store. The only operation that deletes persisted telemetry.
    pub fn reset_stats(&mut self, now: DateTime<Utc>) {
        self.estimator.reset_window(now);
        self.history.clear();
        self.heatmap.clear();
        persist_record(self.store.as_ref(), HISTORY_KEY, &self.history.to_vec());
        persist_record(self.store.as_ref(), KEY_PRESS_KEY, self.heatmap.counts());
        self.refresh_speed(now);
        self.link.post(&SurfaceMessage::Reset {
            clear_history: true,
            clear_key_heatmap: true,
        });
    }

    pub fn current_wpm(&self) -> u32 {
        self.estimator.state.current_wpm
    }

    pub fn session(&self) -> &crate::estimator::SessionState {
        &self.estimator.state
    }

    pub fn history(&self) -> &SpeedHistory {
        &self.history
    }

    pub fn heatmap(&self) -> &KeyHeatmap {
        &self.heatmap
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn refresh_speed(&mut self, now: DateTime<Utc>) {
        let wpm = self.estimator.evaluate(now);
        let appended = self.history.record(SpeedSample::new(now, wpm));
        if appended && self.config.save_history {
            persist_record(self.store.as_ref(), HISTORY_KEY, &self.history.to_vec());
        }
        self.post_speed_update();
    }

    fn post_speed_update(&self) {
        if !self.link.is_attached() {
            return;
        }
        let wpm = self.estimator.state.current_wpm;
        self.link.post(&SurfaceMessage::Update {
            wpm,
            quote: feedback::quote_for(wpm).to_string(),
            animation_file: feedback::animation_file_for(wpm).to_string(),
            color: feedback::color_for(wpm).to_string(),
            history: self.history.to_vec(),
        });
    }

    fn post_full_heatmap(&mut self, now: DateTime<Utc>) {
        self.link.post(&SurfaceMessage::InitKeyboardHeatmap {
            key_press_data: self.heatmap.counts().clone(),
        });
        self.link.mark_full_update(now);
    }
}

fn load_record<T: serde::de::DeserializeOwned>(store: &dyn StateStore, key: &str) -> Option<T> {
    match store.get(key) {
        Ok(Some(value)) => match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!("discarding unreadable {key} record: {err}");
                None
            }
        },
        Ok(None) => None,
        Err(err) => {
            warn!("failed to load {key} record: {err}");
            None
        }
    }
}

fn persist_record<T: serde::Serialize>(store: &dyn StateStore, key: &str, value: &T) {
    let value = match serde_json::to_value(value) {
        Ok(value) => value,
        Err(err) => {
            warn!("failed to encode {key} record: {err}");
            return;
        }
    };
    if let Err(err) = store.put(key, &value) {
        warn!("failed to persist {key} record: {err}");
    }
}
