//! Message schema spoken between the engine and its presentation surface.
//! Everything crosses the boundary as JSON tagged by a `command` field.

use crate::events::LogicalKey;
use crate::history::SpeedSample;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outbound: engine to surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum SurfaceMessage {
    /// Current estimate plus the presentation payload and full history.
    #[serde(rename_all = "camelCase")]
    Update {
        wpm: u32,
        quote: String,
        animation_file: String,
        color: String,
        history: Vec<SpeedSample>,
    },
    /// Incremental heatmap delta: keys pressed since the previous message.
    #[serde(rename_all = "camelCase")]
    UpdateKeyHeat { keys: Vec<LogicalKey> },
    /// Full counter snapshot; the receiver discards local state for it.
    #[serde(rename_all = "camelCase")]
    InitKeyboardHeatmap {
        key_press_data: HashMap<LogicalKey, u64>,
    },
    /// Display reset, optionally clearing the receiver's history series
    /// and heatmap rendering.
    #[serde(rename_all = "camelCase")]
    Reset {
        clear_history: bool,
        clear_key_heatmap: bool,
    },
}

/// Inbound: surface to engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum SurfaceEvent {
    /// Surface (re)loaded and wants the full current state.
    Ready,
    /// Heatmap pane finished wiring up and wants a counter snapshot.
    HeatmapReady,
    /// User asked to wipe all collected telemetry.
    ResetStats,
    /// User asked for the history view. The carried series is advisory;
    /// the engine answers from its own buffer.
    ShowHistory { history: Vec<SpeedSample> },
}
