//! Cross-page persistence of event stores
//!
//! Snapshots carry the six persistable stores plus the session counters.
//! Hover records hold live node identities and are excluded by
//! construction. A snapshot compresses each store to its newest 200
//! records; on restore, old records are prepended and the head is trimmed
//! back to the store cap.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::types::{
    ClickRecord, EventState, FocusRecord, KeystrokeRecord, MouseMoveRecord, PointerRecord,
    ScrollRecord, STORE_CAP,
};

/// Per-store record limit inside a persisted snapshot
pub const SNAPSHOT_CAP: usize = 200;

/// Tab-storage key for the event snapshot of the given context
pub fn events_key(context_id: i64) -> String {
    format!("agentdetect_events_{}", context_id)
}

/// Persisted image of the event stores
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub start_time: f64,
    pub page_load_count: u32,
    pub mouse_moves: Vec<MouseMoveRecord>,
    pub clicks: Vec<ClickRecord>,
    pub keystrokes: Vec<KeystrokeRecord>,
    pub scrolls: Vec<ScrollRecord>,
    pub focus_changes: Vec<FocusRecord>,
    pub pointer_events: Vec<PointerRecord>,
}

fn tail<T: Clone>(store: &VecDeque<T>, cap: usize) -> Vec<T> {
    store
        .iter()
        .skip(store.len().saturating_sub(cap))
        .cloned()
        .collect()
}

fn prepend<T>(store: &mut VecDeque<T>, restored: Vec<T>) {
    for record in restored.into_iter().rev() {
        store.push_front(record);
    }
    while store.len() > STORE_CAP {
        store.pop_front();
    }
}

impl Snapshot {
    /// Capture the newest records of every persistable store
    pub fn capture(state: &EventState) -> Self {
        Self {
            start_time: state.start_time,
            page_load_count: state.page_load_count,
            mouse_moves: tail(&state.mouse_moves, SNAPSHOT_CAP),
            clicks: tail(&state.clicks, SNAPSHOT_CAP),
            keystrokes: tail(&state.keystrokes, SNAPSHOT_CAP),
            scrolls: tail(&state.scrolls, SNAPSHOT_CAP),
            focus_changes: tail(&state.focus_changes, SNAPSHOT_CAP),
            pointer_events: tail(&state.pointer_events, SNAPSHOT_CAP),
        }
    }

    /// Merge this snapshot into freshly-started state
    ///
    /// Restored records land before anything already recorded, the original
    /// session start time is kept, and the page-load counter advances.
    pub fn restore_into(self, state: &mut EventState) {
        state.start_time = self.start_time;
        state.page_load_count = self.page_load_count + 1;

        prepend(&mut state.mouse_moves, self.mouse_moves);
        prepend(&mut state.clicks, self.clicks);
        prepend(&mut state.keystrokes, self.keystrokes);
        prepend(&mut state.scrolls, self.scrolls);
        prepend(&mut state.focus_changes, self.focus_changes);
        prepend(&mut state.pointer_events, self.pointer_events);
    }
}
