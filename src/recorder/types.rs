//! Typed event records and per-page event state

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::host::ElementInfo;

/// Hard cap on every event store; exceeding it evicts the oldest record
pub const STORE_CAP: usize = 500;

/// Structural descriptor of a click target
///
/// Deliberately small: enough to recognize what was clicked without holding
/// a node reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetDescriptor {
    pub tag: String,
    pub id: String,
    pub class: String,
    pub width: f64,
    pub height: f64,
}

impl From<&ElementInfo> for TargetDescriptor {
    fn from(element: &ElementInfo) -> Self {
        Self {
            tag: element.tag.clone(),
            id: element.id.clone(),
            class: element.classes.clone(),
            width: element.rect.width,
            height: element.rect.height,
        }
    }
}

/// A normalized mousemove
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseMoveRecord {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    /// Milliseconds since the previous move, absent on the first record
    pub delta_time: Option<f64>,
    pub dx: f64,
    pub dy: f64,
    /// Pixels per millisecond, derived once at ingestion when delta_time > 0
    pub velocity: Option<f64>,
}

/// A normalized click
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickRecord {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub target: TargetDescriptor,
    /// Euclidean distance from the click point to the target's rect center
    pub offset_from_center: f64,
    /// Whether a recent hover covered the same target node
    pub preceding_hover: bool,
    /// Whether a recent mousemove passed within 50 px of the click point
    pub preceding_mouse_move: bool,
    pub mousedown_time: Option<f64>,
    pub click_duration: Option<f64>,
}

/// Keystroke phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyPhase {
    Down,
    Up,
}

/// A normalized keystroke
///
/// Single-character keys are redacted to the token `"char"` before they
/// reach this record; only named keys (Enter, Tab, ...) are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeystrokeRecord {
    pub time: f64,
    pub key: String,
    pub delta_time: Option<f64>,
    pub phase: KeyPhase,
    /// Set once when the matching keyup arrives
    pub hold_duration: Option<f64>,
}

/// A normalized scroll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollRecord {
    pub time: f64,
    pub x: f64,
    pub y: f64,
    pub delta_time: Option<f64>,
    pub dx: f64,
    pub dy: f64,
}

/// Hover direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverKind {
    Over,
    Out,
}

/// A hover observation
///
/// Holds a raw node identity for recency comparisons against click targets.
/// No serde derives: hover records must never be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverRecord {
    pub node: u64,
    pub time: f64,
    pub kind: HoverKind,
}

/// Focus phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusPhase {
    In,
    Out,
}

/// A focus change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusRecord {
    pub time: f64,
    pub tag: String,
    pub id: String,
    pub input_type: Option<String>,
    pub phase: FocusPhase,
}

/// Pointer event kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    Down,
    Move,
}

/// A pointer event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerRecord {
    pub kind: PointerKind,
    pub x: f64,
    pub y: f64,
    pub time: f64,
    pub pointer_type: String,
}

/// All event stores for the current detection session
///
/// Stores are append-only within a page; eviction only ever drops from the
/// head. Restored snapshot records are prepended before any new event
/// arrives, so per-store timestamp order is preserved.
#[derive(Debug, Clone)]
pub struct EventState {
    /// Session start, preserved across page loads
    pub start_time: f64,
    /// 1 on a fresh session, incremented by each restore
    pub page_load_count: u32,
    pub mouse_moves: VecDeque<MouseMoveRecord>,
    pub clicks: VecDeque<ClickRecord>,
    pub keystrokes: VecDeque<KeystrokeRecord>,
    pub scrolls: VecDeque<ScrollRecord>,
    pub hovers: VecDeque<HoverRecord>,
    pub focus_changes: VecDeque<FocusRecord>,
    pub pointer_events: VecDeque<PointerRecord>,
    /// Timestamp of the last recorded pointer move, for throttling
    pub last_pointer_move: Option<f64>,
}

impl EventState {
    /// Create empty state for a session starting at the given time
    pub fn new(start_time: f64) -> Self {
        Self {
            start_time,
            page_load_count: 1,
            mouse_moves: VecDeque::new(),
            clicks: VecDeque::new(),
            keystrokes: VecDeque::new(),
            scrolls: VecDeque::new(),
            hovers: VecDeque::new(),
            focus_changes: VecDeque::new(),
            pointer_events: VecDeque::new(),
            last_pointer_move: None,
        }
    }

    /// Total number of recorded events across all stores
    pub fn total_events(&self) -> usize {
        self.mouse_moves.len()
            + self.clicks.len()
            + self.keystrokes.len()
            + self.scrolls.len()
            + self.hovers.len()
            + self.focus_changes.len()
            + self.pointer_events.len()
    }

    /// Observed duration: latest record timestamp minus session start
    pub fn duration(&self) -> f64 {
        let mut latest = self.start_time;

        if let Some(r) = self.mouse_moves.back() {
            latest = latest.max(r.time);
        }
        if let Some(r) = self.clicks.back() {
            latest = latest.max(r.time);
        }
        if let Some(r) = self.keystrokes.back() {
            latest = latest.max(r.time);
        }
        if let Some(r) = self.scrolls.back() {
            latest = latest.max(r.time);
        }
        if let Some(r) = self.focus_changes.back() {
            latest = latest.max(r.time);
        }
        if let Some(r) = self.pointer_events.back() {
            latest = latest.max(r.time);
        }

        (latest - self.start_time).max(0.0)
    }
}

/// Append a record, evicting the oldest when the store is at capacity
pub(crate) fn push_capped<T>(store: &mut VecDeque<T>, record: T) {
    if store.len() >= STORE_CAP {
        store.pop_front();
    }
    store.push_back(record);
}
