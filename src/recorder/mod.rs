//! # Event recorder
//!
//! Subscribes to the host page's input-event stream, normalizes raw events
//! into typed records, enforces per-store caps, and persists compressed
//! snapshots to the tab store so evidence accumulates across page loads.
//!
//! ## Module structure
//! - `types`: typed event records and the per-page `EventState`
//! - `recorder`: the `EventRecorder` lifecycle and ingestion loop
//! - `snapshot`: cross-page persistence format and merge rules

pub mod recorder;
pub mod snapshot;
pub mod types;


pub use recorder::EventRecorder;
pub use snapshot::{events_key, Snapshot};
pub use types::{
    ClickRecord, EventState, FocusPhase, FocusRecord, HoverKind, HoverRecord, KeyPhase,
    KeystrokeRecord, MouseMoveRecord, PointerKind, PointerRecord, ScrollRecord, TargetDescriptor,
    STORE_CAP,
};
