//! Event recorder lifecycle and ingestion

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::debug;

use super::snapshot::{events_key, Snapshot};
use super::types::*;
use crate::host::{HostPage, PageEvent, TabStorage};

/// How many recent hovers are consulted for click/hover correlation
const HOVER_LOOKBACK: usize = 20;
/// How many recent mouse moves are consulted for click proximity
const MOVE_LOOKBACK: usize = 10;
/// A move within this many pixels of a click counts as preceding movement
const NEAR_CLICK_PX: f64 = 50.0;
/// Minimum spacing between recorded pointer moves
const POINTER_THROTTLE_MS: f64 = 50.0;
/// Minimum spacing between periodic snapshot writes
const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(2);

/// Records normalized input events from the host page
///
/// Owns the event stores. Analysis code reads them through [`state`] and
/// watches [`generation`] for staleness; every store mutation bumps the
/// generation counter.
///
/// [`state`]: EventRecorder::state
/// [`generation`]: EventRecorder::generation
pub struct EventRecorder {
    page: Arc<dyn HostPage>,
    storage: Arc<dyn TabStorage>,
    state: Arc<RwLock<EventState>>,
    generation: Arc<AtomicU64>,
    context_id: Mutex<Option<i64>>,
    task: Mutex<Option<JoinHandle<()>>>,
    last_snapshot: Arc<Mutex<Option<Instant>>>,
}

impl EventRecorder {
    /// Create a recorder for the given page, starting the session clock at
    /// the supplied time
    pub fn new(page: Arc<dyn HostPage>, storage: Arc<dyn TabStorage>, start_time: f64) -> Self {
        Self {
            page,
            storage,
            state: Arc::new(RwLock::new(EventState::new(start_time))),
            generation: Arc::new(AtomicU64::new(0)),
            context_id: Mutex::new(None),
            task: Mutex::new(None),
            last_snapshot: Arc::new(Mutex::new(None)),
        }
    }

    /// Begin recording: restore the persisted snapshot for the context, then
    /// subscribe to the page event stream
    ///
    /// Idempotent; a second call while monitoring is a no-op.
    pub fn start_monitoring(&self, context_id: Option<i64>) {
        let mut task = self.task.lock().expect("task lock poisoned");
        if task.is_some() {
            return;
        }

        *self.context_id.lock().expect("context lock poisoned") = context_id;

        // Restoration happens before the listener attaches, so restored
        // records always precede new ones.
        if let Some(ctx) = context_id {
            self.restore(ctx);
        }

        let mut rx = self.page.events();
        let state = self.state.clone();
        let generation = self.generation.clone();
        let storage = self.storage.clone();
        let last_snapshot = self.last_snapshot.clone();

        *task = Some(tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(n)) => {
                        debug!("Event stream lagged by {} events", n);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let changed = {
                    let mut state = state.write().expect("state lock poisoned");
                    ingest(&mut state, &event)
                };

                if changed {
                    generation.fetch_add(1, Ordering::Release);
                    maybe_save(&state, &storage, &last_snapshot, context_id);
                }
            }
        }));
    }

    /// Stop recording; idempotent
    pub fn stop_monitoring(&self) {
        if let Some(task) = self.task.lock().expect("task lock poisoned").take() {
            task.abort();
        }
    }

    /// Whether the ingestion task is running
    pub fn is_monitoring(&self) -> bool {
        self.task.lock().expect("task lock poisoned").is_some()
    }

    /// Write the current compressed state to the tab store, unconditionally
    ///
    /// Best-effort: storage failures are swallowed.
    pub fn save_snapshot(&self) {
        let context_id = *self.context_id.lock().expect("context lock poisoned");
        let Some(ctx) = context_id else {
            return;
        };

        save(&self.state, self.storage.as_ref(), ctx);
        *self.last_snapshot.lock().expect("snapshot lock poisoned") = Some(Instant::now());
    }

    /// Shared handle to the event stores
    pub fn state(&self) -> Arc<RwLock<EventState>> {
        self.state.clone()
    }

    /// Mutation counter for cache invalidation
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn restore(&self, context_id: i64) {
        let Some(raw) = self.storage.read(&events_key(context_id)) else {
            return;
        };

        match serde_json::from_str::<Snapshot>(&raw) {
            Ok(snapshot) => {
                let mut state = self.state.write().expect("state lock poisoned");
                snapshot.restore_into(&mut state);
                debug!(
                    "Restored event snapshot, page load {} of session",
                    state.page_load_count
                );
            }
            Err(e) => debug!("Discarding unreadable event snapshot: {}", e),
        }
    }
}

impl Drop for EventRecorder {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}

fn save(state: &RwLock<EventState>, storage: &dyn TabStorage, context_id: i64) {
    let snapshot = {
        let state = state.read().expect("state lock poisoned");
        Snapshot::capture(&state)
    };

    let Ok(json) = serde_json::to_string(&snapshot) else {
        return;
    };

    if let Err(e) = storage.write(&events_key(context_id), &json) {
        debug!("Snapshot write failed: {}", e);
    }
}

fn maybe_save(
    state: &RwLock<EventState>,
    storage: &Arc<dyn TabStorage>,
    last_snapshot: &Mutex<Option<Instant>>,
    context_id: Option<i64>,
) {
    let Some(ctx) = context_id else {
        return;
    };

    {
        let mut last = last_snapshot.lock().expect("snapshot lock poisoned");
        match *last {
            Some(at) if at.elapsed() < SNAPSHOT_INTERVAL => return,
            _ => *last = Some(Instant::now()),
        }
    }

    save(state, storage.as_ref(), ctx);
}

/// Fold one page event into the stores; returns whether anything changed
pub(crate) fn ingest(state: &mut EventState, event: &PageEvent) -> bool {
    match event {
        PageEvent::MouseMove { x, y, time } => {
            let record = match state.mouse_moves.back() {
                Some(prev) => {
                    let dt = time - prev.time;
                    let dx = x - prev.x;
                    let dy = y - prev.y;
                    let velocity = (dt > 0.0).then(|| (dx * dx + dy * dy).sqrt() / dt);
                    MouseMoveRecord {
                        time: *time,
                        x: *x,
                        y: *y,
                        delta_time: Some(dt),
                        dx,
                        dy,
                        velocity,
                    }
                }
                None => MouseMoveRecord {
                    time: *time,
                    x: *x,
                    y: *y,
                    delta_time: None,
                    dx: 0.0,
                    dy: 0.0,
                    velocity: None,
                },
            };
            push_capped(&mut state.mouse_moves, record);
            true
        }

        PageEvent::Click { x, y, time, target } => {
            let (cx, cy) = target.rect.center();
            let offset = ((x - cx).powi(2) + (y - cy).powi(2)).sqrt();

            let preceding_hover = state
                .hovers
                .iter()
                .rev()
                .take(HOVER_LOOKBACK)
                .any(|h| h.kind == HoverKind::Over && h.node == target.node);

            let preceding_mouse_move = state.mouse_moves.iter().rev().take(MOVE_LOOKBACK).any(|m| {
                let dist = ((m.x - x).powi(2) + (m.y - y).powi(2)).sqrt();
                dist <= NEAR_CLICK_PX
            });

            push_capped(
                &mut state.clicks,
                ClickRecord {
                    time: *time,
                    x: *x,
                    y: *y,
                    target: TargetDescriptor::from(target),
                    offset_from_center: offset,
                    preceding_hover,
                    preceding_mouse_move,
                    mousedown_time: None,
                    click_duration: None,
                },
            );
            true
        }

        PageEvent::MouseDown { time } => match state.clicks.back_mut() {
            Some(click) if click.mousedown_time.is_none() => {
                click.mousedown_time = Some(*time);
                true
            }
            _ => false,
        },

        PageEvent::MouseUp { time } => match state.clicks.back_mut() {
            Some(click) if click.click_duration.is_none() => {
                if let Some(down) = click.mousedown_time {
                    click.click_duration = Some(time - down);
                    true
                } else {
                    false
                }
            }
            _ => false,
        },

        PageEvent::MouseOver { node, time } => {
            push_capped(
                &mut state.hovers,
                HoverRecord {
                    node: *node,
                    time: *time,
                    kind: HoverKind::Over,
                },
            );
            true
        }

        PageEvent::MouseOut { node, time } => {
            push_capped(
                &mut state.hovers,
                HoverRecord {
                    node: *node,
                    time: *time,
                    kind: HoverKind::Out,
                },
            );
            true
        }

        PageEvent::KeyDown { key, time } => {
            let delta_time = state
                .keystrokes
                .iter()
                .rev()
                .find(|k| k.phase == KeyPhase::Down)
                .map(|prev| time - prev.time);

            push_capped(
                &mut state.keystrokes,
                KeystrokeRecord {
                    time: *time,
                    key: redact_key(key),
                    delta_time,
                    phase: KeyPhase::Down,
                    hold_duration: None,
                },
            );
            true
        }

        PageEvent::KeyUp { time, .. } => {
            // Close out the most recent keydown still waiting for its release.
            for record in state.keystrokes.iter_mut().rev() {
                if record.phase == KeyPhase::Down && record.hold_duration.is_none() {
                    record.hold_duration = Some(time - record.time);
                    return true;
                }
            }
            false
        }

        PageEvent::Scroll { x, y, time } => {
            let record = match state.scrolls.back() {
                Some(prev) => ScrollRecord {
                    time: *time,
                    x: *x,
                    y: *y,
                    delta_time: Some(time - prev.time),
                    dx: x - prev.x,
                    dy: y - prev.y,
                },
                None => ScrollRecord {
                    time: *time,
                    x: *x,
                    y: *y,
                    delta_time: None,
                    dx: 0.0,
                    dy: 0.0,
                },
            };
            push_capped(&mut state.scrolls, record);
            true
        }

        PageEvent::FocusIn { target, time } => {
            push_capped(&mut state.focus_changes, focus_record(target, *time, FocusPhase::In));
            true
        }

        PageEvent::FocusOut { target, time } => {
            push_capped(&mut state.focus_changes, focus_record(target, *time, FocusPhase::Out));
            true
        }

        PageEvent::PointerDown {
            x,
            y,
            time,
            pointer_type,
        } => {
            push_capped(
                &mut state.pointer_events,
                PointerRecord {
                    kind: PointerKind::Down,
                    x: *x,
                    y: *y,
                    time: *time,
                    pointer_type: pointer_type.clone(),
                },
            );
            true
        }

        PageEvent::PointerMove {
            x,
            y,
            time,
            pointer_type,
        } => {
            if let Some(last) = state.last_pointer_move {
                if time - last < POINTER_THROTTLE_MS {
                    return false;
                }
            }
            state.last_pointer_move = Some(*time);

            push_capped(
                &mut state.pointer_events,
                PointerRecord {
                    kind: PointerKind::Move,
                    x: *x,
                    y: *y,
                    time: *time,
                    pointer_type: pointer_type.clone(),
                },
            );
            true
        }

        // Mutation and lifecycle events are handled elsewhere.
        PageEvent::NodesAdded { .. }
        | PageEvent::AttributeChanged { .. }
        | PageEvent::VisibilityHidden
        | PageEvent::BeforeUnload => false,
    }
}

fn focus_record(target: &crate::host::ElementInfo, time: f64, phase: FocusPhase) -> FocusRecord {
    FocusRecord {
        time,
        tag: target.tag.clone(),
        id: target.id.clone(),
        input_type: target.input_type.clone(),
        phase,
    }
}

/// Redact single-character keys so typed content is never stored
fn redact_key(key: &str) -> String {
    if key.chars().count() == 1 {
        "char".to_string()
    } else {
        key.to_string()
    }
}
