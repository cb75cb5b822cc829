//! Anomaly catalog and interaction sub-score
//!
//! Every emitted signal has a stable dotted name. Downstream consumers
//! (the strong/reliable multipliers here, the tier model in `agent`)
//! select purely by name membership.

use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use super::stats::{coefficient_of_variation, variance};
use crate::recorder::{EventRecorder, EventState, FocusPhase, KeyPhase};
use crate::signal::Signal;

/// Minimum mouse moves before mouse analyses engage
const MIN_MOUSE_MOVES: usize = 20;
/// Minimum clicks before click analyses engage
const MIN_CLICKS: usize = 3;
/// Minimum keydowns before keystroke analyses engage
const MIN_KEYSTROKES: usize = 10;
/// Interval variance below which timing counts as machine-perfect (ms^2)
const PERFECT_TIMING_VARIANCE: f64 = 5.0;
/// Fastest plausible human inter-click interval (ms)
const MIN_HUMAN_REACTION_MS: f64 = 50.0;
/// Fastest plausible mouse velocity (px/ms)
const MAX_MOUSE_SPEED: f64 = 10_000.0;
/// Click-to-center distance treated as pixel precision (px)
const CENTER_TOLERANCE_PX: f64 = 5.0;

/// Signals whose joint presence escalates the score multiplier
const STRONG_SIGNALS: &[&str] = &[
    "click.superhuman_speed",
    "click.center_precision",
    "click.teleport_pattern",
    "click.no_movement",
    "comet.ultra_precise_center",
    "comet.no_mousemove_trail",
    "comet.read_then_act",
    "comet.low_mouse_to_action_ratio",
];

/// Signals trusted even on thin evidence
const RELIABLE_SIGNALS: &[&str] = &[
    "click.center_precision",
    "comet.ultra_precise_center",
    "comet.no_mousemove_trail",
    "comet.low_mouse_to_action_ratio",
];

/// Per-store record counts at analysis time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventCounts {
    pub mouse_moves: usize,
    pub clicks: usize,
    pub keystrokes: usize,
    pub scrolls: usize,
    pub hovers: usize,
    pub focus_changes: usize,
    pub pointer_events: usize,
}

/// Snapshot result of an interaction analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub event_counts: EventCounts,
    /// Milliseconds between session start and the latest record
    pub duration: f64,
    pub anomalies: Vec<Signal>,
    pub score: u32,
}

/// Caching front over [`analyze_state`]
///
/// The cached report stays valid until the recorder's generation counter
/// moves; two analyses without an intervening mutation return the identical
/// report.
#[derive(Default)]
pub struct Analyzer {
    cache: RwLock<Option<(u64, AnalysisReport)>>,
}

impl Analyzer {
    /// Create an analyzer with an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyze the recorder's current state, reusing the cache when nothing
    /// has changed
    pub fn analyze(&self, recorder: &EventRecorder) -> AnalysisReport {
        let generation = recorder.generation();

        if let Some((cached_gen, report)) = &*self.cache.read().expect("cache lock poisoned") {
            if *cached_gen == generation {
                return report.clone();
            }
        }

        let state = recorder.state();
        let report = {
            let state = state.read().expect("state lock poisoned");
            analyze_state(&state)
        };

        *self.cache.write().expect("cache lock poisoned") = Some((generation, report.clone()));
        report
    }
}

/// Analyze event stores into a report; pure function of the state
pub fn analyze_state(state: &EventState) -> AnalysisReport {
    let mut anomalies = Vec::new();

    analyze_mouse(state, &mut anomalies);
    analyze_clicks(state, &mut anomalies);
    analyze_keystrokes(state, &mut anomalies);
    analyze_scrolls(state, &mut anomalies);
    analyze_sequences(state, &mut anomalies);
    analyze_bursts(state, &mut anomalies);
    analyze_pointer_gap(state, &mut anomalies);

    let score = interaction_score(&anomalies, state.total_events());

    AnalysisReport {
        event_counts: EventCounts {
            mouse_moves: state.mouse_moves.len(),
            clicks: state.clicks.len(),
            keystrokes: state.keystrokes.len(),
            scrolls: state.scrolls.len(),
            hovers: state.hovers.len(),
            focus_changes: state.focus_changes.len(),
            pointer_events: state.pointer_events.len(),
        },
        duration: state.duration(),
        anomalies,
        score,
    }
}

fn keydown_times(state: &EventState) -> Vec<f64> {
    state
        .keystrokes
        .iter()
        .filter(|k| k.phase == KeyPhase::Down)
        .map(|k| k.time)
        .collect()
}

fn intervals(times: &[f64]) -> Vec<f64> {
    times.windows(2).map(|w| w[1] - w[0]).collect()
}

fn analyze_mouse(state: &EventState, out: &mut Vec<Signal>) {
    let moves = &state.mouse_moves;

    if moves.len() < MIN_MOUSE_MOVES {
        out.push(Signal::new("mouse.insufficient_data", moves.len(), 2));
    } else {
        // Direction angles of actual displacements
        let angles: Vec<f64> = moves
            .iter()
            .filter(|m| m.dx != 0.0 || m.dy != 0.0)
            .map(|m| m.dy.atan2(m.dx))
            .collect();

        if angles.len() >= 2 {
            let straight = angles
                .windows(2)
                .filter(|w| (w[1] - w[0]).cos().abs() > 0.99)
                .count();
            let ratio = straight as f64 / (angles.len() - 1) as f64;
            if ratio > 0.3 {
                out.push(Signal::new("mouse.linear_movement", ratio, 3));
            }
        }

        if let Some(speed) = moves
            .iter()
            .filter_map(|m| m.velocity)
            .find(|v| *v > MAX_MOUSE_SPEED)
        {
            out.push(Signal::new("mouse.teleport", speed, 8));
        }

        let duration = state.duration();
        if duration > 0.0 && (moves.len() as f64) < duration / 5000.0 {
            out.push(Signal::new("mouse.sparse_movement", moves.len(), 5));
        }

        let velocities: Vec<f64> = moves.iter().filter_map(|m| m.velocity).collect();
        if velocities.len() >= 5 && variance(&velocities) < 0.1 {
            out.push(Signal::new(
                "mouse.constant_velocity",
                variance(&velocities),
                6,
            ));
        }
    }

    // Agents click and type without moving the mouse. Only meaningful once
    // evidence spans more than one page load.
    let actions = state.clicks.len() + keydown_times(state).len();
    if state.page_load_count >= 2 && actions >= 3 {
        let ratio = moves.len() as f64 / actions as f64;
        if ratio < 2.0 {
            out.push(Signal::new("comet.low_mouse_to_action_ratio", ratio, 10));
        } else if ratio < 5.0 {
            out.push(Signal::new("comet.low_mouse_to_action_ratio", ratio, 7));
        }
    }
}

fn analyze_clicks(state: &EventState, out: &mut Vec<Signal>) {
    let clicks = &state.clicks;
    if clicks.len() < MIN_CLICKS {
        return;
    }
    let n = clicks.len() as f64;

    let center_ratio = clicks
        .iter()
        .filter(|c| c.offset_from_center <= CENTER_TOLERANCE_PX)
        .count() as f64
        / n;
    if center_ratio > 0.5 {
        out.push(Signal::new("click.center_precision", center_ratio, 10));
    }

    let ultra_ratio = clicks
        .iter()
        .filter(|c| c.offset_from_center <= 2.0)
        .count() as f64
        / n;
    if ultra_ratio > 0.6 {
        out.push(Signal::new("comet.ultra_precise_center", ultra_ratio, 10));
    }

    let no_hover_ratio = clicks.iter().filter(|c| !c.preceding_hover).count() as f64 / n;
    if no_hover_ratio > 0.7 {
        out.push(Signal::new("click.no_hover", no_hover_ratio, 6));
    }

    let no_move_ratio = clicks.iter().filter(|c| !c.preceding_mouse_move).count() as f64 / n;
    if no_move_ratio > 0.5 {
        out.push(Signal::new("click.no_movement", no_move_ratio, 9));
    }

    if state.mouse_moves.len() < 2 * clicks.len() {
        out.push(Signal::new(
            "click.teleport_pattern",
            state.mouse_moves.len(),
            10,
        ));
    }

    let click_times: Vec<f64> = clicks.iter().map(|c| c.time).collect();
    let gaps = intervals(&click_times);

    if let Some(gap) = gaps.iter().find(|&&g| g < MIN_HUMAN_REACTION_MS) {
        out.push(Signal::new("click.superhuman_speed", *gap, 6));
    }

    if gaps.len() >= 3 && variance(&gaps) < PERFECT_TIMING_VARIANCE {
        out.push(Signal::new("click.perfect_timing", variance(&gaps), 8));
    }
}

fn analyze_keystrokes(state: &EventState, out: &mut Vec<Signal>) {
    let downs = keydown_times(state);
    if downs.len() < MIN_KEYSTROKES {
        return;
    }

    let gaps = intervals(&downs);

    if gaps.len() >= 5 && variance(&gaps) < PERFECT_TIMING_VARIANCE {
        out.push(Signal::new("keystroke.perfect_timing", variance(&gaps), 9));
    }

    if gaps.len() >= 10 && coefficient_of_variation(&gaps) < 0.1 {
        out.push(Signal::new(
            "comet.uniform_keystroke_cadence",
            coefficient_of_variation(&gaps),
            9,
        ));
    }

    let fast = gaps.iter().filter(|&&g| g < 30.0).count();
    if !gaps.is_empty() && fast as f64 / gaps.len() as f64 > 0.3 {
        out.push(Signal::new(
            "keystroke.superhuman_speed",
            fast as f64 / gaps.len() as f64,
            9,
        ));
    }

    let holds: Vec<f64> = state
        .keystrokes
        .iter()
        .filter_map(|k| k.hold_duration)
        .collect();

    if holds.len() >= 5 && variance(&holds) < 1.0 {
        out.push(Signal::new("keystroke.constant_hold", variance(&holds), 7));
    }

    if holds.len() >= 10 && coefficient_of_variation(&holds) < 0.1 {
        out.push(Signal::new(
            "comet.uniform_hold_duration",
            coefficient_of_variation(&holds),
            8,
        ));
    }
}

fn analyze_scrolls(state: &EventState, out: &mut Vec<Signal>) {
    let scrolls = &state.scrolls;
    if scrolls.is_empty() {
        return;
    }

    let jumps = scrolls
        .iter()
        .filter(|s| s.delta_time.is_some_and(|dt| dt < 10.0) && s.dy.abs() > 100.0)
        .count();
    if jumps as f64 / scrolls.len() as f64 > 0.5 {
        out.push(Signal::new("scroll.instant_jump", jumps, 6));
    }

    let amounts: Vec<f64> = scrolls
        .iter()
        .filter(|s| s.delta_time.is_some())
        .map(|s| s.dy.abs())
        .collect();
    if amounts.len() >= 3 && variance(&amounts) < 1.0 {
        out.push(Signal::new("scroll.constant_amount", variance(&amounts), 5));
    }
}

fn analyze_sequences(state: &EventState, out: &mut Vec<Signal>) {
    if state.clicks.len() >= MIN_CLICKS {
        let hover_ratio = state.hovers.len() as f64 / state.clicks.len() as f64;
        if hover_ratio < 2.0 {
            out.push(Signal::new("sequence.low_hover_ratio", hover_ratio, 5));
        }
    }

    let focuses = &state.focus_changes;
    if focuses.len() >= 3 {
        let keydowns = keydown_times(state);
        let direct = focuses
            .iter()
            .filter(|f| {
                let near_click = state.clicks.iter().any(|c| (c.time - f.time).abs() <= 100.0);
                let near_key = keydowns.iter().any(|k| (k - f.time).abs() <= 100.0);
                !near_click && !near_key
            })
            .count();

        if direct as f64 / focuses.len() as f64 > 0.5 {
            out.push(Signal::new("sequence.direct_focus", direct, 6));
        }
    }

    let focus_ins: Vec<_> = focuses
        .iter()
        .filter(|f| f.phase == FocusPhase::In)
        .collect();
    let rapid = focus_ins
        .windows(2)
        .any(|w| w[0].id != w[1].id && w[1].time - w[0].time <= 200.0);
    if rapid {
        out.push(Signal::new("comet.rapid_focus_sequence", true, 7));
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum ActionKind {
    Click,
    Key,
    Focus,
}

fn analyze_bursts(state: &EventState, out: &mut Vec<Signal>) {
    let mut actions: Vec<(f64, ActionKind)> = Vec::new();
    actions.extend(state.clicks.iter().map(|c| (c.time, ActionKind::Click)));
    actions.extend(keydown_times(state).iter().map(|t| (*t, ActionKind::Key)));
    actions.extend(
        state
            .focus_changes
            .iter()
            .map(|f| (f.time, ActionKind::Focus)),
    );
    actions.sort_by(|a, b| a.0.total_cmp(&b.0));

    // Non-overlapping 2-second windows holding at least five actions of
    // mixed kinds, plus the quiet time leading into each window.
    let mut bursts: Vec<f64> = Vec::new();
    let mut i = 0;
    while i < actions.len() {
        let window_start = actions[i].0;
        let mut j = i;
        while j < actions.len() && actions[j].0 < window_start + 2_000.0 {
            j += 1;
        }

        let window = &actions[i..j];
        let mixed = window
            .iter()
            .any(|(_, kind)| *kind != window[0].1);

        if window.len() >= 5 && mixed {
            let gap_before = if i == 0 {
                window_start - state.start_time
            } else {
                window_start - actions[i - 1].0
            };
            bursts.push(gap_before);
            i = j;
        } else {
            i += 1;
        }
    }

    if bursts.len() >= 2 {
        out.push(Signal::new("comet.action_burst", bursts.len(), 8));
    }

    if !bursts.is_empty() && bursts.iter().any(|gap| *gap >= 3_000.0) {
        out.push(Signal::new("comet.read_then_act", true, 9));
    }
}

fn analyze_pointer_gap(state: &EventState, out: &mut Vec<Signal>) {
    let clicks = &state.clicks;
    if clicks.len() < MIN_CLICKS {
        return;
    }
    let n = clicks.len() as f64;

    // Trusted input leaves a mousemove trail right before each click;
    // protocol-dispatched clicks do not.
    let bare = clicks
        .iter()
        .filter(|c| {
            !state
                .mouse_moves
                .iter()
                .any(|m| m.time >= c.time - 500.0 && m.time < c.time)
        })
        .count();
    if bare as f64 / n > 0.7 {
        out.push(Signal::new("comet.no_mousemove_trail", bare, 9));
    }

    let pointer_downs = state
        .pointer_events
        .iter()
        .filter(|p| p.kind == crate::recorder::PointerKind::Down)
        .count();
    if (pointer_downs as f64 / n) < 0.3 {
        out.push(Signal::new(
            "comet.missing_pointer_events",
            pointer_downs as f64 / n,
            7,
        ));
    }
}

/// Compose the interaction sub-score from the anomaly list
pub(crate) fn interaction_score(anomalies: &[Signal], total_events: usize) -> u32 {
    if anomalies.is_empty() {
        return 0;
    }

    let sum: f64 = anomalies.iter().map(|s| s.weight as f64).sum();
    let count = anomalies.len() as f64;
    let base = sum / (count * 10.0).max(30.0) * 100.0;

    let strong = anomalies
        .iter()
        .filter(|s| STRONG_SIGNALS.contains(&s.name.as_str()))
        .count();
    let multiplier = match strong {
        0 | 1 => 1.0,
        2 => 1.25,
        _ => 1.5,
    };

    let reliable = anomalies
        .iter()
        .any(|s| RELIABLE_SIGNALS.contains(&s.name.as_str()));
    let confidence = if total_events < 10 {
        if reliable {
            0.7
        } else {
            0.3
        }
    } else if total_events < 25 {
        0.85
    } else {
        1.0
    };

    (base * multiplier * confidence).min(100.0).round() as u32
}
