//! Analyzer tests: anomaly catalog, scoring, agent tiering

use std::sync::Arc;
use std::time::Duration;

use super::agent::{agent_score, extract_agent_signals, AgentAssessment};
use super::interaction::{analyze_state, Analyzer};
use crate::fingerprint::FingerprintCollector;
use crate::host::{ElementInfo, MemoryStorage, PageEvent, Rect, SimulatedPage};
use crate::injection::InjectionObserver;
use crate::recorder::recorder::ingest;
use crate::recorder::{EventRecorder, EventState};
use crate::signal::Signal;

fn names(report: &super::AnalysisReport) -> Vec<&str> {
    report.anomalies.iter().map(|s| s.name.as_str()).collect()
}

fn target_at(node: u64, x: f64, y: f64) -> ElementInfo {
    ElementInfo {
        node,
        tag: "button".to_string(),
        id: format!("answer-{}", node),
        rect: Rect {
            x: x - 40.0,
            y: y - 15.0,
            width: 80.0,
            height: 30.0,
        },
        ..Default::default()
    }
}

fn click(state: &mut EventState, x: f64, y: f64, time: f64, node: u64) {
    ingest(
        state,
        &PageEvent::Click {
            x,
            y,
            time,
            target: target_at(node, x, y),
        },
    );
}

fn key(state: &mut EventState, time: f64, hold: f64) {
    ingest(
        state,
        &PageEvent::KeyDown {
            key: "a".to_string(),
            time,
        },
    );
    ingest(
        state,
        &PageEvent::KeyUp {
            key: "a".to_string(),
            time: time + hold,
        },
    );
}

#[test]
fn test_empty_state_scores_near_zero() {
    let state = EventState::new(0.0);
    let report = analyze_state(&state);

    assert_eq!(names(&report), vec!["mouse.insufficient_data"]);
    assert!(report.score <= 5);
}

#[test]
fn test_human_session_scores_low() {
    let mut state = EventState::new(0.0);
    let mut seed: u64 = 7;
    let mut rand = move || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (seed >> 33) as f64
    };

    // A meandering mouse: quick sweeps between targets, slow jitter on them
    let (mut x, mut y, mut t) = (400.0, 300.0, 500.0);
    for i in 0..60 {
        if i % 3 == 0 {
            x += (rand() % 241.0) - 120.0;
            y += (rand() % 241.0) - 120.0;
            t += 40.0 + (rand() % 40.0);
        } else {
            x += (rand() % 11.0) - 5.0;
            y += (rand() % 11.0) - 5.0;
            t += 90.0 + (rand() % 120.0);
        }
        ingest(&mut state, &PageEvent::MouseMove { x, y, time: t });
    }

    // Five deliberate clicks, each hovered and approached
    let mut click_time = t + 800.0;
    for i in 0..5u64 {
        let (cx, cy) = (200.0 + i as f64 * 90.0, 400.0);
        ingest(
            &mut state,
            &PageEvent::MouseOver {
                node: i,
                time: click_time - 300.0,
            },
        );
        ingest(
            &mut state,
            &PageEvent::MouseOut {
                node: i,
                time: click_time + 80.0,
            },
        );
        ingest(
            &mut state,
            &PageEvent::MouseMove {
                x: cx + 12.0,
                y: cy - 8.0,
                time: click_time - 150.0,
            },
        );
        ingest(
            &mut state,
            &PageEvent::PointerDown {
                x: cx + 6.0,
                y: cy + 4.0,
                time: click_time - 10.0,
                pointer_type: "mouse".to_string(),
            },
        );
        ingest(
            &mut state,
            &PageEvent::Click {
                x: cx + 9.0,
                y: cy + 6.0,
                time: click_time,
                target: target_at(i, cx, cy),
            },
        );
        click_time += 400.0 + (rand() % 500.0);
    }

    // Typing with a broad inter-key distribution
    let mut key_time = click_time + 2_000.0;
    for _ in 0..25 {
        key(&mut state, key_time, 55.0 + (rand() % 70.0));
        key_time += 90.0 + (rand() % 220.0);
    }

    // Scrolls of varying amounts
    let mut scroll_y = 0.0;
    for i in 0..6 {
        scroll_y += 120.0 + (i as f64 * 37.0);
        ingest(
            &mut state,
            &PageEvent::Scroll {
                x: 0.0,
                y: scroll_y,
                time: key_time + i as f64 * 700.0,
            },
        );
    }

    let report = analyze_state(&state);

    assert!(report.score <= 20, "human score was {}", report.score);
    assert!(!report.anomalies.iter().any(|s| s.name.starts_with("comet.")));
    assert!(!report.anomalies.iter().any(|s| s.name.starts_with("click.")));
}

#[test]
fn test_cdp_bot_single_page() {
    let mut state = EventState::new(0.0);

    // Four pixel-exact center clicks, 120 ms apart, no mouse trail
    for i in 0..4u64 {
        click(&mut state, 140.0, 115.0, 1_000.0 + i as f64 * 120.0, i);
    }

    let report = analyze_state(&state);
    let found = names(&report);

    for expected in [
        "mouse.insufficient_data",
        "click.center_precision",
        "comet.ultra_precise_center",
        "click.no_hover",
        "click.no_movement",
        "click.teleport_pattern",
        "click.perfect_timing",
        "comet.no_mousemove_trail",
        "comet.missing_pointer_events",
        "sequence.low_hover_ratio",
    ] {
        assert!(found.contains(&expected), "missing {}", expected);
    }
    // 120 ms spacing is fast but not superhuman
    assert!(!found.contains(&"click.superhuman_speed"));
    assert!(report.score >= 60, "bot score was {}", report.score);
}

#[test]
fn test_uniform_typing() {
    let mut state = EventState::new(0.0);

    for i in 0..30 {
        // 85 ms cadence with a +-1 ms wobble, 40 ms holds within half a ms
        let jitter = match i % 3 {
            0 => -1.0,
            1 => 0.0,
            _ => 1.0,
        };
        let hold = 40.0 + if i % 2 == 0 { 0.5 } else { -0.5 };
        key(&mut state, 1_000.0 + i as f64 * 85.0 + jitter, hold);
    }

    let report = analyze_state(&state);
    let found = names(&report);

    for expected in [
        "keystroke.perfect_timing",
        "comet.uniform_keystroke_cadence",
        "keystroke.constant_hold",
        "comet.uniform_hold_duration",
    ] {
        assert!(found.contains(&expected), "missing {}", expected);
    }
    assert!(report.score >= 40, "uniform typing score was {}", report.score);
}

#[test]
fn test_read_then_act_bursts() {
    let mut state = EventState::new(0.0);

    for repeat in 0..3u64 {
        let base = repeat as f64 * 6_000.0 + 4_000.0;

        click(&mut state, 100.0, 100.0, base, repeat * 10);
        click(&mut state, 300.0, 100.0, base + 300.0, repeat * 10 + 1);
        for k in 0..4 {
            ingest(
                &mut state,
                &PageEvent::KeyDown {
                    key: "a".to_string(),
                    time: base + 500.0 + k as f64 * 150.0,
                },
            );
        }
        for f in 0..2 {
            ingest(
                &mut state,
                &PageEvent::FocusIn {
                    target: ElementInfo {
                        node: 77,
                        tag: "input".to_string(),
                        id: "response".to_string(),
                        ..Default::default()
                    },
                    time: base + 1_200.0 + f as f64 * 100.0,
                },
            );
        }
    }

    let report = analyze_state(&state);
    let found = names(&report);
    assert!(found.contains(&"comet.action_burst"));
    assert!(found.contains(&"comet.read_then_act"));
}

#[test]
fn test_superhuman_click_boundary() {
    // Exactly 50 ms apart: not superhuman (strict less-than)
    let mut state = EventState::new(0.0);
    for i in 0..4u64 {
        click(&mut state, 10.0 + i as f64, 10.0, 1_000.0 + i as f64 * 50.0, i);
    }
    assert!(!names(&analyze_state(&state)).contains(&"click.superhuman_speed"));

    // 49 ms apart: superhuman
    let mut state = EventState::new(0.0);
    for i in 0..4u64 {
        click(&mut state, 10.0 + i as f64, 10.0, 1_000.0 + i as f64 * 49.0, i);
    }
    assert!(names(&analyze_state(&state)).contains(&"click.superhuman_speed"));
}

#[test]
fn test_mouse_only_session_emits_no_click_or_key_signals() {
    let mut state = EventState::new(0.0);
    for i in 0..25 {
        ingest(
            &mut state,
            &PageEvent::MouseMove {
                x: i as f64 * 13.0,
                y: (i * i % 47) as f64,
                time: 100.0 + i as f64 * 85.0,
            },
        );
    }

    let report = analyze_state(&state);
    assert!(report
        .anomalies
        .iter()
        .all(|s| s.name.starts_with("mouse.")));
}

#[test]
fn test_cross_page_mouse_to_action_ratio() {
    let mut state = EventState::new(0.0);
    state.page_load_count = 2;

    for i in 0..5 {
        ingest(
            &mut state,
            &PageEvent::MouseMove {
                x: i as f64,
                y: 0.0,
                time: 100.0 + i as f64 * 50.0,
            },
        );
    }
    for i in 0..5u64 {
        click(&mut state, 140.0, 115.0, 1_000.0 + i as f64 * 400.0, i);
    }

    let report = analyze_state(&state);
    let ratio_signal = report
        .anomalies
        .iter()
        .find(|s| s.name == "comet.low_mouse_to_action_ratio")
        .expect("ratio signal present");
    // 5 moves over 5 actions: ratio 1, the hard variant
    assert_eq!(ratio_signal.weight, 10);
}

#[test]
fn test_ratio_requires_second_page_load() {
    let mut state = EventState::new(0.0);

    for i in 0..5u64 {
        click(&mut state, 140.0, 115.0, 1_000.0 + i as f64 * 400.0, i);
    }

    let report = analyze_state(&state);
    assert!(!names(&report).contains(&"comet.low_mouse_to_action_ratio"));
}

#[tokio::test]
async fn test_analysis_cache_invalidation() {
    let page = Arc::new(SimulatedPage::new());
    let storage = Arc::new(MemoryStorage::new());
    let recorder = EventRecorder::new(page.clone(), storage, 0.0);
    let analyzer = Analyzer::new();

    recorder.start_monitoring(None);

    page.emit(PageEvent::MouseMove {
        x: 1.0,
        y: 2.0,
        time: 10.0,
    });
    for _ in 0..200 {
        if recorder.generation() >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let first = analyzer.analyze(&recorder);
    let second = analyzer.analyze(&recorder);
    assert_eq!(first, second);

    // Any store mutation invalidates the cached report
    page.emit(PageEvent::MouseMove {
        x: 9.0,
        y: 9.0,
        time: 20.0,
    });
    for _ in 0..200 {
        if recorder.generation() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let third = analyzer.analyze(&recorder);
    assert_eq!(third.event_counts.mouse_moves, 2);

    recorder.stop_monitoring();
}

// ============================================================================
// Agent tiering
// ============================================================================

#[test]
fn test_agent_score_definitive() {
    let signals = vec![Signal::new("comet.extension.resource_probe", true, 10)];
    assert_eq!(agent_score(&signals), 80);

    let signals = vec![
        Signal::new("comet.extension.resource_probe", true, 10),
        Signal::new("comet.action_burst", 2, 8),
    ];
    assert_eq!(agent_score(&signals), 88);
}

#[test]
fn test_agent_score_tier1_with_tier2_support() {
    let signals = vec![
        Signal::new("comet.ultra_precise_center", 0.9, 10),
        Signal::new("comet.no_mousemove_trail", 4, 9),
        Signal::new("comet.missing_pointer_events", 0.0, 7),
    ];
    // (10 + 9 + 7) * 2
    assert_eq!(agent_score(&signals), 52);
}

#[test]
fn test_agent_score_tier1_alone() {
    let signals = vec![Signal::new("comet.ultra_precise_center", 0.9, 10)];
    assert_eq!(agent_score(&signals), 15);
}

#[test]
fn test_agent_score_tier2_capped_at_40() {
    let signals = vec![
        Signal::new("comet.action_burst", 3, 8),
        Signal::new("comet.read_then_act", true, 9),
        Signal::new("comet.uniform_keystroke_cadence", 0.02, 9),
        Signal::new("comet.uniform_hold_duration", 0.03, 8),
        Signal::new("comet.rapid_focus_sequence", true, 7),
    ];
    // Sum is 41; the temporal-only cap holds it at 40
    assert_eq!(agent_score(&signals), 40);
}

#[test]
fn test_agent_score_weight_gated_tier1() {
    // The ratio signal only counts as tier 1 at its hard weight
    let soft = vec![
        Signal::new("comet.low_mouse_to_action_ratio", 3.5, 7),
        Signal::new("comet.action_burst", 2, 8),
        Signal::new("comet.read_then_act", true, 9),
    ];
    assert_eq!(agent_score(&soft), (7 + 8 + 9).min(40));

    let hard = vec![
        Signal::new("comet.low_mouse_to_action_ratio", 1.0, 10),
        Signal::new("comet.action_burst", 2, 8),
        Signal::new("comet.read_then_act", true, 9),
    ];
    assert_eq!(agent_score(&hard), (10 + 8 + 9) * 2);
}

#[test]
fn test_agent_score_reserved_tier1_names() {
    let signals = vec![Signal::new("comet.zero_keystrokes", true, 9)];
    // Reserved name lands in tier 1: escalated, not capped
    assert_eq!(agent_score(&signals), 14);
}

#[tokio::test]
async fn test_extract_agent_signals_sources() {
    let page = Arc::new(SimulatedPage::new());
    page.configure(|f| {
        f.navigator.webdriver = true;
        f.initial_webdriver = Some(false);
        f.resources
            .push("https://www.perplexity.ai/rest/sse/run".to_string());
    });
    let storage = Arc::new(MemoryStorage::new());

    let fingerprint = FingerprintCollector::new(page.clone(), storage).collect().await;

    let observer = InjectionObserver::new(page);
    observer.start_monitoring(false);
    let injection = observer.analyze();

    let anomalies = vec![
        Signal::new("comet.read_then_act", true, 9),
        Signal::new("click.no_hover", 0.8, 6),
    ];

    let extracted = extract_agent_signals(&anomalies, &fingerprint, &injection);
    let names: Vec<&str> = extracted.iter().map(|s| s.name.as_str()).collect();

    assert!(names.contains(&"comet.read_then_act"));
    assert!(names.contains(&"network.perplexity_agent"));
    assert!(names.contains(&"webdriver.changed_mid_session"));
    // Non-agent anomalies stay out of the agent list
    assert!(!names.contains(&"click.no_hover"));

    let assessment = AgentAssessment::from_signals(extracted);
    assert!(assessment.detected);
    // The network entry is definitive
    assert!(assessment.score >= 80);
}
