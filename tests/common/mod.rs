//! Common test utilities
//!
//! Shared harness and event-feeding helpers for the end-to-end scenario
//! tests.

use std::sync::Arc;
use std::time::Duration;

use agentdetect::host::{
    ElementInfo, MemoryStorage, MockTransport, PageEvent, Rect, SimulatedPage,
};
use agentdetect::DetectionEngine;

/// Build a page/storage/transport harness around a fresh engine
pub fn harness() -> (
    Arc<SimulatedPage>,
    Arc<MemoryStorage>,
    Arc<MockTransport>,
    Arc<DetectionEngine>,
) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let page = Arc::new(SimulatedPage::new());
    let storage = Arc::new(MemoryStorage::new());
    let transport = Arc::new(MockTransport::new());
    let engine = DetectionEngine::new(page.clone(), storage.clone(), transport.clone());
    (page, storage, transport, engine)
}

/// Wait until the engine's recorder has ingested at least `generation`
/// store mutations
pub async fn drain_events(engine: &DetectionEngine, generation: u64) {
    for _ in 0..500 {
        if engine.recorder().generation() >= generation {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("recorder never reached generation {}", generation);
}

/// A clickable button whose rect is centered on (x, y)
pub fn button_at(node: u64, x: f64, y: f64) -> ElementInfo {
    ElementInfo {
        node,
        tag: "button".to_string(),
        id: format!("option-{}", node),
        rect: Rect {
            x: x - 45.0,
            y: y - 16.0,
            width: 90.0,
            height: 32.0,
        },
        ..Default::default()
    }
}

/// Emit a click dead on the target center
pub fn center_click(page: &SimulatedPage, node: u64, x: f64, y: f64, time: f64) {
    page.emit(PageEvent::Click {
        x,
        y,
        time,
        target: button_at(node, x, y),
    });
}

/// Emit a human-looking click: hovered, approached, slightly off center,
/// with its pointerdown
pub fn human_click(page: &SimulatedPage, node: u64, x: f64, y: f64, time: f64) {
    page.emit(PageEvent::MouseOver {
        node,
        time: time - 320.0,
    });
    page.emit(PageEvent::MouseMove {
        x: x - 14.0,
        y: y + 9.0,
        time: time - 160.0,
    });
    page.emit(PageEvent::PointerDown {
        x: x + 7.0,
        y: y - 5.0,
        time: time - 12.0,
        pointer_type: "mouse".to_string(),
    });
    page.emit(PageEvent::Click {
        x: x + 8.0,
        y: y - 6.0,
        time,
        target: button_at(node, x, y),
    });
    page.emit(PageEvent::MouseOut {
        node,
        time: time + 90.0,
    });
}

/// Emit a wandering mouse trail: fast sweeps alternating with slow jitter
pub fn wander(page: &SimulatedPage, start: f64, count: usize) -> f64 {
    let (mut x, mut y, mut t) = (500.0, 350.0, start);
    let mut seed: u64 = 41;
    let mut rand = move || {
        seed = seed
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (seed >> 33) as f64
    };

    for i in 0..count {
        if i % 3 == 0 {
            x += (rand() % 241.0) - 120.0;
            y += (rand() % 241.0) - 120.0;
            t += 40.0 + (rand() % 40.0);
        } else {
            x += (rand() % 11.0) - 5.0;
            y += (rand() % 11.0) - 5.0;
            t += 90.0 + (rand() % 120.0);
        }
        page.emit(PageEvent::MouseMove { x, y, time: t });
    }

    t
}

/// Emit keydown/keyup pairs with the given cadence schedule
pub fn type_keys(page: &SimulatedPage, start: f64, gaps: &[f64], holds: &[f64]) -> f64 {
    let mut t = start;
    for (gap, hold) in gaps.iter().zip(holds.iter().cycle()) {
        t += gap;
        page.emit(PageEvent::KeyDown {
            key: "a".to_string(),
            time: t,
        });
        page.emit(PageEvent::KeyUp {
            key: "a".to_string(),
            time: t + hold,
        });
    }
    t
}
