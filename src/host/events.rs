//! Page event stream types
//!
//! The host forwards raw DOM events into the engine as `PageEvent` values
//! over a broadcast channel. Element nodes are described by `ElementInfo`,
//! a small structural descriptor; the opaque `node` identity is only valid
//! within the current page and is never serialized.

use serde::{Deserialize, Serialize};

/// Bounding rectangle of an element, in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    /// Center point of the rectangle
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Computed CSS position of an element
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CssPosition {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

/// Structural descriptor of a DOM element
///
/// `node` is a host-assigned identity used for recency comparisons (hover
/// versus click target); it has no meaning across page loads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementInfo {
    pub node: u64,
    pub tag: String,
    pub id: String,
    pub classes: String,
    pub src: Option<String>,
    pub href: Option<String>,
    /// Text content, populated only for leaf elements
    pub text: Option<String>,
    /// `type` attribute, populated for form controls
    pub input_type: Option<String>,
    /// Names of `data-*` attributes present on the element
    pub data_attrs: Vec<String>,
    pub rect: Rect,
    pub z_index: Option<i32>,
    pub position: CssPosition,
    pub has_shadow_root: bool,
    pub is_leaf: bool,
}

/// An event observed on the host page
///
/// Input events carry the host's own event timestamp in milliseconds; all
/// timing analysis uses these values, never the engine's wall clock.
#[derive(Debug, Clone)]
pub enum PageEvent {
    MouseMove {
        x: f64,
        y: f64,
        time: f64,
    },
    MouseDown {
        time: f64,
    },
    MouseUp {
        time: f64,
    },
    Click {
        x: f64,
        y: f64,
        time: f64,
        target: ElementInfo,
    },
    MouseOver {
        node: u64,
        time: f64,
    },
    MouseOut {
        node: u64,
        time: f64,
    },
    KeyDown {
        key: String,
        time: f64,
    },
    KeyUp {
        key: String,
        time: f64,
    },
    Scroll {
        x: f64,
        y: f64,
        time: f64,
    },
    FocusIn {
        target: ElementInfo,
        time: f64,
    },
    FocusOut {
        target: ElementInfo,
        time: f64,
    },
    PointerDown {
        x: f64,
        y: f64,
        time: f64,
        pointer_type: String,
    },
    PointerMove {
        x: f64,
        y: f64,
        time: f64,
        pointer_type: String,
    },
    /// An element (plus its flattened descendants) was added to the body
    NodesAdded {
        nodes: Vec<ElementInfo>,
        time: f64,
    },
    /// An observed attribute changed on an existing element
    AttributeChanged {
        element: ElementInfo,
        attribute: String,
        time: f64,
    },
    /// The document became hidden
    VisibilityHidden,
    /// The page is about to unload
    BeforeUnload,
}
