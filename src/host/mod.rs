//! # Host page abstraction
//!
//! The engine never touches a real DOM, storage area or network socket
//! directly. Everything impure is reached through the traits defined here,
//! so the whole engine runs unmodified against the simulated host used by
//! the test suite.
//!
//! ## Module structure
//! - `traits`: the `HostPage`, `TabStorage` and `ReportTransport` seams
//! - `events`: the page event stream and element descriptors
//! - `http`: reqwest-backed transport for the signed RPC and unload beacon
//! - `mock`: simulated host implementations for tests and development

pub mod events;
pub mod traits;

pub mod http;
pub mod mock;

pub use events::{CssPosition, ElementInfo, PageEvent, Rect};
pub use traits::{
    HostPage, NavigatorInfo, ReportTransport, SignalReport, SignalType, TabStorage, WebglInfo,
    WindowMetrics,
};

pub use http::HttpTransport;
pub use mock::{MemoryStorage, MockTransport, SimulatedPage};
