//! # Injection observer
//!
//! Watches the page for injected UI: answer overlays, homework-helper
//! widgets and agent-extension content roots. An initial scan walks every
//! element under the body once; afterwards mutation events keep the finding
//! set current. A host-element filter keeps platform chrome, editor
//! toolbars and utility-class styling out of the results.
//!
//! ## Module structure
//! - `patterns`: suspicious text/attribute registries and the host filter
//! - `observer`: scan and mutation analysis, grouped scoring

pub mod observer;
pub mod patterns;


pub use observer::{
    FindingKind, FindingSource, InjectionAnalysis, InjectionFinding, InjectionObserver,
    InjectionSignalGroup,
};
