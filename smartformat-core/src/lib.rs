//! # Smart Format Core
//!
//! Deterministic re-layout of a design across platform canvas formats.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              smartformat-core               │
//! ├─────────────────────────────────────────────┤
//! │  Transform Engine │  Presets                │
//! │  - Modes          │  - Role rules           │
//! │  - Flow           │  - Format matching      │
//! │  - Collisions     │  - Format catalogue     │
//! ├─────────────────────────────────────────────┤
//! │  Projects         │  Validator              │
//! │  - Master layout  │  - Bounds / size        │
//! │  - Overrides      │  - Readability          │
//! │  - Store, legacy  │  - Critical overlap     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Every transform works from an element's pristine geometry, so converting
//! a layout back and forth between formats never accumulates drift.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod collision;
pub mod context;
pub mod element;
pub mod engine;
pub mod error;
pub mod flow;
pub mod formats;
pub mod legacy;
pub mod modes;
pub mod preset;
pub mod project;
pub mod store;
pub mod validate;

pub use collision::{resolve_collisions, CollisionConfig};
pub use context::{LayoutContext, Orientation};
pub use element::{
    elements_from_json, Anchor, Bounds, Element, ElementId, ElementKind, Margin, Percentages, Pristine,
    ResponsiveMode, ResponsiveProps, Role, SizeConstraints,
};
pub use engine::{FormatEngine, TransformOptions, TransformOutcome};
pub use error::{FormatError, FormatResult};
pub use formats::{PlatformFormat, FORMATS};
pub use preset::{
    Dimension, FlowAlignment, FlowDescriptor, FlowDirection, LayoutPreset, PresetPosition,
    PresetRegistry, PresetSize, RoleRule, LANDSCAPE_PRESET, STORY_PRESET,
};
pub use project::{ElementOverride, FormatOverrideSet, ProjectLayout, ResolvedLayout};
pub use store::{
    FileBackend, KeyValueBackend, MemoryBackend, ProjectStore, ProjectSummary, StoreError,
};
pub use validate::{
    validate, validate_with, IssueKind, ValidationIssue, ValidationReport, ValidatorConfig,
};

/// Smart format core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
