//! # Smart Format Worker
//!
//! Asynchronous hosting for the Smart Format Engine.
//!
//! - [`offload`]: runs transforms on a background worker with correlation
//!   ids, falling back to the calling task when the worker is gone.
//! - [`advisor`]: optional external layout advisor over HTTP JSON-RPC,
//!   always backed by the deterministic engine.
//!
//! ```text
//! caller ──TransformRequest──▶ worker (FormatEngine)
//!    ▲                              │
//!    └──oneshot◀── router ◀──TransformResponse
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod advisor;
pub mod offload;
pub mod protocol;

pub use advisor::{
    advise, Advice, AdviceSource, AdvisorConfig, AdvisorError, HttpLayoutAdvisor, LayoutAdvisor,
    RetryConfig,
};
pub use offload::{OffloadError, OffloadHandle, PendingTransform};
pub use protocol::{RequestId, TransformRequest, TransformResponse};
