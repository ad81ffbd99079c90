//! `strata-capture` holds the data model for a captured GPU command stream.
//!
//! A capture is a sequence of submits, each referencing indirect buffers of
//! 32-bit PM4 words that live in a simulated GPU virtual address space. This
//! crate provides:
//! - The capture container types ([`Capture`], [`SubmitInfo`],
//!   [`IndirectBufferInfo`], [`PresentInfo`]).
//! - Read-only access to the simulated address space (see [`MemoryView`]).
//!
//! Capture acquisition (device orchestration, file-format parsing) lives in
//! external tooling; this crate only models what the analysis core consumes.

mod capture;
mod memory;
mod submit;

pub use capture::{Capture, PresentInfo, PresentSurfaceInfo};
pub use memory::{MemoryError, MemoryView, VecMemoryView};
pub use submit::{EngineType, IndirectBufferInfo, QueueType, SubmitInfo};
