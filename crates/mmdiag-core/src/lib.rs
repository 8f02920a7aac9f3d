#![forbid(unsafe_code)]

//! Memory-map diagram model + layout (headless).
//!
//! Design goals:
//! - fail-fast validation: the model is fully checked before layout or
//!   rendering runs
//! - pure layout: collisions and free space are returned as a separate
//!   annotation record, never written back into the model
//! - deterministic, testable outputs

pub mod error;
pub mod layout;
pub mod model;

pub use error::{Error, Result};
pub use layout::{MapAnnotations, RegionStats, layout_diagram, layout_map};
pub use model::{Diagram, HexValue, MemoryMap, MemoryRegion};
