//! Horde Render - Batched Draw Grouping
//!
//! Groups live agents by kind for instanced drawing. The renderer itself is
//! out of scope; this crate produces the per-instance data it consumes.
//!
//! # Features
//!
//! - Per-kind membership rebuilt only when marked dirty
//! - Draw chunks of at most [`MAX_BATCH`] instances
//! - GPU-ready `InstanceData` (model matrix plus animation slice)
//!
//! # Example
//!
//! ```ignore
//! use horde_render::prelude::*;
//!
//! if grouper.is_dirty() {
//!     grouper.rebuild(agents.iter().map(to_render_input));
//! }
//! for batch in grouper.batches(|id| lookup(id)) {
//!     // upload batch.as_bytes(), draw batch.len() instances of batch.kind
//! }
//! ```

pub mod grouper;
pub mod instance;

pub mod prelude {
    pub use crate::grouper::{DrawBatch, RenderGrouper, RenderStats, MAX_BATCH};
    pub use crate::instance::{anim_slice, kind_scale, InstanceData, RenderInput};
}

pub use prelude::*;
