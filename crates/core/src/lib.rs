//! Core library for the keyframe retiming tool.
//!
//! The crate rewrites the spacing between consecutive keyframes inside a
//! selected time range. Timeline access goes through the [`TimelineStore`]
//! port so the same engine can drive a host application or the bundled
//! [`MemoryTimeline`]. Plans are computed by pure functions in [`plan`] and
//! written back in a collision-free order by [`apply`].

pub mod apply;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod plan;
pub mod store;
pub mod timeline;
pub mod tool;

pub use apply::apply_plan;
pub use config::ToolConfig;
pub use cursor::CursorTarget;
pub use engine::{retime, RetimeReport, RetimeRequest};
pub use error::{Result, RetimeError};
pub use plan::{build_plan, compute_plan, RetimePolicy, TimePlan, MIN_SPACING};
pub use store::{Direction, TimelineStore, UndoChunk};
pub use timeline::{FrameTime, KeyframeChange, MemoryTimeline, SelectedRange};
pub use tool::{PresetButton, RetimeTool};
