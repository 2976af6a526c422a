//! gecko-export-core: baked keyframes to GeckoLib animation JSON.
//!
//! Pipeline: [`ingest`] parses per-frame records into per-bone timelines,
//! [`transform`] applies the [`TransformConfig`] corrections (axis swap,
//! inversion, unwrap, zeroing, normalization), [`reduce`] collapses dense
//! samples into sparse per-axis tracks, and [`emit`] writes the document.
//! [`pipeline`] chains the four.

pub mod axis;
pub mod config;
pub mod data;
pub mod emit;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod reduce;
pub mod rotation;
pub mod transform;

// Re-exports for consumers (host adapters)
pub use axis::{Axis, AxisInvert, AxisPermutation, Vec3};
pub use config::{AngleUnit, ChannelSelection, TransformConfig};
pub use data::{BoneTimeline, Channel, Interpolation, KeyframeSample, TimelineSet};
pub use emit::{AnimationDocument, EmitOptions, EmitStyle, LoopMode};
pub use error::ExportError;
pub use ingest::{ingest_json, ingest_records, InputRecord};
pub use pipeline::{convert, convert_json, convert_to_writer, ConvertOptions, DegenerateScalePolicy};
pub use reduce::{OutputTrack, ReduceOptions, ReducedBone};
pub use rotation::EulerOrder;
pub use transform::transform_timeline;

/// Result type used throughout the crate.
pub type Result<T> = core::result::Result<T, ExportError>;
