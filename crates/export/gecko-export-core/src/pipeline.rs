//! End-to-end conversion: ingest, transform, reduce, emit.

use std::io::Write;

use tracing::{debug, warn};

use crate::config::TransformConfig;
use crate::data::{Channel, TimelineSet};
use crate::emit::{build_document, write_document, AnimationDocument, ClipTiming, EmitOptions};
use crate::error::ExportError;
use crate::ingest::ingest_json;
use crate::reduce::{reduce_timeline, ReduceOptions, ReducedBone};
use crate::transform::transform_timeline;

/// What to do when one bone's scale cannot be normalized.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DegenerateScalePolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Leave the bone out of the document.
    SkipBone,
}

/// Stage options beyond the transform config.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvertOptions {
    pub reduce: ReduceOptions,
    pub emit: EmitOptions,
    pub degenerate_scale: DegenerateScalePolicy,
}

impl ConvertOptions {
    pub fn validate(&self) -> Result<(), ExportError> {
        self.reduce.validate()?;
        if self.emit.animation_name.trim().is_empty() {
            return Err(ExportError::config("animationName", "must be non-empty"));
        }
        Ok(())
    }
}

/// Transform and reduce every bone, honoring the degenerate-scale policy.
pub fn reduce_all(
    timelines: &TimelineSet,
    config: &TransformConfig,
    options: &ConvertOptions,
) -> Result<Vec<ReducedBone>, ExportError> {
    let mut reduced = Vec::with_capacity(timelines.len());
    for timeline in timelines.iter() {
        let transformed = match transform_timeline(timeline, config) {
            Ok(t) => t,
            Err(err @ ExportError::DegenerateScale { .. })
                if options.degenerate_scale == DegenerateScalePolicy::SkipBone =>
            {
                warn!("convert: skipping bone '{}': {}", timeline.name(), err);
                continue;
            }
            Err(err) => return Err(err),
        };
        reduced.push(reduce_timeline(&transformed, &options.reduce)?);
    }
    Ok(reduced)
}

/// Convert already-ingested timelines into a document.
pub fn convert(
    timelines: &TimelineSet,
    config: &TransformConfig,
    options: &ConvertOptions,
) -> Result<AnimationDocument, ExportError> {
    config.validate()?;
    options.validate()?;

    let reduced = reduce_all(timelines, config, options)?;
    let timing = ClipTiming::from_span(timelines.frame_span(), config.frame_rate);
    let channels: Vec<Channel> = Channel::ALL
        .into_iter()
        .filter(|c| config.channels.includes(*c))
        .collect();

    debug!(
        "convert: {} of {} bones, {} frames from frame {}",
        reduced.len(),
        timelines.len(),
        timing.frame_count,
        timing.start_frame
    );
    Ok(build_document(&reduced, &channels, timing, &options.emit))
}

/// JSON records in, JSON document out. Configuration is checked before the
/// input is parsed.
pub fn convert_json(
    input: &str,
    config: &TransformConfig,
    options: &ConvertOptions,
) -> Result<String, ExportError> {
    let mut buffer = Vec::new();
    convert_to_writer(input, config, options, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| ExportError::Serialization {
        reason: e.to_string(),
    })
}

/// Like [`convert_json`] but streams into `writer`. Nothing is written unless
/// every stage succeeds.
pub fn convert_to_writer<W: Write>(
    input: &str,
    config: &TransformConfig,
    options: &ConvertOptions,
    writer: W,
) -> Result<(), ExportError> {
    config.validate()?;
    options.validate()?;
    let timelines = ingest_json(input)?;
    let document = convert(&timelines, config, options)?;
    write_document(writer, &document)
}
