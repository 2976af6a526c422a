//! Per-bone channel transforms: axis swap, sign inversion, rotation unwrap,
//! rotation zeroing, scale normalization and location offsets.
//!
//! Every function here is pure: the input timeline is never touched and the
//! returned timeline has exactly the same frames.

use tracing::debug;

use crate::axis::{Axis, Vec3};
use crate::config::TransformConfig;
use crate::data::{BoneTimeline, Channel, KeyframeSample};
use crate::error::ExportError;
use crate::rotation::unwrap_triple;

/// Apply `config` to one bone.
///
/// Location: multiplier, swap, invert, then optional zeroing against frame 1.
/// Rotation: degrees, swap, invert, unwrap, then optional zeroing as an
/// orientation delta. Scale: swap, invert, then optional division by frame 1
/// when the scale channel is exported.
pub fn transform_timeline(
    timeline: &BoneTimeline,
    config: &TransformConfig,
) -> Result<BoneTimeline, ExportError> {
    let samples = timeline.samples();
    if samples.is_empty() {
        return Ok(timeline.with_samples(Vec::new()));
    }

    let locations = transform_locations(samples, config);
    let rotations = transform_rotations(samples, config);
    let scales = transform_scales(timeline.name(), samples, config)?;

    let out: Vec<KeyframeSample> = samples
        .iter()
        .zip(locations)
        .zip(rotations)
        .zip(scales)
        .map(|(((sample, location), rotation), scale)| KeyframeSample {
            frame: sample.frame,
            location,
            rotation,
            scale,
            interpolation: sample.interpolation.clone(),
        })
        .collect();

    debug!(
        "transform: bone '{}' ({} samples)",
        timeline.name(),
        out.len()
    );
    Ok(timeline.with_samples(out))
}

/// Swap then invert, the shared first two steps of every channel.
#[inline]
pub fn remap_axes(config: &TransformConfig, channel: Channel, v: Vec3) -> Vec3 {
    config.invert(channel).apply(config.swap(channel).apply(v))
}

fn transform_locations(samples: &[KeyframeSample], config: &TransformConfig) -> Vec<Vec3> {
    let k = config.location_multiplier;
    let mut out: Vec<Vec3> = samples
        .iter()
        .map(|s| {
            let scaled = [s.location[0] * k, s.location[1] * k, s.location[2] * k];
            remap_axes(config, Channel::Location, scaled)
        })
        .collect();

    if config.zero_location_at_start {
        let base = out[0];
        for v in &mut out {
            *v = [v[0] - base[0], v[1] - base[1], v[2] - base[2]];
        }
    }
    out
}

fn transform_rotations(samples: &[KeyframeSample], config: &TransformConfig) -> Vec<Vec3> {
    let units = config.rotation_units;
    let mut out: Vec<Vec3> = samples
        .iter()
        .map(|s| {
            let degrees = [
                units.to_degrees(s.rotation[0]),
                units.to_degrees(s.rotation[1]),
                units.to_degrees(s.rotation[2]),
            ];
            remap_axes(config, Channel::Rotation, degrees)
        })
        .collect();

    if config.closest_axis_unwrap {
        unwrap_in_place(&mut out, config.unwrap_max_shift);
    }

    if config.zero_rotation_at_start {
        let order = config.rotation_order;
        let baseline = out[0];
        let mut zeroed: Vec<Vec3> = Vec::with_capacity(out.len());
        zeroed.push([0.0; 3]);
        zeroed.extend(out[1..].iter().map(|r| order.relative(baseline, *r)));
        // Re-extraction lands in the principal range; restore continuity.
        if config.closest_axis_unwrap {
            unwrap_in_place(&mut zeroed, config.unwrap_max_shift);
        }
        out = zeroed;
    }
    out
}

fn unwrap_in_place(values: &mut [Vec3], max_shift: Option<u32>) {
    for i in 1..values.len() {
        values[i] = unwrap_triple(values[i - 1], values[i], max_shift);
    }
}

fn transform_scales(
    bone: &str,
    samples: &[KeyframeSample],
    config: &TransformConfig,
) -> Result<Vec<Vec3>, ExportError> {
    let mut out: Vec<Vec3> = samples
        .iter()
        .map(|s| remap_axes(config, Channel::Scale, s.scale))
        .collect();

    // Only an emitted scale channel can be degenerate.
    if config.normalize_scale_at_start && config.channels.includes(Channel::Scale) {
        let base = out[0];
        if let Some(axis) = Axis::ALL.into_iter().find(|a| base[a.index()] == 0.0) {
            return Err(ExportError::DegenerateScale {
                bone: bone.to_string(),
                frame: samples[0].frame,
                axis,
            });
        }
        for v in &mut out {
            *v = [v[0] / base[0], v[1] / base[1], v[2] / base[2]];
        }
    }
    Ok(out)
}
