//! Keyframe reduction: dense per-frame values to sparse per-axis tracks.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::axis::Axis;
use crate::data::{BoneTimeline, Channel, Interpolation};
use crate::error::ExportError;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReduceOptions {
    /// Largest change from the last kept key that may be dropped. Zero keeps
    /// every change (lossless).
    pub epsilon: f64,
}

impl Default for ReduceOptions {
    fn default() -> Self {
        Self { epsilon: 0.0 }
    }
}

impl ReduceOptions {
    pub fn lossy(epsilon: f64) -> Self {
        Self { epsilon }
    }

    pub fn validate(&self) -> Result<(), ExportError> {
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(ExportError::config(
                "epsilon",
                format!("must be finite and non-negative, got {}", self.epsilon),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackKey {
    pub frame: u32,
    pub value: f64,
    /// Interpolation from this key to the next.
    pub interpolation: Interpolation,
}

/// Sparse keys for one axis of one channel, ordered by frame.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputTrack {
    keys: Vec<TrackKey>,
}

impl OutputTrack {
    pub fn keys(&self) -> &[TrackKey] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn key_at(&self, frame: u32) -> Option<&TrackKey> {
        self.keys
            .binary_search_by_key(&frame, |k| k.frame)
            .ok()
            .map(|i| &self.keys[i])
    }

    /// Decode the track at `frame`, clamping outside the keyed range.
    pub fn sample(&self, frame: f64) -> Option<f64> {
        let first = self.keys.first()?;
        let last = self.keys.last()?;
        if frame <= f64::from(first.frame) {
            return Some(first.value);
        }
        if frame >= f64::from(last.frame) {
            return Some(last.value);
        }

        // First key strictly after `frame`; never 0 or len here.
        let right = self.keys.partition_point(|k| f64::from(k.frame) <= frame);
        let a = &self.keys[right - 1];
        let b = &self.keys[right];
        let t = (frame - f64::from(a.frame)) / f64::from(b.frame - a.frame);

        let value = match a.interpolation {
            Interpolation::Step => a.value,
            Interpolation::Linear | Interpolation::Other(_) => a.value + (b.value - a.value) * t,
            Interpolation::CatmullRom => {
                let p0 = if right >= 2 { self.keys[right - 2].value } else { a.value };
                let p3 = self.keys.get(right + 1).map_or(b.value, |k| k.value);
                catmull_rom(p0, a.value, b.value, p3, t)
            }
        };
        Some(value)
    }
}

#[inline]
fn catmull_rom(p0: f64, p1: f64, p2: f64, p3: f64, t: f64) -> f64 {
    let t2 = t * t;
    let t3 = t2 * t;
    0.5 * ((2.0 * p1)
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

/// Reduce one dense `(frame, value, interpolation)` sequence.
///
/// Keeps the first and last entries, every entry that moved more than
/// `epsilon` away from the last kept key, every entry whose interpolation
/// differs from the last kept key's, and the final frame of an exact hold
/// that precedes a value change. The hold end is what makes linear decoding
/// reproduce the dense values when `epsilon` is zero.
pub fn reduce_values(dense: &[(u32, f64, Interpolation)], epsilon: f64) -> OutputTrack {
    let key = |i: usize| TrackKey {
        frame: dense[i].0,
        value: dense[i].1,
        interpolation: dense[i].2.clone(),
    };

    let mut keys = Vec::new();
    if dense.is_empty() {
        return OutputTrack { keys };
    }
    keys.push(key(0));
    let mut kept = 0usize;

    for i in 1..dense.len() {
        let moved = (dense[i].1 - dense[kept].1).abs() > epsilon;
        let mode_changed = dense[i].2 != dense[kept].2;
        let is_last = i + 1 == dense.len();
        if !moved && !mode_changed && !is_last {
            continue;
        }
        if moved && i - 1 > kept && dense[i - 1].1 == dense[kept].1 {
            keys.push(key(i - 1));
        }
        keys.push(key(i));
        kept = i;
    }
    OutputTrack { keys }
}

/// The three axis tracks of one channel.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisTracks {
    pub x: OutputTrack,
    pub y: OutputTrack,
    pub z: OutputTrack,
}

impl AxisTracks {
    pub fn axis(&self, axis: Axis) -> &OutputTrack {
        match axis {
            Axis::X => &self.x,
            Axis::Y => &self.y,
            Axis::Z => &self.z,
        }
    }

    fn axis_mut(&mut self, axis: Axis) -> &mut OutputTrack {
        match axis {
            Axis::X => &mut self.x,
            Axis::Y => &mut self.y,
            Axis::Z => &mut self.z,
        }
    }
}

/// Sparse tracks for every channel of one bone.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReducedBone {
    pub name: String,
    pub location: AxisTracks,
    pub rotation: AxisTracks,
    pub scale: AxisTracks,
}

impl ReducedBone {
    pub fn channel(&self, channel: Channel) -> &AxisTracks {
        match channel {
            Channel::Location => &self.location,
            Channel::Rotation => &self.rotation,
            Channel::Scale => &self.scale,
        }
    }

    fn channel_mut(&mut self, channel: Channel) -> &mut AxisTracks {
        match channel {
            Channel::Location => &mut self.location,
            Channel::Rotation => &mut self.rotation,
            Channel::Scale => &mut self.scale,
        }
    }
}

/// Reduce every channel and axis of a (transformed) timeline.
pub fn reduce_timeline(
    timeline: &BoneTimeline,
    options: &ReduceOptions,
) -> Result<ReducedBone, ExportError> {
    if timeline.is_empty() {
        return Err(ExportError::EmptyTimeline {
            bone: timeline.name().to_string(),
        });
    }

    let mut reduced = ReducedBone {
        name: timeline.name().to_string(),
        location: AxisTracks::default(),
        rotation: AxisTracks::default(),
        scale: AxisTracks::default(),
    };
    let mut dense = Vec::with_capacity(timeline.len());
    let mut kept = 0usize;
    for channel in Channel::ALL {
        for axis in Axis::ALL {
            dense.clear();
            dense.extend(
                timeline
                    .samples()
                    .iter()
                    .map(|s| (s.frame, s.channel(channel)[axis.index()], s.interpolation())),
            );
            let track = reduce_values(&dense, options.epsilon);
            kept += track.len();
            *reduced.channel_mut(channel).axis_mut(axis) = track;
        }
    }

    debug!(
        "reduce: bone '{}' kept {} of {} axis keys",
        timeline.name(),
        kept,
        timeline.len() * 9
    );
    Ok(reduced)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense(values: &[f64]) -> Vec<(u32, f64, Interpolation)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as u32 + 1, *v, Interpolation::Linear))
            .collect()
    }

    fn frames(track: &OutputTrack) -> Vec<u32> {
        track.keys().iter().map(|k| k.frame).collect()
    }

    #[test]
    fn keeps_changes_plus_first_and_last() {
        let track = reduce_values(&dense(&[0.0, 1.0, 1.0]), 0.0);
        assert_eq!(frames(&track), vec![1, 2, 3]);

        let flat = reduce_values(&dense(&[5.0, 5.0, 5.0, 5.0]), 0.0);
        assert_eq!(frames(&flat), vec![1, 4]);

        let single = reduce_values(&dense(&[5.0]), 0.0);
        assert_eq!(frames(&single), vec![1]);
    }

    #[test]
    fn hold_end_is_kept_before_a_change() {
        let values = [0.0, 1.0, 1.0, 1.0, 0.0, 0.0];
        let track = reduce_values(&dense(&values), 0.0);
        assert_eq!(frames(&track), vec![1, 2, 4, 5, 6]);
        for (i, v) in values.iter().enumerate() {
            assert_eq!(track.sample(i as f64 + 1.0), Some(*v));
        }
    }

    #[test]
    fn interpolation_change_on_a_hold_is_kept() {
        let mut d = dense(&[2.0, 2.0, 2.0, 2.0, 2.0]);
        d[2].2 = Interpolation::Step;
        d[3].2 = Interpolation::Step;
        let track = reduce_values(&d, 0.0);
        assert_eq!(frames(&track), vec![1, 3, 5]);
        assert_eq!(track.key_at(3).unwrap().interpolation, Interpolation::Step);
        assert_eq!(track.key_at(5).unwrap().interpolation, Interpolation::Linear);
    }

    #[test]
    fn unknown_interpolation_decodes_linearly() {
        let mut d = dense(&[0.0, 4.0]);
        d[0].2 = Interpolation::Other("bezier".into());
        let track = reduce_values(&d, 0.0);
        assert_eq!(track.sample(1.5), Some(2.0));
        assert_eq!(
            track.keys()[0].interpolation,
            Interpolation::Other("bezier".into())
        );
    }

    #[test]
    fn epsilon_drops_small_wobble() {
        let track = reduce_values(&dense(&[0.0, 0.01, -0.01, 0.02, 1.0, 1.0]), 0.05);
        assert_eq!(frames(&track), vec![1, 5, 6]);
    }

    #[test]
    fn step_and_catmullrom_decode() {
        let mut d = dense(&[0.0, 2.0, 4.0]);
        d[0].2 = Interpolation::Step;
        let track = reduce_values(&d, 0.0);
        assert_eq!(track.sample(1.5), Some(0.0));

        let mut c = dense(&[0.0, 1.0, 2.0, 3.0]);
        for entry in &mut c {
            entry.2 = Interpolation::CatmullRom;
        }
        let track = reduce_values(&c, 0.0);
        // Catmull-Rom through evenly spaced collinear points stays on the line.
        let v = track.sample(2.5).unwrap();
        assert!((v - 1.5).abs() < 1e-12, "{v}");
    }

    #[test]
    fn empty_timeline_is_an_error() {
        let empty = BoneTimeline::new("ghost", Vec::new()).unwrap();
        let err = reduce_timeline(&empty, &ReduceOptions::default()).unwrap_err();
        assert_eq!(err, ExportError::EmptyTimeline { bone: "ghost".into() });
    }

    #[test]
    fn rejects_negative_epsilon() {
        assert!(ReduceOptions::lossy(-1.0).validate().is_err());
        assert!(ReduceOptions::lossy(f64::NAN).validate().is_err());
        assert!(ReduceOptions::lossy(0.001).validate().is_ok());
    }
}
