//! Serialization of reduced tracks into the GeckoLib animation document.
//!
//! Output is diff-stable: bones sorted by name, channels in
//! position/rotation/scale order, components in x/y/z order, and every
//! number rounded to [`SIGNIFICANT_DIGITS`].

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::axis::{Axis, Vec3};
use crate::data::{Channel, Interpolation};
use crate::error::ExportError;
use crate::reduce::{AxisTracks, ReducedBone};

pub const FORMAT_VERSION: &str = "1.8.0";
pub const DEFAULT_ANIMATION_NAME: &str = "animation";
pub const SIGNIFICANT_DIGITS: usize = 6;

/// Magnitudes below this are float residue and are written as zero.
const NOISE_FLOOR: f64 = 1e-9;

/// Shape of each channel's keyframe list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EmitStyle {
    /// `[{ "time", "value", "interpolation" }, ...]`
    #[default]
    Array,
    /// GeckoLib native: `{ "<time>": { "vector", "lerp_mode"? }, ... }`
    Keyed,
}

/// The clip's `loop` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopMode {
    Once,
    Loop,
    HoldOnLastFrame,
}

impl Serialize for LoopMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LoopMode::Once => serializer.serialize_bool(false),
            LoopMode::Loop => serializer.serialize_bool(true),
            LoopMode::HoldOnLastFrame => serializer.serialize_str("hold_on_last_frame"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmitOptions {
    pub animation_name: String,
    pub style: EmitStyle,
    /// `None` omits the field.
    pub loop_mode: Option<LoopMode>,
    /// Drop a final entry that repeats the previous one. The runtime holds the
    /// last key and `animation_length` still spans the clip.
    pub collapse_trailing_hold: bool,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            animation_name: DEFAULT_ANIMATION_NAME.to_string(),
            style: EmitStyle::Array,
            loop_mode: None,
            collapse_trailing_hold: true,
        }
    }
}

impl EmitOptions {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.animation_name = name.into();
        self
    }

    pub fn with_style(mut self, style: EmitStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_loop_mode(mut self, loop_mode: LoopMode) -> Self {
        self.loop_mode = Some(loop_mode);
        self
    }

    pub fn with_collapse_trailing_hold(mut self, collapse: bool) -> Self {
        self.collapse_trailing_hold = collapse;
        self
    }
}

// ----- Output schema -----

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnimationDocument {
    pub format_version: String,
    pub animations: BTreeMap<String, AnimationClip>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnimationClip {
    #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
    pub loop_mode: Option<LoopMode>,
    pub animation_length: f64,
    pub bones: BTreeMap<String, BoneChannels>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BoneChannels {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<ChannelTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<ChannelTrack>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<ChannelTrack>,
}

impl BoneChannels {
    pub fn channel(&self, channel: Channel) -> Option<&ChannelTrack> {
        match channel {
            Channel::Location => self.position.as_ref(),
            Channel::Rotation => self.rotation.as_ref(),
            Channel::Scale => self.scale.as_ref(),
        }
    }

    fn set(&mut self, channel: Channel, track: ChannelTrack) {
        match channel {
            Channel::Location => self.position = Some(track),
            Channel::Rotation => self.rotation = Some(track),
            Channel::Scale => self.scale = Some(track),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChannelTrack {
    Array(Vec<ArrayEntry>),
    Keyed(IndexMap<String, KeyedEntry>),
}

impl ChannelTrack {
    pub fn len(&self) -> usize {
        match self {
            ChannelTrack::Array(entries) => entries.len(),
            ChannelTrack::Keyed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ArrayEntry {
    pub time: f64,
    pub value: Vec3,
    pub interpolation: Interpolation,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct KeyedEntry {
    pub vector: Vec3,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lerp_mode: Option<Interpolation>,
}

/// Round to [`SIGNIFICANT_DIGITS`] significant digits and flush residue.
pub fn round_significant(value: f64) -> f64 {
    if !value.is_finite() || value.abs() < NOISE_FLOOR {
        return if value.is_finite() { 0.0 } else { value };
    }
    let text = format!("{:.*e}", SIGNIFICANT_DIGITS - 1, value);
    text.parse::<f64>().unwrap_or(value) + 0.0
}

fn time_key(seconds: f64) -> String {
    if seconds.fract() == 0.0 {
        format!("{seconds:.1}")
    } else {
        format!("{seconds}")
    }
}

/// One merged entry of a channel before styling.
struct MergedKey {
    frame: u32,
    value: Vec3,
    interpolation: Interpolation,
}

/// Union of the three axis tracks: one entry per frame any axis keeps.
fn merge_axes(tracks: &AxisTracks, collapse_trailing_hold: bool) -> Vec<MergedKey> {
    let frames: BTreeSet<u32> = Axis::ALL
        .iter()
        .flat_map(|a| tracks.axis(*a).keys().iter().map(|k| k.frame))
        .collect();

    let mut merged: Vec<MergedKey> = Vec::with_capacity(frames.len());
    for frame in frames {
        let mut value = [0.0; 3];
        let mut interpolation = None;
        for axis in Axis::ALL {
            let track = tracks.axis(axis);
            if let Some(key) = track.key_at(frame) {
                value[axis.index()] = key.value;
                interpolation.get_or_insert_with(|| key.interpolation.clone());
            } else if let Some(v) = track.sample(f64::from(frame)) {
                value[axis.index()] = v;
            }
        }
        merged.push(MergedKey {
            frame,
            value: value.map(round_significant),
            interpolation: interpolation.unwrap_or_default(),
        });
    }

    if collapse_trailing_hold && merged.len() >= 2 {
        let n = merged.len();
        if merged[n - 1].value == merged[n - 2].value
            && merged[n - 1].interpolation == merged[n - 2].interpolation
        {
            merged.pop();
        }
    }
    merged
}

fn style_track(
    merged: Vec<MergedKey>,
    clip_start: u32,
    frame_rate: f64,
    style: EmitStyle,
) -> ChannelTrack {
    let time =
        |frame: u32| round_significant(f64::from(frame.saturating_sub(clip_start)) / frame_rate);
    match style {
        EmitStyle::Array => ChannelTrack::Array(
            merged
                .into_iter()
                .map(|k| ArrayEntry {
                    time: time(k.frame),
                    value: k.value,
                    interpolation: k.interpolation,
                })
                .collect(),
        ),
        EmitStyle::Keyed => ChannelTrack::Keyed(
            merged
                .into_iter()
                .map(|k| {
                    let lerp_mode = match k.interpolation {
                        Interpolation::Linear => None,
                        other => Some(other),
                    };
                    (
                        time_key(time(k.frame)),
                        KeyedEntry {
                            vector: k.value,
                            lerp_mode,
                        },
                    )
                })
                .collect(),
        ),
    }
}

/// Inputs describing the clip as a whole.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClipTiming {
    /// First frame of the clip; emitted at time zero.
    pub start_frame: u32,
    /// Sampled frames, both ends included.
    pub frame_count: u32,
    pub frame_rate: f64,
}

impl ClipTiming {
    /// Timing for an inclusive `(first, last)` frame span; `None` is an empty clip.
    pub fn from_span(span: Option<(u32, u32)>, frame_rate: f64) -> Self {
        let (start_frame, frame_count) = match span {
            Some((first, last)) => (first, last.saturating_sub(first) + 1),
            None => (0, 0),
        };
        Self {
            start_frame,
            frame_count,
            frame_rate,
        }
    }

    /// Every sampled frame occupies one frame of playback, so a clip keyed
    /// on frames 1..=3 lasts three frames.
    pub fn length_seconds(&self) -> f64 {
        round_significant(f64::from(self.frame_count) / self.frame_rate)
    }
}

/// Build the document for `bones`, emitting only the `channels` listed.
pub fn build_document(
    bones: &[ReducedBone],
    channels: &[Channel],
    timing: ClipTiming,
    options: &EmitOptions,
) -> AnimationDocument {
    let mut out_bones = BTreeMap::new();
    for bone in bones {
        let mut out = BoneChannels::default();
        for channel in Channel::ALL.into_iter().filter(|c| channels.contains(c)) {
            let merged = merge_axes(bone.channel(channel), options.collapse_trailing_hold);
            out.set(
                channel,
                style_track(merged, timing.start_frame, timing.frame_rate, options.style),
            );
        }
        out_bones.insert(bone.name.clone(), out);
    }
    debug!(
        "emit: {} bones into '{}' ({:?} style)",
        out_bones.len(),
        options.animation_name,
        options.style
    );

    let clip = AnimationClip {
        loop_mode: options.loop_mode,
        animation_length: timing.length_seconds(),
        bones: out_bones,
    };
    AnimationDocument {
        format_version: FORMAT_VERSION.to_string(),
        animations: BTreeMap::from([(options.animation_name.clone(), clip)]),
    }
}

/// Export to pretty JSON string
pub fn to_json_string(document: &AnimationDocument) -> Result<String, ExportError> {
    serde_json::to_string_pretty(document).map_err(ExportError::from)
}

/// Write pretty JSON to `writer`; the only side effect of the pipeline.
pub fn write_document<W: Write>(
    mut writer: W,
    document: &AnimationDocument,
) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, document)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reduce::reduce_values;

    fn axis_tracks(x: &[f64], y: &[f64], z: &[f64]) -> AxisTracks {
        let dense = |vals: &[f64]| {
            vals.iter()
                .enumerate()
                .map(|(i, v)| (i as u32 + 1, *v, Interpolation::Linear))
                .collect::<Vec<_>>()
        };
        AxisTracks {
            x: reduce_values(&dense(x), 0.0),
            y: reduce_values(&dense(y), 0.0),
            z: reduce_values(&dense(z), 0.0),
        }
    }

    #[test]
    fn rounds_to_six_significant_digits() {
        assert_eq!(round_significant(0.123456789), 0.123457);
        assert_eq!(round_significant(12345.678), 12345.7);
        assert_eq!(round_significant(1.0 / 3.0), 0.333333);
        assert_eq!(round_significant(-0.0), 0.0);
        assert!(round_significant(-0.0).is_sign_positive());
        assert_eq!(round_significant(3.0e-15), 0.0);
    }

    #[test]
    fn time_keys_look_like_geckolib() {
        assert_eq!(time_key(0.0), "0.0");
        assert_eq!(time_key(2.0), "2.0");
        assert_eq!(time_key(0.041667), "0.041667");
    }

    #[test]
    fn merges_axes_on_union_of_frames() {
        // x changes at frame 2, z at frame 3.
        let tracks = axis_tracks(&[0.0, 1.0, 1.0], &[0.0, 0.0, 0.0], &[0.0, 0.0, 4.0]);
        let merged = merge_axes(&tracks, true);
        let frames: Vec<u32> = merged.iter().map(|k| k.frame).collect();
        assert_eq!(frames, vec![1, 2, 3]);
        assert_eq!(merged[2].value, [1.0, 0.0, 4.0]);
    }

    #[test]
    fn trailing_hold_collapses_only_when_enabled() {
        let tracks = axis_tracks(&[0.0, 1.0, 1.0], &[0.0; 3], &[0.0; 3]);
        assert_eq!(merge_axes(&tracks, true).len(), 2);
        assert_eq!(merge_axes(&tracks, false).len(), 3);
    }

    #[test]
    fn keyed_style_omits_linear_lerp_mode() {
        let mut tracks = axis_tracks(&[0.0, 1.0], &[0.0, 0.0], &[0.0, 0.0]);
        tracks.x = reduce_values(
            &[(1, 0.0, Interpolation::CatmullRom), (2, 1.0, Interpolation::Linear)],
            0.0,
        );
        let track = style_track(merge_axes(&tracks, true), 1, 10.0, EmitStyle::Keyed);
        let json = serde_json::to_value(&track).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "0.0": { "vector": [0.0, 0.0, 0.0], "lerp_mode": "catmullrom" },
                "0.1": { "vector": [1.0, 0.0, 0.0] }
            })
        );
    }

    #[test]
    fn clip_length_counts_both_end_frames() {
        let timing = ClipTiming::from_span(Some((1, 3)), 24.0);
        assert_eq!(timing.start_frame, 1);
        assert_eq!(timing.frame_count, 3);
        assert_eq!(timing.length_seconds(), 0.125);

        let single = ClipTiming::from_span(Some((5, 5)), 20.0);
        assert_eq!(single.length_seconds(), 0.05);

        assert_eq!(ClipTiming::from_span(None, 24.0).length_seconds(), 0.0);
    }

    #[test]
    fn unknown_lerp_mode_is_written_verbatim() {
        let mut tracks = axis_tracks(&[0.0, 1.0], &[0.0, 0.0], &[0.0, 0.0]);
        tracks.x = reduce_values(
            &[
                (1, 0.0, Interpolation::Other("bezier".into())),
                (2, 1.0, Interpolation::Linear),
            ],
            0.0,
        );
        let keyed = style_track(merge_axes(&tracks, true), 1, 10.0, EmitStyle::Keyed);
        assert_eq!(
            serde_json::to_value(&keyed).unwrap()["0.0"]["lerp_mode"],
            "bezier"
        );
        let array = style_track(merge_axes(&tracks, true), 1, 10.0, EmitStyle::Array);
        assert_eq!(
            serde_json::to_value(&array).unwrap()[0]["interpolation"],
            "bezier"
        );
    }

    #[test]
    fn loop_mode_serializes_like_bedrock() {
        assert_eq!(serde_json::to_string(&LoopMode::Loop).unwrap(), "true");
        assert_eq!(serde_json::to_string(&LoopMode::Once).unwrap(), "false");
        assert_eq!(
            serde_json::to_string(&LoopMode::HoldOnLastFrame).unwrap(),
            "\"hold_on_last_frame\""
        );
    }
}
