//! Baked keyframe data model: samples, per-bone timelines, and the sorted set
//! of timelines for one clip.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::axis::Vec3;
use crate::error::ExportError;

/// Interpolation toward the next keyframe, in the target runtime's vocabulary.
///
/// Names other than the three the decoder understands are carried through
/// to the output verbatim as [`Interpolation::Other`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    CatmullRom,
    /// Any other lerp mode (`"bezier"`, ...); decoded as linear.
    Other(String),
}

impl Interpolation {
    pub fn name(&self) -> &str {
        match self {
            Interpolation::Linear => "linear",
            Interpolation::Step => "step",
            Interpolation::CatmullRom => "catmullrom",
            Interpolation::Other(name) => name,
        }
    }

    /// Exact-match lookup; anything unrecognized becomes `Other` unchanged.
    pub fn from_name(name: &str) -> Self {
        match name {
            "linear" => Interpolation::Linear,
            "step" => Interpolation::Step,
            "catmullrom" => Interpolation::CatmullRom,
            other => Interpolation::Other(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Interpolation::Other(_))
    }
}

impl From<String> for Interpolation {
    fn from(value: String) -> Self {
        Self::from_name(&value)
    }
}

impl From<Interpolation> for String {
    fn from(value: Interpolation) -> Self {
        match value {
            Interpolation::Other(name) => name,
            known => known.name().to_string(),
        }
    }
}

/// Transform channel of a bone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Location,
    Rotation,
    Scale,
}

impl Channel {
    /// Fixed emission order.
    pub const ALL: [Channel; 3] = [Channel::Location, Channel::Rotation, Channel::Scale];

    /// Key used in the emitted document.
    pub fn output_key(self) -> &'static str {
        match self {
            Channel::Location => "position",
            Channel::Rotation => "rotation",
            Channel::Scale => "scale",
        }
    }
}

/// One bone's transform at one frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyframeSample {
    pub frame: u32,
    pub location: Vec3,
    /// Euler angles indexed by axis.
    pub rotation: Vec3,
    pub scale: Vec3,
    /// Explicit interpolation carried by the source; `None` means linear.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpolation: Option<Interpolation>,
}

impl KeyframeSample {
    pub fn new(frame: u32, location: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            frame,
            location,
            rotation,
            scale,
            interpolation: None,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = Some(interpolation);
        self
    }

    #[inline]
    pub fn channel(&self, channel: Channel) -> Vec3 {
        match channel {
            Channel::Location => self.location,
            Channel::Rotation => self.rotation,
            Channel::Scale => self.scale,
        }
    }

    #[inline]
    pub fn interpolation(&self) -> Interpolation {
        self.interpolation.clone().unwrap_or_default()
    }
}

/// Samples of exactly one bone, strictly increasing by frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoneTimeline {
    name: String,
    samples: Vec<KeyframeSample>,
}

impl BoneTimeline {
    /// Validates the bone name and frame ordering. An empty sample list is
    /// accepted here; the reducer rejects it.
    pub fn new(name: impl Into<String>, samples: Vec<KeyframeSample>) -> Result<Self, ExportError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ExportError::malformed("bone name must be non-empty"));
        }
        for pair in samples.windows(2) {
            if pair[1].frame <= pair[0].frame {
                return Err(ExportError::MalformedInput {
                    record: None,
                    bone: Some(name),
                    frame: Some(pair[1].frame),
                    reason: format!(
                        "frames must be strictly increasing (frame {} follows {})",
                        pair[1].frame, pair[0].frame
                    ),
                });
            }
        }
        Ok(Self { name, samples })
    }

    /// Same bone, new samples at the same frames. Used by the pure transform stages.
    pub(crate) fn with_samples(&self, samples: Vec<KeyframeSample>) -> Self {
        debug_assert_eq!(samples.len(), self.samples.len());
        Self {
            name: self.name.clone(),
            samples,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn samples(&self) -> &[KeyframeSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&KeyframeSample> {
        self.samples.first()
    }

    pub fn frame_span(&self) -> Option<(u32, u32)> {
        Some((self.samples.first()?.frame, self.samples.last()?.frame))
    }
}

/// All bone timelines of one clip, keyed and iterated by bone name.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimelineSet {
    bones: BTreeMap<String, BoneTimeline>,
}

impl TimelineSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bone names are unique within a set.
    pub fn insert(&mut self, timeline: BoneTimeline) -> Result<(), ExportError> {
        match self.bones.entry(timeline.name.clone()) {
            btree_map::Entry::Occupied(_) => Err(ExportError::MalformedInput {
                record: None,
                bone: Some(timeline.name),
                frame: None,
                reason: "bone appears twice in the timeline set".into(),
            }),
            btree_map::Entry::Vacant(slot) => {
                slot.insert(timeline);
                Ok(())
            }
        }
    }

    pub fn get(&self, bone: &str) -> Option<&BoneTimeline> {
        self.bones.get(bone)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoneTimeline> {
        self.bones.values()
    }

    pub fn bone_names(&self) -> impl Iterator<Item = &str> {
        self.bones.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// First and last frame across every bone.
    pub fn frame_span(&self) -> Option<(u32, u32)> {
        self.bones
            .values()
            .filter_map(BoneTimeline::frame_span)
            .reduce(|(lo, hi), (a, b)| (lo.min(a), hi.max(b)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(frame: u32) -> KeyframeSample {
        KeyframeSample::new(frame, [0.0; 3], [0.0; 3], [1.0; 3])
    }

    #[test]
    fn timeline_rejects_unordered_frames() {
        let err = BoneTimeline::new("arm", vec![sample(2), sample(2)]).unwrap_err();
        assert!(matches!(err, ExportError::MalformedInput { frame: Some(2), .. }));
        assert!(BoneTimeline::new("arm", vec![sample(3), sample(1)]).is_err());
        assert!(BoneTimeline::new("", vec![sample(1)]).is_err());
    }

    #[test]
    fn set_orders_bones_and_spans_frames() {
        let mut set = TimelineSet::new();
        set.insert(BoneTimeline::new("leg", vec![sample(4), sample(9)]).unwrap())
            .unwrap();
        set.insert(BoneTimeline::new("arm", vec![sample(1), sample(5)]).unwrap())
            .unwrap();
        assert_eq!(set.bone_names().collect::<Vec<_>>(), vec!["arm", "leg"]);
        assert_eq!(set.frame_span(), Some((1, 9)));
        assert!(set
            .insert(BoneTimeline::new("arm", vec![sample(1)]).unwrap())
            .is_err());
    }

    #[test]
    fn interpolation_names_round_trip() {
        for kind in [
            Interpolation::Linear,
            Interpolation::Step,
            Interpolation::CatmullRom,
        ] {
            assert_eq!(Interpolation::from_name(kind.name()), kind);
            assert!(kind.is_known());
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }

    #[test]
    fn unknown_interpolation_passes_through_unchanged() {
        let bezier = Interpolation::from_name("bezier");
        assert_eq!(bezier, Interpolation::Other("bezier".into()));
        assert!(!bezier.is_known());
        assert_eq!(serde_json::to_string(&bezier).unwrap(), "\"bezier\"");

        let parsed: Interpolation = serde_json::from_str("\"Linear\"").unwrap();
        assert_eq!(parsed.name(), "Linear");
    }
}
