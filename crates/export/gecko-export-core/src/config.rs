//! Transform configuration: the corrective toggles applied to every bone.
//!
//! A [`TransformConfig`] is built once per run (from JSON or the builder
//! methods), validated eagerly, and then only read.

use serde::{Deserialize, Serialize};

use crate::axis::{AxisInvert, AxisPermutation};
use crate::data::Channel;
use crate::error::ExportError;
use crate::rotation::EulerOrder;

/// Frame rate used when the caller does not supply one.
pub const DEFAULT_FRAME_RATE: f64 = 24.0;

/// Units of the incoming rotation triple. Output is always degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleUnit {
    #[default]
    Degrees,
    Radians,
}

impl AngleUnit {
    #[inline]
    pub fn to_degrees(self, value: f64) -> f64 {
        match self {
            AngleUnit::Degrees => value,
            AngleUnit::Radians => value.to_degrees(),
        }
    }
}

/// Channels written to the output document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSelection {
    pub location: bool,
    pub rotation: bool,
    pub scale: bool,
}

impl Default for ChannelSelection {
    fn default() -> Self {
        Self {
            location: true,
            rotation: true,
            scale: true,
        }
    }
}

impl ChannelSelection {
    pub fn includes(&self, channel: Channel) -> bool {
        match channel {
            Channel::Location => self.location,
            Channel::Rotation => self.rotation,
            Channel::Scale => self.scale,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformConfig {
    pub axis_swap_location: AxisPermutation,
    pub axis_swap_rotation: AxisPermutation,
    pub axis_swap_scale: AxisPermutation,

    pub axis_invert_location: AxisInvert,
    pub axis_invert_rotation: AxisInvert,
    pub axis_invert_scale: AxisInvert,

    /// Re-express each angle as the 360° equivalent nearest the previous frame.
    pub closest_axis_unwrap: bool,
    /// Bound on full turns added per step by the unwrap. `None` is unbounded.
    pub unwrap_max_shift: Option<u32>,
    pub zero_rotation_at_start: bool,
    pub normalize_scale_at_start: bool,
    pub zero_location_at_start: bool,

    /// Scalar applied to location before inversion.
    pub location_multiplier: f64,
    /// Composition order of the emitted Euler triple.
    pub rotation_order: EulerOrder,
    pub rotation_units: AngleUnit,

    /// Frames per second; `time = (frame - clip start) / frame_rate`.
    pub frame_rate: f64,
    pub channels: ChannelSelection,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            axis_swap_location: AxisPermutation::IDENTITY,
            axis_swap_rotation: AxisPermutation::IDENTITY,
            axis_swap_scale: AxisPermutation::IDENTITY,
            axis_invert_location: AxisInvert::NONE,
            axis_invert_rotation: AxisInvert::NONE,
            axis_invert_scale: AxisInvert::NONE,
            closest_axis_unwrap: true,
            unwrap_max_shift: None,
            zero_rotation_at_start: false,
            normalize_scale_at_start: false,
            zero_location_at_start: false,
            location_multiplier: 1.0,
            rotation_order: EulerOrder::Xyz,
            rotation_units: AngleUnit::Degrees,
            frame_rate: DEFAULT_FRAME_RATE,
            channels: ChannelSelection::default(),
        }
    }
}

impl TransformConfig {
    pub fn new(frame_rate: f64) -> Self {
        Self {
            frame_rate,
            ..Default::default()
        }
    }

    /// Parse and validate. Malformed axis strings and bad values both surface
    /// as [`ExportError::Config`].
    pub fn from_json(json: &str) -> Result<Self, ExportError> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| ExportError::config("transformConfig", e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn swap(&self, channel: Channel) -> AxisPermutation {
        match channel {
            Channel::Location => self.axis_swap_location,
            Channel::Rotation => self.axis_swap_rotation,
            Channel::Scale => self.axis_swap_scale,
        }
    }

    pub fn invert(&self, channel: Channel) -> AxisInvert {
        match channel {
            Channel::Location => self.axis_invert_location,
            Channel::Rotation => self.axis_invert_rotation,
            Channel::Scale => self.axis_invert_scale,
        }
    }

    pub fn with_swap(mut self, channel: Channel, swap: AxisPermutation) -> Self {
        match channel {
            Channel::Location => self.axis_swap_location = swap,
            Channel::Rotation => self.axis_swap_rotation = swap,
            Channel::Scale => self.axis_swap_scale = swap,
        }
        self
    }

    pub fn with_invert(mut self, channel: Channel, invert: AxisInvert) -> Self {
        match channel {
            Channel::Location => self.axis_invert_location = invert,
            Channel::Rotation => self.axis_invert_rotation = invert,
            Channel::Scale => self.axis_invert_scale = invert,
        }
        self
    }

    pub fn with_closest_axis_unwrap(mut self, enabled: bool) -> Self {
        self.closest_axis_unwrap = enabled;
        self
    }

    pub fn with_unwrap_max_shift(mut self, max_shift: Option<u32>) -> Self {
        self.unwrap_max_shift = max_shift;
        self
    }

    pub fn with_zero_rotation_at_start(mut self, enabled: bool) -> Self {
        self.zero_rotation_at_start = enabled;
        self
    }

    pub fn with_normalize_scale_at_start(mut self, enabled: bool) -> Self {
        self.normalize_scale_at_start = enabled;
        self
    }

    pub fn with_zero_location_at_start(mut self, enabled: bool) -> Self {
        self.zero_location_at_start = enabled;
        self
    }

    pub fn with_location_multiplier(mut self, multiplier: f64) -> Self {
        self.location_multiplier = multiplier;
        self
    }

    pub fn with_rotation_order(mut self, order: EulerOrder) -> Self {
        self.rotation_order = order;
        self
    }

    pub fn with_rotation_units(mut self, units: AngleUnit) -> Self {
        self.rotation_units = units;
        self
    }

    pub fn with_channels(mut self, channels: ChannelSelection) -> Self {
        self.channels = channels;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ExportError> {
        if !self.frame_rate.is_finite() || self.frame_rate <= 0.0 {
            return Err(ExportError::config(
                "frameRate",
                format!("must be positive and finite, got {}", self.frame_rate),
            ));
        }
        if !self.location_multiplier.is_finite() {
            return Err(ExportError::config(
                "locationMultiplier",
                "must be finite",
            ));
        }
        if !Channel::ALL.iter().any(|c| self.channels.includes(*c)) {
            return Err(ExportError::config(
                "channels",
                "at least one channel must be exported",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;

    #[test]
    fn defaults_are_valid_identity() {
        let cfg = TransformConfig::default();
        cfg.validate().unwrap();
        assert!(cfg.swap(Channel::Rotation).is_identity());
        assert_eq!(cfg.frame_rate, DEFAULT_FRAME_RATE);
    }

    #[test]
    fn parses_camel_case_options() {
        let cfg = TransformConfig::from_json(
            r#"{
                "axisSwapLocation": "XZY",
                "axisInvertRotation": [true, false, true],
                "closestAxisUnwrap": false,
                "zeroRotationAtStart": true,
                "normalizeScaleAtStart": true,
                "frameRate": 20,
                "rotationUnits": "radians",
                "channels": { "scale": false },
                "somethingNew": 1
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.swap(Channel::Location).source_of(Axis::Y), Axis::Z);
        assert!(cfg.invert(Channel::Rotation).is_set(Axis::Z));
        assert!(!cfg.closest_axis_unwrap);
        assert!(cfg.zero_rotation_at_start);
        assert_eq!(cfg.frame_rate, 20.0);
        assert_eq!(cfg.rotation_units, AngleUnit::Radians);
        assert!(cfg.channels.location && !cfg.channels.scale);
    }

    #[test]
    fn rejects_bad_swap_and_frame_rate_eagerly() {
        let err = TransformConfig::from_json(r#"{ "axisSwapScale": "XXY" }"#).unwrap_err();
        assert_eq!(err.category(), "config");

        for rate in [0.0, -24.0, f64::NAN, f64::INFINITY] {
            let err = TransformConfig::new(rate).validate().unwrap_err();
            assert!(matches!(err, ExportError::Config { ref option, .. } if option == "frameRate"));
        }
    }

    #[test]
    fn rejects_empty_channel_selection() {
        let cfg = TransformConfig::default().with_channels(ChannelSelection {
            location: false,
            rotation: false,
            scale: false,
        });
        assert!(cfg.validate().is_err());
    }
}
