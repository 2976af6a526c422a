//! Euler <-> quaternion conversion in any Tait-Bryan order, orientation
//! deltas, and closest-equivalent angle unwrapping.
//!
//! Angles are degrees throughout. A triple is always indexed by axis
//! (`[x, y, z]`); the [`EulerOrder`] only decides how the three elementary
//! rotations compose.

use std::f64::consts::FRAC_PI_2;
use std::fmt;

use nalgebra::{Unit, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::axis::{Axis, Vec3};

pub const FULL_TURN_DEGREES: f64 = 360.0;

/// Below this |sin| margin the middle angle is treated as ±90° (gimbal lock).
const GIMBAL_EPSILON: f64 = 1e-9;

/// Composition order of an Euler triple. `Xyz` rotates about X first, then Y,
/// then Z, all about fixed world axes, so R = Rz · Ry · Rx.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EulerOrder {
    #[default]
    #[serde(rename = "XYZ")]
    Xyz,
    #[serde(rename = "XZY")]
    Xzy,
    #[serde(rename = "YXZ")]
    Yxz,
    #[serde(rename = "YZX")]
    Yzx,
    #[serde(rename = "ZXY")]
    Zxy,
    #[serde(rename = "ZYX")]
    Zyx,
}

impl EulerOrder {
    /// Axes in application order.
    pub fn axes(self) -> [Axis; 3] {
        use Axis::{X, Y, Z};
        match self {
            EulerOrder::Xyz => [X, Y, Z],
            EulerOrder::Xzy => [X, Z, Y],
            EulerOrder::Yxz => [Y, X, Z],
            EulerOrder::Yzx => [Y, Z, X],
            EulerOrder::Zxy => [Z, X, Y],
            EulerOrder::Zyx => [Z, Y, X],
        }
    }

    /// +1 for cyclic orders (XYZ, YZX, ZXY), -1 otherwise.
    fn parity(self) -> f64 {
        let [first, mid, _] = self.axes();
        if (first.index() + 1) % 3 == mid.index() {
            1.0
        } else {
            -1.0
        }
    }

    pub fn to_quaternion(self, degrees: Vec3) -> UnitQuaternion<f64> {
        let [first, mid, last] = self.axes();
        elementary(last, degrees[last.index()])
            * elementary(mid, degrees[mid.index()])
            * elementary(first, degrees[first.index()])
    }

    /// Principal-range Euler triple for `q` in this order. The middle angle
    /// lands in [-90°, 90°]; at gimbal lock the last angle is pinned to zero.
    pub fn from_quaternion(self, q: &UnitQuaternion<f64>) -> Vec3 {
        let [first, mid, last] = self.axes();
        let (i, j, k) = (first.index(), mid.index(), last.index());
        let s = self.parity();
        let rot = q.to_rotation_matrix();
        let m = rot.matrix();

        let sin_mid = (-s * m[(k, i)]).clamp(-1.0, 1.0);
        let (theta_first, theta_mid, theta_last) = if sin_mid.abs() < 1.0 - GIMBAL_EPSILON {
            (
                (s * m[(k, j)]).atan2(m[(k, k)]),
                sin_mid.asin(),
                (s * m[(j, i)]).atan2(m[(i, i)]),
            )
        } else {
            (
                (-s * m[(j, k)]).atan2(m[(j, j)]),
                FRAC_PI_2.copysign(sin_mid),
                0.0,
            )
        };

        let mut out = [0.0; 3];
        out[i] = theta_first.to_degrees() + 0.0;
        out[j] = theta_mid.to_degrees() + 0.0;
        out[k] = theta_last.to_degrees() + 0.0;
        out
    }

    /// Orientation of `current` relative to `baseline`: baseline⁻¹ ∘ current,
    /// re-expressed in this order.
    pub fn relative(self, baseline: Vec3, current: Vec3) -> Vec3 {
        let delta = self.to_quaternion(baseline).inverse() * self.to_quaternion(current);
        self.from_quaternion(&delta)
    }
}

impl fmt::Display for EulerOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.axes() {
            f.write_str(&axis.label().to_uppercase())?;
        }
        Ok(())
    }
}

fn elementary(axis: Axis, degrees: f64) -> UnitQuaternion<f64> {
    let unit: Unit<Vector3<f64>> = match axis {
        Axis::X => Vector3::x_axis(),
        Axis::Y => Vector3::y_axis(),
        Axis::Z => Vector3::z_axis(),
    };
    UnitQuaternion::from_axis_angle(&unit, degrees.to_radians())
}

/// `current + k·360°` closest to `previous`. `max_shift` bounds |k|.
pub fn unwrap_angle(previous: f64, current: f64, max_shift: Option<u32>) -> f64 {
    let mut turns = ((previous - current) / FULL_TURN_DEGREES).round();
    if let Some(limit) = max_shift {
        let limit = f64::from(limit);
        turns = turns.clamp(-limit, limit);
    }
    current + turns * FULL_TURN_DEGREES
}

/// [`unwrap_angle`] on each axis independently.
pub fn unwrap_triple(previous: Vec3, current: Vec3, max_shift: Option<u32>) -> Vec3 {
    [
        unwrap_angle(previous[0], current[0], max_shift),
        unwrap_angle(previous[1], current[1], max_shift),
        unwrap_angle(previous[2], current[2], max_shift),
    ]
}
