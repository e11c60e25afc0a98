use crate::num::{Number, UnitQuaternion};

use num_traits::Float;

/// Geodesic magnitude of a rotation, i.e. the angle in `[0, pi]` of the
/// minimal rotation taking the identity onto `rotation`.
#[inline]
pub fn angle(rotation: &UnitQuaternion) -> Number {
    let q = rotation.quaternion();
    half_angle_to_angle(q.imag().norm(), q.scalar())
}

/// Geodesic distance between two orientations.
#[inline]
pub fn angle_between(a: &UnitQuaternion, b: &UnitQuaternion) -> Number {
    angle(&(a.inverse() * b))
}

/// `R = Rz(yaw) * Ry(pitch) * Rx(roll)`
#[inline]
pub fn from_rpy(roll: Number, pitch: Number, yaw: Number) -> UnitQuaternion {
    UnitQuaternion::from_euler_angles(roll, pitch, yaw)
}

#[inline]
pub fn to_rpy(rotation: &UnitQuaternion) -> (Number, Number, Number) {
    rotation.euler_angles()
}

#[inline]
pub fn to_degrees<N: Float>(radians: N) -> N {
    radians.to_degrees()
}

// q and -q describe the same rotation, so fold the real part onto [0, 1]
// before recovering the angle; atan2 stays finite at the identity.
#[inline]
fn half_angle_to_angle<N: Float>(imag_norm: N, real: N) -> N {
    let two = N::one() + N::one();
    two * imag_norm.atan2(real.abs())
}
