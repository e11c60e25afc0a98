pub type Number = f64;

pub type Vector3 = nalgebra::Vector3<Number>;
pub type Translation3 = nalgebra::Translation3<Number>;
pub type UnitQuaternion = nalgebra::UnitQuaternion<Number>;

pub type SE3Quat = nalgebra::Isometry3<Number>;

pub type Descriptor = nalgebra::DVector<Number>;

pub type Timestamp = i64;
