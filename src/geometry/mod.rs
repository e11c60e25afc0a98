mod poses;
pub mod rotation;

pub use poses::{
    broadcast_len, combine, compose, divide, error, invert, metric, weighted_distance, SE3Poses,
};
