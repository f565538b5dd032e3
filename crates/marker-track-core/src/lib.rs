//! Core types for stereo marker tracking.
//!
//! This crate is small and purely geometric: the rotation solver, the
//! immutable stereo rig description, pixel frames and grayscale images. It
//! does not depend on any concrete circle detector or transport.

mod frame;
mod geometry;
mod image;
mod logger;
mod rig;

pub use frame::{wire_frame_len, BgrFrame, FrameError};
pub use geometry::{centroid, rotate_direction, rotation_between};
pub use image::{GrayImage, GrayImageView};
pub use rig::{camera_forward, RigConfigError, RigParams, StereoRigConfig};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_env, LOG_ENV};
