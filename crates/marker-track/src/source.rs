//! Frame delivery boundary of the tracking loop.

use marker_track_core::{BgrFrame, FrameError};

/// Result of asking a [`FrameSource`] for the next frame.
#[derive(Clone, Debug, PartialEq)]
pub enum NextFrame {
    Frame(BgrFrame),
    /// Nothing to process right now (not connected yet, connection dropped,
    /// or no frame arrived in time). The caller retries later.
    NotAvailable,
    /// The channel is permanently closed; no frame will ever arrive.
    Closed,
}

/// Anything that hands out side-by-side stereo frames, one per cycle.
///
/// A frame whose byte size does not match the configured dimensions is a
/// fatal `Err`: producer and consumer disagree on the frame layout and every
/// following frame would be wrong too.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<NextFrame, FrameError>;
}

impl<T: FrameSource + ?Sized> FrameSource for Box<T> {
    fn next_frame(&mut self) -> Result<NextFrame, FrameError> {
        (**self).next_frame()
    }
}

/// Replays a fixed list of frames, then reports the channel closed.
#[derive(Clone, Debug, Default)]
pub struct ReplaySource {
    frames: std::collections::VecDeque<BgrFrame>,
}

impl ReplaySource {
    pub fn new(frames: impl IntoIterator<Item = BgrFrame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self) -> Result<NextFrame, FrameError> {
        Ok(self
            .frames
            .pop_front()
            .map_or(NextFrame::Closed, NextFrame::Frame))
    }
}
