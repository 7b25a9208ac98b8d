use common::buffer2::Buffer2;

use crate::image_buffer::{FrameSet, ImageBuffer};
use crate::math;

/// Per-pixel median across `frames`.
///
/// One frame degenerates to a copy. Header comes from the first frame.
pub fn median_stack(frames: &FrameSet) -> ImageBuffer {
    let shape = frames.shape();
    let first = frames.first();
    if frames.len() == 1 {
        return first.derive("_median_stacked");
    }

    let pixels = super::reduce_per_pixel(frames, math::median_f32_mut);
    first.derive_with(
        Buffer2::new(shape.width, shape.height, pixels),
        "_median_stacked",
    )
}
