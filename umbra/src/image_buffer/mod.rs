//! In-memory frames: a pixel plane, its header and an origin identifier.
//!
//! Every stage of the pipeline consumes and produces [`ImageBuffer`]s. Stages
//! that mutate in place keep the origin; stages that derive a new artifact
//! append a fixed suffix (`_subdark`, `_divflat`, ...) so output names can be
//! traced back to the source exposure.

mod header;
#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;

use strum_macros::{Display, EnumIter};

use common::buffer2::Buffer2;
use crate::demosaic::BayerPattern;
use crate::error::{Error, Result};

pub use header::{
    BAYER_PATTERN_KEY, FILTER_KEY, FrameKind, HeaderValue, Metadata, TYPE_KEYS,
};

/// Image shape as `(height, width)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    pub height: usize,
    pub width: usize,
}

impl Shape {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn pixel_count(&self) -> usize {
        self.height * self.width
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.height, self.width)
    }
}

/// A single-plane frame.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    /// Row-major samples.
    pub data: Buffer2<f32>,
    pub metadata: Metadata,
    /// Opaque name used to derive output file names.
    pub origin: String,
}

impl ImageBuffer {
    pub fn new(data: Buffer2<f32>, origin: impl Into<String>) -> Self {
        Self {
            data,
            metadata: Metadata::new(),
            origin: origin.into(),
        }
    }

    /// Constant-valued frame.
    pub fn filled(width: usize, height: usize, value: f32, origin: impl Into<String>) -> Self {
        Self::new(Buffer2::new_filled(width, height, value), origin)
    }

    /// Frame whose pixel at `(x, y)` is `f(x, y)`.
    pub fn from_fn<F>(width: usize, height: usize, origin: impl Into<String>, f: F) -> Self
    where
        F: FnMut(usize, usize) -> f32,
    {
        Self::new(Buffer2::from_fn(width, height, f), origin)
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_header(mut self, key: &str, value: impl Into<HeaderValue>) -> Self {
        self.set_header(key, value);
        self
    }

    #[inline]
    pub fn shape(&self) -> Shape {
        Shape::new(self.data.height(), self.data.width())
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.data.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.data.height()
    }

    #[inline]
    pub fn pixels(&self) -> &[f32] {
        self.data.pixels()
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [f32] {
        self.data.pixels_mut()
    }

    /// Copy of this frame under the origin `origin + suffix`.
    pub fn derive(&self, suffix: &str) -> Self {
        Self {
            data: self.data.clone(),
            metadata: self.metadata.clone(),
            origin: format!("{}{}", self.origin, suffix),
        }
    }

    /// New frame carrying `data`, this frame's header and the origin `origin + suffix`.
    pub fn derive_with(&self, data: Buffer2<f32>, suffix: &str) -> Self {
        Self {
            data,
            metadata: self.metadata.clone(),
            origin: format!("{}{}", self.origin, suffix),
        }
    }

    pub fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.metadata.get(key)
    }

    pub fn set_header(&mut self, key: &str, value: impl Into<HeaderValue>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    /// Header value under `key`, or [`Error::MissingMetadata`].
    pub fn require_header(&self, key: &str) -> Result<&HeaderValue> {
        self.header(key).ok_or_else(|| Error::MissingMetadata {
            key: key.to_string(),
            origin: self.origin.clone(),
        })
    }

    /// Bayer layout read from [`BAYER_PATTERN_KEY`].
    pub fn bayer_pattern(&self) -> Result<BayerPattern> {
        match self.require_header(BAYER_PATTERN_KEY)? {
            HeaderValue::Str(s) => BayerPattern::from_str(s),
            other => Err(Error::UnsupportedPattern(other.to_string())),
        }
    }

    /// Raw classification string from the first present key of [`TYPE_KEYS`].
    pub fn frame_type_value(&self) -> Option<&str> {
        TYPE_KEYS
            .iter()
            .find_map(|key| self.header(key))
            .and_then(HeaderValue::as_str)
    }

    /// Classification, if the header carries a recognised one.
    pub fn frame_kind(&self) -> Option<FrameKind> {
        self.frame_type_value()
            .and_then(|v| FrameKind::from_str(v).ok())
    }

    /// Color of a single-channel filter named by [`FILTER_KEY`]: `R`, `G`, `B`
    /// or the full color name, in any case.
    pub fn filter_channel(&self) -> Option<Channel> {
        let name = self.header(FILTER_KEY)?.as_str()?.trim().to_ascii_lowercase();
        match name.as_str() {
            "r" | "red" => Some(Channel::Red),
            "g" | "green" => Some(Channel::Green),
            "b" | "blue" => Some(Channel::Blue),
            _ => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.pixels().iter().all(|v| v.is_finite())
    }

    /// Fails with [`Error::ShapeMismatch`] naming `context` and both shapes.
    pub fn ensure_same_shape(&self, other: &ImageBuffer, context: &str) -> Result<()> {
        ensure_shape(self.shape(), other.shape(), context)
    }
}

pub(crate) fn ensure_shape(expected: Shape, actual: Shape, context: &str) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            context: context.to_string(),
            expected,
            actual,
        })
    }
}

/// Non-empty ordered frames that all share one shape.
#[derive(Debug, Clone)]
pub struct FrameSet {
    frames: Vec<ImageBuffer>,
}

impl FrameSet {
    /// Validates the set before any computation can see it.
    pub fn new(frames: Vec<ImageBuffer>) -> Result<Self> {
        let first = frames.first().ok_or(Error::EmptyFrameSet)?;
        let expected = first.shape();
        for (index, frame) in frames.iter().enumerate().skip(1) {
            ensure_shape(
                expected,
                frame.shape(),
                &format!("frame {index} ('{}') of set", frame.origin),
            )?;
        }
        Ok(Self { frames })
    }

    pub fn shape(&self) -> Shape {
        self.frames[0].shape()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false: empty sets cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn first(&self) -> &ImageBuffer {
        &self.frames[0]
    }

    pub fn frames(&self) -> &[ImageBuffer] {
        &self.frames
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageBuffer> {
        self.frames.iter()
    }

    pub fn into_vec(self) -> Vec<ImageBuffer> {
        self.frames
    }
}

/// Color plane of a [`ColorTriple`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const ALL: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    /// Origin suffix for planes split out of a mosaic.
    pub fn suffix(&self) -> &'static str {
        match self {
            Channel::Red => "_r",
            Channel::Green => "_g",
            Channel::Blue => "_b",
        }
    }
}

/// Three same-shaped color planes of one exposure.
#[derive(Debug, Clone)]
pub struct ColorTriple {
    pub red: ImageBuffer,
    pub green: ImageBuffer,
    pub blue: ImageBuffer,
}

impl ColorTriple {
    pub fn new(red: ImageBuffer, green: ImageBuffer, blue: ImageBuffer) -> Result<Self> {
        red.ensure_same_shape(&green, "color triple (green plane)")?;
        red.ensure_same_shape(&blue, "color triple (blue plane)")?;
        Ok(Self { red, green, blue })
    }

    pub fn shape(&self) -> Shape {
        self.red.shape()
    }

    pub fn channel(&self, channel: Channel) -> &ImageBuffer {
        match channel {
            Channel::Red => &self.red,
            Channel::Green => &self.green,
            Channel::Blue => &self.blue,
        }
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ImageBuffer {
        match channel {
            Channel::Red => &mut self.red,
            Channel::Green => &mut self.green,
            Channel::Blue => &mut self.blue,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Channel, &ImageBuffer)> {
        Channel::ALL.into_iter().map(move |c| (c, self.channel(c)))
    }

    pub fn into_array(self) -> [ImageBuffer; 3] {
        [self.red, self.green, self.blue]
    }
}
