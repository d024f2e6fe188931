use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub mod framebuffer;
pub mod skeleton;

pub use framebuffer::FrameBuffer;
pub use skeleton::{landmark_index, CoordinateMode, SkeletonRenderer, CONNECTIONS, LANDMARK_NAMES};

/// Pixel position on a drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 0xRRGGBB colour. Serialised as a `#rrggbb` string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(pub u32);

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(((r as u32) << 16) | ((g as u32) << 8) | b as u32)
    }

    pub fn components(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }

    pub fn parse_hex(value: &str) -> Option<Self> {
        let hex = value.strip_prefix('#').unwrap_or(value);
        if hex.len() != 6 {
            return None;
        }
        u32::from_str_radix(hex, 16).ok().map(Self)
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Color::parse_hex(&value)
            .ok_or_else(|| de::Error::custom(format!("expected a #rrggbb colour, got `{value}`")))
    }
}

/// Colours used to draw one skeleton.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub bone: Color,
    pub joint: Color,
    /// Joints flagged as problems in the active segment.
    pub highlight: Color,
}

impl ColorScheme {
    pub fn reference() -> Self {
        Self {
            bone: Color(0x60a5fa),
            joint: Color(0x60a5fa),
            highlight: Color(0xf87171),
        }
    }

    pub fn attempt() -> Self {
        Self {
            bone: Color(0x4ade80),
            joint: Color(0x4ade80),
            highlight: Color(0xf87171),
        }
    }
}

/// Target of skeleton drawing. Implemented by the pixel framebuffer and by
/// whatever surface a host embeds the player into.
pub trait DrawSurface {
    /// Width and height in pixels.
    fn size(&self) -> (u32, u32);
    fn clear(&mut self);
    fn line(&mut self, from: Point, to: Point, color: Color, width: f32);
    fn circle(&mut self, center: Point, radius: f32, color: Color);
}

impl<T: DrawSurface + ?Sized> DrawSurface for Box<T> {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn clear(&mut self) {
        (**self).clear()
    }

    fn line(&mut self, from: Point, to: Point, color: Color, width: f32) {
        (**self).line(from, to, color, width)
    }

    fn circle(&mut self, center: Point, radius: f32, color: Color) {
        (**self).circle(center, radius, color)
    }
}
