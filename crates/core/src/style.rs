//! Fixed display styles attached to vector layers.

use serde::{Deserialize, Serialize};

/// RGBA colour, 8 bits per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b, 255)
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self(self.0, self.1, self.2, a)
    }

    /// `#rrggbbaa` hex form.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.0, self.1, self.2, self.3)
    }

    /// KML colour form: `aabbggrr`.
    pub fn to_kml(self) -> String {
        format!("{:02x}{:02x}{:02x}{:02x}", self.3, self.2, self.1, self.0)
    }
}

/// Stroke/fill description the renderer applies to a vector layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerStyle {
    pub stroke: Rgba,
    pub fill: Rgba,
    pub stroke_width: f32,
    pub point_radius: f32,
}

impl LayerStyle {
    pub const fn new(stroke: Rgba, fill: Rgba, stroke_width: f32) -> Self {
        Self {
            stroke,
            fill,
            stroke_width,
            point_radius: 5.0,
        }
    }

    /// Solid stroke with a translucent fill of the same hue.
    pub const fn tinted(color: Rgba, stroke_width: f32) -> Self {
        Self::new(color, color.with_alpha(64), stroke_width)
    }
}

impl Default for LayerStyle {
    fn default() -> Self {
        Self::tinted(Rgba::rgb(51, 153, 204), 2.0)
    }
}

/// Style of the user's draw surface.
pub const SCRATCH_STYLE: LayerStyle = LayerStyle::new(
    Rgba::rgb(255, 204, 51),
    Rgba(255, 255, 255, 51),
    2.0,
);
