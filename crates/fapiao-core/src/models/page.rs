//! Positioned text tokens and line segments for one page.

use serde::{Deserialize, Serialize};

/// Convert a page coordinate to the integer grid used for cross points,
/// anchors and baselines. Truncates toward zero.
pub fn to_grid(v: f64) -> i64 {
    v.trunc() as i64
}

/// A positioned word from the text layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Word text.
    pub text: String,
    /// Left edge.
    pub x0: f64,
    /// Right edge.
    pub x1: f64,
    /// Top edge (y grows downward).
    pub top: f64,
    /// Bottom edge.
    pub bottom: f64,
}

impl Token {
    pub fn new(text: impl Into<String>, x0: f64, x1: f64, top: f64, bottom: f64) -> Self {
        Self {
            text: text.into(),
            x0,
            x1,
            top,
            bottom,
        }
    }

    pub fn y0(&self) -> f64 {
        self.top
    }

    pub fn y1(&self) -> f64 {
        self.bottom
    }

    /// Integer anchor point: left edge, vertical middle.
    pub fn anchor(&self) -> (i64, i64) {
        (to_grid(self.x0), to_grid((self.y0() + self.y1()) / 2.0))
    }

    /// Integer baseline.
    pub fn baseline(&self) -> i64 {
        to_grid(self.bottom)
    }
}

/// A drawn line, or one edge set of a filled rectangle.
///
/// A segment with `width > 0` acts as a horizontal ruling at `y0`; with
/// `height > 0` it acts as a vertical ruling at `x0`. Rectangles have both.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub width: f64,
    pub height: f64,
}

impl Segment {
    /// Build from the text layer's `{x0, top, bottom, width, height}` shape.
    pub fn from_layer(x0: f64, top: f64, bottom: f64, width: f64, height: f64) -> Self {
        Self {
            x0,
            y0: top,
            x1: x0 + width,
            y1: bottom,
            width,
            height,
        }
    }

    /// Horizontal ruling spanning `x0..x1` at `y`.
    pub fn horizontal(x0: f64, x1: f64, y: f64) -> Self {
        Self {
            x0,
            y0: y,
            x1,
            y1: y,
            width: x1 - x0,
            height: 0.0,
        }
    }

    /// Vertical ruling spanning `y0..y1` at `x`.
    pub fn vertical(x: f64, y0: f64, y1: f64) -> Self {
        Self {
            x0: x,
            y0,
            x1: x,
            y1,
            width: 0.0,
            height: y1 - y0,
        }
    }

    pub fn is_horizontal(&self) -> bool {
        self.width > 0.0
    }

    pub fn is_vertical(&self) -> bool {
        self.height > 0.0
    }
}

/// Input snapshot for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Words in text-layer order.
    pub tokens: Vec<Token>,
    /// Rulings or rectangle edges in graphics-layer order.
    pub segments: Vec<Segment>,
}

impl Page {
    pub fn new(tokens: Vec<Token>, segments: Vec<Segment>) -> Self {
        Self { tokens, segments }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.segments.is_empty()
    }
}
