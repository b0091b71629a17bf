//! Ruling normalization: split segments by orientation, drop noise and
//! close the outer border.

use std::cmp::Ordering;

use tracing::debug;

use crate::error::LayoutError;
use crate::models::page::Segment;

/// Horizontal and vertical rulings ready for intersection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RulingSet {
    /// Synthesized top border, rulings by descending width, synthesized bottom border.
    pub hlines: Vec<Segment>,
    /// Synthesized left border, rulings by ascending top, synthesized right border.
    pub vlines: Vec<Segment>,
}

impl RulingSet {
    pub fn new(hlines: Vec<Segment>, vlines: Vec<Segment>) -> Self {
        Self { hlines, vlines }
    }

    pub fn len(&self) -> usize {
        self.hlines.len() + self.vlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hlines.is_empty() && self.vlines.is_empty()
    }
}

/// Classify segments into rulings, discarding the `noise` shortest
/// horizontals, and add the four border rulings.
pub fn normalize(segments: &[Segment], noise: usize) -> Result<RulingSet, LayoutError> {
    let mut hlines: Vec<Segment> = segments
        .iter()
        .filter(|s| s.is_horizontal())
        .copied()
        .collect();
    let mut vlines: Vec<Segment> = segments
        .iter()
        .filter(|s| s.is_vertical())
        .copied()
        .collect();

    let horizontal = hlines.len();
    if horizontal <= noise || vlines.is_empty() {
        return Err(LayoutError::Underdetermined {
            horizontal,
            vertical: vlines.len(),
            required: noise + 1,
        });
    }

    // Stable sorts keep source order among equal keys.
    hlines.sort_by(|a, b| b.width.partial_cmp(&a.width).unwrap_or(Ordering::Equal));
    hlines.truncate(horizontal - noise);
    vlines.sort_by(|a, b| a.y0.partial_cmp(&b.y0).unwrap_or(Ordering::Equal));

    let widest = hlines[0];
    let (left, right) = (widest.x0, widest.x1);
    let top = vlines[0].y0;
    let bottom = vlines.iter().map(|v| v.y1).fold(f64::NEG_INFINITY, f64::max);

    debug!(
        "Rulings: {} horizontal kept of {}, {} vertical; border x {:.1}..{:.1}, y {:.1}..{:.1}",
        hlines.len(),
        horizontal,
        vlines.len(),
        left,
        right,
        top,
        bottom
    );

    hlines.insert(0, Segment::horizontal(left, right, top));
    hlines.push(Segment::horizontal(left, right, bottom));
    vlines.insert(0, Segment::vertical(left, top, bottom));
    vlines.push(Segment::vertical(right, top, bottom));

    Ok(RulingSet { hlines, vlines })
}
