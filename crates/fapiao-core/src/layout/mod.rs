//! Grid layout reconstruction.
//!
//! The stages run strictly in order, each consuming only the previous
//! stage's output:
//!
//! 1. [`rulings::normalize`] - segments to a closed ruling set
//! 2. [`grid::build_cells`] - intersections to minimal cells
//! 3. [`regions::assign_tokens`] - tokens to cells or free-text clusters
//! 4. [`lines::merge_lines`] - region tokens to baseline text lines

pub mod grid;
pub mod lines;
pub mod regions;
pub mod rulings;

pub use grid::{CellRect, CrossPoint};
pub use lines::{TextLine, TextLines};
pub use regions::{Region, RegionKey};
pub use rulings::RulingSet;

use serde::Serialize;

use crate::error::LayoutError;
use crate::models::config::LayoutConfig;
use crate::models::page::Page;

/// A region with its merged text lines.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionText {
    pub key: RegionKey,
    pub lines: TextLines,
}

impl RegionText {
    /// Cell content read top to bottom.
    pub fn content(&self) -> String {
        self.lines.joined()
    }
}

/// Counts gathered while reconstructing one page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LayoutStats {
    pub rulings: usize,
    pub cross_points: usize,
    pub cells: usize,
    pub regions: usize,
    pub text_lines: usize,
}

/// Reconstructed page: cells plus text grouped by region.
#[derive(Debug, Clone)]
pub struct PageLayout {
    pub rulings: RulingSet,
    pub cells: Vec<CellRect>,
    /// Regions in order of first token.
    pub regions: Vec<RegionText>,
    pub stats: LayoutStats,
}

impl PageLayout {
    /// Run all four stages on a page.
    pub fn analyze(page: &Page, config: &LayoutConfig) -> Result<Self, LayoutError> {
        let rulings = rulings::normalize(&page.segments, config.noise_hlines)?;
        let (points, cells) = grid::build_cells(&rulings, config.intersection_tolerance);
        let grouped = regions::assign_tokens(&page.tokens, &cells, config.cluster_tolerance);

        let regions: Vec<RegionText> = grouped
            .into_iter()
            .map(|region| {
                let tolerance = if region.key.is_cell() {
                    config.cell_line_tolerance
                } else {
                    config.free_text_line_tolerance
                };
                RegionText {
                    key: region.key,
                    lines: lines::merge_lines(&region.tokens, tolerance),
                }
            })
            .collect();

        let stats = LayoutStats {
            rulings: rulings.len(),
            cross_points: points.len(),
            cells: cells.len(),
            regions: regions.len(),
            text_lines: regions.iter().map(|r| r.lines.len()).sum(),
        };

        Ok(Self {
            rulings,
            cells,
            regions,
            stats,
        })
    }

    /// Free-text regions.
    pub fn free_regions(&self) -> impl Iterator<Item = &RegionText> {
        self.regions.iter().filter(|r| !r.key.is_cell())
    }

    /// Cell regions.
    pub fn cell_regions(&self) -> impl Iterator<Item = &RegionText> {
        self.regions.iter().filter(|r| r.key.is_cell())
    }

    /// Non-empty cells sharing `row`, ordered left to right.
    pub fn row_cells(&self, row: i64) -> Vec<&RegionText> {
        let mut cells: Vec<&RegionText> = self
            .regions
            .iter()
            .filter(|r| matches!(r.key, RegionKey::Cell { row: r_row, .. } if r_row == row))
            .collect();
        cells.sort_by_key(|r| r.key.cell().map(|c| c.left()));
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::page::{Segment, Token};
    use pretty_assertions::assert_eq;

    fn page() -> Page {
        let segments = vec![
            Segment::horizontal(0.0, 200.0, 100.0),
            Segment::horizontal(0.0, 200.0, 150.0),
            Segment::horizontal(0.0, 200.0, 200.0),
            Segment::horizontal(20.0, 40.0, 60.0),
            Segment::horizontal(20.0, 30.0, 70.0),
            Segment::vertical(0.0, 100.0, 200.0),
            Segment::vertical(80.0, 100.0, 200.0),
            Segment::vertical(200.0, 100.0, 200.0),
        ];
        let tokens = vec![
            Token::new("Title", 10.0, 50.0, 20.0, 30.0),
            Token::new("B", 90.0, 100.0, 110.0, 120.0),
            Token::new("A", 10.0, 20.0, 110.0, 120.0),
            Token::new("C", 10.0, 20.0, 160.0, 170.0),
        ];
        Page::new(tokens, segments)
    }

    #[test]
    fn test_analyze_page() {
        let layout = PageLayout::analyze(&page(), &LayoutConfig::default()).unwrap();

        assert_eq!(layout.cells.len(), 4);
        assert_eq!(layout.stats.regions, 4);
        assert_eq!(layout.free_regions().count(), 1);
        assert_eq!(layout.cell_regions().count(), 3);

        let row: Vec<String> = layout.row_cells(100).iter().map(|r| r.content()).collect();
        assert_eq!(row, vec!["A", "B"]);
    }

    #[test]
    fn test_analyze_is_repeatable() {
        let config = LayoutConfig::default();
        let first = PageLayout::analyze(&page(), &config).unwrap();
        let second = PageLayout::analyze(&page(), &config).unwrap();
        assert_eq!(first.regions, second.regions);
        assert_eq!(first.stats, second.stats);
    }
}
