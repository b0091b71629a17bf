//! Token placement into grid cells and free-text clusters.

use tracing::debug;

use super::grid::CellRect;
use crate::models::page::Token;

/// Where a group of tokens lives on the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionKey {
    /// Inside a grid cell; `row` is the cell's top Y, shared by row-mates.
    Cell { row: i64, rect: CellRect },
    /// Free text outside every cell, keyed by the founding token's anchor Y.
    Free { y: i64 },
}

impl RegionKey {
    pub fn is_cell(&self) -> bool {
        matches!(self, RegionKey::Cell { .. })
    }

    pub fn cell(&self) -> Option<&CellRect> {
        match self {
            RegionKey::Cell { rect, .. } => Some(rect),
            RegionKey::Free { .. } => None,
        }
    }
}

/// A region and its member tokens, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub key: RegionKey,
    pub tokens: Vec<Token>,
}

/// Offsets 0, -1, +1, -2, +2 ... up to `radius`.
pub(crate) fn symmetric_offsets(radius: i64) -> impl Iterator<Item = i64> {
    std::iter::once(0).chain((1..=radius.max(0)).flat_map(|d| [-d, d]))
}

/// Assign every token to the first cell containing its anchor, or to a
/// free-text cluster within `cluster_tolerance` of its anchor Y.
///
/// Regions are returned in order of first appearance. Clustering is greedy:
/// a cluster keeps its founding Y, so membership depends on token order.
pub fn assign_tokens(tokens: &[Token], cells: &[CellRect], cluster_tolerance: i64) -> Vec<Region> {
    let mut regions: Vec<Region> = Vec::new();

    for token in tokens {
        let anchor = token.anchor();

        let key = match cells.iter().find(|rect| rect.contains(anchor)) {
            Some(rect) => RegionKey::Cell {
                row: rect.top(),
                rect: *rect,
            },
            None => {
                let existing = symmetric_offsets(cluster_tolerance).find_map(|d| {
                    let y = anchor.1 + d;
                    regions
                        .iter()
                        .any(|r| r.key == RegionKey::Free { y })
                        .then_some(y)
                });
                RegionKey::Free {
                    y: existing.unwrap_or(anchor.1),
                }
            }
        };

        match regions.iter_mut().find(|r| r.key == key) {
            Some(region) => region.tokens.push(token.clone()),
            None => regions.push(Region {
                key,
                tokens: vec![token.clone()],
            }),
        }
    }

    debug!(
        "Assigned {} tokens to {} regions ({} cells)",
        tokens.len(),
        regions.len(),
        regions.iter().filter(|r| r.key.is_cell()).count()
    );

    regions
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn token(text: &str, x0: f64, top: f64, bottom: f64) -> Token {
        Token::new(text, x0, x0 + 10.0, top, bottom)
    }

    #[test]
    fn test_symmetric_offsets() {
        assert_eq!(symmetric_offsets(2).collect::<Vec<_>>(), vec![0, -1, 1, -2, 2]);
        assert_eq!(symmetric_offsets(0).collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_token_on_boundary_is_inside() {
        let cell = CellRect::from_bounds(100, 50, 200, 80);
        // Anchor (100, 50): exactly the top-left corner.
        let tokens = vec![token("edge", 100.4, 45.0, 55.0)];
        let regions = assign_tokens(&tokens, &[cell], 2);

        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].key, RegionKey::Cell { row: 50, rect: cell });
    }

    #[test]
    fn test_first_matching_cell_wins() {
        let a = CellRect::from_bounds(0, 0, 50, 50);
        let b = CellRect::from_bounds(50, 0, 100, 50);
        // Anchor x = 50 lies on the shared edge.
        let regions = assign_tokens(&[token("shared", 50.0, 20.0, 30.0)], &[a, b], 2);
        assert_eq!(regions[0].key.cell(), Some(&a));
    }

    #[test]
    fn test_free_tokens_cluster_within_tolerance() {
        let tokens = vec![
            token("a", 10.0, 10.0, 20.0), // anchor y 15
            token("b", 40.0, 12.0, 22.0), // anchor y 17, joins 15
            token("c", 70.0, 13.0, 24.0), // anchor y 18, three away from 15
        ];
        let regions = assign_tokens(&tokens, &[], 2);

        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].key, RegionKey::Free { y: 15 });
        assert_eq!(regions[0].tokens.len(), 2);
        assert_eq!(regions[1].key, RegionKey::Free { y: 18 });
    }

    #[test]
    fn test_cluster_key_does_not_drift() {
        // 17 joins 15, but 19 is measured against 15 and starts its own cluster.
        let tokens = vec![
            token("a", 10.0, 10.0, 20.0),
            token("b", 20.0, 12.0, 22.0),
            token("c", 30.0, 14.0, 24.0),
        ];
        let regions = assign_tokens(&tokens, &[], 2);
        let keys: Vec<RegionKey> = regions.iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![RegionKey::Free { y: 15 }, RegionKey::Free { y: 19 }]);
    }

    #[test]
    fn test_arrival_order_matters() {
        let early = token("a", 10.0, 10.0, 20.0); // 15
        let late = token("b", 10.0, 14.0, 24.0); // 19
        let middle = token("c", 10.0, 12.0, 22.0); // 17

        let forward = assign_tokens(&[early.clone(), middle.clone(), late.clone()], &[], 2);
        let reordered = assign_tokens(&[middle, early, late], &[], 2);

        assert_eq!(forward.len(), 2);
        assert_eq!(reordered.len(), 1);
    }

    #[test]
    fn test_cell_regions_keyed_by_row() {
        let left = CellRect::from_bounds(0, 100, 50, 150);
        let right = CellRect::from_bounds(50, 100, 120, 150);
        let tokens = vec![token("l", 5.0, 110.0, 120.0), token("r", 60.0, 110.0, 120.0)];
        let regions = assign_tokens(&tokens, &[left, right], 2);

        let rows: Vec<i64> = regions
            .iter()
            .filter_map(|r| match r.key {
                RegionKey::Cell { row, .. } => Some(row),
                RegionKey::Free { .. } => None,
            })
            .collect();
        assert_eq!(rows, vec![100, 100]);
    }
}
