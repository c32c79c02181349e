//! Tile ranges covering a bounding box

use std::ops::RangeInclusive;

use super::types::{BoundingBox, CoordError, TileIndex};
use super::Projection;

/// The rectangular set of tiles touching a bounding box at one zoom level.
///
/// Both axes are inclusive and never empty: a degenerate box yields a single
/// tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRange {
    zoom: u8,
    min_x: u32,
    max_x: u32,
    min_y: u32,
    max_y: u32,
}

impl TileRange {
    /// Computes the tile range for `bbox` at `zoom`.
    ///
    /// Both corners are projected to unit space and sorted independently per
    /// axis, so the corner order of the box does not matter.
    pub fn for_bounds(
        projection: &Projection,
        bbox: &BoundingBox,
        zoom: u8,
    ) -> Result<Self, CoordError> {
        projection.check_zoom(zoom)?;

        let start = projection.geo_to_unit(bbox.start());
        let end = projection.geo_to_unit(bbox.end());

        let (min_ux, max_ux) = ordered(start.x, end.x);
        let (min_uy, max_uy) = ordered(start.y, end.y);

        let tile = |unit: f64| projection.clamp_tile(projection.unit_to_tile(unit, zoom), zoom);

        Ok(Self {
            zoom,
            min_x: tile(min_ux),
            max_x: tile(max_ux),
            min_y: tile(min_uy),
            max_y: tile(max_uy),
        })
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn x_range(&self) -> RangeInclusive<u32> {
        self.min_x..=self.max_x
    }

    pub fn y_range(&self) -> RangeInclusive<u32> {
        self.min_y..=self.max_y
    }

    pub fn width(&self) -> u64 {
        (self.max_x - self.min_x) as u64 + 1
    }

    pub fn height(&self) -> u64 {
        (self.max_y - self.min_y) as u64 + 1
    }

    /// Number of tiles in the range.
    pub fn len(&self) -> u64 {
        self.width() * self.height()
    }

    /// A range always holds at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, tile: &TileIndex) -> bool {
        tile.zoom == self.zoom && self.x_range().contains(&tile.x) && self.y_range().contains(&tile.y)
    }

    /// Iterates the tiles column by column (x-major, then y).
    pub fn iter(&self) -> TileRangeIter {
        TileRangeIter {
            range: self.clone(),
            x: self.min_x,
            y: self.min_y,
            done: false,
        }
    }
}

impl<'a> IntoIterator for &'a TileRange {
    type Item = TileIndex;
    type IntoIter = TileRangeIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if b < a {
        (b, a)
    } else {
        (a, b)
    }
}

/// Iterator over all tiles in a [`TileRange`].
///
/// Yields tiles in x-major order: every row of the first column, then the
/// next column.
#[derive(Debug, Clone)]
pub struct TileRangeIter {
    range: TileRange,
    x: u32,
    y: u32,
    done: bool,
}

impl Iterator for TileRangeIter {
    type Item = TileIndex;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let tile = TileIndex::new(self.range.zoom, self.x, self.y);

        if self.y < self.range.max_y {
            self.y += 1;
        } else if self.x < self.range.max_x {
            self.x += 1;
            self.y = self.range.min_y;
        } else {
            self.done = true;
        }

        Some(tile)
    }
}
