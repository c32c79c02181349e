//! Download plan: the tile ranges of one run.

use thiserror::Error;

use crate::coord::{BoundingBox, CoordError, GeoPoint, Projection, TileIndex, TileRange};

/// Errors building a [`DownloadPlan`].
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("At least one zoom level is required")]
    NoZoomLevels,

    #[error(transparent)]
    Coord(#[from] CoordError),
}

/// Tile ranges for every requested zoom level, in request order.
///
/// Zoom levels are kept in the order they were given. A zoom level given
/// twice is visited twice and counts twice towards the total; the second pass
/// finds its tiles already stored.
///
/// # Example
///
/// ```
/// use getmaps::coord::{BoundingBox, Projection};
/// use getmaps::plan::DownloadPlan;
///
/// let bbox = BoundingBox::new(52.52, 52.50, 13.37, 13.42).unwrap();
/// let plan = DownloadPlan::new(&Projection::default(), &bbox, &[12, 10]).unwrap();
///
/// assert_eq!(plan.zoom_levels(), vec![12, 10]);
/// assert_eq!(plan.total(), plan.ranges().iter().map(|r| r.len()).sum::<u64>());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadPlan {
    projection: Projection,
    bbox: BoundingBox,
    ranges: Vec<TileRange>,
    total: u64,
}

impl DownloadPlan {
    pub fn new(
        projection: &Projection,
        bbox: &BoundingBox,
        zooms: &[u8],
    ) -> Result<Self, PlanError> {
        if zooms.is_empty() {
            return Err(PlanError::NoZoomLevels);
        }

        let ranges = zooms
            .iter()
            .map(|&zoom| TileRange::for_bounds(projection, bbox, zoom))
            .collect::<Result<Vec<_>, _>>()?;

        let total = ranges.iter().map(TileRange::len).sum();
        Ok(Self {
            projection: *projection,
            bbox: *bbox,
            ranges,
            total,
        })
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn ranges(&self) -> &[TileRange] {
        &self.ranges
    }

    /// Geographic area covered by the tiles of `range`, as its north-west
    /// and south-east corners.
    ///
    /// The area is at least as large as the requested bounding box, since
    /// edge tiles extend past it.
    pub fn extent(&self, range: &TileRange) -> (GeoPoint, GeoPoint) {
        let zoom = range.zoom();
        let north_west = TileIndex::new(zoom, *range.x_range().start(), *range.y_range().start());
        let beyond = TileIndex::new(
            zoom,
            range.x_range().end().saturating_add(1),
            range.y_range().end().saturating_add(1),
        );
        (
            self.projection.tile_to_geo(&north_west),
            self.projection.tile_to_geo(&beyond),
        )
    }

    pub fn zoom_levels(&self) -> Vec<u8> {
        self.ranges.iter().map(TileRange::zoom).collect()
    }

    /// Number of tiles over all zoom levels.
    pub fn total(&self) -> u64 {
        self.total
    }
}
