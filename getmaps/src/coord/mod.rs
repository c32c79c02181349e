//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude),
//! the tile server's internal unit space, and tile indices.
//!
//! # Unit space
//!
//! The server addresses the whole world as a square of `2^26` units. A tile at
//! zoom level `z` covers `2^(5 + z)` units per side, so every zoom step halves
//! the resolution: zoom 0 is the most detailed level and zoom [`MAX_ZOOM`]
//! covers the world with a single tile.
//!
//! Tile boundaries are derived with the same floating point expressions the
//! server uses. An off-by-one tile at a boundary is possible if the server
//! rounds differently; ranges are not padded to hide that.

mod range;
mod types;

pub use range::{TileRange, TileRangeIter};
pub use types::{
    BoundingBox, CoordError, GeoPoint, TileIndex, UnitPoint, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT,
    MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// log2 of the unit-space width.
pub const WORLD_SIZE_BITS: u32 = 26;

/// Width (and height) of the world in units.
pub const WORLD_SIZE_UNITS: f64 = (1u64 << WORLD_SIZE_BITS) as f64;

/// Vertical extent of the projection in Mercator radians (negative: y grows southwards).
pub const MERCATOR_SPAN: f64 = -6.28318377773622;

/// Mercator value of the northern world edge.
pub const MERCATOR_TOP: f64 = 3.14159188886811;

/// log2 of the tile edge length in units at zoom level 0.
pub const TILE_SHIFT: u32 = 5;

/// Largest supported world size exponent; unit coordinates must fit an `i64`.
pub const MAX_WORLD_SIZE_BITS: u32 = 62;

/// The Mercator-like transform used by the tile server.
///
/// Holds the projection constants instead of reading globals, so callers can
/// build a projection for a server with a different world size.
///
/// The conversion helpers accept any zoom level. Beyond [`max_zoom`] a single
/// tile covers the world and shifted values saturate instead of overflowing.
///
/// [`max_zoom`]: Projection::max_zoom
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    world_size_bits: u32,
    mercator_span: f64,
    mercator_top: f64,
    tile_shift: u32,
}

impl Default for Projection {
    fn default() -> Self {
        Self {
            world_size_bits: WORLD_SIZE_BITS,
            mercator_span: MERCATOR_SPAN,
            mercator_top: MERCATOR_TOP,
            tile_shift: TILE_SHIFT,
        }
    }
}

impl Projection {
    /// Creates a projection with custom constants.
    ///
    /// The grid at zoom level 0 must have between 2 and `2^31` tiles per side
    /// and the world must fit in [`MAX_WORLD_SIZE_BITS`] bits.
    pub fn new(
        world_size_bits: u32,
        mercator_span: f64,
        mercator_top: f64,
        tile_shift: u32,
    ) -> Result<Self, CoordError> {
        if world_size_bits > MAX_WORLD_SIZE_BITS {
            return Err(CoordError::InvalidProjection(format!(
                "world size of 2^{} units exceeds 2^{}",
                world_size_bits, MAX_WORLD_SIZE_BITS
            )));
        }
        if tile_shift >= world_size_bits {
            return Err(CoordError::InvalidProjection(format!(
                "tile shift {} must be below world size bits {}",
                tile_shift, world_size_bits
            )));
        }
        if world_size_bits - tile_shift > u32::BITS - 1 {
            return Err(CoordError::InvalidProjection(format!(
                "2^{} tiles per side do not fit a tile index",
                world_size_bits - tile_shift
            )));
        }
        if !mercator_span.is_finite() || mercator_span == 0.0 || !mercator_top.is_finite() {
            return Err(CoordError::InvalidProjection(format!(
                "Mercator span {} and top {} must be finite, span non-zero",
                mercator_span, mercator_top
            )));
        }

        Ok(Self {
            world_size_bits,
            mercator_span,
            mercator_top,
            tile_shift,
        })
    }

    pub fn world_size_bits(&self) -> u32 {
        self.world_size_bits
    }

    pub fn tile_shift(&self) -> u32 {
        self.tile_shift
    }

    /// Width of the world in units.
    #[inline]
    pub fn world_size(&self) -> f64 {
        (1u64 << self.world_size_bits) as f64
    }

    /// Highest zoom level that still has at least one tile.
    pub fn max_zoom(&self) -> u8 {
        // new() keeps the difference below 32
        (self.world_size_bits - self.tile_shift) as u8
    }

    #[inline]
    fn shift(&self, zoom: u8) -> u32 {
        self.tile_shift + zoom as u32
    }

    /// Edge length of a tile in units at the given zoom level.
    ///
    /// Saturates at `u64::MAX` for zoom levels far beyond [`Projection::max_zoom`].
    #[inline]
    pub fn tile_edge(&self, zoom: u8) -> u64 {
        1u64.checked_shl(self.shift(zoom)).unwrap_or(u64::MAX)
    }

    /// Number of tiles per side of the world at the given zoom level.
    ///
    /// Zoom levels above [`Projection::max_zoom`] have a single tile.
    #[inline]
    pub fn grid_size(&self, zoom: u8) -> u32 {
        match self.world_size_bits.checked_sub(self.shift(zoom)) {
            Some(bits) => 1u32 << bits,
            None => 1,
        }
    }

    /// Converts a geographic coordinate to unit space.
    ///
    /// No validation is done; latitudes near the poles produce values outside
    /// the world square.
    #[inline]
    pub fn geo_to_unit(&self, point: GeoPoint) -> UnitPoint {
        let world = self.world_size();
        let x = (point.lon + 180.0) * (world / 360.0) + 0.5;
        let sin_lat = (point.lat * (PI / 180.0)).sin();
        let y = 0.5
            + (world / self.mercator_span)
                * (((1.0 + sin_lat) / (1.0 - sin_lat)).ln() * 0.5 - self.mercator_top);
        UnitPoint { x, y }
    }

    /// Converts a unit-space position back to geographic coordinates.
    pub fn unit_to_geo(&self, unit: UnitPoint) -> GeoPoint {
        let world = self.world_size();
        let lon = (unit.x - 0.5) * (360.0 / world) - 180.0;
        let mercator = (unit.y - 0.5) * (self.mercator_span / world) + self.mercator_top;
        let lat = mercator.tanh().asin() * (180.0 / PI);
        GeoPoint { lat, lon }
    }

    /// Converts a unit coordinate (either axis) to a tile index at `zoom`.
    ///
    /// Negative units yield negative indices; callers clamp as needed.
    #[inline]
    pub fn unit_to_tile(&self, unit: f64, zoom: u8) -> i64 {
        let unit = unit.floor() as i64;
        match unit.checked_shr(self.shift(zoom)) {
            Some(tile) => tile,
            None if unit < 0 => -1,
            None => 0,
        }
    }

    /// Returns the unit coordinate of a tile's origin (north or west edge).
    ///
    /// Saturates at `u64::MAX` instead of overflowing.
    #[inline]
    pub fn tile_to_unit(&self, tile: u32, zoom: u8) -> u64 {
        (tile as u64).saturating_mul(self.tile_edge(zoom))
    }

    /// Returns the unit-space centre of a tile.
    pub fn tile_center(&self, tile: &TileIndex) -> UnitPoint {
        let half = (self.tile_edge(tile.zoom) / 2) as f64;
        UnitPoint {
            x: self.tile_to_unit(tile.x, tile.zoom) as f64 + half,
            y: self.tile_to_unit(tile.y, tile.zoom) as f64 + half,
        }
    }

    /// Converts geographic coordinates to the tile containing them.
    ///
    /// Points on the eastern or southern world edge are clamped into the
    /// last tile of the grid.
    pub fn tile_for(&self, point: GeoPoint, zoom: u8) -> Result<TileIndex, CoordError> {
        point.validate()?;
        self.check_zoom(zoom)?;
        let unit = self.geo_to_unit(point);
        Ok(TileIndex {
            zoom,
            x: self.clamp_tile(self.unit_to_tile(unit.x, zoom), zoom),
            y: self.clamp_tile(self.unit_to_tile(unit.y, zoom), zoom),
        })
    }

    /// Returns the geographic position of a tile's north-west corner.
    pub fn tile_to_geo(&self, tile: &TileIndex) -> GeoPoint {
        self.unit_to_geo(UnitPoint {
            x: self.tile_to_unit(tile.x, tile.zoom) as f64,
            y: self.tile_to_unit(tile.y, tile.zoom) as f64,
        })
    }

    pub(crate) fn check_zoom(&self, zoom: u8) -> Result<(), CoordError> {
        if zoom > self.max_zoom() {
            return Err(CoordError::InvalidZoom(zoom));
        }
        Ok(())
    }

    pub(crate) fn clamp_tile(&self, tile: i64, zoom: u8) -> u32 {
        let last = self.grid_size(zoom) as i64 - 1;
        tile.clamp(0, last) as u32
    }
}

/// Builds a quadtree key for a tile.
///
/// Each character encodes one level of the quadtree, most significant first,
/// using the quadrant alphabet `0123` (`xbit + 2 * ybit`). `level` is in the
/// tile server's zoom numbering, where the key has `17 - level` characters.
pub fn quadtree_key(x: u32, y: u32, level: i32) -> String {
    const QUADRANTS: [char; 4] = ['0', '1', '2', '3'];

    let top = 16 - level;
    if top < 0 {
        return String::new();
    }

    (0..=top)
        .rev()
        .map(|n| {
            let xbit = ((x as u64 >> n) & 1) as usize;
            let ybit = ((y as u64 >> n) & 1) as usize;
            QUADRANTS[xbit + 2 * ybit]
        })
        .collect()
}
