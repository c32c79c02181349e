//! Coordinate types

use std::fmt;

use thiserror::Error;

/// Minimum latitude the projection can represent (in degrees).
pub const MIN_LAT: f64 = -85.05112878;

/// Maximum latitude the projection can represent (in degrees).
pub const MAX_LAT: f64 = 85.05112878;

/// Minimum longitude (in degrees).
pub const MIN_LON: f64 = -180.0;

/// Maximum longitude (in degrees).
pub const MAX_LON: f64 = 180.0;

/// Minimum zoom level.
pub const MIN_ZOOM: u8 = 0;

/// Maximum zoom level.
///
/// At this level the whole world fits into a single tile.
pub const MAX_ZOOM: u8 = 21;

/// Errors that can occur during coordinate validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude is outside the projectable range
    #[error("Invalid latitude {0}: must be between {} and {}", MIN_LAT, MAX_LAT)]
    InvalidLatitude(f64),
    /// Longitude is outside -180..=180
    #[error("Invalid longitude {0}: must be between {} and {}", MIN_LON, MAX_LON)]
    InvalidLongitude(f64),
    /// Zoom level is above [`MAX_ZOOM`]
    #[error("Invalid zoom level {0}: must be between {} and {}", MIN_ZOOM, MAX_ZOOM)]
    InvalidZoom(u8),
    /// Projection constants describe no usable tile grid
    #[error("Invalid projection: {0}")]
    InvalidProjection(String),
}

/// A geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Checks that the point lies inside the projectable area.
    pub fn validate(&self) -> Result<(), CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&self.lat) {
            return Err(CoordError::InvalidLatitude(self.lat));
        }
        if !(MIN_LON..=MAX_LON).contains(&self.lon) {
            return Err(CoordError::InvalidLongitude(self.lon));
        }
        Ok(())
    }
}

/// A position in internal unit space.
///
/// Unit space is a square `WORLD_SIZE` units wide, with the origin in the
/// north-west corner. It does not depend on the zoom level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitPoint {
    pub x: f64,
    pub y: f64,
}

/// Unique identity of a cached tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

impl TileIndex {
    pub fn new(zoom: u8, x: u32, y: u32) -> Self {
        Self { zoom, x, y }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Area to download, given by two opposite corners.
///
/// Corners may be given in any order; the range calculation normalizes them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub start_lat: f64,
    pub end_lat: f64,
    pub start_lon: f64,
    pub end_lon: f64,
}

impl BoundingBox {
    /// Creates a bounding box after checking both corners are projectable.
    ///
    /// Latitudes beyond the Mercator limit would map to unit coordinates
    /// outside the world and produce meaningless tile indices.
    pub fn new(
        start_lat: f64,
        end_lat: f64,
        start_lon: f64,
        end_lon: f64,
    ) -> Result<Self, CoordError> {
        let bbox = Self {
            start_lat,
            end_lat,
            start_lon,
            end_lon,
        };
        bbox.start().validate()?;
        bbox.end().validate()?;
        Ok(bbox)
    }

    pub fn start(&self) -> GeoPoint {
        GeoPoint::new(self.start_lat, self.start_lon)
    }

    pub fn end(&self) -> GeoPoint {
        GeoPoint::new(self.end_lat, self.end_lon)
    }

    /// Returns the same box with start and end swapped on both axes.
    pub fn reversed(&self) -> Self {
        Self {
            start_lat: self.end_lat,
            end_lat: self.start_lat,
            start_lon: self.end_lon,
            end_lon: self.start_lon,
        }
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}) - ({}, {})",
            self.start_lat, self.start_lon, self.end_lat, self.end_lon
        )
    }
}
