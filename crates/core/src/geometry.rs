//! Polygon bounding boxes and the overlap test used to correlate label
//! regions with OCR words.

use geo::{Area, BooleanOps, Coord, LineString, Polygon};
use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::{CoreError, Result};

/// Default overlap threshold when callers have no stronger requirement.
pub const OVERLAP_THRESHOLD: f64 = 0.5;

/// Flat polygon coordinates `x0, y0, x1, y1, ...`.
///
/// Coordinates are kept as JSON numbers so an artifact written back out keeps
/// its original representation (`375` stays `375`, not `375.0`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundingBox(Vec<Number>);

impl BoundingBox {
    pub fn from_coords(coords: &[f64]) -> Result<Self> {
        coords
            .iter()
            .map(|&v| Number::from_f64(v).ok_or(CoreError::NonFiniteCoordinate(v)))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }

    pub fn coords(&self) -> Vec<f64> {
        self.0.iter().filter_map(Number::as_f64).collect()
    }

    /// Pairs up the coordinates into `(x, y)` vertices. A trailing unpaired
    /// coordinate is ignored.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.coords()
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// An even number of coordinates forming at least three vertices.
    pub fn is_polygon(&self) -> bool {
        self.0.len() % 2 == 0 && self.0.len() >= 6
    }

    /// Multiplies x coordinates by `sx` and y coordinates by `sy`.
    pub fn scaled(&self, sx: f64, sy: f64) -> Result<Self> {
        let coords: Vec<f64> = self
            .coords()
            .into_iter()
            .enumerate()
            .map(|(i, v)| if i % 2 == 0 { v * sx } else { v * sy })
            .collect();
        Self::from_coords(&coords)
    }

    fn to_polygon(&self) -> Option<Polygon<f64>> {
        if !self.is_polygon() {
            return None;
        }
        let ring: Vec<Coord<f64>> =
            self.points().into_iter().map(|(x, y)| Coord { x, y }).collect();
        Some(Polygon::new(LineString::from(ring), vec![]))
    }
}

/// Intersection area over the smaller of the two polygon areas.
///
/// Degenerate input (too few vertices, zero area) yields `0.0`.
pub fn overlap_ratio(a: &BoundingBox, b: &BoundingBox) -> f64 {
    let (Some(pa), Some(pb)) = (a.to_polygon(), b.to_polygon()) else {
        return 0.0;
    };

    let base_area = pa.unsigned_area().min(pb.unsigned_area());
    if !base_area.is_finite() || base_area <= 0.0 {
        return 0.0;
    }

    let intersect_area = pa.intersection(&pb).unsigned_area();
    intersect_area / base_area
}

/// Whether two boxes overlap by more than `threshold` of the smaller one.
pub fn similar(a: &BoundingBox, b: &BoundingBox, threshold: f64) -> bool {
    overlap_ratio(a, b) > threshold
}
