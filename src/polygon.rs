//! License-area polygons and their geometry.
//!
//! A polygon keeps two views of its outline in sync: the ordered vertex list,
//! and a flattened `x, y, x, y, …` list that the renderer draws and the data
//! layer persists verbatim. While a polygon is being sketched the flattened
//! list may carry one extra trailing pair, the live pointer preview, which is
//! stripped before the polygon counts as complete.

#[cfg(test)]
#[path = "polygon_test.rs"]
mod polygon_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Point;
use crate::consts::{MIN_POLYGON_AREA, MIN_POLYGON_VERTICES};

/// Unique identifier for a polygon.
pub type PolygonId = Uuid;

/// Identifier of a license area in the relational layer.
pub type AreaId = i64;

/// The license area a polygon outlines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaLink {
    pub id: AreaId,
    pub name: String,
}

/// An operator-drawn outline on a field map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub id: PolygonId,
    /// Logical vertices in capture order.
    pub vertices: Vec<Point>,
    /// Flattened vertices, possibly followed by one preview pair.
    pub flat: Vec<f64>,
    pub is_finished: bool,
    pub area: Option<AreaLink>,
}

impl Polygon {
    /// A fresh, empty sketch.
    #[must_use]
    pub fn new(id: PolygonId) -> Self {
        Self { id, vertices: Vec::new(), flat: Vec::new(), is_finished: false, area: None }
    }

    /// Rebuild a finished polygon from stored point pairs.
    #[must_use]
    pub fn from_stored(stored: &StoredPolygon) -> Self {
        let vertices = stored.points.clone();
        Self {
            id: stored.id,
            flat: flatten(&vertices),
            is_finished: vertices.len() >= MIN_POLYGON_VERTICES,
            vertices,
            area: stored.area.clone(),
        }
    }

    /// Whether the flattened list carries a trailing preview pair.
    #[must_use]
    pub fn has_preview(&self) -> bool {
        self.flat.len() > self.vertices.len() * 2
    }

    /// The preview pair, if any.
    #[must_use]
    pub fn preview(&self) -> Option<Point> {
        if !self.has_preview() {
            return None;
        }
        match &self.flat[self.vertices.len() * 2..] {
            [x, y, ..] => Some(Point::new(*x, *y)),
            _ => None,
        }
    }

    /// Append a permanent vertex. Drops any preview pair.
    pub fn push_vertex(&mut self, p: Point) {
        self.vertices.push(p);
        self.flat = flatten(&self.vertices);
    }

    /// Replace the preview pair with `p`. Ignored once finished.
    pub fn set_preview(&mut self, p: Point) {
        if self.is_finished {
            return;
        }
        self.strip_preview();
        self.flat.push(p.x);
        self.flat.push(p.y);
    }

    /// Truncate the flattened list to exactly the vertices.
    pub fn strip_preview(&mut self) {
        self.flat.truncate(self.vertices.len() * 2);
    }

    /// Move vertex `index`, keeping the flattened list in sync.
    ///
    /// Returns `false` (and changes nothing) for an out-of-range index.
    pub fn move_vertex(&mut self, index: usize, p: Point) -> bool {
        let Some(v) = self.vertices.get_mut(index) else {
            return false;
        };
        *v = p;
        if let Some(pair) = self.flat.get_mut(index * 2..index * 2 + 2) {
            pair[0] = p.x;
            pair[1] = p.y;
        }
        true
    }

    /// Signed shoelace area; positive for counter-clockwise outlines in logical space.
    #[must_use]
    pub fn signed_area(&self) -> f64 {
        signed_area(&self.vertices)
    }

    /// Enough distinct vertices with a non-zero enclosed area.
    #[must_use]
    pub fn is_closable(&self) -> bool {
        self.vertices.len() >= MIN_POLYGON_VERTICES && self.signed_area().abs() >= MIN_POLYGON_AREA
    }

    /// Index of the vertex nearest to `p` within `radius`, if any.
    #[must_use]
    pub fn vertex_at(&self, p: Point, radius: f64) -> Option<usize> {
        self.vertices
            .iter()
            .enumerate()
            .map(|(i, v)| (i, v.distance(p)))
            .filter(|&(_, d)| d <= radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Whether `p` lands on the first vertex, closing the loop.
    #[must_use]
    pub fn hits_first_vertex(&self, p: Point, radius: f64) -> bool {
        self.vertices.first().is_some_and(|first| first.distance(p) <= radius)
    }

    /// Finished and linked to a license area.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.is_finished && self.area.is_some()
    }
}

/// A polygon as handed over by the data layer, already split into point pairs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPolygon {
    pub id: PolygonId,
    #[serde(default)]
    pub area: Option<AreaLink>,
    pub points: Vec<Point>,
}

/// A polygon ready to be written by the data layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedPolygon {
    pub id: PolygonId,
    pub area_id: AreaId,
    /// Flattened `x, y` pairs, preview stripped.
    pub points: Vec<f64>,
}

/// Why a polygon was left out of a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    Unfinished,
    MissingArea,
}

/// A polygon skipped at save time; surfaced as a non-blocking notice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Excluded {
    pub id: PolygonId,
    pub reason: ExclusionReason,
}

/// Result of saving the working set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SaveReport {
    pub polygons: Vec<SavedPolygon>,
    pub excluded: Vec<Excluded>,
}

/// Keep finished, area-linked polygons; report the rest.
#[must_use]
pub fn save_polygons(polygons: &[Polygon]) -> SaveReport {
    let mut report = SaveReport::default();
    for polygon in polygons {
        match (&polygon.area, polygon.is_finished) {
            (_, false) => report.excluded.push(Excluded { id: polygon.id, reason: ExclusionReason::Unfinished }),
            (None, true) => report.excluded.push(Excluded { id: polygon.id, reason: ExclusionReason::MissingArea }),
            (Some(area), true) => report.polygons.push(SavedPolygon {
                id: polygon.id,
                area_id: area.id,
                points: flatten(&polygon.vertices),
            }),
        }
    }
    report
}

/// Flatten points into `x, y, x, y, …`.
#[must_use]
pub fn flatten(points: &[Point]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}

/// Split a flattened list into points; a dangling odd value is dropped.
#[must_use]
pub fn unflatten(flat: &[f64]) -> Vec<Point> {
    flat.chunks_exact(2).map(|pair| Point::new(pair[0], pair[1])).collect()
}

/// Signed shoelace area of a closed ring.
#[must_use]
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let twice: f64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x * b.y - b.x * a.y)
        .sum();
    twice * 0.5
}
