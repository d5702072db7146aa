//! Spatial clustering of point markers.
//!
//! Markers render at a constant screen size, so their footprint in logical
//! space shrinks as the user zooms in. Markers whose footprints overlap are
//! merged into one expandable badge. Grouping is transitive: a chain of
//! pairwise overlaps collapses into a single group even when the ends of the
//! chain are far apart.
//!
//! [`compute_clusters`] is a pure function of its inputs and is recomputed
//! from scratch every render pass. Expanding a badge never mutates anything
//! here; the viewport zooms to [`declustering_zoom`] and the next pass yields
//! singletons on its own.

#[cfg(test)]
#[path = "cluster_test.rs"]
mod cluster_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Point;

/// Unique identifier for a map marker.
pub type MarkerId = Uuid;

/// One map entity pinned at a logical position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointMarker {
    pub id: MarkerId,
    /// Logical center of the marker.
    pub x: f64,
    pub y: f64,
    /// Nominal logical footprint at a marker render scale of 1.
    pub width: f64,
    pub height: f64,
    /// Opaque reference handed back to the host on selection.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl PointMarker {
    #[must_use]
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Footprint box scaled by `scale` about the marker center.
    #[must_use]
    pub fn bounds(&self, scale: f64) -> Bounds {
        let half_w = self.width.abs() * scale * 0.5;
        let half_h = self.height.abs() * scale * 0.5;
        Bounds { min_x: self.x - half_w, min_y: self.y - half_h, max_x: self.x + half_w, max_y: self.y + half_h }
    }
}

/// Axis-aligned box in logical space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    /// Strict overlap; boxes that only touch do not intersect.
    #[must_use]
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.min_x < other.max_x && other.min_x < self.max_x && self.min_y < other.max_y && other.min_y < self.max_y
    }

    #[must_use]
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min_x && p.x <= self.max_x && p.y >= self.min_y && p.y <= self.max_y
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new((self.min_x + self.max_x) * 0.5, (self.min_y + self.max_y) * 0.5)
    }
}

/// A render group: one marker on its own, or several merged into a badge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClusterGroup {
    Single { marker: PointMarker },
    Merged {
        /// At least two members, in input order.
        members: Vec<PointMarker>,
        /// Arithmetic mean of member positions.
        centroid: Point,
        /// Union of member footprints; sizes the expand hit-target.
        bounds: Bounds,
    },
}

impl ClusterGroup {
    /// Members of the group, in input order.
    #[must_use]
    pub fn members(&self) -> &[PointMarker] {
        match self {
            Self::Single { marker } => std::slice::from_ref(marker),
            Self::Merged { members, .. } => members,
        }
    }

    #[must_use]
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged { .. })
    }

    /// Hit-target of the group at the given proximity scale.
    #[must_use]
    pub fn hit_bounds(&self, proximity_scale: f64) -> Bounds {
        match self {
            Self::Single { marker } => marker.bounds(proximity_scale),
            Self::Merged { bounds, .. } => *bounds,
        }
    }
}

/// Disjoint-set forest over marker indices.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self { parent: (0..n).collect(), rank: vec![0; n] }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }
}

/// Partition `markers` into render groups.
///
/// Each marker's footprint is scaled by `proximity_scale` about its center;
/// markers whose scaled footprints overlap (directly or through a chain of
/// overlaps) share a group. Groups are ordered by their first member's input
/// position, and members keep input order, so identical inputs always give
/// identical output.
#[must_use]
pub fn compute_clusters(markers: &[PointMarker], proximity_scale: f64) -> Vec<ClusterGroup> {
    let scale = if proximity_scale.is_finite() { proximity_scale.max(0.0) } else { 0.0 };
    let boxes: Vec<Bounds> = markers.iter().map(|m| m.bounds(scale)).collect();

    // Sweep along x so only boxes whose x-ranges overlap are compared.
    let mut order: Vec<usize> = (0..markers.len()).collect();
    order.sort_by(|&a, &b| boxes[a].min_x.total_cmp(&boxes[b].min_x).then(a.cmp(&b)));

    let mut sets = UnionFind::new(markers.len());
    for (pos, &i) in order.iter().enumerate() {
        for &j in &order[pos + 1..] {
            if boxes[j].min_x >= boxes[i].max_x {
                break;
            }
            if boxes[i].intersects(&boxes[j]) {
                sets.union(i, j);
            }
        }
    }

    let mut slot_of_root: Vec<Option<usize>> = vec![None; markers.len()];
    let mut buckets: Vec<Vec<usize>> = Vec::new();
    for i in 0..markers.len() {
        let root = sets.find(i);
        let slot = *slot_of_root[root].get_or_insert_with(|| {
            buckets.push(Vec::new());
            buckets.len() - 1
        });
        buckets[slot].push(i);
    }

    buckets
        .into_iter()
        .map(|bucket| {
            if let [only] = bucket.as_slice() {
                return ClusterGroup::Single { marker: markers[*only].clone() };
            }
            let members: Vec<PointMarker> = bucket.iter().map(|&i| markers[i].clone()).collect();
            #[allow(clippy::cast_precision_loss)]
            let n = members.len() as f64;
            let centroid = Point::new(
                members.iter().map(|m| m.x).sum::<f64>() / n,
                members.iter().map(|m| m.y).sum::<f64>() / n,
            );
            let bounds = bucket[1..].iter().fold(boxes[bucket[0]], |acc, &i| acc.union(&boxes[i]));
            ClusterGroup::Merged { members, centroid, bounds }
        })
        .collect()
}

/// Largest proximity scale at which no two members of `members` overlap.
///
/// Two centered boxes stop overlapping once the scale is at most the larger of
/// the per-axis ratios between center distance and combined half-extents.
/// Returns `None` when some pair cannot be separated (identical positions with
/// non-zero size).
#[must_use]
pub fn separating_scale(members: &[PointMarker]) -> Option<f64> {
    let mut limit = f64::INFINITY;
    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            let span_x = (a.width.abs() + b.width.abs()) * 0.5;
            let span_y = (a.height.abs() + b.height.abs()) * 0.5;
            let ratio_x = axis_ratio((a.x - b.x).abs(), span_x);
            let ratio_y = axis_ratio((a.y - b.y).abs(), span_y);
            limit = limit.min(ratio_x.max(ratio_y));
        }
    }
    if limit > 0.0 { Some(limit) } else { None }
}

fn axis_ratio(distance: f64, span: f64) -> f64 {
    if span > 0.0 { distance / span } else { f64::INFINITY }
}

/// Zoom at which a merged group falls apart into singletons.
///
/// `marker_constant` is the device-dependent factor in
/// `proximity_scale = marker_constant / zoom`; `headroom` pushes the result a
/// little past the exact boundary. The caller clamps to its zoom bounds.
/// Returns `None` when the group cannot be separated at any zoom.
#[must_use]
pub fn declustering_zoom(group: &ClusterGroup, marker_constant: f64, headroom: f64) -> Option<f64> {
    let ClusterGroup::Merged { members, .. } = group else {
        return None;
    };
    let scale = separating_scale(members)?;
    if scale.is_infinite() {
        return None;
    }
    Some(marker_constant / scale * headroom)
}
