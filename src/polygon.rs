//! Arena-backed polygons.
//!
//! A `Polygon` is an ordered list of [`PointId`]s, implicitly closed. Cells,
//! curtain walls and streets all hold polygons over the same [`PointStore`],
//! which is what makes junction optimization and street smoothing propagate:
//! moving one stored point moves it everywhere at once.

use crate::geometry::Ring;
use crate::points::{Point, PointId, PointStore};

#[derive(Clone, Debug, Default)]
pub struct Polygon {
    ids: Vec<PointId>,
}

impl Polygon {
    pub fn new(ids: Vec<PointId>) -> Self {
        Polygon { ids }
    }

    /// Allocate fresh arena points for every coordinate of `ring`.
    pub fn from_ring(ring: &Ring, store: &mut PointStore) -> Self {
        Polygon {
            ids: ring.pts().iter().map(|p| store.insert(*p)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[PointId] {
        &self.ids
    }

    pub fn ids_mut(&mut self) -> &mut Vec<PointId> {
        &mut self.ids
    }

    pub fn id(&self, i: usize) -> PointId {
        self.ids[i]
    }

    pub fn point(&self, i: usize, store: &PointStore) -> Point {
        store.get(self.ids[i])
    }

    /// Owned coordinate snapshot.
    pub fn to_ring(&self, store: &PointStore) -> Ring {
        Ring::new(self.ids.iter().map(|&id| store.get(id)).collect())
    }

    /// Directed edges as id pairs, with wrap-around.
    pub fn edge_ids(&self) -> impl Iterator<Item = (PointId, PointId)> + '_ {
        let n = self.ids.len();
        (0..n).map(move |i| (self.ids[i], self.ids[(i + 1) % n]))
    }

    pub fn index_of(&self, id: PointId) -> Option<usize> {
        self.ids.iter().position(|&v| v == id)
    }

    /// Index of the first vertex matching `p` by coordinates: the value
    /// flavor of lookup, as opposed to identity via [`Polygon::index_of`].
    pub fn find_vertex(&self, p: Point, store: &PointStore) -> Option<usize> {
        (0..self.ids.len()).find(|&i| store.get(self.ids[i]).approx_eq(&p))
    }

    pub fn contains_id(&self, id: PointId) -> bool {
        self.ids.contains(&id)
    }

    /// Index of the directed edge `a -> b`, by identity.
    pub fn find_edge(&self, a: PointId, b: PointId) -> Option<usize> {
        let i = self.index_of(a)?;
        if self.ids[(i + 1) % self.ids.len()] == b {
            Some(i)
        } else {
            None
        }
    }

    pub fn next_id(&self, id: PointId) -> Option<PointId> {
        let i = self.index_of(id)?;
        Some(self.ids[(i + 1) % self.ids.len()])
    }

    pub fn prev_id(&self, id: PointId) -> Option<PointId> {
        let i = self.index_of(id)?;
        Some(self.ids[(i + self.ids.len() - 1) % self.ids.len()])
    }

    pub fn remove_id(&mut self, id: PointId) -> bool {
        if let Some(i) = self.index_of(id) {
            self.ids.remove(i);
            true
        } else {
            false
        }
    }

    /// Drop repeated ids, keeping first occurrences in order.
    pub fn dedup_ids(&mut self) {
        let mut seen = Vec::with_capacity(self.ids.len());
        self.ids.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(*id);
                true
            }
        });
    }

    pub fn area(&self, store: &PointStore) -> f64 {
        self.to_ring(store).area()
    }

    pub fn centroid(&self, store: &PointStore) -> Point {
        self.to_ring(store).centroid()
    }

    pub fn center(&self, store: &PointStore) -> Point {
        self.to_ring(store).center()
    }

    pub fn perimeter(&self, store: &PointStore) -> f64 {
        self.to_ring(store).perimeter()
    }

    /// Weighted neighbor average of vertex `i`: `(prev + f·v + next)/(f+2)`.
    pub fn smooth_vertex(&self, i: usize, f: f64, store: &PointStore) -> Point {
        let n = self.ids.len();
        let prev = store.get(self.ids[(i + n - 1) % n]);
        let v = store.get(self.ids[i]);
        let next = store.get(self.ids[(i + 1) % n]);
        Point::new(
            (prev.x + v.x * f + next.x) / (f + 2.0),
            (prev.y + v.y * f + next.y) / (f + 2.0),
        )
    }

    /// True if the two polygons share a full edge (same id pair, reversed on
    /// the other side), not merely a vertex.
    pub fn borders(&self, other: &Polygon) -> bool {
        self.edge_ids()
            .any(|(a, b)| other.find_edge(b, a).is_some())
    }

    /// Split at two existing vertices into two polygons that keep sharing
    /// their ids with this one.
    pub fn split_at(&self, a: PointId, b: PointId) -> Option<(Polygon, Polygon)> {
        let mut i1 = self.index_of(a)?;
        let mut i2 = self.index_of(b)?;
        if i1 > i2 {
            std::mem::swap(&mut i1, &mut i2);
        }
        if i2 - i1 < 2 || i1 + self.ids.len() - i2 < 2 {
            return None;
        }
        let first = Polygon::new(self.ids[i1..=i2].to_vec());
        let mut rest = self.ids[i2..].to_vec();
        rest.extend_from_slice(&self.ids[..=i1]);
        Some((first, Polygon::new(rest)))
    }

    /// Vertex id minimizing `key`.
    pub fn min_by_key(&self, store: &PointStore, key: impl Fn(Point) -> f64) -> Option<PointId> {
        self.ids
            .iter()
            .copied()
            .min_by(|&a, &b| {
                key(store.get(a))
                    .partial_cmp(&key(store.get(b)))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// Vertex id maximizing `key`.
    pub fn max_by_key(&self, store: &PointStore, key: impl Fn(Point) -> f64) -> Option<PointId> {
        self.ids
            .iter()
            .copied()
            .max_by(|&a, &b| {
                key(store.get(a))
                    .partial_cmp(&key(store.get(b)))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(store: &mut PointStore) -> Polygon {
        let ids = vec![
            store.insert(Point::new(0.0, 0.0)),
            store.insert(Point::new(4.0, 0.0)),
            store.insert(Point::new(4.0, 4.0)),
            store.insert(Point::new(0.0, 4.0)),
        ];
        Polygon::new(ids)
    }

    #[test]
    fn area_through_arena() {
        let mut store = PointStore::new();
        let sq = square(&mut store);
        assert!((sq.area(&store) - 16.0).abs() < 1e-9);
    }

    #[test]
    fn mutating_store_changes_polygon() {
        let mut store = PointStore::new();
        let sq = square(&mut store);
        store.set(sq.id(2), Point::new(8.0, 4.0));
        assert!(sq.area(&store) > 16.0);
    }

    #[test]
    fn shared_edge_is_detected_in_reverse() {
        let mut store = PointStore::new();
        let a = store.insert(Point::new(0.0, 0.0));
        let b = store.insert(Point::new(2.0, 0.0));
        let c = store.insert(Point::new(1.0, 2.0));
        let d = store.insert(Point::new(1.0, -2.0));
        let upper = Polygon::new(vec![a, b, c]);
        let lower = Polygon::new(vec![b, a, d]);
        assert!(upper.borders(&lower));
        assert!(lower.borders(&upper));
    }

    #[test]
    fn vertex_only_contact_is_not_bordering() {
        let mut store = PointStore::new();
        let shared = store.insert(Point::new(0.0, 0.0));
        let a = store.insert(Point::new(-2.0, 0.0));
        let b = store.insert(Point::new(-1.0, 2.0));
        let c = store.insert(Point::new(2.0, 0.0));
        let d = store.insert(Point::new(1.0, -2.0));
        let left = Polygon::new(vec![shared, a, b]);
        let right = Polygon::new(vec![shared, c, d]);
        assert!(!left.borders(&right));
    }

    #[test]
    fn coordinate_lookup_is_independent_of_identity() {
        let mut store = PointStore::new();
        let sq = square(&mut store);
        // A fresh point with the same coordinates is found by value...
        assert_eq!(sq.find_vertex(Point::new(4.0, 4.0), &store), Some(2));
        // ...but a foreign id is not found by identity.
        let foreign = store.insert(Point::new(4.0, 4.0));
        assert_eq!(sq.index_of(foreign), None);
    }

    #[test]
    fn find_edge_is_directed() {
        let mut store = PointStore::new();
        let sq = square(&mut store);
        assert_eq!(sq.find_edge(sq.id(0), sq.id(1)), Some(0));
        assert_eq!(sq.find_edge(sq.id(1), sq.id(0)), None);
    }

    #[test]
    fn split_at_shares_ids() {
        let mut store = PointStore::new();
        let sq = square(&mut store);
        let (first, second) = sq.split_at(sq.id(0), sq.id(2)).unwrap();
        assert_eq!(first.len(), 3);
        assert_eq!(second.len(), 3);
        assert!(first.contains_id(sq.id(0)) && first.contains_id(sq.id(2)));
        assert!(second.contains_id(sq.id(0)) && second.contains_id(sq.id(2)));
    }

    #[test]
    fn dedup_removes_repeats() {
        let mut store = PointStore::new();
        let a = store.insert(Point::new(0.0, 0.0));
        let b = store.insert(Point::new(1.0, 0.0));
        let mut p = Polygon::new(vec![a, b, a, b]);
        p.dedup_ids();
        assert_eq!(p.len(), 2);
    }

    #[test]
    fn smooth_vertex_moves_toward_neighbors() {
        let mut store = PointStore::new();
        let spike = vec![
            store.insert(Point::new(0.0, 0.0)),
            store.insert(Point::new(1.0, 10.0)),
            store.insert(Point::new(2.0, 0.0)),
        ];
        let p = Polygon::new(spike);
        let s = p.smooth_vertex(1, 1.0, &store);
        assert!(s.y < 10.0);
    }
}
