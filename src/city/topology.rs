//! Street-routing graph over the shared-vertex topology.
//!
//! One node per arena vertex that borders a land cell; edges run along cell
//! boundaries, weighted by Euclidean distance. The `inner` and `outer` sets
//! are used by A\* as exclusion sets: streets stay off outer vertices, roads
//! stay off inner ones. Gates belong to both, shore vertices to neither;
//! their nodes are unlinked outright so no path can ride a shoreline.

use crate::city::cell::Cell;
use crate::points::{Point, PointId, PointStore};
use fnv::{FnvHashMap, FnvHashSet};
use log::trace;
use pathfinding::directed::astar::astar;

/// Fixed-point scale for edge weights; `pathfinding` wants `Ord` costs.
const WEIGHT_SCALE: f64 = 100.0;

pub struct Topology {
    adjacency: FnvHashMap<PointId, Vec<(PointId, u32)>>,
    pub inner: FnvHashSet<PointId>,
    pub outer: FnvHashSet<PointId>,
}

impl Topology {
    pub fn new(
        cells: &[Cell],
        gates: &[PointId],
        blocked: &FnvHashSet<PointId>,
        store: &PointStore,
    ) -> Self {
        let mut topo = Topology {
            adjacency: FnvHashMap::default(),
            inner: FnvHashSet::default(),
            outer: FnvHashSet::default(),
        };

        for cell in cells {
            if cell.waterbody {
                continue;
            }
            let n = cell.shape.len();
            for i in 0..n {
                let v0 = cell.shape.id(i);
                let v1 = cell.shape.id((i + 1) % n);

                for &v in &[v0, v1] {
                    if gates.contains(&v) {
                        topo.inner.insert(v);
                        topo.outer.insert(v);
                    } else if cell.within_city {
                        topo.inner.insert(v);
                    } else {
                        topo.outer.insert(v);
                    }
                }

                if !blocked.contains(&v0) && !blocked.contains(&v1) {
                    let w = (Point::distance(store.get(v0), store.get(v1)) * WEIGHT_SCALE)
                        .round() as u32;
                    topo.link(v0, v1, w);
                }
            }
        }

        // Shore vertices must never carry a path: unlink every vertex shared
        // between a land cell and a water cell.
        let mut shore: FnvHashSet<PointId> = FnvHashSet::default();
        for cell in cells {
            if cell.waterbody {
                continue;
            }
            for &id in cell.shape.ids() {
                if shore.contains(&id) {
                    continue;
                }
                let wet = cell.neighbors.iter().any(|&nb| {
                    let nb = &cells[nb.0 as usize];
                    nb.waterbody && nb.shape.contains_id(id)
                });
                if wet {
                    shore.insert(id);
                }
            }
        }
        for id in shore {
            topo.unlink_all(id);
            topo.inner.remove(&id);
            topo.outer.remove(&id);
        }

        topo
    }

    fn link(&mut self, a: PointId, b: PointId, w: u32) {
        let fwd = self.adjacency.entry(a).or_default();
        if !fwd.iter().any(|&(n, _)| n == b) {
            fwd.push((b, w));
        }
        let back = self.adjacency.entry(b).or_default();
        if !back.iter().any(|&(n, _)| n == a) {
            back.push((a, w));
        }
    }

    /// Remove every edge touching `id`.
    pub fn unlink_all(&mut self, id: PointId) {
        if let Some(neighbors) = self.adjacency.remove(&id) {
            for (n, _) in neighbors {
                if let Some(list) = self.adjacency.get_mut(&n) {
                    list.retain(|&(m, _)| m != id);
                }
            }
        }
    }

    pub fn has_node(&self, id: PointId) -> bool {
        self.adjacency.contains_key(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = PointId> + '_ {
        self.adjacency.keys().copied()
    }

    /// Graph node nearest to an arbitrary position.
    pub fn nearest_node(&self, p: Point, store: &PointStore) -> Option<PointId> {
        self.adjacency
            .keys()
            .copied()
            .min_by(|&a, &b| {
                let da = Point::distance(store.get(a), p);
                let db = Point::distance(store.get(b), p);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    /// A\* shortest path from `from` to `to`. Nodes in `exclude` are off
    /// limits except as endpoints (a gate sits in both exclusion sets yet
    /// must begin streets and end roads).
    pub fn path(
        &self,
        from: PointId,
        to: PointId,
        exclude: &FnvHashSet<PointId>,
        store: &PointStore,
    ) -> Option<Vec<PointId>> {
        if !self.has_node(from) || !self.has_node(to) {
            return None;
        }
        let goal = store.get(to);
        let result = astar(
            &from,
            |&node| {
                self.adjacency
                    .get(&node)
                    .into_iter()
                    .flatten()
                    .filter(|&&(n, _)| n == to || !exclude.contains(&n))
                    .copied()
                    .collect::<Vec<_>>()
            },
            |&node| (Point::distance(store.get(node), goal) * WEIGHT_SCALE).round() as u32,
            |&node| node == to,
        );
        match result {
            Some((path, cost)) => {
                trace!("path {} -> {}: {} nodes, cost {}", from, to, path.len(), cost);
                Some(path)
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::Polygon;

    /// A strip of three unit squares: left is within the city, middle and
    /// right are outside.
    fn strip(store: &mut PointStore) -> Vec<Cell> {
        let p: Vec<PointId> = [
            (0.0, 0.0),
            (1.0, 0.0),
            (2.0, 0.0),
            (3.0, 0.0),
            (3.0, 1.0),
            (2.0, 1.0),
            (1.0, 1.0),
            (0.0, 1.0),
        ]
        .iter()
        .map(|&(x, y)| store.insert(Point::new(x, y)))
        .collect();
        let mut a = Cell::new(Polygon::new(vec![p[0], p[1], p[6], p[7]]));
        let mut b = Cell::new(Polygon::new(vec![p[1], p[2], p[5], p[6]]));
        let mut c = Cell::new(Polygon::new(vec![p[2], p[3], p[4], p[5]]));
        a.within_city = true;
        a.neighbors = vec![crate::city::cell::CellId(1)];
        b.neighbors = vec![crate::city::cell::CellId(0), crate::city::cell::CellId(2)];
        c.neighbors = vec![crate::city::cell::CellId(1)];
        vec![a, b, c]
    }

    #[test]
    fn nodes_cover_land_vertices() {
        let mut store = PointStore::new();
        let cells = strip(&mut store);
        let topo = Topology::new(&cells, &[], &FnvHashSet::default(), &store);
        assert_eq!(topo.nodes().count(), 8);
    }

    #[test]
    fn inner_and_outer_sets_follow_city_flag() {
        let mut store = PointStore::new();
        let cells = strip(&mut store);
        let topo = Topology::new(&cells, &[], &FnvHashSet::default(), &store);
        // Left square's outer corner is inner-only.
        let left_corner = cells[0].shape.id(0);
        assert!(topo.inner.contains(&left_corner));
        // Shared corner between city and countryside sits in both.
        let shared = cells[0].shape.id(1);
        assert!(topo.inner.contains(&shared) && topo.outer.contains(&shared));
    }

    #[test]
    fn gate_is_in_both_sets() {
        let mut store = PointStore::new();
        let cells = strip(&mut store);
        let gate = cells[0].shape.id(0);
        let topo = Topology::new(&cells, &[gate], &FnvHashSet::default(), &store);
        assert!(topo.inner.contains(&gate));
        assert!(topo.outer.contains(&gate));
    }

    #[test]
    fn path_follows_edges() {
        let mut store = PointStore::new();
        let cells = strip(&mut store);
        let topo = Topology::new(&cells, &[], &FnvHashSet::default(), &store);
        let from = cells[0].shape.id(0);
        let to = cells[2].shape.id(1);
        let path = topo.path(from, to, &FnvHashSet::default(), &store).unwrap();
        assert_eq!(path.first(), Some(&from));
        assert_eq!(path.last(), Some(&to));
        assert!(path.len() >= 4);
    }

    #[test]
    fn excluded_nodes_are_avoided() {
        let mut store = PointStore::new();
        let cells = strip(&mut store);
        let topo = Topology::new(&cells, &[], &FnvHashSet::default(), &store);
        let from = cells[0].shape.id(0);
        let to = cells[0].shape.id(1);
        let mut exclude = FnvHashSet::default();
        // Block the direct top route; the path must detour or still reach
        // the goal via the bottom edge.
        exclude.insert(cells[0].shape.id(3));
        let path = topo.path(from, to, &exclude, &store).unwrap();
        assert!(!path.iter().any(|id| *id == cells[0].shape.id(3)));
    }

    #[test]
    fn water_cells_add_no_nodes() {
        let mut store = PointStore::new();
        let mut cells = strip(&mut store);
        cells[2].waterbody = true;
        let topo = Topology::new(&cells, &[], &FnvHashSet::default(), &store);
        // Right square's private corners are gone.
        assert!(topo.nodes().count() < 8);
    }

    #[test]
    fn shore_vertices_are_unlinked() {
        let mut store = PointStore::new();
        let mut cells = strip(&mut store);
        cells[2].waterbody = true;
        let topo = Topology::new(&cells, &[], &FnvHashSet::default(), &store);
        // Vertices shared between the middle (land) and right (water)
        // squares are shore: no node survives for them.
        let shore = cells[1].shape.id(1);
        assert!(!topo.has_node(shore));
    }
}
