//! Curtain walls: circumference, gates, towers.

use crate::city::cell::{Cell, CellId};
use crate::error::TownError;
use crate::points::{Point, PointId, PointStore};
use crate::polygon::Polygon;
use crate::random::Rng;
use log::debug;

/// A fortification ring around a set of cells. The border of an unwalled
/// town is the same structure with `real` unset: it still selects gates (the
/// points where roads enter) but has no masonry, towers or smoothing.
#[derive(Clone, Debug)]
pub struct CurtainWall {
    pub shape: Polygon,
    /// Which edges of `shape` carry actual masonry. An edge is disabled when
    /// it runs along water or along the citadel wall.
    pub segments: Vec<bool>,
    /// Gate vertices, shared with `shape` (same ids).
    pub gates: Vec<PointId>,
    pub towers: Vec<Point>,
    real: bool,
    members: Vec<CellId>,
}

impl CurtainWall {
    /// Build the wall around `members`. `reserved` vertices (citadel corners
    /// shared with the town wall) are never smoothed or used as gates.
    pub fn new(
        real: bool,
        cells: &[Cell],
        members: Vec<CellId>,
        reserved: &[PointId],
        store: &mut PointStore,
        rng: &mut Rng,
    ) -> Result<Self, TownError> {
        let shape = if members.len() == 1 {
            cells[members[0].0 as usize].shape.clone()
        } else {
            let shape = circumference(cells, &members);
            if real {
                smooth_wall(&shape, reserved, store, members.len());
            }
            shape
        };

        let segments = vec![true; shape.len()];
        let mut wall = CurtainWall {
            shape,
            segments,
            gates: Vec::new(),
            towers: Vec::new(),
            real,
            members,
        };
        wall.build_gates(cells, reserved, store, rng)?;
        Ok(wall)
    }

    pub fn is_real(&self) -> bool {
        self.real
    }

    pub fn members(&self) -> &[CellId] {
        &self.members
    }

    pub fn contains_member(&self, id: CellId) -> bool {
        self.members.contains(&id)
    }

    fn build_gates(
        &mut self,
        cells: &[Cell],
        reserved: &[PointId],
        store: &mut PointStore,
        rng: &mut Rng,
    ) -> Result<(), TownError> {
        // Candidate gate vertices. With several member cells a gate must sit
        // where more than one interior cell meets the wall, so the street
        // behind it can fan out; a single-cell wall accepts any vertex.
        let mut entrances: Vec<PointId> = if self.members.len() > 1 {
            self.shape
                .ids()
                .iter()
                .copied()
                .filter(|id| {
                    !reserved.contains(id)
                        && self
                            .members
                            .iter()
                            .filter(|&&m| cells[m.0 as usize].shape.contains_id(*id))
                            .count()
                            > 1
                })
                .collect()
        } else {
            self.shape
                .ids()
                .iter()
                .copied()
                .filter(|id| !reserved.contains(id))
                .collect()
        };

        if entrances.is_empty() {
            // Pool exhausted before selection: fall back to every
            // non-reserved vertex.
            entrances = self
                .shape
                .ids()
                .iter()
                .copied()
                .filter(|id| !reserved.contains(id))
                .collect();
        }

        while !entrances.is_empty() {
            let index = rng.index(entrances.len());
            let gate = entrances[index];
            self.gates.push(gate);

            // Drop the pick and both its pool neighbors so gates never end
            // up on adjacent wall vertices.
            let n = entrances.len();
            let mut kill: Vec<usize> = vec![index];
            if n > 1 {
                kill.push((index + 1) % n);
                kill.push((index + n - 1) % n);
            }
            kill.sort_unstable();
            kill.dedup();
            for &k in kill.iter().rev() {
                entrances.remove(k);
            }

            if entrances.len() < 3 {
                break;
            }
        }

        if self.gates.is_empty() {
            return Err(TownError::NoGates);
        }

        if self.real {
            // Ease the wall out around each gate so the opening reads as an
            // entrance rather than a kink.
            for &gate in &self.gates {
                if let Some(i) = self.shape.index_of(gate) {
                    let smoothed = self.shape.smooth_vertex(i, 1.0, store);
                    store.set(gate, smoothed);
                }
            }
        }

        debug!("wall: {} gates selected", self.gates.len());
        Ok(())
    }

    /// Disable masonry on edges where `pred` holds for the edge's id pair.
    pub fn disable_segments(&mut self, mut pred: impl FnMut(PointId, PointId) -> bool) {
        let n = self.shape.len();
        for i in 0..n {
            let v0 = self.shape.id(i);
            let v1 = self.shape.id((i + 1) % n);
            if pred(v0, v1) {
                self.segments[i] = false;
            }
        }
    }

    /// Towers stand on every non-gate vertex that flanks at least one
    /// enabled segment.
    pub fn build_towers(&mut self, store: &PointStore) {
        self.towers.clear();
        if !self.real {
            return;
        }
        let n = self.shape.len();
        for i in 0..n {
            let id = self.shape.id(i);
            if self.gates.contains(&id) {
                continue;
            }
            let prev_seg = self.segments[(i + n - 1) % n];
            let curr_seg = self.segments[i];
            if prev_seg || curr_seg {
                self.towers.push(store.get(id));
            }
        }
    }

    /// True if `v0 -> v1` lies on an enabled wall segment, viewed from
    /// inside (`within`) or outside the walled set.
    pub fn borders_by(&self, within: bool, v0: PointId, v1: PointId) -> bool {
        let index = if within {
            self.shape.find_edge(v0, v1)
        } else {
            self.shape.find_edge(v1, v0)
        };
        match index {
            Some(i) => self.segments[i],
            None => false,
        }
    }
}

/// Oriented boundary of a cell set: an edge belongs to the circumference iff
/// no other member holds its reverse. Chaining follows shared ids, so the
/// result aliases the member polygons' vertices.
pub fn circumference(cells: &[Cell], members: &[CellId]) -> Polygon {
    if members.is_empty() {
        return Polygon::default();
    }
    if members.len() == 1 {
        return cells[members[0].0 as usize].shape.clone();
    }

    let mut boundary: Vec<(PointId, PointId)> = Vec::new();
    for &m in members {
        let shape = &cells[m.0 as usize].shape;
        for (v0, v1) in shape.edge_ids() {
            let shared = members.iter().any(|&other| {
                other != m && cells[other.0 as usize].shape.find_edge(v1, v0).is_some()
            });
            if !shared {
                boundary.push((v0, v1));
            }
        }
    }

    if boundary.is_empty() {
        return Polygon::default();
    }

    let mut ids = vec![boundary[0].0];
    let mut current = boundary[0].1;
    boundary.remove(0);
    let mut guard = boundary.len() + 10;
    while !boundary.is_empty() && guard > 0 {
        guard -= 1;
        ids.push(current);
        match boundary.iter().position(|&(a, _)| a == current) {
            Some(i) => {
                current = boundary[i].1;
                boundary.remove(i);
            }
            None => {
                // Disconnected boundary (enclosed hole); restart on any
                // remaining edge and keep the longest loop we walked.
                break;
            }
        }
    }

    let mut result = Polygon::new(ids);
    result.dedup_ids();
    result
}

fn smooth_wall(shape: &Polygon, reserved: &[PointId], store: &mut PointStore, n_members: usize) {
    let factor = (40.0 / n_members as f64).min(1.0);
    let smoothed: Vec<Option<Point>> = (0..shape.len())
        .map(|i| {
            if reserved.contains(&shape.id(i)) {
                None
            } else {
                Some(shape.smooth_vertex(i, factor, store))
            }
        })
        .collect();
    for (i, p) in smoothed.into_iter().enumerate() {
        if let Some(p) = p {
            store.set(shape.id(i), p);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two squares side by side sharing one edge.
    fn two_cells(store: &mut PointStore) -> Vec<Cell> {
        let a = store.insert(Point::new(0.0, 0.0));
        let b = store.insert(Point::new(4.0, 0.0));
        let c = store.insert(Point::new(8.0, 0.0));
        let d = store.insert(Point::new(8.0, 4.0));
        let e = store.insert(Point::new(4.0, 4.0));
        let f = store.insert(Point::new(0.0, 4.0));
        vec![
            Cell::new(Polygon::new(vec![a, b, e, f])),
            Cell::new(Polygon::new(vec![b, c, d, e])),
        ]
    }

    #[test]
    fn circumference_drops_shared_edge() {
        let mut store = PointStore::new();
        let cells = two_cells(&mut store);
        let ring = circumference(&cells, &[CellId(0), CellId(1)]);
        assert_eq!(ring.len(), 6);
        // The merged outline covers both squares.
        assert!((ring.area(&store).abs() - 32.0).abs() < 1e-9);
    }

    #[test]
    fn circumference_shares_ids_with_members() {
        let mut store = PointStore::new();
        let cells = two_cells(&mut store);
        let ring = circumference(&cells, &[CellId(0), CellId(1)]);
        for id in ring.ids() {
            assert!(
                cells[0].shape.contains_id(*id) || cells[1].shape.contains_id(*id)
            );
        }
    }

    #[test]
    fn gates_are_shape_vertices() {
        let mut store = PointStore::new();
        let cells = two_cells(&mut store);
        let mut rng = Rng::new(4);
        let wall = CurtainWall::new(
            false,
            &cells,
            vec![CellId(0), CellId(1)],
            &[],
            &mut store,
            &mut rng,
        )
        .unwrap();
        assert!(!wall.gates.is_empty());
        for g in &wall.gates {
            assert!(wall.shape.contains_id(*g));
        }
    }

    #[test]
    fn no_adjacent_gates() {
        let mut store = PointStore::new();
        let cells = two_cells(&mut store);
        let mut rng = Rng::new(11);
        let wall = CurtainWall::new(
            false,
            &cells,
            vec![CellId(0), CellId(1)],
            &[],
            &mut store,
            &mut rng,
        )
        .unwrap();
        let n = wall.shape.len();
        for g in &wall.gates {
            let i = wall.shape.index_of(*g).unwrap();
            let prev = wall.shape.id((i + n - 1) % n);
            let next = wall.shape.id((i + 1) % n);
            assert!(!wall.gates.contains(&prev));
            assert!(!wall.gates.contains(&next));
        }
    }

    #[test]
    fn towers_skip_gates_and_disabled_segments() {
        let mut store = PointStore::new();
        let cells = two_cells(&mut store);
        let mut rng = Rng::new(2);
        let mut wall = CurtainWall::new(
            true,
            &cells,
            vec![CellId(0), CellId(1)],
            &[],
            &mut store,
            &mut rng,
        )
        .unwrap();
        // Disable everything: no towers possible.
        for s in wall.segments.iter_mut() {
            *s = false;
        }
        wall.build_towers(&store);
        assert!(wall.towers.is_empty());

        // All enabled: every non-gate vertex carries a tower.
        for s in wall.segments.iter_mut() {
            *s = true;
        }
        wall.build_towers(&store);
        assert_eq!(wall.towers.len(), wall.shape.len() - wall.gates.len());
    }

    #[test]
    fn unreal_wall_has_no_towers() {
        let mut store = PointStore::new();
        let cells = two_cells(&mut store);
        let mut rng = Rng::new(6);
        let mut wall = CurtainWall::new(
            false,
            &cells,
            vec![CellId(0), CellId(1)],
            &[],
            &mut store,
            &mut rng,
        )
        .unwrap();
        wall.build_towers(&store);
        assert!(wall.towers.is_empty());
    }
}
