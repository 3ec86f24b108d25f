//! Ward-groups: adjacency-connected same-type patches that share one
//! parameter set and one geometry computation.

use crate::city::bisector::Bisector;
use crate::city::block::Block;
use crate::city::cell::{Cell, CellId, GroupId};
use crate::geometry::Ring;
use crate::points::Point;
use crate::polygon::Polygon;
use crate::random::Rng;
use log::{debug, warn};

/// Shared block parameters, freshly sampled per group. The draws happen in
/// a fixed order so a seed reproduces every group exactly.
#[derive(Clone, Debug, Default)]
pub struct AlleyParams {
    /// Minimum building-lot area.
    pub min_sq: f64,
    /// Disorder of cut placement.
    pub grid_chaos: f64,
    /// Disorder of block sizes.
    pub size_chaos: f64,
    /// Building footprint granularity.
    pub shape_factor: f64,
    /// Base inset for unclassified border edges.
    pub inset: f64,
    /// Target number of lots per block.
    pub block_size: f64,
    /// Minimum lot frontage, derived from `min_sq`.
    pub min_front: f64,
}

impl AlleyParams {
    pub fn sample(rng: &mut Rng) -> Self {
        let min_sq = 15.0 + 40.0 * rng.normal4().abs();
        let grid_chaos = 0.2 + rng.normal3() * 0.8;
        let size_chaos = 0.4 + rng.normal3() * 0.6;
        let shape_factor = 0.25 + rng.normal3() * 2.0;
        let inset = 0.6 * (1.0 - rng.normal4().abs());
        let block_size = 4.0 + 10.0 * rng.normal3();
        AlleyParams {
            min_sq,
            grid_chaos,
            size_chaos,
            shape_factor,
            inset,
            block_size,
            min_front: min_sq.sqrt(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct WardGroup {
    pub id: GroupId,
    pub members: Vec<CellId>,
    /// The one member whose ward emits this group's geometry.
    pub core: CellId,
    /// Merged circumference of the member shapes, sharing their vertex ids.
    pub border: Polygon,
    /// True when every border vertex is interior to the walled area; sprawl
    /// groups get looser, greener parameters.
    pub urban: bool,
    pub params: AlleyParams,
    pub greenery: f64,
    pub blocks: Vec<Block>,
    /// Bisector cut polylines, kept as the alley network between blocks.
    pub alleys: Vec<Vec<Point>>,
    pub trees: Vec<Point>,
}

impl WardGroup {
    /// Sample parameters, bisect the available area into blocks, and fill
    /// every block with lots and buildings.
    ///
    /// `insets` carries one entry per border edge: `Some(d)` for classified
    /// edges (coast, road, wall, canal, horizon), `None` where the group's
    /// own sampled inset applies.
    pub fn create_geometry(
        &mut self,
        border_ring: &Ring,
        insets: &[Option<f64>],
        is_park: bool,
        rng: &mut Rng,
    ) {
        self.params = AlleyParams::sample(rng);
        let g = rng.normal3();
        self.greenery = if is_park { g } else { g * g };
        if !self.urban {
            self.params.grid_chaos *= 0.5;
            self.params.block_size *= 2.0;
            self.greenery = (1.0 + self.greenery) / 2.0;
        }

        if border_ring.len() < 3 {
            warn!("group {:?}: degenerate border, skipping", self.id);
            return;
        }

        let resolved: Vec<f64> = insets
            .iter()
            .map(|d| d.unwrap_or(self.params.inset))
            .collect();
        let available = border_ring.shrink(&resolved);
        if available.len() < 3 || available.area().abs() < self.params.min_sq / 4.0 {
            warn!("group {:?}: no area left after insets", self.id);
            return;
        }

        let mut bisector = Bisector::new(
            self.params.min_sq * self.params.block_size,
            1.0 + self.params.size_chaos,
        );
        let parts = bisector.partition(&available, rng);
        self.alleys = std::mem::take(&mut bisector.cuts);

        self.blocks.clear();
        for part in parts {
            if part.len() < 3 || part.area().abs() < self.params.min_sq / 4.0 {
                continue;
            }
            let mut block = Block::new(part);
            block.create_lots(&self.params);
            block.filter_inner();
            if self.urban {
                block.indent_fronts(rng);
            }
            block.create_rects();
            block.create_buildings(&self.params, rng);
            self.blocks.push(block);
        }

        self.trees.clear();
        for block in &self.blocks {
            self.trees
                .extend(block.spawn_trees(self.greenery, self.urban, rng));
        }

        debug!(
            "group {:?}: {} blocks, {} buildings, {} trees",
            self.id,
            self.blocks.len(),
            self.blocks.iter().map(|b| b.buildings.len()).sum::<usize>(),
            self.trees.len()
        );
    }

    pub fn building_count(&self) -> usize {
        self.blocks.iter().map(|b| b.buildings.len()).sum()
    }
}

/// Group adjacent same-kind cells. `eligible` and `same_kind` abstract over
/// the ward table so this stays a pure cell-graph walk. Growth stops early
/// with probability `(len - 3) / len` per step, giving mostly 1–6 cell
/// groups.
pub fn build_groups(
    cells: &mut [Cell],
    eligible: impl Fn(CellId) -> bool,
    same_kind: impl Fn(CellId, CellId) -> bool,
    rng: &mut Rng,
) -> Vec<WardGroup> {
    let mut unassigned: Vec<CellId> = (0..cells.len() as u32)
        .map(CellId)
        .filter(|&id| eligible(id))
        .collect();

    let mut groups: Vec<WardGroup> = Vec::new();
    while !unassigned.is_empty() {
        let seed = unassigned.remove(0);
        let gid = GroupId(groups.len() as u32);
        let mut members = vec![seed];

        loop {
            // Same-kind neighbors of the current members still unassigned.
            let mut candidates: Vec<CellId> = Vec::new();
            for &m in &members {
                for &nb in &cells[m.0 as usize].neighbors {
                    if unassigned.contains(&nb)
                        && same_kind(seed, nb)
                        && !candidates.contains(&nb)
                    {
                        candidates.push(nb);
                    }
                }
            }
            if candidates.is_empty() {
                break;
            }
            let stop_prob = (members.len() as f64 - 3.0) / members.len() as f64;
            if members.len() > 1 && unassigned.len() > 1 && rng.float() < stop_prob.max(0.0) {
                break;
            }
            let chosen = candidates[rng.index(candidates.len())];
            members.push(chosen);
            unassigned.retain(|&c| c != chosen);
        }

        for &m in &members {
            cells[m.0 as usize].group = Some(gid);
        }
        groups.push(WardGroup {
            id: gid,
            core: seed,
            members,
            border: Polygon::default(),
            urban: false,
            params: AlleyParams::default(),
            greenery: 0.0,
            blocks: Vec::new(),
            alleys: Vec::new(),
            trees: Vec::new(),
        });
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_of_cells(n: usize) -> Vec<Cell> {
        // Cells in a row, each adjacent to the previous and next.
        (0..n)
            .map(|i| {
                let mut c = Cell::default();
                if i > 0 {
                    c.neighbors.push(CellId((i - 1) as u32));
                }
                if i + 1 < n {
                    c.neighbors.push(CellId((i + 1) as u32));
                }
                c
            })
            .collect()
    }

    #[test]
    fn every_eligible_cell_gets_a_group() {
        let mut cells = chain_of_cells(9);
        let mut rng = Rng::new(6);
        let groups = build_groups(&mut cells, |_| true, |_, _| true, &mut rng);
        assert!(!groups.is_empty());
        for cell in &cells {
            assert!(cell.group.is_some());
        }
        let total: usize = groups.iter().map(|g| g.members.len()).sum();
        assert_eq!(total, 9);
    }

    #[test]
    fn core_is_first_member() {
        let mut cells = chain_of_cells(5);
        let mut rng = Rng::new(1);
        let groups = build_groups(&mut cells, |_| true, |_, _| true, &mut rng);
        for g in &groups {
            assert_eq!(g.core, g.members[0]);
        }
    }

    #[test]
    fn ineligible_cells_stay_ungrouped() {
        let mut cells = chain_of_cells(6);
        let mut rng = Rng::new(2);
        let groups = build_groups(&mut cells, |id| id.0 % 2 == 0, |_, _| true, &mut rng);
        for g in &groups {
            for m in &g.members {
                assert_eq!(m.0 % 2, 0);
            }
        }
        assert!(cells[1].group.is_none());
    }

    #[test]
    fn params_are_in_documented_ranges() {
        let mut rng = Rng::new(14);
        for _ in 0..50 {
            let p = AlleyParams::sample(&mut rng);
            assert!((15.0..55.0).contains(&p.min_sq));
            assert!((0.2..1.0).contains(&p.grid_chaos));
            assert!((0.4..1.0).contains(&p.size_chaos));
            assert!((0.25..2.25).contains(&p.shape_factor));
            assert!((0.0..=0.6).contains(&p.inset));
            assert!((4.0..14.0).contains(&p.block_size));
            assert!((p.min_front - p.min_sq.sqrt()).abs() < 1e-12);
        }
    }

    #[test]
    fn geometry_fills_a_simple_border() {
        let mut rng = Rng::new(20);
        let mut group = WardGroup {
            id: GroupId(0),
            members: vec![CellId(0)],
            core: CellId(0),
            border: Polygon::default(),
            urban: true,
            params: AlleyParams::default(),
            greenery: 0.0,
            blocks: Vec::new(),
            alleys: Vec::new(),
            trees: Vec::new(),
        };
        let mut border = Ring::rect(60.0, 50.0);
        border.offset(30.0, 25.0);
        let insets = vec![None; border.len()];
        group.create_geometry(&border, &insets, false, &mut rng);
        assert!(!group.blocks.is_empty());
        assert!(group.building_count() > 0);
    }

    #[test]
    fn sprawl_group_doubles_block_size() {
        // Two groups with identical RNG streams, differing only in the
        // urban flag, must diverge exactly by the sprawl adjustments.
        let mut border = Ring::rect(60.0, 50.0);
        border.offset(30.0, 25.0);
        let insets = vec![None; border.len()];

        let make = |urban: bool| {
            let mut rng = Rng::new(33);
            let mut g = WardGroup {
                id: GroupId(0),
                members: vec![CellId(0)],
                core: CellId(0),
                border: Polygon::default(),
                urban,
                params: AlleyParams::default(),
                greenery: 0.0,
                blocks: Vec::new(),
                alleys: Vec::new(),
                trees: Vec::new(),
            };
            g.create_geometry(&border, &insets, false, &mut rng);
            g
        };
        let urban = make(true);
        let sprawl = make(false);
        assert!((sprawl.params.block_size - urban.params.block_size * 2.0).abs() < 1e-9);
        assert!((sprawl.params.grid_chaos - urban.params.grid_chaos * 0.5).abs() < 1e-9);
        assert!(sprawl.greenery >= urban.greenery);
    }
}
