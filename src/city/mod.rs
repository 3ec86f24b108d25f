//! The town generator pipeline.
//!
//! `City::build` runs the stages in fixed order (tessellation, junction
//! optimization, fortification, domain classification, street routing,
//! ward assignment, group/block geometry), each stage consuming only the
//! output of earlier ones. All randomness comes from the one seeded [`Rng`],
//! drawn in a documented order, so a build is a pure function of
//! `(n_cells, seed, feature flags)`.

pub mod bisector;
pub mod block;
pub mod building;
pub mod canal;
pub mod cell;
pub mod group;
pub mod topology;
pub mod wall;
pub mod wards;

use crate::constants::{JUNCTION_EPSILON, MAX_CELLS, MIN_CELLS};
use crate::error::TownError;
use crate::geometry::Ring;
use crate::points::{Point, PointId, PointStore};
use crate::random::Rng;
use crate::tessellate;
use bitflags::bitflags;
use canal::Canal;
use cell::{Cell, CellId, EdgeType, WardId};
use fnv::{FnvHashMap, FnvHashSet};
use group::WardGroup;
use itertools::Itertools;
use log::{debug, info, warn};
use topology::Topology;
use wall::CurtainWall;
use wards::{Ward, WardKind};

bitflags! {
    /// Which optional features this town carries. Sampled from the seed,
    /// then adjusted by explicit coast forcing.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CityFeatures: u8 {
        const PLAZA = 1;
        const CITADEL = 2;
        const WALLS = 4;
        const TEMPLE = 8;
        const SLUMS = 16;
        const COAST = 32;
        const RIVER = 64;
    }
}

/// Coastline request from the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CoastMode {
    Force,
    Forbid,
    #[default]
    Random,
}

pub struct City {
    pub n_cells: usize,
    pub seed: i64,
    pub features: CityFeatures,

    pub store: PointStore,
    pub cells: Vec<Cell>,
    pub width: f64,
    pub height: f64,
    pub max_radius: f64,
    /// Translation from origin-centered to positive map coordinates.
    pub offset: Point,
    /// The town center in map coordinates.
    pub center: Point,

    pub citadel: Option<CurtainWall>,
    /// The city boundary. Carries masonry, towers and enabled segments only
    /// when `CityFeatures::WALLS` is set; it selects gates either way.
    pub border: Option<CurtainWall>,
    pub gates: Vec<PointId>,
    pub plaza: Option<CellId>,

    pub topology: Option<Topology>,
    pub streets: Vec<Vec<PointId>>,
    pub roads: Vec<Vec<PointId>>,
    pub arteries: Vec<Vec<PointId>>,

    pub canals: Vec<Canal>,
    pub horizon_edges: Vec<(PointId, PointId)>,
    pub shore_edges: Vec<(PointId, PointId)>,
    /// Water boundary smoothed for display.
    pub water_edge: Ring,
    /// Raw shore polyline.
    pub shore: Ring,

    pub wards: Vec<Ward>,
    pub groups: Vec<WardGroup>,

    max_docks: i64,
    rng: Rng,
}

impl City {
    /// Sample the town's features from the seed. The draws happen in a
    /// fixed order whether or not a feature is ultimately used, so forcing
    /// the coast on or off never shifts the rest of the sequence.
    pub fn new(n_cells: usize, seed: i64, coast: CoastMode) -> Result<Self, TownError> {
        if !(MIN_CELLS..=MAX_CELLS).contains(&n_cells) {
            return Err(TownError::TooFewCells(n_cells));
        }
        let mut rng = Rng::new(seed);

        let mut features = CityFeatures::empty();
        if rng.bool(0.8) {
            features |= CityFeatures::PLAZA;
        }
        if rng.bool(0.5) {
            features |= CityFeatures::CITADEL;
        }
        let walls = n_cells > 15;
        if walls {
            features |= CityFeatures::WALLS;
        }
        if rng.bool(0.6) {
            features |= CityFeatures::TEMPLE;
        }
        if walls && rng.bool(0.5) {
            features |= CityFeatures::SLUMS;
        }
        let coast_rolled = rng.bool(0.5);
        if rng.bool(0.67) && coast_rolled {
            features |= CityFeatures::RIVER;
        }
        let coastal = match coast {
            CoastMode::Force => true,
            CoastMode::Forbid => false,
            CoastMode::Random => coast_rolled,
        };
        if coastal {
            features |= CityFeatures::COAST;
        }

        let river = features.contains(CityFeatures::RIVER);
        let max_docks = (n_cells as f64 / 2.0).sqrt() as i64 + if river { 2 } else { 0 };

        Ok(City {
            n_cells,
            seed,
            features,
            store: PointStore::new(),
            cells: Vec::new(),
            width: 0.0,
            height: 0.0,
            max_radius: 0.0,
            offset: Point::default(),
            center: Point::default(),
            citadel: None,
            border: None,
            gates: Vec::new(),
            plaza: None,
            topology: None,
            streets: Vec::new(),
            roads: Vec::new(),
            arteries: Vec::new(),
            canals: Vec::new(),
            horizon_edges: Vec::new(),
            shore_edges: Vec::new(),
            water_edge: Ring::default(),
            shore: Ring::default(),
            wards: Vec::new(),
            groups: Vec::new(),
            max_docks,
            rng,
        })
    }

    pub fn build(&mut self) -> Result<(), TownError> {
        info!(
            "building town: {} cells, seed {}, features {:?}",
            self.n_cells, self.seed, self.features
        );
        self.build_patches()?;
        self.optimize_junctions();
        self.build_walls()?;
        self.build_domains();
        self.build_streets();
        self.build_canals();
        self.create_wards();
        self.build_farms();
        if self.features.contains(CityFeatures::SLUMS) {
            self.build_slums();
        }
        self.build_geometry();
        Ok(())
    }

    fn has(&self, f: CityFeatures) -> bool {
        self.features.contains(f)
    }

    // -----------------------------------------------------------------
    // Stage A: tessellation
    // -----------------------------------------------------------------

    fn build_patches(&mut self) -> Result<(), TownError> {
        let t = tessellate::tessellate(
            self.n_cells,
            self.has(CityFeatures::PLAZA),
            self.has(CityFeatures::COAST),
            &mut self.rng,
        )?;
        self.store = t.store;
        self.width = t.width;
        self.height = t.height;
        self.max_radius = t.max_radius;
        self.offset = t.offset;
        self.center = Point::new(t.width / 2.0, t.height / 2.0);

        self.cells = t
            .cells
            .into_iter()
            .map(|proto| {
                let mut cell = Cell::new(proto.shape);
                cell.waterbody = proto.waterbody;
                cell
            })
            .collect();

        self.link_neighbors();

        // Keep only the largest connected water component; smaller ponds
        // revert to land.
        if self.has(CityFeatures::COAST) {
            let water: Vec<CellId> = self.cell_ids().filter(|&id| self.cell(id).waterbody).collect();
            let components = self.connected_components(&water);
            if let Some(largest) = components.iter().max_by_key(|c| c.len()) {
                for &id in water.iter() {
                    if !largest.contains(&id) {
                        self.cells[id.0 as usize].waterbody = false;
                    }
                }
                debug!(
                    "coast: {} water components, keeping {} cells",
                    components.len(),
                    largest.len()
                );
            }
        }

        // The first n_cells non-water cells (already sorted by distance
        // from the center) form the city proper.
        let walls = self.has(CityFeatures::WALLS);
        let mut city_count = 0usize;
        for cell in self.cells.iter_mut() {
            if !cell.waterbody && city_count < self.n_cells {
                cell.within_city = true;
                cell.within_walls = walls;
                city_count += 1;
            }
        }

        // Per-cell seeds, drawn in cell order.
        for cell in self.cells.iter_mut() {
            cell.seed = self.rng.int(0, 2_147_483_647);
        }

        // Water and shore outlines.
        if self.has(CityFeatures::COAST) {
            let water: Vec<CellId> = self.cell_ids().filter(|&id| self.cell(id).waterbody).collect();
            if !water.is_empty() {
                let edge = wall::circumference(&self.cells, &water);
                self.shore = edge.to_ring(&self.store);
                let iterations = 1 + (self.rng.float() * 3.0) as usize;
                self.water_edge = self.shore.smooth(&[], iterations);
            }
        }
        Ok(())
    }

    fn link_neighbors(&mut self) {
        let mut edge_owner: FnvHashMap<(PointId, PointId), CellId> = FnvHashMap::default();
        for (i, cell) in self.cells.iter().enumerate() {
            for (a, b) in cell.shape.edge_ids() {
                edge_owner.insert((a, b), CellId(i as u32));
            }
        }
        for i in 0..self.cells.len() {
            let mut neighbors = Vec::new();
            for (a, b) in self.cells[i].shape.edge_ids().collect::<Vec<_>>() {
                if let Some(&other) = edge_owner.get(&(b, a)) {
                    if other.0 as usize != i && !neighbors.contains(&other) {
                        neighbors.push(other);
                    }
                }
            }
            self.cells[i].neighbors = neighbors;
        }
    }

    // -----------------------------------------------------------------
    // Stage B: junction optimization
    // -----------------------------------------------------------------

    /// Merge vertices closer than the junction epsilon along interior cell
    /// edges. The survivor moves to the midpoint (mutating the shared
    /// point), every polygon referencing the dropped id is rewritten, and
    /// duplicate ids are cleaned up per cell.
    fn optimize_junctions(&mut self) {
        let interior: Vec<CellId> = self.cell_ids().filter(|&id| self.cell(id).within_city).collect();
        let mut touched: FnvHashSet<CellId> = FnvHashSet::default();

        for id in interior {
            let mut index = 0;
            loop {
                let len = self.cells[id.0 as usize].shape.len();
                if len <= 3 || index >= len {
                    break;
                }
                let v0 = self.cells[id.0 as usize].shape.id(index);
                let v1 = self.cells[id.0 as usize].shape.id((index + 1) % len);
                if v0 != v1
                    && Point::distance(self.store.get(v0), self.store.get(v1)) < JUNCTION_EPSILON
                {
                    let mid = Point::midpoint(self.store.get(v0), self.store.get(v1));
                    self.store.set(v0, mid);
                    for (j, other) in self.cells.iter_mut().enumerate() {
                        if CellId(j as u32) == id {
                            continue;
                        }
                        if let Some(pos) = other.shape.index_of(v1) {
                            other.shape.ids_mut()[pos] = v0;
                            touched.insert(CellId(j as u32));
                        }
                    }
                    self.cells[id.0 as usize].shape.remove_id(v1);
                    touched.insert(id);
                } else {
                    index += 1;
                }
            }
        }

        for id in touched {
            self.cells[id.0 as usize].shape.dedup_ids();
        }
        // Merges change adjacency identity; refresh the links.
        self.link_neighbors();
    }

    // -----------------------------------------------------------------
    // Stage C: fortification
    // -----------------------------------------------------------------

    fn build_walls(&mut self) -> Result<(), TownError> {
        let mut inner: Vec<CellId> = self.cell_ids().filter(|&id| self.cell(id).within_city).collect();
        if inner.is_empty() {
            inner = self.cell_ids().collect();
        }

        let walls = self.has(CityFeatures::WALLS);
        let mut reserved: Vec<PointId> = Vec::new();

        if self.has(CityFeatures::CITADEL) && walls {
            let citadel_cell = inner[0];
            let citadel = CurtainWall::new(
                false,
                &self.cells,
                vec![citadel_cell],
                &[],
                &mut self.store,
                &mut self.rng,
            )?;
            reserved.extend_from_slice(citadel.shape.ids());
            self.citadel = Some(citadel);
        }

        let mut border = CurtainWall::new(
            walls,
            &self.cells,
            inner,
            &reserved,
            &mut self.store,
            &mut self.rng,
        )?;

        if walls {
            // Masonry makes no sense along water or where the citadel wall
            // already stands.
            let cells = &self.cells;
            let citadel = self.citadel.as_ref();
            border.disable_segments(|v0, v1| {
                let wet = cells.iter().any(|c| {
                    c.waterbody && c.shape.contains_id(v0) && c.shape.contains_id(v1)
                });
                let on_citadel = citadel.map_or(false, |cit| {
                    cit.shape.contains_id(v0) && cit.shape.contains_id(v1)
                });
                wet || on_citadel
            });
            border.build_towers(&self.store);
        }

        self.gates = border.gates.clone();
        if let Some(cit) = &self.citadel {
            self.gates.extend_from_slice(&cit.gates);
        }

        if walls {
            self.carve_gate_courtyards(&border, &reserved);
        }
        self.border = Some(border);
        Ok(())
    }

    /// Behind each gate of a real wall, a lone outer patch with enough
    /// vertices is split toward its farthest outward vertex so the gate
    /// opens onto a forecourt instead of one huge field.
    fn carve_gate_courtyards(&mut self, border: &CurtainWall, reserved: &[PointId]) {
        for &gate in &border.gates {
            let outer: Vec<CellId> = self
                .cell_ids()
                .filter(|&id| {
                    !border.contains_member(id) && self.cell(id).shape.contains_id(gate)
                })
                .collect();
            if outer.len() != 1 {
                continue;
            }
            let target = outer[0];
            if self.cell(target).shape.len() <= 3 {
                continue;
            }

            let (Some(prev), Some(next)) =
                (border.shape.prev_id(gate), border.shape.next_id(gate))
            else {
                continue;
            };
            let along = self.store.get(next) - self.store.get(prev);
            let out_dir = Point::new(along.y, -along.x);
            let gate_p = self.store.get(gate);

            let shape = &self.cell(target).shape;
            let mut farthest: Option<(PointId, f64)> = None;
            for &v in shape.ids() {
                if border.shape.contains_id(v) || reserved.contains(&v) || v == gate {
                    continue;
                }
                let dir = self.store.get(v) - gate_p;
                let len = dir.length();
                if len < 1e-6 {
                    continue;
                }
                let dot = dir.dot(out_dir) / len;
                if farthest.map_or(true, |(_, best)| dot > best) {
                    farthest = Some((v, dot));
                }
            }
            let Some((far, _)) = farthest else { continue };

            if let Some((first, second)) = self.cell(target).shape.split_at(gate, far) {
                debug!("carved courtyard behind gate {}", gate);
                let template = self.cell(target).clone();
                self.cells[target.0 as usize] = carved_cell(&template, first);
                self.cells.push(carved_cell(&template, second));
            }
        }
        self.link_neighbors();
    }

    // -----------------------------------------------------------------
    // Stage D: domain classification (edge sets)
    // -----------------------------------------------------------------

    fn build_domains(&mut self) {
        self.horizon_edges.clear();
        self.shore_edges.clear();

        let mut reverse: FnvHashSet<(PointId, PointId)> = FnvHashSet::default();
        for cell in &self.cells {
            for (a, b) in cell.shape.edge_ids() {
                reverse.insert((a, b));
            }
        }

        let mut horizon = Vec::new();
        let mut shore = Vec::new();
        for cell in &self.cells {
            for (a, b) in cell.shape.edge_ids() {
                if !reverse.contains(&(b, a)) {
                    horizon.push((a, b));
                }
                if !cell.waterbody {
                    let wet = cell.neighbors.iter().any(|&nb| {
                        let nb = &self.cells[nb.0 as usize];
                        nb.waterbody && nb.shape.find_edge(b, a).is_some()
                    });
                    if wet {
                        shore.push((a, b));
                    }
                }
            }
        }
        self.horizon_edges = horizon;
        self.shore_edges = shore;
        debug!(
            "domains: {} horizon edges, {} shore edges",
            self.horizon_edges.len(),
            self.shore_edges.len()
        );
    }

    // -----------------------------------------------------------------
    // Stage E: street routing
    // -----------------------------------------------------------------

    fn build_streets(&mut self) {
        // Wall masonry blocks routing; gates stay open.
        let mut blocked: FnvHashSet<PointId> = FnvHashSet::default();
        if let Some(cit) = &self.citadel {
            blocked.extend(cit.shape.ids().iter().copied());
        }
        if self.has(CityFeatures::WALLS) {
            if let Some(border) = &self.border {
                blocked.extend(border.shape.ids().iter().copied());
            }
        }
        for gate in &self.gates {
            blocked.remove(gate);
        }

        let topo = Topology::new(&self.cells, &self.gates, &blocked, &self.store);

        if self.plaza.is_none() {
            let found = self.cell_ids().find(|&id| self.cell(id).within_city);
            self.plaza = found;
        }
        let Some(plaza) = self.plaza else {
            warn!("streets: no plaza cell, skipping");
            return;
        };

        let border_gates: Vec<PointId> = self
            .border
            .as_ref()
            .map(|b| b.gates.clone())
            .unwrap_or_default();

        for gate in self.gates.clone() {
            // Nearest plaza vertex is the street's destination.
            let gate_p = self.store.get(gate);
            let Some(end) = self
                .cell(plaza)
                .shape
                .min_by_key(&self.store, |p| Point::distance(p, gate_p))
            else {
                continue;
            };

            let Some(street) = topo.path(gate, end, &topo.outer, &self.store) else {
                warn!("streets: no path from gate {} to plaza", gate);
                continue;
            };
            self.streets.push(street);

            if border_gates.contains(&gate) {
                // A road from the countryside: start from the node closest
                // to a far-out point in the gate's direction.
                let dir = self.center + (gate_p - self.center).norm(1000.0);
                if let Some(start) = topo.nearest_node(dir, &self.store) {
                    if let Some(road) = topo.path(start, gate, &topo.inner, &self.store) {
                        self.roads.push(road);
                    }
                }
            }
        }

        self.tidy_up_roads();
        self.smooth_arteries();
        self.topology = Some(topo);
        debug!(
            "streets: {} streets, {} roads, {} arteries",
            self.streets.len(),
            self.roads.len(),
            self.arteries.len()
        );
    }

    /// Cut streets and roads into deduplicated directed segments (skipping
    /// plaza edges) and chain them back into maximal arteries.
    fn tidy_up_roads(&mut self) {
        let plaza_shape = self.plaza.map(|p| self.cell(p).shape.clone());
        let mut segments: Vec<(PointId, PointId)> = Vec::new();
        for path in self.streets.iter().chain(self.roads.iter()) {
            for pair in path.windows(2) {
                let (v0, v1) = (pair[0], pair[1]);
                if let Some(plaza) = &plaza_shape {
                    if plaza.contains_id(v0) && plaza.contains_id(v1) {
                        continue;
                    }
                }
                if !segments.contains(&(v0, v1)) {
                    segments.push((v0, v1));
                }
            }
        }

        self.arteries.clear();
        while let Some((start, end)) = segments.pop() {
            let mut attached = false;
            for artery in self.arteries.iter_mut() {
                if artery[0] == end {
                    artery.insert(0, start);
                    attached = true;
                    break;
                } else if *artery.last().unwrap() == start {
                    artery.push(end);
                    attached = true;
                    break;
                }
            }
            if !attached {
                self.arteries.push(vec![start, end]);
            }
        }
    }

    /// Pull every interior artery vertex toward its neighbors. The points
    /// are shared with the surrounding patches, so the patch boundaries
    /// flex with the streets.
    fn smooth_arteries(&mut self) {
        for artery in &self.arteries {
            if artery.len() < 3 {
                continue;
            }
            let f = 3.0;
            let smoothed: Vec<Point> = (1..artery.len() - 1)
                .map(|i| {
                    let prev = self.store.get(artery[i - 1]);
                    let cur = self.store.get(artery[i]);
                    let next = self.store.get(artery[i + 1]);
                    Point::new(
                        (prev.x + cur.x * f + next.x) / (f + 2.0),
                        (prev.y + cur.y * f + next.y) / (f + 2.0),
                    )
                })
                .collect();
            for (i, p) in smoothed.into_iter().enumerate() {
                self.store.set(artery[i + 1], p);
            }
        }
    }

    // -----------------------------------------------------------------
    // Canals
    // -----------------------------------------------------------------

    fn build_canals(&mut self) {
        if !(self.has(CityFeatures::RIVER) && self.has(CityFeatures::COAST)) {
            return;
        }
        match Canal::river(&self.cells, &self.store, self.center, &mut self.rng) {
            Some(mut canal) => {
                canal.find_bridges(&self.arteries, &self.store);
                self.canals.push(canal);
            }
            None => warn!("river requested but no usable course found"),
        }
    }

    // -----------------------------------------------------------------
    // Stage F: ward assignment
    // -----------------------------------------------------------------

    fn create_wards(&mut self) {
        self.wards = (0..self.cells.len()).map(|_| Ward::default()).collect();

        // Castle: the citadel patch.
        if self.has(CityFeatures::CITADEL) && self.has(CityFeatures::WALLS) {
            let first = self.cell_ids().find(|&id| self.cell(id).within_city);
            if let Some(first) = first {
                self.assign(first, WardKind::Castle);
            }
        }

        // Market: the central cell.
        if self.has(CityFeatures::PLAZA) {
            let central = self
                .cell_ids()
                .find(|&id| self.cell(id).within_city && self.cell(id).ward.is_none());
            if let Some(central) = central {
                self.plaza = Some(central);
                self.assign(central, WardKind::Market);
            }
        }

        // Cathedral: the free inner cell closest to the town center.
        if self.has(CityFeatures::TEMPLE) {
            let candidate = self
                .cell_ids()
                .filter(|&id| self.cell(id).within_city && self.cell(id).ward.is_none())
                .min_by(|&a, &b| {
                    let da = Point::distance(self.cell(a).shape.centroid(&self.store), self.center);
                    let db = Point::distance(self.cell(b).shape.centroid(&self.store), self.center);
                    da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
                });
            if let Some(id) = candidate {
                self.assign(id, WardKind::Cathedral);
            }
        }

        // Parks near the citadel gate, with probability growing with town
        // size, then a size-scaled count of random inner parks.
        let mut parks_created = 0usize;
        let citadel_gate = self.citadel.as_ref().and_then(|c| c.gates.first().copied());
        if let Some(gate) = citadel_gate {
            let at_gate: Vec<CellId> = self
                .cell_ids()
                .filter(|&id| self.cell(id).shape.contains_id(gate))
                .collect();
            if at_gate.len() == 3 {
                let prob = 1.0 - 2.0 / (self.n_cells as f64 - 1.0);
                if self.rng.bool(prob) {
                    for id in at_gate {
                        if self.cell(id).ward.is_none() && !self.cell(id).waterbody {
                            self.assign(id, WardKind::Park);
                            parks_created += 1;
                        }
                    }
                }
            }
        }
        let park_target = (self.n_cells as f64 - 10.0) / 20.0;
        let mut park_count = park_target as i64;
        if self.rng.bool(park_target - park_count as f64) {
            park_count += 1;
        }
        park_count -= parks_created as i64;
        for _ in 0..park_count.max(0) {
            let candidates: Vec<CellId> = self
                .cell_ids()
                .filter(|&id| self.cell(id).within_city && self.cell(id).ward.is_none())
                .collect();
            if candidates.is_empty() {
                break;
            }
            let pick = candidates[self.rng.index(candidates.len())];
            self.assign(pick, WardKind::Park);
        }

        // Harbours on waterfront inner cells while the dock budget lasts,
        // then alleys everywhere else inside the city.
        for id in self.cell_ids().collect::<Vec<_>>() {
            let cell = self.cell(id);
            if cell.waterbody || !cell.within_city || cell.ward.is_some() {
                continue;
            }
            let waterfront = cell
                .neighbors
                .iter()
                .any(|&nb| self.cells[nb.0 as usize].waterbody);
            if waterfront && self.has(CityFeatures::COAST) && self.max_docks > 0 {
                self.assign(id, WardKind::Harbour);
                self.cells[id.0 as usize].landing = true;
                self.max_docks -= 1;
            } else {
                self.assign(id, WardKind::Alleys);
            }
        }
        debug!("wards: specials and alleys assigned");
    }

    /// Farms spread over the countryside in a sine-wave radial pattern.
    fn build_farms(&mut self) {
        let a = self.rng.normal3() * 2.0;
        let b = self.rng.normal3();
        let c = self.rng.float() * std::f64::consts::TAU;
        let d = self.rng.float() * std::f64::consts::TAU;

        let center = self.offset;
        let mut r_max = 0.0f64;
        for id in self.cell_ids() {
            if !self.cell(id).within_city {
                continue;
            }
            for &v in self.cell(id).shape.ids() {
                r_max = r_max.max(Point::distance(self.store.get(v), center));
            }
        }

        let shore_edge_set: FnvHashSet<(PointId, PointId)> =
            self.shore_edges.iter().copied().collect();

        for id in self.cell_ids().collect::<Vec<_>>() {
            let cell = self.cell(id);
            if cell.ward.is_some() || cell.within_city || cell.waterbody {
                continue;
            }

            // Waterfront countryside becomes extra harbours while the
            // shared dock budget lasts.
            let on_shore = cell
                .shape
                .edge_ids()
                .any(|(x, y)| shore_edge_set.contains(&(x, y)) || shore_edge_set.contains(&(y, x)));
            if on_shore {
                if self.max_docks > 0 {
                    self.assign(id, WardKind::Harbour);
                    self.cells[id.0 as usize].landing = true;
                    self.max_docks -= 1;
                }
                continue;
            }

            let delta = self.cell(id).shape.centroid(&self.store) - center;
            let angle = delta.atan();
            let dist = delta.length();
            let threshold = a * (angle + c).sin() + b * (2.0 * angle + d).sin();
            if dist < (threshold + 1.0) * r_max {
                self.assign(id, WardKind::Farm);
            }
        }
    }

    /// Slums sampled outside the walls, weighted toward cells wedged
    /// between the city and its roads.
    fn build_slums(&mut self) {
        let horizon_set: FnvHashSet<(PointId, PointId)> =
            self.horizon_edges.iter().copied().collect();
        let center = self.offset;

        let mut candidates: Vec<CellId> = Vec::new();
        let mut scores: Vec<f64> = Vec::new();
        for id in self.cell_ids() {
            let cell = self.cell(id);
            if cell.within_city || cell.waterbody || cell.ward.is_some() {
                continue;
            }
            let on_horizon = cell
                .shape
                .edge_ids()
                .any(|(a, b)| horizon_set.contains(&(a, b)) || horizon_set.contains(&(b, a)));
            if on_horizon {
                continue;
            }
            let city_neighbors = cell
                .neighbors
                .iter()
                .filter(|&&nb| self.cells[nb.0 as usize].within_city)
                .count();
            if city_neighbors < 2 {
                continue;
            }

            let centroid = cell.shape.centroid(&self.store);
            let mut min_dist = Point::distance(centroid, center) * 3.0;
            for road in &self.roads {
                for &v in road {
                    min_dist = min_dist.min(Point::distance(self.store.get(v), centroid) * 2.0);
                }
            }
            for &(s, _) in &self.shore_edges {
                min_dist = min_dist.min(Point::distance(self.store.get(s), centroid));
            }
            let dist_score = min_dist * min_dist;
            candidates.push(id);
            scores.push((city_neighbors * city_neighbors) as f64 / dist_score.max(1e-6));
        }

        let u = self.rng.float();
        let mut budget = (self.n_cells as f64 * (1.0 + u * u * u) * 0.5) as i64;
        while budget > 0 && !candidates.is_empty() {
            let total: f64 = scores.iter().sum();
            if total <= 0.0 {
                break;
            }
            let pick = self.rng.float() * total;
            let mut acc = 0.0;
            let mut selected = 0usize;
            for (i, s) in scores.iter().enumerate() {
                acc += s;
                if pick <= acc {
                    selected = i;
                    break;
                }
            }
            let id = candidates.remove(selected);
            scores.remove(selected);
            self.assign(id, WardKind::Slum);
            budget -= 1;
        }
    }

    fn assign(&mut self, id: CellId, kind: WardKind) {
        self.cells[id.0 as usize].ward = Some(WardId(id.0));
        self.wards[id.0 as usize].kind = Some(kind);
    }

    // -----------------------------------------------------------------
    // Stage G/H: edge classification, groups, geometry
    // -----------------------------------------------------------------

    fn build_geometry(&mut self) {
        self.classify_edges();
        self.create_ward_groups();
        self.create_ward_geometry();
    }

    /// Classify every cell edge, in priority order: coast beats wall beats
    /// canal beats road beats horizon.
    fn classify_edges(&mut self) {
        let wall_real = self.has(CityFeatures::WALLS);
        let margin = 10.0;

        let mut road_edges: FnvHashSet<(PointId, PointId)> = FnvHashSet::default();
        for path in self
            .arteries
            .iter()
            .chain(self.streets.iter())
            .chain(self.roads.iter())
        {
            for pair in path.windows(2) {
                road_edges.insert((pair[0], pair[1]));
                road_edges.insert((pair[1], pair[0]));
            }
        }

        for i in 0..self.cells.len() {
            let edge_list: Vec<(usize, PointId, PointId)> = self.cells[i]
                .shape
                .edge_ids()
                .enumerate()
                .map(|(e, (a, b))| (e, a, b))
                .collect();

            for (e, v0, v1) in edge_list {
                let cell = &self.cells[i];
                let mut ty = EdgeType::None;

                let wet_neighbor = cell.neighbors.iter().any(|&nb| {
                    let nb = &self.cells[nb.0 as usize];
                    nb.waterbody && nb.shape.find_edge(v1, v0).is_some()
                });
                if wet_neighbor {
                    ty = EdgeType::Coast;
                } else if wall_real {
                    if let Some(border) = &self.border {
                        if border.borders_by(cell.within_walls, v0, v1) {
                            ty = EdgeType::Wall;
                        }
                    }
                }

                if ty == EdgeType::None {
                    let p0 = self.store.get(v0);
                    let p1 = self.store.get(v1);
                    if self.canals.iter().any(|c| c.contains_edge(p0, p1)) {
                        ty = EdgeType::Canal;
                    } else if road_edges.contains(&(v0, v1)) {
                        ty = EdgeType::Road;
                    } else if !cell.within_city {
                        let near_border = |p: Point| {
                            p.x < margin
                                || p.x > self.width - margin
                                || p.y < margin
                                || p.y > self.height - margin
                        };
                        if near_border(p0) && near_border(p1) {
                            ty = EdgeType::Horizon;
                        }
                    }
                }
                self.cells[i].set_edge_type(e, ty);
            }
        }
    }

    fn create_ward_groups(&mut self) {
        let kinds: Vec<Option<WardKind>> = self.wards.iter().map(|w| w.kind).collect();
        let eligible = |id: CellId| {
            kinds[id.0 as usize].map_or(false, |k| k.grouped())
        };
        let same_kind =
            |a: CellId, b: CellId| kinds[a.0 as usize] == kinds[b.0 as usize];

        let mut groups = group::build_groups(&mut self.cells, eligible, same_kind, &mut self.rng);

        for g in groups.iter_mut() {
            g.border = wall::circumference(&self.cells, &g.members);
            g.urban = self.is_urban_border(&g.border);
        }
        self.groups = groups;
        debug!("{} ward groups formed", self.groups.len());
    }

    /// A border vertex is interior when some cell there is within the walls
    /// or every land cell there belongs to the city. A group is urban when
    /// all its border vertices are interior.
    fn is_urban_border(&self, border: &crate::polygon::Polygon) -> bool {
        border.ids().iter().all(|&v| {
            let mut walled = false;
            let mut all_city = true;
            for cell in &self.cells {
                if !cell.shape.contains_id(v) {
                    continue;
                }
                if cell.within_walls {
                    walled = true;
                }
                if !cell.within_city && !cell.waterbody {
                    all_city = false;
                }
            }
            walled || all_city
        })
    }

    /// Per-edge insets for a group border: classified edges use their
    /// canonical distance, unclassified ones fall back to the group's own
    /// sampled inset.
    fn border_insets(&self, border: &crate::polygon::Polygon, members: &[CellId]) -> Vec<Option<f64>> {
        border
            .edge_ids()
            .map(|(v0, v1)| {
                for &m in members {
                    let cell = self.cell(m);
                    let edge = cell
                        .shape
                        .find_edge(v0, v1)
                        .or_else(|| cell.shape.find_edge(v1, v0));
                    if let Some(e) = edge {
                        let ty = cell.edge_type(e);
                        if ty == EdgeType::None {
                            return None;
                        }
                        let cw = self.canal_width_at(v0);
                        return Some(ty.inset(cell.landing, cw));
                    }
                }
                None
            })
            .collect()
    }

    fn canal_width_at(&self, v: PointId) -> f64 {
        let p = self.store.get(v);
        self.canals
            .iter()
            .map(|c| c.width_at(p))
            .fold(0.0, f64::max)
    }

    /// Per-edge insets for a standalone ward cell.
    fn cell_insets(&self, id: CellId) -> Vec<f64> {
        let cell = self.cell(id);
        cell.shape
            .edge_ids()
            .enumerate()
            .map(|(e, (v0, _))| cell.edge_inset(e, self.canal_width_at(v0)))
            .collect()
    }

    fn create_ward_geometry(&mut self) {
        // Group geometry first: one computation per group, stored on the
        // core cell's ward.
        let mut groups = std::mem::take(&mut self.groups);
        for g in groups.iter_mut() {
            let Some(kind) = self.wards[g.core.0 as usize].kind else {
                continue;
            };
            let border_ring = g.border.to_ring(&self.store);
            let insets = self.border_insets(&g.border, &g.members);
            g.create_geometry(&border_ring, &insets, kind == WardKind::Park, &mut self.rng);

            let ward = &mut self.wards[g.core.0 as usize];
            for block in &g.blocks {
                ward.geometry.extend(block.buildings.iter().cloned());
            }
            ward.trees.extend(g.trees.iter().cloned());
        }
        self.groups = groups;

        // Specials, walked in cell order.
        for id in self.cell_ids().collect::<Vec<_>>() {
            let Some(kind) = self.wards[id.0 as usize].kind else {
                continue;
            };
            match kind {
                WardKind::Castle => {
                    let shape = self.cell(id).shape.to_ring(&self.store);
                    let keep = wards::castle_keep(&shape, &mut self.rng);
                    self.wards[id.0 as usize].geometry.extend(keep);
                }
                WardKind::Cathedral => {
                    let shape = self.cell(id).shape.to_ring(&self.store);
                    self.wards[id.0 as usize].geometry.extend(wards::cathedral(&shape));
                }
                WardKind::Market => {
                    let shape = self.cell(id).shape.to_ring(&self.store);
                    let piece = wards::market(&shape, &mut self.rng);
                    self.wards[id.0 as usize].geometry.extend(piece);
                }
                WardKind::Park => {
                    let insets = self.cell_insets(id);
                    let available = self.cell(id).shape.to_ring(&self.store).shrink(&insets);
                    if available.len() < 3 {
                        warn!("park {}: no room after insets", id);
                        continue;
                    }
                    let park = wards::park(&available, &mut self.rng);
                    let ward = &mut self.wards[id.0 as usize];
                    ward.fields.push(park.green);
                    ward.paths.extend(park.paths);
                    ward.geometry.extend(park.features);
                    ward.trees.extend(park.trees);
                }
                WardKind::Harbour => {
                    // Piers along the coast edges; warehouses came from the
                    // group pass.
                    let cell = self.cell(id);
                    let coast_edges: Vec<(Point, Point)> = cell
                        .shape
                        .edge_ids()
                        .enumerate()
                        .filter(|&(e, _)| cell.edge_type(e) == EdgeType::Coast)
                        .map(|(_, (a, b))| (self.store.get(a), self.store.get(b)))
                        .collect();
                    if !coast_edges.is_empty() {
                        let piers = wards::harbour_piers(&coast_edges, &mut self.rng);
                        self.wards[id.0 as usize].geometry.extend(piers);
                    }
                }
                WardKind::Farm => {
                    let available = self.farm_available(id);
                    if available.len() < 3 {
                        warn!("farm {}: degenerate available area", id);
                        continue;
                    }
                    let farm = wards::farm(&available, &mut self.rng);
                    let ward = &mut self.wards[id.0 as usize];
                    ward.fields.extend(farm.fields);
                    ward.furrows.extend(farm.furrows);
                    ward.geometry.extend(farm.cottages);
                }
                WardKind::Alleys | WardKind::Slum => {} // group pass
            }
        }

        let buildings: usize = self.wards.iter().map(|w| w.geometry.len()).sum();
        info!("geometry: {} polygons across {} wards", buildings, self.wards.len());
    }

    /// Farm-specific available area: farm insets look at what each edge
    /// borders, with a thin buffer toward sibling farms.
    fn farm_available(&self, id: CellId) -> Ring {
        let cell = self.cell(id);
        let kinds: Vec<Option<WardKind>> = self.wards.iter().map(|w| w.kind).collect();
        let insets: Vec<f64> = cell
            .shape
            .edge_ids()
            .enumerate()
            .map(|(e, (v0, v1))| {
                let neighbor_is_farm = cell.neighbors.iter().any(|&nb| {
                    kinds[nb.0 as usize] == Some(WardKind::Farm)
                        && self.cells[nb.0 as usize].shape.find_edge(v1, v0).is_some()
                });
                cell.edge_type(e)
                    .farm_inset(neighbor_is_farm, self.canal_width_at(v0))
            })
            .collect();
        cell.shape.to_ring(&self.store).shrink(&insets)
    }

    // -----------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------

    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0 as usize]
    }

    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> + '_ {
        (0..self.cells.len() as u32).map(CellId)
    }

    /// Cells holding the given vertex id.
    pub fn cells_by_vertex(&self, v: PointId) -> Vec<CellId> {
        self.cell_ids()
            .filter(|&id| self.cell(id).shape.contains_id(v))
            .collect()
    }

    /// Split a cell set into connected components over the neighbor graph.
    pub fn connected_components(&self, set: &[CellId]) -> Vec<Vec<CellId>> {
        let mut remaining: Vec<CellId> = set.to_vec();
        let mut components = Vec::new();
        while let Some(&start) = remaining.first() {
            let mut component = Vec::new();
            let mut queue = vec![start];
            while let Some(current) = queue.pop() {
                let Some(pos) = remaining.iter().position(|&c| c == current) else {
                    continue;
                };
                remaining.remove(pos);
                component.push(current);
                for &nb in &self.cell(current).neighbors {
                    if remaining.contains(&nb) {
                        queue.push(nb);
                    }
                }
            }
            components.push(component);
        }
        components
    }

    /// Ward kind lookup used by the plan emitter.
    pub fn ward_kind(&self, id: CellId) -> Option<WardKind> {
        self.wards.get(id.0 as usize).and_then(|w| w.kind)
    }

    /// All wards with their cells, in creation (cell) order.
    pub fn wards_in_order(&self) -> impl Iterator<Item = (CellId, &Ward)> + '_ {
        self.wards
            .iter()
            .enumerate()
            .filter(|(_, w)| w.kind.is_some())
            .map(|(i, w)| (CellId(i as u32), w))
            .sorted_by_key(|(id, _)| *id)
    }
}

fn carved_cell(template: &Cell, shape: crate::polygon::Polygon) -> Cell {
    let mut cell = Cell::new(shape);
    cell.within_city = template.within_city;
    cell.within_walls = template.within_walls;
    cell.waterbody = template.waterbody;
    cell.seed = template.seed;
    cell
}
