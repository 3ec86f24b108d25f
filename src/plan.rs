//! Serializable output model.
//!
//! `TownPlan` is the flat, consumer-facing snapshot of a built [`City`]:
//! coordinates only, no arena ids, ready for the SVG writer or any other
//! serializer. Structural equality over plans is the determinism check:
//! two builds from the same seed must compare equal.

use crate::city::cell::EdgeType;
use crate::city::City;
use crate::geometry::Ring;
use crate::points::Point;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanCell {
    pub shape: Vec<Point>,
    pub ward: Option<&'static str>,
    pub within_city: bool,
    pub within_walls: bool,
    pub waterbody: bool,
    pub landing: bool,
    pub edge_types: Vec<EdgeType>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanWall {
    pub shape: Vec<Point>,
    pub segments: Vec<bool>,
    pub towers: Vec<Point>,
    pub gates: Vec<Point>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanWard {
    pub cell: u32,
    pub kind: &'static str,
    pub buildings: Vec<Ring>,
    pub fields: Vec<Ring>,
    pub furrows: Vec<(Point, Point)>,
    pub paths: Vec<Vec<Point>>,
    pub trees: Vec<Point>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlanCanal {
    pub course: Vec<Point>,
    pub width: f64,
    pub water: Ring,
    pub bridges: Vec<Point>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DebugGeometry {
    pub patches: Vec<Vec<Point>>,
    pub cuts: Vec<Vec<Point>>,
    /// Lot rectangle approximations, before building growth.
    pub rects: Vec<Ring>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TownPlan {
    pub seed: i64,
    pub n_cells: usize,
    pub width: f64,
    pub height: f64,
    pub cells: Vec<PlanCell>,
    pub arteries: Vec<Vec<Point>>,
    pub streets: Vec<Vec<Point>>,
    pub roads: Vec<Vec<Point>>,
    pub walls: Vec<PlanWall>,
    pub wards: Vec<PlanWard>,
    pub canals: Vec<PlanCanal>,
    /// Smoothed water boundary, empty for inland towns.
    pub water: Vec<Point>,
    /// Raw shore polyline.
    pub shore: Vec<Point>,
    #[cfg(feature = "debug-geometry")]
    pub debug: DebugGeometry,
}

impl TownPlan {
    pub fn from_city(city: &City) -> TownPlan {
        let coords = |ids: &[crate::points::PointId]| -> Vec<Point> {
            ids.iter().map(|&id| city.store.get(id)).collect()
        };

        let cells = city
            .cell_ids()
            .map(|id| {
                let cell = city.cell(id);
                PlanCell {
                    shape: coords(cell.shape.ids()),
                    ward: city.ward_kind(id).map(|k| k.name()),
                    within_city: cell.within_city,
                    within_walls: cell.within_walls,
                    waterbody: cell.waterbody,
                    landing: cell.landing,
                    edge_types: (0..cell.shape.len()).map(|e| cell.edge_type(e)).collect(),
                }
            })
            .collect();

        let mut walls = Vec::new();
        for wall in city.citadel.iter().chain(city.border.iter()) {
            walls.push(PlanWall {
                shape: coords(wall.shape.ids()),
                segments: wall.segments.clone(),
                towers: wall.towers.clone(),
                gates: wall.gates.iter().map(|&g| city.store.get(g)).collect(),
            });
        }

        let wards = city
            .wards_in_order()
            .map(|(id, ward)| PlanWard {
                cell: id.0,
                kind: ward.kind.map(|k| k.name()).unwrap_or(""),
                buildings: ward.geometry.clone(),
                fields: ward.fields.clone(),
                furrows: ward.furrows.clone(),
                paths: ward.paths.clone(),
                trees: ward.trees.clone(),
            })
            .collect();

        let canals = city
            .canals
            .iter()
            .map(|c| PlanCanal {
                course: c.course.clone(),
                width: c.width,
                water: c.water_polygon(),
                bridges: c.bridges.iter().map(|&(p, _)| p).collect(),
            })
            .collect();

        TownPlan {
            seed: city.seed,
            n_cells: city.n_cells,
            width: city.width,
            height: city.height,
            cells,
            arteries: city.arteries.iter().map(|a| coords(a)).collect(),
            streets: city.streets.iter().map(|s| coords(s)).collect(),
            roads: city.roads.iter().map(|r| coords(r)).collect(),
            walls,
            wards,
            canals,
            water: city.water_edge.pts().to_vec(),
            shore: city.shore.pts().to_vec(),
            #[cfg(feature = "debug-geometry")]
            debug: DebugGeometry {
                patches: city
                    .cell_ids()
                    .map(|id| coords(city.cell(id).shape.ids()))
                    .collect(),
                cuts: city
                    .groups
                    .iter()
                    .flat_map(|g| g.alleys.iter().cloned())
                    .collect(),
                rects: city
                    .groups
                    .iter()
                    .flat_map(|g| g.blocks.iter())
                    .flat_map(|b| b.rects.iter().cloned())
                    .collect(),
            },
        }
    }

    /// Total building polygons across all wards.
    pub fn building_count(&self) -> usize {
        self.wards.iter().map(|w| w.buildings.len()).sum()
    }
}
