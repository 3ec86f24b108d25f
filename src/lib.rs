pub mod city;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod noise;
pub mod plan;
pub mod points;
pub mod polygon;
pub mod random;
pub mod svg;
pub mod tessellate;

pub use city::{City, CityFeatures, CoastMode};
pub use error::TownError;
pub use plan::TownPlan;

#[cfg(test)]
mod tests {
    use super::*;

    fn build(n: usize, seed: i64, coast: CoastMode) -> City {
        let mut city = City::new(n, seed, coast).unwrap();
        city.build().unwrap();
        city
    }

    #[test]
    fn determinism_same_seed_same_plan() {
        let a = TownPlan::from_city(&build(15, 1, CoastMode::Forbid));
        let b = TownPlan::from_city(&build(15, 1, CoastMode::Forbid));
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = TownPlan::from_city(&build(15, 1, CoastMode::Forbid));
        let b = TownPlan::from_city(&build(15, 2, CoastMode::Forbid));
        assert_ne!(a, b);
    }

    #[test]
    fn small_inland_town() {
        // 15 cells: unwalled, no towers, but the border still selects gates
        // and at least one street reaches the plaza.
        let city = build(15, 1, CoastMode::Forbid);
        assert!(!city.features.contains(CityFeatures::WALLS));
        assert!(city.cells.iter().all(|c| !c.waterbody));
        let border = city.border.as_ref().unwrap();
        assert!(border.towers.is_empty());
        assert!(!border.gates.is_empty());
        assert!(!city.streets.is_empty());
    }

    #[test]
    fn forced_coast_has_one_water_component() {
        let city = build(30, 42, CoastMode::Force);
        let water: Vec<_> = city
            .cell_ids()
            .filter(|&id| city.cell(id).waterbody)
            .collect();
        if !water.is_empty() {
            let components = city.connected_components(&water);
            assert_eq!(components.len(), 1);
        }
    }

    #[test]
    fn cell_count_bounds_are_enforced() {
        assert!(City::new(4, 1, CoastMode::Random).is_err());
        assert!(City::new(201, 1, CoastMode::Random).is_err());
        assert!(City::new(5, 1, CoastMode::Random).is_ok());
    }

    #[test]
    fn within_walls_implies_within_city() {
        let city = build(30, 7, CoastMode::Random);
        for cell in &city.cells {
            if cell.within_walls {
                assert!(cell.within_city);
            }
            if cell.waterbody {
                assert!(!cell.within_city);
            }
        }
    }

    #[test]
    fn gates_appear_in_wall_shape_and_both_node_sets() {
        let city = build(20, 11, CoastMode::Forbid);
        let border = city.border.as_ref().unwrap();
        let topo = city.topology.as_ref().unwrap();
        for &gate in &border.gates {
            assert!(border.shape.contains_id(gate));
            assert!(topo.inner.contains(&gate));
            assert!(topo.outer.contains(&gate));
        }
    }

    #[test]
    fn adjacent_cells_share_reversed_edges() {
        let city = build(20, 5, CoastMode::Forbid);
        for id in city.cell_ids() {
            let cell = city.cell(id);
            for &nb in &cell.neighbors {
                let other = city.cell(nb);
                let shares = cell
                    .shape
                    .edge_ids()
                    .any(|(a, b)| other.shape.find_edge(b, a).is_some());
                assert!(shares, "neighbors {} and {} share no reversed edge", id, nb);
            }
        }
    }

    #[test]
    fn ward_exclusivity_and_core_emitters() {
        use crate::city::wards::WardKind;
        let city = build(30, 9, CoastMode::Forbid);
        // Grouped housing wards emit geometry only from their core cell,
        // and the core carries exactly the group's buildings. (Harbour
        // groups are excluded: piers are per-cell geometry.)
        for group in &city.groups {
            if city.ward_kind(group.core) != Some(WardKind::Alleys)
                && city.ward_kind(group.core) != Some(WardKind::Slum)
            {
                continue;
            }
            let emitters = group
                .members
                .iter()
                .filter(|&&m| !city.wards[m.0 as usize].geometry.is_empty())
                .count();
            assert!(emitters <= 1);
            if emitters == 1 {
                assert!(!city.wards[group.core.0 as usize].geometry.is_empty());
            }
            assert_eq!(
                city.wards[group.core.0 as usize].geometry.len(),
                group.building_count()
            );
        }
    }

    #[test]
    fn walled_town_has_towers_and_wall_segments() {
        let city = build(30, 13, CoastMode::Forbid);
        assert!(city.features.contains(CityFeatures::WALLS));
        let border = city.border.as_ref().unwrap();
        assert!(border.segments.iter().any(|&s| s));
        assert!(!border.towers.is_empty());
    }

    #[test]
    fn disabled_segments_only_on_water_or_citadel() {
        let city = build(30, 21, CoastMode::Forbid);
        let border = city.border.as_ref().unwrap();
        let n = border.shape.len();
        for i in 0..n {
            if border.segments[i] {
                continue;
            }
            let v0 = border.shape.id(i);
            let v1 = border.shape.id((i + 1) % n);
            let wet = city.cells.iter().any(|c| {
                c.waterbody && c.shape.contains_id(v0) && c.shape.contains_id(v1)
            });
            let citadel = city.citadel.as_ref().map_or(false, |cit| {
                cit.shape.contains_id(v0) && cit.shape.contains_id(v1)
            });
            assert!(wet || citadel);
        }
    }

    #[test]
    fn buildings_are_inside_the_map() {
        let city = build(30, 17, CoastMode::Forbid);
        let plan = TownPlan::from_city(&city);
        for ward in &plan.wards {
            for b in &ward.buildings {
                let c = b.centroid();
                assert!(c.x > -50.0 && c.x < plan.width + 50.0);
                assert!(c.y > -50.0 && c.y < plan.height + 50.0);
            }
        }
    }

    #[test]
    fn medium_town_produces_buildings() {
        let plan = TownPlan::from_city(&build(30, 23, CoastMode::Forbid));
        assert!(plan.building_count() > 0);
    }

    #[test]
    fn junction_optimization_leaves_no_duplicate_vertices() {
        use crate::points::Point;
        let city = build(30, 19, CoastMode::Forbid);
        for id in city.cell_ids() {
            let cell = city.cell(id);
            if !cell.within_city {
                continue;
            }
            // No repeated ids within a cell, and no zero-length edges.
            let mut ids = cell.shape.ids().to_vec();
            ids.sort_unstable();
            ids.dedup();
            assert_eq!(ids.len(), cell.shape.len(), "cell {} repeats ids", id);
            for (a, b) in cell.shape.edge_ids() {
                let d = Point::distance(city.store.get(a), city.store.get(b));
                assert!(d > 1e-9, "cell {} has a degenerate edge", id);
            }
        }
    }
}
