//! City cells (patches) and per-edge classification.

use crate::constants::{ALLEY, WALL_THICKNESS};
use crate::polygon::Polygon;
use fnv::FnvHashMap;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellId(pub u32);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CellId({})", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GroupId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WardId(pub u32);

/// What lies on the far side of a cell edge. Drives the inset the ward
/// applies when shrinking its shape to leave room for streets, walls and
/// water margins.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum EdgeType {
    #[default]
    None,
    Coast,
    Road,
    Wall,
    Canal,
    Horizon,
}

impl EdgeType {
    /// Canonical inset distance for this edge kind.
    pub fn inset(self, landing: bool, canal_width: f64) -> f64 {
        match self {
            EdgeType::Coast => {
                if landing {
                    2.0
                } else {
                    ALLEY
                }
            }
            EdgeType::Road => 1.0,
            EdgeType::Wall => WALL_THICKNESS / 2.0 + ALLEY,
            EdgeType::Canal => canal_width / 2.0 + ALLEY,
            EdgeType::Horizon => 0.0,
            EdgeType::None => ALLEY / 2.0,
        }
    }

    /// Farms sit looser in the landscape: wider road setbacks, a thin buffer
    /// toward other farms, none toward open land.
    pub fn farm_inset(self, neighbor_is_farm: bool, canal_width: f64) -> f64 {
        match self {
            EdgeType::Road => 3.0,
            EdgeType::Wall => 2.0 * WALL_THICKNESS,
            EdgeType::Canal => canal_width / 2.0 + ALLEY,
            EdgeType::None => {
                if neighbor_is_farm {
                    1.0
                } else {
                    0.0
                }
            }
            _ => 2.0,
        }
    }
}

/// One Voronoi face of the town plan.
#[derive(Clone, Debug, Default)]
pub struct Cell {
    pub shape: Polygon,
    pub within_city: bool,
    pub within_walls: bool,
    pub waterbody: bool,
    /// Harbour landing: buildings keep extra distance from the water edge.
    pub landing: bool,
    /// Per-cell random seed for reproducible local detail.
    pub seed: i64,
    pub ward: Option<WardId>,
    pub group: Option<GroupId>,
    pub neighbors: Vec<CellId>,
    /// Sparse map from edge index (vertex i -> i+1) to its classification.
    pub edge_types: FnvHashMap<usize, EdgeType>,
}

impl Cell {
    pub fn new(shape: Polygon) -> Self {
        Cell {
            shape,
            ..Default::default()
        }
    }

    pub fn edge_type(&self, edge: usize) -> EdgeType {
        self.edge_types.get(&edge).copied().unwrap_or_default()
    }

    pub fn set_edge_type(&mut self, edge: usize, t: EdgeType) {
        if t == EdgeType::None {
            self.edge_types.remove(&edge);
        } else {
            self.edge_types.insert(edge, t);
        }
    }

    pub fn edge_inset(&self, edge: usize, canal_width: f64) -> f64 {
        self.edge_type(edge).inset(self.landing, canal_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_edge_type_is_none() {
        let cell = Cell::default();
        assert_eq!(cell.edge_type(3), EdgeType::None);
    }

    #[test]
    fn set_and_get_edge_type() {
        let mut cell = Cell::default();
        cell.set_edge_type(1, EdgeType::Coast);
        assert_eq!(cell.edge_type(1), EdgeType::Coast);
        assert_eq!(cell.edge_type(0), EdgeType::None);
    }

    #[test]
    fn setting_none_clears_the_entry() {
        let mut cell = Cell::default();
        cell.set_edge_type(2, EdgeType::Road);
        cell.set_edge_type(2, EdgeType::None);
        assert!(cell.edge_types.is_empty());
    }

    #[test]
    fn coast_inset_depends_on_landing() {
        assert!(EdgeType::Coast.inset(true, 0.0) > EdgeType::Coast.inset(false, 0.0));
    }

    #[test]
    fn canal_inset_scales_with_width() {
        let narrow = EdgeType::Canal.inset(false, 2.0);
        let wide = EdgeType::Canal.inset(false, 6.0);
        assert!(wide > narrow);
    }

    #[test]
    fn horizon_has_no_inset() {
        assert_eq!(EdgeType::Horizon.inset(false, 0.0), 0.0);
    }

    #[test]
    fn farm_edge_buffer_only_toward_farms() {
        assert_eq!(EdgeType::None.farm_inset(true, 0.0), 1.0);
        assert_eq!(EdgeType::None.farm_inset(false, 0.0), 0.0);
    }
}
