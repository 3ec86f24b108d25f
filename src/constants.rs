//! Shared constants for the town pipeline.

/// Width of a main artery leading from a gate to the plaza.
pub const MAIN_STREET: f64 = 4.0;
/// Width of an ordinary street inside the walls.
pub const REGULAR_STREET: f64 = 2.0;
/// Width of an alley between blocks; also the base inset for plain edges.
pub const ALLEY: f64 = 1.2;

/// Thickness of curtain-wall masonry.
pub const WALL_THICKNESS: f64 = 1.5;
/// Exclusion radius around an ordinary wall tower.
pub const TOWER_RADIUS: f64 = 1.9;
/// Exclusion radius around a large (gate-flanking) tower.
pub const LTOWER_RADIUS: f64 = 2.5;

/// Vertices closer than this along an interior cell edge are merged into one
/// junction during topology optimization.
pub const JUNCTION_EPSILON: f64 = 8.0;

/// Valid range for the requested cell count.
pub const MIN_CELLS: usize = 5;
pub const MAX_CELLS: usize = 200;

/// Coordinate-comparison tolerance for value equality of points.
pub const COORD_EPSILON: f64 = 1e-9;

/// Number of cells for each named town size.
pub fn size_cells(size: &str) -> Option<usize> {
    match size {
        "small" => Some(15),
        "medium" => Some(30),
        "large" => Some(60),
        _ => None,
    }
}
