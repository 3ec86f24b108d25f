//! Rivers and canals.
//!
//! A river runs from a shore vertex to the landward horizon, following cell
//! vertices greedily, smoothed twice. Where it crosses an artery a bridge
//! point is recorded. The water polygon is the course widened into a stripe.

use crate::city::cell::Cell;
use crate::geometry::{self, intersect_lines, Ring};
use crate::points::{Point, PointId, PointStore};
use crate::random::Rng;
use log::debug;

const MAX_COURSE_STEPS: usize = 200;

#[derive(Clone, Debug)]
pub struct Canal {
    /// Ordered course from the shore inland.
    pub course: Vec<Point>,
    pub width: f64,
    /// Points where the canal crosses a street, with the street direction.
    pub bridges: Vec<(Point, Point)>,
}

impl Canal {
    /// Trace a river for a coastal town. Returns `None` when the shore or
    /// the horizon offers no usable endpoints.
    pub fn river(cells: &[Cell], store: &PointStore, center: Point, rng: &mut Rng) -> Option<Canal> {
        let width = 3.0 + rng.float() * 3.0;

        // Shore vertices: shared between a land cell and a water neighbor.
        let mut shore: Vec<PointId> = Vec::new();
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
                    shore.push(id);
                }
            }
        }
        if shore.is_empty() {
            debug!("river: no shore vertices");
            return None;
        }

        // Entry point: the shore vertex nearest the town center.
        let start = *shore.iter().min_by(|&&a, &&b| {
            let da = Point::distance(store.get(a), center);
            let db = Point::distance(store.get(b), center);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })?;
        let start_p = store.get(start);

        // Shore tangent at the entry, for the inland normal.
        let mut shore_dir = Point::new(0.0, 1.0);
        for cell in cells {
            if cell.waterbody {
                continue;
            }
            if let Some(i) = cell.shape.index_of(start) {
                let n = cell.shape.len();
                let prev = cell.shape.point((i + n - 1) % n, store);
                let next = cell.shape.point((i + 1) % n, store);
                shore_dir = (next - prev).norm(1.0);
                break;
            }
        }
        let inland = shore_dir.rotate90();

        // Exit point: an outer non-shore vertex scoring best on alignment
        // with the inland direction plus distance.
        let mut best: Option<(PointId, f64)> = None;
        for cell in cells {
            if cell.waterbody || cell.within_city {
                continue;
            }
            for &id in cell.shape.ids() {
                if shore.contains(&id) {
                    continue;
                }
                let p = store.get(id);
                let dist = Point::distance(p, start_p);
                if dist < 1.0 {
                    continue;
                }
                let dir = (p - start_p).norm(1.0);
                let score = 0.5 * dir.dot(inland) + 0.01 * dist;
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((id, score));
                }
            }
        }
        let (end, _) = best?;

        let course = walk_course(cells, store, start, end, rng)?;
        let course = geometry::smooth_open(&course, 2);
        debug!("river: {} course points, width {:.1}", course.len(), width);

        Some(Canal {
            course,
            width,
            bridges: Vec::new(),
        })
    }

    /// Record bridge points where arteries cross the course.
    pub fn find_bridges(&mut self, arteries: &[Vec<PointId>], store: &PointStore) {
        self.bridges.clear();
        for artery in arteries {
            for pair in artery.windows(2) {
                let s1 = store.get(pair[0]);
                let s2 = store.get(pair[1]);
                for c in self.course.windows(2) {
                    let d1 = c[1] - c[0];
                    let d2 = s2 - s1;
                    if let Some((t1, t2)) =
                        intersect_lines(c[0].x, c[0].y, d1.x, d1.y, s1.x, s1.y, d2.x, d2.y)
                    {
                        if (0.0..=1.0).contains(&t1) && (0.0..=1.0).contains(&t2) {
                            self.bridges.push((c[0] + d1 * t1, d2.norm(1.0)));
                        }
                    }
                }
            }
        }
        debug!("river: {} bridges", self.bridges.len());
    }

    /// True when `v0 -> v1` runs along the course (either direction).
    pub fn contains_edge(&self, v0: Point, v1: Point) -> bool {
        self.course.windows(2).any(|c| {
            (c[0].approx_eq(&v0) && c[1].approx_eq(&v1))
                || (c[0].approx_eq(&v1) && c[1].approx_eq(&v0))
        })
    }

    pub fn width_at(&self, v: Point) -> f64 {
        if self.course.iter().any(|c| Point::distance(*c, v) < 0.5) {
            self.width
        } else {
            0.0
        }
    }

    /// The course widened into its water polygon.
    pub fn water_polygon(&self) -> Ring {
        geometry::stripe(&self.course, self.width, 1.0)
    }
}

/// Greedy walk from `start` to `end` along cell vertices, always taking the
/// unvisited vertex that makes the most progress toward the target.
fn walk_course(
    cells: &[Cell],
    store: &PointStore,
    start: PointId,
    end: PointId,
    rng: &mut Rng,
) -> Option<Vec<Point>> {
    let target = store.get(end);
    let mut course = vec![store.get(start)];
    let mut visited = vec![start];
    let mut current = start;

    for _ in 0..MAX_COURSE_STEPS {
        let mut best: Option<(PointId, f64)> = None;
        for cell in cells {
            if cell.waterbody || !cell.shape.contains_id(current) {
                continue;
            }
            for &id in cell.shape.ids() {
                if visited.contains(&id) {
                    continue;
                }
                let p = store.get(id);
                let progress = Point::distance(store.get(current), target)
                    - Point::distance(p, target)
                    + rng.float() * 5.0;
                if best.map_or(true, |(_, s)| progress > s) {
                    best = Some((id, progress));
                }
            }
        }
        let (next, progress) = best?;
        if progress <= -10.0 {
            break;
        }
        course.push(store.get(next));
        visited.push(next);
        current = next;
        if Point::distance(store.get(current), target) < 5.0 {
            break;
        }
    }

    if current != end {
        course.push(target);
    }
    if course.len() < 2 {
        None
    } else {
        Some(course)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canal(course: Vec<Point>) -> Canal {
        Canal {
            course,
            width: 4.0,
            bridges: Vec::new(),
        }
    }

    #[test]
    fn contains_edge_matches_both_directions() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(5.0, 0.0);
        let c = canal(vec![a, b]);
        assert!(c.contains_edge(a, b));
        assert!(c.contains_edge(b, a));
        assert!(!c.contains_edge(a, Point::new(9.0, 9.0)));
    }

    #[test]
    fn width_at_course_vertex() {
        let a = Point::new(0.0, 0.0);
        let c = canal(vec![a, Point::new(5.0, 0.0)]);
        assert_eq!(c.width_at(a), 4.0);
        assert_eq!(c.width_at(Point::new(2.5, 3.0)), 0.0);
    }

    #[test]
    fn water_polygon_covers_the_course() {
        let c = canal(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        let water = c.water_polygon();
        assert!(water.contains(Point::new(5.0, 0.0)));
    }

    #[test]
    fn bridges_found_at_crossings() {
        let mut store = PointStore::new();
        let a = store.insert(Point::new(5.0, -5.0));
        let b = store.insert(Point::new(5.0, 5.0));
        let mut c = canal(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        c.find_bridges(&[vec![a, b]], &store);
        assert_eq!(c.bridges.len(), 1);
        assert!(c.bridges[0].0.approx_eq(&Point::new(5.0, 0.0)));
    }

    #[test]
    fn parallel_street_is_no_bridge() {
        let mut store = PointStore::new();
        let a = store.insert(Point::new(0.0, 3.0));
        let b = store.insert(Point::new(10.0, 3.0));
        let mut c = canal(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]);
        c.find_bridges(&[vec![a, b]], &store);
        assert!(c.bridges.is_empty());
    }
}
