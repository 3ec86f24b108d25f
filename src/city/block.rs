//! City blocks: frontage lots, rectangle approximation, buildings, trees.

use crate::city::building;
use crate::city::group::AlleyParams;
use crate::geometry::{self, lerp, Ring};
use crate::points::Point;
use crate::random::Rng;
use log::trace;

/// One polygon carved out of a ward-group by the bisector.
#[derive(Clone, Debug, Default)]
pub struct Block {
    pub shape: Ring,
    pub lots: Vec<Ring>,
    pub rects: Vec<Ring>,
    pub buildings: Vec<Ring>,
    /// Interior lots that touch no block edge; they get trees, not houses.
    pub courtyard: Vec<Ring>,
    center: Option<Point>,
}

impl Block {
    pub fn new(shape: Ring) -> Self {
        Block {
            shape,
            ..Default::default()
        }
    }

    pub fn center(&mut self) -> Point {
        if self.center.is_none() {
            self.center = Some(self.shape.centroid());
        }
        self.center.unwrap()
    }

    /// Subdivide along the longest edge (the frontage) into quadrilateral
    /// lots by interpolating between the front and back edges.
    pub fn create_lots(&mut self, params: &AlleyParams) {
        self.lots.clear();
        self.courtyard.clear();
        if self.shape.len() < 3 {
            return;
        }

        let area = self.shape.area().abs();
        if area < params.min_sq {
            self.lots.push(self.shape.clone());
            return;
        }

        let n = self.shape.len();
        let front = self.shape.longest_edge();
        let front_len = self.shape.vector(front).length();
        if front_len < params.min_front * 2.0 {
            self.lots.push(self.shape.clone());
            return;
        }

        let front_p1 = self.shape.point(front);
        let front_p2 = self.shape.point((front + 1) % n);
        let back = (front + 2) % n;
        let back_p1 = self.shape.point(back);
        let back_p2 = self.shape.point((back + 1) % n);

        let count = ((front_len / params.min_front) as usize).max(2);
        for i in 0..count {
            let t1 = i as f64 / count as f64;
            let t2 = (i + 1) as f64 / count as f64;
            self.lots.push(Ring::new(vec![
                lerp(front_p1, front_p2, t1),
                lerp(front_p1, front_p2, t2),
                lerp(back_p2, back_p1, t2),
                lerp(back_p2, back_p1, t1),
            ]));
        }
    }

    /// Move interior lots out of `lots` into the courtyard. A lot stays a
    /// perimeter lot if any of its vertices lies on a block edge.
    pub fn filter_inner(&mut self) {
        let shape = self.shape.clone();
        let (perimeter, courtyard) = std::mem::take(&mut self.lots)
            .into_iter()
            .partition(|lot: &Ring| {
                lot.pts().iter().any(|&v| {
                    shape
                        .edges()
                        .any(|(a, b)| geometry::distance_to_segment(v, a, b) < 1e-3)
                })
            });
        self.lots = perimeter;
        self.courtyard = courtyard;
    }

    /// Pull lots toward the block center by a random fraction of their size
    /// so building fronts do not line up perfectly.
    pub fn indent_fronts(&mut self, rng: &mut Rng) {
        let block_center = self.center();
        for lot in &mut self.lots {
            let area = lot.area().abs();
            let indent = (area.sqrt() / 3.0).min(1.2) * rng.float();
            if indent < 0.5 {
                continue;
            }
            let dir = block_center - lot.centroid();
            let len = dir.length();
            if len < 1e-3 {
                continue;
            }
            let step = dir * (indent / len);
            lot.offset(step.x, step.y);
        }
    }

    /// Largest-inscribed-rectangle approximation: the OBB of each lot,
    /// shrunk 10 % toward its center.
    pub fn create_rects(&mut self) {
        self.rects.clear();
        for lot in &self.lots {
            if lot.len() < 3 {
                continue;
            }
            let Some(obb) = lot.obb() else {
                self.rects.push(lot.clone());
                continue;
            };
            let center = obb.iter().fold(Point::default(), |acc, p| acc + *p) * 0.25;
            let lira = Ring::new(obb.iter().map(|&p| lerp(p, center, 0.1)).collect());
            if lira.area().abs() < 0.5 {
                trace!("block: lot rect degenerate, using lot outline");
                self.rects.push(lot.clone());
            } else {
                self.rects.push(lira);
            }
        }
    }

    /// Grow a footprint on every rect; a failed growth falls back to the
    /// rect itself so the block never loses a lot silently.
    pub fn create_buildings(&mut self, params: &AlleyParams, rng: &mut Rng) {
        self.buildings.clear();
        let threshold = params.min_sq / 4.0 * params.shape_factor;
        for rect in &self.rects {
            if rect.len() < 3 {
                continue;
            }
            match building::create(rect, threshold, true, false, 0.6, rng) {
                Some(b) => self.buildings.push(b),
                None => self.buildings.push(rect.clone()),
            }
        }
    }

    /// Tree positions sampled over the courtyard lots.
    pub fn spawn_trees(&self, greenery: f64, urban: bool, rng: &mut Rng) -> Vec<Point> {
        let density = if urban { greenery } else { greenery * 0.1 };
        let mut trees = Vec::new();
        for yard in &self.courtyard {
            trees.extend(geometry::fill_area(yard, density, 3.0, rng));
        }
        trees
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> AlleyParams {
        AlleyParams {
            min_sq: 30.0,
            grid_chaos: 0.5,
            size_chaos: 0.5,
            shape_factor: 1.0,
            inset: 0.5,
            block_size: 8.0,
            min_front: 30.0f64.sqrt(),
        }
    }

    fn block(w: f64, h: f64) -> Block {
        let mut r = Ring::rect(w, h);
        r.offset(w / 2.0, h / 2.0);
        Block::new(r)
    }

    #[test]
    fn tiny_block_is_single_lot() {
        let mut b = block(4.0, 4.0);
        b.create_lots(&params());
        assert_eq!(b.lots.len(), 1);
    }

    #[test]
    fn lot_count_follows_frontage() {
        let mut b = block(40.0, 10.0);
        b.create_lots(&params());
        let expected = ((40.0 / params().min_front) as usize).max(2);
        assert_eq!(b.lots.len(), expected);
    }

    #[test]
    fn lots_are_quadrilaterals() {
        let mut b = block(40.0, 10.0);
        b.create_lots(&params());
        for lot in &b.lots {
            assert_eq!(lot.len(), 4);
        }
    }

    #[test]
    fn lots_tile_the_block() {
        let mut b = block(40.0, 10.0);
        b.create_lots(&params());
        let total: f64 = b.lots.iter().map(|l| l.area().abs()).sum();
        assert!((total - 400.0).abs() < 1.0);
    }

    #[test]
    fn frontage_lots_touch_perimeter() {
        let mut b = block(40.0, 10.0);
        b.create_lots(&params());
        b.filter_inner();
        // Front/back interpolation keeps every lot on the perimeter.
        assert!(b.courtyard.is_empty());
        assert!(!b.lots.is_empty());
    }

    #[test]
    fn filter_inner_catches_detached_lot() {
        let mut b = block(40.0, 40.0);
        b.create_lots(&params());
        // Inject a synthetic interior lot.
        let mut inner = Ring::rect(2.0, 2.0);
        inner.offset(20.0, 20.0);
        b.lots.push(inner);
        b.filter_inner();
        assert_eq!(b.courtyard.len(), 1);
    }

    #[test]
    fn rects_shrink_lots() {
        let mut b = block(40.0, 10.0);
        b.create_lots(&params());
        b.create_rects();
        assert_eq!(b.rects.len(), b.lots.len());
        for (rect, lot) in b.rects.iter().zip(&b.lots) {
            assert!(rect.area().abs() < lot.area().abs());
        }
    }

    #[test]
    fn buildings_cover_every_rect() {
        let mut rng = Rng::new(3);
        let mut b = block(40.0, 14.0);
        b.create_lots(&params());
        b.create_rects();
        b.create_buildings(&params(), &mut rng);
        assert_eq!(b.buildings.len(), b.rects.len());
    }

    #[test]
    fn courtyard_trees_stay_inside() {
        let mut rng = Rng::new(9);
        let mut b = block(30.0, 30.0);
        let mut yard = Ring::rect(10.0, 10.0);
        yard.offset(15.0, 15.0);
        b.courtyard.push(yard.clone());
        let trees = b.spawn_trees(1.0, true, &mut rng);
        assert!(!trees.is_empty());
        for t in trees {
            assert!(yard.contains(t));
        }
    }
}
