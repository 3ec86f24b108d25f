//! Recursive block partitioner.
//!
//! Splits a polygon into blocks by cutting across the long axis of its
//! oriented bounding box. Cuts prefer to land perpendicular on an opposite
//! edge; when they cannot, they turn once partway across, which is what
//! gives organic block boundaries their dog-legs. Every accepted cut is
//! recorded: the cuts are the alleys between blocks.

use crate::geometry::{intersect_lines, Ring};
use crate::points::Point;
use crate::random::Rng;
use log::trace;

const MAX_ATTEMPTS: usize = 10;

pub struct Bisector {
    /// Area floor: pieces below `min_area · variance^|N4|` stop subdividing.
    pub min_area: f64,
    /// Spread of the stochastic area threshold and of the acceptable
    /// imbalance between the two halves of a cut.
    pub variance: f64,
    /// Smallest distance from a cut start to its turn point.
    pub min_offset: f64,
    /// Cuts whose turn deviates less than this are straightened.
    pub min_turn_offset: f64,
    /// Accepted cut polylines, in cutting order. These become alleys.
    pub cuts: Vec<Vec<Point>>,
}

impl Bisector {
    pub fn new(min_area: f64, variance: f64) -> Self {
        Bisector {
            min_area,
            variance,
            min_offset: min_area.sqrt(),
            min_turn_offset: 1.0,
            cuts: Vec::new(),
        }
    }

    pub fn partition(&mut self, poly: &Ring, rng: &mut Rng) -> Vec<Ring> {
        let mut out = Vec::new();
        self.subdivide(poly.clone(), rng, &mut out);
        out
    }

    fn subdivide(&mut self, poly: Ring, rng: &mut Rng, out: &mut Vec<Ring>) {
        if self.is_atomic(&poly, rng) {
            out.push(poly);
            return;
        }
        let parts = self.make_cut(&poly, 0, rng);
        if parts.len() < 2 {
            out.push(poly);
            return;
        }
        for part in parts {
            self.subdivide(part, rng, out);
        }
    }

    fn is_atomic(&self, poly: &Ring, rng: &mut Rng) -> bool {
        let threshold = self.min_area * self.variance.powf(rng.normal4().abs());
        poly.area().abs() < threshold
    }

    fn make_cut(&mut self, poly: &Ring, attempt: usize, rng: &mut Rng) -> Vec<Ring> {
        if attempt > MAX_ATTEMPTS {
            return vec![poly.clone()];
        }
        let c = poly.len();
        if c < 3 {
            return vec![poly.clone()];
        }

        // Base box: the OBB on the first try, an axis-aligned box in a
        // rotated frame on retries so the cut direction changes.
        let obb = if attempt > 0 {
            let angle = attempt as f64 / 10.0 * std::f64::consts::TAU;
            let (sin, cos) = angle.sin_cos();
            let mut rotated = poly.clone();
            rotate_yx(&mut rotated, sin, cos);
            let mut aabb = Ring::new(rotated.aabb().to_vec());
            rotate_yx(&mut aabb, -sin, cos);
            let pts = aabb.pts();
            [pts[0], pts[1], pts[2], pts[3]]
        } else {
            match poly.obb() {
                Some(b) => b,
                None => return vec![poly.clone()],
            }
        };

        let d = obb[0];
        let mut h = obb[1] - d;
        let mut k = obb[3] - d;
        if h.length() < k.length() {
            std::mem::swap(&mut h, &mut k);
        }

        // Cut position along the long axis: centroid projection mixed with
        // a bell draw, kept away from the box ends.
        let centroid = poly.centroid();
        let proj = project(h, centroid - d);
        let proj = ((proj + rng.normal3()) / 2.0).clamp(0.2, 0.8);
        let p = d + h * proj;

        // Start the cut on the edge best aligned with the long axis.
        let mut edge1: Option<usize> = None;
        let mut cut_start = Point::default();
        let mut edge_dir = Point::default();
        let mut best_align = 0.0;
        for r in 0..c {
            let l = poly.point(r);
            let x = poly.vector(r);
            if x.length() < 1e-10 {
                continue;
            }
            let Some((_, t2)) = intersect_lines(p.x, p.y, k.x, k.y, l.x, l.y, x.x, x.y) else {
                continue;
            };
            if t2 <= 0.0 || t2 >= 1.0 {
                continue;
            }
            let xn = x * (1.0 / x.length());
            let align = (h.x * xn.x + h.y * xn.y).abs();
            if align > best_align {
                best_align = align;
                edge1 = Some(r);
                cut_start = l + x * t2;
                edge_dir = xn;
            }
        }
        let Some(edge1) = edge1 else {
            return self.make_cut(poly, attempt + 1, rng);
        };

        // Fire perpendicular to that edge and find the nearest opposite
        // edge the ray can land on.
        let g = edge_dir.rotate90();
        let mut min_dist = f64::INFINITY;
        let mut edge2: Option<usize> = None;
        for r in 0..c {
            if r == edge1 {
                continue;
            }
            let l = poly.point(r);
            let x = poly.vector(r);
            if x.length() < 1e-10 {
                continue;
            }
            let Some((t1, t2)) =
                intersect_lines(cut_start.x, cut_start.y, g.x, g.y, l.x, l.y, x.x, x.y)
            else {
                continue;
            };
            if t1 <= 0.0 || t1 >= min_dist || t2 <= 0.0 || t2 >= 1.0 {
                continue;
            }
            min_dist = t1;
            edge2 = Some(r);
        }
        let Some(edge2) = edge2 else {
            trace!("bisector: no opposite edge (attempt {})", attempt);
            return self.make_cut(poly, attempt + 1, rng);
        };

        // Near-perpendicular landing: try the straight cut first.
        let edge2_dir = poly.vector(edge2);
        let cross = g.cross(edge2_dir);
        let cross_norm_sq = cross * cross / (g.dot(g) * edge2_dir.dot(edge2_dir));
        if cross_norm_sq > 0.99 {
            let straight_end = cut_start + g * min_dist;
            let cut_line = vec![cut_start, straight_end];
            let (half1, half2) = split(poly, edge1, edge2, &cut_line);
            if balanced(&half1, &half2, self.variance) {
                self.cuts.push(cut_line);
                return vec![half1, half2];
            }
        }

        // Otherwise turn once partway across and reach for a second edge
        // whose perpendicular is clear of the rest of the polygon.
        let mut offset_ratio = (self.min_offset / min_dist).min(0.5);
        offset_ratio += (1.0 - 2.0 * offset_ratio) * rng.normal3();
        let turn = cut_start + g * (min_dist * offset_ratio);

        let mut edge3: Option<usize> = None;
        let mut cut_end = Point::default();
        let mut best_cross = f64::NEG_INFINITY;
        for r in 0..c {
            if r == edge1 {
                continue;
            }
            let l = poly.point(r);
            let x = poly.vector(r);
            let x_len = x.length();
            if x_len < 1e-10 {
                continue;
            }
            let Some((t1, t2)) =
                intersect_lines(turn.x, turn.y, x.y, -x.x, l.x, l.y, x.x, x.y)
            else {
                continue;
            };
            if t1 <= 0.0 || t2 <= 0.0 || t2 >= 1.0 {
                continue;
            }
            let cross_val = g.cross(x) / x_len;
            if cross_val <= best_cross {
                continue;
            }
            // The perpendicular must not pass through any other edge.
            let mut clear = true;
            for y in 0..c {
                if y == r || y == edge1 {
                    continue;
                }
                let yl = poly.point(y);
                let yd = poly.vector(y);
                if yd.length() < 1e-10 {
                    continue;
                }
                if let Some((ct1, ct2)) =
                    intersect_lines(turn.x, turn.y, x.y, -x.x, yl.x, yl.y, yd.x, yd.y)
                {
                    if (0.0..=1.0).contains(&ct1) && (0.0..=1.0).contains(&ct2) {
                        clear = false;
                        break;
                    }
                }
            }
            if clear {
                best_cross = cross_val;
                edge3 = Some(r);
                cut_end = l + x * t2;
            }
        }

        if let Some(edge3) = edge3 {
            let raw = vec![cut_start, turn, cut_end];
            let mut cut_line = self.detect_straight(&raw);
            // The turn point must stay inside the polygon.
            if cut_line.len() > 2 && !poly.contains(cut_line[1]) {
                cut_line = raw;
            }
            let (half1, half2) = split(poly, edge1, edge3, &cut_line);
            if !balanced(&half1, &half2, self.variance) {
                return self.make_cut(poly, attempt + 1, rng);
            }
            self.cuts.push(cut_line);
            return vec![half1, half2];
        }

        trace!("bisector: cut failed (attempt {})", attempt);
        self.make_cut(poly, attempt + 1, rng)
    }

    /// Degenerate dog-legs collapse to a straight segment.
    fn detect_straight(&self, cut: &[Point]) -> Vec<Point> {
        if self.min_turn_offset > 0.0 && cut.len() >= 3 {
            let tri = Ring::new(cut.to_vec());
            let dist = Point::distance(cut[0], cut[2]);
            if dist > 0.0 && tri.area().abs() / dist < self.min_turn_offset {
                return vec![cut[0], cut[2]];
            }
        }
        cut.to_vec()
    }
}

fn balanced(a: &Ring, b: &Ring, variance: f64) -> bool {
    let a0 = a.area().abs();
    let a1 = b.area().abs();
    if a0 < 1e-9 || a1 < 1e-9 {
        return false;
    }
    (a0 / a1).max(a1 / a0) <= 2.0 * variance
}

fn project(vec: Point, p: Point) -> f64 {
    let len_sq = vec.dot(vec);
    if len_sq < 1e-10 {
        return 0.0;
    }
    vec.dot(p) / len_sq
}

fn rotate_yx(ring: &mut Ring, sin: f64, cos: f64) {
    for i in 0..ring.len() {
        let p = ring.point(i);
        ring.set_point(i, Point::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos));
    }
}

/// Insert the cut endpoints into the polygon at their edges and assemble
/// the two halves, the cut polyline joining them.
fn split(poly: &Ring, edge1: usize, edge2: usize, cut_line: &[Point]) -> (Ring, Ring) {
    let mut pts: Vec<Point> = poly.pts().to_vec();
    let mut e1 = edge1;
    let mut e2 = edge2;
    let h1 = cut_line[0];
    let h2 = *cut_line.last().unwrap();

    if !pts[e1].approx_eq(&h1) {
        if e1 < e2 {
            e2 += 1;
        }
        pts.insert(e1 + 1, h1);
        e1 += 1;
    }
    if !pts[e2].approx_eq(&h2) {
        if e2 < e1 {
            e1 += 1;
        }
        pts.insert(e2 + 1, h2);
        e2 += 1;
    }

    let rev: Vec<Point> = cut_line.iter().rev().copied().collect();
    let mut poly1 = Vec::new();
    let mut poly2 = Vec::new();
    if e1 < e2 {
        poly1.extend_from_slice(&pts[e1 + 1..=e2]);
        poly1.extend_from_slice(&rev);
        poly2.extend_from_slice(&pts[e2 + 1..]);
        poly2.extend_from_slice(&pts[..=e1]);
        poly2.extend_from_slice(cut_line);
    } else {
        poly1.extend_from_slice(&pts[e1 + 1..]);
        poly1.extend_from_slice(&pts[..=e2]);
        poly1.extend_from_slice(&rev);
        poly2.extend_from_slice(&pts[e2 + 1..=e1]);
        poly2.extend_from_slice(cut_line);
    }
    (dedup_ring(poly1), dedup_ring(poly2))
}

/// Drop consecutive coincident vertices (the cut endpoints get duplicated
/// where they land on an existing vertex).
fn dedup_ring(pts: Vec<Point>) -> Ring {
    let mut out: Vec<Point> = Vec::with_capacity(pts.len());
    for p in pts {
        if out.last().map_or(true, |last| !last.approx_eq(&p)) {
            out.push(p);
        }
    }
    if out.len() > 1 && out[0].approx_eq(out.last().unwrap()) {
        out.pop();
    }
    Ring::new(out)
}
