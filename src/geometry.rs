//! Value-polygon geometry.
//!
//! The topology layer shares vertices through the [`crate::points`] arena;
//! everything downstream of it (blocks, lots, buildings, farm fields) works
//! on owned coordinate rings defined here. A `Ring` is an ordered vertex
//! list, implicitly closed.

use crate::points::Point;
use crate::random::Rng;
use serde::Serialize;

const DELTA: f64 = 1e-6;

/// Intersect two lines given as point + direction. Returns the parametric
/// positions `(t1, t2)` along each line, or `None` for parallel lines.
pub fn intersect_lines(
    x1: f64,
    y1: f64,
    dx1: f64,
    dy1: f64,
    x2: f64,
    y2: f64,
    dx2: f64,
    dy2: f64,
) -> Option<(f64, f64)> {
    let d = dx1 * dy2 - dy1 * dx2;
    if d == 0.0 {
        return None;
    }
    let t2 = (dy1 * (x2 - x1) - dx1 * (y2 - y1)) / d;
    let t1 = if dx1 != 0.0 {
        (x2 - x1 + dx2 * t2) / dx1
    } else {
        (y2 - y1 + dy2 * t2) / dy1
    };
    Some((t1, t2))
}

pub fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// Distance from `p` to the segment `a..b`.
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let d = b - a;
    let len_sq = d.dot(d);
    if len_sq < DELTA {
        return Point::distance(p, a);
    }
    let t = ((p - a).dot(d) / len_sq).clamp(0.0, 1.0);
    Point::distance(p, a + d * t)
}

/// An owned polygon ring, implicitly closed.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Ring {
    pts: Vec<Point>,
}

impl Ring {
    pub fn new(pts: Vec<Point>) -> Self {
        Ring { pts }
    }

    pub fn rect(w: f64, h: f64) -> Self {
        Ring::new(vec![
            Point::new(-w / 2.0, -h / 2.0),
            Point::new(w / 2.0, -h / 2.0),
            Point::new(w / 2.0, h / 2.0),
            Point::new(-w / 2.0, h / 2.0),
        ])
    }

    pub fn regular(n: usize, r: f64) -> Self {
        let pts = (0..n)
            .map(|i| {
                let a = i as f64 / n as f64 * std::f64::consts::TAU;
                Point::new(r * a.cos(), r * a.sin())
            })
            .collect();
        Ring::new(pts)
    }

    pub fn circle(r: f64) -> Self {
        Ring::regular(16, r)
    }

    pub fn len(&self) -> usize {
        self.pts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pts.is_empty()
    }

    pub fn pts(&self) -> &[Point] {
        &self.pts
    }

    pub fn point(&self, i: usize) -> Point {
        self.pts[i]
    }

    pub fn set_point(&mut self, i: usize, p: Point) {
        self.pts[i] = p;
    }

    pub fn push(&mut self, p: Point) {
        self.pts.push(p);
    }

    pub fn into_pts(self) -> Vec<Point> {
        self.pts
    }

    /// Signed area; positive for counterclockwise winding.
    pub fn area(&self) -> f64 {
        if self.pts.len() < 3 {
            return 0.0;
        }
        let mut s = 0.0;
        for (v0, v1) in self.edges() {
            s += v0.x * v1.y - v1.x * v0.y;
        }
        s * 0.5
    }

    pub fn perimeter(&self) -> f64 {
        self.edges().map(|(a, b)| Point::distance(a, b)).sum()
    }

    pub fn compactness(&self) -> f64 {
        let p = self.perimeter();
        if p < DELTA {
            return 0.0;
        }
        4.0 * std::f64::consts::PI * self.area() / (p * p)
    }

    /// Plain vertex average.
    pub fn center(&self) -> Point {
        let mut c = Point::default();
        for p in &self.pts {
            c = c + *p;
        }
        c * (1.0 / self.pts.len() as f64)
    }

    /// Area centroid. Falls back to the vertex average for degenerate rings.
    pub fn centroid(&self) -> Point {
        let mut x = 0.0;
        let mut y = 0.0;
        let mut a = 0.0;
        for (v0, v1) in self.edges() {
            let f = v0.cross(v1);
            a += f;
            x += (v0.x + v1.x) * f;
            y += (v0.y + v1.y) * f;
        }
        if a.abs() < DELTA {
            return self.center();
        }
        let s6 = 1.0 / (3.0 * a);
        Point::new(s6 * x, s6 * y)
    }

    /// Iterate edges with wrap-around.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.pts.len();
        (0..n).map(move |i| (self.pts[i], self.pts[(i + 1) % n]))
    }

    /// Edge vector starting at vertex `i`.
    pub fn vector(&self, i: usize) -> Point {
        let n = self.pts.len();
        self.pts[(i + 1) % n] - self.pts[i]
    }

    pub fn longest_edge(&self) -> usize {
        let mut best = 0;
        let mut best_len = -1.0;
        for i in 0..self.pts.len() {
            let len = self.vector(i).length();
            if len > best_len {
                best_len = len;
                best = i;
            }
        }
        best
    }

    pub fn is_convex_vertex(&self, i: usize) -> bool {
        let n = self.pts.len();
        let v0 = self.pts[(i + n - 1) % n];
        let v1 = self.pts[i];
        let v2 = self.pts[(i + 1) % n];
        (v1 - v0).cross(v2 - v1) > 0.0
    }

    /// Even-odd point containment test.
    pub fn contains(&self, p: Point) -> bool {
        let n = self.pts.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let a = self.pts[i];
            let b = self.pts[j];
            if (a.y > p.y) != (b.y > p.y)
                && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }

    pub fn offset(&mut self, dx: f64, dy: f64) {
        for p in &mut self.pts {
            p.x += dx;
            p.y += dy;
        }
    }

    pub fn rotate(&mut self, a: f64) {
        let (sin, cos) = a.sin_cos();
        for p in &mut self.pts {
            *p = Point::new(p.x * cos - p.y * sin, p.y * cos + p.x * sin);
        }
    }

    pub fn reversed(&self) -> Ring {
        let mut pts = self.pts.clone();
        pts.reverse();
        Ring::new(pts)
    }

    /// Axis-aligned bounding box corners, counterclockwise from the minimum.
    pub fn aabb(&self) -> [Point; 4] {
        let mut min = self.pts[0];
        let mut max = self.pts[0];
        for p in &self.pts {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        [
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ]
    }

    /// Minimum-area oriented bounding box, trying each edge as the base axis.
    pub fn obb(&self) -> Option<[Point; 4]> {
        if self.pts.len() < 3 {
            return None;
        }
        let mut best: Option<[Point; 4]> = None;
        let mut best_area = f64::INFINITY;
        for i in 0..self.pts.len() {
            let edge = self.vector(i);
            let len = edge.length();
            if len < 1e-4 {
                continue;
            }
            let dir = edge * (1.0 / len);
            let perp = dir.rotate90();
            let mut min_d = f64::INFINITY;
            let mut max_d = f64::NEG_INFINITY;
            let mut min_p = f64::INFINITY;
            let mut max_p = f64::NEG_INFINITY;
            for v in &self.pts {
                let d = v.dot(dir);
                let p = v.dot(perp);
                min_d = min_d.min(d);
                max_d = max_d.max(d);
                min_p = min_p.min(p);
                max_p = max_p.max(p);
            }
            let area = (max_d - min_d) * (max_p - min_p);
            if area < best_area {
                best_area = area;
                best = Some([
                    dir * min_d + perp * min_p,
                    dir * max_d + perp * min_p,
                    dir * max_d + perp * max_p,
                    dir * min_d + perp * max_p,
                ]);
            }
        }
        best
    }

    /// Cut with the line through `p1`..`p2`. On a proper double intersection
    /// returns two halves ordered so that the half left of the cut direction
    /// comes first; otherwise returns a clone of `self`. A positive `gap`
    /// peels each half back from the cut edge by `gap / 2`.
    pub fn cut(&self, p1: Point, p2: Point, gap: f64) -> Vec<Ring> {
        let d1 = p2 - p1;
        let n = self.pts.len();

        let mut hits: Vec<(usize, f64)> = Vec::new();
        for i in 0..n {
            let v0 = self.pts[i];
            let v1 = self.pts[(i + 1) % n];
            let d2 = v1 - v0;
            if let Some((t1, t2)) =
                intersect_lines(p1.x, p1.y, d1.x, d1.y, v0.x, v0.y, d2.x, d2.y)
            {
                if (0.0..=1.0).contains(&t2) {
                    hits.push((i, t1));
                }
            }
        }

        if hits.len() != 2 {
            return vec![self.clone()];
        }
        let (edge1, ratio1) = hits[0];
        let (edge2, ratio2) = hits[1];
        let point1 = p1 + d1 * ratio1;
        let point2 = p1 + d1 * ratio2;

        // Half 1: point1, vertices (edge1+1 .. edge2], point2.
        let mut half1 = vec![point1];
        let mut i = (edge1 + 1) % n;
        loop {
            half1.push(self.pts[i]);
            if i == edge2 {
                break;
            }
            i = (i + 1) % n;
        }
        half1.push(point2);

        // Half 2: point2, vertices (edge2+1 .. edge1], point1.
        let mut half2 = vec![point2];
        let mut i = (edge2 + 1) % n;
        loop {
            half2.push(self.pts[i]);
            if i == edge1 {
                break;
            }
            i = (i + 1) % n;
        }
        half2.push(point1);

        let mut half1 = Ring::new(half1);
        let mut half2 = Ring::new(half2);

        if gap > 0.0 {
            // The cut edge is the closing edge (last -> first) in both halves.
            half1 = half1.peel(half1.len() - 1, gap / 2.0);
            half2 = half2.peel(half2.len() - 1, gap / 2.0);
        }

        let v = self.vector(edge1);
        if d1.cross(v) > 0.0 {
            vec![half1, half2]
        } else {
            vec![half2, half1]
        }
    }

    /// Remove a strip of width `d` along the edge starting at vertex `i1`,
    /// keeping the rest of the ring.
    pub fn peel(&self, i1: usize, d: f64) -> Ring {
        let n = self.pts.len();
        let v1 = self.pts[i1];
        let v2 = self.pts[(i1 + 1) % n];
        let offset = (v2 - v1).rotate90().norm(d);
        let halves = self.cut(v1 + offset, v2 + offset, 0.0);
        halves.into_iter().next().unwrap_or_else(|| self.clone())
    }

    /// Inset each edge inward by the matching distance, cutting one edge at a
    /// time. Zero distances leave their edge untouched.
    pub fn shrink(&self, d: &[f64]) -> Ring {
        let mut q = self.clone();
        for (i, (v1, v2)) in self.edges().enumerate() {
            let dd = if i < d.len() { d[i] } else { 0.0 };
            if dd > 0.0 {
                let offset = (v2 - v1).rotate90().norm(dd);
                let halves = q.cut(v1 + offset, v2 + offset, 0.0);
                if let Some(first) = halves.into_iter().next() {
                    q = first;
                }
            }
        }
        q
    }

    pub fn shrink_eq(&self, d: f64) -> Ring {
        self.shrink(&vec![d; self.pts.len()])
    }

    /// Offset every edge by the matching distance and resolve the resulting
    /// self-intersections, keeping the largest piece. Negative distances
    /// offset inward.
    pub fn buffer(&self, d: &[f64]) -> Ring {
        let mut q: Vec<Point> = Vec::with_capacity(self.pts.len() * 2);
        for (i, (v0, v1)) in self.edges().enumerate() {
            let dd = if i < d.len() { d[i] } else { 0.0 };
            if dd == 0.0 {
                q.push(v0);
                q.push(v1);
            } else {
                let n = (v1 - v0).rotate90().norm(dd);
                q.push(v0 + n);
                q.push(v1 + n);
            }
        }

        // Split at self-intersections by inserting the crossing point into
        // both edges, then keep the largest resulting loop.
        let mut last_edge = 0;
        loop {
            let mut was_cut = false;
            let n = q.len();
            'outer: for i in last_edge..n.saturating_sub(2) {
                last_edge = i;
                let p11 = q[i];
                let p12 = q[i + 1];
                let d1 = p12 - p11;
                let j_end = if i > 0 { n } else { n - 1 };
                for j in (i + 2)..j_end {
                    let p21 = q[j];
                    let p22 = if j < n - 1 { q[j + 1] } else { q[0] };
                    let d2 = p22 - p21;
                    if let Some((t1, t2)) =
                        intersect_lines(p11.x, p11.y, d1.x, d1.y, p21.x, p21.y, d2.x, d2.y)
                    {
                        if t1 > DELTA && t1 < 1.0 - DELTA && t2 > DELTA && t2 < 1.0 - DELTA {
                            let pn = p11 + d1 * t1;
                            q.insert(j + 1, pn);
                            q.insert(i + 1, pn);
                            was_cut = true;
                            break 'outer;
                        }
                    }
                }
            }
            if !was_cut {
                break;
            }
        }

        // Walk loops: advancing past a duplicated point jumps between loops.
        let mut remaining: Vec<usize> = (0..q.len()).collect();
        let mut best = Ring::default();
        let mut best_area = f64::NEG_INFINITY;
        while !remaining.is_empty() {
            let start = remaining[0];
            let mut i = start;
            let mut indices = Vec::new();
            loop {
                indices.push(i);
                remaining.retain(|&r| r != i);
                // Duplicated crossing points act as bridges between loops:
                // continue at the first occurrence of the next vertex value,
                // or the last one when the first is the edge we came along.
                let next_idx = (i + 1) % q.len();
                let v = q[next_idx];
                let mut next = q.iter().position(|p| p.approx_eq(&v)).unwrap_or(next_idx);
                if next == next_idx {
                    next = q.iter().rposition(|p| p.approx_eq(&v)).unwrap_or(next_idx);
                }
                i = next;
                if i == start || indices.contains(&i) {
                    break;
                }
            }
            let part = Ring::new(indices.iter().map(|&k| q[k]).collect());
            let s = part.area();
            if s > best_area {
                best_area = s;
                best = part;
            }
        }
        best
    }

    pub fn buffer_eq(&self, d: f64) -> Ring {
        self.buffer(&vec![d; self.pts.len()])
    }

    /// Neighbor-average smoothing of a closed ring; vertices near a fixed
    /// point are kept in place.
    pub fn smooth(&self, fixed: &[Point], iterations: usize) -> Ring {
        let mut current = self.pts.clone();
        let n = current.len();
        if n < 3 {
            return self.clone();
        }
        for _ in 0..iterations {
            let mut next = Vec::with_capacity(n);
            for i in 0..n {
                let v = current[i];
                if fixed.iter().any(|f| Point::distance(v, *f) < 0.01) {
                    next.push(v);
                } else {
                    let prev = current[(i + n - 1) % n];
                    let nxt = current[(i + 1) % n];
                    let avg = Point::midpoint(prev, nxt);
                    next.push(Point::midpoint(avg, v));
                }
            }
            current = next;
        }
        Ring::new(current)
    }

    /// Chaikin corner cutting; each corner is replaced by two points a
    /// quarter of the way toward its neighbors.
    pub fn chaikin(&self, closed: bool, iterations: usize, fixed: &[Point]) -> Ring {
        if self.pts.len() < 3 {
            return self.clone();
        }
        let is_fixed =
            |v: Point| fixed.iter().any(|f| Point::distance(v, *f) < 0.01);
        let mut current = self.pts.clone();
        for _ in 0..iterations {
            let n = current.len();
            let mut result = Vec::with_capacity(n * 2);
            let range = if closed { 0..n } else { 1..n - 1 };
            for i in range {
                let v = current[i];
                if is_fixed(v) {
                    result.push(v);
                } else {
                    let prev = current[(i + n - 1) % n];
                    let next = current[(i + 1) % n];
                    result.push(lerp(v, prev, 0.25));
                    result.push(lerp(v, next, 0.25));
                }
            }
            if !closed {
                result.insert(0, current[0]);
                result.push(current[n - 1]);
            }
            current = result;
        }
        Ring::new(current)
    }

    /// Drop least-significant vertices until at most `n` remain.
    pub fn simplify(&mut self, n: usize) {
        while self.pts.len() > n {
            let len = self.pts.len();
            let mut victim = 0;
            let mut min_measure = f64::INFINITY;
            for i in 0..len {
                let a = self.pts[(i + len - 1) % len];
                let b = self.pts[i];
                let c = self.pts[(i + 1) % len];
                let measure =
                    (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y)).abs();
                if measure < min_measure {
                    min_measure = measure;
                    victim = i;
                }
            }
            self.pts.remove(victim);
        }
    }

    /// Collapse runs of edges shorter than `threshold`.
    pub fn filter_short(&self, threshold: f64) -> Ring {
        if self.pts.is_empty() {
            return Ring::default();
        }
        let mut result = vec![self.pts[0]];
        let mut v0 = self.pts[0];
        let mut i = 1;
        while i < self.pts.len() {
            let mut v1 = self.pts[i];
            i += 1;
            while Point::distance(v0, v1) < threshold && i < self.pts.len() {
                v1 = self.pts[i];
                i += 1;
            }
            result.push(v1);
            v0 = v1;
        }
        Ring::new(result)
    }
}

/// Neighbor-average smoothing of an open polyline; endpoints stay fixed.
pub fn smooth_open(path: &[Point], iterations: usize) -> Vec<Point> {
    if path.len() < 3 {
        return path.to_vec();
    }
    let mut current = path.to_vec();
    for _ in 0..iterations {
        let n = current.len();
        let mut next = Vec::with_capacity(n);
        next.push(current[0]);
        for i in 1..n - 1 {
            let avg = Point::midpoint(current[i - 1], current[i + 1]);
            next.push(Point::midpoint(avg, current[i]));
        }
        next.push(current[n - 1]);
        current = next;
    }
    current
}

/// Widen a polyline into a stripe polygon of the given width. `cap` extends
/// the two ends along the line direction as a fraction of the half-width.
pub fn stripe(line: &[Point], width: f64, cap: f64) -> Ring {
    if line.len() < 2 {
        return Ring::default();
    }
    let half = width / 2.0;
    let mut left = Vec::with_capacity(line.len());
    let mut right = Vec::with_capacity(line.len());
    for (i, p) in line.iter().enumerate() {
        // Average the directions of the segments meeting at this vertex.
        let dir = if i == 0 {
            line[1] - line[0]
        } else if i == line.len() - 1 {
            line[i] - line[i - 1]
        } else {
            (line[i + 1] - line[i]).norm(1.0) + (line[i] - line[i - 1]).norm(1.0)
        };
        let n = dir.rotate90().norm(half);
        let mut v = *p;
        if i == 0 {
            v = v - dir.norm(half * cap);
        } else if i == line.len() - 1 {
            v = v + dir.norm(half * cap);
        }
        left.push(v + n);
        right.push(v - n);
    }
    right.reverse();
    left.extend(right);
    Ring::new(left)
}

/// Grid-sample points strictly inside `ring`; each in-polygon sample is kept
/// with probability `density`.
pub fn fill_area(ring: &Ring, density: f64, spacing: f64, rng: &mut Rng) -> Vec<Point> {
    let mut out = Vec::new();
    if ring.len() < 3 || density <= 0.0 {
        return out;
    }
    let [min, _, max, _] = ring.aabb();
    let mut y = min.y + spacing / 2.0;
    while y < max.y {
        let mut x = min.x + spacing / 2.0;
        while x < max.x {
            let p = Point::new(x, y);
            if ring.contains(p) && rng.bool(density) {
                out.push(p);
            }
            x += spacing;
        }
        y += spacing;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_square() -> Ring {
        Ring::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ])
    }

    #[test]
    fn square_area_is_one() {
        assert!((unit_square().area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn clockwise_area_is_negative() {
        assert!(unit_square().reversed().area() < 0.0);
    }

    #[test]
    fn centroid_of_square_is_center() {
        let c = unit_square().centroid();
        assert!(c.approx_eq(&Point::new(0.5, 0.5)));
    }

    #[test]
    fn perimeter_of_square_is_four() {
        assert!((unit_square().perimeter() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn contains_interior_not_exterior() {
        let sq = unit_square();
        assert!(sq.contains(Point::new(0.5, 0.5)));
        assert!(!sq.contains(Point::new(1.5, 0.5)));
    }

    #[test]
    fn intersect_lines_crossing() {
        // x-axis vs vertical line at x = 2.
        let (t1, t2) =
            intersect_lines(0.0, 0.0, 1.0, 0.0, 2.0, -1.0, 0.0, 1.0).unwrap();
        assert!((t1 - 2.0).abs() < 1e-9);
        assert!((t2 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn intersect_lines_parallel_is_none() {
        assert!(intersect_lines(0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 2.0, 0.0).is_none());
    }

    #[test]
    fn cut_square_in_half() {
        let halves = unit_square().cut(Point::new(0.5, -1.0), Point::new(0.5, 2.0), 0.0);
        assert_eq!(halves.len(), 2);
        let total: f64 = halves.iter().map(|h| h.area().abs()).sum();
        assert!((total - 1.0).abs() < 1e-6);
        assert!((halves[0].area().abs() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn cut_miss_returns_whole() {
        let halves = unit_square().cut(Point::new(5.0, 0.0), Point::new(5.0, 1.0), 0.0);
        assert_eq!(halves.len(), 1);
        assert_eq!(halves[0].len(), 4);
    }

    #[test]
    fn cut_with_gap_loses_area() {
        let halves = unit_square().cut(Point::new(0.5, -1.0), Point::new(0.5, 2.0), 0.2);
        assert_eq!(halves.len(), 2);
        let total: f64 = halves.iter().map(|h| h.area().abs()).sum();
        assert!(total < 0.85);
    }

    #[test]
    fn shrink_eq_reduces_area() {
        let shrunk = unit_square().shrink_eq(0.1);
        let a = shrunk.area().abs();
        assert!(a > 0.5 && a < 1.0);
    }

    #[test]
    fn obb_of_square_has_unit_area() {
        let obb = unit_square().obb().unwrap();
        let r = Ring::new(obb.to_vec());
        assert!((r.area().abs() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn obb_aligns_with_rotated_rect() {
        let mut rect = Ring::rect(4.0, 1.0);
        rect.rotate(0.7);
        let obb = rect.obb().unwrap();
        let r = Ring::new(obb.to_vec());
        assert!((r.area().abs() - 4.0).abs() < 1e-6);
    }

    #[test]
    fn smooth_preserves_vertex_count() {
        let smoothed = unit_square().smooth(&[], 2);
        assert_eq!(smoothed.len(), 4);
    }

    #[test]
    fn smooth_keeps_fixed_points() {
        let fixed = vec![Point::new(0.0, 0.0)];
        let smoothed = unit_square().smooth(&fixed, 3);
        assert!(smoothed.point(0).approx_eq(&Point::new(0.0, 0.0)));
    }

    #[test]
    fn chaikin_doubles_free_corners() {
        let out = unit_square().chaikin(true, 1, &[]);
        assert_eq!(out.len(), 8);
    }

    #[test]
    fn simplify_reduces_to_n() {
        let mut r = Ring::regular(8, 5.0);
        r.simplify(4);
        assert_eq!(r.len(), 4);
    }

    #[test]
    fn smooth_open_keeps_endpoints() {
        let path = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 3.0),
            Point::new(2.0, 0.0),
        ];
        let out = smooth_open(&path, 2);
        assert!(out[0].approx_eq(&path[0]));
        assert!(out[2].approx_eq(&path[2]));
        assert!(out[1].y < 3.0);
    }

    #[test]
    fn stripe_encloses_the_line() {
        let line = vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)];
        let s = stripe(&line, 2.0, 0.0);
        assert!(s.contains(Point::new(5.0, 0.0)));
        assert!(s.contains(Point::new(5.0, 0.9)));
        assert!(!s.contains(Point::new(5.0, 1.5)));
    }

    #[test]
    fn fill_area_points_are_inside() {
        let mut rng = crate::random::Rng::new(11);
        let big = Ring::rect(20.0, 20.0);
        let pts = fill_area(&big, 1.0, 3.0, &mut rng);
        assert!(!pts.is_empty());
        for p in pts {
            assert!(big.contains(p));
        }
    }

    #[test]
    fn distance_to_segment_basics() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(10.0, 0.0);
        assert!((distance_to_segment(Point::new(5.0, 3.0), a, b) - 3.0).abs() < 1e-9);
        assert!((distance_to_segment(Point::new(-4.0, 0.0), a, b) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn buffer_outward_grows_area() {
        let grown = unit_square().buffer_eq(-0.2);
        assert!(grown.area().abs() > 1.0);
    }
}
