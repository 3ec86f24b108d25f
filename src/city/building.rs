//! Building footprints.
//!
//! A lot rectangle is subdivided into a jittered grid; a connected subset of
//! grid cells is grown and its outline becomes the footprint. Depending on
//! the plan the growth is free (L/T/U shapes), anchored to the front row, or
//! mirrored for symmetry.

use crate::geometry::{lerp, Ring};
use crate::points::Point;
use crate::random::Rng;

const MAX_GRID: usize = 8;
const MAX_GROW_STEPS: usize = 10_000;

/// Free growth: seed a random cell, accrete random neighbors until the
/// region touches all four grid edges, then keep going with probability
/// `stop_prob` per step.
pub fn plan(width: usize, height: usize, stop_prob: f64, rng: &mut Rng) -> Vec<bool> {
    let total = width * height;
    let mut cells = vec![false; total];

    let sx = (rng.float() * width as f64) as usize;
    let sy = (rng.float() * height as f64) as usize;
    cells[sx + sy * width] = true;
    let mut remaining = total - 1;
    let (mut min_x, mut max_x, mut min_y, mut max_y) = (sx, sx, sy, sy);

    for _ in 0..MAX_GROW_STEPS {
        let x = (rng.float() * width as f64) as usize;
        let y = (rng.float() * height as f64) as usize;
        let idx = x + y * width;
        if !cells[idx] {
            let adjacent = (x > 0 && cells[idx - 1])
                || (y > 0 && cells[idx - width])
                || (x < width - 1 && cells[idx + 1])
                || (y < height - 1 && cells[idx + width]);
            if adjacent {
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
                cells[idx] = true;
                remaining -= 1;
            }
        }

        let spanning = min_x == 0 && max_x == width - 1 && min_y == 0 && max_y == height - 1;
        let keep_going = if !spanning {
            true
        } else if remaining > 0 {
            rng.float() < stop_prob
        } else {
            false
        };
        if !keep_going {
            break;
        }
    }
    cells
}

/// Front-anchored growth: the whole front row is filled, growth continues
/// until the back row is reached, then each step continues at 50 %.
pub fn plan_front(width: usize, height: usize, rng: &mut Rng) -> Vec<bool> {
    let total = width * height;
    let mut cells = vec![false; total];
    for x in 0..width {
        cells[x] = true;
    }
    let mut remaining = total - width;
    let mut max_y = 0usize;

    for _ in 0..MAX_GROW_STEPS {
        let x = (rng.float() * width as f64) as usize;
        let y = 1 + (rng.float() * (height - 1) as f64) as usize;
        let idx = x + y * width;
        if !cells[idx] {
            let adjacent = (x > 0 && cells[idx - 1])
                || cells[idx - width]
                || (x < width - 1 && cells[idx + 1])
                || (y < height - 1 && cells[idx + width]);
            if adjacent {
                max_y = max_y.max(y);
                cells[idx] = true;
                remaining -= 1;
            }
        }

        let keep_going = if max_y < height - 1 {
            true
        } else if remaining > 0 {
            rng.float() < 0.5
        } else {
            false
        };
        if !keep_going {
            break;
        }
    }
    cells
}

/// Free growth mirrored left-right.
pub fn plan_symmetric(width: usize, height: usize, rng: &mut Rng) -> Vec<bool> {
    let mut cells = plan(width, height, 0.0, rng);
    for y in 0..height {
        for x in 0..width {
            let a = y * width + x;
            let b = (y + 1) * width - 1 - x;
            let merged = cells[a] || cells[b];
            cells[a] = merged;
            cells[b] = merged;
        }
    }
    cells
}

/// Collapse a set of grid-cell quads into one outline by cancelling every
/// directed edge against its reverse, chaining the survivors and dropping
/// collinear vertices.
pub fn circumference(quads: &[Ring]) -> Vec<Point> {
    if quads.is_empty() {
        return Vec::new();
    }
    if quads.len() == 1 {
        return quads[0].pts().to_vec();
    }

    let mut starts: Vec<Point> = Vec::new();
    let mut ends: Vec<Point> = Vec::new();
    for quad in quads {
        for (p, q) in quad.edges() {
            // An interior edge shows up once in each direction; cancel it.
            if let Some(j) = starts
                .iter()
                .zip(&ends)
                .position(|(s, e)| s.approx_eq(&q) && e.approx_eq(&p))
            {
                starts.remove(j);
                ends.remove(j);
            } else {
                starts.push(p);
                ends.push(q);
            }
        }
    }
    if starts.is_empty() {
        return Vec::new();
    }

    let mut result = vec![starts[0]];
    let mut next = ends[0];
    starts.remove(0);
    ends.remove(0);
    let mut guard = starts.len() + 1;
    while guard > 0 {
        guard -= 1;
        if next.approx_eq(&result[0]) {
            break;
        }
        result.push(next);
        match starts.iter().position(|s| s.approx_eq(&next)) {
            Some(i) => {
                next = ends[i];
                starts.remove(i);
                ends.remove(i);
            }
            None => break,
        }
    }

    // Drop collinear vertices.
    let n = result.len();
    let mut simplified = Vec::with_capacity(n);
    for i in 0..n {
        let prev = result[(i + n - 1) % n];
        let curr = result[i];
        let next = result[(i + 1) % n];
        let d1 = curr - prev;
        let d2 = next - curr;
        let l1 = d1.length();
        let l2 = d2.length();
        if l1 < 1e-6 || l2 < 1e-6 {
            continue;
        }
        if d1.dot(d2) / (l1 * l2) < 0.999 {
            simplified.push(curr);
        }
    }
    if simplified.len() >= 3 {
        simplified
    } else {
        result
    }
}

/// Grow a building footprint inside a quadrilateral lot. `threshold` is the
/// target area of one grid cell; `gap` jitters the interior grid lines.
/// Returns `None` when the lot is too small for a grid or the growth filled
/// everything (no interesting outline).
pub fn create(
    quad: &Ring,
    threshold: f64,
    has_front: bool,
    symmetric: bool,
    gap: f64,
    rng: &mut Rng,
) -> Option<Ring> {
    if quad.len() != 4 {
        return None;
    }
    let cell_size = threshold.sqrt();
    let p0 = quad.point(0);
    let p1 = quad.point(1);
    let p2 = quad.point(2);
    let p3 = quad.point(3);

    let len01 = Point::distance(p0, p1);
    let len12 = Point::distance(p1, p2);
    let len23 = Point::distance(p2, p3);
    let len30 = Point::distance(p3, p0);

    let cols = ((len01.min(len23) / cell_size).ceil() as usize).min(MAX_GRID);
    let rows = ((len12.min(len30) / cell_size).ceil() as usize).min(MAX_GRID);
    if cols <= 1 || rows <= 1 {
        return None;
    }

    let plan_cells = if symmetric {
        plan_symmetric(cols, rows, rng)
    } else if has_front {
        plan_front(cols, rows, rng)
    } else {
        plan(cols, rows, 0.5, rng)
    };

    let filled = plan_cells.iter().filter(|&&b| b).count();
    if filled >= cols * rows {
        return None;
    }

    // Grid-line parameters with jittered interior positions.
    let mut col_params: Vec<f64> = (0..=cols).map(|c| c as f64 / cols as f64).collect();
    let mut row_params: Vec<f64> = (0..=rows).map(|r| r as f64 / rows as f64).collect();
    if gap > 0.0 {
        for c in col_params.iter_mut().take(cols).skip(1) {
            *c += (rng.normal3() - 0.5) / (cols - 1) as f64 * gap;
        }
        for r in row_params.iter_mut().take(rows).skip(1) {
            *r += (rng.normal3() - 0.5) / (rows - 1) as f64 * gap;
        }
    }

    let mut vertices = Vec::with_capacity(rows + 1);
    for r in 0..=rows {
        let left = lerp(p0, p3, row_params[r]);
        let right = lerp(p1, p2, row_params[r]);
        let row: Vec<Point> = (0..=cols).map(|c| lerp(left, right, col_params[c])).collect();
        vertices.push(row);
    }

    let mut quads = Vec::with_capacity(filled);
    for r in 0..rows {
        for c in 0..cols {
            if plan_cells[r * cols + c] {
                quads.push(Ring::new(vec![
                    vertices[r][c],
                    vertices[r][c + 1],
                    vertices[r + 1][c + 1],
                    vertices[r + 1][c],
                ]));
            }
        }
    }

    let outline = circumference(&quads);
    if outline.len() < 3 {
        return None;
    }
    Some(Ring::new(outline))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(cells: &[bool]) -> usize {
        cells.iter().filter(|&&b| b).count()
    }

    fn is_connected(cells: &[bool], width: usize, height: usize) -> bool {
        let start = match cells.iter().position(|&b| b) {
            Some(i) => i,
            None => return false,
        };
        let mut seen = vec![false; cells.len()];
        let mut queue = vec![start];
        seen[start] = true;
        while let Some(i) = queue.pop() {
            let x = i % width;
            let y = i / width;
            let mut push = |j: usize| {
                if cells[j] && !seen[j] {
                    seen[j] = true;
                    queue.push(j);
                }
            };
            if x > 0 {
                push(i - 1);
            }
            if x < width - 1 {
                push(i + 1);
            }
            if y > 0 {
                push(i - width);
            }
            if y < height - 1 {
                push(i + width);
            }
        }
        cells.iter().zip(&seen).all(|(&c, &s)| !c || s)
    }

    #[test]
    fn plan_is_connected() {
        let mut rng = Rng::new(13);
        for _ in 0..20 {
            let p = plan(4, 4, 0.5, &mut rng);
            assert!(is_connected(&p, 4, 4));
        }
    }

    #[test]
    fn plan_touches_all_edges() {
        let mut rng = Rng::new(29);
        let p = plan(4, 3, 0.0, &mut rng);
        let on = |x: usize, y: usize| p[x + y * 4];
        assert!((0..3).any(|y| on(0, y)));
        assert!((0..3).any(|y| on(3, y)));
        assert!((0..4).any(|x| on(x, 0)));
        assert!((0..4).any(|x| on(x, 2)));
    }

    #[test]
    fn plan_front_fills_front_row() {
        let mut rng = Rng::new(8);
        let p = plan_front(5, 4, &mut rng);
        for x in 0..5 {
            assert!(p[x]);
        }
    }

    #[test]
    fn plan_front_reaches_back_row() {
        let mut rng = Rng::new(8);
        let p = plan_front(5, 4, &mut rng);
        assert!((0..5).any(|x| p[x + 3 * 5]));
    }

    #[test]
    fn symmetric_plan_is_mirrored() {
        let mut rng = Rng::new(21);
        let p = plan_symmetric(6, 4, &mut rng);
        for y in 0..4 {
            for x in 0..6 {
                assert_eq!(p[y * 6 + x], p[(y + 1) * 6 - 1 - x]);
            }
        }
    }

    #[test]
    fn circumference_of_l_shape() {
        // Three unit cells in an L: (0,0), (1,0), (0,1).
        let cell = |x: f64, y: f64| {
            Ring::new(vec![
                Point::new(x, y),
                Point::new(x + 1.0, y),
                Point::new(x + 1.0, y + 1.0),
                Point::new(x, y + 1.0),
            ])
        };
        let outline = circumference(&[cell(0.0, 0.0), cell(1.0, 0.0), cell(0.0, 1.0)]);
        let ring = Ring::new(outline);
        assert!((ring.area().abs() - 3.0).abs() < 1e-6);
        assert_eq!(ring.len(), 6);
    }

    #[test]
    fn create_produces_footprint_inside_lot() {
        let mut rng = Rng::new(37);
        let mut lot = Ring::rect(12.0, 9.0);
        lot.offset(6.0, 4.5);
        let mut produced = 0;
        for _ in 0..10 {
            if let Some(b) = create(&lot, 9.0, true, false, 0.6, &mut rng) {
                produced += 1;
                assert!(b.len() >= 3);
                let c = b.centroid();
                assert!(lot.contains(c));
                assert!(b.area().abs() < lot.area().abs() + 1e-6);
            }
        }
        assert!(produced > 0);
    }

    #[test]
    fn create_rejects_tiny_lot() {
        let mut rng = Rng::new(1);
        let lot = Ring::rect(2.0, 2.0);
        assert!(create(&lot, 9.0, false, false, 0.6, &mut rng).is_none());
    }

    #[test]
    fn count_grows_with_stop_probability() {
        let mut rng_low = Rng::new(55);
        let mut rng_high = Rng::new(55);
        let low: usize = (0..30).map(|_| count(&plan(5, 5, 0.0, &mut rng_low))).sum();
        let high: usize = (0..30).map(|_| count(&plan(5, 5, 0.95, &mut rng_high))).sum();
        assert!(high > low);
    }
}
