//! Ward kinds and their special geometry.
//!
//! Alleys/slum/harbour housing goes through the ward-group block engine; the
//! builders here produce everything else a ward renders: the castle keep,
//! the cathedral cross, the market centerpiece, harbour piers, farm fields
//! with cottages, and park greens.

use crate::city::building;
use crate::constants::WALL_THICKNESS;
use crate::geometry::{self, lerp, Ring};
use crate::points::Point;
use crate::random::Rng;
use serde::Serialize;

/// Smallest farm field that still splits.
const MIN_SUBPLOT: f64 = 80.0;
/// Furrow spacing and corner-rounding offset on farm fields.
const MIN_FURROW: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum WardKind {
    Castle,
    Market,
    Cathedral,
    Park,
    Harbour,
    Alleys,
    Farm,
    Slum,
}

impl WardKind {
    pub fn name(self) -> &'static str {
        match self {
            WardKind::Castle => "castle",
            WardKind::Market => "market",
            WardKind::Cathedral => "cathedral",
            WardKind::Park => "park",
            WardKind::Harbour => "harbour",
            WardKind::Alleys => "alleys",
            WardKind::Farm => "farm",
            WardKind::Slum => "slum",
        }
    }

    /// Kinds whose housing is produced by the shared block engine.
    pub fn grouped(self) -> bool {
        matches!(self, WardKind::Alleys | WardKind::Slum | WardKind::Harbour)
    }
}

/// One ward: a functional classification attached to exactly one cell, plus
/// the geometry it contributes to the plan.
#[derive(Clone, Debug, Default)]
pub struct Ward {
    pub kind: Option<WardKind>,
    pub geometry: Vec<Ring>,
    /// Farm subplots or the park green.
    pub fields: Vec<Ring>,
    pub furrows: Vec<(Point, Point)>,
    pub paths: Vec<Vec<Point>>,
    pub trees: Vec<Point>,
}

/// The castle keep: the citadel patch shrunk past the wall, with a grown
/// footprint inside. Falls back to a plain rectangle on degenerate shapes.
pub fn castle_keep(shape: &Ring, rng: &mut Rng) -> Vec<Ring> {
    let mut outline = shape.shrink_eq(WALL_THICKNESS + 2.0);
    if outline.len() < 3 || outline.area().abs() < 1.0 {
        let center = shape.centroid();
        let radius = (shape.area().abs() / std::f64::consts::PI).sqrt() * 0.4;
        outline = Ring::rect(radius * 1.5, radius * 1.2);
        outline.offset(center.x, center.y);
    }

    let threshold = shape.area().abs() / 25.0;
    if let Some(obb) = outline.obb() {
        let quad = Ring::new(obb.to_vec());
        if let Some(keep) = building::create(&quad, threshold, false, false, 0.4, rng) {
            return vec![keep];
        }
    }
    vec![outline]
}

/// Nave, transept, apse and tower laid out as a cross of rectangles.
pub fn cathedral(shape: &Ring) -> Vec<Ring> {
    let center = shape.centroid();
    let base = shape.area().abs().sqrt() * 0.4;
    let main_len = base * 1.5;
    let main_w = base * 0.6;
    let transept_len = base * 0.8;
    let transept_w = base * 0.4;

    let mut nave = Ring::rect(main_w, main_len);
    nave.offset(center.x, center.y);

    let mut transept = Ring::rect(transept_len, transept_w);
    transept.offset(center.x, center.y + main_len * 0.2);

    let mut apse = Ring::rect(main_w * 0.8, transept_w * 0.6);
    apse.offset(center.x, center.y + main_len * 0.5 + transept_w * 0.3);

    let tower_size = main_w * 0.5;
    let mut tower = Ring::rect(tower_size, tower_size);
    tower.offset(center.x, center.y - main_len * 0.4);

    vec![nave, transept, apse, tower]
}

/// Market centerpiece: a statue (rotated to the longest plaza edge) or a
/// fountain, optionally offset toward that edge.
pub fn market(shape: &Ring, rng: &mut Rng) -> Vec<Ring> {
    let statue = rng.bool(0.6);
    let offset = statue || rng.bool(0.3);

    let longest = shape.longest_edge();
    let v0 = shape.point(longest);
    let v1 = shape.point((longest + 1) % shape.len());

    let mut object = if statue {
        let mut rect = Ring::rect(1.0 + rng.float(), 1.0 + rng.float());
        rect.rotate((v1.y - v0.y).atan2(v1.x - v0.x));
        rect
    } else {
        Ring::circle(1.0 + rng.float())
    };

    let centroid = shape.centroid();
    let pos = if offset {
        let gravity = Point::midpoint(v0, v1);
        let t = 0.2 + rng.float() * 0.4;
        lerp(centroid, gravity, t)
    } else {
        centroid
    };
    object.offset(pos.x, pos.y);
    vec![object]
}

/// Piers jutting into the water from the coast edges of a harbour cell.
pub fn harbour_piers(coast_edges: &[(Point, Point)], rng: &mut Rng) -> Vec<Ring> {
    let longest = coast_edges
        .iter()
        .enumerate()
        .max_by(|a, b| {
            let la = Point::distance(a.1 .0, a.1 .1);
            let lb = Point::distance(b.1 .0, b.1 .1);
            la.partial_cmp(&lb).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i);

    let mut piers = Vec::new();
    for (idx, &(a, b)) in coast_edges.iter().enumerate() {
        let edge_len = Point::distance(a, b);
        let density = if Some(idx) == longest { 4.0 } else { 6.0 };
        let count = ((edge_len / density) as usize).clamp(1, 5);

        let dir = (b - a).norm(1.0);
        let into_water = dir.rotate90() * -1.0;
        let spacing = edge_len / (count + 1) as f64;

        for p in 1..=count {
            let base = lerp(a, b, p as f64 * spacing / edge_len);
            let w = 1.0 + rng.float();
            let l = 3.0 + rng.float() * 5.0;
            let half = dir * (w / 2.0);
            piers.push(Ring::new(vec![
                base - half,
                base + half,
                base + half + into_water * l,
                base - half + into_water * l,
            ]));
        }
    }
    piers
}

/// Farm output: fields, furrow lines and the occasional cottage.
pub struct FarmGeometry {
    pub fields: Vec<Ring>,
    pub furrows: Vec<(Point, Point)>,
    pub cottages: Vec<Ring>,
}

pub fn farm(available: &Ring, rng: &mut Rng) -> FarmGeometry {
    let mut fields = Vec::new();
    split_field(available, rng, &mut fields);

    let mut out = FarmGeometry {
        fields: Vec::new(),
        furrows: Vec::new(),
        cottages: Vec::new(),
    };

    for field in fields {
        let rounded = round_corners(&field);
        if rounded.len() < 3 {
            continue;
        }

        // Furrows run across the field, following its long axis.
        if let Some(obb) = rounded.obb() {
            let len01 = Point::distance(obb[0], obb[1]);
            let count = (len01 / MIN_FURROW).ceil() as usize;
            for f in 0..count {
                let t = (f as f64 + 0.5) / count as f64;
                let start = lerp(obb[0], obb[1], t);
                let end = lerp(obb[3], obb[2], t);
                if Point::distance(start, end) > MIN_FURROW {
                    out.furrows.push((start, end));
                }
            }
        }

        if rng.bool(0.2) {
            if let Some(house) = cottage(&rounded, rng) {
                out.cottages.push(house);
            }
        }
        out.fields.push(rounded);
    }
    out
}

/// Recursively split a field along the long axis of its OBB, leaving a
/// 2-unit path between the halves.
fn split_field(field: &Ring, rng: &mut Rng, out: &mut Vec<Ring>) {
    let area = field.area().abs();
    let threshold = MIN_SUBPLOT * (1.0 + rng.normal4().abs());
    if area < threshold || field.len() < 3 {
        out.push(field.clone());
        return;
    }

    let Some(obb) = field.obb() else {
        out.push(field.clone());
        return;
    };
    let len01 = Point::distance(obb[0], obb[1]);
    let len12 = Point::distance(obb[1], obb[2]);
    let long_axis = if len01 > len12 { 0 } else { 1 };

    let cut_ratio = 0.5 + 0.2 * (2.0 * rng.normal3() - 1.0);
    let mut perpendicular = (obb[(long_axis + 1) % 4] - obb[long_axis]).rotate90();
    if rng.bool(0.5) {
        let angle = std::f64::consts::FRAC_PI_8 * (2.0 * rng.normal3() - 1.0);
        let (sin, cos) = angle.sin_cos();
        perpendicular = Point::new(
            perpendicular.x * cos - perpendicular.y * sin,
            perpendicular.x * sin + perpendicular.y * cos,
        );
    }

    let axis = obb[(long_axis + 1) % 4] - obb[long_axis];
    let cut_point = obb[long_axis] + axis * cut_ratio;
    let halves = field.cut(cut_point, cut_point + perpendicular, 2.0);
    if halves.len() < 2 {
        out.push(field.clone());
        return;
    }
    for half in halves {
        split_field(&half, rng, out);
    }
}

/// Clip sharp field corners: short edges collapse to their midpoint, long
/// edges get a point set in from each end.
fn round_corners(field: &Ring) -> Ring {
    let mut pts = Vec::with_capacity(field.len() * 2);
    for (curr, next) in field.edges() {
        let dist = Point::distance(curr, next);
        if dist < 2.0 * MIN_FURROW {
            pts.push(Point::midpoint(curr, next));
        } else {
            let t = MIN_FURROW / dist;
            pts.push(lerp(curr, next, t));
            pts.push(lerp(next, curr, t));
        }
    }
    Ring::new(pts)
}

/// A farmhouse on the longest edge of a field: rectangle, L, T or U.
fn cottage(field: &Ring, rng: &mut Rng) -> Option<Ring> {
    if field.len() < 3 {
        return None;
    }
    let width = 4.0 + rng.float() * 3.0;
    let height = 2.5 + rng.float() * 2.0;

    let longest = field.longest_edge();
    let start = field.point(longest);
    let end = field.point((longest + 1) % field.len());
    let edge_len = Point::distance(start, end);
    if edge_len < 0.01 {
        return None;
    }
    let dir = (end - start) * (1.0 / edge_len);
    let mut pos = if rng.bool(0.5) {
        start + dir * (width / 2.0 + 1.0)
    } else {
        end - dir * (width / 2.0 + 1.0)
    };
    let perp = dir.rotate90();
    pos = pos + perp * (height / 2.0 + 0.5);

    Some(cottage_shape(pos, dir, perp, width, height, rng))
}

fn cottage_shape(
    pos: Point,
    dir: Point,
    perp: Point,
    w: f64,
    h: f64,
    rng: &mut Rng,
) -> Ring {
    let at = |dx: f64, dy: f64| pos + dir * dx + perp * dy;
    let choice = rng.float();
    let pts = if choice < 0.4 {
        vec![
            at(-w / 2.0, -h / 2.0),
            at(w / 2.0, -h / 2.0),
            at(w / 2.0, h / 2.0),
            at(-w / 2.0, h / 2.0),
        ]
    } else if choice < 0.7 {
        // L: one corner cut away.
        let cw = w * (0.3 + rng.float() * 0.3);
        let ch = h * (0.3 + rng.float() * 0.3);
        vec![
            at(-w / 2.0, -h / 2.0),
            at(w / 2.0, -h / 2.0),
            at(w / 2.0, h / 2.0 - ch),
            at(w / 2.0 - cw, h / 2.0 - ch),
            at(w / 2.0 - cw, h / 2.0),
            at(-w / 2.0, h / 2.0),
        ]
    } else if choice < 0.85 {
        // T: a stem off the long side.
        let sw = w * 0.4;
        let sh = h * 0.4;
        vec![
            at(-w / 2.0, -h / 2.0),
            at(w / 2.0, -h / 2.0),
            at(w / 2.0, -h / 2.0 + sh),
            at(sw / 2.0, -h / 2.0 + sh),
            at(sw / 2.0, h / 2.0),
            at(-sw / 2.0, h / 2.0),
            at(-sw / 2.0, -h / 2.0 + sh),
            at(-w / 2.0, -h / 2.0 + sh),
        ]
    } else {
        // U: a notch in the long side.
        let gw = w * 0.3;
        let gh = h * 0.5;
        vec![
            at(-w / 2.0, -h / 2.0),
            at(w / 2.0, -h / 2.0),
            at(w / 2.0, h / 2.0),
            at(w / 2.0 - gw, h / 2.0),
            at(w / 2.0 - gw, -h / 2.0 + gh),
            at(-w / 2.0 + gw, -h / 2.0 + gh),
            at(-w / 2.0 + gw, h / 2.0),
            at(-w / 2.0, h / 2.0),
        ]
    };
    Ring::new(pts)
}

/// Park output: the wavy green, internal paths, features and trees.
pub struct ParkGeometry {
    pub green: Ring,
    pub paths: Vec<Vec<Point>>,
    pub features: Vec<Ring>,
    pub trees: Vec<Point>,
}

pub fn park(available: &Ring, rng: &mut Rng) -> ParkGeometry {
    // Double every edge with its midpoint, then corner-cut three times for
    // the soft boundary.
    let mut doubled = Vec::with_capacity(available.len() * 2);
    for (v0, v1) in available.edges() {
        doubled.push(v0);
        doubled.push(Point::midpoint(v0, v1));
    }
    let green = Ring::new(doubled).chaikin(true, 3, &[]);

    let center = green.centroid();
    let area = green.area().abs();
    let radius = (area / std::f64::consts::PI).sqrt();

    // A few curved paths from the edge toward the center.
    let mut paths = Vec::new();
    let n_paths = 1 + (rng.float() * 2.0) as usize;
    let len = green.len();
    for _ in 0..n_paths.min(len) {
        let edge = rng.index(len);
        let v0 = green.point(edge);
        let v1 = green.point((edge + 1) % len);
        let edge_mid = lerp(v0, v1, 0.3 + 0.4 * rng.float());
        let path_end = lerp(edge_mid, center, 0.4 + 0.3 * rng.float());

        let to_center = center - edge_mid;
        let perp = if to_center.length() > 0.01 {
            to_center.rotate90() * (1.0 / to_center.length())
        } else {
            Point::new(0.0, 1.0)
        };

        let mut path = vec![edge_mid];
        let steps = 2 + (rng.float() * 2.0) as usize;
        for j in 1..=steps {
            let t = j as f64 / (steps + 1) as f64;
            let base = lerp(edge_mid, path_end, t);
            let bow = (t * std::f64::consts::PI).sin() * radius * 0.1 * (rng.float() - 0.5);
            path.push(base + perp * bow);
        }
        path.push(path_end);
        paths.push(path);
    }

    // Central pavilion sometimes; a bench or two near the paths.
    let mut features = Vec::new();
    let base_size = area.sqrt() * 0.05;
    if rng.bool(0.5) {
        let size = base_size * (0.8 + 0.4 * rng.float());
        let sides = if rng.bool(0.5) { 6 } else { 8 };
        let mut pavilion = Ring::regular(sides, size);
        pavilion.offset(center.x, center.y);
        features.push(pavilion);
    }
    if rng.bool(0.3) {
        for path in paths.iter().take(4) {
            if path.len() < 2 {
                continue;
            }
            let mid = path.len() / 2;
            let at = path[mid];
            let dir = if mid + 1 < path.len() {
                (path[mid + 1] - at).norm(1.0)
            } else {
                Point::new(1.0, 0.0)
            };
            let perp = dir.rotate90();
            let bench_pos = at + perp;
            let bench_len = 0.8 + rng.float() * 0.4;
            features.push(Ring::new(vec![
                bench_pos - dir * (bench_len / 2.0) - perp * 0.15,
                bench_pos + dir * (bench_len / 2.0) - perp * 0.15,
                bench_pos + dir * (bench_len / 2.0) + perp * 0.15,
                bench_pos - dir * (bench_len / 2.0) + perp * 0.15,
            ]));
        }
    }

    let greenery = rng.normal3();
    let trees = geometry::fill_area(&green, greenery, 3.0, rng);

    ParkGeometry {
        green,
        paths,
        features,
        trees,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patch() -> Ring {
        let mut r = Ring::rect(40.0, 36.0);
        r.offset(20.0, 18.0);
        r
    }

    #[test]
    fn castle_keep_fits_the_patch() {
        let mut rng = Rng::new(12);
        let shape = patch();
        let keep = castle_keep(&shape, &mut rng);
        assert!(!keep.is_empty());
        for part in &keep {
            assert!(shape.contains(part.centroid()));
        }
    }

    #[test]
    fn cathedral_is_four_parts() {
        let parts = cathedral(&patch());
        assert_eq!(parts.len(), 4);
        for p in parts {
            assert!(p.area().abs() > 0.0);
        }
    }

    #[test]
    fn market_produces_one_centerpiece() {
        let mut rng = Rng::new(5);
        let parts = market(&patch(), &mut rng);
        assert_eq!(parts.len(), 1);
        assert!(patch().contains(parts[0].centroid()));
    }

    #[test]
    fn piers_extend_from_coast_edges() {
        let mut rng = Rng::new(7);
        let edges = vec![(Point::new(0.0, 0.0), Point::new(30.0, 0.0))];
        let piers = harbour_piers(&edges, &mut rng);
        assert!(!piers.is_empty() && piers.len() <= 5);
        for pier in &piers {
            assert_eq!(pier.len(), 4);
        }
    }

    #[test]
    fn farm_fields_cover_subplots() {
        let mut rng = Rng::new(19);
        let farm_geo = farm(&patch(), &mut rng);
        assert!(!farm_geo.fields.is_empty());
        assert!(!farm_geo.furrows.is_empty());
    }

    #[test]
    fn farm_splitting_respects_threshold() {
        let mut rng = Rng::new(19);
        let farm_geo = farm(&patch(), &mut rng);
        // No field should remain much larger than the split threshold cap.
        for f in &farm_geo.fields {
            assert!(f.area().abs() < MIN_SUBPLOT * 2.5);
        }
    }

    #[test]
    fn cottage_shapes_are_closed_polys() {
        let mut rng = Rng::new(3);
        for _ in 0..20 {
            let shape = cottage_shape(
                Point::new(5.0, 5.0),
                Point::new(1.0, 0.0),
                Point::new(0.0, 1.0),
                5.0,
                3.0,
                &mut rng,
            );
            assert!(shape.len() >= 4);
            assert!(shape.area().abs() > 1.0);
        }
    }

    #[test]
    fn park_green_is_smooth_and_inside_bounds() {
        let mut rng = Rng::new(25);
        let p = park(&patch(), &mut rng);
        assert!(p.green.len() > patch().len());
        assert!(p.green.area().abs() > 0.0);
        assert!(!p.paths.is_empty());
    }

    #[test]
    fn park_trees_inside_green() {
        let mut rng = Rng::new(41);
        let p = park(&patch(), &mut rng);
        for t in &p.trees {
            assert!(p.green.contains(*t));
        }
    }
}
