//! Minimal SVG rendering of a [`TownPlan`].
//!
//! One layer per feature class, painted back to front: water, farmland,
//! parks, streets, buildings, walls. The output is a plain standalone SVG
//! document string; file IO belongs to the caller.

use crate::plan::TownPlan;
use crate::points::Point;
use std::fmt::Write;

const WATER: &str = "#7fa8c4";
const FIELD: &str = "#d8cfa2";
const GREEN: &str = "#a8c48a";
const ROAD: &str = "#c9b89a";
const BUILDING: &str = "#7a6a58";
const WALL: &str = "#4a4440";

pub fn render(plan: &TownPlan) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" viewBox=\"0 0 {:.0} {:.0}\">\n",
        plan.width, plan.height
    );
    let _ = writeln!(out, "<rect width=\"100%\" height=\"100%\" fill=\"#e8e0cf\"/>");

    if !plan.water.is_empty() {
        polygon(&mut out, &plan.water, WATER, None);
    }
    for canal in &plan.canals {
        polygon(&mut out, canal.water.pts(), WATER, None);
    }

    for ward in &plan.wards {
        for field in &ward.fields {
            let fill = if ward.kind == "park" { GREEN } else { FIELD };
            polygon(&mut out, field.pts(), fill, None);
        }
        for (a, b) in &ward.furrows {
            line(&mut out, *a, *b, "#c3b98e", 0.3);
        }
    }

    for road in plan.roads.iter().chain(plan.streets.iter()) {
        polyline(&mut out, road, ROAD, 2.0);
    }
    for artery in &plan.arteries {
        polyline(&mut out, artery, ROAD, 4.0);
    }
    for canal in &plan.canals {
        for bridge in &canal.bridges {
            circle(&mut out, *bridge, canal.width / 2.0 + 1.0, ROAD);
        }
    }

    for ward in &plan.wards {
        for building in &ward.buildings {
            polygon(&mut out, building.pts(), BUILDING, Some("#4f4436"));
        }
        for path in &ward.paths {
            polyline(&mut out, path, "#cfc3a4", 0.8);
        }
        for tree in &ward.trees {
            circle(&mut out, *tree, 0.9, "#6e8f54");
        }
    }

    for wall in &plan.walls {
        let n = wall.shape.len();
        for i in 0..n {
            if wall.segments[i] {
                line(&mut out, wall.shape[i], wall.shape[(i + 1) % n], WALL, 1.5);
            }
        }
        for tower in &wall.towers {
            circle(&mut out, *tower, 1.9, WALL);
        }
        for gate in &wall.gates {
            circle(&mut out, *gate, 1.2, "#8a7f72");
        }
    }

    out.push_str("</svg>\n");
    out
}

fn path_data(pts: &[Point]) -> String {
    let mut d = String::new();
    for (i, p) in pts.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{}{:.2} {:.2} ", cmd, p.x, p.y);
    }
    d
}

fn polygon(out: &mut String, pts: &[Point], fill: &str, stroke: Option<&str>) {
    if pts.len() < 3 {
        return;
    }
    let stroke_attr = match stroke {
        Some(s) => format!(" stroke=\"{}\" stroke-width=\"0.3\"", s),
        None => String::new(),
    };
    let _ = writeln!(
        out,
        "<path d=\"{}Z\" fill=\"{}\"{}/>",
        path_data(pts),
        fill,
        stroke_attr
    );
}

fn polyline(out: &mut String, pts: &[Point], stroke: &str, width: f64) {
    if pts.len() < 2 {
        return;
    }
    let _ = writeln!(
        out,
        "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linecap=\"round\"/>",
        path_data(pts),
        stroke,
        width
    );
}

fn line(out: &mut String, a: Point, b: Point, stroke: &str, width: f64) {
    let _ = writeln!(
        out,
        "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{}\"/>",
        a.x, a.y, b.x, b.y, stroke, width
    );
}

fn circle(out: &mut String, c: Point, r: f64, fill: &str) {
    let _ = writeln!(
        out,
        "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\"/>",
        c.x, c.y, r, fill
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::city::{City, CoastMode};

    #[test]
    fn renders_a_well_formed_document() {
        let mut city = City::new(15, 3, CoastMode::Forbid).unwrap();
        city.build().unwrap();
        let plan = TownPlan::from_city(&city);
        let svg = render(&plan);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("<path"));
    }
}
