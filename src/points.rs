//! Shared-vertex arena.
//!
//! Every vertex that participates in the town topology lives in one
//! `PointStore`; polygons hold `PointId`s rather than coordinates, so moving
//! a junction once moves it in every cell, wall and street that touches it.
//!
//! Two kinds of equality exist and must not be conflated:
//! * identity: `PointId == PointId`, the topological relation;
//! * value: `Point::approx_eq`, a coordinate comparison.

use crate::constants::COORD_EPSILON;
use serde::Serialize;
use std::fmt;
use std::ops::{Add, Mul, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Point { x, y }
    }

    pub fn approx_eq(&self, other: &Point) -> bool {
        (self.x - other.x).abs() < COORD_EPSILON && (self.y - other.y).abs() < COORD_EPSILON
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn distance(a: Point, b: Point) -> f64 {
        (b - a).length()
    }

    pub fn midpoint(a: Point, b: Point) -> Point {
        Point::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0)
    }

    /// Scale to the given length; the zero vector is left unchanged.
    pub fn norm(&self, len: f64) -> Point {
        let l = self.length();
        if l > 0.0 {
            Point::new(self.x / l * len, self.y / l * len)
        } else {
            *self
        }
    }

    /// Rotate 90 degrees counterclockwise.
    pub fn rotate90(&self) -> Point {
        Point::new(-self.y, self.x)
    }

    pub fn dot(&self, other: Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn cross(&self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn atan(&self) -> f64 {
        self.y.atan2(self.x)
    }

    pub fn scale(&self, f: f64) -> Point {
        Point::new(self.x * f, self.y * f)
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, o: Point) -> Point {
        Point::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, o: Point) -> Point {
        Point::new(self.x - o.x, self.y - o.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, f: f64) -> Point {
        Point::new(self.x * f, self.y * f)
    }
}

/// Stable handle into the [`PointStore`] arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PointId(pub u32);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "PointId({})", self.0)
    }
}

/// Arena of shared vertices. Owned by the `City` for the whole build; points
/// are never freed individually.
#[derive(Clone, Debug, Default)]
pub struct PointStore {
    points: Vec<Point>,
}

impl PointStore {
    pub fn new() -> Self {
        PointStore { points: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn insert(&mut self, p: Point) -> PointId {
        let id = PointId(self.points.len() as u32);
        self.points.push(p);
        id
    }

    #[inline]
    pub fn get(&self, id: PointId) -> Point {
        self.points[id.0 as usize]
    }

    #[inline]
    pub fn set(&mut self, id: PointId, p: Point) {
        self.points[id.0 as usize] = p;
    }

    /// Move a shared vertex; visible through every polygon holding `id`.
    pub fn translate(&mut self, id: PointId, dx: f64, dy: f64) {
        let p = &mut self.points[id.0 as usize];
        p.x += dx;
        p.y += dy;
    }

    pub fn iter(&self) -> impl Iterator<Item = (PointId, Point)> + '_ {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (PointId(i as u32), *p))
    }
}
