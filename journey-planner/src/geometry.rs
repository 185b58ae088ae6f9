use geo::{BoundingRect, LineString};
use serde::Serialize;

use journey_model::LatLng;

/// The screen-space direction from `a` to `b` in degrees, with longitude as x and latitude as y,
/// so 0 points east and 90 points north. Callers must not pass `a == b`.
pub fn bearing_degrees(a: LatLng, b: LatLng) -> f64 {
    let dy = b.lat - a.lat;
    let dx = b.lng - a.lng;
    dy.atan2(dx).to_degrees()
}

pub fn midpoint(a: LatLng, b: LatLng) -> LatLng {
    LatLng::new((a.lat + b.lat) / 2.0, (a.lng + b.lng) / 2.0)
}

#[derive(Serialize, Clone, Copy, PartialEq, Debug)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn from_points(pts: &[LatLng]) -> Option<Bounds> {
        let line: LineString = pts.iter().map(|pt| geo::Coord::from(*pt)).collect();
        let rect = line.bounding_rect()?;
        Some(Bounds {
            south: rect.min().y,
            west: rect.min().x,
            north: rect.max().y,
            east: rect.max().x,
        })
    }
}
