//! Spherical geodesy: coordinates in decimal degrees, haversine distance on a planet of given radius.

use serde::{Deserialize, Serialize};

pub const DEGREES_TO_RADIANS: f64 = std::f64::consts::PI / 180.0;
pub const EARTH_RADIUS_M: f64 = 6378e3;
pub const EARTH: Planet = Planet {
    radius: EARTH_RADIUS_M,
};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Planet {
    /// Meters.
    pub radius: f64,
}

impl Planet {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    pub fn great_circle_distance(&self, a: Coordinates, b: Coordinates) -> f64 {
        great_circle_distance(a, b, self.radius)
    }

    pub fn circumference(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.radius
    }

    /// Surface area (m²) covered by one square degree centered at `latitude`.
    pub fn square_degree_area(&self, latitude: f64) -> f64 {
        self.radius * self.radius * (latitude * DEGREES_TO_RADIANS).cos() * DEGREES_TO_RADIANS.powi(2)
    }
}

/// Haversine distance in the units of `radius`.
pub fn great_circle_distance(a: Coordinates, b: Coordinates, radius: f64) -> f64 {
    let lat_a = a.latitude * DEGREES_TO_RADIANS;
    let lat_b = b.latitude * DEGREES_TO_RADIANS;
    let delta_lat = lat_b - lat_a;
    let delta_lon = (b.longitude - a.longitude) * DEGREES_TO_RADIANS;

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat_a.cos() * lat_b.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push h a hair above 1 for antipodal points.
    let central_angle = 2.0 * h.sqrt().min(1.0).asin();
    radius * central_angle
}

/// Inclusive latitude/longitude window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn contains(&self, point: Coordinates) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&point.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&point.longitude)
    }
}
