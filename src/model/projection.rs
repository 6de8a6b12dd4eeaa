//! Projection seam between geographic endpoints and the projected metric
//! plane all internal geometry lives in.

use geo::Coord;

/// Pure conversion between geographic (lon, lat) and projected (x, y)
/// coordinates. All distance computation happens in the projected plane.
pub trait Projection: Send + Sync {
    fn project(&self, lon: f64, lat: f64) -> Coord<f64>;
    fn inverse(&self, x: f64, y: f64) -> (f64, f64);
}

/// Equirectangular local tangent plane centered on a reference coordinate.
///
/// `x = R * cos(lat0) * dlon`, `y = R * dlat`. Preserves local distances
/// well at district scale, which is all the snap and split math needs.
#[derive(Debug, Clone, Copy)]
pub struct LocalTangentPlane {
    origin_lon_rad: f64,
    origin_lat_rad: f64,
    cos_lat0: f64,
    radius: f64,
}

impl LocalTangentPlane {
    const EARTH_RADIUS: f64 = 6_371_007.2;

    #[must_use]
    pub fn new(lon0: f64, lat0: f64) -> Self {
        let origin_lon_rad = lon0.to_radians();
        let origin_lat_rad = lat0.to_radians();
        Self {
            origin_lon_rad,
            origin_lat_rad,
            cos_lat0: origin_lat_rad.cos(),
            radius: Self::EARTH_RADIUS,
        }
    }
}

impl Projection for LocalTangentPlane {
    fn project(&self, lon: f64, lat: f64) -> Coord<f64> {
        let dlon = lon.to_radians() - self.origin_lon_rad;
        let dlat = lat.to_radians() - self.origin_lat_rad;
        Coord {
            x: self.radius * self.cos_lat0 * dlon,
            y: self.radius * dlat,
        }
    }

    fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        let dlon = x / (self.radius * self.cos_lat0);
        let dlat = y / self.radius;
        (
            (self.origin_lon_rad + dlon).to_degrees(),
            (self.origin_lat_rad + dlat).to_degrees(),
        )
    }
}
