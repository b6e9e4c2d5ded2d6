use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Length of one degree of arc on the same sphere `haversine_km` uses.
const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    latitude: f64,
    longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, String> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(format!("Latitude {} is outside [-90, 90]", latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(format!("Longitude {} is outside [-180, 180]", longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Builds coordinates from nullable columns; both must be present and in range.
    pub fn from_columns(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => Self::new(lat, lng).ok(),
            _ => None,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(a: &Coordinates, b: &Coordinates) -> f64 {
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lng = (b.longitude - a.longitude).to_radians();
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn round_km(distance: f64) -> f64 {
    (distance * 100.0).round() / 100.0
}

/// Rectangle enclosing every point within `radius_km` of a centre. Used as an
/// index-friendly SQL prefilter before the exact haversine check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub fn around(center: &Coordinates, radius_km: f64) -> Self {
        let lat_delta = radius_km / KM_PER_DEGREE;
        let min_lat = (center.latitude - lat_delta).max(-90.0);
        let max_lat = (center.latitude + lat_delta).min(90.0);

        // the box must reach the widest parallel it spans, i.e. the one closest to a pole
        let widest_lat = center.latitude.abs() + lat_delta;
        let cos_lat = widest_lat.min(90.0).to_radians().cos();
        let (min_lng, max_lng) = if widest_lat >= 89.0 || cos_lat <= f64::EPSILON {
            (-180.0, 180.0)
        } else {
            let lng_delta = radius_km / (KM_PER_DEGREE * cos_lat);
            let min_lng = center.longitude - lng_delta;
            let max_lng = center.longitude + lng_delta;
            // crossing the antimeridian: fall back to the full range rather than two boxes
            if lng_delta >= 180.0 || min_lng < -180.0 || max_lng > 180.0 {
                (-180.0, 180.0)
            } else {
                (min_lng, max_lng)
            }
        };

        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    pub fn contains(&self, point: &Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude)
            && (self.min_lng..=self.max_lng).contains(&point.longitude)
    }
}

pub fn google_maps_url(coords: &Coordinates) -> String {
    format!(
        "https://www.google.com/maps?q={},{}",
        coords.latitude, coords.longitude
    )
}

pub fn google_maps_directions_url(from: &Coordinates, to: &Coordinates) -> String {
    format!(
        "https://www.google.com/maps/dir/?api=1&origin={},{}&destination={},{}",
        from.latitude, from.longitude, to.latitude, to.longitude
    )
}
