pub mod distance;
pub mod geocoding;
pub mod nearby;

pub use distance::{
    google_maps_directions_url, google_maps_url, haversine_km, round_km, BoundingBox, Coordinates,
};
pub use geocoding::{Address, GeocodeError, GeocodeProvider, GeocodingClient};
pub use nearby::rank_candidates;
