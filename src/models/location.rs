use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::AppError;
use crate::geo::{Address, Coordinates};
use crate::models::common::clean_optional;
use crate::models::pagination::PaginationQuery;
use crate::models::users::{Role, UserLocation};

pub const DEFAULT_RADIUS_KM: f64 = 10.0;
pub const MAX_RADIUS_KM: f64 = 100.0;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
}

impl UpdateLocationRequest {
    pub fn coordinates(&self) -> Result<Coordinates, AppError> {
        Coordinates::new(self.latitude, self.longitude).map_err(AppError::validation)
    }

    /// Address parts the client supplied itself, if any.
    pub fn supplied_address(&self) -> Option<AddressParts> {
        let parts = AddressParts {
            address: clean_optional(&self.address),
            city: clean_optional(&self.city),
            state: clean_optional(&self.state),
            country: clean_optional(&self.country),
            postal_code: clean_optional(&self.postal_code),
        };
        if parts.is_empty() {
            None
        } else {
            Some(parts)
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct AddressParts {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
}

impl AddressParts {
    pub fn is_empty(&self) -> bool {
        self.address.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.country.is_none()
            && self.postal_code.is_none()
    }
}

impl From<Address> for AddressParts {
    fn from(address: Address) -> Self {
        AddressParts {
            address: Some(address.formatted),
            city: address.city,
            state: address.state,
            country: address.country,
            postal_code: address.postal_code,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LocationUpdateResponse {
    pub location: Option<UserLocation>,
    pub live_sharing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geocoding_error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LiveSharingRequest {
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReverseGeocodeQuery {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Deserialize)]
pub struct NearbyQuery {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_km: Option<f64>,
    pub role: Option<Role>,
    #[serde(default)]
    pub live_only: bool,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl NearbyQuery {
    pub fn radius_km(&self) -> Result<f64, AppError> {
        search_radius(self.radius_km)
    }

    /// Explicit query coordinates, if the caller sent both.
    pub fn origin(&self) -> Result<Option<Coordinates>, AppError> {
        optional_coordinates(self.latitude, self.longitude)
    }

    pub fn pagination(&self) -> PaginationQuery {
        PaginationQuery::new(self.page, self.per_page)
    }
}

/// Defaults to 10 km; anything outside (0, 100] is rejected.
pub fn search_radius(radius_km: Option<f64>) -> Result<f64, AppError> {
    let radius = radius_km.unwrap_or(DEFAULT_RADIUS_KM);
    if !radius.is_finite() || radius <= 0.0 || radius > MAX_RADIUS_KM {
        return Err(AppError::validation(format!(
            "radius_km must be greater than 0 and at most {}",
            MAX_RADIUS_KM
        )));
    }
    Ok(radius)
}

/// Coordinates from a request; both or neither must be sent.
pub fn optional_coordinates(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<Coordinates>, AppError> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => Coordinates::new(lat, lng)
            .map(Some)
            .map_err(AppError::validation),
        (None, None) => Ok(None),
        _ => Err(AppError::validation(
            "latitude and longitude must be provided together",
        )),
    }
}

/// A nearby-discovery candidate as read from the database.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NearbyCandidate {
    pub id: i32,
    pub name: String,
    pub role: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city: Option<String>,
    pub is_online: bool,
    pub live_sharing: bool,
    pub last_seen_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbyUser {
    pub id: i32,
    pub name: String,
    pub role: Role,
    pub city: Option<String>,
    pub is_online: bool,
    pub live_sharing: bool,
    pub last_seen_at: Option<NaiveDateTime>,
    pub distance_km: f64,
    pub maps_url: String,
    pub directions_url: String,
}
