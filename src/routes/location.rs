use actix_web::{delete, get, put, web, HttpResponse};
use sqlx::MySqlPool;
use validator::Validate;

use crate::core::jwt_auth::JwtMiddleware;
use crate::core::{AppError, AppSuccessResponse};
use crate::db::{location, users};
use crate::geo::{Coordinates, GeocodingClient};
use crate::models::location::{
    AddressParts, LiveSharingRequest, LocationUpdateResponse, ReverseGeocodeQuery,
    UpdateLocationRequest,
};

#[tracing::instrument(name = "Update Location", skip(pool, geocoder, auth, request), fields(user_id = auth.user_id))]
#[put("")]
pub async fn update_location(
    pool: web::Data<MySqlPool>,
    geocoder: web::Data<GeocodingClient>,
    auth: JwtMiddleware,
    request: web::Json<UpdateLocationRequest>,
) -> Result<HttpResponse, AppError> {
    request.validate()?;
    let coords = request.coordinates()?;

    // Client supplied address parts win over server-side geocoding.
    let (address, geocoding_error) = match request.supplied_address() {
        Some(parts) => (parts, None),
        None => match geocoder.reverse(coords).await {
            Ok(address) => (AddressParts::from(address), None),
            Err(e) => {
                tracing::warn!(
                    "Storing location for user {} without an address: {}",
                    auth.user_id,
                    e
                );
                (AddressParts::default(), Some(e.to_string()))
            }
        },
    };

    location::update_user_location(&pool, auth.user_id, &coords, &address).await?;
    let user = users::get_active_user(&pool, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        LocationUpdateResponse {
            location: user.location(),
            live_sharing: user.live_sharing,
            geocoding_error,
        },
        "Location updated successfully",
    )))
}

#[tracing::instrument(name = "Clear Location", skip(pool, auth), fields(user_id = auth.user_id))]
#[delete("")]
pub async fn clear_location(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
) -> Result<HttpResponse, AppError> {
    location::clear_user_location(&pool, auth.user_id).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        LocationUpdateResponse {
            location: None,
            live_sharing: false,
            geocoding_error: None,
        },
        "Location cleared successfully",
    )))
}

#[tracing::instrument(name = "Set Live Sharing", skip(pool, auth, request), fields(user_id = auth.user_id))]
#[put("/live-sharing")]
pub async fn set_live_sharing(
    pool: web::Data<MySqlPool>,
    auth: JwtMiddleware,
    request: web::Json<LiveSharingRequest>,
) -> Result<HttpResponse, AppError> {
    let user = users::get_active_user(&pool, auth.user_id).await?;
    if request.enabled && user.coordinates().is_none() {
        return Err(AppError::validation(
            "Update your location before turning on live sharing",
        ));
    }

    location::set_live_sharing(&pool, auth.user_id, request.enabled).await?;

    let message = if request.enabled {
        "Live location sharing enabled"
    } else {
        "Live location sharing disabled"
    };

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        LocationUpdateResponse {
            location: user.location(),
            live_sharing: request.enabled,
            geocoding_error: None,
        },
        message,
    )))
}

#[tracing::instrument(name = "Reverse Geocode Lookup", skip(geocoder, _auth))]
#[get("/reverse-geocode")]
pub async fn reverse_geocode(
    geocoder: web::Data<GeocodingClient>,
    _auth: JwtMiddleware,
    query: web::Query<ReverseGeocodeQuery>,
) -> Result<HttpResponse, AppError> {
    let coords = Coordinates::new(query.lat, query.lng).map_err(AppError::validation)?;
    let address = geocoder.reverse(coords).await?;

    Ok(HttpResponse::Ok().json(AppSuccessResponse::new(
        address,
        "Address resolved successfully",
    )))
}
