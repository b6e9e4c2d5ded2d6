use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::GeocodingConfig;
use crate::core::{geocode_key, RedisHelper};
use crate::geo::Coordinates;

#[derive(Debug, thiserror::Error)]
pub enum GeocodeError {
    #[error("HTTP request to {provider} failed: {source}")]
    Transport {
        provider: GeocodeProvider,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} responded with status {status}")]
    Status {
        provider: GeocodeProvider,
        status: u16,
    },
    #[error("{0} returned no usable address")]
    EmptyResult(GeocodeProvider),
    #[error("All geocoding providers failed: {0}")]
    AllProvidersFailed(String),
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodeProvider {
    BigDataCloud,
    Nominatim,
}

impl std::fmt::Display for GeocodeProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GeocodeProvider::BigDataCloud => write!(f, "BigDataCloud"),
            GeocodeProvider::Nominatim => write!(f, "Nominatim"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub formatted: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub provider: GeocodeProvider,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct BigDataCloudResponse {
    city: Option<String>,
    locality: Option<String>,
    principal_subdivision: Option<String>,
    country_name: Option<String>,
    postcode: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NominatimResponse {
    display_name: Option<String>,
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct NominatimAddress {
    house_number: Option<String>,
    road: Option<String>,
    suburb: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
    state: Option<String>,
    country: Option<String>,
    postcode: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl BigDataCloudResponse {
    fn into_address(self) -> Option<Address> {
        let locality = non_empty(self.locality);
        let city = non_empty(self.city).or_else(|| locality.clone());
        let state = non_empty(self.principal_subdivision);
        let country = non_empty(self.country_name);
        let postal_code = non_empty(self.postcode);

        if city.is_none() && country.is_none() {
            return None;
        }

        let mut parts: Vec<&str> = Vec::new();
        for part in [&locality, &city, &state, &postal_code, &country]
            .into_iter()
            .flatten()
        {
            if !parts.contains(&part.as_str()) {
                parts.push(part);
            }
        }

        Some(Address {
            formatted: parts.join(", "),
            street: None,
            city,
            state,
            country,
            postal_code,
            provider: GeocodeProvider::BigDataCloud,
        })
    }
}

impl NominatimResponse {
    fn into_address(self) -> Option<Address> {
        let details = self.address.unwrap_or_default();
        let street = match (non_empty(details.road), non_empty(details.house_number)) {
            (Some(road), Some(number)) => Some(format!("{} {}", number, road)),
            (road, _) => road.or_else(|| non_empty(details.suburb)),
        };
        let city = non_empty(details.city)
            .or_else(|| non_empty(details.town))
            .or_else(|| non_empty(details.village))
            .or_else(|| non_empty(details.county));
        let state = non_empty(details.state);
        let country = non_empty(details.country);
        let postal_code = non_empty(details.postcode);
        let formatted = non_empty(self.display_name)?;

        Some(Address {
            formatted,
            street,
            city,
            state,
            country,
            postal_code,
            provider: GeocodeProvider::Nominatim,
        })
    }
}

/// Reverse geocoder: BigDataCloud first, a single Nominatim fallback, results cached in redis.
pub struct GeocodingClient {
    http: reqwest::Client,
    primary_base_url: String,
    fallback_base_url: String,
    cache: Option<Arc<RedisHelper>>,
    cache_ttl: Duration,
}

impl GeocodingClient {
    pub fn new(
        config: &GeocodingConfig,
        cache: Option<Arc<RedisHelper>>,
    ) -> Result<Self, GeocodeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| GeocodeError::Client(e.to_string()))?;

        Ok(Self {
            http,
            primary_base_url: config.primary_base_url.trim_end_matches('/').to_string(),
            fallback_base_url: config.fallback_base_url.trim_end_matches('/').to_string(),
            cache,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
        })
    }

    #[tracing::instrument(name = "Reverse Geocode", skip(self))]
    pub async fn reverse(&self, coords: Coordinates) -> Result<Address, GeocodeError> {
        let key = geocode_key(&coords);

        if let Some(cache) = &self.cache {
            match cache.get::<Address>(&key).await {
                Ok(Some(address)) => return Ok(address),
                Ok(None) => {}
                Err(e) => tracing::warn!("Geocode cache read failed: {}", e),
            }
        }

        let address = self.lookup(coords).await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set(&key, &address, self.cache_ttl).await {
                tracing::warn!("Geocode cache write failed: {}", e);
            }
        }

        Ok(address)
    }

    /// Uncached provider chain.
    pub async fn lookup(&self, coords: Coordinates) -> Result<Address, GeocodeError> {
        match self.big_data_cloud(coords).await {
            Ok(address) => Ok(address),
            Err(primary_error) => {
                tracing::warn!(
                    error.message = %primary_error,
                    "Primary reverse geocoder failed, falling back to Nominatim"
                );
                self.nominatim(coords).await.map_err(|fallback_error| {
                    tracing::error!(
                        error.message = %fallback_error,
                        "Fallback reverse geocoder failed"
                    );
                    GeocodeError::AllProvidersFailed(format!(
                        "primary: {}; fallback: {}",
                        primary_error, fallback_error
                    ))
                })
            }
        }
    }

    async fn big_data_cloud(&self, coords: Coordinates) -> Result<Address, GeocodeError> {
        let provider = GeocodeProvider::BigDataCloud;
        let response = self
            .http
            .get(format!("{}/data/reverse-geocode-client", self.primary_base_url))
            .query(&[
                ("latitude", coords.latitude().to_string()),
                ("longitude", coords.longitude().to_string()),
                ("localityLanguage", "en".to_string()),
            ])
            .send()
            .await
            .map_err(|source| GeocodeError::Transport { provider, source })?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status {
                provider,
                status: response.status().as_u16(),
            });
        }

        response
            .json::<BigDataCloudResponse>()
            .await
            .map_err(|source| GeocodeError::Transport { provider, source })?
            .into_address()
            .ok_or(GeocodeError::EmptyResult(provider))
    }

    async fn nominatim(&self, coords: Coordinates) -> Result<Address, GeocodeError> {
        let provider = GeocodeProvider::Nominatim;
        let response = self
            .http
            .get(format!("{}/reverse", self.fallback_base_url))
            .query(&[
                ("format", "jsonv2".to_string()),
                ("addressdetails", "1".to_string()),
                ("lat", coords.latitude().to_string()),
                ("lon", coords.longitude().to_string()),
            ])
            .send()
            .await
            .map_err(|source| GeocodeError::Transport { provider, source })?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status {
                provider,
                status: response.status().as_u16(),
            });
        }

        response
            .json::<NominatimResponse>()
            .await
            .map_err(|source| GeocodeError::Transport { provider, source })?
            .into_address()
            .ok_or(GeocodeError::EmptyResult(provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use claim::{assert_err, assert_ok};
    use serde_json::json;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(primary: &MockServer, fallback: &MockServer) -> GeocodingClient {
        let config = GeocodingConfig {
            primary_base_url: primary.uri(),
            fallback_base_url: fallback.uri(),
            user_agent: "tutor-connect-tests".into(),
            timeout_secs: 2,
            cache_ttl_secs: 60,
        };
        GeocodingClient::new(&config, None).unwrap()
    }

    fn bengaluru() -> Coordinates {
        Coordinates::new(12.9716, 77.5946).unwrap()
    }

    fn big_data_cloud_body() -> serde_json::Value {
        json!({
            "latitude": 12.9716,
            "longitude": 77.5946,
            "city": "Bengaluru",
            "locality": "Shivajinagar",
            "principalSubdivision": "Karnataka",
            "countryName": "India",
            "postcode": "560001"
        })
    }

    fn nominatim_body() -> serde_json::Value {
        json!({
            "display_name": "MG Road, Bengaluru, Karnataka, 560001, India",
            "address": {
                "road": "MG Road",
                "city": "Bengaluru",
                "state": "Karnataka",
                "country": "India",
                "postcode": "560001"
            }
        })
    }

    #[tokio::test]
    async fn primary_provider_answer_is_used_when_available() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/data/reverse-geocode-client"))
            .and(query_param("latitude", "12.9716"))
            .and(query_param("localityLanguage", "en"))
            .respond_with(ResponseTemplate::new(200).set_body_json(big_data_cloud_body()))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(nominatim_body()))
            .expect(0)
            .mount(&fallback)
            .await;

        let address = assert_ok!(client(&primary, &fallback).reverse(bengaluru()).await);
        assert_eq!(address.provider, GeocodeProvider::BigDataCloud);
        assert_eq!(address.city.as_deref(), Some("Bengaluru"));
        assert_eq!(
            address.formatted,
            "Shivajinagar, Bengaluru, Karnataka, 560001, India"
        );
    }

    #[tokio::test]
    async fn server_error_from_primary_falls_back_to_nominatim() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .and(path("/reverse"))
            .and(query_param("format", "jsonv2"))
            .and(query_param("lon", "77.5946"))
            .and(header_exists("user-agent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(nominatim_body()))
            .expect(1)
            .mount(&fallback)
            .await;

        let address = assert_ok!(client(&primary, &fallback).reverse(bengaluru()).await);
        assert_eq!(address.provider, GeocodeProvider::Nominatim);
        assert_eq!(address.street.as_deref(), Some("MG Road"));
        assert_eq!(address.postal_code.as_deref(), Some("560001"));
    }

    #[tokio::test]
    async fn blank_primary_answer_counts_as_a_failure() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "city": "", "locality": "", "countryName": ""
            })))
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(nominatim_body()))
            .expect(1)
            .mount(&fallback)
            .await;

        let address = assert_ok!(client(&primary, &fallback).lookup(bengaluru()).await);
        assert_eq!(address.provider, GeocodeProvider::Nominatim);
    }

    #[tokio::test]
    async fn both_providers_failing_is_reported() {
        let primary = MockServer::start().await;
        let fallback = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&primary)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&fallback)
            .await;

        let err = assert_err!(client(&primary, &fallback).reverse(bengaluru()).await);
        assert!(matches!(err, GeocodeError::AllProvidersFailed(_)));
    }

    #[test]
    fn nominatim_town_is_used_when_city_is_missing() {
        let response: NominatimResponse = serde_json::from_value(json!({
            "display_name": "Hosur Road, Attibele, Karnataka, India",
            "address": { "road": "Hosur Road", "house_number": "12", "town": "Attibele" }
        }))
        .unwrap();

        let address = response.into_address().unwrap();
        assert_eq!(address.city.as_deref(), Some("Attibele"));
        assert_eq!(address.street.as_deref(), Some("12 Hosur Road"));
    }
}
