//! Nearby attraction lookup
//!
//! Resolves a place name to coordinates, searches tourist attractions around
//! it and fetches details for each hit. Any failing step fails the whole call.

use super::{ParameterSpec, ToolDefinition, TravelTool};
use crate::config::PlacesConfig;
use crate::{Result, TravelCrewError, http};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, instrument};

pub const PROVIDER: &str = "google_places";

const TEXT_SEARCH_PATH: &str = "/maps/api/place/textsearch/json";
const NEARBY_SEARCH_PATH: &str = "/maps/api/place/nearbysearch/json";
const DETAILS_PATH: &str = "/maps/api/place/details/json";
const DETAIL_FIELDS: &str =
    "name,rating,formatted_address,formatted_phone_number,opening_hours,website,reviews";
const ATTRACTION_TYPE: &str = "tourist_attraction";

/// Nearby results fetched in detail
pub const MAX_NEARBY_RESULTS: usize = 5;
/// Reviews kept per place
pub const MAX_REVIEWS: usize = 3;

fn default_radius() -> u32 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct NearbyPlacesInput {
    /// Free-text place, e.g. "오사카 성"
    pub place_name: String,
    /// Search radius in meters
    #[serde(default = "default_radius")]
    pub radius: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Review {
    pub text: String,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaceDetail {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub opening_hours: Vec<String>,
    pub rating: Option<f64>,
    pub reviews: Vec<Review>,
}

const NOT_AVAILABLE: &str = "not available";

fn or_na(value: Option<&str>) -> &str {
    value.unwrap_or(NOT_AVAILABLE)
}

impl fmt::Display for PlaceDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "  Address: {}", or_na(self.address.as_deref()))?;
        writeln!(f, "  Phone: {}", or_na(self.phone.as_deref()))?;
        writeln!(f, "  Website: {}", or_na(self.website.as_deref()))?;
        match self.rating {
            Some(rating) => writeln!(f, "  Rating: {rating:.1}")?,
            None => writeln!(f, "  Rating: {NOT_AVAILABLE}")?,
        }
        if self.opening_hours.is_empty() {
            writeln!(f, "  Hours: {NOT_AVAILABLE}")?;
        } else {
            writeln!(f, "  Hours:")?;
            for line in &self.opening_hours {
                writeln!(f, "    {line}")?;
            }
        }
        for review in &self.reviews {
            let rating = review
                .rating
                .map_or_else(|| NOT_AVAILABLE.to_string(), |r| format!("{r:.0}/5"));
            writeln!(f, "  Review ({rating}): {}", review.text)?;
        }
        Ok(())
    }
}

mod wire {
    use serde::Deserialize;

    /// Every place endpoint reports a logical `status` next to the HTTP one
    pub trait Status {
        fn status(&self) -> &str;
    }

    #[derive(Debug, Deserialize)]
    pub struct SearchResponse {
        pub status: String,
        #[serde(default)]
        pub results: Vec<SearchResult>,
    }

    impl Status for SearchResponse {
        fn status(&self) -> &str {
            &self.status
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct SearchResult {
        pub place_id: Option<String>,
        pub geometry: Option<Geometry>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Geometry {
        pub location: LatLng,
    }

    #[derive(Debug, Deserialize)]
    pub struct LatLng {
        pub lat: f64,
        pub lng: f64,
    }

    #[derive(Debug, Deserialize)]
    pub struct DetailsResponse {
        pub status: String,
        pub result: Option<Details>,
    }

    impl Status for DetailsResponse {
        fn status(&self) -> &str {
            &self.status
        }
    }

    #[derive(Debug, Deserialize)]
    pub struct Details {
        pub name: Option<String>,
        pub rating: Option<f64>,
        pub formatted_address: Option<String>,
        pub formatted_phone_number: Option<String>,
        pub website: Option<String>,
        pub opening_hours: Option<OpeningHours>,
        #[serde(default)]
        pub reviews: Vec<Review>,
    }

    #[derive(Debug, Deserialize)]
    pub struct OpeningHours {
        #[serde(default)]
        pub weekday_text: Vec<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Review {
        #[serde(default)]
        pub text: String,
        pub rating: Option<f64>,
    }
}

pub struct NearbyPlacesTool {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    language: String,
}

impl NearbyPlacesTool {
    pub fn new(config: &PlacesConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout_seconds)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            language: config.language.clone(),
        })
    }

    fn api_key(&self) -> Result<&str> {
        match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(TravelCrewError::config(
                "Missing place search API key. Set GOOGLE_API_KEY.",
            )),
        }
    }

    /// GET one endpoint and require both HTTP success and `status == "OK"`.
    /// The URL carries the key, so it is never logged.
    async fn fetch<T>(&self, stage: &str, path: &str, params: &[(&str, &str)]) -> Result<T>
    where
        T: DeserializeOwned + wire::Status,
    {
        let key = self.api_key()?;
        let mut all: Vec<(&str, &str)> = params.to_vec();
        all.push(("language", self.language.as_str()));
        all.push(("key", key));

        let url = http::endpoint(&self.base_url, path, &all)?;
        let response = self.client.get(url).send().await?;
        let response = http::ensure_success(PROVIDER, response).await?;
        let body: T = http::decode_json(PROVIDER, response).await?;

        if body.status() != "OK" {
            return Err(TravelCrewError::provider(
                PROVIDER,
                None,
                format!("{stage} returned status {}", body.status()),
            ));
        }
        debug!(stage, "Place search step succeeded");
        Ok(body)
    }

    async fn locate(&self, place_name: &str) -> Result<wire::LatLng> {
        let body: wire::SearchResponse = self
            .fetch("text search", TEXT_SEARCH_PATH, &[("query", place_name)])
            .await?;

        body.results
            .into_iter()
            .next()
            .and_then(|r| r.geometry)
            .map(|g| g.location)
            .ok_or_else(|| {
                TravelCrewError::provider(
                    PROVIDER,
                    None,
                    format!("text search found no location for '{place_name}'"),
                )
            })
    }

    async fn nearby(&self, location: &wire::LatLng, radius: u32) -> Result<Vec<String>> {
        let location = format!("{},{}", location.lat, location.lng);
        let radius = radius.to_string();
        let body: wire::SearchResponse = self
            .fetch(
                "nearby search",
                NEARBY_SEARCH_PATH,
                &[
                    ("location", location.as_str()),
                    ("radius", radius.as_str()),
                    ("type", ATTRACTION_TYPE),
                ],
            )
            .await?;

        Ok(body
            .results
            .into_iter()
            .filter_map(|r| r.place_id)
            .take(MAX_NEARBY_RESULTS)
            .collect())
    }

    async fn details(&self, place_id: &str) -> Result<PlaceDetail> {
        let body: wire::DetailsResponse = self
            .fetch(
                "details",
                DETAILS_PATH,
                &[("place_id", place_id), ("fields", DETAIL_FIELDS)],
            )
            .await?;

        let details = body.result.ok_or_else(|| {
            TravelCrewError::provider(PROVIDER, None, format!("details missing for {place_id}"))
        })?;
        Ok(Self::to_detail(details))
    }

    fn to_detail(details: wire::Details) -> PlaceDetail {
        PlaceDetail {
            name: details.name.unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            address: details.formatted_address,
            phone: details.formatted_phone_number,
            website: details.website,
            opening_hours: details
                .opening_hours
                .map(|h| h.weekday_text)
                .unwrap_or_default(),
            rating: details.rating,
            reviews: details
                .reviews
                .into_iter()
                .take(MAX_REVIEWS)
                .map(|r| Review {
                    text: r.text,
                    rating: r.rating,
                })
                .collect(),
        }
    }
}

#[async_trait]
impl TravelTool for NearbyPlacesTool {
    type Input = NearbyPlacesInput;
    type Output = Vec<PlaceDetail>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "nearby_places",
            description: "Find tourist attractions near a place with address, hours and reviews.",
            parameters: vec![
                ParameterSpec::required("place_name", "string", "Place to search around, e.g. 오사카 성"),
                ParameterSpec::optional("radius", "integer", "Search radius in meters (default 1000)"),
            ],
        }
    }

    #[instrument(name = "nearby_places", skip(self, input), fields(place = %input.place_name, radius = input.radius))]
    async fn call(&self, input: NearbyPlacesInput) -> Result<Vec<PlaceDetail>> {
        if input.place_name.trim().is_empty() {
            return Err(TravelCrewError::validation("place_name must not be empty"));
        }
        if input.radius == 0 {
            return Err(TravelCrewError::validation("radius must be positive"));
        }

        let location = self.locate(input.place_name.trim()).await?;
        let place_ids = self.nearby(&location, input.radius).await?;

        let mut places = Vec::with_capacity(place_ids.len());
        for place_id in &place_ids {
            places.push(self.details(place_id).await?);
        }

        info!(
            "Found {} attractions near {} ({:.4}, {:.4})",
            places.len(),
            input.place_name,
            location.lat,
            location.lng
        );
        Ok(places)
    }
}
