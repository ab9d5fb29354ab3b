//! One-way flight offer search

use super::{ParameterSpec, ToolDefinition, TravelTool};
use crate::amadeus::{AmadeusClient, PROVIDER};
use crate::config::AmadeusConfig;
use crate::locations::CityCodeTable;
use crate::{Result, TravelCrewError, http};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

const FLIGHT_OFFERS_PATH: &str = "/v2/shopping/flight-offers";

fn default_adults() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlightSearchInput {
    /// Departure city display name, e.g. "인천"
    pub origin_city: String,
    /// Arrival city display name, e.g. "오사카"
    pub destination_city: String,
    pub departure_date: NaiveDate,
    #[serde(default = "default_adults")]
    pub adults: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlightOffer {
    pub price: String,
    pub currency: String,
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub carrier: String,
    pub flight_number: String,
    pub departure_time: String,
    pub arrival_time: String,
}

/// Provider response structures
mod wire {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct OffersResponse {
        #[serde(default)]
        pub data: Vec<Offer>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Offer {
        pub price: Price,
        #[serde(default)]
        pub itineraries: Vec<Itinerary>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Price {
        pub total: String,
        pub currency: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Itinerary {
        #[serde(default)]
        pub segments: Vec<Segment>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Segment {
        pub carrier_code: String,
        pub number: String,
        pub departure: Endpoint,
        pub arrival: Endpoint,
    }

    #[derive(Debug, Deserialize)]
    pub struct Endpoint {
        pub at: String,
    }
}

pub struct FlightSearchTool {
    client: AmadeusClient,
    cities: Arc<CityCodeTable>,
    currency: String,
    max_offers: u32,
}

impl FlightSearchTool {
    pub fn new(config: &AmadeusConfig, cities: Arc<CityCodeTable>) -> Result<Self> {
        Ok(Self {
            client: AmadeusClient::new(config)?,
            cities,
            currency: config.currency.clone(),
            max_offers: config.max_flight_offers,
        })
    }

    fn to_offer(
        offer: wire::Offer,
        origin: &str,
        destination: &str,
        departure_date: NaiveDate,
    ) -> Option<FlightOffer> {
        let segments = &offer.itineraries.first()?.segments;
        let first = segments.first()?;
        let last = segments.last()?;

        Some(FlightOffer {
            price: offer.price.total,
            currency: offer.price.currency,
            origin: origin.to_string(),
            destination: destination.to_string(),
            departure_date,
            carrier: first.carrier_code.clone(),
            flight_number: first.number.clone(),
            departure_time: first.departure.at.clone(),
            arrival_time: last.arrival.at.clone(),
        })
    }
}

#[async_trait]
impl TravelTool for FlightSearchTool {
    type Input = FlightSearchInput;
    type Output = Vec<FlightOffer>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "flight_search",
            description: "Look up one-way flight offers between two cities on a given date.",
            parameters: vec![
                ParameterSpec::required("origin_city", "string", "Departure city name, e.g. 인천"),
                ParameterSpec::required("destination_city", "string", "Arrival city name, e.g. 오사카"),
                ParameterSpec::required("departure_date", "string", "Departure date (YYYY-MM-DD)"),
                ParameterSpec::optional("adults", "integer", "Number of adult passengers (default 1)"),
            ],
        }
    }

    #[instrument(name = "flight_search", skip(self, input), fields(origin = %input.origin_city, destination = %input.destination_city))]
    async fn call(&self, input: FlightSearchInput) -> Result<Vec<FlightOffer>> {
        if input.adults == 0 {
            return Err(TravelCrewError::validation("adults must be at least 1"));
        }

        let origin = self.cities.resolve_code(&input.origin_city)?;
        let destination = self.cities.resolve_code(&input.destination_city)?;

        let date = input.departure_date.format("%Y-%m-%d").to_string();
        let adults = input.adults.to_string();
        let max = self.max_offers.to_string();
        let params = [
            ("originLocationCode", origin),
            ("destinationLocationCode", destination),
            ("departureDate", date.as_str()),
            ("adults", adults.as_str()),
            ("currencyCode", self.currency.as_str()),
            ("max", max.as_str()),
        ];

        let response = self.client.get(FLIGHT_OFFERS_PATH, &params).await?;
        let response = http::ensure_success(PROVIDER, response).await?;
        let body: wire::OffersResponse = http::decode_json(PROVIDER, response).await?;

        let total = body.data.len();
        let offers: Vec<FlightOffer> = body
            .data
            .into_iter()
            .filter_map(|offer| {
                let mapped = Self::to_offer(offer, origin, destination, input.departure_date);
                if mapped.is_none() {
                    warn!("Skipping flight offer without segments");
                }
                mapped
            })
            .collect();

        info!(
            "Found {} flight offers {} -> {} on {} ({} returned by provider)",
            offers.len(),
            origin,
            destination,
            date,
            total
        );
        Ok(offers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_offer_mapping_uses_first_and_last_segment() {
        let offer: wire::Offer = serde_json::from_value(json!({
            "price": {"total": "245000", "currency": "KRW"},
            "itineraries": [{
                "segments": [
                    {"carrierCode": "KE", "number": "723",
                     "departure": {"at": "2025-04-25T08:00:00"},
                     "arrival": {"at": "2025-04-25T09:30:00"}},
                    {"carrierCode": "KE", "number": "9001",
                     "departure": {"at": "2025-04-25T10:30:00"},
                     "arrival": {"at": "2025-04-25T11:45:00"}}
                ]
            }]
        }))
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 4, 25).unwrap();
        let mapped = FlightSearchTool::to_offer(offer, "ICN", "OSA", date).unwrap();
        assert_eq!(mapped.price, "245000");
        assert_eq!(mapped.carrier, "KE");
        assert_eq!(mapped.flight_number, "723");
        assert_eq!(mapped.departure_time, "2025-04-25T08:00:00");
        assert_eq!(mapped.arrival_time, "2025-04-25T11:45:00");
    }

    #[test]
    fn test_offer_without_segments_is_dropped() {
        let offer: wire::Offer = serde_json::from_value(json!({
            "price": {"total": "1", "currency": "KRW"},
            "itineraries": [{"segments": []}]
        }))
        .unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 4, 25).unwrap();
        assert!(FlightSearchTool::to_offer(offer, "ICN", "OSA", date).is_none());
    }

    #[test]
    fn test_missing_data_means_no_offers() {
        let body: wire::OffersResponse = serde_json::from_value(json!({"meta": {"count": 0}})).unwrap();
        assert!(body.data.is_empty());
    }

    #[test]
    fn test_input_defaults_to_one_adult() {
        let input: FlightSearchInput = serde_json::from_value(json!({
            "origin_city": "인천",
            "destination_city": "오사카",
            "departure_date": "2025-04-25"
        }))
        .unwrap();
        assert_eq!(input.adults, 1);
    }
}
