//! Hotel availability search
//!
//! One listing call for the city, then one price call per candidate. A failed
//! price call only drops that candidate; a failed listing call fails the search.

use super::{ParameterSpec, ToolDefinition, TravelTool};
use crate::amadeus::{AmadeusClient, PROVIDER};
use crate::config::AmadeusConfig;
use crate::locations::CityCodeTable;
use crate::{Result, TravelCrewError, http};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const HOTELS_BY_CITY_PATH: &str = "/v1/reference-data/locations/hotels/by-city";
const HOTEL_OFFERS_PATH: &str = "/v3/shopping/hotel-offers";

/// Upper bound on candidates priced by one search
pub const MAX_HOTELS_LIMIT: u32 = 50;

fn default_adults() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct HotelSearchInput {
    /// City display name, e.g. "오사카"
    pub city_name: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    #[serde(default = "default_adults")]
    pub adults: u32,
    /// Candidates to price; the configured default when absent
    pub max_hotels: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HotelOffer {
    pub hotel_name: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub room_description: Option<String>,
    pub total_price: String,
    pub currency: String,
}

mod wire {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct HotelListResponse {
        #[serde(default)]
        pub data: Vec<ListedHotel>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListedHotel {
        pub hotel_id: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct HotelOffersResponse {
        #[serde(default)]
        pub data: Vec<HotelOffers>,
    }

    #[derive(Debug, Deserialize)]
    pub struct HotelOffers {
        pub hotel: Hotel,
        #[serde(default)]
        pub offers: Vec<Offer>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Hotel {
        pub name: String,
    }

    #[derive(Debug, Deserialize)]
    pub struct Offer {
        pub room: Option<Room>,
        pub price: Price,
    }

    #[derive(Debug, Deserialize)]
    pub struct Room {
        pub description: Option<Description>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Description {
        pub text: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Price {
        pub total: String,
        pub currency: String,
    }
}

pub struct HotelSearchTool {
    client: AmadeusClient,
    cities: Arc<CityCodeTable>,
    default_max_hotels: u32,
}

impl HotelSearchTool {
    pub fn new(config: &AmadeusConfig, cities: Arc<CityCodeTable>) -> Result<Self> {
        Ok(Self {
            client: AmadeusClient::new(config)?,
            cities,
            default_max_hotels: config.max_hotels,
        })
    }

    async fn list_hotels(&self, city_code: &str) -> Result<Vec<wire::ListedHotel>> {
        let response = self
            .client
            .get(HOTELS_BY_CITY_PATH, &[("cityCode", city_code)])
            .await?;
        let response = http::ensure_success(PROVIDER, response).await?;
        let body: wire::HotelListResponse = http::decode_json(PROVIDER, response).await?;
        Ok(body.data)
    }

    /// Price one candidate. `None` when the provider has nothing usable for it.
    async fn price_hotel(
        &self,
        hotel_id: &str,
        input: &HotelSearchInput,
    ) -> Result<Option<HotelOffer>> {
        let check_in = input.check_in_date.format("%Y-%m-%d").to_string();
        let check_out = input.check_out_date.format("%Y-%m-%d").to_string();
        let adults = input.adults.to_string();
        let params = [
            ("hotelIds", hotel_id),
            ("checkInDate", check_in.as_str()),
            ("checkOutDate", check_out.as_str()),
            ("adults", adults.as_str()),
        ];

        let response = self.client.get(HOTEL_OFFERS_PATH, &params).await?;
        if !response.status().is_success() {
            warn!(
                hotel_id,
                status = response.status().as_u16(),
                "Hotel price lookup failed, omitting candidate"
            );
            return Ok(None);
        }

        let body: wire::HotelOffersResponse = match http::decode_json(PROVIDER, response).await {
            Ok(body) => body,
            Err(e) => {
                warn!(hotel_id, "Unreadable hotel price response, omitting candidate: {}", e);
                return Ok(None);
            }
        };

        Ok(body
            .data
            .into_iter()
            .next()
            .and_then(|entry| Self::to_offer(entry, input)))
    }

    fn to_offer(entry: wire::HotelOffers, input: &HotelSearchInput) -> Option<HotelOffer> {
        let offer = entry.offers.into_iter().next()?;
        let room_description = offer
            .room
            .and_then(|room| room.description)
            .and_then(|description| description.text);

        Some(HotelOffer {
            hotel_name: entry.hotel.name,
            check_in: input.check_in_date,
            check_out: input.check_out_date,
            room_description,
            total_price: offer.price.total,
            currency: offer.price.currency,
        })
    }
}

#[async_trait]
impl TravelTool for HotelSearchTool {
    type Input = HotelSearchInput;
    type Output = Vec<HotelOffer>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "hotel_search",
            description: "List hotels in a city with prices for the given stay.",
            parameters: vec![
                ParameterSpec::required("city_name", "string", "City name, e.g. 오사카"),
                ParameterSpec::required("check_in_date", "string", "Check-in date (YYYY-MM-DD)"),
                ParameterSpec::required("check_out_date", "string", "Check-out date (YYYY-MM-DD)"),
                ParameterSpec::optional("adults", "integer", "Number of adult guests (default 1)"),
                ParameterSpec::optional("max_hotels", "integer", "Maximum number of hotels to price"),
            ],
        }
    }

    #[instrument(name = "hotel_search", skip(self, input), fields(city = %input.city_name))]
    async fn call(&self, input: HotelSearchInput) -> Result<Vec<HotelOffer>> {
        if input.adults == 0 {
            return Err(TravelCrewError::validation("adults must be at least 1"));
        }
        if input.check_out_date <= input.check_in_date {
            return Err(TravelCrewError::validation(
                "check_out_date must be after check_in_date",
            ));
        }
        let max_hotels = input.max_hotels.unwrap_or(self.default_max_hotels);
        if max_hotels == 0 || max_hotels > MAX_HOTELS_LIMIT {
            return Err(TravelCrewError::validation(format!(
                "max_hotels must be between 1 and {MAX_HOTELS_LIMIT}"
            )));
        }

        let city_code = self.cities.resolve_code(&input.city_name)?;
        let listed = self.list_hotels(city_code).await?;
        debug!("Provider listed {} hotels in {}", listed.len(), city_code);

        let mut available = Vec::new();
        for hotel in listed.iter().take(max_hotels as usize) {
            if let Some(offer) = self.price_hotel(&hotel.hotel_id, &input).await? {
                available.push(offer);
            }
        }

        info!(
            "Priced {} of {} candidate hotels in {}",
            available.len(),
            listed.len().min(max_hotels as usize),
            city_code
        );
        Ok(available)
    }
}
