//! Currency pair conversion

use super::{ParameterSpec, ToolDefinition, TravelTool};
use crate::config::ExchangeConfig;
use crate::{Result, TravelCrewError, http};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub const PROVIDER: &str = "exchangerate";

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeRateInput {
    pub from_currency: String,
    pub to_currency: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversionResult {
    pub from_currency: String,
    pub to_currency: String,
    pub original_amount: f64,
    pub converted_amount: f64,
    pub conversion_rate: f64,
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    conversion_rate: Option<f64>,
    conversion_result: Option<f64>,
}

/// Upper-case a currency code and check it is three ASCII letters
pub fn normalize_currency(code: &str) -> Result<String> {
    let code = code.trim().to_ascii_uppercase();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code)
    } else {
        Err(TravelCrewError::validation(format!(
            "'{code}' is not a three-letter currency code"
        )))
    }
}

pub struct ExchangeRateTool {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ExchangeRateTool {
    pub fn new(config: &ExchangeConfig) -> Result<Self> {
        Ok(Self {
            client: http::build_client(config.timeout_seconds)?,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn pair_path(api_key: &str, from: &str, to: &str, amount: f64) -> String {
        format!(
            "/v6/{}/pair/{from}/{to}/{amount}",
            urlencoding::encode(api_key)
        )
    }
}

#[async_trait]
impl TravelTool for ExchangeRateTool {
    type Input = ExchangeRateInput;
    type Output = ConversionResult;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "exchange_rate",
            description: "Convert an amount between two currencies at the current rate.",
            parameters: vec![
                ParameterSpec::required("from_currency", "string", "Source currency code, e.g. KRW"),
                ParameterSpec::required("to_currency", "string", "Target currency code, e.g. JPY"),
                ParameterSpec::required("amount", "number", "Amount in the source currency"),
            ],
        }
    }

    #[instrument(name = "exchange_rate", skip(self, input), fields(from = %input.from_currency, to = %input.to_currency))]
    async fn call(&self, input: ExchangeRateInput) -> Result<ConversionResult> {
        let from = normalize_currency(&input.from_currency)?;
        let to = normalize_currency(&input.to_currency)?;
        if !input.amount.is_finite() {
            return Err(TravelCrewError::validation("amount must be a finite number"));
        }

        let api_key = match self.api_key.as_deref() {
            Some(key) if !key.is_empty() => key,
            _ => {
                return Err(TravelCrewError::config(
                    "Missing exchange rate API key. Set EXCHANGE_RATE_API_KEY.",
                ));
            }
        };

        // The key is part of the path; do not log the URL.
        let path = Self::pair_path(api_key, &from, &to, input.amount);
        let url = http::endpoint(&self.base_url, &path, &[])?;
        let response = self.client.get(url).send().await?;
        let response = http::ensure_success(PROVIDER, response).await?;
        let body: PairResponse = http::decode_json(PROVIDER, response).await?;

        if body.result != "success" {
            return Err(TravelCrewError::conversion(
                body.error_type.unwrap_or_else(|| body.result.clone()),
            ));
        }

        let (Some(rate), Some(converted)) = (body.conversion_rate, body.conversion_result) else {
            return Err(TravelCrewError::conversion(
                "response is missing the conversion rate or result",
            ));
        };

        info!("Converted {} {} to {} {}", input.amount, from, converted, to);
        Ok(ConversionResult {
            from_currency: from,
            to_currency: to,
            original_amount: input.amount,
            converted_amount: converted,
            conversion_rate: rate,
        })
    }
}
