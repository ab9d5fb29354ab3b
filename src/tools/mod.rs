//! Data retrieval tools exposed to the planning agents
//!
//! Every tool implements [`TravelTool`]: a typed input, a typed output and one
//! required capability method, [`TravelTool::call`]. The blanket [`DynTool`]
//! adapter turns any tool into a JSON-in/JSON-out object so the
//! [`ToolRegistry`] can dispatch by name.

pub mod exchange;
pub mod flights;
pub mod hotels;
pub mod places;

pub use exchange::{ConversionResult, ExchangeRateInput, ExchangeRateTool};
pub use flights::{FlightOffer, FlightSearchInput, FlightSearchTool};
pub use hotels::{HotelOffer, HotelSearchInput, HotelSearchTool};
pub use places::{NearbyPlacesInput, NearbyPlacesTool, PlaceDetail, Review};

use crate::config::TravelCrewConfig;
use crate::locations::CityCodeTable;
use crate::{Result, TravelCrewError};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// One argument accepted by a tool
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParameterSpec {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl ParameterSpec {
    #[must_use]
    pub const fn required(name: &'static str, kind: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
        }
    }

    #[must_use]
    pub const fn optional(name: &'static str, kind: &'static str, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
        }
    }
}

/// Name, description and arguments of a tool, as shown to agents and the CLI
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSpec>,
}

/// A typed data retrieval capability
#[async_trait]
pub trait TravelTool: Send + Sync {
    type Input: DeserializeOwned + Send;
    type Output: Serialize + Send;

    fn definition(&self) -> ToolDefinition;

    async fn call(&self, input: Self::Input) -> Result<Self::Output>;
}

/// Object-safe view of a [`TravelTool`] working on JSON values
#[async_trait]
pub trait DynTool: Send + Sync {
    fn tool_definition(&self) -> ToolDefinition;

    async fn invoke(&self, args: Value) -> Result<Value>;
}

#[async_trait]
impl<T: TravelTool> DynTool for T {
    fn tool_definition(&self) -> ToolDefinition {
        self.definition()
    }

    async fn invoke(&self, args: Value) -> Result<Value> {
        let name = self.definition().name;
        let input: T::Input = serde_json::from_value(args).map_err(|e| {
            TravelCrewError::validation(format!("Invalid arguments for {name}: {e}"))
        })?;
        let output = self.call(input).await?;
        Ok(serde_json::to_value(output)?)
    }
}

/// Name-indexed collection of tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn DynTool>>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the four travel tools from configuration. Each tool creates its
    /// own provider client once, here.
    pub fn from_config(config: &TravelCrewConfig, cities: Arc<CityCodeTable>) -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(FlightSearchTool::new(
            &config.amadeus,
            Arc::clone(&cities),
        )?));
        registry.register(Arc::new(HotelSearchTool::new(&config.amadeus, cities)?));
        registry.register(Arc::new(NearbyPlacesTool::new(&config.places)?));
        registry.register(Arc::new(ExchangeRateTool::new(&config.exchange)?));
        info!("Registered {} tools", registry.len());
        Ok(registry)
    }

    /// Add a tool, replacing any tool registered under the same name
    pub fn register(&mut self, tool: Arc<dyn DynTool>) {
        let name = tool.tool_definition().name;
        if self.tools.insert(name, tool).is_some() {
            warn!("Tool '{}' registered twice, keeping the latest", name);
        }
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn DynTool>> {
        self.tools.get(name).cloned()
    }

    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.tool_definition()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Run the named tool with JSON arguments
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<Value> {
        let tool = self.get(name).ok_or_else(|| {
            let known: Vec<&str> = self.tools.keys().copied().collect();
            TravelCrewError::validation(format!(
                "Unknown tool '{name}'. Available: {}",
                known.join(", ")
            ))
        })?;
        tool.invoke(args).await
    }
}
