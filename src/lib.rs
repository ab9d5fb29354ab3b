//! `TravelCrew` - multi-stage travel itinerary planning
//!
//! This library provides the data tools (flights, hotels, nearby places,
//! currency conversion) and the sequential agent pipeline that turns a
//! free-text travel request into a Markdown itinerary.

pub mod amadeus;
pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod itinerary;
pub mod llm;
pub mod locations;
pub mod logging;
pub mod pipeline;
pub mod tools;

// Re-export core types for public API
pub use auth::{TokenCache, TokenState};
pub use config::TravelCrewConfig;
pub use error::TravelCrewError;
pub use itinerary::Itinerary;
pub use llm::ChatCompletionBackend;
pub use locations::CityCodeTable;
pub use pipeline::{AgentBackend, Pipeline, Stage, StageOutput};
pub use tools::{DynTool, ToolDefinition, ToolRegistry, TravelTool};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, TravelCrewError>;
