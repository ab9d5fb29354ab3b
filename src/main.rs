//! `TravelCrew` command line interface

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, info};
use travelcrew::tools::{
    ExchangeRateInput, ExchangeRateTool, FlightSearchInput, FlightSearchTool, HotelSearchInput,
    HotelSearchTool, NearbyPlacesInput, NearbyPlacesTool,
};
use travelcrew::{
    ChatCompletionBackend, CityCodeTable, Pipeline, ToolRegistry, TravelCrewConfig,
    TravelCrewError, TravelTool, logging,
};

/// Travel itinerary planner
#[derive(Parser, Debug)]
#[command(name = "travelcrew")]
#[command(about = "Plan trips with flight, hotel, place and currency data")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search one-way flight offers
    Flights {
        /// Departure city, e.g. 인천
        origin: String,
        /// Arrival city, e.g. 오사카
        destination: String,
        /// Departure date (YYYY-MM-DD)
        date: NaiveDate,
        #[arg(long, default_value_t = 1)]
        adults: u32,
    },
    /// Search priced hotels in a city
    Hotels {
        city: String,
        check_in: NaiveDate,
        check_out: NaiveDate,
        #[arg(long, default_value_t = 1)]
        adults: u32,
        /// Number of candidates to price
        #[arg(long)]
        max_hotels: Option<u32>,
    },
    /// Find attractions near a place
    Places {
        place: String,
        /// Radius in meters
        #[arg(long, default_value_t = 1000)]
        radius: u32,
    },
    /// Convert an amount between currencies
    Convert {
        from: String,
        to: String,
        amount: f64,
    },
    /// Run any tool by name with JSON arguments
    Tool {
        name: String,
        /// Arguments as a JSON object
        args: String,
    },
    /// List tools and the city table
    Tools,
    /// Generate a full itinerary from a free-text request
    Plan {
        request: String,
        /// Markdown output file (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<TravelCrewError>() {
                Some(err) => {
                    eprintln!("Error: {}", err.user_message());
                    eprintln!("Details: {err}");
                }
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config = TravelCrewConfig::load_from_path(cli.config.clone())
        .context("Failed to load configuration")?;
    logging::init(&config.logging, cli.verbose)?;
    debug!("Configuration loaded");

    let cities = Arc::new(CityCodeTable::load(config.locations.table_path.as_deref())?);

    match cli.command {
        Commands::Flights {
            origin,
            destination,
            date,
            adults,
        } => {
            let tool = FlightSearchTool::new(&config.amadeus, cities)?;
            let offers = tool
                .call(FlightSearchInput {
                    origin_city: origin,
                    destination_city: destination,
                    departure_date: date,
                    adults,
                })
                .await?;
            print_json(&offers)
        }
        Commands::Hotels {
            city,
            check_in,
            check_out,
            adults,
            max_hotels,
        } => {
            let tool = HotelSearchTool::new(&config.amadeus, cities)?;
            let offers = tool
                .call(HotelSearchInput {
                    city_name: city,
                    check_in_date: check_in,
                    check_out_date: check_out,
                    adults,
                    max_hotels,
                })
                .await?;
            print_json(&offers)
        }
        Commands::Places { place, radius } => {
            let tool = NearbyPlacesTool::new(&config.places)?;
            let places = tool
                .call(NearbyPlacesInput {
                    place_name: place,
                    radius,
                })
                .await?;
            print_json(&places)
        }
        Commands::Convert { from, to, amount } => {
            let tool = ExchangeRateTool::new(&config.exchange)?;
            let result = tool
                .call(ExchangeRateInput {
                    from_currency: from,
                    to_currency: to,
                    amount,
                })
                .await?;
            print_json(&result)
        }
        Commands::Tool { name, args } => {
            let args: serde_json::Value = serde_json::from_str(&args)
                .map_err(|e| TravelCrewError::validation(format!("Arguments are not JSON: {e}")))?;
            let registry = ToolRegistry::from_config(&config, cities)?;
            let output = registry.dispatch(&name, args).await?;
            print_json(&output)
        }
        Commands::Tools => {
            let registry = ToolRegistry::from_config(&config, Arc::clone(&cities))?;
            let city_list: Vec<_> = cities
                .cities()
                .map(|(name, code)| json!({"name": name, "code": code}))
                .collect();
            print_json(&json!({
                "city_table_version": cities.version(),
                "cities": city_list,
                "tools": registry.definitions(),
            }))
        }
        Commands::Plan { request, output } => {
            let registry = ToolRegistry::from_config(&config, cities)?;
            let pipeline = Pipeline::travel_coordinator();
            pipeline.check_tools(&registry)?;
            let backend =
                ChatCompletionBackend::new(&config.llm)?.with_tools(registry.definitions());
            let itinerary = pipeline.run(&backend, &request).await?;

            let path = output.unwrap_or(config.output.path);
            itinerary.write_to(&path)?;
            print!("{}", itinerary.to_markdown());
            info!("Plan complete");
            Ok(())
        }
    }
}
