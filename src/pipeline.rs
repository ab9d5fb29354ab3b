//! Sequential agent pipeline
//!
//! A [`Pipeline`] is a declared list of [`Stage`]s run strictly in order. Each
//! stage names the earlier stages whose output it receives as context. The
//! text generation itself sits behind [`AgentBackend`].

use crate::itinerary::Itinerary;
use crate::tools::ToolRegistry;
use crate::{Result, TravelCrewError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument};

/// One agent task in the pipeline
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stage {
    pub name: String,
    /// Persona the agent plays
    pub role: String,
    pub goal: String,
    /// What the agent is asked to do
    pub description: String,
    pub expected_output: String,
    /// Indices of earlier stages whose output is passed along
    pub context: Vec<usize>,
    /// Data tools the agent may consult, by registry name
    #[serde(default)]
    pub tools: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageOutput {
    pub stage: String,
    pub text: String,
}

/// Produces the text for one stage
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn run_stage(
        &self,
        stage: &Stage,
        request: &str,
        context: &[&StageOutput],
    ) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Build a pipeline, checking that every context reference points backwards
    pub fn new(stages: Vec<Stage>) -> Result<Self> {
        if stages.is_empty() {
            return Err(TravelCrewError::validation("a pipeline needs at least one stage"));
        }
        for (index, stage) in stages.iter().enumerate() {
            if let Some(bad) = stage.context.iter().find(|&&c| c >= index) {
                return Err(TravelCrewError::validation(format!(
                    "stage '{}' uses stage {bad} as context, which does not run before it",
                    stage.name
                )));
            }
        }
        Ok(Self { stages })
    }

    /// Outline, local enrichment, final formatting
    #[must_use]
    pub fn travel_coordinator() -> Self {
        let stages = vec![
            Stage {
                name: "trip_outline".into(),
                role: "Travel information specialist".into(),
                goal: "Find suitable round-trip flights and lodging and draft a day-by-day plan"
                    .into(),
                description: "Based on the customer's request, write a travel plan that \
                    includes round-trip flights and lodging."
                    .into(),
                expected_output: "A day-by-day base itinerary and cost draft written in Korean, \
                    including round-trip flights and lodging."
                    .into(),
                context: vec![],
                tools: vec!["flight_search".into(), "hotel_search".into()],
            },
            Stage {
                name: "local_enrichment".into(),
                role: "Local recommendation guide".into(),
                goal: "Enrich the plan with popular local food and sights and an exchange-rate \
                    aware budget"
                    .into(),
                description: "Review the day-by-day plan and costs from the previous step. Add \
                    popular local restaurants and dishes for breakfast, lunch, dinner and snacks \
                    (with prices) and recommend sights worth visiting (with costs). Then write a \
                    detailed travel budget that accounts for the exchange rate, with every line \
                    item clearly broken down."
                    .into(),
                expected_output: "An updated day-by-day itinerary written in Korean with a \
                    detailed budget table, local restaurants and sights."
                    .into(),
                context: vec![0],
                tools: vec!["nearby_places".into(), "exchange_rate".into()],
            },
            Stage {
                name: "final_itinerary".into(),
                role: "Travel coordinator".into(),
                goal: "Deliver a clean, customer-ready itinerary".into(),
                description: "Combine the results of the previous steps into a final itinerary \
                    and present the daily schedule and budget clearly and readably for the \
                    customer."
                    .into(),
                expected_output: "A final travel plan in Korean Markdown for the customer: \
                    flight details, lodging details, total cost, daily schedule, detailed budget \
                    table and additional notes."
                    .into(),
                context: vec![1],
                tools: vec![],
            },
        ];
        Self { stages }
    }

    #[must_use]
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Check that every tool a stage names is registered
    pub fn check_tools(&self, registry: &ToolRegistry) -> Result<()> {
        for stage in &self.stages {
            if let Some(missing) = stage.tools.iter().find(|t| registry.get(t).is_none()) {
                return Err(TravelCrewError::validation(format!(
                    "stage '{}' uses tool '{missing}', which is not registered",
                    stage.name
                )));
            }
        }
        Ok(())
    }

    /// Run every stage in order and collect the outputs
    #[instrument(name = "pipeline", skip_all, fields(stages = self.stages.len()))]
    pub async fn run(&self, backend: &dyn AgentBackend, request: &str) -> Result<Itinerary> {
        let request = request.trim();
        if request.is_empty() {
            return Err(TravelCrewError::validation("travel request must not be empty"));
        }

        let mut outputs: Vec<StageOutput> = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            let started = Instant::now();
            let text = {
                let context: Vec<&StageOutput> =
                    stage.context.iter().map(|&i| &outputs[i]).collect();
                backend.run_stage(stage, request, &context).await?
            };
            info!(
                "Stage '{}' finished in {:.1}s ({} chars)",
                stage.name,
                started.elapsed().as_secs_f64(),
                text.chars().count()
            );

            outputs.push(StageOutput {
                stage: stage.name.clone(),
                text,
            });
        }

        Ok(Itinerary::new(request, outputs))
    }
}
