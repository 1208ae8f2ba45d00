use crate::{completion_schema, types::money::Cost, types::trip::TripRequest};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Day-by-day travel plan produced by the model, plus owner metadata once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[completion_schema(name = "plano_viagem")]
pub struct Itinerary {
    /// One entry per day of the trip, numbered from 1
    #[serde(rename = "plano_viagem")]
    pub days: Vec<ItineraryDay>,
    /// Estimated cost of the whole trip for all travelers
    #[serde(rename = "custo_total_viagem", default)]
    pub total_cost: Cost,
    /// Practical tips for saving money and enjoying the trip
    #[serde(rename = "dicas", default)]
    pub tips: Vec<String>,
    /// Traveler name, attached after validation
    #[serde(rename = "nome", default, skip_serializing_if = "Option::is_none")]
    pub owner_name: Option<String>,
    /// Budget exactly as the traveler declared it
    #[serde(rename = "orcamento", default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<String>,
    /// Trip start date, attached after validation
    #[serde(rename = "data_inicio", default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
}

/// A single day of the itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ItineraryDay {
    /// 1-based day index
    #[serde(rename = "dia")]
    #[schemars(range(min = 1))]
    pub day: u32,
    /// Calendar or relative date label
    #[serde(rename = "data", default)]
    pub date: String,
    /// City or region where the traveler spends the day
    #[serde(rename = "destino", default)]
    pub destination: String,
    /// Where the traveler sleeps
    #[serde(rename = "hospedagem", default)]
    pub lodging: String,
    #[serde(rename = "custo_hospedagem", default)]
    pub lodging_cost: Cost,
    /// How the traveler gets around
    #[serde(rename = "transporte", default)]
    pub transport: String,
    #[serde(rename = "custo_transporte", default)]
    pub transport_cost: Cost,
    #[serde(rename = "custo_alimentacao", default)]
    pub food_cost: Cost,
    /// Activities in the order they happen
    #[serde(rename = "atividades", default)]
    pub activities: Vec<Activity>,
    #[serde(rename = "custo_total_dia", default)]
    pub total_cost: Cost,
}

impl ItineraryDay {
    /// Sum of the known cost components. Advisory only; never compared to `total_cost`.
    pub fn component_sum(&self) -> Decimal {
        [self.lodging_cost, self.transport_cost, self.food_cost]
            .into_iter()
            .chain(self.activities.iter().map(|activity| activity.cost))
            .filter_map(|cost| cost.amount())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Activity {
    /// Name of a real, specific venue or experience
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "descricao", alias = "descrição", default)]
    pub description: String,
    #[serde(rename = "custo", default)]
    pub cost: Cost,
}

/// Shape of the day indices compared against the declared trip length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DaySequence {
    Contiguous,
    Irregular {
        expected: u32,
        actual: usize,
        missing: Vec<u32>,
        duplicates: Vec<u32>,
        out_of_range: Vec<u32>,
    },
}

impl DaySequence {
    pub fn is_contiguous(&self) -> bool {
        matches!(self, DaySequence::Contiguous)
    }
}

impl Itinerary {
    /// Check that day indices form exactly `1..=N`. Without a declared `N`,
    /// the number of listed days is used.
    pub fn day_sequence(&self, declared: Option<u32>) -> DaySequence {
        let expected =
            declared.unwrap_or_else(|| u32::try_from(self.days.len()).unwrap_or(u32::MAX));

        let mut seen: BTreeMap<u32, usize> = BTreeMap::new();
        for day in &self.days {
            *seen.entry(day.day).or_default() += 1;
        }

        let missing: Vec<u32> = (1..=expected).filter(|idx| !seen.contains_key(idx)).collect();
        let duplicates: Vec<u32> = seen
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(idx, _)| *idx)
            .collect();
        let out_of_range: Vec<u32> = seen
            .keys()
            .copied()
            .filter(|idx| *idx == 0 || *idx > expected)
            .collect();

        if missing.is_empty() && duplicates.is_empty() && out_of_range.is_empty() {
            DaySequence::Contiguous
        } else {
            DaySequence::Irregular {
                expected,
                actual: self.days.len(),
                missing,
                duplicates,
                out_of_range,
            }
        }
    }

    /// Overwrite owner metadata with the values from the request.
    pub fn attach_owner(&mut self, request: &TripRequest) {
        self.owner_name = Some(request.traveler_name().to_string());
        self.budget = Some(request.budget().to_string());
        self.start_date = request.start_date().map(|date| date.to_string());
    }

    /// Plain-text rendering for terminals and logs.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();

        if let Some(name) = &self.owner_name {
            lines.push(format!("=== Plano de viagem de {name} ==="));
        } else {
            lines.push("=== Plano de viagem ===".to_string());
        }
        if let Some(budget) = &self.budget {
            lines.push(format!("Orçamento: {budget}"));
        }
        if let Some(start) = &self.start_date {
            lines.push(format!("Início: {start}"));
        }
        lines.push(format!("Custo total estimado: {}", self.total_cost));

        for day in &self.days {
            lines.push(String::new());
            lines.push(format!(
                "Dia {} ({}) - {} [{}]",
                day.day, day.date, day.destination, day.total_cost
            ));
            lines.push(format!("  Hospedagem: {} [{}]", day.lodging, day.lodging_cost));
            lines.push(format!("  Transporte: {} [{}]", day.transport, day.transport_cost));
            lines.push(format!("  Alimentação: [{}]", day.food_cost));
            for activity in &day.activities {
                lines.push(format!(
                    "  - {}: {} [{}]",
                    activity.name, activity.description, activity.cost
                ));
            }
        }

        if !self.tips.is_empty() {
            lines.push(String::new());
            lines.push("--- Dicas ---".to_string());
            lines.extend(self.tips.iter().map(|tip| format!("* {tip}")));
        }

        lines.join("\n")
    }
}
