use crate::{
    error::{GuideError, Result},
    types::money::parse_amount,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d/%m/%Y"];

/// Optional traveler preferences, each interpolated into the prompt when present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelPreferences {
    pub climate: Option<String>,
    pub interests: Option<String>,
    pub accommodation: Option<String>,
    pub transport: Option<String>,
    pub dietary_restrictions: Option<String>,
    pub companions: Option<String>,
    pub activity_level: Option<String>,
    pub languages: Option<String>,
    pub accessibility: Option<String>,
    pub age_range: Option<String>,
    pub prior_experiences: Option<String>,
}

/// A validated trip request. Only [`TripRequestBuilder::build`] produces one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripRequest {
    traveler_name: String,
    budget: Decimal,
    description: Option<String>,
    preferences: TravelPreferences,
    days: Option<u32>,
    travelers: u32,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
}

impl TripRequest {
    pub fn builder(traveler_name: impl Into<String>, budget: Decimal) -> TripRequestBuilder {
        TripRequestBuilder {
            request: TripRequest {
                traveler_name: traveler_name.into(),
                budget,
                description: None,
                preferences: TravelPreferences::default(),
                days: None,
                travelers: 1,
                start_date: None,
                end_date: None,
            },
        }
    }

    /// Build a request from form-encoded key/value pairs. Blank values count as absent.
    pub fn from_form<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut fields: HashMap<String, String> = HashMap::new();
        for (key, value) in pairs {
            let value = value.into().trim().to_string();
            if !value.is_empty() {
                fields.insert(key.into(), value);
            }
        }
        let mut take = |key: &str| fields.remove(key);

        let name = take("nome")
            .ok_or_else(|| GuideError::InvalidRequest("`nome` is required".to_string()))?;
        let budget_text = take("orcamento")
            .ok_or_else(|| GuideError::InvalidRequest("`orcamento` is required".to_string()))?;
        let budget = parse_amount(&budget_text).ok_or_else(|| {
            GuideError::InvalidRequest(format!("`orcamento` is not an amount: {budget_text}"))
        })?;

        let mut builder = TripRequest::builder(name, budget);
        builder.request.description = take("descricao");
        builder.request.preferences = TravelPreferences {
            climate: take("clima"),
            interests: take("interesses"),
            accommodation: take("acomodacao"),
            transport: take("transporte"),
            dietary_restrictions: take("dietas"),
            companions: take("companhia"),
            activity_level: take("atividade_fisica"),
            languages: take("idiomas"),
            accessibility: take("acessibilidade"),
            age_range: take("faixa_etaria"),
            prior_experiences: take("experiencias"),
        };
        if let Some(days) = take("dias") {
            builder = builder.days(parse_count("dias", &days)?);
        }
        if let Some(travelers) = take("viajantes") {
            builder = builder.travelers(parse_count("viajantes", &travelers)?);
        }
        if let Some(start) = take("data_inicio") {
            builder = builder.start_date(parse_date("data_inicio", &start)?);
        }
        if let Some(end) = take("data_fim") {
            builder = builder.end_date(parse_date("data_fim", &end)?);
        }

        builder.build()
    }

    pub fn traveler_name(&self) -> &str {
        &self.traveler_name
    }

    pub fn budget(&self) -> Decimal {
        self.budget
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn preferences(&self) -> &TravelPreferences {
        &self.preferences
    }

    pub fn travelers(&self) -> u32 {
        self.travelers
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.start_date
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.end_date
    }

    /// Declared trip length: explicit day count, else the inclusive date span.
    pub fn day_count(&self) -> Option<u32> {
        self.days.or_else(|| {
            let (start, end) = (self.start_date?, self.end_date?);
            u32::try_from((end - start).num_days() + 1).ok()
        })
    }
}

#[derive(Debug, Clone)]
pub struct TripRequestBuilder {
    request: TripRequest,
}

impl TripRequestBuilder {
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.request.description = Some(description.into());
        self
    }

    pub fn preferences(mut self, preferences: TravelPreferences) -> Self {
        self.request.preferences = preferences;
        self
    }

    pub fn days(mut self, days: u32) -> Self {
        self.request.days = Some(days);
        self
    }

    pub fn travelers(mut self, travelers: u32) -> Self {
        self.request.travelers = travelers;
        self
    }

    pub fn start_date(mut self, date: NaiveDate) -> Self {
        self.request.start_date = Some(date);
        self
    }

    pub fn end_date(mut self, date: NaiveDate) -> Self {
        self.request.end_date = Some(date);
        self
    }

    pub fn build(self) -> Result<TripRequest> {
        let request = self.request;
        let invalid = |reason: &str| Err(GuideError::InvalidRequest(reason.to_string()));

        if request.traveler_name.trim().is_empty() {
            return invalid("traveler name must not be empty");
        }
        if request.budget <= Decimal::ZERO {
            return invalid("budget must be greater than zero");
        }
        if request.days == Some(0) {
            return invalid("day count must be at least 1");
        }
        if request.travelers == 0 {
            return invalid("traveler count must be at least 1");
        }
        if let (Some(start), Some(end)) = (request.start_date, request.end_date) {
            if end < start {
                return invalid("end date precedes start date");
            }
        }
        if request.description.is_none()
            && request.preferences.climate.is_none()
            && request.preferences.interests.is_none()
        {
            return invalid("a trip description, climate or interests must be given");
        }

        Ok(request)
    }
}

fn parse_count(field: &str, value: &str) -> Result<u32> {
    value.parse::<u32>().map_err(|err| {
        GuideError::InvalidRequest(format!("`{field}` is not a whole number ({value}): {err}"))
    })
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
        .ok_or_else(|| GuideError::InvalidRequest(format!("`{field}` is not a date: {value}")))
}
