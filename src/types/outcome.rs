use super::{
    ids::{ItineraryId, OwnerId},
    itinerary::Itinerary,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Why no itinerary was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectionReason {
    /// The model answered with `{"erro": ...}`.
    ModelReportedInfeasible,
    /// The plan's total is above the traveler's budget.
    BudgetExceeded,
    /// The completion text could not be turned into an itinerary.
    MalformedResponse,
    /// The completion call or the store failed.
    UpstreamFailure,
}

impl RejectionReason {
    pub fn tag(&self) -> &'static str {
        match self {
            RejectionReason::ModelReportedInfeasible => "model-reported-infeasible",
            RejectionReason::BudgetExceeded => "budget-exceeded",
            RejectionReason::MalformedResponse => "malformed-response",
            RejectionReason::UpstreamFailure => "upstream-failure",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A tagged, user-facing refusal. Internal detail never ends up in `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{reason}: {message}")]
pub struct Rejection {
    pub reason: RejectionReason,
    pub message: String,
}

impl Rejection {
    pub fn new(reason: RejectionReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    /// The model's own explanation, passed through verbatim.
    pub fn infeasible(message: impl Into<String>) -> Self {
        Self::new(RejectionReason::ModelReportedInfeasible, message)
    }

    pub fn budget_exceeded() -> Self {
        Self::new(
            RejectionReason::BudgetExceeded,
            "Desculpe, o plano de viagem excede o seu orçamento. Por favor, tente novamente com um orçamento maior.",
        )
    }

    pub fn malformed() -> Self {
        Self::new(
            RejectionReason::MalformedResponse,
            "Desculpe, ocorreu um erro ao processar o plano de viagem. Por favor, tente novamente mais tarde.",
        )
    }

    pub fn upstream() -> Self {
        Self::new(
            RejectionReason::UpstreamFailure,
            "Desculpe, ocorreu um erro ao gerar o plano de viagem. Por favor, tente novamente mais tarde.",
        )
    }

    pub fn to_payload(&self) -> Value {
        serde_json::json!({
            "rejection": {
                "reason": self.reason.tag(),
                "message": self.message,
            }
        })
    }
}

/// A validated itinerary after it has been stored and linked to its owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistedItinerary {
    #[serde(rename = "_id")]
    pub id: ItineraryId,
    #[serde(rename = "dono")]
    pub owner: OwnerId,
    #[serde(flatten)]
    pub itinerary: Itinerary,
}

impl PersistedItinerary {
    pub fn to_payload(&self) -> Value {
        serde_json::json!({ "itinerary": self })
    }
}
