//! Turns a JSON candidate into an [`Itinerary`] or a [`Rejection`].
//!
//! Order matters: syntax, then the model's own `erro` verdict, then the budget
//! ceiling, then the shape of the plan. Numbers are read as exact decimals
//! throughout; a budget comparison never touches binary floating point.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::types::{
    itinerary::Itinerary,
    money::{read_amount, Amount},
    outcome::Rejection,
    response::decode_structured,
    trip::TripRequest,
};

const ERROR_KEY: &str = "erro";
const TOTAL_KEY: &str = "custo_total_viagem";
const DEFAULT_INFEASIBLE_MESSAGE: &str = "Desculpe, não é possível elaborar um plano de viagem completo dentro do orçamento e preferências fornecidos.";

/// How forgiving validation is about fields the model tends to garble.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationPolicy {
    /// Reject when `custo_total_viagem` is missing or unreadable instead of
    /// treating it as zero. The lenient default lets such a plan pass the
    /// budget check.
    pub strict_total: bool,
    /// Reject plans whose day indices are not exactly `1..=N`.
    pub strict_days: bool,
}

#[derive(Debug, Clone, Default)]
pub struct GuideValidator {
    policy: ValidationPolicy,
}

impl GuideValidator {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }

    /// Validate one candidate against the request it answers. Never panics on
    /// model output; every failure maps to a [`Rejection`].
    pub fn validate(&self, candidate: &str, request: &TripRequest) -> Result<Itinerary, Rejection> {
        let payload: Value = serde_json::from_str(candidate).map_err(|err| {
            warn!(
                target: "itinerary::validator",
                error = %err,
                candidate,
                "completion candidate is not valid JSON"
            );
            Rejection::malformed()
        })?;

        let Some(object) = payload.as_object() else {
            warn!(
                target: "itinerary::validator",
                candidate,
                "completion candidate is not a JSON object"
            );
            return Err(Rejection::malformed());
        };

        if let Some(reason) = object.get(ERROR_KEY) {
            let message = infeasible_message(reason);
            info!(target: "itinerary::validator", %message, "model reported no feasible plan");
            return Err(Rejection::infeasible(message));
        }

        let budget = request.budget();
        let total = self.read_total(object, budget)?;
        if total > budget {
            info!(
                target: "itinerary::validator",
                %total,
                %budget,
                "plan total exceeds budget"
            );
            return Err(Rejection::budget_exceeded());
        }

        let mut itinerary: Itinerary = decode_structured(&payload).map_err(|err| {
            warn!(
                target: "itinerary::validator",
                error = %err,
                candidate,
                "completion does not match the itinerary shape"
            );
            Rejection::malformed()
        })?;
        itinerary.days.sort_by_key(|day| day.day);

        let sequence = itinerary.day_sequence(request.day_count());
        if !sequence.is_contiguous() {
            warn!(
                target: "itinerary::validator",
                sequence = ?sequence,
                strict = self.policy.strict_days,
                "itinerary day indices are irregular"
            );
            if self.policy.strict_days {
                return Err(Rejection::malformed());
            }
        }

        itinerary.attach_owner(request);
        debug!(
            target: "itinerary::validator",
            days = itinerary.days.len(),
            %total,
            "itinerary accepted"
        );
        Ok(itinerary)
    }

    fn read_total(
        &self,
        object: &Map<String, Value>,
        budget: Decimal,
    ) -> Result<Decimal, Rejection> {
        let raw = object.get(TOTAL_KEY);
        match raw.and_then(read_amount) {
            Some(Amount::Exact(total)) => return Ok(total),
            Some(Amount::Inexact(nearest)) => {
                warn!(
                    target: "itinerary::validator",
                    raw = ?raw,
                    %nearest,
                    "plan total cannot be represented exactly"
                );
                // Rounding may have pulled an over-budget total down to the ceiling.
                return Err(if nearest >= budget {
                    Rejection::budget_exceeded()
                } else {
                    Rejection::malformed()
                });
            }
            None => {}
        }

        if self.policy.strict_total {
            warn!(
                target: "itinerary::validator",
                raw = ?raw,
                "unreadable plan total rejected"
            );
            return Err(Rejection::malformed());
        }

        // Lenient fallback: an unreadable total always passes the budget check.
        warn!(
            target: "itinerary::validator",
            raw = ?raw,
            "unreadable plan total treated as zero"
        );
        Ok(Decimal::ZERO)
    }
}

fn infeasible_message(reason: &Value) -> String {
    match reason {
        Value::String(text) if !text.trim().is_empty() => text.clone(),
        Value::String(_) | Value::Null => DEFAULT_INFEASIBLE_MESSAGE.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::outcome::RejectionReason;
    use serde_json::json;
    use std::str::FromStr;

    fn request(budget: &str) -> TripRequest {
        TripRequest::builder("Ana", Decimal::from_str(budget).unwrap())
            .description("Serra gaúcha")
            .days(2)
            .build()
            .unwrap()
    }

    fn plan(total: Value) -> String {
        json!({
            "plano_viagem": [
                {
                    "dia": 1,
                    "data": "Sexta",
                    "destino": "Gramado",
                    "hospedagem": "Hotel Serra Azul",
                    "custo_hospedagem": "R$ 300,00",
                    "atividades": [
                        { "nome": "Lago Negro", "descricao": "Pedalinho", "custo": 40 }
                    ],
                    "custo_total_dia": "R$ 400,00"
                },
                { "dia": 2, "destino": "Canela", "custo_total_dia": 350.5 }
            ],
            "custo_total_viagem": total,
            "dicas": ["Leve casaco"]
        })
        .to_string()
    }

    fn reason(result: Result<Itinerary, Rejection>) -> RejectionReason {
        result.unwrap_err().reason
    }

    #[test]
    fn test_accepts_plan_within_budget_and_attaches_owner() {
        let validator = GuideValidator::default();
        let itinerary = validator
            .validate(&plan(json!("R$ 750,50")), &request("1000.00"))
            .unwrap();

        assert_eq!(itinerary.days.len(), 2);
        assert_eq!(
            itinerary.total_cost.amount(),
            Some(Decimal::from_str("750.50").unwrap())
        );
        assert_eq!(itinerary.owner_name.as_deref(), Some("Ana"));
        assert_eq!(itinerary.budget.as_deref(), Some("1000.00"));
        assert_eq!(itinerary.tips, vec!["Leve casaco".to_string()]);
    }

    #[test]
    fn test_budget_boundary_is_exact() {
        let validator = GuideValidator::default();

        assert!(validator
            .validate(&plan(json!("1000.00")), &request("1000"))
            .is_ok());
        assert!(validator
            .validate(&plan(json!(1000)), &request("1000.00"))
            .is_ok());
        assert_eq!(
            reason(validator.validate(&plan(json!("1000.01")), &request("1000.00"))),
            RejectionReason::BudgetExceeded
        );
        assert_eq!(
            reason(validator.validate(&plan(json!(1000.001)), &request("1000"))),
            RejectionReason::BudgetExceeded
        );
        assert!(validator
            .validate(&plan(json!(999.999)), &request("1000"))
            .is_ok());

        // In a string, a lone mark before exactly three digits is digit grouping.
        assert_eq!(
            reason(validator.validate(&plan(json!("1000.001")), &request("1000"))).tag(),
            "budget-exceeded"
        );
        assert!(validator
            .validate(&plan(json!("1.000,001")), &request("1000.001"))
            .is_ok());
    }

    #[test]
    fn test_unrepresentable_totals_never_pass_as_zero() {
        let validator = GuideValidator::default();
        let literal = |text: &str| serde_json::from_str::<Value>(text).unwrap();

        for total in [
            literal("1e40"),
            literal("100000000000000000000000000000"),
            literal("1000.00000000000000000000000000001"),
            json!("R$ 100.000.000.000.000.000.000.000.000.000,00"),
        ] {
            assert_eq!(
                reason(validator.validate(&plan(total.clone()), &request("1000.00"))),
                RejectionReason::BudgetExceeded,
                "total {total}"
            );
        }

        // Too precise but clearly under budget is a garbled answer, not a free pass.
        assert_eq!(
            reason(validator.validate(&plan(literal("1e-50")), &request("1000.00"))),
            RejectionReason::MalformedResponse
        );
        assert_eq!(
            reason(validator.validate(&plan(literal("-1e40")), &request("1000.00"))),
            RejectionReason::MalformedResponse
        );

        // Padding zeros past the decimal scale limit lose nothing.
        assert!(validator
            .validate(
                &plan(literal("1000.000000000000000000000000000000")),
                &request("1000.00")
            )
            .is_ok());
    }

    #[test]
    fn test_float_drift_does_not_leak_into_comparison() {
        let validator = GuideValidator::default();
        // 0.1 + 0.2 style literals stay exact.
        assert!(validator
            .validate(&plan(json!(0.3)), &request("0.30"))
            .is_ok());
        assert!(validator
            .validate(&plan(json!(1234.10)), &request("1234.1"))
            .is_ok());
    }

    #[test]
    fn test_error_key_wins_over_everything() {
        let validator = GuideValidator::default();
        let result = validator.validate(
            r#"{"erro": "orçamento insuficiente", "custo_total_viagem": "99999"}"#,
            &request("10"),
        );

        let rejection = result.unwrap_err();
        assert_eq!(rejection.reason, RejectionReason::ModelReportedInfeasible);
        assert_eq!(rejection.message, "orçamento insuficiente");
    }

    #[test]
    fn test_malformed_inputs() {
        let validator = GuideValidator::default();
        for candidate in ["", "{", "[1, 2]", "{\"plano_viagem\": \"nada\"}"] {
            assert_eq!(
                reason(validator.validate(candidate, &request("500"))),
                RejectionReason::MalformedResponse,
                "candidate {candidate:?}"
            );
        }
    }

    #[test]
    fn test_unreadable_total_falls_back_to_zero() {
        let validator = GuideValidator::default();
        for total in [json!("a combinar"), json!(""), Value::Null, json!({"valor": 1})] {
            let mut payload: Value = serde_json::from_str(&plan(Value::Null)).unwrap();
            payload["custo_total_viagem"] = total.clone();
            let result = validator.validate(&payload.to_string(), &request("1"));
            // Objects are a shape violation; everything else passes as zero.
            if total.is_object() {
                assert_eq!(reason(result), RejectionReason::MalformedResponse);
            } else {
                assert!(result.is_ok(), "total {total} should fall back to zero");
            }
        }

        let mut payload: Value = serde_json::from_str(&plan(Value::Null)).unwrap();
        payload.as_object_mut().unwrap().remove("custo_total_viagem");
        assert!(validator.validate(&payload.to_string(), &request("1")).is_ok());
    }

    #[test]
    fn test_strict_total_rejects_unreadable_total() {
        let validator = GuideValidator::new(ValidationPolicy {
            strict_total: true,
            ..Default::default()
        });
        assert_eq!(
            reason(validator.validate(&plan(json!("a combinar")), &request("1000"))),
            RejectionReason::MalformedResponse
        );
    }

    #[test]
    fn test_day_gaps_are_lenient_unless_strict() {
        let mut payload: Value = serde_json::from_str(&plan(json!("100"))).unwrap();
        payload["plano_viagem"][1]["dia"] = json!(3);
        let candidate = payload.to_string();

        assert!(GuideValidator::default()
            .validate(&candidate, &request("1000"))
            .is_ok());

        let strict = GuideValidator::new(ValidationPolicy {
            strict_days: true,
            ..Default::default()
        });
        assert_eq!(
            reason(strict.validate(&candidate, &request("1000"))),
            RejectionReason::MalformedResponse
        );
    }

    #[test]
    fn test_days_are_returned_in_index_order() {
        let mut payload: Value = serde_json::from_str(&plan(json!("100"))).unwrap();
        let days = payload["plano_viagem"].as_array_mut().unwrap();
        days.reverse();

        let itinerary = GuideValidator::default()
            .validate(&payload.to_string(), &request("1000"))
            .unwrap();
        let indices: Vec<u32> = itinerary.days.iter().map(|day| day.day).collect();
        assert_eq!(indices, vec![1, 2]);
    }
}
