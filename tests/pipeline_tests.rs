use async_trait::async_trait;
use itinerary_rs::{
    services::{Completion, CompletionRequest},
    CompletionClient, GenerationSettings, GuideError, InMemoryGateway, Itinerary, ItineraryId,
    ItineraryPipeline, OwnerId, PersistenceGateway, RejectionReason, TripRequest,
    ValidationPolicy,
};
use rust_decimal::Decimal;
use serde_json::json;
use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

/// Completion client that answers with a fixed script and records what it was asked.
struct ScriptedClient {
    reply: Result<String, fn() -> GuideError>,
    calls: AtomicUsize,
    last_request: Mutex<Option<CompletionRequest>>,
}

impl ScriptedClient {
    fn answering(reply: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(reply.into()),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    fn failing(error: fn() -> GuideError) -> Arc<Self> {
        Arc::new(Self {
            reply: Err(error),
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> itinerary_rs::Result<Completion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request.clone());
        match &self.reply {
            Ok(text) => Ok(Completion::text(text.clone())),
            Err(error) => Err(error()),
        }
    }
}

/// In-memory gateway that counts writes and can be told to fail the history append.
#[derive(Default)]
struct CountingGateway {
    inner: InMemoryGateway,
    inserts: AtomicUsize,
    appends: AtomicUsize,
    removes: AtomicUsize,
    fail_append: AtomicBool,
}

impl CountingGateway {
    fn writes(&self) -> usize {
        self.inserts.load(Ordering::SeqCst) + self.appends.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceGateway for CountingGateway {
    async fn insert(&self, itinerary: &Itinerary) -> itinerary_rs::Result<ItineraryId> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(itinerary).await
    }

    async fn append_to_user_history(
        &self,
        owner: &OwnerId,
        id: &ItineraryId,
    ) -> itinerary_rs::Result<()> {
        if self.fail_append.load(Ordering::SeqCst) {
            return Err(GuideError::Storage("history collection unavailable".to_string()));
        }
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.inner.append_to_user_history(owner, id).await
    }

    async fn remove(&self, id: &ItineraryId) -> itinerary_rs::Result<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(id).await
    }

    async fn find(&self, id: &ItineraryId) -> itinerary_rs::Result<Option<Itinerary>> {
        self.inner.find(id).await
    }

    async fn history(&self, owner: &OwnerId) -> itinerary_rs::Result<Vec<ItineraryId>> {
        self.inner.history(owner).await
    }
}

fn request(budget: &str, days: u32) -> TripRequest {
    TripRequest::builder("Ana", Decimal::from_str(budget).unwrap())
        .description("Praias de Pernambuco")
        .days(days)
        .build()
        .unwrap()
}

fn plan_text(days: &[u32], total: &str) -> String {
    let days: Vec<_> = days
        .iter()
        .map(|idx| {
            json!({
                "dia": idx,
                "data": format!("Dia {idx}"),
                "destino": "Porto de Galinhas",
                "hospedagem": "Pousada Tabapitanga",
                "custo_hospedagem": "R$ 250,00",
                "transporte": "Buggy",
                "custo_transporte": 80,
                "custo_alimentacao": "R$ 70,00",
                "atividades": [
                    { "nome": "Piscinas naturais", "descricao": "Jangada até os corais", "custo": "R$ 40,00" }
                ],
                "custo_total_dia": "R$ 440,00"
            })
        })
        .collect();

    json!({
        "plano_viagem": days,
        "custo_total_viagem": total,
        "dicas": ["Confira a tábua de marés"]
    })
    .to_string()
}

fn pipeline(client: Arc<ScriptedClient>, gateway: Arc<CountingGateway>) -> ItineraryPipeline {
    ItineraryPipeline::new(client, gateway)
}

#[tokio::test]
async fn test_accepted_plan_is_persisted_with_owner_metadata() {
    let client = ScriptedClient::answering(plan_text(&[1, 2, 3], "R$ 800,00"));
    let gateway = Arc::new(CountingGateway::default());
    let owner = OwnerId::new("ana@example.com");

    let stored = pipeline(client.clone(), gateway.clone())
        .generate(&owner, &request("1000.00", 3))
        .await
        .unwrap();

    assert_eq!(client.calls(), 1);
    assert_eq!(gateway.inserts.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.appends.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.history(&owner).await.unwrap(), vec![stored.id]);

    let itinerary = &stored.itinerary;
    assert_eq!(itinerary.days.len(), 3);
    assert_eq!(itinerary.owner_name.as_deref(), Some("Ana"));
    assert_eq!(itinerary.budget.as_deref(), Some("1000.00"));
    assert_eq!(
        itinerary.total_cost.amount(),
        Some(Decimal::from_str("800").unwrap())
    );
    assert_eq!(gateway.find(&stored.id).await.unwrap().as_ref(), Some(itinerary));

    let payload = stored.to_payload();
    assert_eq!(payload["itinerary"]["_id"], stored.id.to_string());
    assert_eq!(payload["itinerary"]["dono"], "ana@example.com");
    assert_eq!(payload["itinerary"]["nome"], "Ana");
}

#[tokio::test]
async fn test_plan_over_budget_is_rejected_without_writes() {
    let client = ScriptedClient::answering(plan_text(&[1, 2, 3], "1200.00"));
    let gateway = Arc::new(CountingGateway::default());

    let rejection = pipeline(client.clone(), gateway.clone())
        .generate(&OwnerId::new("ana"), &request("1000.00", 3))
        .await
        .unwrap_err();

    assert_eq!(rejection.reason, RejectionReason::BudgetExceeded);
    assert!(rejection.message.contains("excede o seu orçamento"));
    assert_eq!(client.calls(), 1);
    assert_eq!(gateway.writes(), 0);
}

#[tokio::test]
async fn test_overflowing_total_is_over_budget_not_free() {
    for literal in ["1e40", "100000000000000000000000000000"] {
        let reply = plan_text(&[1, 2], "TOTAL").replace("\"TOTAL\"", literal);
        let client = ScriptedClient::answering(reply);
        let gateway = Arc::new(CountingGateway::default());

        let rejection = pipeline(client, gateway.clone())
            .generate(&OwnerId::new("ana"), &request("1000.00", 2))
            .await
            .unwrap_err();

        assert_eq!(rejection.reason, RejectionReason::BudgetExceeded, "{literal}");
        assert_eq!(gateway.writes(), 0);
    }
}

#[tokio::test]
async fn test_total_equal_to_budget_is_accepted() {
    let client = ScriptedClient::answering(plan_text(&[1, 2], "1000"));
    let gateway = Arc::new(CountingGateway::default());

    let result = pipeline(client, gateway.clone())
        .generate(&OwnerId::new("ana"), &request("1000.00", 2))
        .await;

    assert!(result.is_ok());
    assert_eq!(gateway.writes(), 2);
}

#[tokio::test]
async fn test_model_reported_infeasible_passes_message_through() {
    let client = ScriptedClient::answering(
        r#"{"erro": "Não é possível viajar 10 dias para Paris com R$ 300."}"#,
    );
    let gateway = Arc::new(CountingGateway::default());

    let rejection = pipeline(client, gateway.clone())
        .generate(&OwnerId::new("ana"), &request("300", 10))
        .await
        .unwrap_err();

    assert_eq!(rejection.reason, RejectionReason::ModelReportedInfeasible);
    assert_eq!(
        rejection.message,
        "Não é possível viajar 10 dias para Paris com R$ 300."
    );
    assert_eq!(gateway.writes(), 0);
}

#[tokio::test]
async fn test_prose_without_json_is_malformed() {
    let client = ScriptedClient::answering("Desculpe, não consigo ajudar com isso.");
    let gateway = Arc::new(CountingGateway::default());

    let rejection = pipeline(client, gateway.clone())
        .generate(&OwnerId::new("ana"), &request("1000", 3))
        .await
        .unwrap_err();

    assert_eq!(rejection.reason, RejectionReason::MalformedResponse);
    assert_eq!(gateway.writes(), 0);
}

#[tokio::test]
async fn test_json_wrapped_in_prose_is_extracted() {
    let wrapped = format!(
        "Aqui está o seu roteiro:\n```json\n{}\n```\nBoa viagem!",
        plan_text(&[1, 2], "R$ 880,00")
    );
    let client = ScriptedClient::answering(wrapped);
    let gateway = Arc::new(CountingGateway::default());

    let stored = pipeline(client, gateway)
        .generate(&OwnerId::new("ana"), &request("900", 2))
        .await
        .unwrap();

    assert_eq!(stored.itinerary.days.len(), 2);
}

#[tokio::test]
async fn test_completion_failure_is_upstream_and_not_retried() {
    let client = ScriptedClient::failing(|| GuideError::Api {
        status: 503,
        message: "overloaded".to_string(),
    });
    let gateway = Arc::new(CountingGateway::default());

    let rejection = pipeline(client.clone(), gateway.clone())
        .generate(&OwnerId::new("ana"), &request("1000", 3))
        .await
        .unwrap_err();

    assert_eq!(rejection.reason, RejectionReason::UpstreamFailure);
    assert!(!rejection.message.contains("overloaded"));
    assert_eq!(client.calls(), 1);
    assert_eq!(gateway.writes(), 0);
}

#[tokio::test]
async fn test_history_failure_removes_inserted_itinerary() {
    let client = ScriptedClient::answering(plan_text(&[1, 2, 3], "700"));
    let gateway = Arc::new(CountingGateway::default());
    gateway.fail_append.store(true, Ordering::SeqCst);

    let rejection = pipeline(client, gateway.clone())
        .generate(&OwnerId::new("ana"), &request("1000", 3))
        .await
        .unwrap_err();

    assert_eq!(rejection.reason, RejectionReason::UpstreamFailure);
    assert_eq!(gateway.inserts.load(Ordering::SeqCst), 1);
    assert_eq!(gateway.removes.load(Ordering::SeqCst), 1);
    assert!(gateway.inner.is_empty().await);
    assert!(gateway.history(&OwnerId::new("ana")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_irregular_days_depend_on_policy() {
    let gapped = plan_text(&[1, 3, 4], "500");
    let owner = OwnerId::new("ana");

    let lenient = pipeline(
        ScriptedClient::answering(gapped.clone()),
        Arc::new(CountingGateway::default()),
    )
    .generate(&owner, &request("1000", 3))
    .await
    .unwrap();
    assert_eq!(lenient.itinerary.days.len(), 3);

    let gateway = Arc::new(CountingGateway::default());
    let strict = pipeline(ScriptedClient::answering(gapped), gateway.clone())
        .with_policy(ValidationPolicy {
            strict_days: true,
            ..Default::default()
        })
        .generate(&owner, &request("1000", 3))
        .await
        .unwrap_err();
    assert_eq!(strict.reason, RejectionReason::MalformedResponse);
    assert_eq!(gateway.writes(), 0);
}

#[tokio::test]
async fn test_unparsable_total_passes_budget_check_by_default() {
    let text = plan_text(&[1, 2], "a definir");
    let owner = OwnerId::new("ana");

    let stored = pipeline(
        ScriptedClient::answering(text.clone()),
        Arc::new(CountingGateway::default()),
    )
    .generate(&owner, &request("10", 2))
    .await
    .unwrap();
    assert!(!stored.itinerary.total_cost.is_known());

    let strict = pipeline(
        ScriptedClient::answering(text),
        Arc::new(CountingGateway::default()),
    )
    .with_policy(ValidationPolicy {
        strict_total: true,
        ..Default::default()
    })
    .generate(&owner, &request("10", 2))
    .await
    .unwrap_err();
    assert_eq!(strict.reason, RejectionReason::MalformedResponse);
}

#[tokio::test]
async fn test_prompt_and_settings_reach_the_client() {
    let client = ScriptedClient::answering(plan_text(&[1], "100"));
    let gateway = Arc::new(CountingGateway::default());

    pipeline(client.clone(), gateway)
        .with_settings(GenerationSettings {
            temperature: 0.1,
            max_tokens: 1234,
        })
        .generate(&OwnerId::new("ana"), &request("4321.09", 1))
        .await
        .unwrap();

    let sent = client.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(sent.max_tokens, 1234);
    assert_eq!(sent.messages.len(), 2);
    assert!(sent.messages[1].content.contains("4321.09"));
    assert!(sent.messages[1].content.contains("Praias de Pernambuco"));
}
