use anyhow::Context;
use async_trait::async_trait;
use itinerary_rs::{
    services::{Completion, CompletionRequest},
    CompletionClient, GuideConfig, InMemoryGateway, ItineraryPipeline, OwnerId,
    PersistenceGateway, TripRequest,
};
use std::sync::Arc;

/// Offline stand-in used when no API key is configured.
#[derive(Debug)]
struct CannedCompletion;

#[async_trait]
impl CompletionClient for CannedCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> itinerary_rs::Result<Completion> {
        Ok(Completion::text(
            r#"Claro! Segue o plano:
            {
              "plano_viagem": [
                {
                  "dia": 1,
                  "data": "Sexta-feira",
                  "destino": "Paraty",
                  "hospedagem": "Pousada do Sandi",
                  "custo_hospedagem": "R$ 620,00",
                  "transporte": "Ônibus Rio-Paraty",
                  "custo_transporte": "R$ 180,00",
                  "custo_alimentacao": "R$ 160,00",
                  "atividades": [
                    { "nome": "Centro Histórico", "descricao": "Caminhada pelas ruas de pedra", "custo": 0 }
                  ],
                  "custo_total_dia": "R$ 960,00"
                },
                {
                  "dia": 2,
                  "data": "Sábado",
                  "destino": "Paraty",
                  "hospedagem": "Pousada do Sandi",
                  "custo_hospedagem": "R$ 620,00",
                  "transporte": "Escuna",
                  "custo_transporte": "R$ 240,00",
                  "custo_alimentacao": "R$ 200,00",
                  "atividades": [
                    { "nome": "Passeio de escuna pelas ilhas", "descricao": "Parada para mergulho", "custo": "R$ 240,00" }
                  ],
                  "custo_total_dia": "R$ 1.060,00"
                }
              ],
              "custo_total_viagem": "R$ 2.020,00",
              "dicas": ["Reserve a escuna com antecedência", "Use calçado confortável no centro histórico"]
            }
            Boa viagem!"#,
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::try_init().ok();

    let gateway = Arc::new(InMemoryGateway::new());
    let pipeline = match GuideConfig::from_env() {
        Ok(config) => ItineraryPipeline::from_config(&config, gateway.clone())
            .context("building the completion client")?,
        Err(_) => {
            println!("OPENAI_API_KEY not set, using the offline sample answer.\n");
            ItineraryPipeline::new(Arc::new(CannedCompletion), gateway.clone())
        }
    };

    let request = TripRequest::from_form([
        ("nome", "Marina"),
        ("orcamento", "R$ 2.500,00"),
        ("descricao", "Fim de semana romântico em cidade histórica no litoral"),
        ("clima", "quente"),
        ("interesses", "história, praias, gastronomia"),
        ("dias", "2"),
        ("viajantes", "2"),
        ("acomodacao", "pousada"),
    ])
    .context("invalid trip request")?;
    let owner = OwnerId::new("marina@example.com");

    println!("=== Trip Planner ===\n");

    match pipeline.generate(&owner, &request).await {
        Ok(stored) => {
            println!("{}", stored.itinerary.render());
            println!(
                "\nStructured JSON:\n{}",
                serde_json::to_string_pretty(&stored.to_payload())?
            );
        }
        Err(rejection) => {
            eprintln!("Rejected ({}): {}", rejection.reason, rejection.message);
        }
    }

    let history = gateway.history(&owner).await?;
    println!("\n{} itinerary(ies) on file for {owner}", history.len());

    Ok(())
}
