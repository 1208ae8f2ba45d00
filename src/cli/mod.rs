use crate::{
    build_prompt, GuideConfig, ItineraryId, ItineraryPipeline, JsonDirGateway, OwnerId,
    PersistenceGateway, TripRequest,
};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, sync::Arc, time::Duration};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_STORE_DIR: &str = ".itinerary-store";

/// Trip flags and the form keys they feed.
const TRIP_FLAGS: [(&str, &str, &str); 18] = [
    ("name", "nome", "Traveler name"),
    ("budget", "orcamento", "Total budget in reais, e.g. 2500 or \"R$ 2.500,00\""),
    ("description", "descricao", "Free-text description of the trip"),
    ("climate", "clima", "Preferred climate"),
    ("interests", "interesses", "Interests, e.g. \"praias, museus\""),
    ("start-date", "data_inicio", "Start date (YYYY-MM-DD or DD/MM/YYYY)"),
    ("end-date", "data_fim", "End date (YYYY-MM-DD or DD/MM/YYYY)"),
    ("days", "dias", "Trip length in days"),
    ("travelers", "viajantes", "Number of travelers"),
    ("accommodation", "acomodacao", "Preferred accommodation"),
    ("transport", "transporte", "Preferred transport"),
    ("diet", "dietas", "Dietary restrictions"),
    ("companions", "companhia", "Travel companions"),
    ("activity-level", "atividade_fisica", "Physical activity level"),
    ("languages", "idiomas", "Languages spoken"),
    ("accessibility", "acessibilidade", "Accessibility needs"),
    ("age-range", "faixa_etaria", "Age range"),
    ("experiences", "experiencias", "Previous destinations or experiences"),
];

fn store_dir_arg() -> Arg {
    Arg::new("store-dir")
        .short('s')
        .long("store-dir")
        .value_name("DIR")
        .help("Directory holding stored itineraries")
        .default_value(DEFAULT_STORE_DIR)
}

fn command() -> Command {
    let mut plan = Command::new("plan")
        .about("Generate, validate and store an itinerary")
        .arg(
            Arg::new("owner")
                .short('o')
                .long("owner")
                .value_name("ID")
                .help("Owner the itinerary is filed under (defaults to --name)"),
        )
        .arg(store_dir_arg())
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("MODEL")
                .help("Completion model (or set ITINERARY_MODEL)"),
        )
        .arg(
            Arg::new("api-key")
                .short('k')
                .long("api-key")
                .value_name("KEY")
                .help("API key (or set OPENAI_API_KEY env var)"),
        )
        .arg(
            Arg::new("base-url")
                .short('u')
                .long("base-url")
                .value_name("URL")
                .help("Base URL (or set OPENAI_BASE_URL / OPENROUTER_BASE_URL env vars)"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("SECONDS")
                .help("Request timeout in seconds; no deadline when omitted"),
        )
        .arg(
            Arg::new("prompt-only")
                .long("prompt-only")
                .action(ArgAction::SetTrue)
                .help("Print the rendered prompt and exit without calling the model"),
        );

    for (flag, _, help) in TRIP_FLAGS {
        let required = matches!(flag, "name" | "budget");
        plan = plan.arg(
            Arg::new(flag)
                .long(flag)
                .value_name("VALUE")
                .help(help)
                .required(required),
        );
    }

    Command::new("itinerary")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Budget-constrained travel itineraries from a chat-completion model")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(plan)
        .subcommand(
            Command::new("show")
                .about("Print a stored itinerary")
                .arg(Arg::new("id").help("Itinerary id").required(true).index(1))
                .arg(store_dir_arg()),
        )
        .subcommand(
            Command::new("history")
                .about("List the itinerary ids filed under an owner")
                .arg(Arg::new("owner").help("Owner id").required(true).index(1))
                .arg(store_dir_arg()),
        )
}

/// CLI entry point for the itinerary tool
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match command().get_matches().subcommand() {
        Some(("plan", matches)) => plan(matches).await,
        Some(("show", matches)) => show(matches).await,
        Some(("history", matches)) => history(matches).await,
        _ => Ok(()),
    }
}

fn trip_request(matches: &ArgMatches) -> crate::Result<TripRequest> {
    TripRequest::from_form(TRIP_FLAGS.iter().filter_map(|(flag, key, _)| {
        matches
            .get_one::<String>(flag)
            .map(|value| (key.to_string(), value.clone()))
    }))
}

async fn open_store(matches: &ArgMatches) -> crate::Result<JsonDirGateway> {
    let dir = matches
        .get_one::<String>("store-dir")
        .map(String::as_str)
        .unwrap_or(DEFAULT_STORE_DIR);
    JsonDirGateway::open(dir).await
}

async fn plan(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let request = trip_request(matches)?;

    if matches.get_flag("prompt-only") {
        let prompt = build_prompt(&request);
        println!("[system]\n{}\n\n[user]\n{}", prompt.system, prompt.user);
        return Ok(());
    }

    let api_key = matches.get_one::<String>("api-key").cloned();
    let mut config = GuideConfig::from_lookup(|key| match key {
        "OPENAI_API_KEY" => api_key.clone().or_else(|| env::var(key).ok()),
        _ => env::var(key).ok(),
    })?;
    if let Some(model) = matches.get_one::<String>("model") {
        config = config.with_model(model.as_str());
    }
    if let Some(base_url) = matches.get_one::<String>("base-url") {
        config = config.with_base_url(base_url.as_str());
    }
    if let Some(timeout) = matches.get_one::<String>("timeout") {
        config = config.with_timeout(Duration::from_secs(timeout.parse()?));
    }

    let owner = OwnerId::new(
        matches
            .get_one::<String>("owner")
            .map(String::as_str)
            .unwrap_or(request.traveler_name()),
    );
    let store = open_store(matches).await?;
    info!("Using model: {}", config.model());
    info!("Base URL: {}", config.base_url());
    info!("Store: {}", store.root().display());

    let pipeline = ItineraryPipeline::from_config(&config, Arc::new(store))?;
    match pipeline.generate(&owner, &request).await {
        Ok(stored) => {
            println!("{}\n", stored.itinerary.render());
            println!("{}", serde_json::to_string_pretty(&stored.to_payload())?);
            info!("Itinerary {} stored for {}", stored.id, owner);
        }
        Err(rejection) => {
            error!("Itinerary rejected: {}", rejection.reason);
            println!("{}", serde_json::to_string_pretty(&rejection.to_payload())?);
            return Err(rejection.into());
        }
    }

    Ok(())
}

async fn show(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let raw_id = matches
        .get_one::<String>("id")
        .ok_or("an itinerary id is required")?;
    let id = ItineraryId::parse(raw_id).ok_or_else(|| format!("`{raw_id}` is not an itinerary id"))?;

    let store = open_store(matches).await?;
    let itinerary = store
        .find(&id)
        .await?
        .ok_or_else(|| format!("no itinerary {id} in {}", store.root().display()))?;

    println!("{}\n", itinerary.render());
    println!("{}", serde_json::to_string_pretty(&itinerary)?);
    Ok(())
}

async fn history(matches: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let owner = OwnerId::new(
        matches
            .get_one::<String>("owner")
            .ok_or("an owner id is required")?
            .as_str(),
    );

    let store = open_store(matches).await?;
    let ids = store.history(&owner).await?;
    if ids.is_empty() {
        println!("Nenhum plano de viagem para {owner}.");
    }
    for id in ids {
        let summary = match store.find(&id).await? {
            Some(itinerary) => format!(
                "{} dia(s), custo total {}",
                itinerary.days.len(),
                itinerary.total_cost
            ),
            None => "removido".to_string(),
        };
        println!("{id}  {summary}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_is_well_formed() {
        command().debug_assert();
    }

    #[test]
    fn test_trip_flags_map_to_form_keys() {
        let matches = command().get_matches_from([
            "itinerary",
            "plan",
            "--name",
            "Ana",
            "--budget",
            "R$ 1.500,00",
            "--interests",
            "praias",
            "--days",
            "4",
            "--travelers",
            "2",
        ]);
        let (_, plan) = matches.subcommand().unwrap();
        let request = trip_request(plan).unwrap();

        assert_eq!(request.traveler_name(), "Ana");
        assert_eq!(request.budget().to_string(), "1500.00");
        assert_eq!(request.day_count(), Some(4));
        assert_eq!(request.travelers(), 2);
        assert_eq!(request.preferences().interests.as_deref(), Some("praias"));
    }
}
