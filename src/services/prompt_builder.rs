//! Renders a [`TripRequest`] into the two chat turns sent to the model.
//!
//! Pure templating: every supplied field is interpolated verbatim, every
//! missing one becomes a fixed sentinel, and the output contract (JSON shape,
//! budget ceiling, day numbering, error form) is always spelled out.

use crate::{
    services::completion::ChatMessage,
    types::trip::{TravelPreferences, TripRequest},
};

pub const SYSTEM_INSTRUCTION: &str = "Você é um assistente especializado em planejamento de viagens. \
Você cria roteiros personalizados, detalhados e realistas, e responde exclusivamente em JSON.";

/// Opening of the sentence that carries the budget ceiling; always present in the prompt.
pub const BUDGET_CONSTRAINT: &str = "O custo total da viagem (custo_total_viagem) NÃO pode exceder o orçamento de";

const RESPONSE_TEMPLATE: &str = r#"{
  "plano_viagem": [
    {
      "dia": 1,
      "data": "Data específica ou relativa",
      "destino": "Nome do destino",
      "hospedagem": "Nome e descrição da hospedagem",
      "custo_hospedagem": "Custo estimado da hospedagem no dia",
      "transporte": "Detalhes do transporte do dia",
      "custo_transporte": "Custo estimado do transporte no dia",
      "custo_alimentacao": "Custo estimado das refeições no dia",
      "atividades": [
        {
          "nome": "Nome do local ou atividade",
          "descricao": "Breve descrição",
          "custo": "Custo estimado"
        }
      ],
      "custo_total_dia": "Custo total estimado para o dia"
    }
  ],
  "custo_total_viagem": "Custo total estimado para toda a viagem",
  "dicas": ["Dica 1", "Dica 2"]
}"#;

const ERROR_TEMPLATE: &str = r#"{"erro": "Motivo pelo qual não é possível montar o plano"}"#;

/// The rendered system and user turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidePrompt {
    pub system: String,
    pub user: String,
}

impl GuidePrompt {
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system.clone()),
            ChatMessage::user(self.user.clone()),
        ]
    }
}

pub fn build_prompt(request: &TripRequest) -> GuidePrompt {
    GuidePrompt {
        system: SYSTEM_INSTRUCTION.to_string(),
        user: render_user_instruction(request),
    }
}

fn or_sentinel(value: Option<&str>, sentinel: &str) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(sentinel)
        .to_string()
}

fn render_user_instruction(request: &TripRequest) -> String {
    let prefs: &TravelPreferences = request.preferences();
    let budget = request.budget();
    let travelers = request.travelers();
    let start = request.start_date().map(|d| d.to_string());
    let end = request.end_date().map(|d| d.to_string());
    let days = request.day_count();

    let duration = match days {
        Some(days) => days.to_string(),
        None => "não especificada".to_string(),
    };

    let profile = [
        ("Nome", request.traveler_name().to_string()),
        ("Orçamento total", format!("{budget} reais")),
        ("Descrição da viagem", or_sentinel(request.description(), "não informada")),
        ("Clima preferido", or_sentinel(prefs.climate.as_deref(), "não especificado")),
        ("Interesses", or_sentinel(prefs.interests.as_deref(), "não especificados")),
        ("Data de início da viagem", or_sentinel(start.as_deref(), "não especificada")),
        ("Data de fim da viagem", or_sentinel(end.as_deref(), "não especificada")),
        ("Duração em dias", duration),
        ("Número de viajantes", travelers.to_string()),
        (
            "Tipo de acomodação preferida",
            or_sentinel(prefs.accommodation.as_deref(), "não especificada"),
        ),
        (
            "Meio de transporte preferido",
            or_sentinel(prefs.transport.as_deref(), "não especificado"),
        ),
        (
            "Dietas ou restrições alimentares",
            or_sentinel(prefs.dietary_restrictions.as_deref(), "nenhuma"),
        ),
        ("Companhia de viagem", or_sentinel(prefs.companions.as_deref(), "não especificada")),
        (
            "Nível de atividade física",
            or_sentinel(prefs.activity_level.as_deref(), "não especificado"),
        ),
        ("Idiomas falados", or_sentinel(prefs.languages.as_deref(), "não especificado")),
        (
            "Necessidades especiais ou acessibilidade",
            or_sentinel(prefs.accessibility.as_deref(), "nenhuma"),
        ),
        ("Faixa etária", or_sentinel(prefs.age_range.as_deref(), "não especificada")),
        (
            "Destinos ou experiências anteriores",
            or_sentinel(prefs.prior_experiences.as_deref(), "nenhuma"),
        ),
    ];

    let mut out = String::from("Informações do viajante:\n");
    for (label, value) in &profile {
        out.push_str(&format!("- {label}: {value}\n"));
    }

    out.push_str(
        "\nObjetivo:\n\
         - Elaborar um plano de viagem completo, organizado por dia, que caiba estritamente no orçamento.\n\
         - Incluir destino, hospedagem, transporte, alimentação e atividades de cada dia, com custos estimados.\n\
         - Respeitar interesses, dietas, acessibilidade, idiomas e nível de atividade física informados.\n\
         - Incluir dicas úteis para economizar e aproveitar a viagem.\n",
    );

    out.push_str("\nFormato da resposta:\nRetorne SOMENTE um JSON no seguinte formato:\n\n");
    out.push_str(RESPONSE_TEMPLATE);
    out.push_str("\n\nRegras obrigatórias:\n");
    out.push_str(&format!("- {BUDGET_CONSTRAINT} {budget} reais.\n"));
    match days {
        Some(days) => out.push_str(&format!(
            "- O plano deve conter exatamente {days} dias, com o campo \"dia\" numerado de 1 a {days}, sem lacunas nem repetições.\n"
        )),
        None => out.push_str(
            "- Numere os dias sequencialmente a partir de 1, sem lacunas nem repetições.\n",
        ),
    }
    out.push_str(
        "- Mantenha a mesma hospedagem enquanto o viajante permanecer na mesma cidade.\n\
         - Recomende locais reais e específicos, citando o nome de hotéis, restaurantes e atrações sempre que possível.\n",
    );
    out.push_str(&format!(
        "- Todos os custos devem considerar {travelers} viajante(s): multiplique os custos por pessoa pelo número de viajantes.\n"
    ));
    out.push_str(
        "- Informe os custos como números ou valores em reais, sem intervalos.\n\
         - O JSON deve ser válido e todos os campos devem estar preenchidos.\n\
         - Não inclua nenhum texto fora do JSON.\n",
    );

    out.push_str(
        "\nSe não for possível elaborar um plano dentro do orçamento ou atender às preferências, \
         retorne apenas um JSON de erro no seguinte formato:\n\n",
    );
    out.push_str(ERROR_TEMPLATE);
    out.push('\n');

    out
}
