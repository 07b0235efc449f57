//! # Question Answering
//!
//! Questions are matched against an ordered list of intents. The first intent
//! whose phrasing matches and whose columns resolve produces a canned finding,
//! which the completion service is then asked to elaborate on. Questions no
//! intent answers are sent to the service with the metrics as context.
use crate::classify::ColumnRoleMap;
use crate::classify::Role;
use crate::error::CfoError;
use crate::llm::CompletionRequest;
use crate::llm::CompletionService;
use crate::metrics::group_sum;
use crate::metrics::max_group;
use crate::metrics::numeric_column;
use crate::metrics::MetricsReport;
use crate::metrics::TopMetric;
use crate::render::render_report;
use crate::spreadsheet::cell::serial_to_datetime;
use crate::table::format_number;
use crate::table::UnifiedTable;
use crate::table::Value;
use chrono::Datelike;
use chrono::NaiveDate;
use log::debug;
use log::warn;
use regex::Regex;
use std::sync::OnceLock;

/// Characters of extracted text sent when there is no table
pub const RAW_TEXT_LIMIT: usize = 12_000;

static MOST_SOLD: Phrases = Phrases::new(&[
    "más vendido", "mas vendido", "más vendida", "mas vendida",
    "most sold", "best-selling", "best selling", "top seller",
]);
static CLIENT: Phrases = Phrases::new(&["cliente", "clientes", "client", "customer", "customers"]);
static SPENT: Phrases = Phrases::new(&["gastó", "gasto", "gastado", "compró", "compro", "spent", "spend"]);
static MONTH: Phrases = Phrases::new(&["mes", "meses", "month", "months"]);
static SALES: Phrases = Phrases::new(&[
    "venta", "ventas", "ingreso", "ingresos", "facturación", "facturacion", "facturado", "facturó",
    "sales", "revenue",
]);

const MONTH_NAMES: [&str; 12] = [
    "enero", "febrero", "marzo", "abril", "mayo", "junio",
    "julio", "agosto", "septiembre", "octubre", "noviembre", "diciembre",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d-%m-%Y"];

/// What the answers are computed from
#[derive(Clone, Copy, Debug)]
pub struct Context<'a> {
    /// The unified table, absent when no file yielded one
    pub table: Option<&'a UnifiedTable>,
    pub roles: &'a ColumnRoleMap,
    pub metrics: &'a MetricsReport,
    /// Text extracted from the uploads
    pub raw_text: &'a str,
}

/// The answer to one question.
/// A canned finding is kept even when its elaboration fails.
#[derive(Debug)]
pub struct Answer {
    pub finding: Option<String>,
    pub reply: Result<String, CfoError>,
}

struct Intent {
    name: &'static str,
    matches: fn(&str) -> bool,
    answer: fn(&Context) -> Option<String>,
}

const INTENTS: &[Intent] = &[
    Intent {
        name: "best-selling product",
        matches: |question| MOST_SOLD.found_in(question),
        answer: best_selling_product,
    },
    Intent {
        name: "top client",
        matches: |question| CLIENT.found_in(question) && SPENT.found_in(question),
        answer: top_client,
    },
    Intent {
        name: "best month",
        matches: |question| MONTH.found_in(question) && SALES.found_in(question),
        answer: best_month,
    },
];

/// Whole-word phrases, compiled into one pattern on first use
struct Phrases {
    words: &'static [&'static str],
    pattern: OnceLock<Regex>,
}

impl Phrases {
    const fn new(words: &'static [&'static str]) -> Self {
        Phrases {
            words,
            pattern: OnceLock::new(),
        }
    }

    fn found_in(&self, question: &str) -> bool {
        self.pattern
            .get_or_init(|| {
                let alternatives = self.words.iter().map(|word| regex::escape(word)).collect::<Vec<_>>();
                Regex::new(&format!(r"\b(?:{})\b", alternatives.join("|"))).expect("Hardcode regex pattern")
            })
            .is_match(question)
    }
}

fn best_selling_product(context: &Context) -> Option<String> {
    let (product, quantity) = context.metrics.top(TopMetric::Quantity)?.first()?;
    Some(format!(
        "El producto más vendido es {} con {} unidades.",
        product,
        format_number(*quantity)
    ))
}

fn top_client(context: &Context) -> Option<String> {
    let table = context.table?;
    let clients = table.column(context.roles.get(Role::Client)?)?;
    let revenue = numeric_column(table, context.roles.get(Role::Revenue)?)?;
    let (client, total) = max_group(group_sum(clients, revenue))?;
    Some(format!(
        "El cliente que más gastó es {}, con un total de {}.",
        client,
        format_number(total)
    ))
}

fn best_month(context: &Context) -> Option<String> {
    let table = context.table?;
    let months = table
        .column(context.roles.get(Role::Date)?)?
        .map(|value| match month_of(value) {
            Some(month) => Value::Text(MONTH_NAMES[month as usize - 1].to_owned()),
            None => Value::Empty,
        })
        .collect::<Vec<_>>();
    let revenue = numeric_column(table, context.roles.get(Role::Revenue)?)?;
    let (month, total) = max_group(group_sum(&months, revenue))?;
    Some(format!(
        "El mes con más ventas es {}, con un total de {}.",
        month,
        format_number(total)
    ))
}

/// Calendar month (1-12) of a date cell: ISO or day-first text, optionally
/// followed by a time, or a spreadsheet serial number.
pub(crate) fn month_of(value: &Value) -> Option<u32> {
    match value {
        Value::Number(serial) => serial_to_datetime(*serial, false).map(|date| date.month()),
        Value::Text(text) => {
            let text = text.trim();
            if let Ok(serial) = text.parse::<f64>() {
                return serial_to_datetime(serial, false).map(|date| date.month());
            }
            let date = text.split([' ', 'T']).next()?;
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
                .map(|date| date.month())
        }
        Value::Empty => None,
    }
}

/// Finding of the first matching intent that can be answered
pub fn canned_finding(question: &str, context: &Context) -> Option<String> {
    let question = question.to_lowercase();
    INTENTS
        .iter()
        .filter(|intent| (intent.matches)(&question))
        .find_map(|intent| {
            let finding = (intent.answer)(context);
            if finding.is_none() {
                debug!("Intent '{}' matched but its columns did not resolve", intent.name);
            }
            finding
        })
}

/// Asks for a short professional elaboration of a canned finding
pub fn elaboration_prompt(finding: &str, question: &str) -> String {
    format!(
        "Sos el CFO digital de la empresa. A la pregunta \"{question}\" ya se respondió con este dato: \
         \"{finding}\". Explicá brevemente y en tono profesional qué significa para el negocio."
    )
}

/// Context prompt for questions no intent answers
pub fn fallback_prompt(question: &str, context: &Context) -> String {
    let data = match context.table {
        Some(_) => {
            let report = render_report(context.metrics);
            if report.is_empty() {
                "No se pudieron calcular métricas con las columnas disponibles.".to_owned()
            } else {
                format!("Métricas de los datos cargados:\n{report}")
            }
        }
        None if !context.raw_text.trim().is_empty() => {
            let text = context.raw_text.chars().take(RAW_TEXT_LIMIT).collect::<String>();
            format!("Texto extraído de los archivos cargados:\n{text}")
        }
        None => "No se encontraron datos en los archivos cargados.".to_owned(),
    };
    format!("Sos el CFO digital de la empresa.\n{data}\n\nPregunta: {question}")
}

/// Answers questions through a completion service
pub struct QueryResponder<'s> {
    service: &'s dyn CompletionService,
    model: String,
    temperature: f32,
}

impl<'s> QueryResponder<'s> {
    pub fn new(service: &'s dyn CompletionService, model: impl Into<String>, temperature: f32) -> Self {
        QueryResponder {
            service,
            model: model.into(),
            temperature,
        }
    }

    pub fn answer(&self, question: &str, context: &Context) -> Answer {
        let finding = canned_finding(question, context);
        let prompt = match &finding {
            Some(finding) => elaboration_prompt(finding, question),
            None => fallback_prompt(question, context),
        };
        debug!("Prompt of {} character(s)", prompt.chars().count());
        let request = CompletionRequest {
            prompt,
            model: self.model.to_owned(),
            temperature: self.temperature,
        };
        let reply = self.service.complete(&request);
        if let Err(error) = &reply {
            warn!("Completion failed: {}", error);
        }
        Answer { finding, reply }
    }
}
