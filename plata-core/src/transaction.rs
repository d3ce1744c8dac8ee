//! Canonical extraction result types shared by the rules and model paths

use serde::{Deserialize, Serialize};

/// Movement direction. Always populated; defaults to `Expense` when the
/// message gives no explicit signal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Direction {
    #[serde(rename = "expense")]
    Expense,
    #[serde(rename = "income")]
    Income,
    #[serde(rename = "transfer")]
    Transfer,
}

impl Direction {
    /// Spanish display label
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Expense => "Gasto",
            Direction::Income => "Ingreso",
            Direction::Transfer => "Transferencia",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Direction::Expense => "💸",
            Direction::Income => "💰",
            Direction::Transfer => "🔁",
        }
    }

    /// Parse a wire value ("expense" / "income" / "transfer").
    /// Anything else is rejected — the model must not invent directions.
    pub fn parse(s: &str) -> Option<Direction> {
        match s.trim().to_lowercase().as_str() {
            "expense" => Some(Direction::Expense),
            "income" => Some(Direction::Income),
            "transfer" => Some(Direction::Transfer),
            _ => None,
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Expense
    }
}

/// Closed category vocabulary. The rules tables and the model prompt both
/// name exactly this set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    #[serde(rename = "supermercado")]
    Supermercado,
    #[serde(rename = "comida")]
    Comida,
    #[serde(rename = "transporte")]
    Transporte,
    #[serde(rename = "servicios")]
    Servicios,
    #[serde(rename = "salud")]
    Salud,
    #[serde(rename = "entretenimiento")]
    Entretenimiento,
    #[serde(rename = "educacion")]
    Educacion,
    #[serde(rename = "hogar")]
    Hogar,
    #[serde(rename = "otros")]
    Otros,
}

impl Category {
    /// Spanish display label
    pub fn label(&self) -> &'static str {
        match self {
            Category::Supermercado => "Supermercado",
            Category::Comida => "Comida",
            Category::Transporte => "Transporte",
            Category::Servicios => "Servicios",
            Category::Salud => "Salud",
            Category::Entretenimiento => "Entretenimiento",
            Category::Educacion => "Educación",
            Category::Hogar => "Hogar",
            Category::Otros => "Otros",
        }
    }

    /// Wire label used in tables, JSON vocabularies and the model prompt.
    pub fn wire_label(&self) -> &'static str {
        match self {
            Category::Supermercado => "supermercado",
            Category::Comida => "comida",
            Category::Transporte => "transporte",
            Category::Servicios => "servicios",
            Category::Salud => "salud",
            Category::Entretenimiento => "entretenimiento",
            Category::Educacion => "educacion",
            Category::Hogar => "hogar",
            Category::Otros => "otros",
        }
    }

    pub fn all() -> [Category; 9] {
        [
            Category::Supermercado,
            Category::Comida,
            Category::Transporte,
            Category::Servicios,
            Category::Salud,
            Category::Entretenimiento,
            Category::Educacion,
            Category::Hogar,
            Category::Otros,
        ]
    }

    /// Parse a category label leniently (case and diacritics ignored).
    pub fn parse_label(s: &str) -> Option<Category> {
        let norm = crate::vocabulary::normalize(s);
        Category::all()
            .into_iter()
            .find(|c| c.wire_label() == norm)
    }
}

/// Provenance of the final answer: never both paths at once.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExtractionMethod {
    #[serde(rename = "rules")]
    Rules,
    #[serde(rename = "model")]
    Model,
}

impl ExtractionMethod {
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionMethod::Rules => "reglas",
            ExtractionMethod::Model => "modelo IA",
        }
    }
}

/// The single canonical result type of the extraction pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractedTransaction {
    /// Positive amount in guaraníes, `None` when undetected
    pub amount: Option<u64>,
    pub direction: Direction,
    pub category: Option<Category>,
    pub merchant: Option<String>,
    pub notes: Option<String>,
    /// Heuristic completeness score in [0, 1], not a probability
    pub confidence: f64,
    pub method: ExtractionMethod,
    /// Untouched input, retained for audit/debugging
    pub original_message: String,
}

impl ExtractedTransaction {
    /// All-null result for a message where nothing was detected.
    pub fn empty(message: &str) -> Self {
        Self {
            amount: None,
            direction: Direction::Expense,
            category: None,
            merchant: None,
            notes: None,
            confidence: 0.0,
            method: ExtractionMethod::Rules,
            original_message: message.to_string(),
        }
    }

    /// True when a positive amount was detected.
    pub fn has_amount(&self) -> bool {
        self.amount.is_some_and(|a| a > 0)
    }
}
