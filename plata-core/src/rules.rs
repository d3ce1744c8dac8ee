//! Deterministic pattern extraction for Paraguayan Spanish money messages.
//!
//! This is intentionally non-LLM-first: cheap regexes and lookup tables
//! cover most messages, and only the leftovers are worth a model call.
//! `extract` is pure and total — it never errors, never calls out, and
//! always returns a value.

use anyhow::Result;
use regex::Regex;

use crate::transaction::{Category, Direction, ExtractedTransaction, ExtractionMethod};
use crate::vocabulary::{normalize, CategoryTable};

/// Words that end a merchant phrase.
const CONNECTORS: &[&str] = &[
    "por", "para", "con", "que", "porque", "cuando", "y", "a", "al", "el",
    "la", "los", "las", "mi", "un", "una", "este", "esta", "hoy", "ayer",
];

pub struct RulesExtractor {
    slang_amount: Regex,
    miles_amount: Regex,
    literal_amount: Regex,
    small_amount: Regex,
    expense: Regex,
    income: Regex,
    transfer: Regex,
    merchant: Regex,
    keywords: Vec<(Regex, Category)>,
    table: CategoryTable,
}

impl RulesExtractor {
    /// Extractor with the built-in Paraguayan vocabulary.
    pub fn new() -> Result<Self> {
        Self::with_table(CategoryTable::default())
    }

    /// Extractor over a caller-supplied vocabulary.
    pub fn with_table(table: CategoryTable) -> Result<Self> {
        let keywords = table
            .keywords
            .iter()
            .map(|r| Ok((Regex::new(&r.pattern)?, r.category)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            // "50 mil", "1.5 mil", "10 lucas", "5k"
            slang_amount: Regex::new(r"\b(\d+(?:[.,]\d+)?)\s*(?:mil|lucas|k)\b")?,
            // "3 miles"
            miles_amount: Regex::new(r"\b(\d+)\s*miles\b")?,
            // 4+ digits taken literally
            literal_amount: Regex::new(r"\b(\d{4,})\b")?,
            // 1-3 bare digits are colloquial thousands ("nafta 120" = 120.000 Gs.)
            small_amount: Regex::new(r"\b(\d{1,3})\b")?,
            expense: Regex::new(r"\b(gaste|gasto|pague|pago|compre|sali|egreso)\b")?,
            income: Regex::new(
                r"\b(cobre|cobro|recibi|deposito|depositaron|deposite|ingreso|sueldo|salario)\b",
            )?,
            transfer: Regex::new(r"\b(transferi|transfiero|transferencia|envie|mande)\b")?,
            merchant: Regex::new(
                r"(?i)\b(?:en\s+el|en\s+la|del|de|en)\s+([0-9a-záéíóúñü][0-9a-záéíóúñü\s]{0,29})",
            )?,
            keywords,
            table,
        })
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Extract a transaction guess from a raw message. Pure and total.
    pub fn extract(&self, message: &str) -> ExtractedTransaction {
        let normalized = normalize(message);
        let amount = self.detect_amount(&normalized);
        let direction = self.detect_direction(&normalized);
        let merchant = self.detect_merchant(message);
        let category = self.detect_category(merchant.as_deref(), &normalized);

        let mut confidence: f64 = 0.0;
        if amount.is_some() {
            confidence += 0.4;
        }
        // Direction bonus lands on every non-empty message, explicit
        // keyword or not. Observed production behavior, pinned by a
        // regression test below.
        if !normalized.is_empty() {
            confidence += 0.2;
        }
        if category.is_some() {
            confidence += 0.2;
        }
        if merchant.is_some() {
            confidence += 0.2;
        }

        ExtractedTransaction {
            amount,
            direction,
            category,
            merchant,
            notes: None,
            confidence: confidence.min(1.0),
            method: ExtractionMethod::Rules,
            original_message: message.to_string(),
        }
    }

    /// Priority order: slang multiplier, "miles", long literal, short
    /// colloquial thousands. First match wins; zero is not an amount.
    fn detect_amount(&self, normalized: &str) -> Option<u64> {
        if let Some(caps) = self.slang_amount.captures(normalized) {
            let n: f64 = caps[1].replace(',', ".").parse().ok()?;
            return Some((n * 1000.0).round() as u64).filter(|a| *a > 0);
        }
        if let Some(caps) = self.miles_amount.captures(normalized) {
            let n: u64 = caps[1].parse().ok()?;
            return n.checked_mul(1000).filter(|a| *a > 0);
        }
        if let Some(caps) = self.literal_amount.captures(normalized) {
            return caps[1].parse().ok();
        }
        if let Some(caps) = self.small_amount.captures(normalized) {
            let n: u64 = caps[1].parse().ok()?;
            return Some(n * 1000).filter(|a| *a > 0);
        }
        None
    }

    /// First keyword family that matches wins; `Expense` when none do.
    fn detect_direction(&self, normalized: &str) -> Direction {
        if self.expense.is_match(normalized) {
            Direction::Expense
        } else if self.income.is_match(normalized) {
            Direction::Income
        } else if self.transfer.is_match(normalized) {
            Direction::Transfer
        } else {
            Direction::Expense
        }
    }

    /// Preposition-anchored merchant phrase, cut at the first trailing
    /// connector word. Runs on the raw message to preserve accents.
    fn detect_merchant(&self, message: &str) -> Option<String> {
        let caps = self.merchant.captures(message)?;
        let phrase = caps[1].trim().to_string();
        let kept: Vec<&str> = phrase
            .split_whitespace()
            .take_while(|w| !CONNECTORS.contains(&normalize(w).as_str()))
            .collect();
        if kept.is_empty() {
            return None;
        }
        Some(kept.join(" "))
    }

    /// Merchant table first, keyword scan of the whole message second.
    fn detect_category(&self, merchant: Option<&str>, normalized: &str) -> Option<Category> {
        if let Some(m) = merchant {
            if let Some(cat) = self.table.merchant_category(&normalize(m)) {
                return Some(cat);
            }
        }
        self.keywords
            .iter()
            .find(|(re, _)| re.is_match(normalized))
            .map(|(_, cat)| *cat)
    }
}
