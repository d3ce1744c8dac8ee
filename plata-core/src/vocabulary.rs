//! Merchant and keyword vocabulary mapping normalized text to categories.
//!
//! The tables are data, not code: a deployment can load its own JSON
//! vocabulary without touching the matching logic. The built-in default
//! covers common Paraguayan merchants and colloquial keywords.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::transaction::Category;

/// Known merchant name mapped to a category. Matching is by substring
/// containment in either direction over normalized text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MerchantRule {
    pub name: String,
    pub category: Category,
}

/// Regex pattern over the normalized message mapped to a category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordRule {
    pub pattern: String,
    pub category: Category,
}

/// The swappable category vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTable {
    pub merchants: Vec<MerchantRule>,
    pub keywords: Vec<KeywordRule>,
}

impl CategoryTable {
    /// Load a vocabulary from a JSON resource.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("parse category table JSON")
    }

    /// Look up a category for an already-normalized merchant name.
    /// Containment goes both ways so "biggie express" hits the "biggie"
    /// rule and "farma" hits "farmacenter".
    pub fn merchant_category(&self, normalized_merchant: &str) -> Option<Category> {
        if normalized_merchant.is_empty() {
            return None;
        }
        self.merchants
            .iter()
            .find(|r| {
                normalized_merchant.contains(r.name.as_str())
                    || r.name.contains(normalized_merchant)
            })
            .map(|r| r.category)
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        let merchants = [
            // Groceries
            ("biggie", Category::Supermercado),
            ("stock", Category::Supermercado),
            ("superseis", Category::Supermercado),
            ("super seis", Category::Supermercado),
            ("salemma", Category::Supermercado),
            ("arete", Category::Supermercado),
            ("gran via", Category::Supermercado),
            // Fuel and rides
            ("petrobras", Category::Transporte),
            ("shell", Category::Transporte),
            ("puma", Category::Transporte),
            ("copetrol", Category::Transporte),
            ("barcos y rodados", Category::Transporte),
            ("uber", Category::Transporte),
            ("bolt", Category::Transporte),
            ("muv", Category::Transporte),
            // Food
            ("mcdonald", Category::Comida),
            ("burger king", Category::Comida),
            ("pizza hut", Category::Comida),
            ("mostaza", Category::Comida),
            ("lomiteria", Category::Comida),
            ("bellini", Category::Comida),
            // Utilities and telcos
            ("ande", Category::Servicios),
            ("essap", Category::Servicios),
            ("tigo", Category::Servicios),
            ("personal", Category::Servicios),
            ("claro", Category::Servicios),
            ("copaco", Category::Servicios),
            // Health
            ("farmacenter", Category::Salud),
            ("punto farma", Category::Salud),
            ("farmacia catedral", Category::Salud),
            // Entertainment
            ("netflix", Category::Entretenimiento),
            ("spotify", Category::Entretenimiento),
            ("cinemark", Category::Entretenimiento),
        ];

        let keywords = [
            (r"\b(nafta|combustible|gasoil|colectivo|pasaje|peaje)\b", Category::Transporte),
            (r"\b(almuerzo|cena|desayuno|lomito|empanada|asado|hamburguesa|pizza)\b", Category::Comida),
            (r"\b(super|supermercado|despensa|verduleria|mercado)\b", Category::Supermercado),
            (r"\b(farmacia|remedio|medico|consulta|dentista)\b", Category::Salud),
            (r"\b(luz|agua|internet|wifi|saldo|recarga|factura)\b", Category::Servicios),
            (r"\b(cine|juego|salida|cumple|cumpleanos)\b", Category::Entretenimiento),
            (r"\b(cuota|colegio|facultad|universidad|curso|fotocopia)\b", Category::Educacion),
            (r"\b(alquiler|expensas|muebles|electrodomestico)\b", Category::Hogar),
        ];

        CategoryTable {
            merchants: merchants
                .into_iter()
                .map(|(name, category)| MerchantRule {
                    name: name.to_string(),
                    category,
                })
                .collect(),
            keywords: keywords
                .into_iter()
                .map(|(pattern, category)| KeywordRule {
                    pattern: pattern.to_string(),
                    category,
                })
                .collect(),
        }
    }
}

/// Lowercase and strip Spanish diacritics so table entries and regexes can
/// stay plain-ASCII.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_diacritics() {
        assert_eq!(normalize("Gasté en Ñemby"), "gaste en nemby");
        assert_eq!(normalize("  CAMIÓN  "), "camion");
    }

    #[test]
    fn test_merchant_lookup_both_directions() {
        let table = CategoryTable::default();
        // merchant text contains the rule
        assert_eq!(table.merchant_category("biggie express"), Some(Category::Supermercado));
        // rule contains the merchant text
        assert_eq!(table.merchant_category("farmacenter"), Some(Category::Salud));
        assert_eq!(table.merchant_category("punto"), Some(Category::Salud));
        assert_eq!(table.merchant_category("kiosco lila"), None);
        assert_eq!(table.merchant_category(""), None);
    }

    #[test]
    fn test_from_json_round_trip() {
        let table = CategoryTable::default();
        let json = serde_json::to_string(&table).unwrap();
        let loaded = CategoryTable::from_json_str(&json).unwrap();
        assert_eq!(loaded, table);
    }

    #[test]
    fn test_custom_vocabulary_loads() {
        let json = r#"{
            "merchants": [{"name": "kiosco lila", "category": "otros"}],
            "keywords": [{"pattern": "\\bterere\\b", "category": "comida"}]
        }"#;
        let table = CategoryTable::from_json_str(json).unwrap();
        assert_eq!(table.merchant_category("kiosco lila"), Some(Category::Otros));
        assert_eq!(table.keywords.len(), 1);
    }

    #[test]
    fn test_default_keyword_patterns_compile() {
        for rule in CategoryTable::default().keywords {
            assert!(regex::Regex::new(&rule.pattern).is_ok(), "bad pattern: {}", rule.pattern);
        }
    }
}
