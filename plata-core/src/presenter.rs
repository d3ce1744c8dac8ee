//! Deterministic formatting of an extraction result into confirmation text.
//!
//! No side effects and no I/O: the chat layer decides where the text goes.

use crate::transaction::ExtractedTransaction;

/// Confidence below this gets a warning decoration.
pub const WARN_BELOW: f64 = 0.7;

/// Guaraní amount with dot thousands separators, "no detectado" when absent.
pub fn format_amount(amount: Option<u64>) -> String {
    match amount {
        Some(a) => format!("{} Gs.", thousands(a)),
        None => "no detectado".to_string(),
    }
}

fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}

/// Human-readable summary of an extracted transaction.
pub fn format_transaction(tx: &ExtractedTransaction) -> String {
    let mut lines = vec![
        format!("{} *{}*", tx.direction.emoji(), tx.direction.label()),
        format!("Monto: {}", format_amount(tx.amount)),
    ];
    if let Some(m) = &tx.merchant {
        lines.push(format!("Comercio: {m}"));
    }
    if let Some(c) = &tx.category {
        lines.push(format!("Categoría: {}", c.label()));
    }
    if let Some(n) = &tx.notes {
        lines.push(format!("Nota: {n}"));
    }
    lines.push(format!("Detectado por: {}", tx.method.label()));

    let pct = (tx.confidence * 100.0).round() as u32;
    if tx.confidence < WARN_BELOW {
        lines.push(format!("Confianza: {pct}% ⚠️ revisá los datos"));
    } else {
        lines.push(format!("Confianza: {pct}%"));
    }

    lines.join("\n")
}

/// Summary plus the yes/no question the chat layer sends back to the user.
pub fn confirmation_prompt(tx: &ExtractedTransaction) -> String {
    format!("{}\n\n¿Lo registro así? (sí / no)", format_transaction(tx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{Category, Direction, ExtractionMethod};

    fn sample(confidence: f64) -> ExtractedTransaction {
        ExtractedTransaction {
            amount: Some(50_000),
            direction: Direction::Expense,
            category: Some(Category::Supermercado),
            merchant: Some("biggie".to_string()),
            notes: None,
            confidence,
            method: ExtractionMethod::Rules,
            original_message: "gasté 50 mil en biggie".to_string(),
        }
    }

    #[test]
    fn test_thousands_separator() {
        assert_eq!(format_amount(Some(50_000)), "50.000 Gs.");
        assert_eq!(format_amount(Some(1_500_000)), "1.500.000 Gs.");
        assert_eq!(format_amount(Some(120)), "120 Gs.");
        assert_eq!(format_amount(None), "no detectado");
    }

    #[test]
    fn test_format_includes_fields() {
        let text = format_transaction(&sample(0.95));
        assert!(text.contains("💸 *Gasto*"));
        assert!(text.contains("Monto: 50.000 Gs."));
        assert!(text.contains("Comercio: biggie"));
        assert!(text.contains("Categoría: Supermercado"));
        assert!(text.contains("Detectado por: reglas"));
    }

    #[test]
    fn test_low_confidence_warns() {
        let text = format_transaction(&sample(0.5));
        assert!(text.contains("⚠️"));
        assert!(text.contains("Confianza: 50%"));
    }

    #[test]
    fn test_high_confidence_does_not_warn() {
        let text = format_transaction(&sample(0.95));
        assert!(!text.contains("⚠️"));
        assert!(text.contains("Confianza: 95%"));
    }

    #[test]
    fn test_missing_amount_marker() {
        let mut tx = sample(0.2);
        tx.amount = None;
        tx.merchant = None;
        tx.category = None;
        let text = format_transaction(&tx);
        assert!(text.contains("Monto: no detectado"));
        assert!(!text.contains("Comercio:"));
        assert!(!text.contains("Categoría:"));
    }

    #[test]
    fn test_confirmation_prompt_asks() {
        let text = confirmation_prompt(&sample(0.95));
        assert!(text.ends_with("¿Lo registro así? (sí / no)"));
    }

    /// Regression test: same input, byte-identical output.
    #[test]
    fn test_deterministic() {
        let tx = sample(0.8);
        assert_eq!(format_transaction(&tx), format_transaction(&tx));
    }
}
