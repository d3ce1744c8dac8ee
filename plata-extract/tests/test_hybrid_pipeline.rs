//! End-to-end pipeline tests: message in, formatted confirmation out,
//! with the network mocked at the transport seam.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use plata_core::presenter;
use plata_core::rules::RulesExtractor;
use plata_core::transaction::{Category, Direction, ExtractionMethod};
use plata_extract::model::{ChatTransport, ModelClient, ModelConfig, Provider};
use plata_extract::orchestrator::{ExtractOptions, ExtractorConfig, TransactionExtractor};
use plata_extract::rate_limit::RateLimiter;

struct CannedTransport {
    reply: Option<String>,
    calls: Arc<AtomicUsize>,
}

impl ChatTransport for CannedTransport {
    fn complete(
        &self,
        _config: &ModelConfig,
        _system: &str,
        _user: &str,
    ) -> impl Future<Output = Result<String>> + Send {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self.reply.clone();
        async move { reply.ok_or_else(|| anyhow!("transport down")) }
    }
}

fn extractor_with(
    reply: Option<&str>,
) -> (TransactionExtractor<CannedTransport>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let transport = CannedTransport {
        reply: reply.map(str::to_string),
        calls: Arc::clone(&calls),
    };
    let model = ModelClient::new(
        transport,
        ModelConfig {
            provider: Provider::OpenAI,
            model: "test-model".to_string(),
            api_key: "test-key".to_string(),
        },
        Arc::new(RateLimiter::default()),
    );
    let config = ExtractorConfig {
        batch_delay: Duration::ZERO,
        ..ExtractorConfig::default()
    };
    let extractor =
        TransactionExtractor::new(RulesExtractor::new().unwrap(), Some(model), config);
    (extractor, calls)
}

#[tokio::test]
async fn grocery_expense_is_resolved_by_rules_alone() {
    let (extractor, calls) = extractor_with(None);
    let outcome = extractor
        .extract_transaction("gasté 50 mil en biggie", &ExtractOptions::default())
        .await;

    assert!(outcome.success);
    assert!(!outcome.fallback_used);
    let tx = outcome.data.unwrap();
    assert_eq!(tx.amount, Some(50_000));
    assert_eq!(tx.direction, Direction::Expense);
    assert_eq!(tx.category, Some(Category::Supermercado));
    assert_eq!(tx.method, ExtractionMethod::Rules);
    assert!(tx.confidence >= 0.7);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let text = presenter::confirmation_prompt(&tx);
    assert!(text.contains("Monto: 50.000 Gs."));
    assert!(text.contains("¿Lo registro así?"));
    assert!(!text.contains("⚠️"));
}

#[tokio::test]
async fn vague_income_message_escalates_and_model_wins() {
    let reply = r#"{"amount": 4200000, "type": "income", "category": null, "merchant": null, "notes": "sueldo de marzo", "confidence": 0.8}"#;
    let (extractor, calls) = extractor_with(Some(reply));
    let outcome = extractor
        .extract_transaction("me depositaron el sueldo", &ExtractOptions::default())
        .await;

    assert!(outcome.success);
    let tx = outcome.data.unwrap();
    assert_eq!(tx.method, ExtractionMethod::Model);
    assert_eq!(tx.amount, Some(4_200_000));
    assert_eq!(tx.direction, Direction::Income);
    assert_eq!(tx.original_message, "me depositaron el sueldo");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn vague_income_message_still_usable_without_model() {
    let config = ExtractorConfig {
        batch_delay: Duration::ZERO,
        ..ExtractorConfig::default()
    };
    let extractor: TransactionExtractor<CannedTransport> =
        TransactionExtractor::new(RulesExtractor::new().unwrap(), None, config);

    let outcome = extractor
        .extract_transaction("me depositaron el sueldo", &ExtractOptions::default())
        .await;

    assert!(outcome.success);
    assert!(outcome.fallback_used);
    let tx = outcome.data.unwrap();
    assert_eq!(tx.amount, None);
    assert_eq!(tx.direction, Direction::Income);

    // low-confidence result warns in the confirmation text
    assert!(presenter::format_transaction(&tx).contains("⚠️"));
}

#[tokio::test]
async fn malformed_model_reply_degrades_to_rules() {
    let (extractor, _) = extractor_with(Some("no soy json"));
    let outcome = extractor
        .extract_transaction("cargué algo raro", &ExtractOptions::default())
        .await;

    assert!(outcome.success);
    assert!(outcome.fallback_used);
    assert_eq!(outcome.data.unwrap().method, ExtractionMethod::Rules);
}

#[tokio::test]
async fn batch_is_sequential_and_complete() {
    let (extractor, _) = extractor_with(None);
    let messages = vec![
        "gasté 50 mil en biggie".to_string(),
        "   ".to_string(),
        "cargué nafta 120".to_string(),
        "me depositaron el sueldo".to_string(),
    ];
    let outcomes = extractor
        .extract_batch(&messages, &ExtractOptions::default())
        .await;

    assert_eq!(outcomes.len(), messages.len());
    assert!(outcomes[0].success && !outcomes[0].fallback_used);
    assert!(!outcomes[1].success);
    assert_eq!(outcomes[2].data.as_ref().unwrap().amount, Some(120_000));
    assert_eq!(outcomes[2].data.as_ref().unwrap().category, Some(Category::Transporte));
    assert!(outcomes[3].fallback_used);
}
