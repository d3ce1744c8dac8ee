//! The hybrid decision strategy: rules first, model only when the rules
//! guess is not good enough, and a best-effort answer even when the model
//! path is down. The caller-visible envelope always says which path won.

use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use plata_core::rules::RulesExtractor;
use plata_core::transaction::ExtractedTransaction;

use crate::model::{ChatTransport, HttpTransport, ModelClient};
use crate::rate_limit::RateLimiter;

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Skip the rules-first gate and ask the model directly.
    pub force_ai: bool,
    /// Opaque caller context, carried for diagnostics only.
    pub user_context: Option<String>,
}

/// Process-level configuration.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Feature kill switch: when off, every request is rules-only.
    pub enabled: bool,
    /// Allow escalation to the model path.
    pub ai_fallback: bool,
    /// Rules results at or above this confidence skip the model.
    pub confidence_threshold: f64,
    /// Pause between sequential batch items.
    pub batch_delay: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ai_fallback: true,
            confidence_threshold: 0.7,
            batch_delay: Duration::from_millis(500),
        }
    }
}

/// Orchestrator-level envelope: the public return value. `success: false`
/// is reserved for empty input; everything else degrades to a best-effort
/// transaction with `fallback_used` set.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtractionOutcome {
    pub success: bool,
    pub data: Option<ExtractedTransaction>,
    pub error: Option<String>,
    pub fallback_used: bool,
}

impl ExtractionOutcome {
    fn ok(data: ExtractedTransaction) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            fallback_used: false,
        }
    }

    fn fallback(data: ExtractedTransaction, error: Option<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            error,
            fallback_used: true,
        }
    }

    fn failed(error: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
            fallback_used: false,
        }
    }
}

pub struct TransactionExtractor<T: ChatTransport> {
    rules: RulesExtractor,
    model: Option<ModelClient<T>>,
    config: ExtractorConfig,
}

impl TransactionExtractor<HttpTransport> {
    /// Extractor wired from the environment: built-in vocabulary, default
    /// budget, model path present only when a credential is set.
    pub fn from_env(config: ExtractorConfig) -> Result<Self> {
        let limiter = std::sync::Arc::new(RateLimiter::default());
        Ok(Self {
            rules: RulesExtractor::new()?,
            model: ModelClient::from_env(limiter)?,
            config,
        })
    }
}

impl<T: ChatTransport> TransactionExtractor<T> {
    pub fn new(
        rules: RulesExtractor,
        model: Option<ModelClient<T>>,
        config: ExtractorConfig,
    ) -> Self {
        Self {
            rules,
            model,
            config,
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract a transaction guess from one message.
    pub async fn extract_transaction(
        &self,
        message: &str,
        options: &ExtractOptions,
    ) -> ExtractionOutcome {
        if message.trim().is_empty() {
            return ExtractionOutcome::failed("empty message");
        }

        tracing::debug!(
            force_ai = options.force_ai,
            user_context = ?options.user_context,
            "extracting transaction"
        );

        if !self.config.enabled {
            return ExtractionOutcome::ok(self.rules.extract(message));
        }

        if options.force_ai {
            if let Some(model) = &self.model {
                if let Some(tx) = model.extract(message).await {
                    return ExtractionOutcome::ok(tx);
                }
            }
            tracing::info!("forced model path unavailable, falling back to rules");
            return ExtractionOutcome::fallback(self.rules.extract(message), None);
        }

        let rules_tx = self.rules.extract(message);
        if rules_tx.has_amount() && rules_tx.confidence >= self.config.confidence_threshold {
            return ExtractionOutcome::ok(rules_tx);
        }

        // Never block the user on an unreachable dependency.
        let Some(model) = self.model.as_ref().filter(|_| self.config.ai_fallback) else {
            return ExtractionOutcome::fallback(rules_tx, None);
        };

        match model.extract(message).await {
            // Tie goes to the model: equal confidence prefers the path
            // with richer semantic understanding.
            Some(model_tx) if model_tx.confidence >= rules_tx.confidence => {
                ExtractionOutcome::ok(model_tx)
            }
            Some(_) => {
                tracing::debug!("model scored below rules, keeping rules result");
                ExtractionOutcome::fallback(rules_tx, None)
            }
            None => ExtractionOutcome::fallback(rules_tx, None),
        }
    }

    /// Process messages strictly sequentially with a pause between items,
    /// respecting the external budget. N in, N out, same order, no early
    /// termination.
    pub async fn extract_batch(
        &self,
        messages: &[String],
        options: &ExtractOptions,
    ) -> Vec<ExtractionOutcome> {
        let mut outcomes = Vec::with_capacity(messages.len());
        for (i, message) in messages.iter().enumerate() {
            outcomes.push(self.extract_transaction(message, options).await);
            if i + 1 < messages.len() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }
        outcomes
    }
}
