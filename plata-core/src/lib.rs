//! plata-core: deterministic transaction extraction for Paraguayan Spanish
//! chat messages — canonical types, rules extractor, vocabulary, presenter

pub mod presenter;
pub mod rules;
pub mod transaction;
pub mod vocabulary;

pub use presenter::{confirmation_prompt, format_amount, format_transaction};
pub use rules::RulesExtractor;
pub use transaction::{Category, Direction, ExtractedTransaction, ExtractionMethod};
pub use vocabulary::{normalize, CategoryTable, KeywordRule, MerchantRule};
