// SQL text handling: escaping, batch splitting, classification, results
pub mod classify;
pub mod escape;
pub mod outcome;
pub mod statement;

pub use classify::{StatementClassifier, StatementKind};
pub use escape::{contains_pattern, quote_identifier, quote_literal, quote_qualified, quote_string};
pub use outcome::{QueryOutcome, StatementRowset};
pub use statement::{parse_use, split_statements};
