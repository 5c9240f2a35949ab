pub mod config;
pub mod constants;
pub mod error;
mod input;
pub mod judgements;
pub mod retrieval;
pub mod types;

pub use judgements::{RelevanceOracle, load_judgements, parse_judgements};
pub use retrieval::{RetrievalSet, load_results, parse_results};
