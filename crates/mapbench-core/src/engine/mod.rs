mod execute;
pub mod runner;

pub use runner::{Evaluator, PairOutcome, ResultSource};
