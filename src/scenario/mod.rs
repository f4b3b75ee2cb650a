pub mod evaluator;
pub mod grid;
