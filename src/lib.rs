pub mod board;
pub mod constants;
pub mod engine;
pub mod types;
