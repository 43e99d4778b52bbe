pub mod error;
pub mod listener;
pub mod types;
