pub mod index;
pub mod tracker;
