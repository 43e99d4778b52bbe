pub mod definition;
pub mod layer;
