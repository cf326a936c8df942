pub mod geo;
pub mod listing;
