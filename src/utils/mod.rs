pub mod config;
pub mod price;
pub mod selectors;
