pub mod types;
pub mod geo;
pub mod impact;
pub mod csv;
pub mod config;
pub mod error;

pub use types::*;
pub use geo::normalize_location;
pub use impact::*;
pub use csv::{write_csv, CsvRecord};
pub use config::Config;
pub use error::VoiceUpError;
