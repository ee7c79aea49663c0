pub mod cadre;
pub mod classifier;
pub mod cleaning;
pub mod config;
pub mod context;
pub mod data_assistant;
pub mod dataset;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod llm;
pub mod mapping;
pub mod preview;
pub mod reconcile;
pub mod session;

pub use cadre::{Assignment, Cadre, CADRE_COLUMN, UNMAPPED};
pub use error::{Result, WranglerError};
pub use mapping::MappingTable;
pub use session::Session;
