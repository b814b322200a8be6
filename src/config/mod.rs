/// Initial administrator account from the environment
pub mod admin;
/// Database configuration and connection management
pub mod database;
/// Ward and product reference data loading from config.toml
pub mod reference_data;
