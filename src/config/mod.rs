/// Database connection, table creation and storage constraints
pub mod database;

/// Application settings loaded from config.toml and the environment
pub mod settings;
