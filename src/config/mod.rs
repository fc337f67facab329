/// Database connection and schema creation
pub mod database;

/// Idempotent seeding of the configured teams
pub mod seed;

/// Application settings loaded from config.toml
pub mod settings;
