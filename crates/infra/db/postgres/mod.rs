pub mod postgres_connection;
pub mod postgres_provider;
pub mod schema;
