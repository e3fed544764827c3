pub mod connection_provider;
pub mod subscriptions;
