pub mod commands;
pub mod health;
pub mod metrics;
pub mod queries;
pub mod sagas;
