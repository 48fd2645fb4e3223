pub mod connectors;
pub mod context;
pub mod error;
pub mod metrics;
pub mod sources;
pub mod state;
pub mod warehouse;
