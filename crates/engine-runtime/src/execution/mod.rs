pub mod bridge;
pub mod executor;
pub mod factory;
pub mod monitor;
pub mod safeguard;
