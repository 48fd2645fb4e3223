pub mod environment;
pub mod error;
pub mod flags;
pub mod rollout;
pub mod settings;
