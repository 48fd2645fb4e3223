pub mod connector;
pub mod memory;
pub mod registry;
