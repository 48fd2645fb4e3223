pub mod error;
pub mod incremental;
pub mod load;
pub mod scope;
pub mod step;
pub mod validation;
