pub mod errors;
pub mod pipeline;
pub mod plan;
pub mod result;
