//! Star-schema generation engine for seedmart.
//!
//! Consumes a resolved `RunConfig` and produces the full retail dataset:
//! dimensions, behavioral profiles, and the validated fact stream, committed
//! to a storage sink in fixed-size batches.

pub mod dimensions;
pub mod engine;
pub mod errors;
pub mod model;
pub mod profiles;
pub mod sampler;
pub mod validate;

pub use engine::{AbortFlag, GenerationEngine, PreparedRun};
pub use errors::GenerationError;
pub use model::{RunReport, TableReport};
pub use sampler::{Dimensions, FactSampler};
