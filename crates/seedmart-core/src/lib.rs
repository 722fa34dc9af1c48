//! Core contracts for seedmart.
//!
//! This crate defines the resolved run configuration, the deterministic
//! random stream used by every generation stage, the star-schema row types,
//! and the shared error type.

pub mod config;
pub mod error;
pub mod model;
pub mod rng;

pub use config::{ConfigOverrides, RegionWeight, RunConfig, StoreTypeWeight};
pub use error::{Error, Result};
pub use model::{
    Category, CustomerDim, CustomerProfile, DateDim, PaymentMethod, ProductDim, ProductProfile,
    SalesFact, StoreDim, StoreType,
};
pub use rng::{DrawStream, Stage, StreamFactory};
