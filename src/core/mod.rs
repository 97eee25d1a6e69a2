//! Core invoice types, tax calculation, validation, and errors.
//!
//! This module provides the invoice data model shared by every stage of the
//! pipeline, the fixed-point tax calculator, and the error taxonomy.

mod builder;
mod error;
mod tax;
mod types;
mod validation;

pub use builder::*;
pub use error::*;
pub use tax::*;
pub use types::*;
pub use validation::*;
