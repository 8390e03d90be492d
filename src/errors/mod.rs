//! # Error Handling
//!
//! This module provides error handling for the gateway translator.
//! [`Error`] is returned at the crate boundary (configuration and model
//! loading); [`TranslationError`] is the classified failure recorded in the
//! validation report during a translation pass.

mod translation;
pub mod types;

pub use translation::TranslationError;
pub use types::{Error, Result};
