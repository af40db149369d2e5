//! Common utilities for rolebase
//!
//! This crate provides the error type and status categories shared by the
//! data-access layer and whatever outer surface renders its results.

pub mod error;
pub mod http;

pub use error::{status_for, Result, RolebaseError};
pub use http::HttpStatus;
