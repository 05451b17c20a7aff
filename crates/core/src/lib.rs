//! Orderhub Core - Shared types library.
//!
//! This crate provides the common types used by the Orderhub server:
//! newtype IDs, status enums, pagination, and the listing filter compiler.
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. The filter compiler lives here because
//! it is a pure mapping from request parameters to an abstract [`filter::FilterSet`];
//! the server crate translates that set into SQL and search-index queries.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, statuses, pagination, sorting
//! - [`filter`] - The abstract filter set and its compiler

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod filter;
pub mod types;

pub use types::*;
