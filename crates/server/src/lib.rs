//! Orderhub server - order management over a dual-path listing.
//!
//! # Architecture
//!
//! - Axum web framework, JSON API
//! - `PostgreSQL` via sqlx as the system of record
//! - Optional search-index read path (Elasticsearch REST dialect), kept
//!   eventually consistent by fire-and-forget mirror jobs
//! - Request filters are compiled once into an abstract
//!   [`orderhub_core::filter::FilterSet`] and translated per path by the
//!   [`listing`] module

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod listing;
pub mod models;
pub mod routes;
pub mod search;
pub mod state;
