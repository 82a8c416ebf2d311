//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate provider calls into ingestion/read use-cases.
//! - Keep sync and UI callers decoupled from resource-path details.

pub mod forecast_service;
