//! Financial data reconciliation engine for Korean corporate filings.
//!
//! Resolves canonical financial concepts against inconsistently labeled
//! account rows, falls back across reporting periods and scopes when the
//! preferred filing is absent, and derives the screening ratios the batch
//! orchestrator ranks companies by.

pub mod aliases;
pub mod api;
pub mod batch;
pub mod document;
pub mod error;
pub mod models;
pub mod period;
pub mod ratios;
pub mod reconciler;
