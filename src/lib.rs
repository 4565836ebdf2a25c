//! Ledgerhook - Stripe webhook receiver and credit ledger
//!
//! This library provides the core functionality for mirroring Stripe payment
//! events into a local credit ledger: checkout session creation, webhook
//! signature verification, and idempotent credit/subscription reconciliation.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod payments;
