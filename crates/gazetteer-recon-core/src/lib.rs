//! # Gazetteer Recon Core
//!
//! Pure reconciliation logic: the entity model, name scoring, ranking,
//! batch query decoding, and the atomically swapped entity store.
//!
//! This crate contains no tokio, HTTP, or filesystem dependencies. The
//! application crate owns dataset ingestion and the transport, and calls
//! into these modules with plain values.

pub mod batch;
pub mod models;
pub mod rank;
pub mod scorer;
pub mod store;
