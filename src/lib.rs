//! # Gazetteer Recon
//!
//! A reconciliation service that matches free-text place names against a
//! gazetteer loaded from CSV.
//!
//! Scoring, ranking, batch decoding, and the entity store live in
//! [`gazetteer_recon_core`]; this crate adds configuration, CSV ingestion,
//! the HTTP server, and the `recon` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌──────────────┐
//! │   CSV    │──▶│   Dataset   │──▶│ Entity Store │
//! │ file/upl │   │   loader    │   │ (Arc swap)   │
//! └──────────┘   └─────────────┘   └──────┬───────┘
//!                                         │ snapshot
//!                      ┌──────────────────┤
//!                      ▼                  ▼
//!                 ┌──────────┐      ┌────────────┐
//!                 │   CLI    │      │    HTTP    │
//!                 │ (recon)  │      │ /reconcile │
//!                 └──────────┘      └────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! recon check --dataset data/canadacities.csv
//! recon match "ottaw" --dataset data/canadacities.csv --explain
//! recon --config config/recon.toml serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`dataset`] | CSV gazetteer ingestion |
//! | [`server`] | Reconciliation HTTP server |
//! | [`lookup`] | `recon match` command |
//! | [`check`] | `recon check` command |

pub mod check;
pub mod config;
pub mod dataset;
pub mod lookup;
pub mod server;
