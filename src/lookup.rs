//! `recon match`: rank one query against a dataset from the command line.
//!
//! Runs the same scoring and ranking as `POST /reconcile`, so it is a quick
//! way to check what the server would answer for a given name.

use anyhow::Result;
use gazetteer_recon_core::models::Match;
use gazetteer_recon_core::rank::{rank, Query};
use gazetteer_recon_core::scorer;
use gazetteer_recon_core::store::{Dataset, EntityStore};
use std::path::PathBuf;

use crate::config::Config;
use crate::dataset;

/// Load the dataset, rank `query`, and print the results.
pub fn run_match(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    dataset_override: Option<PathBuf>,
    explain: bool,
) -> Result<()> {
    if query.trim().is_empty() {
        println!("No results.");
        return Ok(());
    }

    let path = dataset::dataset_path(config, dataset_override)?;
    let parsed = dataset::load_file(&path, &config.dataset.fields)?;
    let store = EntityStore::new();
    store.replace_entities(parsed.entities, path.display().to_string());

    let snapshot = store.snapshot();
    let results = match_query(&snapshot, query, limit, config);

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, m) in results.iter().enumerate() {
        let flag = if m.is_match { "match" } else { "-" };
        let province = snapshot
            .find(&m.id)
            .map(|e| e.province.as_str())
            .filter(|p| !p.is_empty())
            .unwrap_or("(no province)");
        println!(
            "{}. [{:>3}] {:<5} {} / {}",
            i + 1,
            m.score,
            flag,
            m.name,
            province
        );
        println!("    id: {}", m.id);
        if explain {
            let b = scorer::explain(query.trim(), &m.name);
            if b.exact {
                println!("    exact match");
            } else {
                println!(
                    "    similarity={:.3} position_bonus={:.2} type_bonus={:.2}",
                    b.similarity, b.position_bonus, b.type_bonus
                );
            }
        }
    }

    Ok(())
}

/// Rank `query` with the configured policy.
pub fn match_query(
    dataset: &Dataset,
    query: &str,
    limit: Option<usize>,
    config: &Config,
) -> Vec<Match> {
    let query = Query {
        text: query.to_string(),
        limit,
    };
    rank(&query, dataset.entities(), &config.reconcile.policy())
}
