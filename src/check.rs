//! `recon check`: load a dataset and report what the loader made of it.

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::dataset;

pub fn run_check(config: &Config, dataset_override: Option<PathBuf>) -> Result<()> {
    let path = dataset::dataset_path(config, dataset_override)?;
    let parsed = dataset::load_file(&path, &config.dataset.fields)?;

    let with_coords = parsed
        .entities
        .iter()
        .filter(|e| e.latitude.is_some() && e.longitude.is_some())
        .count();

    println!("Dataset:     {}", path.display());
    println!("Columns:     {}", parsed.columns.join(", "));
    println!("Rows:        {}", parsed.rows);
    println!("Entities:    {}", parsed.entities.len());
    println!("Skipped:     {} (no name)", parsed.skipped);
    println!("Coordinates: {} / {}", with_coords, parsed.entities.len());

    if parsed.entities.is_empty() {
        anyhow::bail!("dataset contains no rows with a name");
    }

    Ok(())
}
