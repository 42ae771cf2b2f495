//! CSV gazetteer ingestion.
//!
//! Header names are matched against the configured synonym lists once per
//! file; each row then takes, per attribute, the first non-empty value
//! among the matched columns. Rows without a name are skipped and the id
//! falls back to the name.
//!
//! Parsing never touches the [`EntityStore`]: callers publish the finished
//! collection with [`EntityStore::replace_entities`], so a file that fails
//! halfway leaves the current collection in place.
//!
//! [`EntityStore`]: gazetteer_recon_core::store::EntityStore
//! [`EntityStore::replace_entities`]: gazetteer_recon_core::store::EntityStore::replace_entities

use anyhow::{bail, Context, Result};
use gazetteer_recon_core::models::Entity;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::config::{Config, FieldSynonyms};

/// Entities parsed from one CSV file, plus bookkeeping for reporting.
#[derive(Debug, Clone)]
pub struct ParsedDataset {
    pub entities: Vec<Entity>,
    /// Data rows read, including skipped ones.
    pub rows: usize,
    /// Rows dropped for lacking a name.
    pub skipped: usize,
    /// Header names that were matched, in attribute order.
    pub columns: Vec<String>,
}

/// Column indices per attribute, in synonym priority order.
#[derive(Debug, Clone, Default)]
struct ColumnMap {
    id: Vec<usize>,
    name: Vec<usize>,
    province: Vec<usize>,
    latitude: Vec<usize>,
    longitude: Vec<usize>,
}

impl ColumnMap {
    fn resolve(headers: &csv::StringRecord, fields: &FieldSynonyms) -> Self {
        let lookup = |synonyms: &[String]| -> Vec<usize> {
            synonyms
                .iter()
                .filter_map(|wanted| {
                    headers
                        .iter()
                        .position(|h| h.trim_start_matches('\u{feff}') == wanted)
                })
                .collect()
        };
        Self {
            id: lookup(&fields.id),
            name: lookup(&fields.name),
            province: lookup(&fields.province),
            latitude: lookup(&fields.latitude),
            longitude: lookup(&fields.longitude),
        }
    }

    fn matched_names(&self, headers: &csv::StringRecord) -> Vec<String> {
        [
            &self.id,
            &self.name,
            &self.province,
            &self.latitude,
            &self.longitude,
        ]
        .iter()
        .flat_map(|cols| cols.iter())
        .filter_map(|&i| headers.get(i))
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect()
    }
}

fn first_value<'r>(record: &'r csv::StringRecord, columns: &[usize]) -> Option<&'r str> {
    columns
        .iter()
        .filter_map(|&i| record.get(i))
        .find(|v| !v.is_empty())
}

/// Parse a coordinate, yielding `None` for blanks and non-numeric or
/// non-finite values.
pub fn parse_coordinate(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse CSV data into city entities.
pub fn parse_csv<R: Read>(reader: R, fields: &FieldSynonyms) -> Result<ParsedDataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("failed to read CSV header row")?.clone();
    let columns = ColumnMap::resolve(&headers, fields);
    if columns.name.is_empty() {
        bail!(
            "CSV has no name column (expected one of: {})",
            fields.name.join(", ")
        );
    }

    let mut entities = Vec::new();
    let mut rows = 0;
    let mut skipped = 0;

    for (i, result) in rdr.records().enumerate() {
        // Row 1 is the header.
        let record = result.with_context(|| format!("CSV parse error at row {}", i + 2))?;
        rows += 1;

        let Some(name) = first_value(&record, &columns.name) else {
            skipped += 1;
            continue;
        };

        let id = first_value(&record, &columns.id).unwrap_or(name);
        let province = first_value(&record, &columns.province).unwrap_or_default();
        let latitude = first_value(&record, &columns.latitude).and_then(parse_coordinate);
        let longitude = first_value(&record, &columns.longitude).and_then(parse_coordinate);

        entities.push(
            Entity::city(id, name)
                .with_province(province)
                .with_coordinates(latitude, longitude),
        );
    }

    Ok(ParsedDataset {
        entities,
        rows,
        skipped,
        columns: columns.matched_names(&headers),
    })
}

/// Parse a CSV file from disk.
pub fn load_file(path: &Path, fields: &FieldSynonyms) -> Result<ParsedDataset> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open dataset: {}", path.display()))?;
    parse_csv(file, fields).with_context(|| format!("Failed to load dataset: {}", path.display()))
}

/// The dataset a CLI command should read: `override_path` if given,
/// otherwise `[dataset].path`.
pub fn dataset_path(config: &Config, override_path: Option<PathBuf>) -> Result<PathBuf> {
    match override_path.or_else(|| config.dataset.path.clone()) {
        Some(path) => Ok(path),
        None => bail!("No dataset configured. Pass --dataset or set [dataset].path in config."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(data: &str) -> Result<ParsedDataset> {
        parse_csv(data.as_bytes(), &FieldSynonyms::default())
    }

    #[test]
    fn test_simplemaps_layout() {
        let data = "\
city,city_ascii,province_id,province_name,lat,lng,population,id
Toronto,Toronto,ON,Ontario,43.7417,-79.3733,5647656,1124279679
Montréal,Montreal,QC,Quebec,45.5089,-73.5617,3675219,1124586170
";
        let parsed = parse(data).unwrap();
        assert_eq!(parsed.entities.len(), 2);
        assert_eq!(parsed.rows, 2);
        assert_eq!(parsed.skipped, 0);

        let toronto = &parsed.entities[0];
        assert_eq!(toronto.id, "1124279679");
        assert_eq!(toronto.name, "Toronto");
        assert_eq!(toronto.entity_type, "City");
        assert_eq!(toronto.latitude, Some(43.7417));
        assert_eq!(toronto.longitude, Some(-79.3733));
        assert_eq!(toronto.province, "Ontario");

        assert_eq!(parsed.entities[1].name, "Montréal");
        assert_eq!(parsed.entities[1].province, "Quebec");
        assert_eq!(
            parsed.columns,
            vec!["id", "city", "province_name", "lat", "lng"]
        );
    }

    #[test]
    fn test_synonyms_and_id_fallback() {
        let data = "\
Name,state,Latitude,Longitude
Halifax,Nova Scotia,44.6475,-63.5906
Moncton,New Brunswick,,not-a-number
";
        let parsed = parse(data).unwrap();
        let halifax = &parsed.entities[0];
        assert_eq!(halifax.id, "Halifax");
        assert_eq!(halifax.province, "Nova Scotia");
        assert_eq!(halifax.latitude, Some(44.6475));

        let moncton = &parsed.entities[1];
        assert_eq!(moncton.latitude, None);
        assert_eq!(moncton.longitude, None);
    }

    #[test]
    fn test_first_non_empty_synonym_wins() {
        let data = "\
city,name,province,admin_name
,Regina,,Saskatchewan
Victoria,Ignored,British Columbia,Also ignored
";
        let parsed = parse(data).unwrap();
        assert_eq!(parsed.entities[0].name, "Regina");
        assert_eq!(parsed.entities[0].province, "Saskatchewan");
        assert_eq!(parsed.entities[1].name, "Victoria");
        assert_eq!(parsed.entities[1].province, "British Columbia");
    }

    #[test]
    fn test_nameless_rows_are_skipped() {
        let data = "\
city,province
Winnipeg,Manitoba
,Manitoba
   ,Yukon
Whitehorse,Yukon
";
        let parsed = parse(data).unwrap();
        assert_eq!(parsed.rows, 4);
        assert_eq!(parsed.skipped, 2);
        let names: Vec<&str> = parsed.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Winnipeg", "Whitehorse"]);
    }

    #[test]
    fn test_values_are_trimmed_and_zero_is_a_coordinate() {
        let data = "city,lat,lng\n  Null Island  , 0 ,0.0\n";
        let parsed = parse(data).unwrap();
        assert_eq!(parsed.entities[0].name, "Null Island");
        assert_eq!(parsed.entities[0].latitude, Some(0.0));
        assert_eq!(parsed.entities[0].longitude, Some(0.0));
    }

    #[test]
    fn test_byte_order_mark_in_header() {
        let data = "\u{feff}city,province\nKingston,Ontario\n";
        let parsed = parse(data).unwrap();
        assert_eq!(parsed.entities[0].name, "Kingston");
    }

    #[test]
    fn test_missing_name_column_is_an_error() {
        let err = parse("town,province\nBanff,Alberta\n").unwrap_err();
        assert!(err.to_string().contains("no name column"));
    }

    #[test]
    fn test_custom_synonyms() {
        let fields = FieldSynonyms {
            name: vec!["town".to_string()],
            ..FieldSynonyms::default()
        };
        let parsed = parse_csv("town\nBanff\n".as_bytes(), &fields).unwrap();
        assert_eq!(parsed.entities[0].name, "Banff");
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate("45.5"), Some(45.5));
        assert_eq!(parse_coordinate(" -73.56 "), Some(-73.56));
        assert_eq!(parse_coordinate(""), None);
        assert_eq!(parse_coordinate("north"), None);
        assert_eq!(parse_coordinate("NaN"), None);
        assert_eq!(parse_coordinate("inf"), None);
    }

    #[test]
    fn test_dataset_path_prefers_override() {
        let mut config = Config::minimal();
        assert!(dataset_path(&config, None).is_err());

        config.dataset.path = Some(PathBuf::from("configured.csv"));
        assert_eq!(
            dataset_path(&config, None).unwrap(),
            PathBuf::from("configured.csv")
        );
        assert_eq!(
            dataset_path(&config, Some(PathBuf::from("cli.csv"))).unwrap(),
            PathBuf::from("cli.csv")
        );
    }

    #[test]
    fn test_load_file_reports_path() {
        let err = load_file(Path::new("/nonexistent/cities.csv"), &FieldSynonyms::default())
            .unwrap_err();
        assert!(err.to_string().contains("/nonexistent/cities.csv"));
    }
}
