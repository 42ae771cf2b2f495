//! Batch reconciliation: decode a multi-query request and answer every key.
//!
//! # Request shapes
//!
//! ```json
//! { "queries": { "q0": { "query": "Toronto", "limit": 3 }, "q1": { "query": "Ottawa" } } }
//! { "queries": "{\"q0\": {\"query\": \"Toronto\"}}" }
//! { "query": "Toronto" }
//! { "query": { "query": "Toronto", "limit": 1 } }
//! ```
//!
//! The bare `query` shapes are rewritten into a one-entry batch under the
//! key [`SINGLE_QUERY_KEY`] before anything is ranked. Extra per-query
//! fields sent by reconciliation clients (`type`, `properties`,
//! `type_strict`) are ignored.
//!
//! # Response shape
//!
//! ```json
//! { "q0": { "result": [ { "id": "...", "name": "...", "score": 100, "match": true,
//!                         "type": [ { "id": "city", "name": "City" } ] } ] } }
//! ```
//!
//! Decoding is all-or-nothing: a payload that fails to decode yields an
//! error and no per-key results.

use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::{Entity, Match};
use crate::rank::{rank, Query, RankPolicy};

/// Key assigned to a query sent without a batch envelope.
pub const SINGLE_QUERY_KEY: &str = "q0";

/// A decoded batch: caller-chosen keys mapped to queries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchRequest {
    pub queries: BTreeMap<String, Query>,
}

/// Results for one key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub result: Vec<Match>,
}

/// Results for a whole batch, keyed like the request.
pub type BatchResponse = BTreeMap<String, QueryResult>;

#[derive(Debug, Default, Deserialize)]
struct QuerySpec {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QueryInput {
    Text(String),
    Spec(QuerySpec),
}

impl From<QueryInput> for Query {
    fn from(input: QueryInput) -> Self {
        match input {
            QueryInput::Text(text) => Query::new(text),
            QueryInput::Spec(spec) => Query {
                text: spec.query.unwrap_or_default(),
                limit: spec.limit,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QueriesField {
    Map(BTreeMap<String, QueryInput>),
    Encoded(String),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    queries: Option<QueriesField>,
    #[serde(default)]
    query: Option<QueryInput>,
}

impl BatchRequest {
    /// A batch holding one query under [`SINGLE_QUERY_KEY`].
    pub fn single(query: Query) -> Self {
        let mut queries = BTreeMap::new();
        queries.insert(SINGLE_QUERY_KEY.to_string(), query);
        Self { queries }
    }

    /// Decode a JSON request body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let envelope: Envelope =
            serde_json::from_slice(body).context("request body is not a valid query batch")?;

        match (envelope.queries, envelope.query) {
            (Some(QueriesField::Map(map)), _) => Ok(Self::from_inputs(map)),
            (Some(QueriesField::Encoded(raw)), _) => decode_queries(&raw),
            (None, Some(input)) => Ok(Self::single(input.into())),
            (None, None) => bail!("request must contain `queries` or `query`"),
        }
    }

    /// Decode the `queries` / `query` parameters of a form or query string.
    ///
    /// `queries` must be a JSON object of queries; an empty `queries` is
    /// treated as absent. `query` may carry the same object of queries, a
    /// single query object or JSON string, or plain text.
    pub fn from_form(queries: Option<&str>, query: Option<&str>) -> Result<Self> {
        if let Some(raw) = queries.filter(|raw| !raw.is_empty()) {
            return decode_queries(raw);
        }
        match query {
            Some(raw) => decode_form_query(raw),
            None => bail!("request must contain `queries` or `query`"),
        }
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    fn from_inputs(inputs: BTreeMap<String, QueryInput>) -> Self {
        Self {
            queries: inputs.into_iter().map(|(k, v)| (k, v.into())).collect(),
        }
    }
}

fn decode_queries(raw: &str) -> Result<BatchRequest> {
    let inputs: BTreeMap<String, QueryInput> =
        serde_json::from_str(raw).context("`queries` is not a valid JSON object of queries")?;
    Ok(BatchRequest::from_inputs(inputs))
}

fn decode_form_query(raw: &str) -> Result<BatchRequest> {
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        return Ok(BatchRequest::single(Query::new(raw)));
    };

    if matches!(&value, Value::Object(fields) if !is_single_query(fields)) {
        let inputs: BTreeMap<String, QueryInput> = serde_json::from_value(value)
            .context("`query` is not a valid query or JSON object of queries")?;
        return Ok(BatchRequest::from_inputs(inputs));
    }

    let query = serde_json::from_value::<QueryInput>(value)
        .map(Query::from)
        .unwrap_or_else(|_| Query::new(raw));
    Ok(BatchRequest::single(query))
}

/// An object is one query when it carries query fields and its `query`
/// is not itself a nested query object.
fn is_single_query(fields: &Map<String, Value>) -> bool {
    let has_query_fields = fields.contains_key("query") || fields.contains_key("limit");
    has_query_fields && !fields.get("query").is_some_and(Value::is_object)
}

/// Rank every query of `request` against `entities`.
///
/// Keys are independent; a blank query yields an empty result list.
pub fn handle(request: &BatchRequest, entities: &[Entity], policy: &RankPolicy) -> BatchResponse {
    request
        .queries
        .iter()
        .map(|(key, query)| {
            (
                key.clone(),
                QueryResult {
                    result: rank(query, entities, policy),
                },
            )
        })
        .collect()
}
