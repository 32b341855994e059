//! Endpoint wrapper for the entities API.

use crate::error::{ClientError, ClientResult};
use crate::transport::{Method, Request, Response, Transport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Header naming the application scope every call runs in.
pub const SCOPE_HEADER: &str = "X-Application";

/// Media types used by the store.
pub mod media {
    pub const TEXT: &str = "text/plain";
    pub const JSON: &str = "application/json";
    pub const JSON_LD: &str = "application/ld+json";
    pub const CSV: &str = "text/csv;charset=UTF-8";
}

/// One stored value of a predicate, as returned by the value listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueRecord {
    #[serde(deserialize_with = "value_as_string")]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default)]
    pub metadata: ValueMetadata,
    /// Annotations keyed by local name.
    #[serde(default)]
    pub details: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueMetadata {
    #[serde(default)]
    pub hash: Option<String>,
}

/// One predicate listed for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub property: String,
}

/// Where a detail lives: the value predicate, the detail key and the
/// identifier of the annotated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetailAddress<'a> {
    pub predicate: &'a str,
    pub detail: &'a str,
    pub value_identifier: &'a str,
}

impl DetailAddress<'_> {
    fn path(&self, id: &str) -> String {
        format!(
            "entities/{}/values/{}/details/{}",
            segment(id),
            segment(self.predicate),
            segment(self.detail)
        )
    }
}

#[derive(Debug, Deserialize)]
struct ApplicationRecord {
    label: String,
}

fn value_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

/// Typed access to the store endpoints the sync layer uses.
///
/// Every call carries the [`SCOPE_HEADER`] and turns non-2xx responses into
/// [`ClientError::Status`].
#[derive(Clone)]
pub struct EntitiesApi {
    transport: Arc<dyn Transport>,
}

impl EntitiesApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    async fn send(&self, scope: &str, request: Request) -> ClientResult<Response> {
        let request = request.header(SCOPE_HEADER, scope);
        debug!("[{}] {} {}", scope, request.method, request.path);
        self.transport.request(request).await?.error_for_status()
    }

    // ── Entities ─────────────────────────────────────────────────

    /// Creates an entity from a JSON-LD document and returns the store's
    /// JSON-LD answer.
    pub async fn create_entity(&self, scope: &str, payload: &Value) -> ClientResult<Value> {
        let request = Request::post("entities")
            .header("Content-Type", media::JSON_LD)
            .header("Accept", media::JSON_LD)
            .body(payload.to_string());
        self.send(scope, request).await?.decode()
    }

    pub async fn read_entity(&self, scope: &str, id: &str) -> ClientResult<Value> {
        let request =
            Request::get(format!("entities/{}", segment(id))).header("Accept", media::JSON);
        self.send(scope, request).await?.decode()
    }

    pub async fn delete_entity(&self, scope: &str, id: &str) -> ClientResult<()> {
        let request =
            Request::delete(format!("entities/{}", segment(id))).header("Accept", media::JSON_LD);
        self.send(scope, request).await?;
        Ok(())
    }

    /// One page of the entities in a scope, as a JSON-LD document.
    pub async fn list_entities(
        &self,
        scope: &str,
        limit: usize,
        offset: usize,
    ) -> ClientResult<Value> {
        let request = Request::get("entities")
            .query("limit", limit.to_string())
            .query("offset", offset.to_string())
            .header("Accept", media::JSON_LD);
        let resp = self.send(scope, request).await?;
        if resp.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        resp.decode()
    }

    // ── Values ───────────────────────────────────────────────────

    /// Lists every predicate that carries at least one value.
    pub async fn list_value_properties(
        &self,
        scope: &str,
        id: &str,
    ) -> ClientResult<Vec<PropertyRecord>> {
        let request = Request::get(format!("entities/{}/values", segment(id)))
            .header("Accept", media::JSON);
        let resp = self.send(scope, request).await?;
        if resp.body.trim().is_empty() {
            return Ok(Vec::new());
        }
        resp.decode()
    }

    /// Lists the stored values of one predicate, with metadata and details.
    pub async fn list_values(
        &self,
        scope: &str,
        id: &str,
        predicate: &str,
    ) -> ClientResult<Vec<ValueRecord>> {
        let request = Request::get(format!("entities/{}/values", segment(id)))
            .query("property", predicate)
            .header("Accept", media::JSON);
        let resp = self.send(scope, request).await?;
        if resp.body.trim().is_empty() {
            return Ok(Vec::new());
        }
        resp.decode()
    }

    pub async fn add_value(
        &self,
        scope: &str,
        id: &str,
        predicate: &str,
        value: &str,
        language: Option<&str>,
    ) -> ClientResult<()> {
        let mut request =
            Request::post(format!("entities/{}/values/{}", segment(id), segment(predicate)))
                .header("Content-Type", media::TEXT)
                .header("Accept", media::JSON_LD)
                .body(value);
        if let Some(lang) = language {
            request = request.query("languageTag", lang);
        }
        self.send(scope, request).await?;
        Ok(())
    }

    pub async fn remove_value(
        &self,
        scope: &str,
        id: &str,
        predicate: &str,
        value_identifier: &str,
        language: Option<&str>,
    ) -> ClientResult<()> {
        let mut request =
            Request::delete(format!("entities/{}/values/{}", segment(id), segment(predicate)))
                .header("Accept", media::JSON_LD);
        if let Some(lang) = language {
            request = request.query("languageTag", lang);
        }
        let request = request.query("valueIdentifier", value_identifier);
        self.send(scope, request).await?;
        Ok(())
    }

    // ── Links ────────────────────────────────────────────────────

    /// Lists the target identifiers linked through one predicate.
    ///
    /// Accepts an array of plain strings or of objects carrying `@id`, `id`
    /// or `target`.
    pub async fn list_links(
        &self,
        scope: &str,
        id: &str,
        predicate: &str,
    ) -> ClientResult<Vec<String>> {
        let request = Request::get(format!("entities/{}/links/{}", segment(id), segment(predicate)))
            .header("Accept", media::JSON);
        let resp = self.send(scope, request).await?;
        if resp.body.trim().is_empty() {
            return Ok(Vec::new());
        }
        let items: Vec<Value> = resp.decode()?;
        items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                Value::Object(ref map) => ["@id", "id", "target"]
                    .iter()
                    .find_map(|k| map.get(*k).and_then(Value::as_str))
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ClientError::InvalidResponse(format!("link entry without target: {item}"))
                    }),
                other => Err(ClientError::InvalidResponse(format!(
                    "unexpected link entry: {other}"
                ))),
            })
            .collect()
    }

    pub async fn create_link(
        &self,
        scope: &str,
        id: &str,
        predicate: &str,
        target: &str,
    ) -> ClientResult<()> {
        let request = Request::new(
            Method::Put,
            format!(
                "entities/{}/links/{}/{}",
                segment(id),
                segment(predicate),
                segment(target)
            ),
        )
        .header("Accept", media::JSON_LD);
        self.send(scope, request).await?;
        Ok(())
    }

    pub async fn delete_link(
        &self,
        scope: &str,
        id: &str,
        predicate: &str,
        target: &str,
    ) -> ClientResult<()> {
        let request = Request::delete(format!(
            "entities/{}/links/{}/{}",
            segment(id),
            segment(predicate),
            segment(target)
        ))
        .header("Accept", media::JSON_LD);
        self.send(scope, request).await?;
        Ok(())
    }

    // ── Details ──────────────────────────────────────────────────

    pub async fn create_detail(
        &self,
        scope: &str,
        id: &str,
        address: &DetailAddress<'_>,
        body: &str,
        content_type: &str,
    ) -> ClientResult<()> {
        let request = Request::post(address.path(id))
            .query("valueIdentifier", address.value_identifier)
            .header("Content-Type", content_type)
            .header("Accept", media::JSON_LD)
            .body(body);
        self.send(scope, request).await?;
        Ok(())
    }

    pub async fn delete_detail(
        &self,
        scope: &str,
        id: &str,
        address: &DetailAddress<'_>,
    ) -> ClientResult<()> {
        let request = Request::delete(address.path(id))
            .query("valueIdentifier", address.value_identifier)
            .header("Accept", media::JSON_LD);
        self.send(scope, request).await?;
        Ok(())
    }

    // ── Transactions ─────────────────────────────────────────────

    /// Reads one transaction as JSON-LD.
    pub async fn read_transaction(&self, id: &str) -> ClientResult<Value> {
        let request =
            Request::get(format!("transactions/{}", segment(id))).header("Accept", media::JSON_LD);
        debug!("GET transactions/{}", id);
        self.transport
            .request(request)
            .await?
            .error_for_status()?
            .decode()
    }

    /// One page of transactions as a JSON-LD document.
    pub async fn list_transactions(&self, limit: usize, offset: usize) -> ClientResult<Value> {
        let request = Request::get("transactions")
            .query("limit", limit.to_string())
            .query("offset", offset.to_string())
            .header("Accept", media::JSON_LD);
        debug!("GET transactions limit={} offset={}", limit, offset);
        let resp = self.transport.request(request).await?.error_for_status()?;
        if resp.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        resp.decode()
    }

    // ── Query & applications ─────────────────────────────────────

    /// Runs a SPARQL select and returns one map per result row.
    pub async fn query_select(
        &self,
        scope: &str,
        query: &str,
    ) -> ClientResult<Vec<BTreeMap<String, String>>> {
        let request = Request::post("query/select")
            .header("Content-Type", media::TEXT)
            .header("Accept", media::CSV)
            .body(query);
        let resp = self.send(scope, request).await?;
        if resp.body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_reader(resp.body.as_bytes());
        let headers = reader.headers()?.clone();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(
                headers
                    .iter()
                    .zip(record.iter())
                    .map(|(h, v)| (h.to_string(), v.to_string()))
                    .collect(),
            );
        }
        Ok(rows)
    }

    /// Lists application labels, optionally filtered by tag.
    pub async fn list_applications(&self, tag: Option<&str>) -> ClientResult<Vec<String>> {
        let mut request = Request::get("applications").header("Accept", media::JSON);
        if let Some(tag) = tag {
            request = request.query("tag", tag);
        }
        debug!("GET applications tag={:?}", tag);
        let resp = self.transport.request(request).await?.error_for_status()?;
        let apps: Vec<ApplicationRecord> = resp.decode()?;
        Ok(apps.into_iter().map(|a| a.label).collect())
    }
}
