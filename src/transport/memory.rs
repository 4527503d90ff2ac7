//! In-memory cloud
//!
//! [`InMemoryCloud`] answers requests the way a service following the
//! registry's wire convention would: list (with exact-match query filters
//! and optional `limit`/`marker` paging), create (assigning a UUID `id`),
//! get, update and delete. It keeps its state between calls, so a
//! resource created through it shows up in later lists.

use super::{Method, Transport, TransportRequest, TransportResponse};
use crate::error::TransportError;
use crate::resource::codec::{collection_path, item_path};
use crate::resource::filter::query_value;
use crate::resource::registry::{find_resource, get_registry, ResourceDef};
use crate::resource::{Attributes, Resource};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use url::Url;

const PAGING_KEYS: &[&str] = &["limit", "marker"];

/// Stateful service simulator
#[derive(Debug, Default)]
pub struct InMemoryCloud {
    /// plural key -> items in insertion order
    store: Mutex<HashMap<String, Vec<Attributes>>>,
    /// Scripted failures, consumed by the next request with that method
    failures: Mutex<Vec<(Method, u16)>>,
    page_size: Option<usize>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn error_body(kind: &str, message: &str) -> Value {
    json!({"NeutronError": {"type": kind, "message": message, "detail": ""}})
}

fn wrapped(key: &str, value: Value) -> Value {
    let mut body = Attributes::new();
    body.insert(key.to_string(), value);
    Value::Object(body)
}

impl InMemoryCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer lists in pages of `size` items with next links
    pub fn with_page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size.max(1));
        self
    }

    /// Preload items of a resource type; non-object values are skipped
    pub fn seed(&self, resource: &str, items: impl IntoIterator<Item = Value>) {
        let Some(def) = find_resource(resource) else {
            tracing::warn!("seeding unknown resource type '{}'", resource);
            return;
        };
        let mut store = lock(&self.store);
        let bucket = store.entry(def.plural.clone()).or_default();
        bucket.extend(items.into_iter().filter_map(|item| match item {
            Value::Object(map) => Some(map),
            _ => None,
        }));
    }

    /// Current items of a resource type
    pub fn snapshot(&self, resource: &str) -> Vec<Resource> {
        let Some(def) = find_resource(resource) else {
            return Vec::new();
        };
        lock(&self.store)
            .get(&def.plural)
            .map(|items| items.iter().cloned().map(Resource::new).collect())
            .unwrap_or_default()
    }

    /// Make the next `method` request fail with `status`
    pub fn fail_next(&self, method: Method, status: u16) {
        lock(&self.failures).push((method, status));
    }

    fn take_failure(&self, method: &Method) -> Option<u16> {
        let mut failures = lock(&self.failures);
        let idx = failures.iter().position(|(m, _)| m == method)?;
        Some(failures.remove(idx).1)
    }

    fn route(request: &TransportRequest) -> Option<(&'static ResourceDef, Option<String>)> {
        get_registry()
            .resources
            .values()
            .filter(|def| def.service == request.service_type)
            .find_map(|def| {
                if request.path == collection_path(def) {
                    return Some((def, None));
                }
                // item_path("") gives "/<path>/" plus the suffix
                let template = item_path(def, "");
                let suffix = if def.json_suffix { ".json" } else { "" };
                let prefix = template.strip_suffix(suffix)?;
                let id = request.path.strip_prefix(prefix)?.strip_suffix(suffix)?;
                if id.is_empty() || id.contains('/') {
                    return None;
                }
                let id = urlencoding::decode(id).ok()?.into_owned();
                Some((def, Some(id)))
            })
    }

    fn list(&self, def: &ResourceDef, query: &[(String, String)]) -> TransportResponse {
        let store = lock(&self.store);
        let matching: Vec<&Attributes> = store
            .get(&def.plural)
            .map(|items| {
                items
                    .iter()
                    .filter(|item| {
                        query
                            .iter()
                            .filter(|(key, _)| !PAGING_KEYS.contains(&key.as_str()))
                            .all(|(key, value)| {
                                item.get(key).and_then(query_value).as_deref() == Some(value.as_str())
                            })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let marker = query.iter().find(|(k, _)| k == "marker").map(|(_, v)| v.as_str());
        let start = marker
            .and_then(|m| matching.iter().position(|item| item.get("id").and_then(Value::as_str) == Some(m)))
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let limit = query
            .iter()
            .find(|(k, _)| k == "limit")
            .and_then(|(_, v)| v.parse::<usize>().ok())
            .or(self.page_size);

        let rest = &matching[start.min(matching.len())..];
        let page: Vec<&Attributes> = match limit {
            Some(limit) => rest.iter().take(limit).copied().collect(),
            None => rest.to_vec(),
        };

        let mut body = Attributes::new();
        body.insert(
            def.plural.clone(),
            Value::Array(page.iter().map(|item| Value::Object((*item).clone())).collect()),
        );

        if let (Some(limit), Some(last)) = (limit, page.last()) {
            if rest.len() > page.len() {
                if let Some(next) = next_link(def, query, limit, last) {
                    body.insert(
                        format!("{}_links", def.plural),
                        json!([{"rel": "next", "href": next}]),
                    );
                }
            }
        }

        TransportResponse::json(200, &Value::Object(body))
    }

    fn create(&self, def: &ResourceDef, body: Option<&Value>) -> TransportResponse {
        let Some(Value::Object(attrs)) = body.and_then(|b| b.get(&def.singular)).cloned() else {
            return TransportResponse::json(
                400,
                &error_body("BadRequest", &format!("Missing '{}' in request body", def.singular)),
            );
        };

        let mut item = attrs;
        item.entry("id".to_string())
            .or_insert_with(|| Value::String(uuid::Uuid::new_v4().to_string()));
        lock(&self.store)
            .entry(def.plural.clone())
            .or_default()
            .push(item.clone());

        TransportResponse::json(201, &wrapped(&def.singular, Value::Object(item)))
    }

    fn with_item<F>(&self, def: &ResourceDef, id: &str, f: F) -> TransportResponse
    where
        F: FnOnce(&mut Vec<Attributes>, usize) -> TransportResponse,
    {
        let mut store = lock(&self.store);
        let items = store.entry(def.plural.clone()).or_default();
        match items
            .iter()
            .position(|item| item.get("id").and_then(Value::as_str) == Some(id))
        {
            Some(idx) => f(items, idx),
            None => TransportResponse::json(
                404,
                &error_body(
                    "NotFound",
                    &format!("{} {} could not be found", def.singular, id),
                ),
            ),
        }
    }
}

/// Absolute next-page URL carrying the original filters
fn next_link(
    def: &ResourceDef,
    query: &[(String, String)],
    limit: usize,
    last: &Attributes,
) -> Option<String> {
    let marker = last.get("id").and_then(Value::as_str)?;
    let mut url = Url::parse("http://in-memory.invalid/").ok()?.join(&collection_path(def)[1..]).ok()?;
    {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query.iter().filter(|(k, _)| !PAGING_KEYS.contains(&k.as_str())) {
            pairs.append_pair(key, value);
        }
        pairs.append_pair("limit", &limit.to_string());
        pairs.append_pair("marker", marker);
    }
    Some(url.into())
}

#[async_trait]
impl Transport for InMemoryCloud {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        tracing::debug!("in-memory {} {}", request.method, request.path);

        if let Some(status) = self.take_failure(&request.method) {
            return Ok(TransportResponse::json(
                status,
                &error_body("InjectedFailure", "injected failure"),
            ));
        }

        let Some((def, id)) = Self::route(&request) else {
            return Ok(TransportResponse::json(
                404,
                &error_body("NotFound", &format!("no route for {}", request.path)),
            ));
        };

        let response = match (request.method.clone(), id) {
            (Method::GET, None) => self.list(def, &request.query),
            (Method::POST, None) => self.create(def, request.body.as_ref()),
            (Method::GET, Some(id)) => self.with_item(def, &id, |items, idx| {
                TransportResponse::json(200, &wrapped(&def.singular, Value::Object(items[idx].clone())))
            }),
            (Method::PUT, Some(id)) => {
                let update = request
                    .body
                    .as_ref()
                    .and_then(|b| b.get(&def.singular))
                    .and_then(Value::as_object)
                    .cloned();
                self.with_item(def, &id, |items, idx| match update {
                    Some(update) => {
                        items[idx].extend(update.into_iter().filter(|(k, _)| k != "id"));
                        TransportResponse::json(200, &wrapped(&def.singular, Value::Object(items[idx].clone())))
                    }
                    None => TransportResponse::json(
                        400,
                        &error_body("BadRequest", &format!("Missing '{}' in request body", def.singular)),
                    ),
                })
            }
            (Method::DELETE, Some(id)) => self.with_item(def, &id, |items, idx| {
                items.remove(idx);
                TransportResponse::new(204, "")
            }),
            (method, _) => TransportResponse::json(
                405,
                &error_body("MethodNotAllowed", &format!("{} not allowed", method)),
            ),
        };

        Ok(response)
    }
}
