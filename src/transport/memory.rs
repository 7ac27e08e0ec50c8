//! A cluster that lives in process memory.
//!
//! It models the parts of the cluster contract reconciliation depends on:
//! additive mapping merges that refuse to change an existing field, whole-list
//! replacement of dynamic templates, and analyzer updates that are only
//! accepted while the index is closed. Every request is logged, and any
//! operation can be made to fail with a chosen status.

use super::{ClusterRequest, ClusterResponse, Transport};
use crate::error::{IndexSyncError, Result};
use crate::schema::live::parse_live_mappings;
use crate::schema::{FieldDescriptor, IndexSchema, Settings, TypeSection};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use http::StatusCode;
use indexmap::IndexMap;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct MemoryIndex {
    mappings: IndexMap<String, TypeSection>,
    settings: Settings,
    open: bool,
}

pub struct MemoryCluster {
    indices: DashMap<String, MemoryIndex>,
    templates: DashMap<String, Value>,
    failures: DashMap<&'static str, StatusCode>,
    requests: Mutex<Vec<ClusterRequest>>,
    reachable: AtomicBool,
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self {
            indices: DashMap::new(),
            templates: DashMap::new(),
            failures: DashMap::new(),
            requests: Mutex::new(Vec::new()),
            reachable: AtomicBool::new(true),
        }
    }

    /// Install an open index with the given schema, bypassing the request log.
    pub fn seed(&self, index: &str, schema: IndexSchema) {
        self.indices.insert(
            index.to_string(),
            MemoryIndex {
                mappings: schema.mappings,
                settings: schema.settings,
                open: true,
            },
        );
    }

    /// Current schema of an index as the cluster holds it.
    pub fn live_schema(&self, index: &str) -> Option<IndexSchema> {
        self.indices.get(index).map(|entry| IndexSchema {
            settings: entry.settings.clone(),
            mappings: entry.mappings.clone(),
        })
    }

    pub fn is_open(&self, index: &str) -> Option<bool> {
        self.indices.get(index).map(|entry| entry.open)
    }

    pub fn template(&self, name: &str) -> Option<Value> {
        self.templates.get(name).map(|entry| entry.value().clone())
    }

    /// When unreachable every request fails at the transport level.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Answer every request of `operation` with `status` until cleared.
    pub fn fail_operation(&self, operation: &'static str, status: StatusCode) {
        self.failures.insert(operation, status);
    }

    pub fn clear_failures(&self) {
        self.failures.clear();
    }

    pub fn requests(&self) -> Vec<ClusterRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Requests that change cluster state, in the order they were received.
    pub fn mutations(&self) -> Vec<ClusterRequest> {
        self.requests()
            .into_iter()
            .filter(ClusterRequest::is_mutation)
            .collect()
    }

    pub fn request_count(&self, operation: &str) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.operation() == operation)
            .count()
    }

    pub fn clear_requests(&self) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn handle(&self, request: ClusterRequest) -> ClusterResponse {
        match request {
            ClusterRequest::Ping => ClusterResponse::ok(json!({"tagline": "You Know, for Search"})),
            ClusterRequest::IndexExists { index } => {
                if self.indices.contains_key(&index) {
                    ClusterResponse::ok(Value::Null)
                } else {
                    ClusterResponse::new(StatusCode::NOT_FOUND, Value::Null)
                }
            }
            ClusterRequest::CreateIndex { index, body } => self.create_index(index, &body),
            ClusterRequest::DeleteIndex { index } => match self.indices.remove(&index) {
                Some(_) => acknowledged(),
                None => index_not_found(&index),
            },
            ClusterRequest::CloseIndex { index } => self.set_open(&index, false),
            ClusterRequest::OpenIndex { index } => self.set_open(&index, true),
            ClusterRequest::GetMapping { index } => match self.indices.get(&index) {
                Some(entry) => ClusterResponse::ok(json!({ index.clone(): { "mappings": entry.mappings } })),
                None => index_not_found(&index),
            },
            ClusterRequest::GetSettings { index } => match self.indices.get(&index) {
                Some(entry) => ClusterResponse::ok(json!({ index.clone(): { "settings": { "index": entry.settings } } })),
                None => index_not_found(&index),
            },
            ClusterRequest::PutMapping {
                index,
                type_name,
                body,
            } => self.put_mapping(&index, &type_name, body),
            ClusterRequest::PutSettings { index, body } => self.put_settings(&index, body),
            ClusterRequest::PutTemplate { name, body } => {
                self.templates.insert(name, body);
                acknowledged()
            }
            ClusterRequest::DeleteTemplate { name } => match self.templates.remove(&name) {
                Some(_) => acknowledged(),
                None => error_response(
                    StatusCode::NOT_FOUND,
                    "index_template_missing_exception",
                    &format!("index_template [{}] missing", name),
                ),
            },
        }
    }

    fn create_index(&self, index: String, body: &Value) -> ClusterResponse {
        let mappings = match body.get("mappings") {
            None => IndexMap::new(),
            Some(raw) => match parse_live_mappings(&index, &json!({ index.clone(): { "mappings": raw } })) {
                Ok(mappings) => mappings,
                Err(e) => return mapper_parsing(&e.to_string()),
            },
        };
        let settings = match body.get("settings") {
            None => Settings::default(),
            Some(raw) => match serde_json::from_value::<Settings>(raw.clone()) {
                Ok(settings) => settings,
                Err(e) => return mapper_parsing(&e.to_string()),
            },
        };

        match self.indices.entry(index) {
            Entry::Occupied(occupied) => error_response(
                StatusCode::BAD_REQUEST,
                "resource_already_exists_exception",
                &format!("index [{}] already exists", occupied.key()),
            ),
            Entry::Vacant(vacant) => {
                let name = vacant.key().clone();
                vacant.insert(MemoryIndex {
                    mappings,
                    settings,
                    open: true,
                });
                ClusterResponse::ok(json!({"acknowledged": true, "index": name}))
            }
        }
    }

    fn set_open(&self, index: &str, open: bool) -> ClusterResponse {
        match self.indices.get_mut(index) {
            Some(mut entry) => {
                entry.open = open;
                acknowledged()
            }
            None => index_not_found(index),
        }
    }

    fn put_mapping(&self, index: &str, type_name: &str, body: Value) -> ClusterResponse {
        let update: TypeSection = match serde_json::from_value(body) {
            Ok(update) => update,
            Err(e) => return mapper_parsing(&e.to_string()),
        };
        let mut entry = match self.indices.get_mut(index) {
            Some(entry) => entry,
            None => return index_not_found(index),
        };

        if let Some(section) = entry.mappings.get(type_name) {
            if let Some(name) = find_conflict("", &section.properties, &update.properties) {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "illegal_argument_exception",
                    &format!("mapper [{}] cannot be changed from its current definition", name),
                );
            }
        }

        let section = entry.mappings.entry(type_name.to_string()).or_default();
        merge_properties(&mut section.properties, update.properties);
        if !update.dynamic_templates.is_empty() {
            section.dynamic_templates = update.dynamic_templates;
        }
        section.extra.extend(update.extra);
        acknowledged()
    }

    fn put_settings(&self, index: &str, body: Value) -> ClusterResponse {
        let update: Settings = match serde_json::from_value(body) {
            Ok(update) => update,
            Err(e) => return mapper_parsing(&e.to_string()),
        };
        let mut entry = match self.indices.get_mut(index) {
            Some(entry) => entry,
            None => return index_not_found(index),
        };

        if !update.analysis.is_empty() && entry.open {
            return error_response(
                StatusCode::BAD_REQUEST,
                "illegal_argument_exception",
                &format!(
                    "Can't update non dynamic settings [[index.analysis]] for open indices [{}]",
                    index
                ),
            );
        }

        let analysis = &mut entry.settings.analysis;
        analysis.analyzer.extend(update.analysis.analyzer);
        analysis.extra.extend(update.analysis.extra);
        entry.settings.extra.extend(update.extra);
        acknowledged()
    }
}

/// Type, index and analyzer of a mapped field are fixed.
fn conflicts(existing: &FieldDescriptor, incoming: &FieldDescriptor) -> bool {
    existing.effective_type() != incoming.effective_type()
        || existing.attrs().is_indexed() != incoming.attrs().is_indexed()
        || existing.attrs().analyzer != incoming.attrs().analyzer
}

/// Dotted name of the first incoming field, at any depth, that would change
/// a mapped one.
fn find_conflict(
    prefix: &str,
    existing: &IndexMap<String, FieldDescriptor>,
    incoming: &IndexMap<String, FieldDescriptor>,
) -> Option<String> {
    incoming.iter().find_map(|(name, field)| {
        let current = existing.get(name)?;
        let path = format!("{}{}", prefix, name);
        if conflicts(current, field) {
            return Some(path);
        }
        match (current.properties(), field.properties()) {
            (Some(current_children), Some(children)) => {
                find_conflict(&format!("{}.", path), current_children, children)
            }
            _ => None,
        }
    })
}

/// Additive merge: new fields are added, children of existing objects are
/// merged, mapped fields are left as they are.
fn merge_properties(
    existing: &mut IndexMap<String, FieldDescriptor>,
    incoming: IndexMap<String, FieldDescriptor>,
) {
    for (name, field) in incoming {
        let current = match existing.get_mut(&name) {
            Some(current) => current,
            None => {
                existing.insert(name, field);
                continue;
            }
        };
        let children = match field {
            FieldDescriptor::Container { properties, .. } => properties,
            _ => continue,
        };
        match current {
            FieldDescriptor::Container { properties, .. } => merge_properties(properties, children),
            FieldDescriptor::Simple(attrs) => {
                // first children of an object mapped without any
                let attrs = std::mem::take(attrs);
                *current = FieldDescriptor::Container {
                    attrs,
                    properties: children,
                };
            }
            FieldDescriptor::MultiField { .. } => {}
        }
    }
}

fn acknowledged() -> ClusterResponse {
    ClusterResponse::ok(json!({"acknowledged": true}))
}

fn error_response(status: StatusCode, kind: &str, reason: &str) -> ClusterResponse {
    ClusterResponse::new(
        status,
        json!({
            "error": {"type": kind, "reason": reason},
            "status": status.as_u16()
        }),
    )
}

fn index_not_found(index: &str) -> ClusterResponse {
    error_response(
        StatusCode::NOT_FOUND,
        "index_not_found_exception",
        &format!("no such index [{}]", index),
    )
}

fn mapper_parsing(reason: &str) -> ClusterResponse {
    error_response(StatusCode::BAD_REQUEST, "mapper_parsing_exception", reason)
}

#[async_trait]
impl Transport for MemoryCluster {
    async fn send(&self, request: ClusterRequest) -> Result<ClusterResponse> {
        let operation = request.operation();
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(IndexSyncError::Transport {
                operation,
                message: "cluster unreachable".to_string(),
            });
        }

        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        if let Some(status) = self.failures.get(operation).map(|s| *s) {
            tracing::debug!("injected failure for {}: {}", operation, status);
            return Ok(error_response(status, "injected_failure", operation));
        }

        Ok(self.handle(request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn put_mapping(index: &str, type_name: &str, body: Value) -> ClusterRequest {
        ClusterRequest::PutMapping {
            index: index.into(),
            type_name: type_name.into(),
            body,
        }
    }

    #[tokio::test]
    async fn test_mapping_merge_is_additive() {
        let cluster = MemoryCluster::new();
        cluster
            .send(ClusterRequest::CreateIndex {
                index: "products".into(),
                body: json!({"mappings": {"doc": {"properties": {"title": {"type": "text"}}}}}),
            })
            .await
            .unwrap();

        let response = cluster
            .send(put_mapping("products", "doc", json!({"properties": {"sku": {"type": "keyword"}}})))
            .await
            .unwrap();
        assert!(response.is_success());

        let response = cluster
            .send(put_mapping("products", "doc", json!({"properties": {"title": {"type": "keyword"}}})))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        let live = cluster.live_schema("products").unwrap();
        let props = &live.section("doc").unwrap().properties;
        assert_eq!(props.keys().collect::<Vec<_>>(), vec!["title", "sku"]);
        assert_eq!(props["title"].field_type(), Some("text"));
    }

    #[tokio::test]
    async fn test_object_children_merge_at_depth() {
        let cluster = MemoryCluster::new();
        cluster
            .send(ClusterRequest::CreateIndex {
                index: "staff".into(),
                body: json!({"mappings": {"doc": {"properties": {
                    "manager": {"properties": {"age": {"type": "long"}}},
                    "meta": {"type": "object"}
                }}}}),
            })
            .await
            .unwrap();

        let response = cluster
            .send(put_mapping(
                "staff",
                "doc",
                json!({"properties": {"manager": {"properties": {"age": {"type": "text"}}}}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.body["error"]["reason"].as_str().unwrap().contains("manager.age"));

        for body in [
            json!({"properties": {"manager": {"properties": {"email": {"type": "keyword"}}}}}),
            json!({"properties": {"meta": {"properties": {"source": {"type": "keyword"}}}}}),
        ] {
            let response = cluster.send(put_mapping("staff", "doc", body)).await.unwrap();
            assert!(response.is_success());
        }

        let live = cluster.live_schema("staff").unwrap();
        let props = &live.section("doc").unwrap().properties;
        let manager: Vec<&str> = props["manager"].properties().unwrap().keys().map(String::as_str).collect();
        assert_eq!(manager, vec!["age", "email"]);
        assert!(props["meta"].properties().unwrap().contains_key("source"));
        assert_eq!(props["meta"].field_type(), Some("object"));
    }

    #[tokio::test]
    async fn test_analyzers_require_closed_index() {
        let cluster = MemoryCluster::new();
        cluster.seed("products", IndexSchema::default());
        let body = json!({"analysis": {"analyzer": {"folded": {"tokenizer": "standard", "filter": ["asciifolding"]}}}});

        let response = cluster
            .send(ClusterRequest::PutSettings {
                index: "products".into(),
                body: body.clone(),
            })
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);

        cluster
            .send(ClusterRequest::CloseIndex {
                index: "products".into(),
            })
            .await
            .unwrap();
        let response = cluster
            .send(ClusterRequest::PutSettings {
                index: "products".into(),
                body,
            })
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(cluster.is_open("products"), Some(false));
        assert!(cluster
            .live_schema("products")
            .unwrap()
            .settings
            .analyzers()
            .contains_key("folded"));
    }

    #[tokio::test]
    async fn test_failure_injection_and_request_log() {
        let cluster = MemoryCluster::new();
        cluster.seed("products", IndexSchema::default());
        cluster.fail_operation("close_index", StatusCode::INTERNAL_SERVER_ERROR);

        let response = cluster
            .send(ClusterRequest::CloseIndex {
                index: "products".into(),
            })
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(cluster.is_open("products"), Some(true));
        assert_eq!(cluster.request_count("close_index"), 1);

        cluster.clear_failures();
        cluster.clear_requests();
        assert!(cluster.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_existing_index_is_rejected() {
        let cluster = MemoryCluster::new();
        cluster.seed("products", IndexSchema::default());
        let response = cluster
            .send(ClusterRequest::CreateIndex {
                index: "products".into(),
                body: json!({}),
            })
            .await
            .unwrap();
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.body["error"]["type"], "resource_already_exists_exception");
    }
}
