use indexsync::schema::{AnalyzerDescriptor, IndexSchema};
use indexsync::transport::MemoryCluster;
use indexsync::{IndexDefinition, IndexSync, MemorySink};
use serde_json::json;
use std::sync::Arc;

pub const INDEX: &str = "things";

/// Schema shared by the ensure tests: one `my_thing` section with plain,
/// disabled, dated and multi-field properties plus two custom analyzers.
pub fn test_schema() -> IndexSchema {
    serde_json::from_value(json!({
        "settings": {
            "number_of_shards": 2,
            "analysis": {
                "analyzer": {
                    "lowercase_only": {
                        "type": "custom",
                        "char_filter": [],
                        "tokenizer": "keyword",
                        "filter": ["lowercase"]
                    },
                    "html_snowball": {
                        "type": "custom",
                        "char_filter": ["html_strip"],
                        "tokenizer": "standard",
                        "filter": ["lowercase", "stop", "snowball"]
                    }
                }
            }
        },
        "mappings": {
            "my_thing": {
                "properties": {
                    "atom": {"type": "long"},
                    "atom2": {"type": "long"},
                    "my_bool": {"type": "boolean"},
                    "raw_thing": {"enabled": false},
                    "some_url": {"type": "keyword"},
                    "category": {
                        "type": "text",
                        "analyzer": "snowball",
                        "fields": {
                            "raw": {"type": "keyword"},
                            "lowered": {"type": "text", "analyzer": "lowercase_only"}
                        }
                    },
                    "condition": {"type": "keyword"},
                    "created": {"type": "date", "format": "dateOptionalTime"},
                    "name": {"type": "text", "analyzer": "html_snowball"}
                }
            }
        }
    }))
    .unwrap()
}

#[allow(dead_code)]
pub fn lowercase_only() -> AnalyzerDescriptor {
    AnalyzerDescriptor::custom(&[], "keyword", &["lowercase"])
}

pub struct Harness {
    pub cluster: Arc<MemoryCluster>,
    pub sink: Arc<MemorySink>,
    pub sync: IndexSync,
}

pub fn harness() -> Harness {
    let cluster = Arc::new(MemoryCluster::new());
    let sink = Arc::new(MemorySink::new());
    let sync = IndexSync::new(cluster.clone(), IndexDefinition::new(INDEX, test_schema()))
        .with_sink(sink.clone());
    Harness { cluster, sink, sync }
}

/// Harness whose index already exists with the test schema.
#[allow(dead_code)]
pub fn seeded_harness() -> Harness {
    let h = harness();
    h.cluster.seed(INDEX, test_schema());
    h
}
