//! Default index mapping for place-in-time documents.

use serde_json::{json, Value};

/// Settings and mappings applied to every index created by the pipeline.
///
/// `geometry` is a geo shape, `validSince`/`validUntil` are date ranges
/// and their `*Timestamp` siblings are epoch seconds for range queries.
/// Everything else falls back to dynamic mapping, with string fields
/// indexed as keywords except `name`.
pub fn default_mapping() -> Value {
    json!({
        "settings": {
            "number_of_shards": 1,
            "analysis": {
                "analyzer": {
                    "lowercase": {
                        "type": "custom",
                        "tokenizer": "keyword",
                        "filter": ["lowercase", "asciifolding"]
                    }
                }
            }
        },
        "mappings": {
            "dynamic_templates": [
                {
                    "strings_as_keywords": {
                        "match_mapping_type": "string",
                        "unmatch": "name",
                        "mapping": { "type": "keyword" }
                    }
                }
            ],
            "properties": {
                "id": { "type": "keyword" },
                "uri": { "type": "keyword" },
                "type": { "type": "keyword" },
                "dataset": { "type": "keyword" },
                "name": {
                    "type": "text",
                    "fields": {
                        "analyzed": { "type": "text", "analyzer": "lowercase" },
                        "exact": { "type": "keyword" }
                    }
                },
                "geometry": { "type": "geo_shape" },
                "validSince": { "type": "date", "format": "date_optional_time" },
                "validUntil": { "type": "date", "format": "date_optional_time" },
                "validSinceTimestamp": { "type": "long" },
                "validUntilTimestamp": { "type": "long" }
            }
        }
    })
}
