use serde_json::{json, Value};
use std::sync::LazyLock;

pub static CONFIG_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "server": {
                "type": "object",
                "properties": {
                    "host": { "type": "string" },
                    "port": { "type": "integer", "minimum": 1, "maximum": 65535 }
                }
            },
            "database": {
                "type": "object",
                "properties": {
                    "path": { "type": "string", "minLength": 1 }
                }
            },
            "auth": {
                "type": "object",
                "properties": {
                    "secret_key": { "type": "string", "minLength": 16 },
                    "token_ttl_minutes": { "type": "integer", "minimum": 1 }
                }
            },
            "bridge": {
                "type": "object",
                "properties": {
                    "url": { "type": "string", "format": "uri" },
                    "timeout_secs": { "type": "integer", "minimum": 1 }
                }
            },
            "tracking": {
                "type": "object",
                "properties": {
                    "default_log_limit": { "type": "integer", "minimum": 1 }
                }
            }
        }
    })
});
