//! JSON contracts for render requests and results
//!
//! Three schemas: the input payload an orchestrator submits, the output
//! record a successful run returns, and the error record a rejected run
//! returns. Payloads are validated with all violations collected into one
//! diagnostic rather than stopping at the first.

use once_cell::sync::Lazy;
use serde_json::{json, Value};

use crate::error::DotsmithError;

/// The `command` constant accepted in input payloads.
pub const RENDER_COMMAND: &str = "render_graph";

static NODE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "id": {"type": "string"},
            "label": {"type": ["string", "null"]},
            "attributes": {"type": "object"},
        },
        "required": ["id"],
        "additionalProperties": true,
    })
});

static EDGE_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "type": "object",
        "properties": {
            "source": {"type": "string"},
            "target": {"type": "string"},
            "label": {"type": ["string", "null"]},
            "attributes": {"type": "object"},
        },
        "required": ["source", "target"],
        "additionalProperties": true,
    })
});

pub static INPUT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "dotsmith render input",
        "type": "object",
        "properties": {
            "command": {"const": RENDER_COMMAND},
            "parameters": {
                "type": "object",
                "properties": {
                    "directed": {"type": "boolean"},
                    "engine": {"type": ["string", "null"], "minLength": 1},
                    "graph_attributes": {"type": "object"},
                    "nodes": {"type": "array", "items": &*NODE_SCHEMA, "minItems": 1},
                    "edges": {"type": "array", "items": &*EDGE_SCHEMA},
                    "export": {
                        "type": "object",
                        "properties": {
                            "enable": {"type": "boolean"},
                            "filename": {"type": ["string", "null"]},
                            "directory": {"type": ["string", "null"]},
                            "format": {"type": ["string", "null"], "enum": ["svg", "png", "pdf", null]},
                        },
                        "required": ["enable"],
                        "additionalProperties": false,
                    },
                },
                "required": ["nodes", "edges"],
                "additionalProperties": false,
            },
        },
        "required": ["command", "parameters"],
        "additionalProperties": false,
    })
});

pub static OUTPUT_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "dotsmith render output",
        "type": "object",
        "properties": {
            "status": {"enum": ["success", "failure"]},
            "dot_source": {"type": "string"},
            "svg_path": {"type": ["string", "null"]},
            "report_path": {"type": ["string", "null"]},
        },
        "required": ["status", "dot_source"],
        "additionalProperties": true,
    })
});

pub static ERROR_SCHEMA: Lazy<Value> = Lazy::new(|| {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "title": "dotsmith render error",
        "type": "object",
        "properties": {
            "status": {"const": "failure"},
            "message": {"type": "string"},
            "details": {"type": "array", "items": {"type": "string"}},
        },
        "required": ["status", "message"],
        "additionalProperties": true,
    })
});

/// Validate `payload` against `schema`, collecting every violation.
pub fn validate_payload(payload: &Value, schema: &Value) -> Result<(), DotsmithError> {
    let compiled = jsonschema::validator_for(schema).map_err(|e| DotsmithError::SchemaInvalid {
        details: e.to_string(),
    })?;
    let errors: Vec<String> = compiled
        .iter_errors(payload)
        .map(|e| e.to_string())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(DotsmithError::PayloadInvalid {
            details: errors.join("; "),
        })
    }
}
