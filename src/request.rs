//! Render request payloads and the contract pipeline
//!
//! [`run_request`] is the batch-facing entry point: it never returns a Rust
//! error for a bad payload or a failed render. Rejections come back as
//! error-contract values and render failures as output-contract values with
//! `status: "failure"`, so an orchestrator looping over many graphs can
//! record each outcome and keep going.

use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::contracts::{self, INPUT_SCHEMA, RENDER_COMMAND};
use crate::export::{Engine, ExportRequest, Exporter, OutputFormat};
use crate::graph::GraphBuilder;
use crate::locate::RendererLocator;
use crate::report;

// ============================================================================
// PAYLOAD TYPES
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct RenderRequest {
    pub command: String,
    pub parameters: Parameters,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Parameters {
    #[serde(default = "default_directed")]
    pub directed: bool,
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub graph_attributes: Map<String, Value>,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    #[serde(default)]
    pub export: Option<ExportSpec>,
}

fn default_directed() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EdgeSpec {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportSpec {
    pub enable: bool,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

impl Parameters {
    /// Layout engine named by the payload, defaulting to `dot`.
    pub fn engine(&self) -> Result<Engine, String> {
        match self.engine.as_deref() {
            None => Ok(Engine::default()),
            Some(name) => Engine::parse(name)
                .ok_or_else(|| format!("unknown layout engine '{name}'")),
        }
    }

    /// Replay the payload into a builder in a fixed order so equal payloads
    /// produce identical DOT source.
    pub fn to_builder(&self) -> GraphBuilder {
        let mut builder = GraphBuilder::new(self.directed);
        for (key, value) in &self.graph_attributes {
            builder.graph_attr(key, attr_text(value));
        }
        for node in &self.nodes {
            let mut attrs: Vec<(String, String)> = node
                .attributes
                .iter()
                .map(|(key, value)| (key.clone(), attr_text(value)))
                .collect();
            if let Some(label) = &node.label {
                attrs.push(("label".to_string(), label.clone()));
            }
            builder.add_node_with(&node.id, attrs);
        }
        for edge in &self.edges {
            let mut attrs: Vec<(String, String)> = edge
                .attributes
                .iter()
                .map(|(key, value)| (key.clone(), attr_text(value)))
                .collect();
            if let Some(label) = &edge.label {
                attrs.push(("label".to_string(), label.clone()));
            }
            builder.add_edge_with(&edge.source, &edge.target, attrs);
        }
        builder
    }
}

/// Attribute values pass through verbatim: strings as-is, other JSON
/// scalars via their JSON rendering. Whether the result means anything is
/// the renderer's concern.
fn attr_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

// ============================================================================
// RUN OPTIONS
// ============================================================================

/// Caller-side overrides for one run, typically from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit renderer binary; wins over vendored and `PATH` lookup.
    pub dot_binary: Option<PathBuf>,
    /// Vendored Graphviz bundle to search before `PATH`.
    pub vendor_root: Option<PathBuf>,
    /// Overrides the payload's export directory.
    pub output_dir: Option<PathBuf>,
    /// Overrides the payload's export format.
    pub format: Option<OutputFormat>,
    /// Where run reports are written.
    pub reports_dir: Option<PathBuf>,
    pub write_report: bool,
}

// ============================================================================
// PIPELINE
// ============================================================================

/// Run one render request end to end; failures are returned as data.
pub fn run_request(payload: &Value, options: &RunOptions) -> Value {
    if let Err(err) = contracts::validate_payload(payload, &INPUT_SCHEMA) {
        return failure_value(&err.to_string());
    }
    let request: RenderRequest = match serde_json::from_value(payload.clone()) {
        Ok(request) => request,
        Err(err) => return failure_value(&format!("payload does not deserialize: {err}")),
    };
    debug_assert_eq!(request.command, RENDER_COMMAND);

    let engine = match request.parameters.engine() {
        Ok(engine) => engine,
        Err(message) => return failure_value(&message),
    };

    let dot_source = request.parameters.to_builder().dot_source();
    let mut output = json!({
        "status": "success",
        "dot_source": dot_source,
        "svg_path": Value::Null,
        "report_path": Value::Null,
    });

    let export_spec = request.parameters.export.as_ref().filter(|spec| spec.enable);
    if let Some(spec) = export_spec {
        let result = run_export(&dot_source, spec, engine, options);
        if result.success {
            output["svg_path"] = json!(result.output_path.clone());
        } else {
            output["status"] = json!("failure");
            output["message"] = json!(result
                .error_detail
                .clone()
                .unwrap_or_else(|| "export failed".to_string()));
        }
        output["export_result"] = serde_json::to_value(&result).unwrap_or(Value::Null);
    }

    if options.write_report {
        let dir = options
            .reports_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("reports"));
        match report::write_report(&dir, &output) {
            Ok(path) => output["report_path"] = json!(path),
            // audit is best-effort; the render outcome stands
            Err(err) => tracing::warn!(error = %err, "run report not written"),
        }
    }

    output
}

fn run_export(
    dot_source: &str,
    spec: &ExportSpec,
    engine: Engine,
    options: &RunOptions,
) -> crate::export::ExportResult {
    let format = options.format.or(spec.format).unwrap_or_default();
    let directory = options
        .output_dir
        .clone()
        .or_else(|| spec.directory.clone().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."));
    let filename = spec.filename.clone().unwrap_or_else(|| "graph".to_string());

    let mut locator = RendererLocator::new();
    if let Some(binary) = &options.dot_binary {
        locator = locator.with_explicit(binary);
    }
    if let Some(root) = &options.vendor_root {
        locator = locator.with_vendor_root(root);
    }

    let exporter = Exporter::new().with_locator(locator);
    let request = ExportRequest {
        output_base: directory.join(filename),
        format,
        engine,
    };
    exporter.export(dot_source, &request)
}

fn failure_value(message: &str) -> Value {
    json!({
        "status": "failure",
        "message": message,
    })
}
