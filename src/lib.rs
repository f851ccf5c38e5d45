//! Dotsmith - Graphviz DOT graph builder and export runner

pub mod contracts;
pub mod error;
pub mod export;
pub mod graph;
pub mod locate;
pub mod report;
pub mod request;
pub mod vendor;

pub use contracts::{validate_payload, ERROR_SCHEMA, INPUT_SCHEMA, OUTPUT_SCHEMA, RENDER_COMMAND};
pub use error::{DotsmithError, FixSuggestion};
pub use export::{
    Engine, ExportRequest, ExportResult, Exporter, MockRunner, OutputFormat, RenderInvocation,
    RenderRunner, RunOutcome, SystemRunner,
};
pub use graph::{AttrList, GraphBuilder};
pub use locate::RendererLocator;
pub use report::write_report;
pub use request::{run_request, Parameters, RenderRequest, RunOptions};
