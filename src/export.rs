//! Renderer invocation and export results
//!
//! One synchronous attempt per export. Every failure (missing renderer,
//! non-zero exit, timeout) comes back as an [`ExportResult`] with
//! `success == false`, never as an error, so a bad graph in a batch cannot
//! abort sibling exports. The `.dot` source is written before the renderer
//! runs and stays on disk whatever happens.

use std::ffi::OsString;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use wait_timeout::ChildExt;

use crate::locate::RendererLocator;

/// Default bound on a single renderer run.
const DEFAULT_RENDER_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// FORMATS AND ENGINES
// ============================================================================

/// Output format handed to the renderer via `-T`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Svg,
    Png,
    Pdf,
}

impl OutputFormat {
    /// File extension; doubles as the `-T` token.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Svg => "svg",
            OutputFormat::Png => "png",
            OutputFormat::Pdf => "pdf",
        }
    }
}

/// Layout engine handed to the renderer via `-K`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Engine {
    #[default]
    Dot,
    Neato,
    Fdp,
    Sfdp,
    Circo,
    Twopi,
}

impl Engine {
    pub fn as_str(self) -> &'static str {
        match self {
            Engine::Dot => "dot",
            Engine::Neato => "neato",
            Engine::Fdp => "fdp",
            Engine::Sfdp => "sfdp",
            Engine::Circo => "circo",
            Engine::Twopi => "twopi",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "dot" => Some(Engine::Dot),
            "neato" => Some(Engine::Neato),
            "fdp" => Some(Engine::Fdp),
            "sfdp" => Some(Engine::Sfdp),
            "circo" => Some(Engine::Circo),
            "twopi" => Some(Engine::Twopi),
            _ => None,
        }
    }
}

// ============================================================================
// EXPORT RESULT
// ============================================================================

/// Structured outcome of one render attempt. Created once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub success: bool,
    /// Artifact actually produced (only on success).
    pub output_path: Option<PathBuf>,
    /// The `.dot` source written next to the requested artifact.
    pub dot_path: Option<PathBuf>,
    /// Non-empty diagnostic on failure; renderer stderr is kept verbatim.
    pub error_detail: Option<String>,
    pub duration_ms: u64,
    pub format: OutputFormat,
}

impl ExportResult {
    fn succeeded(
        output_path: PathBuf,
        dot_path: PathBuf,
        duration_ms: u64,
        format: OutputFormat,
    ) -> Self {
        Self {
            success: true,
            output_path: Some(output_path),
            dot_path: Some(dot_path),
            error_detail: None,
            duration_ms,
            format,
        }
    }

    fn failed(
        dot_path: Option<PathBuf>,
        detail: impl Into<String>,
        duration_ms: u64,
        format: OutputFormat,
    ) -> Self {
        Self {
            success: false,
            output_path: None,
            dot_path,
            error_detail: Some(detail.into()),
            duration_ms,
            format,
        }
    }
}

// ============================================================================
// RUNNER SEAM
// ============================================================================

/// One renderer process invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderInvocation {
    pub binary: PathBuf,
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: OutputFormat,
    pub engine: Engine,
}

impl RenderInvocation {
    /// Argv after the binary: `-T<fmt> [-K<engine>] <input> -o <output>`.
    pub fn args(&self) -> Vec<OsString> {
        let mut args = vec![OsString::from(format!("-T{}", self.format.extension()))];
        if self.engine != Engine::Dot {
            args.push(OsString::from(format!("-K{}", self.engine.as_str())));
        }
        args.push(self.input.clone().into_os_string());
        args.push(OsString::from("-o"));
        args.push(self.output.clone().into_os_string());
        args
    }
}

/// What a finished renderer process reported.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status_ok: bool,
    pub stderr: String,
}

/// Seam between the exporter and the operating system, so tests can render
/// without a Graphviz install.
pub trait RenderRunner: Send + Sync {
    fn run(&self, invocation: &RenderInvocation, timeout: Duration) -> std::io::Result<RunOutcome>;
}

/// Production runner: spawns the renderer with piped stdio and a bounded
/// wait. On expiry the child is killed and reaped before returning.
pub struct SystemRunner;

impl RenderRunner for SystemRunner {
    fn run(&self, invocation: &RenderInvocation, timeout: Duration) -> std::io::Result<RunOutcome> {
        let mut child = Command::new(&invocation.binary)
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        match child.wait_timeout(timeout)? {
            Some(status) => {
                let stderr = child
                    .stderr
                    .take()
                    .map(|mut pipe| {
                        let mut buf = String::new();
                        pipe.read_to_string(&mut buf).ok();
                        buf
                    })
                    .unwrap_or_default();
                Ok(RunOutcome {
                    status_ok: status.success(),
                    stderr,
                })
            }
            None => {
                let _ = child.kill();
                let _ = child.wait(); // reap the zombie
                Ok(RunOutcome {
                    status_ok: false,
                    stderr: format!("renderer timed out after {}s", timeout.as_secs()),
                })
            }
        }
    }
}

/// Mock runner for tests: serves a scripted behavior and records every
/// invocation for assertions.
pub struct MockRunner {
    behavior: MockBehavior,
    invocations: Mutex<Vec<RenderInvocation>>,
}

enum MockBehavior {
    /// Pretend success and write this body to the requested output path.
    Succeed(String),
    /// Pretend the renderer exited non-zero with this stderr.
    Fail(String),
    /// Pretend the spawn itself failed.
    IoError(std::io::ErrorKind),
}

impl MockRunner {
    pub fn succeeding(artifact_body: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Succeed(artifact_body.into()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(stderr: impl Into<String>) -> Self {
        Self {
            behavior: MockBehavior::Fail(stderr.into()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn erroring(kind: std::io::ErrorKind) -> Self {
        Self {
            behavior: MockBehavior::IoError(kind),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<RenderInvocation> {
        self.invocations.lock().map(|i| i.clone()).unwrap_or_default()
    }
}

impl RenderRunner for MockRunner {
    fn run(&self, invocation: &RenderInvocation, _timeout: Duration) -> std::io::Result<RunOutcome> {
        if let Ok(mut recorded) = self.invocations.lock() {
            recorded.push(invocation.clone());
        }
        match &self.behavior {
            MockBehavior::Succeed(body) => {
                fs::write(&invocation.output, body)?;
                Ok(RunOutcome {
                    status_ok: true,
                    stderr: String::new(),
                })
            }
            MockBehavior::Fail(stderr) => Ok(RunOutcome {
                status_ok: false,
                stderr: stderr.clone(),
            }),
            MockBehavior::IoError(kind) => Err(std::io::Error::new(*kind, "mock spawn failure")),
        }
    }
}

// ============================================================================
// EXPORTER
// ============================================================================

/// Where and how to render one graph.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Output path without extension; `.dot` and `.<format>` are derived.
    pub output_base: PathBuf,
    pub format: OutputFormat,
    pub engine: Engine,
}

impl ExportRequest {
    pub fn svg(output_base: impl Into<PathBuf>) -> Self {
        Self {
            output_base: output_base.into(),
            format: OutputFormat::Svg,
            engine: Engine::Dot,
        }
    }
}

/// Runs the external renderer against serialized DOT source.
pub struct Exporter {
    locator: RendererLocator,
    runner: Box<dyn RenderRunner>,
    timeout: Duration,
}

impl Exporter {
    pub fn new() -> Self {
        Self {
            locator: RendererLocator::new(),
            runner: Box::new(SystemRunner),
            timeout: DEFAULT_RENDER_TIMEOUT,
        }
    }

    pub fn with_locator(mut self, locator: RendererLocator) -> Self {
        self.locator = locator;
        self
    }

    pub fn with_runner(mut self, runner: Box<dyn RenderRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Render `dot_source` to `<base>.<format>`, writing `<base>.dot` first.
    ///
    /// Concurrent exports are safe only with distinct output bases; two
    /// exports writing the same path race on the filesystem.
    pub fn export(&self, dot_source: &str, request: &ExportRequest) -> ExportResult {
        let started = Instant::now();
        let format = request.format;
        let dot_path = request.output_base.with_extension("dot");

        if let Err(err) = write_dot_file(&dot_path, dot_source) {
            return ExportResult::failed(
                None,
                format!("failed to write '{}': {}", dot_path.display(), err),
                elapsed_ms(started),
                format,
            );
        }

        let binary = match self.locator.locate() {
            Some(path) => path,
            None => {
                let detail = self.locator.describe_miss();
                tracing::debug!(dot_path = %dot_path.display(), %detail, "export skipped");
                return ExportResult::failed(Some(dot_path), detail, elapsed_ms(started), format);
            }
        };

        let invocation = RenderInvocation {
            binary,
            input: dot_path.clone(),
            output: request.output_base.with_extension(format.extension()),
            format,
            engine: request.engine,
        };

        tracing::debug!(
            binary = %invocation.binary.display(),
            output = %invocation.output.display(),
            "invoking renderer"
        );

        match self.runner.run(&invocation, self.timeout) {
            Ok(outcome) if outcome.status_ok => {
                if invocation.output.is_file() {
                    ExportResult::succeeded(
                        invocation.output,
                        dot_path,
                        elapsed_ms(started),
                        format,
                    )
                } else {
                    ExportResult::failed(
                        Some(dot_path),
                        "renderer reported success but produced no artifact",
                        elapsed_ms(started),
                        format,
                    )
                }
            }
            Ok(outcome) => {
                let detail = if outcome.stderr.is_empty() {
                    "renderer exited with a failure status".to_string()
                } else {
                    outcome.stderr
                };
                ExportResult::failed(Some(dot_path), detail, elapsed_ms(started), format)
            }
            Err(err) => ExportResult::failed(
                Some(dot_path),
                format!(
                    "failed to run renderer '{}': {}",
                    invocation.binary.display(),
                    err
                ),
                elapsed_ms(started),
                format,
            ),
        }
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

fn write_dot_file(path: &Path, source: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, source)
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;

    fn two_node_source() -> String {
        let mut builder = GraphBuilder::new(true);
        builder.add_node("A").add_node("B").add_edge("A", "B");
        builder.dot_source()
    }

    fn pinned_locator(dir: &Path) -> RendererLocator {
        let binary = dir.join("dot");
        fs::write(&binary, b"elf").unwrap();
        RendererLocator::new().with_explicit(binary)
    }

    #[test]
    fn missing_renderer_fails_but_writes_dot() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("diagram");
        let exporter = Exporter::new()
            .with_locator(RendererLocator::new().with_explicit("/no/such/dot"));

        let result = exporter.export(&two_node_source(), &ExportRequest::svg(&base));

        assert!(!result.success);
        assert!(result.output_path.is_none());
        assert!(!result.error_detail.as_deref().unwrap_or("").is_empty());
        let dot_path = result.dot_path.unwrap();
        assert!(dot_path.is_file());
        assert!(fs::read_to_string(dot_path).unwrap().contains("digraph"));
    }

    #[test]
    fn successful_render_reports_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("diagram");
        let exporter = Exporter::new()
            .with_locator(pinned_locator(dir.path()))
            .with_runner(Box::new(MockRunner::succeeding("<svg />")));

        let result = exporter.export(&two_node_source(), &ExportRequest::svg(&base));

        assert!(result.success);
        let artifact = result.output_path.unwrap();
        assert_eq!(artifact, base.with_extension("svg"));
        assert_eq!(fs::read_to_string(artifact).unwrap(), "<svg />");
        assert!(result.error_detail.is_none());
    }

    #[test]
    fn renderer_failure_preserves_stderr_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("diagram");
        let exporter = Exporter::new()
            .with_locator(pinned_locator(dir.path()))
            .with_runner(Box::new(MockRunner::failing("syntax error in line 3")));

        let result = exporter.export(&two_node_source(), &ExportRequest::svg(&base));

        assert!(!result.success);
        assert_eq!(result.error_detail.as_deref(), Some("syntax error in line 3"));
        assert!(result.dot_path.unwrap().is_file());
    }

    #[test]
    fn spawn_error_becomes_failed_result() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("diagram");
        let exporter = Exporter::new()
            .with_locator(pinned_locator(dir.path()))
            .with_runner(Box::new(MockRunner::erroring(
                std::io::ErrorKind::PermissionDenied,
            )));

        let result = exporter.export(&two_node_source(), &ExportRequest::svg(&base));

        assert!(!result.success);
        assert!(result
            .error_detail
            .as_deref()
            .unwrap()
            .contains("failed to run renderer"));
    }

    #[test]
    fn invocation_args_include_format_and_nondefault_engine() {
        let runner = MockRunner::succeeding("<svg />");
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("diagram");
        let exporter = Exporter::new()
            .with_locator(pinned_locator(dir.path()))
            .with_runner(Box::new(runner));
        // the runner moved into the exporter; rebuild to inspect args directly
        let invocation = RenderInvocation {
            binary: PathBuf::from("dot"),
            input: base.with_extension("dot"),
            output: base.with_extension("png"),
            format: OutputFormat::Png,
            engine: Engine::Neato,
        };
        let args = invocation.args();
        assert_eq!(args[0], OsString::from("-Tpng"));
        assert_eq!(args[1], OsString::from("-Kneato"));
        assert_eq!(args[args.len() - 2], OsString::from("-o"));

        let request = ExportRequest {
            output_base: base,
            format: OutputFormat::Png,
            engine: Engine::Neato,
        };
        let result = exporter.export(&two_node_source(), &request);
        assert!(result.success);
        assert_eq!(
            result.output_path.unwrap().extension().unwrap(),
            "png"
        );
    }

    #[test]
    fn default_engine_is_not_passed_as_flag() {
        let invocation = RenderInvocation {
            binary: PathBuf::from("dot"),
            input: PathBuf::from("g.dot"),
            output: PathBuf::from("g.svg"),
            format: OutputFormat::Svg,
            engine: Engine::Dot,
        };
        let args = invocation.args();
        assert!(!args.iter().any(|a| a.to_string_lossy().starts_with("-K")));
    }

    #[test]
    fn mock_runner_records_invocations() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("diagram");
        let runner = std::sync::Arc::new(MockRunner::succeeding("<svg />"));

        struct Shared(std::sync::Arc<MockRunner>);
        impl RenderRunner for Shared {
            fn run(
                &self,
                invocation: &RenderInvocation,
                timeout: Duration,
            ) -> std::io::Result<RunOutcome> {
                self.0.run(invocation, timeout)
            }
        }

        let exporter = Exporter::new()
            .with_locator(pinned_locator(dir.path()))
            .with_runner(Box::new(Shared(std::sync::Arc::clone(&runner))));
        exporter.export(&two_node_source(), &ExportRequest::svg(&base));

        let invocations = runner.invocations();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].output, base.with_extension("svg"));
    }

    #[test]
    fn export_result_serializes_for_audit() {
        let result = ExportResult::failed(None, "renderer not found", 3, OutputFormat::Svg);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["success"], serde_json::json!(false));
        assert_eq!(value["error_detail"], serde_json::json!("renderer not found"));
        assert_eq!(value["format"], serde_json::json!("svg"));
    }

    #[test]
    fn engine_parse_round_trip() {
        for engine in [
            Engine::Dot,
            Engine::Neato,
            Engine::Fdp,
            Engine::Sfdp,
            Engine::Circo,
            Engine::Twopi,
        ] {
            assert_eq!(Engine::parse(engine.as_str()), Some(engine));
        }
        assert_eq!(Engine::parse("patchwork"), None);
    }
}
