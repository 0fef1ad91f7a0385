//! Invocation Proxy
//!
//! Runs shell commands, code snippets and management commands through the
//! deployed (or locally emulated) WSGI handler function by delegating to
//! the host framework's own invoke pipeline. The pipeline's output is
//! captured through an injected sink scoped to the call, then parsed as a
//! `[exit_code, result]` pair and re-emitted to the user.

use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};

use serde::Serialize;
use serde_json::Value;

use crate::error::{WsgiError, WsgiResult};
use crate::service::{ServiceDescriptor, WSGI_HANDLER};

/// Kind of work the handler shim is asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Command,
    Exec,
    Manage,
}

/// Payload handed to the invoke pipeline, wrapped under the plugin's own
/// key so the handler shim can tell it apart from HTTP events
#[derive(Debug, Clone, Serialize)]
pub struct InvocationPayload {
    pub command: CommandKind,
    pub data: String,
}

impl InvocationPayload {
    pub fn new(command: CommandKind, data: String) -> Self {
        Self { command, data }
    }

    /// Serialize to the transport string consumed by the invoke pipeline
    pub fn to_transport(&self) -> WsgiResult<String> {
        #[derive(Serialize)]
        struct Envelope<'a> {
            #[serde(rename = "_wsgipack")]
            inner: &'a InvocationPayload,
        }
        Ok(serde_json::to_string(&Envelope { inner: self })?)
    }
}

/// Remote or locally emulated invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvokeMode {
    Remote,
    Local,
}

/// Destination for human-readable output.
///
/// The invoke pipeline writes into a sink scoped to one call; the user
/// logger is a sink too. No global log state is touched, so restoration
/// on error paths is structural rather than something to remember.
pub trait LogSink {
    fn log(&mut self, message: &str);
}

/// Sink printing straight to stdout (the CLI user logger)
#[derive(Debug, Default)]
pub struct StdoutSink;

impl LogSink for StdoutSink {
    fn log(&mut self, message: &str) {
        println!("{message}");
    }
}

/// Buffer sink used to capture pipeline output for demultiplexing
#[derive(Debug, Default)]
struct CaptureSink {
    buffer: String,
}

impl LogSink for CaptureSink {
    fn log(&mut self, message: &str) {
        self.buffer.push_str(message);
        self.buffer.push('\n');
    }
}

/// The host framework's invoke mechanism, seen from the plugin.
///
/// Implementations receive the resolved function name and the serialized
/// payload and write whatever the pipeline prints into `sink`.
pub trait InvokePipeline {
    fn run(
        &mut self,
        function: &str,
        data: &str,
        mode: InvokeMode,
        sink: &mut dyn LogSink,
    ) -> WsgiResult<()>;
}

/// Pipeline that shells out to the host framework CLI
/// (`serverless invoke [local] -f FN -d DATA`).
pub struct FrameworkCli {
    pub binary: String,
}

impl Default for FrameworkCli {
    fn default() -> Self {
        Self {
            binary: "serverless".to_string(),
        }
    }
}

impl InvokePipeline for FrameworkCli {
    fn run(
        &mut self,
        function: &str,
        data: &str,
        mode: InvokeMode,
        sink: &mut dyn LogSink,
    ) -> WsgiResult<()> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("invoke");
        if mode == InvokeMode::Local {
            cmd.arg("local");
        }
        cmd.args(["--function", function, "--data", data]);

        let output = cmd.stdin(Stdio::null()).output()?;
        if !output.status.success() {
            return Err(WsgiError::InvokeFailed {
                message: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
            });
        }

        sink.log(String::from_utf8_lossy(&output.stdout).trim_end_matches('\n'));
        Ok(())
    }
}

/// Resolve the target function: an explicit `--function` name must exist;
/// otherwise the single function declaring the WSGI shim handler.
pub fn resolve_function(
    service: &ServiceDescriptor,
    explicit: Option<&str>,
) -> WsgiResult<String> {
    if let Some(name) = explicit {
        if service.functions.contains_key(name) {
            return Ok(name.to_string());
        }
        return Err(WsgiError::FunctionNotFound {
            name: name.to_string(),
        });
    }

    service
        .find_wsgi_function()
        .map(str::to_string)
        .ok_or_else(|| WsgiError::NoHandlerFunction {
            handler: WSGI_HANDLER.to_string(),
        })
}

/// Resolve payload data from a literal argument or a referenced file
pub fn resolve_data(command: Option<&str>, file: Option<&Path>) -> WsgiResult<String> {
    if let Some(data) = command {
        return Ok(data.to_string());
    }
    if let Some(path) = file {
        return Ok(fs::read_to_string(path)?);
    }
    Err(WsgiError::MissingInvokeInput)
}

/// Invoke the handler function with a payload and demultiplex the
/// pipeline's captured output back to the user logger.
pub fn invoke_handler(
    service: &ServiceDescriptor,
    pipeline: &mut dyn InvokePipeline,
    kind: CommandKind,
    data: String,
    mode: InvokeMode,
    explicit_function: Option<&str>,
    logger: &mut dyn LogSink,
) -> WsgiResult<()> {
    let function = resolve_function(service, explicit_function)?;
    let transport = InvocationPayload::new(kind, data).to_transport()?;

    let mut capture = CaptureSink::default();
    pipeline.run(&function, &transport, mode, &mut capture)?;

    demux_output(capture.buffer.trim_end_matches('\n'), logger)
}

/// Interpret pipeline output as a `[exit_code, result]` pair.
///
/// Exit code 0 emits the unwrapped result; non-zero surfaces the result as
/// the error. Anything that is not such a pair passes through verbatim -
/// some runtimes intentionally emit unstructured output.
fn demux_output(output: &str, logger: &mut dyn LogSink) -> WsgiResult<()> {
    let binding = serde_json::from_str::<Value>(output);
    let parsed: Option<(i64, &Value)> = match binding {
        Ok(Value::Array(ref items)) if items.len() == 2 => {
            items[0].as_i64().map(|code| (code, &items[1]))
        }
        _ => None,
    };

    let Some((exit_code, result)) = parsed else {
        logger.log(output);
        return Ok(());
    };

    let rendered = match result {
        Value::String(s) => s.trim_end_matches('\n').to_string(),
        other => other.to_string(),
    };

    if exit_code == 0 {
        logger.log(&rendered);
        Ok(())
    } else {
        Err(WsgiError::InvokeFailed { message: rendered })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ServiceDescriptor {
        serde_yaml_ng::from_str(yaml).unwrap()
    }

    /// Pipeline scripted to emit fixed output, recording what it was
    /// called with
    struct MockPipeline {
        output: Vec<String>,
        calls: Vec<(String, String, InvokeMode)>,
    }

    impl MockPipeline {
        fn emitting(lines: &[&str]) -> Self {
            Self {
                output: lines.iter().map(|s| s.to_string()).collect(),
                calls: Vec::new(),
            }
        }
    }

    impl InvokePipeline for MockPipeline {
        fn run(
            &mut self,
            function: &str,
            data: &str,
            mode: InvokeMode,
            sink: &mut dyn LogSink,
        ) -> WsgiResult<()> {
            self.calls.push((function.to_string(), data.to_string(), mode));
            for line in &self.output {
                sink.log(line);
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct VecSink {
        lines: Vec<String>,
    }

    impl LogSink for VecSink {
        fn log(&mut self, message: &str) {
            self.lines.push(message.to_string());
        }
    }

    const SERVICE_WITH_HANDLER: &str = "functions:
  api:
    handler: wsgi_handler.handler
  worker:
    handler: worker.handler
";

    #[test]
    fn payload_transport_shape() {
        let payload = InvocationPayload::new(CommandKind::Command, "ls -la".to_string());
        assert_eq!(
            payload.to_transport().unwrap(),
            r#"{"_wsgipack":{"command":"command","data":"ls -la"}}"#
        );
    }

    #[test]
    fn payload_kinds_serialize_lowercase() {
        for (kind, expected) in [
            (CommandKind::Command, "command"),
            (CommandKind::Exec, "exec"),
            (CommandKind::Manage, "manage"),
        ] {
            let transport = InvocationPayload::new(kind, String::new())
                .to_transport()
                .unwrap();
            assert!(transport.contains(&format!("\"command\":\"{expected}\"")));
        }
    }

    #[test]
    fn resolve_function_finds_shim_handler() {
        let service = parse(SERVICE_WITH_HANDLER);
        assert_eq!(resolve_function(&service, None).unwrap(), "api");
    }

    #[test]
    fn resolve_function_without_handler_errors() {
        let service = parse("functions:\n  worker:\n    handler: worker.handler\n");
        let err = resolve_function(&service, None).unwrap_err();
        assert!(matches!(err, WsgiError::NoHandlerFunction { .. }));
        assert!(err.to_string().contains("wsgi_handler.handler"));
    }

    #[test]
    fn resolve_function_explicit_override() {
        let service = parse(SERVICE_WITH_HANDLER);
        // The override may name any function, handler or not
        assert_eq!(resolve_function(&service, Some("worker")).unwrap(), "worker");
    }

    #[test]
    fn resolve_function_explicit_missing_errors() {
        let service = parse(SERVICE_WITH_HANDLER);
        let err = resolve_function(&service, Some("ghost")).unwrap_err();
        match err {
            WsgiError::FunctionNotFound { name } => assert_eq!(name, "ghost"),
            other => panic!("expected FunctionNotFound, got {other:?}"),
        }
    }

    #[test]
    fn resolve_data_prefers_literal_command() {
        let data = resolve_data(Some("print(1)"), None).unwrap();
        assert_eq!(data, "print(1)");
    }

    #[test]
    fn resolve_data_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("script.py");
        std::fs::write(&script, "print(2)\n").unwrap();

        let data = resolve_data(None, Some(&script)).unwrap();
        assert_eq!(data, "print(2)\n");
    }

    #[test]
    fn resolve_data_without_input_errors() {
        let err = resolve_data(None, None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Please provide either a command (-c) or a file (-f)"
        );
    }

    #[test]
    fn invoke_round_trip_unwraps_success_result() {
        let service = parse(SERVICE_WITH_HANDLER);
        let mut pipeline = MockPipeline::emitting(&[r#"[0, "hello\n"]"#]);
        let mut logger = VecSink::default();

        invoke_handler(
            &service,
            &mut pipeline,
            CommandKind::Command,
            "echo hello".to_string(),
            InvokeMode::Remote,
            None,
            &mut logger,
        )
        .unwrap();

        assert_eq!(logger.lines, vec!["hello"]);
        let (function, data, mode) = &pipeline.calls[0];
        assert_eq!(function, "api");
        assert_eq!(*mode, InvokeMode::Remote);
        assert!(data.contains(r#""command":"command""#));
        assert!(data.contains(r#""data":"echo hello""#));
    }

    #[test]
    fn invoke_nonzero_exit_surfaces_result_as_error() {
        let service = parse(SERVICE_WITH_HANDLER);
        let mut pipeline = MockPipeline::emitting(&[r#"[1, "command not found"]"#]);
        let mut logger = VecSink::default();

        let err = invoke_handler(
            &service,
            &mut pipeline,
            CommandKind::Command,
            "nope".to_string(),
            InvokeMode::Remote,
            None,
            &mut logger,
        )
        .unwrap_err();

        assert_eq!(err.to_string(), "command not found");
        assert!(logger.lines.is_empty());
    }

    #[test]
    fn invoke_malformed_output_passes_through_verbatim() {
        let service = parse(SERVICE_WITH_HANDLER);
        let mut pipeline = MockPipeline::emitting(&["START RequestId: 42", "plain text"]);
        let mut logger = VecSink::default();

        invoke_handler(
            &service,
            &mut pipeline,
            CommandKind::Exec,
            "1+1".to_string(),
            InvokeMode::Local,
            None,
            &mut logger,
        )
        .unwrap();

        assert_eq!(logger.lines, vec!["START RequestId: 42\nplain text"]);
    }

    #[test]
    fn invoke_non_pair_array_passes_through() {
        let service = parse(SERVICE_WITH_HANDLER);
        let mut pipeline = MockPipeline::emitting(&[r#"[1, 2, 3]"#]);
        let mut logger = VecSink::default();

        invoke_handler(
            &service,
            &mut pipeline,
            CommandKind::Exec,
            "x".to_string(),
            InvokeMode::Local,
            None,
            &mut logger,
        )
        .unwrap();

        assert_eq!(logger.lines, vec!["[1, 2, 3]"]);
    }

    #[test]
    fn invoke_structured_non_string_result_renders_as_json() {
        let service = parse(SERVICE_WITH_HANDLER);
        let mut pipeline = MockPipeline::emitting(&[r#"[0, {"rows": 3}]"#]);
        let mut logger = VecSink::default();

        invoke_handler(
            &service,
            &mut pipeline,
            CommandKind::Manage,
            "migrate".to_string(),
            InvokeMode::Remote,
            None,
            &mut logger,
        )
        .unwrap();

        assert_eq!(logger.lines, vec![r#"{"rows":3}"#]);
    }

    #[test]
    fn invoke_local_mode_reaches_pipeline() {
        let service = parse(SERVICE_WITH_HANDLER);
        let mut pipeline = MockPipeline::emitting(&[r#"[0, "ok"]"#]);
        let mut logger = VecSink::default();

        invoke_handler(
            &service,
            &mut pipeline,
            CommandKind::Manage,
            "check".to_string(),
            InvokeMode::Local,
            None,
            &mut logger,
        )
        .unwrap();

        assert_eq!(pipeline.calls[0].2, InvokeMode::Local);
    }
}
