// src/system/pwsh.rs

use crate::models::{Invocation, Record, StagedCommand};
use crate::system::engine::{Engine, EngineError, HostFactory};
use serde::Deserialize;
use serde_json::Value;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command as StdCommand, Stdio};
use std::time::Duration;
use uuid::Uuid;

/// How long `close` waits for a host to honor `exit` before killing it.
const EXIT_GRACE_POLLS: u32 = 20;
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Spawns `pwsh` hosts for a pool.
#[derive(Debug, Clone)]
pub struct PwshFactory {
    /// The PowerShell executable.
    pub program: PathBuf,
    /// Arguments that put the host in read-a-script-line-from-stdin mode.
    pub args: Vec<String>,
    /// Record nesting depth kept by `ConvertTo-Json`.
    pub json_depth: u32,
}

impl HostFactory for PwshFactory {
    fn spawn(&self) -> Result<Box<dyn Engine>, EngineError> {
        Ok(Box::new(PwshHost::spawn(
            &self.program,
            &self.args,
            self.json_depth,
        )?))
    }
}

/// A persistent PowerShell process. Session state (imported modules, variables)
/// survives across invocations for as long as the process lives.
#[derive(Debug)]
pub struct PwshHost {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
    marker: String,
    json_depth: u32,
    closed: bool,
}

impl PwshHost {
    /// Starts a host process. Nothing is sent to it until the first invocation.
    pub fn spawn(program: &Path, args: &[String], json_depth: u32) -> Result<Self, EngineError> {
        let marker = format!("#psenv:{}#", Uuid::new_v4().simple());
        Self::spawn_marked(program, args, json_depth, marker)
    }

    fn spawn_marked(
        program: &Path,
        args: &[String],
        json_depth: u32,
        marker: String,
    ) -> Result<Self, EngineError> {
        let mut child = StdCommand::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Spawn {
                program: program.display().to_string(),
                source: e,
            })?;

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Protocol("host stdout was not captured".to_string()))?;

        log::debug!(
            "Spawned PowerShell host '{}' (PID: {}).",
            program.display(),
            child.id()
        );

        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            marker,
            json_depth,
            closed: false,
        })
    }

    fn send_line(&mut self, line: &str) -> Result<(), EngineError> {
        let stdin = self.stdin.as_mut().ok_or(EngineError::HostExited)?;
        stdin
            .write_all(line.as_bytes())
            .and_then(|()| stdin.write_all(b"\n"))
            .and_then(|()| stdin.flush())
            .map_err(|e| match e.kind() {
                // Nobody is reading the other end any more.
                ErrorKind::BrokenPipe => EngineError::HostExited,
                _ => EngineError::Io(e),
            })
    }

    /// Reads stdout until the marked envelope line shows up.
    fn read_envelope(&mut self) -> Result<String, EngineError> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                return Err(EngineError::HostExited);
            }
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if let Some(payload) = trimmed.strip_prefix(self.marker.as_str()) {
                return Ok(payload.to_string());
            }
            log::trace!("pwsh[{}]: {}", self.child.id(), trimmed);
        }
    }
}

impl Engine for PwshHost {
    fn invoke(&mut self, pipeline: &[StagedCommand]) -> Result<Invocation, EngineError> {
        let script = build_script(pipeline, &self.marker, self.json_depth)?;
        log::trace!("pwsh[{}] <- {}", self.child.id(), script);
        self.send_line(&script)?;
        let payload = self.read_envelope()?;
        parse_envelope(&payload)
    }

    fn close(&mut self) -> Result<(), EngineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // A failed write just means the host is already gone.
        let _ = self.send_line("exit");
        self.stdin.take();

        for _ in 0..EXIT_GRACE_POLLS {
            if self.child.try_wait()?.is_some() {
                log::debug!("PowerShell host (PID: {}) exited.", self.child.id());
                return Ok(());
            }
            std::thread::sleep(EXIT_POLL_INTERVAL);
        }

        log::debug!(
            "PowerShell host (PID: {}) ignored exit, killing it.",
            self.child.id()
        );
        self.child.kill()?;
        self.child.wait()?;
        Ok(())
    }
}

impl Drop for PwshHost {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(e) = self.child.kill() {
                log::warn!("Failed to kill PowerShell host {}: {}", self.child.id(), e);
            }
            self.child.wait().ok();
        }
    }
}

// --- Script rendering ---

/// Wraps a rendered pipeline into the one-line script sent to the host.
///
/// The script clears `$Error`, runs the pipeline inside `try/catch` and writes a single
/// line: the marker followed by a compressed JSON envelope with the fields
/// `records`, `hadErrors`, `errors` and `terminating`.
///
/// Serialization has its own `try/catch`. Output that `ConvertTo-Json` cannot handle
/// (a dictionary with non-string keys, say) still produces a marked envelope, with
/// `terminating` describing the failure, so the reader never waits on a line that
/// will not come.
pub fn build_script(
    pipeline: &[StagedCommand],
    marker: &str,
    json_depth: u32,
) -> Result<String, EngineError> {
    let body = render_pipeline(pipeline)?;
    // The envelope adds two levels (object -> records array) above each record.
    let depth = json_depth + 2;
    Ok(format!(
        "$Error.Clear(); \
         $__psenv = [ordered]@{{ records = @(); hadErrors = $false; errors = @(); terminating = $null }}; \
         try {{ $__psenv.records = @({body}) }} catch {{ $__psenv.terminating = $_.ToString() }}; \
         $__psenv.hadErrors = ($Error.Count -gt 0); \
         $__psenv.errors = @($Error | ForEach-Object {{ $_.ToString() }}); \
         try {{ $__psenvJson = ConvertTo-Json -InputObject $__psenv -Depth {depth} -Compress -ErrorAction Stop }} \
         catch {{ $__psenvJson = ConvertTo-Json -Compress -InputObject ([ordered]@{{ records = @(); hadErrors = $true; errors = @(); terminating = ('Could not serialize the results: ' + $_.ToString()) }}) }}; \
         [Console]::Out.WriteLine({marker} + $__psenvJson)",
        marker = quote_literal(marker),
    ))
}

/// Renders staged commands as `& 'A' -P:v | & 'B' ...`.
pub fn render_pipeline(pipeline: &[StagedCommand]) -> Result<String, EngineError> {
    if pipeline.is_empty() {
        return Err(EngineError::EmptyPipeline);
    }
    let rendered = pipeline
        .iter()
        .map(render_command)
        .collect::<Result<Vec<String>, EngineError>>()?;
    Ok(rendered.join(" | "))
}

fn render_command(command: &StagedCommand) -> Result<String, EngineError> {
    let mut out = format!("& {}", quote_literal(&command.name));
    for (name, value) in &command.parameters {
        if !is_valid_parameter_name(name) {
            return Err(EngineError::InvalidParameterName(name.clone()));
        }
        // `-Name:value` binds switches and regular parameters alike.
        out.push_str(&format!(" -{}:{}", name, render_value(value)));
    }
    for value in &command.arguments {
        out.push(' ');
        out.push_str(&render_value(value));
    }
    Ok(out)
}

fn is_valid_parameter_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Renders a JSON value as a PowerShell literal expression.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "$null".to_string(),
        Value::Bool(true) => "$true".to_string(),
        Value::Bool(false) => "$false".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote_literal(s),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(render_value).collect();
            format!("@({})", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{} = {}", quote_literal(k), render_value(v)))
                .collect();
            format!("@{{{}}}", inner.join("; "))
        }
    }
}

/// Quotes a string for PowerShell. Single-quoted unless it holds line breaks,
/// which would split the one-line script.
pub fn quote_literal(s: &str) -> String {
    if s.contains(['\n', '\r']) {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('"');
        for c in s.chars() {
            match c {
                '\n' => out.push_str("`n"),
                '\r' => out.push_str("`r"),
                '\t' => out.push_str("`t"),
                '`' | '$' => {
                    out.push('`');
                    out.push(c);
                }
                c if is_double_quote(c) => {
                    out.push('`');
                    out.push(c);
                }
                c => out.push(c),
            }
        }
        out.push('"');
        out
    } else {
        let mut out = String::with_capacity(s.len() + 2);
        out.push('\'');
        for c in s.chars() {
            // PowerShell treats the typographic single quotes as quote characters too.
            if is_single_quote(c) {
                out.push(c);
            }
            out.push(c);
        }
        out.push('\'');
        out
    }
}

fn is_single_quote(c: char) -> bool {
    matches!(c, '\'' | '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}')
}

fn is_double_quote(c: char) -> bool {
    matches!(c, '"' | '\u{201C}' | '\u{201D}' | '\u{201E}')
}

// --- Envelope parsing ---

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default)]
    records: Value,
    #[serde(default)]
    had_errors: bool,
    #[serde(default)]
    errors: Value,
    #[serde(default)]
    terminating: Option<String>,
}

/// Turns the JSON payload of an envelope line into an `Invocation`.
/// A terminating error becomes `EngineError::Invocation`.
pub fn parse_envelope(payload: &str) -> Result<Invocation, EngineError> {
    let envelope: Envelope =
        serde_json::from_str(payload).map_err(|e| EngineError::Protocol(e.to_string()))?;

    if let Some(message) = envelope.terminating {
        return Err(EngineError::Invocation(message));
    }

    let records = flatten(envelope.records)
        .into_iter()
        .map(Record::from)
        .collect();
    let errors = flatten(envelope.errors)
        .into_iter()
        .map(|v| match v {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect();

    Ok(Invocation {
        records,
        had_errors: envelope.had_errors,
        errors,
    })
}

/// Windows PowerShell unrolls single-element arrays; accept both shapes.
fn flatten(value: Value) -> Vec<Value> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items,
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quote_literal_doubles_single_quotes() {
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal("a\u{2019}b"), "'a\u{2019}\u{2019}b'");
    }

    #[test]
    fn test_quote_literal_escapes_line_breaks() {
        assert_eq!(quote_literal("a\nb$c"), "\"a`nb`$c\"");
    }

    #[test]
    fn test_render_value_nested() {
        let value = json!({"Tags": ["a", "b"], "Force": true, "Count": 3, "Note": null});
        let rendered = render_value(&value);
        assert!(rendered.starts_with("@{"));
        assert!(rendered.contains("'Tags' = @('a', 'b')"));
        assert!(rendered.contains("'Force' = $true"));
        assert!(rendered.contains("'Count' = 3"));
        assert!(rendered.contains("'Note' = $null"));
    }

    #[test]
    fn test_render_pipeline_parameters_and_arguments() {
        let mut install = StagedCommand::new("Install-Module");
        install
            .parameter("Name", "Pester")
            .parameter("AllowClobber", true)
            .parameter("Scope", "CurrentUser");
        let mut import = StagedCommand::new("Import-Module");
        import.argument("Pester");

        assert_eq!(
            render_pipeline(&[install]).unwrap(),
            "& 'Install-Module' -Name:'Pester' -AllowClobber:$true -Scope:'CurrentUser'"
        );
        assert_eq!(
            render_pipeline(&[import]).unwrap(),
            "& 'Import-Module' 'Pester'"
        );
    }

    #[test]
    fn test_render_pipeline_joins_with_pipes() {
        let first = StagedCommand::new("Get-Process");
        let mut second = StagedCommand::new("Select-Object");
        second.parameter("First", 1);
        assert_eq!(
            render_pipeline(&[first, second]).unwrap(),
            "& 'Get-Process' | & 'Select-Object' -First:1"
        );
    }

    #[test]
    fn test_render_pipeline_rejects_empty_and_bad_names() {
        assert!(matches!(
            render_pipeline(&[]),
            Err(EngineError::EmptyPipeline)
        ));
        let mut bad = StagedCommand::new("Get-Process");
        bad.parameter("Name; Remove-Item", "x");
        assert!(matches!(
            render_pipeline(&[bad]),
            Err(EngineError::InvalidParameterName(_))
        ));
    }

    #[test]
    fn test_build_script_is_single_line_and_marked() {
        let mut cmd = StagedCommand::new("Write-Output");
        cmd.argument("line1\nline2");
        let script = build_script(&[cmd], "#m#", 2).unwrap();
        assert!(!script.contains('\n'));
        assert!(script.ends_with("[Console]::Out.WriteLine('#m#' + $__psenvJson)"));
        assert!(script.contains("-Depth 4"));
        assert!(script.contains("@(& 'Write-Output' \"line1`nline2\")"));
    }

    #[test]
    fn test_build_script_serializes_inside_its_own_try() {
        let script = build_script(&[StagedCommand::new("Get-Date")], "#m#", 2).unwrap();

        let pipeline_catch = script.find("catch { $__psenv.terminating").unwrap();
        let serializer = script
            .find("try { $__psenvJson = ConvertTo-Json -InputObject $__psenv")
            .unwrap();
        let fallback = script.rfind("catch { $__psenvJson = ConvertTo-Json").unwrap();
        let write = script.find("[Console]::Out.WriteLine").unwrap();

        assert!(pipeline_catch < serializer);
        assert!(serializer < fallback);
        assert!(fallback < write);
        assert!(script.contains("-Compress -ErrorAction Stop }"));
        // The fallback envelope reports the failure as terminating.
        assert!(script[fallback..write].contains("terminating = ('Could not serialize"));
    }

    #[test]
    fn test_parse_envelope_records_and_errors() {
        let invocation = parse_envelope(
            r#"{"records":[{"ProcessName":"explorer"},"plain"],"hadErrors":true,"errors":["boom"],"terminating":null}"#,
        )
        .unwrap();
        assert_eq!(invocation.records.len(), 2);
        assert_eq!(
            invocation.records[0].property("ProcessName"),
            Some(&json!("explorer"))
        );
        assert_eq!(invocation.records[1].property("value"), Some(&json!("plain")));
        assert!(invocation.had_errors);
        assert_eq!(invocation.errors, vec!["boom".to_string()]);
    }

    #[test]
    fn test_parse_envelope_unrolled_single_record() {
        let invocation =
            parse_envelope(r#"{"records":{"Name":"Pester"},"hadErrors":false,"errors":null}"#)
                .unwrap();
        assert_eq!(invocation.records.len(), 1);
        assert!(!invocation.had_errors);
        assert!(invocation.errors.is_empty());
    }

    #[test]
    fn test_parse_envelope_terminating_error() {
        let err = parse_envelope(
            r#"{"records":[],"hadErrors":true,"errors":["x"],"terminating":"Access denied"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Invocation(ref m) if m == "Access denied"));
    }

    #[test]
    fn test_parse_envelope_malformed() {
        assert!(matches!(
            parse_envelope("not json"),
            Err(EngineError::Protocol(_))
        ));
    }

    #[test]
    fn test_parse_envelope_serialization_fallback() {
        let err = parse_envelope(
            r#"{"records":[],"hadErrors":true,"errors":[],"terminating":"Could not serialize the results: Keys must be strings"}"#,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Invocation(ref m) if m.starts_with("Could not serialize")));
    }

    // Scripted `/bin/sh` hosts standing in for pwsh. Each one reads the script line
    // and answers (or not) the way the scenario needs.
    #[cfg(unix)]
    mod host {
        use super::*;
        use std::time::Instant;

        const MARKER: &str = "#m#";

        fn sh_host(script: &str) -> PwshHost {
            let args = vec!["-c".to_string(), script.to_string()];
            PwshHost::spawn_marked(Path::new("/bin/sh"), &args, 2, MARKER.to_string()).unwrap()
        }

        #[test]
        fn test_noise_lines_are_skipped_until_the_envelope() {
            let mut host = sh_host(
                r#"read l; echo 'WARNING: profile noise'; echo ''; echo '#m#{"records":[{"Name":"Get-Date"}],"hadErrors":false,"errors":[],"terminating":null}'; read l"#,
            );

            let invocation = host.invoke(&[StagedCommand::new("Get-Command")]).unwrap();
            assert_eq!(invocation.records.len(), 1);
            assert_eq!(
                invocation.records[0].property("Name"),
                Some(&json!("Get-Date"))
            );
            assert!(!invocation.had_errors);

            host.close().unwrap();
        }

        #[test]
        fn test_state_survives_between_invocations() {
            let mut host = sh_host(
                r##"n=0; while read l; do [ "$l" = exit ] && exit 0; n=$((n+1)); echo '#m#{"records":['$n']}'; done"##,
            );
            let date = [StagedCommand::new("Get-Date")];

            let first = host.invoke(&date).unwrap();
            let second = host.invoke(&date).unwrap();
            assert_eq!(first.records[0].property("value"), Some(&json!(1)));
            assert_eq!(second.records[0].property("value"), Some(&json!(2)));

            let started = Instant::now();
            host.close().unwrap();
            assert!(started.elapsed() < EXIT_POLL_INTERVAL * EXIT_GRACE_POLLS);
        }

        #[test]
        fn test_exited_host_reports_host_exited() {
            let mut host = sh_host("exit 0");
            let date = [StagedCommand::new("Get-Date")];

            assert!(matches!(host.invoke(&date), Err(EngineError::HostExited)));
            // Still no hang once the pipe is known to be closed.
            assert!(matches!(host.invoke(&date), Err(EngineError::HostExited)));
            host.close().unwrap();
        }

        #[test]
        fn test_host_dying_without_envelope_reports_host_exited() {
            let mut host = sh_host("read l; echo 'ConvertTo-Json: boom' >&2; echo partial; exit 1");
            let err = host.invoke(&[StagedCommand::new("Get-Date")]).unwrap_err();
            assert!(matches!(err, EngineError::HostExited));
            assert!(err.is_fatal());
        }

        #[test]
        fn test_unmarked_garbage_after_marker_is_a_protocol_error() {
            let mut host = sh_host("read l; echo '#m#not json'; read l");
            let err = host.invoke(&[StagedCommand::new("Get-Date")]).unwrap_err();
            assert!(matches!(err, EngineError::Protocol(_)));
            host.close().unwrap();
        }

        #[test]
        fn test_close_kills_host_that_ignores_exit() {
            let mut host = sh_host("exec sleep 30");

            let started = Instant::now();
            host.close().unwrap();
            let elapsed = started.elapsed();

            assert!(elapsed >= EXIT_POLL_INTERVAL * EXIT_GRACE_POLLS);
            assert!(elapsed < Duration::from_secs(10));
            assert!(host.child.try_wait().unwrap().is_some());
            // A second close is a no-op.
            host.close().unwrap();
        }
    }
}
