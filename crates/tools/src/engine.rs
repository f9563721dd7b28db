//! Shared streaming execution machinery: spawn the adapter's command,
//! stream stdout line-by-line into `parse_partial`, race each read against
//! the adapter's timeout, and finish with one `parse_output` call over the
//! complete output.
//!
//! Grounded on the foreground/background exec primitive in this codebase's
//! process-execution layer (spawn via `tokio::process::Command`, a
//! `tokio::select!` race between the next unit of work and a timeout,
//! kill-and-cleanup on every exit path), generalized from a single
//! request/response exchange into a lazy, finite stream of `ToolResult`s.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures_core::Stream;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use crate::contract::{ScanOptions, ToolAdapter, ToolResult};

pub type ToolResultStream = Pin<Box<dyn Stream<Item = ToolResult> + Send>>;

/// Run one adapter against `target`, per the `execute()` contract in
/// `SPEC_FULL.md` §4.1.
pub fn execute(adapter: Arc<dyn ToolAdapter>, target: String, opts: ScanOptions) -> ToolResultStream {
    Box::pin(stream! {
        let name = adapter.config().name.clone();

        if !adapter.is_available() {
            yield ToolResult::failure(name.clone(), "binary not found");
            return;
        }

        let argv = adapter.build_command(&target, &opts);
        let Some((program, args)) = argv.split_first() else {
            yield ToolResult::failure(name.clone(), "empty command");
            return;
        };

        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.stdin(std::process::Stdio::null());

        let mut child = match cmd.spawn() {
            Ok(c) => c,
            Err(e) => {
                yield ToolResult::failure(name.clone(), format!("failed to spawn {program}: {e}"));
                return;
            }
        };

        let stdout = child.stdout.take().expect("stdout piped");
        let stderr = child.stderr.take();
        let mut lines = BufReader::new(stdout).lines();
        let timeout = Duration::from_secs(adapter.config().timeout_secs);

        let mut accumulated = String::new();
        let mut any_discoveries = false;
        let mut timed_out = false;

        loop {
            match tokio::time::timeout(timeout, lines.next_line()).await {
                Ok(Ok(Some(line))) => {
                    accumulated.push_str(&line);
                    accumulated.push('\n');
                    let partial = adapter.parse_partial(&accumulated);
                    if partial.success && partial.has_discoveries() {
                        any_discoveries = true;
                        yield partial;
                    }
                }
                Ok(Ok(None)) => break, // stdout closed normally
                Ok(Err(e)) => {
                    yield ToolResult::failure(name.clone(), format!("stdout read error: {e}"));
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                    return;
                }
                Err(_elapsed) => {
                    timed_out = true;
                    break;
                }
            }
        }

        if timed_out {
            let _ = child.kill().await;
            let _ = child.wait().await;
            yield ToolResult::failure(name.clone(), format!("timeout after {}s", adapter.config().timeout_secs));
            return;
        }

        let mut stderr_text = String::new();
        if let Some(mut err) = stderr {
            let _ = err.read_to_string(&mut stderr_text).await;
        }

        let status = match child.wait().await {
            Ok(s) => Some(s),
            Err(e) => {
                yield ToolResult::failure(name.clone(), format!("failed to await process exit: {e}"));
                return;
            }
        };

        let mut result = adapter.parse_output(&accumulated);
        let nonzero_exit = status.map(|s| !s.success()).unwrap_or(false);
        if nonzero_exit && !result.success {
            result.error = Some(stderr_text);
        }
        let _ = any_discoveries;
        yield result;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ToolCategory, ToolConfig};
    use futures_util::StreamExt;

    struct EchoAdapter {
        config: ToolConfig,
    }

    impl ToolAdapter for EchoAdapter {
        fn config(&self) -> &ToolConfig {
            &self.config
        }

        fn build_command(&self, target: &str, _opts: &ScanOptions) -> Vec<String> {
            vec!["echo".into(), target.into()]
        }

        fn parse_output(&self, output: &str) -> ToolResult {
            let mut result = ToolResult {
                tool_name: self.config.name.clone(),
                success: true,
                raw_output: output.to_string(),
                ..Default::default()
            };
            if output.trim() == "hello" {
                result.assets.push(recon_domain::Asset::new("echo", "hello", &self.config.name));
            }
            result
        }
    }

    #[tokio::test]
    async fn echo_adapter_yields_one_final_result() {
        let adapter: Arc<dyn ToolAdapter> = Arc::new(EchoAdapter {
            config: ToolConfig::new("echo", "echo", ToolCategory::Osint, "echoes its target"),
        });
        let mut stream = execute(adapter, "hello".into(), ScanOptions::default());
        let mut results = Vec::new();
        while let Some(r) = stream.next().await {
            results.push(r);
        }
        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert_eq!(results[0].assets.len(), 1);
    }

    #[tokio::test]
    async fn missing_binary_yields_single_unavailable_failure() {
        struct Missing(ToolConfig);
        impl ToolAdapter for Missing {
            fn config(&self) -> &ToolConfig {
                &self.0
            }
            fn build_command(&self, _t: &str, _o: &ScanOptions) -> Vec<String> {
                vec!["definitely-not-a-real-binary-xyz".into()]
            }
            fn parse_output(&self, _output: &str) -> ToolResult {
                ToolResult::empty_failure(self.0.name.clone())
            }
        }
        let adapter: Arc<dyn ToolAdapter> = Arc::new(Missing(ToolConfig::new(
            "missing",
            "definitely-not-a-real-binary-xyz",
            ToolCategory::Osint,
            "does not exist",
        )));
        let mut stream = execute(adapter, "x".into(), ScanOptions::default());
        let mut results = Vec::new();
        while let Some(r) = stream.next().await {
            results.push(r);
        }
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert_eq!(results[0].error.as_deref(), Some("binary not found"));
    }

    #[tokio::test]
    async fn slow_process_is_killed_on_timeout() {
        struct Sleeper(ToolConfig);
        impl ToolAdapter for Sleeper {
            fn config(&self) -> &ToolConfig {
                &self.0
            }
            fn build_command(&self, _t: &str, _o: &ScanOptions) -> Vec<String> {
                vec!["sh".into(), "-c".into(), "echo one; sleep 5".into()]
            }
            fn parse_output(&self, _output: &str) -> ToolResult {
                ToolResult::empty_failure(self.0.name.clone())
            }
        }
        let mut config = ToolConfig::new("sleeper", "sh", ToolCategory::Osint, "sleeps past its timeout");
        config.timeout_secs = 1;
        let adapter: Arc<dyn ToolAdapter> = Arc::new(Sleeper(config));
        let mut stream = execute(adapter, "x".into(), ScanOptions::default());
        let mut results = Vec::new();
        while let Some(r) = stream.next().await {
            results.push(r);
        }
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert!(results[0].error.as_deref().unwrap_or("").contains("timeout"));
    }
}
