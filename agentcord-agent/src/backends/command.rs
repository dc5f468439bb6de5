// ABOUTME: Command backend - spawns a configured program per input, feeding the input on stdin.
// ABOUTME: Collected stdout becomes the chat reply; stderr lines surface as warning notices.

use crate::event::{AgentOutput, SystemLevel};
use crate::traits::AgentBackend;
use anyhow::{anyhow, Context, Result};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command as ProcessCommand};

/// Configuration for the command backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Program to run for every input
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory for the program
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables
    #[serde(default)]
    pub env: HashMap<String, String>,
}

pub struct CommandBackend {
    config: CommandConfig,
}

impl CommandBackend {
    pub fn new(config: CommandConfig) -> Result<Self> {
        if config.command.trim().is_empty() {
            anyhow::bail!("command backend requires a non-empty `command`");
        }
        Ok(Self { config })
    }

    /// Factory function for the registry
    pub fn factory() -> crate::registry::BackendFactory {
        Box::new(|settings| {
            let cfg: CommandConfig = serde_json::from_value(settings.clone())
                .context("Invalid command backend settings")?;
            Ok(Box::new(CommandBackend::new(cfg)?))
        })
    }

    fn spawn(&self) -> Result<Child> {
        let mut command = ProcessCommand::new(&self.config.command);
        command
            .args(&self.config.args)
            .envs(&self.config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            command.current_dir(dir);
        }

        tracing::debug!(command = %self.config.command, args = ?self.config.args, "Spawning agent command");
        command
            .spawn()
            .with_context(|| format!("Failed to spawn agent command '{}'", self.config.command))
    }
}

impl AgentBackend for CommandBackend {
    fn name(&self) -> &'static str {
        "command"
    }

    fn run<'a>(
        &'a self,
        input: &'a str,
    ) -> BoxFuture<'a, Result<BoxStream<'a, Result<AgentOutput>>>> {
        Box::pin(async move {
            let mut child = self.spawn()?;

            let mut stdin = child.stdin.take().context("Failed to capture stdin")?;
            let stdout = child.stdout.take().context("Failed to capture stdout")?;
            let stderr = child.stderr.take().context("Failed to capture stderr")?;

            let input = input.to_string();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    tracing::warn!(error = %e, "Failed to write input to agent command");
                }
                // stdin closes on drop so the program sees EOF
            });

            let lines = stream::select(
                line_stream(BufReader::new(stdout), Line::Stdout),
                line_stream(BufReader::new(stderr), Line::Stderr),
            )
            .boxed();

            let turn = Turn {
                lines,
                child,
                transcript: Vec::new(),
                pending: VecDeque::new(),
                finished: false,
            };

            Ok(stream::unfold(turn, next_output).boxed())
        })
    }
}

enum Line {
    Stdout(String),
    Stderr(String),
}

fn line_stream<R>(reader: R, wrap: fn(String) -> Line) -> BoxStream<'static, Line>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    stream::unfold(reader.lines(), move |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((wrap(line), lines)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read agent command output");
                None
            }
        }
    })
    .boxed()
}

struct Turn {
    lines: BoxStream<'static, Line>,
    child: Child,
    transcript: Vec<String>,
    pending: VecDeque<Result<AgentOutput>>,
    finished: bool,
}

async fn next_output(mut turn: Turn) -> Option<(Result<AgentOutput>, Turn)> {
    loop {
        if let Some(item) = turn.pending.pop_front() {
            return Some((item, turn));
        }
        if turn.finished {
            return None;
        }

        match turn.lines.next().await {
            Some(Line::Stderr(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                tracing::warn!(stderr = %line, "Agent command stderr");
                return Some((Ok(AgentOutput::system(SystemLevel::Warning, line)), turn));
            }
            Some(Line::Stdout(line)) => turn.transcript.push(line),
            None => {
                turn.finished = true;

                let reply = turn.transcript.join("\n");
                let reply = reply.trim_end();
                if !reply.trim().is_empty() {
                    turn.pending.push_back(Ok(AgentOutput::chat(reply)));
                }

                match turn.child.wait().await {
                    Ok(status) if status.success() => {}
                    Ok(status) => turn.pending.push_back(Err(anyhow!(
                        "Agent command exited with status: {:?}",
                        status.code()
                    ))),
                    Err(e) => turn
                        .pending
                        .push_back(Err(anyhow!(e).context("Failed to wait for agent command"))),
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn backend(command: &str, args: &[&str]) -> CommandBackend {
        CommandBackend::new(CommandConfig {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            working_dir: None,
            env: HashMap::new(),
        })
        .unwrap()
    }

    async fn collect(backend: &CommandBackend, input: &str) -> Vec<Result<AgentOutput>> {
        let stream = backend.run(input).await.unwrap();
        stream.collect().await
    }

    #[tokio::test]
    async fn test_stdout_becomes_single_chat_output() {
        let backend = backend("cat", &[]);
        let outputs = collect(&backend, "line one\nline two\n").await;

        assert_eq!(outputs.len(), 1);
        assert_eq!(
            outputs[0].as_ref().unwrap(),
            &AgentOutput::chat("line one\nline two")
        );
    }

    #[tokio::test]
    async fn test_stderr_becomes_warning_and_exit_code_becomes_error() {
        let backend = backend("sh", &["-c", "echo oops >&2; exit 3"]);
        let outputs = collect(&backend, "").await;

        assert_eq!(outputs.len(), 2);
        assert_eq!(
            outputs[0].as_ref().unwrap(),
            &AgentOutput::system(SystemLevel::Warning, "oops")
        );
        let err = outputs[1].as_ref().unwrap_err();
        assert!(err.to_string().contains("Some(3)"));
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_start() {
        let backend = backend("/nonexistent/agentcord-test-binary", &[]);
        assert!(backend.run("hi").await.is_err());
    }

    #[test]
    fn test_empty_command_rejected() {
        let result = CommandBackend::new(CommandConfig {
            command: "  ".to_string(),
            args: vec![],
            working_dir: None,
            env: HashMap::new(),
        });
        assert!(result.is_err());
    }
}
