use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tripdesk_agent::{AgentRuntime, TurnError, TurnOutcome, FAILED_TURN_REPLY};
use tripdesk_core::config::{AppConfig, ConfigOverrides, LlmProvider, LoadOptions};
use tripdesk_core::{ConversationState, DialogError};

use crate::commands::CommandResult;
use crate::logging::init_logging;
use crate::session::SessionCommand;

const GREETING: &str = "Tripdesk travel assistant. I can search for and book flights and hotels. \
                        Type 'quit' to leave.";
const FAREWELL: &str = "Goodbye! Have a great trip.";
const CANCELLED: &str = "(cancelled, nothing from that message was kept)";

#[derive(Clone, Debug, Default)]
pub struct ChatOptions {
    pub config_path: Option<PathBuf>,
    pub debug: bool,
    pub offline: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChatSummary {
    pub completed_turns: u64,
    pub cancelled_turns: u64,
    pub quit: bool,
}

pub fn run(options: ChatOptions) -> CommandResult {
    let overrides = ConfigOverrides {
        debug: options.debug.then_some(true),
        llm_provider: options.offline.then_some(LlmProvider::Offline),
        ..ConfigOverrides::default()
    };
    let load = LoadOptions { config_path: options.config_path, require_file: false, overrides };
    let config = match AppConfig::load(load) {
        Ok(config) => config,
        Err(error) => {
            let error = DialogError::from(error);
            return CommandResult::failure("chat", "config_validation", error.to_string(), 2);
        }
    };
    init_logging(&config.logging);

    let runtime = match AgentRuntime::from_config(&config) {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure("chat", "runtime_setup", error.to_string(), 2),
    };
    let executor = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(executor) => executor,
        Err(error) => return CommandResult::failure("chat", "runtime_setup", error.to_string(), 1),
    };

    info!(
        event_name = "chat.started",
        provider = config.llm.provider.as_str(),
        model = %config.llm.model,
        debug = config.session.debug,
        "chat session started"
    );
    let input = BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    let debug = config.session.debug;
    let shutdown = CancellationToken::new();
    let finished = executor.block_on(chat_loop(&runtime, debug, input, &mut output, &shutdown));
    // The stdin reader may still be parked on a blocking read after an interrupt.
    executor.shutdown_background();
    match finished {
        Ok(summary) => {
            info!(
                event_name = "chat.finished",
                completed_turns = summary.completed_turns,
                cancelled_turns = summary.cancelled_turns,
                "chat session finished"
            );
            CommandResult::text(String::new())
        }
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), 1),
    }
}

enum Prompt {
    Line(String),
    Closed,
    Interrupted,
}

/// Reads utterances line by line until a quit word, end of input, Ctrl-C at
/// the prompt or `shutdown`. Ctrl-C during a turn cancels only that turn.
pub async fn chat_loop<R, W>(
    runtime: &AgentRuntime,
    debug: bool,
    input: R,
    output: &mut W,
    shutdown: &CancellationToken,
) -> Result<ChatSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut state = ConversationState::new();
    let mut summary = ChatSummary::default();
    let mut lines = input.lines();
    say(output, GREETING).await?;

    loop {
        output.write_all(b"You: ").await.context("write prompt")?;
        output.flush().await.context("flush prompt")?;
        let line = match next_input(&mut lines, shutdown).await? {
            Prompt::Line(line) => line,
            Prompt::Closed => {
                output.write_all(b"\n").await.context("write newline")?;
                break;
            }
            Prompt::Interrupted => {
                summary.quit = true;
                output.write_all(b"\n").await.context("write newline")?;
                say(output, FAREWELL).await?;
                break;
            }
        };

        let utterance = match SessionCommand::parse(&line) {
            SessionCommand::Skip => continue,
            SessionCommand::Quit => {
                summary.quit = true;
                say(output, FAREWELL).await?;
                break;
            }
            SessionCommand::Utterance(utterance) => utterance,
        };

        match run_turn(runtime, &mut state, &utterance, shutdown).await {
            Ok(TurnOutcome::Completed(report)) => {
                summary.completed_turns += 1;
                say(output, &report.reply).await?;
                if debug {
                    let rendered =
                        serde_json::to_string_pretty(&report).context("render turn report")?;
                    output
                        .write_all(format!("[turn report]\n{rendered}\n").as_bytes())
                        .await
                        .context("write turn report")?;
                }
            }
            Ok(TurnOutcome::Cancelled) => {
                summary.cancelled_turns += 1;
                say(output, CANCELLED).await?;
            }
            Err(turn_error) => {
                error!(
                    event_name = "chat.turn_failed",
                    session_id = %state.session_id,
                    error = %turn_error,
                    "turn aborted"
                );
                say(output, FAILED_TURN_REPLY).await?;
            }
        }
    }

    Ok(summary)
}

async fn next_input<R>(lines: &mut Lines<R>, shutdown: &CancellationToken) -> Result<Prompt>
where
    R: AsyncBufRead + Unpin,
{
    let mut listening = true;
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(Prompt::Interrupted),
            signal = tokio::signal::ctrl_c(), if listening => match signal {
                Ok(()) => return Ok(Prompt::Interrupted),
                Err(signal_error) => {
                    warn!(
                        event_name = "chat.interrupt_unavailable",
                        error = %signal_error,
                        "could not listen for Ctrl-C"
                    );
                    listening = false;
                }
            },
            line = lines.next_line() => {
                return Ok(match line.context("read input")? {
                    Some(line) => Prompt::Line(line),
                    None => Prompt::Closed,
                });
            }
        }
    }
}

/// Runs one turn and cancels it on Ctrl-C or `shutdown`.
async fn run_turn(
    runtime: &AgentRuntime,
    state: &mut ConversationState,
    utterance: &str,
    shutdown: &CancellationToken,
) -> Result<TurnOutcome, TurnError> {
    let cancel = shutdown.child_token();
    let turn = runtime.handle_turn(state, utterance, &cancel);
    tokio::pin!(turn);
    let mut listening = true;

    loop {
        tokio::select! {
            outcome = &mut turn => return outcome,
            signal = tokio::signal::ctrl_c(), if listening => match signal {
                Ok(()) => cancel.cancel(),
                Err(signal_error) => {
                    warn!(
                        event_name = "chat.interrupt_unavailable",
                        error = %signal_error,
                        "could not listen for Ctrl-C"
                    );
                    listening = false;
                }
            },
        }
    }
}

async fn say<W>(output: &mut W, text: &str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    output.write_all(format!("Assistant: {text}\n").as_bytes()).await.context("write reply")?;
    output.flush().await.context("flush reply")
}
