use std::fmt;
use std::io::Write;

use super::state::RunSummary;
use tokio::sync::broadcast;

/// Run progress events for console output
#[derive(Debug, Clone)]
pub enum TestEvent {
    RunStarted {
        base_url: String,
        step_count: usize,
    },
    GroupStarted {
        title: String,
    },
    StepStarted {
        index: usize,
        description: String,
        method: String,
        endpoint: String,
    },
    StepPassed {
        index: usize,
        message: String,
        status: u16,
        duration_ms: u64,
    },
    StepFailed {
        index: usize,
        message: String,
        duration_ms: u64,
    },
    StepSkipped {
        index: usize,
        description: String,
        reason: String,
    },
    RunAborted {
        error: String,
    },
    RunFinished {
        summary: RunSummary,
    },
}

/// Event emitter for broadcasting run events
pub struct EventEmitter {
    sender: broadcast::Sender<TestEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<TestEvent>) {
        let (sender, receiver) = broadcast::channel(256);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: TestEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// A console line. Write errors (a closed pipe) are ignored so the listener
/// keeps draining events.
fn say(line: fmt::Arguments<'_>) {
    let _ = writeln!(std::io::stdout(), "{}", line);
}

/// Prints run events as they arrive. Returns once every emitter is dropped.
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<TestEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        let interactive = std::io::stdout().is_terminal();
        let mut spinner: Option<ProgressBar> = None;

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::warn!("console listener dropped {} event(s)", missed);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                TestEvent::RunStarted {
                    base_url,
                    step_count,
                } => {
                    say(format_args!(
                        "\n{} Running {} API tests against {}",
                        "▶".green().bold(),
                        step_count,
                        base_url.cyan()
                    ));
                }

                TestEvent::GroupStarted { title } => {
                    say(format_args!(
                        "\n  {} {}",
                        "→".blue(),
                        title.white().bold()
                    ));
                }

                TestEvent::StepStarted {
                    index,
                    description,
                    method,
                    endpoint,
                } => {
                    let pb = ProgressBar::new_spinner();
                    if !interactive {
                        // piped output: no escape codes
                        pb.set_draw_target(ProgressDrawTarget::hidden());
                    }
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }
                    pb.set_message(format!(
                        "{}. {} {}",
                        index,
                        description,
                        format!("({} {})", method, endpoint).dimmed()
                    ));
                    pb.enable_steady_tick(Duration::from_millis(100));
                    if !interactive {
                        say(format_args!(
                            "    {}. {} ({} {})",
                            index, description, method, endpoint
                        ));
                    }
                    spinner = Some(pb);
                }

                TestEvent::StepPassed {
                    index,
                    message,
                    status,
                    duration_ms,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    say(format_args!(
                        "    {} {}. {} {}",
                        "✅".green(),
                        index,
                        message,
                        format!("[{}] ({}ms)", status, duration_ms).dimmed()
                    ));
                }

                TestEvent::StepFailed {
                    index,
                    message,
                    duration_ms,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    say(format_args!(
                        "    {} {}. {} {}",
                        "❌".red(),
                        index,
                        message.red(),
                        format!("({}ms)", duration_ms).dimmed()
                    ));
                }

                TestEvent::StepSkipped {
                    index,
                    description,
                    reason,
                } => {
                    say(format_args!(
                        "    {} {}. {} {}",
                        "⚠️".yellow(),
                        index,
                        description,
                        format!("(skipped: {})", reason).yellow()
                    ));
                }

                TestEvent::RunAborted { error } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    say(format_args!(
                        "\n{} Error during test run: {}",
                        "❌".red().bold(),
                        error.red()
                    ));
                }

                TestEvent::RunFinished { summary } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }

                    let banner = if summary.aborted {
                        "Test run aborted".red().bold()
                    } else {
                        "Test run finished".blue().bold()
                    };
                    say(format_args!("\n{} {}", "■".blue().bold(), banner));
                    say(format_args!("  Recorded: {}", summary.total));
                    say(format_args!(
                        "  {} passed, {} failed, {} skipped",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.skipped.to_string().yellow()
                    ));
                    say(format_args!("  Duration: {}ms", summary.duration_ms));

                    if !summary.failed_endpoints.is_empty() {
                        say(format_args!("  Failing endpoints:"));
                        for endpoint in &summary.failed_endpoints {
                            say(format_args!("    {} {}", "✗".red(), endpoint));
                        }
                    }
                }
            }
        }
    }
}
