//! Sequential command executor
//!
//! Runs commands one at a time against a shared context:
//! rewrite -> synthesize -> run -> merge bindings -> read the provider's
//! signal. The first runtime failure, warning or error stops the sequence.

use crate::config::ExecutorConfig;
use crate::error::ExecError;
use crate::message::ExecMessage;
use crate::provider::Provider;
use crate::signal::{Signal, SignalStatus};
use cmdlang::{Context, Prelude, Rewriter, Unit};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExecState {
    Running,
    HaltedError,
    HaltedWarning,
    Completed,
}

impl ExecState {
    pub fn is_halted(&self) -> bool {
        matches!(self, ExecState::HaltedError | ExecState::HaltedWarning)
    }
}

/// Terminal state together with the aggregated message.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecOutcome {
    pub state: ExecState,
    pub message: ExecMessage,
}

#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Executor { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Executes `commands` in order and reports the terminal state.
    ///
    /// The context is mutated in place: tools are installed by the provider
    /// and every command's bindings are merged, including the ones a failing
    /// command made before it failed.
    pub async fn run<S, P>(
        &self,
        commands: &[S],
        context: &mut Context,
        provider: &mut P,
    ) -> Result<ExecOutcome, ExecError>
    where
        S: AsRef<str>,
        P: Provider + ?Sized,
    {
        provider.set_context(context);
        if self.config.install_prelude {
            let installed = Prelude::install(context);
            debug!(?installed, "installed prelude");
        }

        let rewriter = Rewriter::with_max_passes(self.config.max_rewrite_passes);
        let mut attempted = Vec::with_capacity(commands.len());
        let mut last_signal: Option<Signal> = None;
        let mut state = ExecState::Running;

        for (index, command) in commands.iter().enumerate() {
            let command = command.as_ref();
            attempted.push(command.to_string());
            debug!(index, command, "executing command");

            let rewritten =
                rewriter
                    .rewrite(command, context)
                    .map_err(|source| ExecError::Rewrite {
                        index,
                        command: command.to_string(),
                        source,
                    })?;
            if self.config.log_rewrites {
                debug!(
                    index,
                    rewritten = %rewritten.source,
                    passes = rewritten.passes,
                    "rewrote command"
                );
            }
            let unit = Unit::synthesize(rewritten).map_err(|source| ExecError::Compile {
                index,
                command: command.to_string(),
                source,
            })?;

            let evaluation = unit.run(context).await;
            let bound = context.merge(evaluation.bindings);
            provider.sync_context(context);
            debug!(index, ?bound, "merged bindings");

            if let Err(err) = evaluation.result {
                warn!(index, error = %err, "command failed, halting");
                last_signal = Some(Signal::error(err.to_string()));
                state = ExecState::HaltedError;
                break;
            }

            let signal = provider.get_signal();
            provider.clear_signal();
            let Some(signal) = signal else {
                continue;
            };
            let status = signal.status;
            last_signal = Some(signal);
            match status {
                SignalStatus::Ok => {}
                SignalStatus::Warning => {
                    info!(index, "provider reported a warning, halting");
                    state = ExecState::HaltedWarning;
                    break;
                }
                SignalStatus::Error => {
                    info!(index, "provider reported an error, halting");
                    state = ExecState::HaltedError;
                    break;
                }
            }
        }

        if state == ExecState::Running {
            state = ExecState::Completed;
        }
        let message = ExecMessage::aggregate(last_signal, attempted);
        info!(
            state = ?state,
            status = %message.status,
            commands = message.commands.len(),
            "execution finished"
        );
        Ok(ExecOutcome { state, message })
    }

    /// Like [`Executor::run`] but returns only the message.
    pub async fn execute<S, P>(
        &self,
        commands: &[S],
        context: &mut Context,
        provider: &mut P,
    ) -> Result<ExecMessage, ExecError>
    where
        S: AsRef<str>,
        P: Provider + ?Sized,
    {
        self.run(commands, context, provider)
            .await
            .map(|outcome| outcome.message)
    }
}

/// Executes `commands` with the default configuration.
pub async fn execute<S, P>(
    commands: &[S],
    context: &mut Context,
    provider: &mut P,
) -> Result<ExecMessage, ExecError>
where
    S: AsRef<str>,
    P: Provider + ?Sized,
{
    Executor::default().execute(commands, context, provider).await
}
