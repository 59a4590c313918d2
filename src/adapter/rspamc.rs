//! Trainer adapter that pipes samples into `rspamc learn_ham|learn_spam`.

use crate::domain::{Job, SampleClass};
use crate::port::{TrainOutcome, Trainer, TrainerError};
use bytes::Bytes;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default trainer executable.
pub const DEFAULT_TRAINER_COMMAND: &str = "rspamc";

#[derive(Debug, Clone)]
pub struct RspamcTrainer {
    program: String,
    base_args: Vec<String>,
    domains: Vec<String>,
    verbose: bool,
}

/// One planned trainer process: who it trains for and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    target: String,
    args: Vec<String>,
}

impl RspamcTrainer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            domains: Vec::new(),
            verbose: false,
        }
    }

    /// Arguments placed before the per-job ones (e.g. `--connect host:11334`).
    #[must_use]
    pub fn with_base_args(mut self, args: Vec<String>) -> Self {
        self.base_args = args;
        self
    }

    /// Train once per recipient domain (`-d user@domain`) instead of once per user.
    #[must_use]
    pub fn with_domains(mut self, domains: Vec<String>) -> Self {
        self.domains = domains;
        self
    }

    #[must_use]
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn invocations(&self, class: SampleClass, identity: &str) -> Vec<Invocation> {
        if self.domains.is_empty() {
            let mut args = self.base_args.clone();
            args.extend([
                "-u".to_string(),
                identity.to_string(),
                class.learn_command().to_string(),
            ]);
            return vec![Invocation {
                target: identity.to_string(),
                args,
            }];
        }

        self.domains
            .iter()
            .map(|domain| {
                let target = format!("{identity}@{domain}");
                let mut args = self.base_args.clone();
                args.push("-d".to_string());
                args.push(target.clone());
                if self.verbose {
                    args.push("-v".to_string());
                }
                args.push(class.learn_command().to_string());
                Invocation { target, args }
            })
            .collect()
    }

    async fn run(
        &self,
        invocation: Invocation,
        payload: Bytes,
    ) -> Result<TrainOutcome, TrainerError> {
        debug!(cmd = %self.program, args = %invocation.args.join(" "), "Running trainer");

        let mut child = Command::new(&self.program)
            .args(&invocation.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TrainerError::Launch {
                program: self.program.clone(),
                source,
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("trainer stdin was not captured"))?;

        // Feed stdin while collecting output so a chatty trainer cannot deadlock on full pipes.
        let feed = async move {
            let written = stdin.write_all(&payload).await;
            drop(stdin);
            written
        };
        let (written, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if let Err(e) = written {
            if e.kind() == io::ErrorKind::BrokenPipe {
                debug!(
                    recipient = %invocation.target,
                    "Trainer closed stdin before reading the whole sample"
                );
            } else {
                warn!(
                    recipient = %invocation.target,
                    error = %e,
                    "Failed to write sample to trainer"
                );
            }
        }

        Ok(TrainOutcome {
            target: invocation.target,
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

impl Trainer for RspamcTrainer {
    fn train(
        &self,
        job: Job,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<TrainOutcome>, TrainerError>> + Send + '_>> {
        Box::pin(async move {
            let (class, identity, payload) = job.into_parts();
            let mut outcomes = Vec::new();
            for invocation in self.invocations(class, &identity) {
                outcomes.push(self.run(invocation, payload.clone()).await?);
            }
            Ok(outcomes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(invocation: &Invocation) -> Vec<&str> {
        invocation.args.iter().map(String::as_str).collect()
    }

    #[test]
    fn single_invocation_per_user_without_domains() {
        let trainer = RspamcTrainer::new("rspamc");
        let plan = trainer.invocations(SampleClass::Spam, "alice");
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].target, "alice");
        assert_eq!(args(&plan[0]), vec!["-u", "alice", "learn_spam"]);
    }

    #[test]
    fn one_invocation_per_domain() {
        let trainer = RspamcTrainer::new("rspamc")
            .with_domains(vec!["example.org".into(), "example.net".into()]);
        let plan = trainer.invocations(SampleClass::Ham, "bob");
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].target, "bob@example.org");
        assert_eq!(args(&plan[0]), vec!["-d", "bob@example.org", "learn_ham"]);
        assert_eq!(args(&plan[1]), vec!["-d", "bob@example.net", "learn_ham"]);
    }

    #[test]
    fn verbose_domain_invocations_pass_v_flag() {
        let trainer = RspamcTrainer::new("rspamc")
            .with_domains(vec!["example.org".into()])
            .with_verbose(true);
        let plan = trainer.invocations(SampleClass::Spam, "carol");
        assert_eq!(args(&plan[0]), vec!["-d", "carol@example.org", "-v", "learn_spam"]);
    }

    #[test]
    fn base_args_come_first() {
        let trainer = RspamcTrainer::new("rspamc")
            .with_base_args(vec!["--connect".into(), "localhost:11334".into()]);
        let plan = trainer.invocations(SampleClass::Ham, "dave");
        assert_eq!(
            args(&plan[0]),
            vec!["--connect", "localhost:11334", "-u", "dave", "learn_ham"]
        );
    }
}
