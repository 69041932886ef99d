use std::future::Future;

use anyhow::{Result, anyhow};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

type TaskResult = (&'static str, Result<()>);

/// Owns the server's background tasks.
///
/// Every task gets a child of one shutdown token. The first task to fail
/// (error or panic) or a ctrl-c trips the token; `run` then waits for the
/// rest to drain and reports the first failure.
pub struct Supervisor {
    shutdown: CancellationToken,
    tasks: JoinSet<TaskResult>,
    failure: Option<anyhow::Error>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            shutdown: CancellationToken::new(),
            tasks: JoinSet::new(),
            failure: None,
        }
    }

    pub fn spawn<F, Fut>(&mut self, name: &'static str, task: F)
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let token = self.shutdown.child_token();
        tracing::debug!(task = name, "starting task");
        self.tasks.spawn(async move { (name, task(token).await) });
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            tokio::select! {
                joined = self.tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((name, Ok(())))) => tracing::info!(task = name, "task stopped"),
                    Some(Ok((name, Err(err)))) => {
                        tracing::error!(task = name, error = %err, "task failed");
                        self.fail(err);
                    }
                    Some(Err(join_err)) => {
                        tracing::error!(error = ?join_err, "task panicked");
                        self.fail(anyhow!(join_err));
                    }
                },
                _ = tokio::signal::ctrl_c(), if !self.shutdown.is_cancelled() => {
                    tracing::info!("ctrl-c received, draining tasks");
                    self.shutdown.cancel();
                }
            }
        }

        match self.failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Keep the first failure and stop everything else.
    fn fail(&mut self, err: anyhow::Error) {
        self.failure.get_or_insert(err);
        if !self.shutdown.is_cancelled() {
            tracing::warn!(remaining = self.tasks.len(), "stopping remaining tasks");
            self.shutdown.cancel();
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failure_cancels_siblings() {
        let mut supervisor = Supervisor::new();
        supervisor.spawn("waits", |shutdown| async move {
            shutdown.cancelled().await;
            Ok(())
        });
        supervisor.spawn("fails", |_| async { Err(anyhow!("boom")) });

        let err = supervisor.run().await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_clean_exit() {
        let mut supervisor = Supervisor::new();
        supervisor.spawn("quick", |_| async { Ok(()) });
        assert!(supervisor.run().await.is_ok());
    }
}
