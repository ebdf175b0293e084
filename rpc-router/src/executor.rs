use crate::call::{Batch, CallSpec, DispatchMode, Outcome};
use crate::metrics_defs::{UPSTREAM_CALL_DURATION, UPSTREAM_CALLS};
use crate::upstream::{Credential, UpstreamClient};
use shared::{counter, histogram};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::Instant;

const INTERNAL_ERROR_REASON: &str = "Internal error";

/// Executes batches against the upstreams and aggregates their outcomes.
///
/// Every call in a batch is attempted and settles independently: a failing
/// call produces an error outcome in its own slot and never affects its
/// siblings. Calls are not retried.
#[derive(Clone)]
pub struct Executor {
    client: UpstreamClient,
    /// Bounds upstream calls in flight across all requests
    permits: Arc<Semaphore>,
}

impl Executor {
    pub fn new(client: UpstreamClient, max_concurrent_calls: usize) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_concurrent_calls)),
        }
    }

    /// Runs every call in the batch and returns one outcome per call, in
    /// batch order.
    pub async fn execute(&self, batch: Batch, credential: Option<Credential>) -> Vec<Outcome> {
        match batch.mode {
            DispatchMode::SingleShot => self.execute_single(batch.calls, credential).await,
            DispatchMode::FanOut => self.execute_parallel(batch.calls, credential).await,
        }
    }

    /// Single-shot batches skip the task machinery and await their call inline.
    async fn execute_single(
        &self,
        calls: Vec<CallSpec>,
        credential: Option<Credential>,
    ) -> Vec<Outcome> {
        let mut outcomes = Vec::with_capacity(calls.len());
        for call in calls {
            outcomes.push(self.run_call(&call, credential.as_ref()).await);
        }
        outcomes
    }

    /// Spawns one task per call and joins them in input order.
    ///
    /// Tasks are detached rather than collected in a `JoinSet`, so calls that
    /// were already issued run to completion even if the request is dropped.
    async fn execute_parallel(
        &self,
        calls: Vec<CallSpec>,
        credential: Option<Credential>,
    ) -> Vec<Outcome> {
        let handles: Vec<JoinHandle<Outcome>> = calls
            .into_iter()
            .map(|call| {
                let executor = self.clone();
                let credential = credential.clone();
                tokio::spawn(async move { executor.run_call(&call, credential.as_ref()).await })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (index, handle) in handles.into_iter().enumerate() {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(index, error = %e, "Upstream call task panicked");
                    Outcome::error(INTERNAL_ERROR_REASON)
                }
            };
            outcomes.push(outcome);
        }

        outcomes
    }

    async fn run_call(&self, call: &CallSpec, credential: Option<&Credential>) -> Outcome {
        // The semaphore is never closed, so acquiring only fails if that changes
        let Ok(_permit) = self.permits.acquire().await else {
            return Outcome::error(INTERNAL_ERROR_REASON);
        };

        let start = Instant::now();
        let result = self.client.send(call, credential).await;
        let elapsed = start.elapsed();

        let upstream = call.upstream.as_str();
        histogram!(UPSTREAM_CALL_DURATION, "upstream" => upstream).record(elapsed.as_secs_f64());

        match result {
            Ok(data) => {
                counter!(UPSTREAM_CALLS, "upstream" => upstream, "result" => "success")
                    .increment(1);
                Outcome::success(data)
            }
            Err(e) => {
                counter!(UPSTREAM_CALLS, "upstream" => upstream, "result" => e.kind())
                    .increment(1);
                tracing::warn!(
                    upstream,
                    method = %call.upstream_method,
                    error = %e,
                    "Upstream call failed"
                );
                Outcome::error(e.reason())
            }
        }
    }
}
