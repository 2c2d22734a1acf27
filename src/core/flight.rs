//! Single-flight coordination for live fetches.

use crate::core::source::SourceKind;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// One in-flight fetch per ordered pair and source.
pub type FlightKey = (String, String, SourceKind);

// Shared futures require a cloneable error, hence String.
type SharedFetch = Shared<BoxFuture<'static, Result<f64, String>>>;

/// Guarantees at most one in-progress fetch per key. The first caller
/// starts the fetch; concurrent callers for the same key await the same
/// result instead of issuing a duplicate call. The slot is released on
/// completion, success or failure alike, so a later request starts a
/// fresh fetch (failures are not cached here).
///
/// The fetch runs on a spawned task, so a caller abandoning its own
/// await does not cancel the fetch for other waiters. The spawned task
/// also owns the slot release; it must not depend on any waiter still
/// polling.
#[derive(Clone, Default)]
pub struct SingleFlight {
    inflight: Arc<Mutex<HashMap<FlightKey, SharedFetch>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn fetch<F>(&self, key: FlightKey, fetch: F) -> Result<f64, String>
    where
        F: Future<Output = anyhow::Result<f64>> + Send + 'static,
    {
        let shared = {
            // Check-then-act stays under one lock so simultaneous
            // callers cannot both start a flight.
            let mut inflight = self.inflight.lock().await;
            if let Some(existing) = inflight.get(&key) {
                debug!(base = %key.0, target = %key.1, source = %key.2, "Joining in-flight fetch");
                existing.clone()
            } else {
                debug!(base = %key.0, target = %key.1, source = %key.2, "Starting fetch");
                let slots = Arc::clone(&self.inflight);
                let release_key = key.clone();
                let handle = tokio::spawn(async move {
                    let result = fetch.await.map_err(|e| e.to_string());
                    // Release here, on the detached task. Waiters may
                    // all have abandoned the shared future by now.
                    slots.lock().await.remove(&release_key);
                    result
                });
                let flight = async move {
                    match handle.await {
                        Ok(result) => result,
                        Err(e) => Err(e.to_string()),
                    }
                }
                .boxed()
                .shared();
                inflight.insert(key, flight.clone());
                flight
            }
        };

        shared.await
    }
}
