use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bounds the number of remote calls in flight.
///
/// A permit is held only for the duration of one leaf call, never across a
/// recursive step, so a deep tree cannot starve itself of permits.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallLimiter {
    permits: Option<Arc<Semaphore>>,
}

impl CallLimiter {
    pub(crate) fn unbounded() -> Self {
        Self::default()
    }

    pub(crate) fn new(max_in_flight: usize) -> Self {
        Self {
            permits: Some(Arc::new(Semaphore::new(max_in_flight.max(1)))),
        }
    }

    pub(crate) async fn run<F: Future>(&self, call: F) -> F::Output {
        // The semaphore is never closed; a failed acquire just runs unbounded
        let _permit = match &self.permits {
            Some(permits) => permits.acquire().await.ok(),
            None => None,
        };
        call.await
    }
}
