// Cancellable, generation-tagged async fetch wrapper.
//
// One `RemoteResource` guards one logical resource (the member roster, the
// draw list, the lottery winner, ...). Issuing a new fetch aborts the prior
// in-flight task and bumps the generation counter; the event-loop side calls
// `is_current` before applying a result, so a superseded request's late
// response can never overwrite state from a newer one.
//
// u64 overflow is not a practical concern: at one fetch per millisecond it
// would take ~584 million years to wrap.

use std::future::Future;
use std::marker::PhantomData;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::client::ApiError;

pub struct RemoteResource<T> {
    generation: u64,
    task: Option<JoinHandle<()>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for RemoteResource<T> {
    fn default() -> Self {
        RemoteResource {
            generation: 0,
            task: None,
            _marker: PhantomData,
        }
    }
}

impl<T: Send + 'static> RemoteResource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fetch, superseding any in-flight one. The result is wrapped by
    /// `map` (which receives the generation tag) and sent through `tx`.
    /// Returns the generation assigned to this fetch.
    pub fn fetch<Fut, E, M>(&mut self, fut: Fut, tx: mpsc::Sender<E>, map: M) -> u64
    where
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        E: Send + 'static,
        M: FnOnce(u64, Result<T, ApiError>) -> E + Send + 'static,
    {
        self.abort_in_flight();
        self.generation += 1;
        let generation = self.generation;

        self.task = Some(tokio::spawn(async move {
            let result = fut.await;
            // Receiver dropped means the app is shutting down; nothing to do.
            let _ = tx.send(map(generation, result)).await;
        }));

        generation
    }

    /// Whether a result tagged with `generation` is still the newest request.
    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// Cancel without issuing a replacement (modal closed, view unmounted).
    /// Also bumps the generation so an already-queued result is discarded.
    pub fn cancel(&mut self) {
        self.abort_in_flight();
        self.generation += 1;
    }

    fn abort_in_flight(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl<T> Drop for RemoteResource<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    struct Tagged {
        generation: u64,
        result: Result<u32, ApiError>,
    }

    fn tag(generation: u64, result: Result<u32, ApiError>) -> Tagged {
        Tagged { generation, result }
    }

    #[tokio::test]
    async fn fetch_delivers_tagged_result() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut resource = RemoteResource::new();

        let generation = resource.fetch(async { Ok(42u32) }, tx, tag);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.generation, generation);
        assert_eq!(event.result, Ok(42));
        assert!(resource.is_current(generation));
    }

    #[tokio::test(start_paused = true)]
    async fn superseding_fetch_marks_old_generation_stale() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut resource = RemoteResource::new();

        // Slow first fetch, fast second fetch.
        let first = resource.fetch(
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(1u32)
            },
            tx.clone(),
            tag,
        );
        let second = resource.fetch(async { Ok(2u32) }, tx, tag);

        let event = rx.recv().await.unwrap();
        assert_eq!(event.generation, second);
        assert_eq!(event.result, Ok(2));

        // The first task was aborted; nothing else arrives even after its
        // sleep would have elapsed.
        tokio::time::advance(Duration::from_secs(120)).await;
        assert!(rx.try_recv().is_err());
        assert!(!resource.is_current(first));
        assert!(resource.is_current(second));
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_aborts_and_invalidates() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut resource = RemoteResource::new();

        let generation = resource.fetch(
            async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(7u32)
            },
            tx,
            tag,
        );
        resource.cancel();

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(rx.try_recv().is_err());
        assert!(!resource.is_current(generation));
    }

    #[tokio::test]
    async fn error_results_are_delivered_too() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut resource: RemoteResource<u32> = RemoteResource::new();

        resource.fetch(
            async { Err(ApiError::Timeout(Duration::from_secs(10))) },
            tx,
            tag,
        );

        let event = rx.recv().await.unwrap();
        assert_eq!(event.result, Err(ApiError::Timeout(Duration::from_secs(10))));
    }
}
