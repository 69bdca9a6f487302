//! Reward submission fan-out.
//!
//! Once a submission is accepted, every registered backend receives it in its
//! own detached task. Backends fail independently: an error, stall, or panic in
//! one never delays another and never reaches the contributor. Each backend
//! gets exactly one attempt; a failed backend is logged, not retried.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Values gathered from a contributor, handed to every backend.
///
/// The fields are opaque strings here; what counts as a deliverable address or
/// a valid size is the backends' concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub name: String,
    pub address: String,
    pub email: String,
    pub size: String,
}

/// A single fulfillment capability: accept a submission, perform a side effect.
///
/// Implementations must be self-contained about their own durability and
/// reporting; the dispatcher only logs their outcome.
#[async_trait]
pub trait RewardBackend: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &str;

    async fn deliver(&self, submission: &Submission) -> anyhow::Result<()>;
}

/// Fans accepted submissions out to the registered backends.
pub struct RewardDispatcher {
    backends: Vec<Arc<dyn RewardBackend>>,
}

impl RewardDispatcher {
    pub fn new(backends: Vec<Arc<dyn RewardBackend>>) -> Self {
        Self { backends }
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    /// Hands `submission` to every backend and returns immediately.
    ///
    /// Each backend runs in its own spawned task, joined to nothing. Panics
    /// are caught inside the task so a misbehaving backend can never take the
    /// runtime or a sibling down with it.
    pub fn dispatch(&self, submission: Submission) {
        let submission = Arc::new(submission);
        for backend in &self.backends {
            let backend = Arc::clone(backend);
            let submission = Arc::clone(&submission);
            tokio::spawn(async move {
                match AssertUnwindSafe(backend.deliver(&submission))
                    .catch_unwind()
                    .await
                {
                    Ok(Ok(())) => debug!("reward backend {} delivered", backend.name()),
                    Ok(Err(e)) => warn!("reward backend {} failed: {:#}", backend.name(), e),
                    Err(_) => error!("reward backend {} panicked", backend.name()),
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn submission() -> Submission {
        Submission {
            name: "Ada Lovelace".to_string(),
            address: "12 Analytical Way".to_string(),
            email: "ada@example.com".to_string(),
            size: "M".to_string(),
        }
    }

    /// Reports every delivery on a channel.
    struct RecordingBackend {
        name: String,
        tx: mpsc::UnboundedSender<(String, Submission)>,
    }

    impl RecordingBackend {
        fn arc(name: &str, tx: mpsc::UnboundedSender<(String, Submission)>) -> Arc<dyn RewardBackend> {
            Arc::new(Self {
                name: name.to_string(),
                tx,
            })
        }
    }

    #[async_trait]
    impl RewardBackend for RecordingBackend {
        fn name(&self) -> &str {
            &self.name
        }

        async fn deliver(&self, submission: &Submission) -> anyhow::Result<()> {
            self.tx
                .send((self.name.clone(), submission.clone()))
                .unwrap();
            Ok(())
        }
    }

    struct FailingBackend;

    #[async_trait]
    impl RewardBackend for FailingBackend {
        fn name(&self) -> &str {
            "failing"
        }

        async fn deliver(&self, _submission: &Submission) -> anyhow::Result<()> {
            anyhow::bail!("fulfillment service said no")
        }
    }

    struct PanickingBackend;

    #[async_trait]
    impl RewardBackend for PanickingBackend {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn deliver(&self, _submission: &Submission) -> anyhow::Result<()> {
            panic!("backend bug")
        }
    }

    /// Never completes; stands in for a hung downstream service.
    struct StalledBackend;

    #[async_trait]
    impl RewardBackend for StalledBackend {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn deliver(&self, _submission: &Submission) -> anyhow::Result<()> {
            futures::future::pending::<()>().await;
            Ok(())
        }
    }

    async fn recv_delivery(
        rx: &mut mpsc::UnboundedReceiver<(String, Submission)>,
    ) -> (String, Submission) {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for backend delivery")
            .expect("delivery channel closed")
    }

    #[tokio::test]
    async fn test_dispatch_invokes_every_backend_exactly_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = RewardDispatcher::new(vec![
            RecordingBackend::arc("email", tx.clone()),
            RecordingBackend::arc("shipment", tx.clone()),
            RecordingBackend::arc("ledger", tx.clone()),
        ]);
        drop(tx);
        assert_eq!(dispatcher.backend_count(), 3);

        let expected = submission();
        dispatcher.dispatch(expected.clone());
        // The spawned tasks own their backend handles; once they finish, the
        // recording senders are gone and the channel closes.
        drop(dispatcher);

        let mut names = Vec::new();
        for _ in 0..3 {
            let (name, seen) = recv_delivery(&mut rx).await;
            assert_eq!(seen, expected);
            names.push(name);
        }
        names.sort();
        assert_eq!(names, ["email", "ledger", "shipment"]);

        // All senders are gone once the three tasks finish, so a fourth
        // delivery would have shown up here.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_survives_failing_and_panicking_backends() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = RewardDispatcher::new(vec![
            Arc::new(FailingBackend),
            RecordingBackend::arc("email", tx.clone()),
            Arc::new(PanickingBackend),
            RecordingBackend::arc("shipment", tx.clone()),
        ]);
        drop(tx);

        dispatcher.dispatch(submission());
        drop(dispatcher);

        let mut names = vec![
            recv_delivery(&mut rx).await.0,
            recv_delivery(&mut rx).await.0,
        ];
        names.sort();
        assert_eq!(names, ["email", "shipment"]);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_is_not_blocked_by_a_stalled_backend() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = RewardDispatcher::new(vec![
            Arc::new(StalledBackend),
            RecordingBackend::arc("email", tx.clone()),
            RecordingBackend::arc("shipment", tx.clone()),
        ]);
        drop(tx);

        // Returns immediately even though one backend will never finish.
        dispatcher.dispatch(submission());

        let mut names = vec![
            recv_delivery(&mut rx).await.0,
            recv_delivery(&mut rx).await.0,
        ];
        names.sort();
        assert_eq!(names, ["email", "shipment"]);
    }

    #[tokio::test]
    async fn test_dispatch_with_no_backends_is_a_no_op() {
        let dispatcher = RewardDispatcher::new(Vec::new());
        assert_eq!(dispatcher.backend_count(), 0);
        dispatcher.dispatch(submission());
    }
}
