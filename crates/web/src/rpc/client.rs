use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use super::RpcError;
use super::broker::{Consumer, MemoryBroker};
use super::message::{Envelope, Job, JobReply};

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

type Pending = Arc<Mutex<HashMap<Uuid, oneshot::Sender<JobReply>>>>;

fn lock(pending: &Pending) -> MutexGuard<'_, HashMap<Uuid, oneshot::Sender<JobReply>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Calls functions served by a [`Worker`](super::Worker) on a queue.
///
/// The client owns an exclusive reply queue, a background task routes each reply
/// to the call waiting on its correlation id.
#[derive(Debug)]
pub struct RpcClient {
    broker: MemoryBroker,
    queue: String,
    reply_to: String,
    pending: Pending,
    timeout: Duration,
    listener: JoinHandle<()>,
}

impl RpcClient {
    /// Creates a client publishing to `queue`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(broker: MemoryBroker, queue: impl Into<String>) -> Self {
        let (reply_to, replies) = broker.declare_exclusive();
        let pending = Pending::default();
        let listener = tokio::spawn(listen(replies, Arc::clone(&pending)));

        Self { broker, queue: queue.into(), reply_to, pending, timeout: DEFAULT_CALL_TIMEOUT, listener }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Name of the queue replies are received on
    pub fn reply_to(&self) -> &str {
        &self.reply_to
    }

    pub async fn call(&self, func: &str, args: Vec<Value>, kwargs: Map<String, Value>) -> Result<Value, RpcError> {
        let correlation_id = Uuid::new_v4();
        let envelope = Envelope::new(correlation_id, Some(self.reply_to.clone()), &Job::new(func, args, kwargs))?;

        let (sender, receiver) = oneshot::channel();
        lock(&self.pending).insert(correlation_id, sender);

        if let Err(e) = self.broker.publish(&self.queue, envelope) {
            lock(&self.pending).remove(&correlation_id);
            return Err(e);
        }
        debug!(%correlation_id, func, queue = %self.queue, "job published");

        match tokio::time::timeout(self.timeout, receiver).await {
            Ok(Ok(reply)) => reply.into_result(),
            Ok(Err(_closed)) => Err(RpcError::Disconnected),
            Err(_elapsed) => {
                lock(&self.pending).remove(&correlation_id);
                Err(RpcError::Timeout(self.timeout))
            }
        }
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

async fn listen(mut replies: Consumer, pending: Pending) {
    while let Some(envelope) = replies.next().await {
        let correlation_id = envelope.correlation_id;

        let Some(sender) = lock(&pending).remove(&correlation_id) else {
            debug!(%correlation_id, queue = replies.name(), "discarding reply for an unknown call");
            continue;
        };

        match envelope.decode::<JobReply>() {
            Ok(reply) => {
                // the caller may have given up already
                let _ = sender.send(reply);
            }
            Err(e) => warn!(%correlation_id, cause = %e, "can't decode reply"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn no_worker_times_out() {
        let broker = MemoryBroker::new();
        let _jobs = broker.declare_queue("jobs").unwrap();

        let client = RpcClient::new(broker, "jobs").with_timeout(Duration::from_millis(20));
        let result = client.call("add", vec![json!(1)], Map::new()).await;

        assert!(matches!(result, Err(RpcError::Timeout(_))));
        assert!(lock(&client.pending).is_empty());
    }

    #[tokio::test]
    async fn unknown_queue_fails_fast() {
        let client = RpcClient::new(MemoryBroker::new(), "missing");
        let result = client.call("add", vec![], Map::new()).await;

        assert!(matches!(result, Err(RpcError::UnknownQueue { .. })));
        assert!(lock(&client.pending).is_empty());
    }

    #[tokio::test]
    async fn replies_are_matched_by_correlation_id() {
        let broker = MemoryBroker::new();
        let mut jobs = broker.declare_queue("jobs").unwrap();
        let client = RpcClient::new(broker.clone(), "jobs");

        let responder = tokio::spawn(async move {
            let request = jobs.next().await.unwrap();
            let job = request.decode::<Job>().unwrap();
            let reply_to = request.reply_to.unwrap();

            // a stray reply first, it must not resolve the call
            let stray = Envelope::new(Uuid::new_v4(), None, &JobReply::success(&job, json!("stray"))).unwrap();
            broker.publish(&reply_to, stray).unwrap();

            let reply = Envelope::new(request.correlation_id, None, &JobReply::success(&job, json!(42))).unwrap();
            broker.publish(&reply_to, reply).unwrap();
        });

        assert_eq!(client.call("answer", vec![], Map::new()).await.unwrap(), json!(42));
        responder.await.unwrap();
    }
}
