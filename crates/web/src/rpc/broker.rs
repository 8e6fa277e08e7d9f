use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use super::RpcError;
use super::message::Envelope;

type Queues = HashMap<String, mpsc::UnboundedSender<Envelope>>;

/// In-process message broker with named queues.
///
/// Each queue has exactly one [`Consumer`]. Cloning the broker shares its queues.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    queues: Arc<Mutex<Queues>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn queues(&self) -> MutexGuard<'_, Queues> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Declares a queue and returns its consumer.
    ///
    /// Queues whose consumer was dropped are removed, so their names can be declared again.
    pub fn declare_queue(&self, name: impl Into<String>) -> Result<Consumer, RpcError> {
        let name = name.into();
        let (sender, receiver) = mpsc::unbounded_channel();

        let mut queues = self.queues();
        queues.retain(|_, queue| !queue.is_closed());

        match queues.entry(name.clone()) {
            Entry::Occupied(_) => return Err(RpcError::QueueExists { name }),
            Entry::Vacant(entry) => {
                entry.insert(sender);
            }
        }
        drop(queues);

        debug!(queue = %name, "queue declared");
        Ok(Consumer { name, receiver })
    }

    /// Declares a queue with a generated name, for replies only its declarer reads.
    pub fn declare_exclusive(&self) -> (String, Consumer) {
        loop {
            let name = format!("amq.gen-{}", Uuid::new_v4());
            if let Ok(consumer) = self.declare_queue(name.clone()) {
                return (name, consumer);
            }
        }
    }

    pub fn publish(&self, routing_key: &str, envelope: Envelope) -> Result<(), RpcError> {
        let mut queues = self.queues();
        let sender = queues.get(routing_key).ok_or_else(|| RpcError::UnknownQueue { name: routing_key.to_string() })?;

        if sender.send(envelope).is_err() {
            queues.remove(routing_key);
            return Err(RpcError::QueueClosed { name: routing_key.to_string() });
        }
        Ok(())
    }
}

/// The receiving end of a queue.
#[derive(Debug)]
pub struct Consumer {
    name: String,
    receiver: mpsc::UnboundedReceiver<Envelope>,
}

impl Consumer {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the next message, `None` once the broker is gone.
    pub async fn next(&mut self) -> Option<Envelope> {
        self.receiver.recv().await
    }
}
