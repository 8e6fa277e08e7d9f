//! Remote procedure calls over a message queue.
//!
//! A [`RpcClient`] publishes a [`Job`] to a named queue, tagged with a fresh
//! correlation id and the name of its private reply queue. A [`Worker`] consuming
//! that queue runs the named function and publishes a [`JobReply`] carrying the
//! same correlation id back to the reply queue. The client matches replies to
//! pending calls by that id alone and drops anything else.
//!
//! The transport is [`MemoryBroker`], an in-process broker with named queues and
//! JSON message bodies.
//!
//! ```
//! use aquarius::rpc::{DEFAULT_QUEUE, MemoryBroker, RpcClient, Worker};
//! use serde_json::{Map, json};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let broker = MemoryBroker::new();
//!
//! let worker = Worker::new().register("add", |args, _kwargs| {
//!     Ok(json!(args.iter().filter_map(|v| v.as_i64()).sum::<i64>()))
//! });
//! let jobs = broker.declare_queue(DEFAULT_QUEUE).unwrap();
//! tokio::spawn(worker.run(broker.clone(), jobs));
//!
//! let client = RpcClient::new(broker, DEFAULT_QUEUE);
//! let result = client.call("add", vec![json!(4), json!(9)], Map::new()).await.unwrap();
//! assert_eq!(result, json!(13));
//! # }
//! ```

mod broker;
mod client;
mod message;
mod worker;

pub use broker::Consumer;
pub use broker::MemoryBroker;
pub use client::RpcClient;
pub use message::Envelope;
pub use message::Job;
pub use message::JobReply;
pub use worker::DEFAULT_QUEUE;
pub use worker::Worker;

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RpcError {
    #[error("no queue named {name}")]
    UnknownQueue { name: String },

    #[error("queue {name} already declared")]
    QueueExists { name: String },

    #[error("queue {name} has no consumer anymore")]
    QueueClosed { name: String },

    #[error("can't serialize message: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },

    #[error("no reply within {0:?}")]
    Timeout(Duration),

    #[error("reply queue disconnected")]
    Disconnected,

    #[error("remote call {func} failed: {reason}")]
    Remote { func: String, reason: String },
}
