use std::collections::HashMap;
use std::fmt;

use aquarius_http::protocol::BoxError;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::broker::{Consumer, MemoryBroker};
use super::message::{Envelope, Job, JobReply};

/// Queue jobs are published to when no other is named
pub const DEFAULT_QUEUE: &str = "rpc_queue";

type Function = dyn Fn(&[Value], &Map<String, Value>) -> Result<Value, BoxError> + Send + Sync;

/// Executes jobs by name from a registry of functions.
#[derive(Default)]
pub struct Worker {
    functions: HashMap<String, Box<Function>>,
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = self.functions.keys().collect::<Vec<_>>();
        names.sort();
        f.debug_struct("Worker").field("functions", &names).finish()
    }
}

impl Worker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value], &Map<String, Value>) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Box::new(function));
        self
    }

    pub fn execute(&self, job: &Job) -> JobReply {
        let Some(function) = self.functions.get(&job.func) else {
            return JobReply::failure(job, format!("unknown function {}", job.func));
        };

        match function(&job.args, &job.kwargs) {
            Ok(result) => JobReply::success(job, result),
            Err(e) => JobReply::failure(job, e.to_string()),
        }
    }

    /// Serves jobs from `jobs` until the broker goes away.
    ///
    /// Each reply goes to the job's `reply_to` queue with the job's correlation id.
    /// Jobs without a reply destination are executed and their result dropped.
    pub async fn run(self, broker: MemoryBroker, mut jobs: Consumer) {
        info!(queue = jobs.name(), "awaiting rpc requests");

        while let Some(request) = jobs.next().await {
            let correlation_id = request.correlation_id;

            let reply = match request.decode::<Job>() {
                Ok(job) => {
                    debug!(%correlation_id, func = %job.func, "executing job");
                    self.execute(&job)
                }
                Err(e) => {
                    warn!(%correlation_id, cause = %e, "discarding undecodable job");
                    continue;
                }
            };

            let Some(reply_to) = request.reply_to else {
                debug!(%correlation_id, "job has no reply destination");
                continue;
            };

            let published = Envelope::new(correlation_id, None, &reply).and_then(|envelope| broker.publish(&reply_to, envelope));
            if let Err(e) = published {
                warn!(%correlation_id, reply_to = %reply_to, cause = %e, "can't publish reply");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::{RpcClient, RpcError};
    use serde_json::json;

    fn add(args: &[Value], _kwargs: &Map<String, Value>) -> Result<Value, BoxError> {
        let mut sum = 0;
        for arg in args {
            sum += arg.as_i64().ok_or_else(|| format!("{arg} is not an integer"))?;
        }
        Ok(json!(sum))
    }

    #[test]
    fn execute_by_name() {
        let worker = Worker::new().register("add", add);

        let reply = worker.execute(&Job::new("add", vec![json!(2), json!(3)], Map::new()));
        assert_eq!(reply.result, Some(json!(5)));
        assert_eq!(reply.func, "add");

        let reply = worker.execute(&Job::new("add", vec![json!("x")], Map::new()));
        assert_eq!(reply.error.as_deref(), Some("\"x\" is not an integer"));

        let reply = worker.execute(&Job::new("mul", vec![], Map::new()));
        assert_eq!(reply.error.as_deref(), Some("unknown function mul"));
    }

    #[tokio::test]
    async fn client_and_worker_over_the_broker() {
        let broker = MemoryBroker::new();
        let jobs = broker.declare_queue(DEFAULT_QUEUE).unwrap();
        let worker = Worker::new().register("add", add).register("greet", |_args, kwargs| {
            let name = kwargs.get("name").and_then(Value::as_str).unwrap_or("nobody");
            Ok(json!(format!("hello {name}")))
        });
        tokio::spawn(worker.run(broker.clone(), jobs));

        let client = RpcClient::new(broker, DEFAULT_QUEUE);
        assert_eq!(client.call("add", vec![json!(10), json!(32)], Map::new()).await.unwrap(), json!(42));

        let mut kwargs = Map::new();
        kwargs.insert("name".into(), json!("aquarius"));
        assert_eq!(client.call("greet", vec![], kwargs).await.unwrap(), json!("hello aquarius"));

        let error = client.call("sub", vec![], Map::new()).await.unwrap_err();
        assert!(matches!(error, RpcError::Remote { func, .. } if func == "sub"));
    }
}
