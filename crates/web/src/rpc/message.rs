use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::RpcError;

/// A function call request: `{"func": ..., "args": [...], "kwargs": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub func: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl Job {
    pub fn new(func: impl Into<String>, args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Self { func: func.into(), args, kwargs }
    }
}

/// The job echoed back with either its `result` or an `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReply {
    pub func: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobReply {
    pub fn success(job: &Job, result: Value) -> Self {
        Self { func: job.func.clone(), args: job.args.clone(), kwargs: job.kwargs.clone(), result: Some(result), error: None }
    }

    pub fn failure(job: &Job, error: impl Into<String>) -> Self {
        Self {
            func: job.func.clone(),
            args: job.args.clone(),
            kwargs: job.kwargs.clone(),
            result: None,
            error: Some(error.into()),
        }
    }

    /// The result, or the remote error. A reply with neither yields `null`.
    pub fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(reason) => Err(RpcError::Remote { func: self.func, reason }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A message on a queue: the JSON body plus its routing properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub correlation_id: Uuid,
    pub reply_to: Option<String>,
    pub body: Bytes,
}

impl Envelope {
    pub fn new<T: Serialize>(correlation_id: Uuid, reply_to: Option<String>, body: &T) -> Result<Self, RpcError> {
        let body = serde_json::to_vec(body)?;
        Ok(Self { correlation_id, reply_to, body: Bytes::from(body) })
    }

    pub fn decode<'a, T: Deserialize<'a>>(&'a self) -> Result<T, RpcError> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}
