//! In-memory oracle fakes (testing and offline replay)
//!
//! Provides `StaticOracle`, `SequenceOracle`, `SlowOracle`, and
//! `FailingOracle` that satisfy the [`OracleClient`] contract without any
//! network dependency.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::oracle::OracleClient;

/// Oracle that returns the same response for every consultation.
#[derive(Debug)]
pub struct StaticOracle {
    reply: Value,
    calls: Mutex<u64>,
}

impl StaticOracle {
    pub fn new(reply: Value) -> Self {
        Self {
            reply,
            calls: Mutex::new(0),
        }
    }

    /// A plain-text reply.
    pub fn text(reply: &str) -> Self {
        Self::new(Value::String(reply.to_string()))
    }

    /// How many consultations this oracle has served.
    pub fn call_count(&self) -> u64 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl OracleClient for StaticOracle {
    async fn advise(&self, _system: &str, _user: &str) -> anyhow::Result<Value> {
        *self.calls.lock().unwrap() += 1;
        Ok(self.reply.clone())
    }
}

/// Oracle that pops replies from a queue, then repeats the last one.
#[derive(Debug)]
pub struct SequenceOracle {
    replies: Mutex<VecDeque<Value>>,
    last: Mutex<Value>,
}

impl SequenceOracle {
    pub fn new(replies: Vec<Value>) -> Self {
        let last = replies
            .last()
            .cloned()
            .unwrap_or(Value::String("IGNORE".to_string()));
        Self {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(last),
        }
    }

    /// Build from plain-text replies.
    pub fn texts(replies: &[&str]) -> Self {
        Self::new(
            replies
                .iter()
                .map(|r| Value::String((*r).to_string()))
                .collect(),
        )
    }
}

#[async_trait]
impl OracleClient for SequenceOracle {
    async fn advise(&self, _system: &str, _user: &str) -> anyhow::Result<Value> {
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => {
                *self.last.lock().unwrap() = reply.clone();
                Ok(reply)
            }
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }
}

/// Oracle that sleeps before answering, for in-flight cancellation tests.
#[derive(Debug)]
pub struct SlowOracle {
    delay: std::time::Duration,
    reply: Value,
}

impl SlowOracle {
    /// A plain-text reply delivered after `delay_ms` milliseconds.
    pub fn text(delay_ms: u64, reply: &str) -> Self {
        Self {
            delay: std::time::Duration::from_millis(delay_ms),
            reply: Value::String(reply.to_string()),
        }
    }
}

#[async_trait]
impl OracleClient for SlowOracle {
    async fn advise(&self, _system: &str, _user: &str) -> anyhow::Result<Value> {
        tokio::time::sleep(self.delay).await;
        Ok(self.reply.clone())
    }
}

/// Oracle whose every consultation fails with the given message.
#[derive(Debug)]
pub struct FailingOracle {
    message: String,
}

impl FailingOracle {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl OracleClient for FailingOracle {
    async fn advise(&self, _system: &str, _user: &str) -> anyhow::Result<Value> {
        anyhow::bail!("{}", self.message)
    }
}
