use chrono::{DateTime, Local, SecondsFormat};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::http::ApiResponse;

/// One attempted operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub endpoint: String,
    pub method: String,
    pub timestamp: String,
    pub success: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub payload: Option<Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub response: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A field that is present maps to `Some`, even when it holds `null`.
fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Everything recorded during one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunLog {
    /// Run start
    pub timestamp: String,
    pub tests: Vec<ResultRecord>,
}

impl RunLog {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            timestamp: format_timestamp(started_at),
            tests: Vec::new(),
        }
    }

    pub fn passed(&self) -> usize {
        self.tests.iter().filter(|t| t.success).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &ResultRecord> {
        self.tests.iter().filter(|t| !t.success)
    }
}

/// What came back from an attempted call
#[derive(Debug, Clone)]
pub enum Outcome<'a> {
    Response(&'a ApiResponse),
    Error(String),
}

/// Appends records to the run log
pub struct ResultRecorder {
    log: RunLog,
}

impl ResultRecorder {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            log: RunLog::new(started_at),
        }
    }

    pub fn record(
        &mut self,
        endpoint: &str,
        method: &str,
        payload: Option<Value>,
        outcome: Option<Outcome<'_>>,
        success: bool,
        notes: Option<String>,
    ) -> &ResultRecord {
        let (response, status_code) = match outcome {
            Some(Outcome::Response(res)) => {
                let body = res
                    .json()
                    .unwrap_or_else(|| json!({ "text": res.body, "status_code": res.status }));
                (Some(body), Some(res.status))
            }
            Some(Outcome::Error(message)) => (Some(Value::String(message)), None),
            None => (None, None),
        };

        self.log.tests.push(ResultRecord {
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            timestamp: format_timestamp(Local::now()),
            success,
            payload,
            response,
            status_code,
            notes,
        });

        // just pushed
        &self.log.tests[self.log.tests.len() - 1]
    }

    pub fn into_log(self) -> RunLog {
        self.log
    }
}

#[cfg(test)]
impl ResultRecorder {
    pub(crate) fn log(&self) -> &RunLog {
        &self.log
    }
}

pub fn format_timestamp(at: DateTime<Local>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, false)
}
