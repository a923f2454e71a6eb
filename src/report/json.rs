use anyhow::Result;

use crate::runner::RunLog;

/// The whole run log, pretty-printed
pub fn render(log: &RunLog) -> Result<String> {
    Ok(serde_json::to_string_pretty(log)?)
}
