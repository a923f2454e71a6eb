use std::fmt::Write;

use serde_json::Value;

use crate::runner::RunLog;

const RULE_WIDTH: usize = 80;

/// Human-readable report: one block per record, in run order.
pub fn render(log: &RunLog) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    // writeln! into a String cannot fail
    let _ = writeln!(out, "API TEST REPORT - {}", log.timestamp);
    let _ = writeln!(out, "{}\n", heavy);

    for (idx, test) in log.tests.iter().enumerate() {
        let _ = writeln!(out, "TEST #{}: {} {}", idx + 1, test.method, test.endpoint);
        let _ = writeln!(out, "{}", light);
        let _ = writeln!(out, "Timestamp: {}", test.timestamp);
        let _ = writeln!(out, "Success: {}", if test.success { "Yes" } else { "No" });

        if let Some(status) = test.status_code {
            let _ = writeln!(out, "Status Code: {}", status);
        }
        if let Some(payload) = &test.payload {
            let _ = writeln!(out, "\nPayload:\n{}", pretty(payload));
        }
        if let Some(response) = &test.response {
            let _ = writeln!(out, "\nResponse:\n{}", pretty(response));
        }
        if let Some(notes) = &test.notes {
            let _ = writeln!(out, "\nNotes: {}", notes);
        }

        let _ = writeln!(out, "\n{}\n", heavy);
    }

    out
}

fn pretty(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ResultRecord;
    use serde_json::json;

    fn record(success: bool) -> ResultRecord {
        ResultRecord {
            endpoint: "/api/sites".to_string(),
            method: "POST".to_string(),
            timestamp: "2024-05-01T12:00:01+00:00".to_string(),
            success,
            payload: Some(json!({"name": "Site"})),
            response: Some(json!({"data": {"site": {"id": "s1"}}})),
            status_code: Some(201),
            notes: None,
        }
    }

    #[test]
    fn test_block_layout() {
        let log = RunLog {
            timestamp: "2024-05-01T12:00:00+00:00".to_string(),
            tests: vec![record(true)],
        };
        let text = render(&log);

        assert!(text.starts_with("API TEST REPORT - 2024-05-01T12:00:00+00:00\n"));
        assert!(text.contains("TEST #1: POST /api/sites\n"));
        assert!(text.contains("Success: Yes\n"));
        assert!(text.contains("Status Code: 201\n"));
        assert!(text.contains("\nPayload:\n{\n  \"name\": \"Site\"\n}\n"));
        assert!(text.contains("\nResponse:\n"));
        assert!(!text.contains("Notes:"));
    }

    #[test]
    fn test_optional_sections_are_omitted() {
        let mut bare = record(false);
        bare.payload = None;
        bare.response = Some(json!("connection refused"));
        bare.status_code = None;
        bare.notes = Some("No response from server".to_string());

        let log = RunLog {
            timestamp: "t".to_string(),
            tests: vec![record(true), bare],
        };
        let text = render(&log);

        assert!(text.contains("TEST #2: POST /api/sites"));
        assert!(text.contains("Success: No\n"));
        assert!(text.contains("\nResponse:\nconnection refused\n"));
        assert!(text.contains("\nNotes: No response from server\n"));
        assert_eq!(text.matches("Status Code:").count(), 1);
        assert_eq!(text.matches("Payload:").count(), 1);
    }
}
