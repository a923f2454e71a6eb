use super::recorder::RunLog;

/// Session values carried from one step to the next.
///
/// Steps receive the current state and hand back the state the next step
/// should see; updates go through the `with_*` builders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub base_url: String,
    pub auth_token: Option<String>,
    pub user_id: Option<String>,
    pub site_id: Option<String>,
}

impl SessionState {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_auth_token(self, token: String) -> Self {
        Self {
            auth_token: Some(token),
            ..self
        }
    }

    pub fn with_user_id(self, id: String) -> Self {
        Self {
            user_id: Some(id),
            ..self
        }
    }

    pub fn with_site_id(self, id: String) -> Self {
        Self {
            site_id: Some(id),
            ..self
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Headers for an authenticated call; the bearer token is attached once known.
    pub fn headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        if let Some(token) = &self.auth_token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }
        headers
    }
}

/// Account registered by the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// A fresh account per run, keyed on the run's start time.
    pub fn for_run(started_at_unix: i64) -> Self {
        Self {
            name: "Test User".to_string(),
            email: format!("test_{}@example.com", started_at_unix),
            password: "Test123456!".to_string(),
        }
    }
}

/// Pass/fail tally for a finished run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// `METHOD endpoint` for every failed record, in run order
    pub failed_endpoints: Vec<String>,
    pub aborted: bool,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn from_log(log: &RunLog, skipped: usize, aborted: bool, duration_ms: u64) -> Self {
        let failed_endpoints: Vec<String> = log
            .failed()
            .map(|t| format!("{} {}", t.method, t.endpoint))
            .collect();

        Self {
            total: log.tests.len(),
            passed: log.passed(),
            failed: failed_endpoints.len(),
            skipped,
            failed_endpoints,
            aborted,
            duration_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_return_new_state() {
        let empty = SessionState::new("http://api.local/");
        let authed = empty.clone().with_auth_token("tok".into());

        assert_eq!(empty.auth_token, None);
        assert_eq!(authed.auth_token.as_deref(), Some("tok"));
        assert_eq!(authed.base_url, "http://api.local");
        assert_eq!(authed.url("/api/sites"), "http://api.local/api/sites");
    }

    #[test]
    fn test_headers_include_bearer_only_with_token() {
        let state = SessionState::new("http://api.local");
        assert_eq!(state.headers().len(), 1);

        let state = state.with_auth_token("abc".into());
        assert!(state
            .headers()
            .contains(&("Authorization".to_string(), "Bearer abc".to_string())));
    }

    #[test]
    fn test_summary_lists_failed_endpoints() {
        use super::super::recorder::ResultRecorder;

        let mut rec = ResultRecorder::new(chrono::Local::now());
        rec.record("/api/auth/me", "GET", None, None, true, None);
        rec.record("/api/stats", "GET", None, None, false, None);
        let summary = RunSummary::from_log(rec.log(), 4, false, 10);

        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 4);
        assert_eq!(summary.failed_endpoints, ["GET /api/stats"]);
    }

    #[test]
    fn test_credentials_embed_run_timestamp() {
        let creds = Credentials::for_run(1700000000);
        assert_eq!(creds.email, "test_1700000000@example.com");
    }
}
