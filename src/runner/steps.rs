use serde_json::{json, Value};

use super::state::{Credentials, SessionState};
use crate::http::ApiRequest;

const SITE_ID: &str = "{site_id}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Group {
    Authentication,
    Sites,
    StatsAndLogs,
    SiteMonitoring,
    Monitor,
}

impl Group {
    pub fn title(&self) -> &'static str {
        match self {
            Group::Authentication => "Authentication",
            Group::Sites => "Sites",
            Group::StatsAndLogs => "Logs & stats",
            Group::SiteMonitoring => "Site monitoring",
            Group::Monitor => "Monitor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    None,
    SiteCreated,
}

impl Precondition {
    pub fn is_met(&self, session: &SessionState) -> bool {
        match self {
            Precondition::None => true,
            Precondition::SiteCreated => session.site_id.is_some(),
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Precondition::None => "",
            Precondition::SiteCreated => "no site has been created",
        }
    }
}

/// Session field filled from a successful response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    AuthToken,
    UserId,
    SiteId,
}

impl Capture {
    fn apply(&self, session: SessionState, value: String) -> SessionState {
        match self {
            Capture::AuthToken => session.with_auth_token(value),
            Capture::UserId => session.with_user_id(value),
            Capture::SiteId => session.with_site_id(value),
        }
    }
}

/// Pause applied after a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pace {
    Normal,
    Extended,
}

/// Data the request bodies are built from
#[derive(Debug, Clone)]
pub struct Fixture {
    pub credentials: Credentials,
    pub site_url: String,
}

type PayloadFn = fn(&Fixture) -> Value;

/// One call against one endpoint
#[derive(Clone)]
pub struct Step {
    pub name: &'static str,
    pub description: &'static str,
    pub group: Group,
    pub method: &'static str,
    /// Path below the base URL; `{site_id}` is filled from the session
    pub path: &'static str,
    /// Send the bearer token when one is known
    pub authenticated: bool,
    pub payload: Option<PayloadFn>,
    /// JSON pointers read from a 2xx body into the session
    pub captures: &'static [(Capture, &'static str)],
    /// JSON pointer to an array whose length is shown on success
    pub count_pointer: Option<&'static str>,
    pub pace: Pace,
}

impl Step {
    fn new(
        name: &'static str,
        description: &'static str,
        group: Group,
        method: &'static str,
        path: &'static str,
    ) -> Self {
        Self {
            name,
            description,
            group,
            method,
            path,
            authenticated: true,
            payload: None,
            captures: &[],
            count_pointer: None,
            pace: Pace::Normal,
        }
    }

    fn anonymous(mut self) -> Self {
        self.authenticated = false;
        self
    }

    fn payload(mut self, build: PayloadFn) -> Self {
        self.payload = Some(build);
        self
    }

    fn captures(mut self, captures: &'static [(Capture, &'static str)]) -> Self {
        self.captures = captures;
        self
    }

    fn counts(mut self, pointer: &'static str) -> Self {
        self.count_pointer = Some(pointer);
        self
    }

    fn slow(mut self) -> Self {
        self.pace = Pace::Extended;
        self
    }

    pub fn precondition(&self) -> Precondition {
        if self.path.contains(SITE_ID) {
            Precondition::SiteCreated
        } else {
            Precondition::None
        }
    }

    /// Concrete endpoint path, or `None` while the precondition is unmet.
    pub fn endpoint(&self, session: &SessionState) -> Option<String> {
        if !self.precondition().is_met(session) {
            return None;
        }
        Some(match session.site_id.as_deref() {
            Some(id) => self.path.replace(SITE_ID, id),
            None => self.path.to_string(),
        })
    }

    pub fn build_payload(&self, fixture: &Fixture) -> Option<Value> {
        self.payload.map(|build| build(fixture))
    }

    pub fn build_request(
        &self,
        endpoint: &str,
        session: &SessionState,
        payload: Option<Value>,
    ) -> ApiRequest {
        let headers = if self.authenticated {
            session.headers()
        } else {
            vec![("Content-Type".to_string(), "application/json".to_string())]
        };

        let mut request = ApiRequest::new(self.method, session.url(endpoint));
        for (name, value) in headers {
            request = request.header(name, value);
        }
        match payload {
            Some(body) => request.json(body),
            None => request,
        }
    }

    /// Fold the configured captures from a successful body into the session.
    pub fn capture(&self, session: SessionState, body: &Value) -> SessionState {
        self.captures
            .iter()
            .fold(session, |session, (field, pointer)| match body.pointer(pointer) {
                Some(Value::Null) | None => {
                    log::warn!("{}: `{}` missing from response", self.name, pointer);
                    session
                }
                Some(val) => {
                    let text = val
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| val.to_string());
                    field.apply(session, text)
                }
            })
    }

    /// Identifier this step stored in the session, if it captures one.
    pub fn captured_id<'a>(&self, session: &'a SessionState) -> Option<&'a str> {
        self.captures.iter().find_map(|(field, _)| match field {
            Capture::UserId => session.user_id.as_deref(),
            Capture::SiteId => session.site_id.as_deref(),
            Capture::AuthToken => None,
        })
    }

    pub fn count(&self, body: &Value) -> Option<usize> {
        self.count_pointer
            .and_then(|pointer| body.pointer(pointer))
            .and_then(Value::as_array)
            .map(Vec::len)
    }
}

fn registration(fixture: &Fixture) -> Value {
    json!({
        "name": fixture.credentials.name,
        "email": fixture.credentials.email,
        "password": fixture.credentials.password,
    })
}

fn login(fixture: &Fixture) -> Value {
    json!({
        "email": fixture.credentials.email,
        "password": fixture.credentials.password,
    })
}

fn new_site(fixture: &Fixture) -> Value {
    json!({
        "name": "Portfolio Testing Site",
        "url": fixture.site_url,
    })
}

fn site_update(fixture: &Fixture) -> Value {
    json!({
        "name": "Portfolio Testing Site (Updated)",
        "url": fixture.site_url,
    })
}

fn monitor_settings(_: &Fixture) -> Value {
    json!({
        "checkFrequency": "daily",
        "enableAlerts": true,
        "checkPerformance": true,
        "checkKeywords": true,
        "alertThreshold": 2000,
    })
}

/// The full run, in execution order.
pub fn catalogue() -> Vec<Step> {
    use Group::*;

    vec![
        Step::new(
            "register_user",
            "Register new user",
            Authentication,
            "POST",
            "/api/auth/register",
        )
        .anonymous()
        .payload(registration)
        .captures(&[
            (Capture::AuthToken, "/data/token"),
            (Capture::UserId, "/data/user/id"),
        ]),
        Step::new("login", "Log in", Authentication, "POST", "/api/auth/login")
            .anonymous()
            .payload(login)
            .captures(&[(Capture::AuthToken, "/data/token")]),
        Step::new(
            "get_profile",
            "Fetch user profile",
            Authentication,
            "GET",
            "/api/auth/me",
        ),
        Step::new(
            "create_site",
            "Create monitored site",
            Sites,
            "POST",
            "/api/sites",
        )
        .payload(new_site)
        .captures(&[(Capture::SiteId, "/data/site/id")]),
        Step::new("get_sites", "List sites", Sites, "GET", "/api/sites")
            .counts("/data/sites"),
        Step::new(
            "get_site_detail",
            "Fetch site detail",
            Sites,
            "GET",
            "/api/sites/{site_id}",
        ),
        Step::new(
            "update_site",
            "Update site",
            Sites,
            "PUT",
            "/api/sites/{site_id}",
        )
        .payload(site_update),
        Step::new(
            "get_logs",
            "Fetch activity logs",
            StatsAndLogs,
            "GET",
            "/api/logs",
        )
        .counts("/data/logs"),
        Step::new(
            "get_stats",
            "Fetch general stats",
            StatsAndLogs,
            "GET",
            "/api/stats",
        ),
        Step::new(
            "get_user_stats",
            "Fetch user stats",
            StatsAndLogs,
            "GET",
            "/api/stats/user",
        ),
        Step::new(
            "get_activity_distribution",
            "Fetch activity distribution",
            StatsAndLogs,
            "GET",
            "/api/stats/activity",
        ),
        Step::new(
            "run_site_monitor_check",
            "Run full site monitor check",
            SiteMonitoring,
            "POST",
            "/api/sites/{site_id}/monitor",
        )
        .slow(),
        Step::new(
            "run_site_basic_check",
            "Run basic site check",
            SiteMonitoring,
            "GET",
            "/api/sites/{site_id}/check",
        ),
        Step::new(
            "run_site_ssl_check",
            "Run site SSL check",
            SiteMonitoring,
            "GET",
            "/api/sites/{site_id}/ssl",
        ),
        Step::new(
            "run_site_performance_check",
            "Run site performance analysis",
            SiteMonitoring,
            "GET",
            "/api/sites/{site_id}/performance",
        )
        .slow(),
        Step::new(
            "run_site_keyword_check",
            "Run site keyword analysis",
            SiteMonitoring,
            "GET",
            "/api/sites/{site_id}/keywords",
        ),
        Step::new(
            "run_site_hotspots_check",
            "Find site hotspots",
            SiteMonitoring,
            "GET",
            "/api/sites/{site_id}/hotspots",
        ),
        Step::new(
            "get_site_monitor_history",
            "Fetch site monitor history",
            SiteMonitoring,
            "GET",
            "/api/sites/{site_id}/history",
        ),
        Step::new(
            "update_monitor_settings",
            "Update monitor settings",
            Monitor,
            "PUT",
            "/api/monitor/site/{site_id}/settings",
        )
        .payload(monitor_settings),
        Step::new(
            "run_monitor_basic_check",
            "Run basic check via monitor",
            Monitor,
            "GET",
            "/api/monitor/site/{site_id}/basic",
        ),
        Step::new(
            "run_monitor_ssl_check",
            "Run SSL check via monitor",
            Monitor,
            "GET",
            "/api/monitor/site/{site_id}/ssl",
        ),
        Step::new(
            "run_monitor_performance_check",
            "Run performance analysis via monitor",
            Monitor,
            "GET",
            "/api/monitor/site/{site_id}/performance",
        )
        .slow(),
        Step::new(
            "run_monitor_keywords_check",
            "Run keyword analysis via monitor",
            Monitor,
            "GET",
            "/api/monitor/site/{site_id}/keywords",
        ),
        Step::new(
            "run_monitor_hotspots_check",
            "Find hotspots via monitor",
            Monitor,
            "GET",
            "/api/monitor/site/{site_id}/hotspots",
        ),
        Step::new(
            "run_monitor_full_check",
            "Run full check via monitor",
            Monitor,
            "GET",
            "/api/monitor/site/{site_id}/full",
        )
        .slow(),
        Step::new(
            "get_monitor_history",
            "Fetch history via monitor",
            Monitor,
            "GET",
            "/api/monitor/site/{site_id}/history",
        ),
        Step::new(
            "get_admin_monitor_overview",
            "Fetch admin monitor overview",
            Monitor,
            "GET",
            "/api/monitor/admin/overview",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn fixture() -> Fixture {
        Fixture {
            credentials: Credentials::for_run(42),
            site_url: "https://example.org".to_string(),
        }
    }

    fn step(name: &str) -> Step {
        catalogue().into_iter().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_catalogue_shape() {
        let steps = catalogue();
        assert_eq!(steps.len(), 27);

        let names: HashSet<_> = steps.iter().map(|s| s.name).collect();
        assert_eq!(names.len(), steps.len());

        let site_scoped = steps
            .iter()
            .filter(|s| s.precondition() == Precondition::SiteCreated)
            .count();
        assert_eq!(site_scoped, 17);

        assert_eq!(steps[0].name, "register_user");
        assert_eq!(steps[26].name, "get_admin_monitor_overview");
    }

    #[test]
    fn test_groups_are_contiguous_and_ordered() {
        let mut seen: Vec<Group> = Vec::new();
        for s in catalogue() {
            if seen.last() != Some(&s.group) {
                assert!(!seen.contains(&s.group), "{:?} appears twice", s.group);
                seen.push(s.group);
            }
        }
        assert_eq!(
            seen,
            [
                Group::Authentication,
                Group::Sites,
                Group::StatsAndLogs,
                Group::SiteMonitoring,
                Group::Monitor,
            ]
        );
    }

    #[test]
    fn test_site_endpoint_needs_site_id() {
        let detail = step("get_site_detail");
        let session = SessionState::new("http://api");
        assert_eq!(detail.endpoint(&session), None);

        let session = session.with_site_id("s-9".into());
        assert_eq!(detail.endpoint(&session).as_deref(), Some("/api/sites/s-9"));
        assert_eq!(
            step("update_monitor_settings").endpoint(&session).as_deref(),
            Some("/api/monitor/site/s-9/settings")
        );
    }

    #[test]
    fn test_auth_steps_never_send_bearer() {
        let session = SessionState::new("http://api").with_auth_token("old".into());
        let register = step("register_user");
        let payload = register.build_payload(&fixture());
        let req = register.build_request("/api/auth/register", &session, payload);

        assert_eq!(req.header_value("Authorization"), None);
        assert_eq!(req.header_value("Content-Type"), Some("application/json"));
        assert_eq!(req.body.unwrap()["email"], "test_42@example.com");

        let profile = step("get_profile").build_request("/api/auth/me", &session, None);
        assert_eq!(profile.header_value("Authorization"), Some("Bearer old"));
        assert_eq!(profile.url, "http://api/api/auth/me");
    }

    #[test]
    fn test_registration_captures_token_and_numeric_user_id() {
        let body = json!({"data": {"token": "jwt", "user": {"id": 17}}});
        let session = step("register_user").capture(SessionState::new("http://api"), &body);

        assert_eq!(session.auth_token.as_deref(), Some("jwt"));
        assert_eq!(session.user_id.as_deref(), Some("17"));
        assert_eq!(session.site_id, None);
    }

    #[test]
    fn test_missing_capture_leaves_session_untouched() {
        let before = SessionState::new("http://api").with_auth_token("keep".into());
        let after = step("login").capture(before.clone(), &json!({"data": {}}));
        assert_eq!(after, before);
    }

    #[test]
    fn test_site_precondition_tracks_session() {
        let session = SessionState::new("http://api");
        assert!(Precondition::None.is_met(&session));
        assert!(!Precondition::SiteCreated.is_met(&session));
        assert!(Precondition::SiteCreated.is_met(&session.with_site_id("1".into())));
    }

    #[test]
    fn test_captured_id_follows_step_captures() {
        let session = SessionState::new("http://api")
            .with_auth_token("jwt".into())
            .with_user_id("u-7".into())
            .with_site_id("s-3".into());

        assert_eq!(step("register_user").captured_id(&session), Some("u-7"));
        assert_eq!(step("create_site").captured_id(&session), Some("s-3"));
        assert_eq!(step("login").captured_id(&session), None);
        assert_eq!(step("get_stats").captured_id(&session), None);
    }

    #[test]
    fn test_count_reads_array_length() {
        let body = json!({"data": {"sites": [1, 2, 3]}});
        assert_eq!(step("get_sites").count(&body), Some(3));
        assert_eq!(step("get_stats").count(&body), None);
    }

    #[test]
    fn test_monitor_settings_payload() {
        let payload = step("update_monitor_settings").build_payload(&fixture()).unwrap();
        assert_eq!(payload["checkFrequency"], "daily");
        assert_eq!(payload["alertThreshold"], 2000);
    }
}
