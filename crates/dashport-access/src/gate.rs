//! Session boundary decisions for page requests.
//!
//! Pure functions of the request path and the caller's session; the
//! server applies the result as a redirect.

/// What is known about the caller when a request arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated { email_verified: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToLogin,
    RedirectToConfirmEmail,
    RedirectToDashboard,
}

impl GateDecision {
    /// Redirect target, if the decision is a redirect.
    pub fn location(&self) -> Option<&'static str> {
        match self {
            GateDecision::Allow => None,
            GateDecision::RedirectToLogin => Some(LOGIN_PATH),
            GateDecision::RedirectToConfirmEmail => Some(CONFIRM_EMAIL_PATH),
            GateDecision::RedirectToDashboard => Some(DASHBOARD_PATH),
        }
    }
}

pub const LOGIN_PATH: &str = "/login";
pub const CONFIRM_EMAIL_PATH: &str = "/auth/confirm-email";
pub const DASHBOARD_PATH: &str = "/dashboard";

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/') || rest.starts_with('?'))
}

/// Paths reachable without a session and without a confirmed email.
fn exempt(path: &str) -> bool {
    ["/login", "/auth", "/api", "/health"]
        .iter()
        .any(|p| under(path, p))
}

pub fn decide(path: &str, session: SessionState) -> GateDecision {
    match session {
        SessionState::Anonymous if exempt(path) => GateDecision::Allow,
        SessionState::Anonymous => GateDecision::RedirectToLogin,
        SessionState::Authenticated { email_verified } => {
            if !email_verified && !exempt(path) {
                GateDecision::RedirectToConfirmEmail
            } else if path == LOGIN_PATH {
                GateDecision::RedirectToDashboard
            } else {
                GateDecision::Allow
            }
        }
    }
}
