use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

/// Name of the cookie holding the session id.
pub const SESSION_COOKIE: &str = "tabkeep_session";

/// Header carrying the CSRF token, both on responses and on unsafe requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Response cookie recorded by a session (re)creation.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub session_id: String,
    pub max_age: Duration,
    pub secure: bool,
}

impl SessionCookie {
    /// `Set-Cookie` value.
    pub fn header_value(&self) -> String {
        let mut value = format!(
            "{SESSION_COOKIE}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.session_id,
            self.max_age.as_secs()
        );
        if self.secure {
            value.push_str("; Secure");
        }
        value
    }
}

impl fmt::Debug for SessionCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCookie")
            .field("session_id", &"<redacted>")
            .field("max_age", &self.max_age)
            .field("secure", &self.secure)
            .finish()
    }
}

/// Side effects the session layer wants applied to the response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseEffects {
    pub session_cookie: Option<SessionCookie>,
    pub csrf_token: Option<String>,
}

/// Per-request view of the caller used by the session layer.
///
/// Built by the HTTP layer from the incoming request; the session layer reads
/// the cookie value and caller address from it and writes back the cookie and
/// header the response must carry.
#[derive(Clone)]
pub struct RequestContext {
    session_id: Option<String>,
    client_ip: IpAddr,
    secure: bool,
    effects: ResponseEffects,
}

impl RequestContext {
    pub fn new(session_id: Option<String>, client_ip: IpAddr, secure: bool) -> Self {
        Self {
            session_id: session_id.filter(|id| !id.is_empty()),
            client_ip,
            secure,
            effects: ResponseEffects::default(),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn client_ip(&self) -> IpAddr {
        self.client_ip
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn effects(&self) -> &ResponseEffects {
        &self.effects
    }

    pub fn into_effects(self) -> ResponseEffects {
        self.effects
    }

    pub(crate) fn emit_csrf(&mut self, token: &str) {
        self.effects.csrf_token = Some(token.to_string());
    }

    /// Point the rest of the request at a freshly created session.
    pub(crate) fn rotate(&mut self, session_id: String, max_age: Duration, csrf_token: &str) {
        self.effects.session_cookie = Some(SessionCookie {
            session_id: session_id.clone(),
            max_age,
            secure: self.secure,
        });
        self.session_id = Some(session_id);
        self.emit_csrf(csrf_token);
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("has_session", &self.session_id.is_some())
            .field("client_ip", &self.client_ip)
            .field("secure", &self.secure)
            .finish()
    }
}
