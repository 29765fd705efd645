// Session contract with the identity provider.
//
// The identity provider owns issuance and storage of sessions. The data
// layer only ever reads the access token right before a request and asks
// for a sign-out when the backend answers 401. There is no refresh path.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, warn};

/// Role of the signed-in dashboard user.
///
/// Closed set: an unknown role in a session payload is a deserialization
/// error, not a silent downgrade.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Admin,
    Manager,
    Provider,
    Parent,
}

impl Role {
    /// Staff roles may use the admin dashboard at all.
    pub fn is_staff(self) -> bool {
        match self {
            Self::SuperAdmin | Self::Admin | Self::Manager => true,
            Self::Provider | Self::Parent => false,
        }
    }

    /// Invite, remove, and re-role team members.
    pub fn can_manage_team(self) -> bool {
        match self {
            Self::SuperAdmin | Self::Admin => true,
            Self::Manager | Self::Provider | Self::Parent => false,
        }
    }

    /// Invoices, subscriptions, and revenue analytics.
    pub fn can_view_finance(self) -> bool {
        match self {
            Self::SuperAdmin | Self::Admin | Self::Manager => true,
            Self::Provider | Self::Parent => false,
        }
    }

    pub fn can_moderate_reviews(self) -> bool {
        match self {
            Self::SuperAdmin | Self::Admin | Self::Manager => true,
            Self::Provider | Self::Parent => false,
        }
    }
}

/// The user a session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub role: Role,
}

/// A session handed over by the identity provider.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<DateTime<Utc>>,
    pub user: SessionUser,
}

impl Session {
    pub fn new(access_token: SecretString, user: SessionUser) -> Self {
        Self {
            access_token,
            refresh_token: None,
            expires_at: None,
            user,
        }
    }

    /// Whether `expires_at` lies in the past. Sessions without an expiry never expire.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// What the data layer needs from the identity provider.
///
/// Both methods are synchronous: the token is read right before each
/// request is sent, and sign-out is a fire-and-forget side effect.
pub trait SessionProvider: Send + Sync {
    /// The currently active session, if any.
    fn current_session(&self) -> Option<Arc<Session>>;

    /// End the session globally and route the user to `callback_url`.
    fn sign_out(&self, callback_url: &str);
}

/// Observable session status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticated,
    SignedOut { callback_url: String },
}

/// In-process identity provider stand-in.
///
/// Holds at most one session. `sign_out` clears it, counts the call, and
/// broadcasts the new status to watchers (the CLI prints the redirect, tests
/// assert the count).
pub struct MemorySessionStore {
    session: ArcSwapOption<Session>,
    status: watch::Sender<SessionStatus>,
    sign_outs: AtomicU64,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        let (status, _) = watch::channel(SessionStatus::Anonymous);
        Self {
            session: ArcSwapOption::empty(),
            status,
            sign_outs: AtomicU64::new(0),
        }
    }

    /// Store pre-populated with `session`.
    pub fn with_session(session: Session) -> Self {
        let store = Self::new();
        store.sign_in(session);
        store
    }

    /// Install a session (replacing any previous one).
    pub fn sign_in(&self, session: Session) {
        info!(user = %session.user.email, role = %session.user.role, "session started");
        self.session.store(Some(Arc::new(session)));
        self.status.send_replace(SessionStatus::Authenticated);
    }

    /// Number of sign-outs performed since construction.
    pub fn sign_out_count(&self) -> u64 {
        self.sign_outs.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider for MemorySessionStore {
    fn current_session(&self) -> Option<Arc<Session>> {
        self.session.load_full()
    }

    fn sign_out(&self, callback_url: &str) {
        warn!(callback_url, "signing out");
        self.session.store(None);
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        self.status.send_replace(SessionStatus::SignedOut {
            callback_url: callback_url.to_owned(),
        });
    }
}
