//! Identity collaborator: accounts, password checks and bearer-token resolution.
//!
//! The graph core only ever asks "which owner does this token belong to"; everything else
//! here exists so the desktop app and the HTTP surface can sign people up and in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::graph_utils::error::{Result, VaultError};
use crate::graph_utils::model::OwnerId;

pub const MIN_PASSWORD_LEN: usize = 6;
/// bcrypt work factor for new passwords.
pub const DEFAULT_HASH_COST: u32 = bcrypt::DEFAULT_COST;
/// Lowest work factor bcrypt accepts.
pub const MIN_HASH_COST: u32 = 4;
/// How long a token stays valid after signup or login.
pub const SESSION_TTL: Duration = Duration::days(7);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: OwnerId,
    pub email: String,
    pub name: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthPayload {
    pub token: String,
    pub user: User,
}

pub trait IdentityProvider: Send {
    fn signup(&mut self, email: &str, password: &str, name: Option<&str>) -> Result<AuthPayload>;
    fn login(&mut self, email: &str, password: &str) -> Result<AuthPayload>;
    /// Map a bearer token to its owner, or fail with `Unauthenticated`. Expired sessions are
    /// dropped on the way.
    fn resolve(&mut self, token: &str) -> Result<OwnerId>;
    fn me(&self, token: &str) -> Result<User>;
    fn logout(&mut self, token: &str);
}

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Account {
    user: User,
    password_hash: String,
}

#[derive(Clone, Copy, Debug)]
struct Session {
    owner: OwnerId,
    expires_at: OffsetDateTime,
}

impl Session {
    fn is_live(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

/// In-process identity provider. Accounts persist with the vault state; sessions do not.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocalIdentity {
    accounts: HashMap<String, Account>,
    #[serde(skip)]
    sessions: HashMap<String, Session>,
    #[serde(skip, default = "default_hash_cost")]
    hash_cost: u32,
    #[serde(skip, default = "default_session_ttl")]
    session_ttl: Duration,
}

fn default_hash_cost() -> u32 {
    DEFAULT_HASH_COST
}

fn default_session_ttl() -> Duration {
    SESSION_TTL
}

impl Default for LocalIdentity {
    fn default() -> Self {
        Self {
            accounts: HashMap::new(),
            sessions: HashMap::new(),
            hash_cost: DEFAULT_HASH_COST,
            session_ttl: SESSION_TTL,
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn invalid_credentials() -> VaultError {
    VaultError::Unauthenticated("Invalid email or password".to_string())
}

impl LocalIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Work factor for passwords hashed from now on. Existing hashes keep their own.
    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost.clamp(MIN_HASH_COST, 31);
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Forget every session whose lifetime has run out.
    pub fn prune_expired(&mut self) -> usize {
        let now = OffsetDateTime::now_utc();
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.is_live(now));
        let dropped = before - self.sessions.len();
        if dropped > 0 {
            log::debug!("dropped {} expired sessions", dropped);
        }
        dropped
    }

    fn live_owner(&self, token: &str) -> Option<OwnerId> {
        let now = OffsetDateTime::now_utc();
        self.sessions.get(token).filter(|s| s.is_live(now)).map(|s| s.owner)
    }

    fn open_session(&mut self, user: &User) -> AuthPayload {
        self.prune_expired();
        let token = new_token();
        let session = Session { owner: user.id, expires_at: OffsetDateTime::now_utc() + self.session_ttl };
        self.sessions.insert(token.clone(), session);
        AuthPayload { token, user: user.clone() }
    }
}

impl IdentityProvider for LocalIdentity {
    fn signup(&mut self, email: &str, password: &str, name: Option<&str>) -> Result<AuthPayload> {
        let key = normalize_email(email);
        if !key.contains('@') {
            return Err(VaultError::validation("Email must contain '@'"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(VaultError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if self.accounts.contains_key(&key) {
            log::warn!("signup rejected: duplicate email");
            return Err(VaultError::Conflict("Email already exists".to_string()));
        }
        let password_hash = bcrypt::hash(password, self.hash_cost)
            .map_err(|e| VaultError::validation(format!("Password could not be hashed: {}", e)))?;
        let user = User {
            id: Uuid::now_v7(),
            email: key.clone(),
            name: name.map(str::trim).filter(|n| !n.is_empty()).map(str::to_string),
            created_at: OffsetDateTime::now_utc(),
        };
        self.accounts.insert(key, Account { user: user.clone(), password_hash });
        log::info!("account created for owner {}", user.id);
        Ok(self.open_session(&user))
    }

    fn login(&mut self, email: &str, password: &str) -> Result<AuthPayload> {
        let key = normalize_email(email);
        let Some(account) = self.accounts.get(&key) else {
            log::warn!("login failed: unknown email");
            return Err(invalid_credentials());
        };
        match bcrypt::verify(password, &account.password_hash) {
            Ok(true) => {}
            Ok(false) => {
                log::warn!("login failed: bad password for owner {}", account.user.id);
                return Err(invalid_credentials());
            }
            Err(e) => {
                log::warn!("login failed: unreadable password hash for owner {}: {}", account.user.id, e);
                return Err(invalid_credentials());
            }
        }
        let user = account.user.clone();
        Ok(self.open_session(&user))
    }

    fn resolve(&mut self, token: &str) -> Result<OwnerId> {
        self.prune_expired();
        self.live_owner(token).ok_or_else(VaultError::unauthenticated)
    }

    fn me(&self, token: &str) -> Result<User> {
        let owner = self.live_owner(token).ok_or_else(VaultError::unauthenticated)?;
        self.accounts
            .values()
            .find(|a| a.user.id == owner)
            .map(|a| a.user.clone())
            .ok_or_else(VaultError::unauthenticated)
    }

    fn logout(&mut self, token: &str) {
        self.sessions.remove(token);
    }
}

/// Token from an `Authorization: Bearer <token>` header value.
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> LocalIdentity {
        LocalIdentity::new().with_hash_cost(MIN_HASH_COST)
    }

    #[test]
    fn signup_then_login_resolves_same_owner() {
        let mut id = fast();
        let a = id.signup("Ada@Example.com ", "hunter22", Some("Ada")).unwrap();
        let b = id.login("ada@example.com", "hunter22").unwrap();
        assert_ne!(a.token, b.token);
        assert_eq!(id.resolve(&a.token).unwrap(), a.user.id);
        assert_eq!(id.resolve(&b.token).unwrap(), a.user.id);
        assert_eq!(id.me(&b.token).unwrap().name.as_deref(), Some("Ada"));
    }

    #[test]
    fn signup_validation_and_conflict() {
        let mut id = fast();
        assert!(matches!(id.signup("nope", "hunter22", None), Err(VaultError::Validation(_))));
        assert!(matches!(id.signup("a@b.c", "12345", None), Err(VaultError::Validation(_))));
        id.signup("a@b.c", "123456", None).unwrap();
        assert_eq!(
            id.signup("A@B.C", "abcdef", None).unwrap_err(),
            VaultError::Conflict("Email already exists".into())
        );
    }

    #[test]
    fn bad_credentials_are_indistinguishable() {
        let mut id = fast();
        id.signup("a@b.c", "123456", None).unwrap();
        let wrong_pw = id.login("a@b.c", "654321").unwrap_err();
        let unknown = id.login("x@y.z", "123456").unwrap_err();
        assert_eq!(wrong_pw, unknown);
        assert!(wrong_pw.is_auth_failure());
    }

    #[test]
    fn logout_revokes_token_and_sessions_are_not_persisted() {
        let mut id = fast();
        let auth = id.signup("a@b.c", "s3cret!pw", None).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert!(!json.contains(&auth.token));
        assert!(!json.contains("s3cret!pw"));
        assert!(json.contains("$2b$04$"));
        id.logout(&auth.token);
        assert!(id.resolve(&auth.token).is_err());
    }

    #[test]
    fn new_accounts_hash_at_the_default_cost() {
        assert_eq!(LocalIdentity::new().hash_cost, 12);
        let loaded: LocalIdentity = serde_json::from_str(r#"{"accounts":{}}"#).unwrap();
        assert_eq!(loaded.hash_cost, 12);
        assert_eq!(loaded.session_ttl, Duration::days(7));
        assert_eq!(fast().with_hash_cost(1).hash_cost, MIN_HASH_COST);
    }

    #[test]
    fn expired_session_is_rejected_and_dropped() {
        let mut id = fast().with_session_ttl(Duration::ZERO);
        let auth = id.signup("a@b.c", "123456", None).unwrap();
        assert_eq!(id.session_count(), 1);
        assert!(id.me(&auth.token).unwrap_err().is_auth_failure());
        assert!(id.resolve(&auth.token).unwrap_err().is_auth_failure());
        assert_eq!(id.session_count(), 0);
    }

    #[test]
    fn live_sessions_survive_pruning() {
        let mut id = fast();
        let auth = id.signup("a@b.c", "123456", None).unwrap();
        assert_eq!(id.prune_expired(), 0);
        assert_eq!(id.resolve(&auth.token).unwrap(), auth.user.id);

        // the next sign-in clears the lapsed token before opening its own
        id.sessions.values_mut().for_each(|s| s.expires_at = OffsetDateTime::now_utc() - Duration::seconds(1));
        id.login("a@b.c", "123456").unwrap();
        assert_eq!(id.session_count(), 1);
        assert!(id.resolve(&auth.token).is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(extract_bearer("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer("bearer   abc "), Some("abc"));
        assert_eq!(extract_bearer("Basic abc"), None);
        assert_eq!(extract_bearer("Bearer "), None);
    }
}
