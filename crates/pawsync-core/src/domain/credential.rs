//! Credential domain entity
//!
//! A [`Credential`] is the access token granted by the remote authority
//! together with the instant after which it must no longer be used. The
//! stored expiry is deliberately earlier than the authority's real expiry:
//! a fixed safety buffer is subtracted from the granted lifetime.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::AccessToken;

/// Default number of seconds subtracted from a granted lifetime
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 60;

/// OAuth credential persisted between runs
///
/// Either the whole credential is present or the user is disconnected;
/// there is no credential without an expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Bearer token for API requests
    access_token: AccessToken,
    /// Token for non-interactive renewal, when the authority issued one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    /// Conservative expiry (granted lifetime minus the safety buffer)
    expires_at: DateTime<Utc>,
}

impl Credential {
    /// Creates a credential with an explicit expiry
    pub fn new(
        access_token: AccessToken,
        refresh_token: Option<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            expires_at,
        }
    }

    /// Creates a credential from a freshly granted lifetime
    ///
    /// `expires_at = now + (lifetime - buffer)`, never earlier than `now`.
    pub fn from_lifetime(
        access_token: AccessToken,
        refresh_token: Option<String>,
        lifetime: Duration,
        buffer: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let effective = (lifetime - buffer).max(Duration::zero());
        Self::new(access_token, refresh_token, now + effective)
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true if the token may still be used at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Returns true if the access token has expired
    pub fn is_expired(&self) -> bool {
        !self.is_valid_at(Utc::now())
    }

    /// Returns a copy that keeps `previous` as refresh token when renewal
    /// did not hand out a new one
    #[must_use]
    pub fn inherit_refresh_token(mut self, previous: Option<&str>) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = previous.map(str::to_string);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(s: &str) -> AccessToken {
        AccessToken::new(s).unwrap()
    }

    #[test]
    fn test_from_lifetime_subtracts_buffer() {
        let now = Utc::now();
        let cred = Credential::from_lifetime(
            token("at"),
            None,
            Duration::seconds(3600),
            Duration::seconds(DEFAULT_EXPIRY_BUFFER_SECS),
            now,
        );
        assert_eq!(cred.expires_at(), now + Duration::seconds(3540));
    }

    #[test]
    fn test_from_lifetime_shorter_than_buffer_is_already_expired() {
        let now = Utc::now();
        let cred = Credential::from_lifetime(
            token("at"),
            None,
            Duration::seconds(30),
            Duration::seconds(60),
            now,
        );
        assert_eq!(cred.expires_at(), now);
        assert!(!cred.is_valid_at(now));
    }

    #[test]
    fn test_validity_boundary() {
        let now = Utc::now();
        let cred = Credential::new(token("at"), None, now);
        assert!(cred.is_valid_at(now - Duration::milliseconds(1)));
        assert!(!cred.is_valid_at(now));
    }

    #[test]
    fn test_empty_refresh_token_is_dropped() {
        let cred = Credential::new(token("at"), Some(String::new()), Utc::now());
        assert!(cred.refresh_token().is_none());
    }

    #[test]
    fn test_inherit_refresh_token() {
        let now = Utc::now();
        let renewed = Credential::new(token("new"), None, now).inherit_refresh_token(Some("rt"));
        assert_eq!(renewed.refresh_token(), Some("rt"));

        let rotated =
            Credential::new(token("new"), Some("rt2".into()), now).inherit_refresh_token(Some("rt"));
        assert_eq!(rotated.refresh_token(), Some("rt2"));
    }

    #[test]
    fn test_json_roundtrip() {
        let cred = Credential::new(token("at"), Some("rt".into()), Utc::now());
        let json = serde_json::to_string(&cred).unwrap();
        let back: Credential = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cred);
    }

    #[test]
    fn test_json_with_empty_access_token_is_rejected() {
        let json = r#"{"access_token":"","expires_at":"2024-01-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<Credential>(json).is_err());
    }
}
