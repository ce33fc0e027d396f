//! Login sessions for the master password gate

use chrono::{DateTime, Duration, Utc};
use rusqlite::params;
use serde::Serialize;

use super::{format_datetime, Database};
use crate::auth::{generate_session_token, hash_token};
use crate::error::{Error, Result};

/// A freshly issued session; the plain token is only available here
#[derive(Debug, Clone, Serialize)]
pub struct NewSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Database {
    /// Issue a session token valid for `ttl`
    pub fn create_session(&self, ttl: Duration) -> Result<NewSession> {
        let expires_at = Utc::now().checked_add_signed(ttl).ok_or_else(|| {
            Error::InvalidData(format!(
                "Session lifetime out of range: {}s",
                ttl.num_seconds()
            ))
        })?;
        let token = generate_session_token();

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO sessions (token_hash, expires_at) VALUES (?, ?)",
            params![hash_token(&token), format_datetime(&expires_at)],
        )?;

        Ok(NewSession { token, expires_at })
    }

    /// Whether a token belongs to an unexpired session
    pub fn validate_session(&self, token: &str) -> Result<bool> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sessions WHERE token_hash = ? AND expires_at > ?",
            params![hash_token(token), format_datetime(&Utc::now())],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// End a session; false if the token was unknown
    pub fn delete_session(&self, token: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE token_hash = ?",
            params![hash_token(token)],
        )?;
        Ok(deleted > 0)
    }

    /// Drop expired sessions, returning how many were removed
    pub fn purge_expired_sessions(&self) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM sessions WHERE expires_at <= ?",
            params![format_datetime(&Utc::now())],
        )?;
        Ok(removed)
    }
}
