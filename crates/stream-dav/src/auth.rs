//! Bearer tokens for the remote content API.
//!
//! Issuing and refreshing tokens happens elsewhere; the server only asks a
//! [`TokenSource`] for the current token before each fetch.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read token file {path}: {source}")]
    TokenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("token file {0} is empty")]
    EmptyToken(PathBuf),
}

/// A bearer token and, when known, its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub expiry: Option<SystemTime>,
}

/// Source of access tokens for the remote API.
pub trait TokenSource: Send + Sync {
    fn access_token(&self) -> Result<AccessToken, AuthError>;
}

/// A fixed token that never expires.
#[derive(Debug, Clone)]
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenSource for StaticToken {
    fn access_token(&self) -> Result<AccessToken, AuthError> {
        Ok(AccessToken {
            token: self.token.clone(),
            expiry: None,
        })
    }
}

/// A token read from a file on every call, so an external refresher can
/// rotate it without restarting the server.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl TokenSource for TokenFile {
    fn access_token(&self) -> Result<AccessToken, AuthError> {
        let contents = fs::read_to_string(&self.path).map_err(|source| AuthError::TokenFile {
            path: self.path.clone(),
            source,
        })?;

        let token = contents.trim();
        if token.is_empty() {
            return Err(AuthError::EmptyToken(self.path.clone()));
        }

        Ok(AccessToken {
            token: token.to_string(),
            expiry: None,
        })
    }
}
