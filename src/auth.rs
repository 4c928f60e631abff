//! Bearer token sources.
//!
//! The uploader only ever reads the token; writing it belongs to the login
//! flow. A provider returning `None` makes submissions fail with
//! `Unauthenticated` before any request is sent.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AuthConfig;

pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

fn non_empty(token: String) -> Option<String> {
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Fixed token, mostly for tests and scripted runs.
#[derive(Debug, Clone, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(non_empty(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Token read from an environment variable at each call.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenProvider for EnvToken {
    fn bearer_token(&self) -> Option<String> {
        std::env::var(&self.var).ok().and_then(non_empty)
    }
}

/// Token persisted to disk by the login flow. Re-read at each call so a
/// fresh login is picked up without restarting.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenProvider for TokenFile {
    fn bearer_token(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(content) => non_empty(content),
            Err(e) => {
                tracing::debug!("no token at {}: {}", self.path.display(), e);
                None
            }
        }
    }
}

/// First provider with a token wins.
#[derive(Default)]
pub struct ChainedTokens {
    providers: Vec<Box<dyn TokenProvider>>,
}

impl ChainedTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }
}

impl TokenProvider for ChainedTokens {
    fn bearer_token(&self) -> Option<String> {
        self.providers.iter().find_map(|p| p.bearer_token())
    }
}

/// Token file (when configured) then environment variable.
pub fn from_config(config: &AuthConfig) -> Arc<dyn TokenProvider> {
    let mut chain = ChainedTokens::new();
    if let Some(path) = &config.token_file {
        chain = chain.with(TokenFile::new(path.clone()));
    }
    Arc::new(chain.with(EnvToken::new(config.token_env.clone())))
}
