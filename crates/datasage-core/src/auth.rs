//! Bearer token sources.
//!
//! The token is attached to every service call when present. A missing token
//! still issues the call; rejecting it is the server's job.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AuthConfig;

pub trait TokenProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// A token fixed at construction (config file or `--token`).
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.trim().is_empty()))
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Reads the token from an environment variable on every call.
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl TokenProvider for EnvToken {
    fn token(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// Reads the token from a file on every call, so a login tool can refresh it.
pub struct FileToken {
    path: PathBuf,
}

impl FileToken {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TokenProvider for FileToken {
    fn token(&self) -> Option<String> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                (!token.is_empty()).then(|| token.to_string())
            }
            Err(e) => {
                tracing::debug!("Token file {:?} unreadable: {}", self.path, e);
                None
            }
        }
    }
}

/// First provider that yields a token wins.
pub struct TokenChain {
    providers: Vec<Arc<dyn TokenProvider>>,
}

impl TokenChain {
    pub fn new(providers: Vec<Arc<dyn TokenProvider>>) -> Self {
        Self { providers }
    }

    /// Build the chain described by the `[auth]` config section.
    pub fn from_config(config: &AuthConfig) -> Self {
        let mut providers: Vec<Arc<dyn TokenProvider>> = Vec::new();
        if config.token.is_some() {
            providers.push(Arc::new(StaticToken::new(config.token.clone())));
        }
        if let Some(var) = &config.token_env {
            providers.push(Arc::new(EnvToken::new(var.clone())));
        }
        if let Some(path) = &config.token_file {
            providers.push(Arc::new(FileToken::new(path.clone())));
        }
        Self::new(providers)
    }
}

impl TokenProvider for TokenChain {
    fn token(&self) -> Option<String> {
        self.providers.iter().find_map(|p| p.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_token_ignores_blank() {
        assert_eq!(StaticToken::new(Some("abc".into())).token().as_deref(), Some("abc"));
        assert!(StaticToken::new(Some("   ".into())).token().is_none());
        assert!(StaticToken::new(None).token().is_none());
    }

    #[test]
    fn test_file_token_trims_and_handles_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  secret-token\n").unwrap();

        assert_eq!(FileToken::new(&path).token().as_deref(), Some("secret-token"));
        assert!(FileToken::new(dir.path().join("missing")).token().is_none());
    }

    #[test]
    fn test_chain_prefers_config_token() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "from-file").unwrap();

        let config = AuthConfig {
            token: Some("from-config".into()),
            token_env: None,
            token_file: Some(path.clone()),
        };
        assert_eq!(TokenChain::from_config(&config).token().as_deref(), Some("from-config"));

        let config = AuthConfig {
            token: None,
            token_env: Some("DATASAGE_TEST_TOKEN_THAT_IS_NEVER_SET".into()),
            token_file: Some(path),
        };
        assert_eq!(TokenChain::from_config(&config).token().as_deref(), Some("from-file"));
    }

    #[test]
    fn test_empty_chain_yields_none() {
        assert!(TokenChain::new(Vec::new()).token().is_none());
    }
}
