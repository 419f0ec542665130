//! Interchangeable API credentials.
//!
//! The pool keeps no per-credential health state. Every selection is
//! independent, so a key that was just rate limited can be picked again and
//! has to be rejected again by the API.

use rand::Rng;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use trinho_core::ConfigError;

/// An API key. `Debug` and `Display` never print the full secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.0.chars().collect();
        if chars.len() > 8 {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{head}...{tail}")
        } else {
            "***".to_string()
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.masked())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

/// How the next credential is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionStrategy {
    /// Uniform random sample on every call.
    #[default]
    Random,
    /// Cycle through the keys in configuration order.
    RoundRobin,
}

impl std::str::FromStr for SelectionStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "random" => Ok(Self::Random),
            "round_robin" | "round-robin" | "roundrobin" => Ok(Self::RoundRobin),
            other => Err(ConfigError::Other(format!(
                "unknown credential strategy: {other}"
            ))),
        }
    }
}

#[derive(Debug)]
pub struct CredentialPool {
    credentials: Vec<Credential>,
    strategy: SelectionStrategy,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Build a pool from raw keys. Blank keys are dropped; an empty result is a
    /// configuration error.
    pub fn new<I, S>(keys: I, strategy: SelectionStrategy) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let credentials: Vec<Credential> = keys
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .map(Credential::new)
            .collect();

        if credentials.is_empty() {
            return Err(ConfigError::NoCredentials);
        }

        Ok(Self {
            credentials,
            strategy,
            cursor: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    #[must_use]
    pub const fn strategy(&self) -> SelectionStrategy {
        self.strategy
    }

    /// Pick the credential for the next call.
    #[must_use]
    pub fn select(&self) -> &Credential {
        let idx = match self.strategy {
            SelectionStrategy::Random => rand::thread_rng().gen_range(0..self.credentials.len()),
            SelectionStrategy::RoundRobin => {
                self.cursor.fetch_add(1, Ordering::Relaxed) % self.credentials.len()
            }
        };
        &self.credentials[idx]
    }

    /// Alias of [`Self::select`].
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn next(&self) -> &Credential {
        self.select()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn empty_pool_is_a_config_error() {
        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            CredentialPool::new(empty, SelectionStrategy::Random),
            Err(ConfigError::NoCredentials)
        ));
        assert!(matches!(
            CredentialPool::new(["", "   "], SelectionStrategy::Random),
            Err(ConfigError::NoCredentials)
        ));
    }

    #[test]
    fn random_selection_stays_in_pool() {
        let pool = CredentialPool::new(["key-a", "key-b", "key-c"], SelectionStrategy::Random)
            .unwrap_or_else(|e| panic!("{e}"));
        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.insert(pool.select().secret().to_string());
        }
        assert!(seen.iter().all(|k| k.starts_with("key-")));
        // 200 uniform draws over 3 keys miss one with negligible probability.
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn round_robin_cycles_in_order() {
        let pool = CredentialPool::new(["a", "b"], SelectionStrategy::RoundRobin)
            .unwrap_or_else(|e| panic!("{e}"));
        let picks: Vec<&str> = (0..4).map(|_| pool.next().secret()).collect();
        assert_eq!(picks, vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn credentials_are_masked() {
        let cred = Credential::new("sk-1234567890abcdef");
        assert_eq!(cred.masked(), "sk-1...cdef");
        assert_eq!(format!("{cred:?}"), "Credential(sk-1...cdef)");
        assert_eq!(Credential::new("short").to_string(), "***");
    }

    #[test]
    fn parses_strategy_names() {
        assert_eq!(
            "round_robin".parse::<SelectionStrategy>().ok(),
            Some(SelectionStrategy::RoundRobin)
        );
        assert_eq!(
            "Random".parse::<SelectionStrategy>().ok(),
            Some(SelectionStrategy::Random)
        );
        assert!("sticky".parse::<SelectionStrategy>().is_err());
    }
}
