//! Assistant credential lookup
//!
//! The API key comes from a process-wide environment variable. It is read
//! once at startup and kept in a buffer that is wiped on drop.

use crate::error::{Error, Result};
use zeroize::Zeroizing;

/// API key for the wrapped assistant
#[derive(Clone)]
pub struct Credential {
    source: String,
    secret: Zeroizing<String>,
}

impl Credential {
    pub fn new(source: &str, secret: String) -> Self {
        Self {
            source: source.to_string(),
            secret: Zeroizing::new(secret),
        }
    }

    /// Read the credential from `var`
    ///
    /// A missing, non-unicode or blank variable is a configuration error.
    pub fn from_env(var: &str) -> Result<Self> {
        match std::env::var(var) {
            Ok(value) if !value.trim().is_empty() => {
                debug!("Credential loaded from ${}", var);
                Ok(Self::new(var, value))
            }
            _ => Err(Error::MissingCredential {
                var: var.to_string(),
            }),
        }
    }

    /// Name of the variable this credential came from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// The raw secret; only for building the child's argument list
    pub fn expose(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("source", &self.source)
            .field("secret", &"<redacted>")
            .finish()
    }
}
