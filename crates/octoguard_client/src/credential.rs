//! API credential with format validation.

use octoguard_error::{ClientError, ClientErrorKind, ClientResult};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Classic, OAuth, user-to-server, server-to-server and refresh tokens, then
/// fine-grained personal access tokens, then legacy 40-hex tokens.
static TOKEN_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:gh[pousr]_[A-Za-z0-9]{36}|github_pat_[A-Za-z0-9_]{82}|[0-9a-f]{40})$")
        .expect("Valid token regex")
});

/// Bearer token for the remote API.
///
/// Validated once at construction and immutable afterwards. Neither `Debug`
/// nor `Display` prints the secret.
///
/// # Example
///
/// ```
/// use octoguard_client::Credential;
///
/// let token = format!("ghp_{}", "a".repeat(36));
/// let credential = Credential::new(token).unwrap();
/// assert_eq!(credential.to_string(), "ghp_****");
///
/// assert!(Credential::new("not-a-token").is_err());
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Validate and wrap a token.
    #[track_caller]
    pub fn new(token: impl Into<String>) -> ClientResult<Self> {
        let token = token.into();
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(ClientError::new(ClientErrorKind::InvalidCredential(
                "token is empty".to_string(),
            )));
        }
        if !TOKEN_FORMAT.is_match(trimmed) {
            return Err(ClientError::new(ClientErrorKind::InvalidCredential(
                "token does not match a known GitHub token format".to_string(),
            )));
        }
        Ok(Self {
            token: trimmed.to_string(),
        })
    }

    /// The raw token, for building the authorization header.
    pub fn expose(&self) -> &str {
        &self.token
    }

    /// Value of the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Token prefix safe to log (`ghp_`, `github_pat_`, or empty for legacy tokens).
    pub fn prefix(&self) -> &str {
        if self.token.starts_with("github_pat_") {
            return "github_pat_";
        }
        match self.token.find('_') {
            Some(idx) => &self.token[..=idx],
            None => "",
        }
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}****", self.prefix())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&format_args!("{}", self)).finish()
    }
}
