//! Loading client settings from TOML files and the environment.

use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use derive_getters::Getters;
use octoguard_client::{ApiClient, ClientConfig};
use octoguard_error::{ClientError, ClientErrorKind, ClientResult, ConfigError};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, instrument};

/// Environment variable prefix. `OCTOGUARD_TOKEN` sets the token,
/// `OCTOGUARD_CLIENT__RETRY_ATTEMPTS` sets `client.retry_attempts`.
pub const ENV_PREFIX: &str = "OCTOGUARD";

/// Everything needed to build an [`ApiClient`].
///
/// # Example
///
/// ```toml
/// token = "ghp_..."
///
/// [client]
/// retry_attempts = 5
///
/// [client.cache]
/// ttl_secs = 120
/// ```
#[derive(Clone, Default, Deserialize, Getters)]
#[serde(deny_unknown_fields)]
pub struct OctoguardSettings {
    /// API token; usually supplied through `OCTOGUARD_TOKEN`
    #[serde(default)]
    token: Option<String>,

    /// Client configuration
    #[serde(default)]
    client: ClientConfig,
}

impl fmt::Debug for OctoguardSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OctoguardSettings")
            .field("token", &self.token.as_ref().map(|_| "****"))
            .field("client", &self.client)
            .finish()
    }
}

impl OctoguardSettings {
    /// Load from one TOML file, with `OCTOGUARD_*` environment overrides.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_file_with_env(path, None)
    }

    /// Like [`from_file`](Self::from_file), reading overrides from `env`
    /// instead of the process environment when given.
    pub fn from_file_with_env(
        path: impl AsRef<Path>,
        env: Option<HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::new(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        let builder = Config::builder().add_source(File::from(path));
        finish(builder, env)
    }

    /// Load with precedence, later overriding earlier:
    ///
    /// 1. Built-in defaults
    /// 2. `~/.config/octoguard/octoguard.toml`
    /// 3. `./octoguard.toml`
    /// 4. `OCTOGUARD_*` environment variables, including a `.env` file
    ///
    /// Missing files are skipped.
    #[instrument]
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let mut builder = Config::builder();
        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".config/octoguard/octoguard.toml");
            builder = builder.add_source(File::from(home_config).required(false));
        }
        builder = builder.add_source(File::with_name("octoguard").required(false));
        finish(builder, None)
    }

    /// Build a client from these settings.
    #[track_caller]
    pub fn build_client(&self) -> ClientResult<ApiClient> {
        let token = self.token.clone().ok_or_else(|| {
            ClientError::new(ClientErrorKind::InvalidCredential(format!(
                "no token configured, set {}_TOKEN",
                ENV_PREFIX
            )))
        })?;
        ApiClient::new(self.client.clone(), token)
    }
}

/// Load a client configuration file.
///
/// Shorthand for [`OctoguardSettings::from_file`].
pub fn load_client_config(path: impl AsRef<Path>) -> Result<OctoguardSettings, ConfigError> {
    OctoguardSettings::from_file(path)
}

fn finish(
    builder: ConfigBuilder<DefaultState>,
    env: Option<HashMap<String, String>>,
) -> Result<OctoguardSettings, ConfigError> {
    let environment = Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .source(env);

    let settings: OctoguardSettings = builder
        .add_source(environment)
        .build()
        .map_err(|e| ConfigError::new(format!("Failed to build configuration: {}", e)))?
        .try_deserialize()
        .map_err(|e| ConfigError::new(format!("Failed to parse configuration: {}", e)))?;

    settings.client.validate()?;
    debug!(
        base_url = %settings.client.base_url(),
        token_present = settings.token.is_some(),
        "Loaded configuration"
    );
    Ok(settings)
}
