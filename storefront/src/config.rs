use flag_client::config::{Account, Config as FlagProviderConfig};
use flag_client::types::{ContextValue, VisitorContext};
use recommender::config::Config as RecommenderConfig;
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_FLAG_KEY: &str = "flagProductRecs";
pub const DEFAULT_FLAG_VALUE: &str = "07275641-4a2e-49b2-aa5d-bb4b7b8b2a4c";

const DEFAULT_STRATEGIES: &[&str] = &[
    "9174ac6d-6b74-4234-b412-7d2d0d4acdad",
    "b7c76816-dcf3-4c0c-9023-a80a3a348151",
    "b24cc1cb-bf79-4784-b23b-0a66b3593509",
    "e5570bbc-9f91-48ec-b0ec-5d6ab941e402",
    "875bb146-4a9c-4e26-ab67-02b2ccb87ca1",
    "07275641-4a2e-49b2-aa5d-bb4b7b8b2a4c",
    "2e2c9992-2c5d-466a-bded-71cb2a059730",
];

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Flag key cannot be empty")]
    EmptyFlagKey,

    #[error("Fallback label cannot be empty")]
    EmptyFallbackLabel,

    #[error("Recommendation field list cannot be empty")]
    EmptyFields,

    #[error("Environment variable name for {0} cannot be empty")]
    EmptyVariableName(&'static str),

    #[error("Default account {0} is not configured")]
    MissingDefaultAccount(Account),
}

/// Storefront configuration
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Listener for page requests
    pub listener: Listener,
    /// Listener for health and readiness probes
    pub admin_listener: AdminListener,
    pub page: PageSettings,
    /// Names of the environment variables read on every request
    pub environment: EnvironmentNames,
    pub recommendations: RecommenderConfig,
    pub flag_provider: FlagProviderConfig,
}

impl Config {
    /// Validates the storefront configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.0.validate()?;

        if self.page.flag_key.is_empty() {
            return Err(ValidationError::EmptyFlagKey);
        }
        if self.recommendations.fallback_label.is_empty() {
            return Err(ValidationError::EmptyFallbackLabel);
        }
        if self.recommendations.fields.is_empty() {
            return Err(ValidationError::EmptyFields);
        }

        if self.environment.site_id_var.is_empty() {
            return Err(ValidationError::EmptyVariableName("site id"));
        }
        if self.environment.bearer_var.is_empty() {
            return Err(ValidationError::EmptyVariableName("bearer token"));
        }

        if !self.flag_provider.accounts.contains_key(&Account::default()) {
            return Err(ValidationError::MissingDefaultAccount(Account::default()));
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    /// Validates the listener configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Same shape as [`Listener`] with its own default port.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct AdminListener(pub Listener);

impl Default for AdminListener {
    fn default() -> Self {
        AdminListener(Listener {
            host: "127.0.0.1".into(),
            port: 3001,
        })
    }
}

/// What the page asks for and how it reports it.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct PageSettings {
    pub title: String,
    /// Flag holding the recommendation strategy id
    pub flag_key: String,
    /// Used when the visitor has no assignment for `flag_key`. Without one,
    /// unassigned visitors get the fallback block and no API call is made.
    pub default_flag_value: Option<String>,
    pub has_consented: bool,
    /// Context every visitor starts with, before query parameters are merged
    pub default_context: VisitorContext,
    /// Strategy ids offered in the override form
    pub strategies: Vec<String>,
    pub log_timestamps: bool,
    /// Keep debug-level lines in the page's log trail
    pub verbose_trail: bool,
}

impl Default for PageSettings {
    fn default() -> Self {
        PageSettings {
            title: "Feature Flag Recommendations".into(),
            flag_key: DEFAULT_FLAG_KEY.into(),
            default_flag_value: Some(DEFAULT_FLAG_VALUE.into()),
            has_consented: true,
            default_context: VisitorContext::from([(
                "Session".to_string(),
                ContextValue::Text("Returning".into()),
            )]),
            strategies: DEFAULT_STRATEGIES.iter().map(|s| s.to_string()).collect(),
            log_timestamps: false,
            verbose_trail: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct EnvironmentNames {
    pub site_id_var: String,
    pub bearer_var: String,
}

impl Default for EnvironmentNames {
    fn default() -> Self {
        EnvironmentNames {
            site_id_var: "SITE_ID".into(),
            bearer_var: "RECS_BEARER".into(),
        }
    }
}
