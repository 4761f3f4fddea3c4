use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

pub const DEFAULT_DECISION_URL: &str = "https://decision.flagship.io/v2";

/// One of the flag-provider credential sets a request can pick with
/// `accountValue`. The set is closed; anything else maps to the default.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub enum Account {
    #[default]
    #[serde(rename = "account-1")]
    First,
    #[serde(rename = "account-2")]
    Second,
    #[serde(rename = "account-3")]
    Third,
}

impl Account {
    pub const ALL: [Account; 3] = [Account::First, Account::Second, Account::Third];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Account::First => "account-1",
            Account::Second => "account-2",
            Account::Third => "account-3",
        }
    }

    pub fn from_selector(selector: &str) -> Option<Self> {
        Account::ALL
            .into_iter()
            .find(|account| account.as_str() == selector.trim())
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of the environment variables holding an account's credentials.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AccountConfig {
    pub env_id_var: String,
    pub api_key_var: String,
    /// Consulted when `env_id_var` is unset or empty.
    #[serde(default)]
    pub fallback_env_id_var: Option<String>,
    /// Consulted when `api_key_var` is unset or empty.
    #[serde(default)]
    pub fallback_api_key_var: Option<String>,
    /// Keep one client per account for the process lifetime. When false a
    /// client is started for every request.
    #[serde(default = "default_reuse_instance")]
    pub reuse_instance: bool,
}

fn default_reuse_instance() -> bool {
    true
}

impl AccountConfig {
    pub fn new<E, A>(env_id_var: E, api_key_var: A) -> Self
    where
        E: Into<String>,
        A: Into<String>,
    {
        AccountConfig {
            env_id_var: env_id_var.into(),
            api_key_var: api_key_var.into(),
            fallback_env_id_var: None,
            fallback_api_key_var: None,
            reuse_instance: true,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the decision API. The environment id and `/flags` are
    /// appended per account.
    pub decision_url: Url,
    pub accounts: BTreeMap<Account, AccountConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            decision_url: Url::parse(DEFAULT_DECISION_URL).expect("default decision URL is valid"),
            accounts: BTreeMap::from([
                (Account::First, AccountConfig::new("FS_ENV_ID", "FS_API_KEY")),
                (
                    Account::Second,
                    AccountConfig::new("FS_ENV_ID_2", "FS_API_KEY_2"),
                ),
                (
                    Account::Third,
                    AccountConfig::new("FS_ENV_ID_3", "FS_API_KEY_3"),
                ),
            ]),
        }
    }
}
