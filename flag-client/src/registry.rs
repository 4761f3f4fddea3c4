use crate::config::{Account, AccountConfig, Config};
use crate::provider::{
    Credentials, ProviderClient, ProviderFetchError, ProviderInitError, ProviderStatus,
};
use crate::types::VisitorRequest;
use crate::visitor::Visitor;
use shared::env::{Environment, require_env, require_env_with_fallback};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(thiserror::Error, Debug)]
pub enum ProviderError {
    #[error("flag provider init failed: {0}")]
    Init(#[from] ProviderInitError),
    #[error("flag provider fetch failed: {0}")]
    Fetch(#[from] ProviderFetchError),
}

type Slot = RwLock<Option<Arc<ProviderClient>>>;

/// Owns the flag provider clients, one lazily started client per account.
///
/// Initialization is not atomic: two requests that both find a slot empty
/// will each start a client and the last one stored wins. Both clients are
/// equivalent so the duplicate is harmless.
pub struct AccountRegistry {
    config: Config,
    env: Arc<dyn Environment>,
    slots: HashMap<Account, Slot>,
}

impl AccountRegistry {
    pub fn new(config: Config, env: Arc<dyn Environment>) -> Self {
        let slots = config
            .accounts
            .keys()
            .map(|account| (*account, RwLock::new(None)))
            .collect();

        AccountRegistry { config, env, slots }
    }

    /// Maps a request selector onto a configured account. Unknown, empty and
    /// unconfigured selectors fall back to the default account.
    pub fn select_account(&self, selector: Option<&str>) -> Account {
        selector
            .and_then(Account::from_selector)
            .filter(|account| self.config.accounts.contains_key(account))
            .unwrap_or_default()
    }

    pub fn credentials(&self, account: Account) -> Result<Credentials, ProviderInitError> {
        let config = self.account_config(account)?;
        let missing = |source| ProviderInitError::MissingCredentials { account, source };

        let env_id = lookup(
            self.env.as_ref(),
            &config.env_id_var,
            config.fallback_env_id_var.as_deref(),
        )
        .map_err(missing)?;
        let api_key = lookup(
            self.env.as_ref(),
            &config.api_key_var,
            config.fallback_api_key_var.as_deref(),
        )
        .map_err(missing)?;

        Ok(Credentials { env_id, api_key })
    }

    pub fn has_credentials(&self, account: Account) -> bool {
        self.credentials(account).is_ok()
    }

    /// Returns the started client for `account`, starting one if the slot is
    /// empty or holds a client that is no longer initialized.
    pub fn client(&self, account: Account) -> Result<Arc<ProviderClient>, ProviderInitError> {
        let config = self.account_config(account)?;
        if !config.reuse_instance {
            return self.start(account).map(Arc::new);
        }

        let slot = self
            .slots
            .get(&account)
            .ok_or(ProviderInitError::UnconfiguredAccount(account))?;

        {
            let guard = slot.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(client) = guard.as_ref()
                && client.status() == ProviderStatus::Ready
            {
                return Ok(client.clone());
            }
        }

        let client = Arc::new(self.start(account)?);
        *slot.write().unwrap_or_else(PoisonError::into_inner) = Some(client.clone());
        Ok(client)
    }

    /// Creates a visitor on the account's client and fetches its flag
    /// assignments before returning it.
    pub async fn resolve_visitor(
        &self,
        account: Account,
        request: VisitorRequest,
    ) -> Result<Visitor, ProviderError> {
        let client = self.client(account)?;
        let mut visitor = client.new_visitor(request);
        visitor.fetch_flags().await?;
        Ok(visitor)
    }

    fn start(&self, account: Account) -> Result<ProviderClient, ProviderInitError> {
        tracing::debug!(%account, "Starting flag provider client");
        ProviderClient::start(self.credentials(account)?, &self.config.decision_url)
    }

    fn account_config(&self, account: Account) -> Result<&AccountConfig, ProviderInitError> {
        self.config
            .accounts
            .get(&account)
            .ok_or(ProviderInitError::UnconfiguredAccount(account))
    }
}

fn lookup(
    env: &dyn Environment,
    primary: &str,
    fallback: Option<&str>,
) -> Result<String, shared::env::ConfigurationError> {
    match fallback {
        Some(secondary) => require_env_with_fallback(env, primary, secondary),
        None => require_env(env, primary),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::MockDecisionApi;
    use crate::types::ContextValue;
    use axum::http::StatusCode;
    use serde_json::json;
    use shared::env::ConfigurationError;
    use url::Url;

    fn env(pairs: &[(&str, &str)]) -> Arc<dyn Environment> {
        Arc::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<String, String>>(),
        )
    }

    fn registry(decision_url: Url, env: Arc<dyn Environment>) -> AccountRegistry {
        let config = Config {
            decision_url,
            ..Config::default()
        };
        AccountRegistry::new(config, env)
    }

    fn decisions() -> serde_json::Value {
        json!({
            "flagProductRecs": {
                "value": "b7c76816-dcf3-4c0c-9023-a80a3a348151",
                "metadata": {
                    "campaignId": "campaign-1",
                    "campaignName": "Reco strategy test",
                    "campaignType": "ab"
                }
            }
        })
    }

    #[test]
    fn test_select_account() {
        let registry = registry(Url::parse("http://127.0.0.1:1").unwrap(), env(&[]));

        assert_eq!(registry.select_account(Some("account-2")), Account::Second);
        assert_eq!(registry.select_account(Some("account-2")), Account::Second);
        assert_eq!(registry.select_account(Some("account-3")), Account::Third);
        assert_eq!(registry.select_account(Some("account-1")), Account::First);
        assert_eq!(registry.select_account(Some("")), Account::First);
        assert_eq!(registry.select_account(Some("ACCOUNT-2")), Account::First);
        assert_eq!(registry.select_account(None), Account::First);

        let mut config = Config::default();
        config.accounts.remove(&Account::Third);
        let registry = AccountRegistry::new(config, env(&[]));
        assert_eq!(registry.select_account(Some("account-3")), Account::First);
    }

    #[test]
    fn test_credentials() {
        let mut config = Config::default();
        if let Some(second) = config.accounts.get_mut(&Account::Second) {
            second.fallback_api_key_var = Some("FS_API_KEY".into());
        }
        let registry = AccountRegistry::new(
            config,
            env(&[
                ("FS_ENV_ID", "env-1"),
                ("FS_API_KEY", "key-1"),
                ("FS_ENV_ID_2", "env-2"),
            ]),
        );

        assert_eq!(
            registry.credentials(Account::First).unwrap(),
            Credentials {
                env_id: "env-1".into(),
                api_key: "key-1".into()
            }
        );
        assert_eq!(registry.credentials(Account::Second).unwrap().api_key, "key-1");

        match registry.credentials(Account::Third) {
            Err(ProviderInitError::MissingCredentials { account, source }) => {
                assert_eq!(account, Account::Third);
                assert_eq!(source, ConfigurationError::Missing("FS_ENV_ID_3".into()));
            }
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
        assert!(registry.has_credentials(Account::First));
        assert!(!registry.has_credentials(Account::Third));
    }

    #[test]
    fn test_client_is_reused_until_closed() {
        let registry = registry(
            Url::parse("http://127.0.0.1:1").unwrap(),
            env(&[("FS_ENV_ID", "env-1"), ("FS_API_KEY", "key-1")]),
        );

        let first = registry.client(Account::First).unwrap();
        let again = registry.client(Account::First).unwrap();
        assert!(Arc::ptr_eq(&first, &again));

        first.close();
        let restarted = registry.client(Account::First).unwrap();
        assert!(!Arc::ptr_eq(&first, &restarted));
        assert_eq!(restarted.status(), ProviderStatus::Ready);
    }

    #[test]
    fn test_per_request_client() {
        let mut config = Config::default();
        if let Some(first) = config.accounts.get_mut(&Account::First) {
            first.reuse_instance = false;
        }
        let registry = AccountRegistry::new(
            config,
            env(&[("FS_ENV_ID", "env-1"), ("FS_API_KEY", "key-1")]),
        );

        let a = registry.client(Account::First).unwrap();
        let b = registry.client(Account::First).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_resolve_visitor() {
        let api = MockDecisionApi::spawn("key-2", StatusCode::OK, decisions()).await;
        let registry = registry(
            api.url(),
            env(&[("FS_ENV_ID_2", "env-2"), ("FS_API_KEY_2", "key-2")]),
        );

        let mut request = VisitorRequest::new("visitor-1", true);
        request.merge_context([
            ("Session".to_string(), ContextValue::from("Returning")),
            ("vip".to_string(), ContextValue::coerce("true")),
            ("spend".to_string(), ContextValue::coerce("42")),
        ]);

        let account = registry.select_account(Some("account-2"));
        let visitor = registry.resolve_visitor(account, request).await.unwrap();

        let flag = visitor.get_flag("flagProductRecs", Some("07275641"));
        assert_eq!(flag.key, "flagProductRecs");
        assert_eq!(
            flag.value.as_deref(),
            Some("b7c76816-dcf3-4c0c-9023-a80a3a348151")
        );
        assert_eq!(flag.metadata.campaign_name.as_deref(), Some("Reco strategy test"));
        assert_eq!(flag.metadata.campaign_type.as_deref(), Some("ab"));

        let (env_id, body) = api.last_request().unwrap();
        assert_eq!(env_id, "env-2");
        assert_eq!(body["visitor_id"], "visitor-1");
        assert_eq!(body["visitor_consent"], true);
        assert_eq!(body["trigger_hit"], false);
        assert_eq!(
            body["context"],
            json!({"Session": "Returning", "vip": true, "spend": 42})
        );
    }

    #[tokio::test]
    async fn test_resolve_visitor_errors() {
        let api = MockDecisionApi::spawn("key-1", StatusCode::OK, decisions()).await;

        // Missing credentials never reach the network.
        let unconfigured = registry(api.url(), env(&[]));
        let err = unconfigured
            .resolve_visitor(Account::First, VisitorRequest::new("v", true))
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ProviderError::Init(ProviderInitError::MissingCredentials { .. })
        ));
        assert_eq!(api.hits(), 0);

        // Rejected API key.
        let rejected = registry(
            api.url(),
            env(&[("FS_ENV_ID", "env-1"), ("FS_API_KEY", "wrong")]),
        );
        let err = rejected
            .resolve_visitor(Account::First, VisitorRequest::new("v", true))
            .await
            .err()
            .unwrap();
        match err {
            ProviderError::Fetch(ProviderFetchError::UnexpectedStatus { status, body }) => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert!(body.contains("invalid api key"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(api.hits(), 1);
    }

    #[tokio::test]
    async fn test_resolve_visitor_server_error() {
        let api = MockDecisionApi::spawn("key-1", StatusCode::INTERNAL_SERVER_ERROR, json!({}))
            .await;
        let registry = registry(
            api.url(),
            env(&[("FS_ENV_ID", "env-1"), ("FS_API_KEY", "key-1")]),
        );

        let result = registry
            .resolve_visitor(Account::First, VisitorRequest::new("v", true))
            .await;
        assert!(matches!(
            result,
            Err(ProviderError::Fetch(ProviderFetchError::UnexpectedStatus { .. }))
        ));
    }
}
