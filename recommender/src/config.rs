use serde::Deserialize;
use serde_json::Value;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://uc-info.eu.abtasty.com";
pub const DEFAULT_FALLBACK_LABEL: &str = "Our Top Picks For You";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Scheme and host of the recommendation API.
    pub base_url: Url,
    /// Sent JSON-encoded as the `variables` query parameter.
    pub variables: Value,
    /// Product fields requested from the API, sent JSON-encoded as `fields`.
    pub fields: Vec<String>,
    /// Block title used whenever the API does not supply one.
    pub fallback_label: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default recommendation URL is valid"),
            variables: serde_json::json!({ "viewing_item": "456" }),
            fields: ["id", "name", "img_link", "price"]
                .into_iter()
                .map(String::from)
                .collect(),
            fallback_label: DEFAULT_FALLBACK_LABEL.into(),
        }
    }
}
