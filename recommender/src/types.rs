use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Price as sent by the API: either a bare amount or a preformatted label.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Amount(f64),
    Label(String),
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Price::Amount(amount) => write!(f, "{amount}"),
            Price::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub name: String,
    #[serde(
        default,
        rename(serialize = "image_url", deserialize = "img_link"),
        deserialize_with = "string_or_null"
    )]
    pub image_url: String,
    #[serde(default)]
    pub price: Option<Price>,
}

// Product ids arrive as strings or numbers depending on the catalog.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
        Missing,
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
        RawId::Missing => String::new(),
    })
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body of a successful recommendation API response.
#[derive(Debug, Deserialize)]
pub(crate) struct RecommendationResponse {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<Product>>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecommendationResult {
    pub block_name: String,
    pub products: Vec<Product>,
}

impl RecommendationResult {
    pub fn fallback(label: &str) -> Self {
        RecommendationResult {
            block_name: label.to_string(),
            products: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_from_api_item() {
        let product: Product = serde_json::from_value(json!({
            "id": "1",
            "name": "Shoe",
            "img_link": "x.png",
            "price": 49.99,
            "revenues_last_30_days": 1200
        }))
        .unwrap();

        assert_eq!(
            product,
            Product {
                id: "1".into(),
                name: "Shoe".into(),
                image_url: "x.png".into(),
                price: Some(Price::Amount(49.99)),
            }
        );
    }

    #[test]
    fn test_product_defaults() {
        let product: Product =
            serde_json::from_value(json!({"id": 1234, "price": "19,90 â‚¬"})).unwrap();
        assert_eq!(product.id, "1234");
        assert_eq!(product.name, "");
        assert_eq!(product.image_url, "");
        assert_eq!(product.price, Some(Price::Label("19,90 â‚¬".into())));

        let product: Product = serde_json::from_value(
            json!({"id": null, "name": null, "img_link": null, "price": null}),
        )
        .unwrap();
        assert_eq!(product.id, "");
        assert_eq!(product.name, "");
        assert_eq!(product.image_url, "");
        assert_eq!(product.price, None);
    }

    #[test]
    fn test_product_serializes_image_url() {
        let product = Product {
            id: "1".into(),
            name: "Shoe".into(),
            image_url: "x.png".into(),
            price: Some(Price::Amount(49.99)),
        };
        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["image_url"], "x.png");
        assert_eq!(json["price"], 49.99);
    }
}
