//! Building-registry client: one GET per category per parcel.
//!
//! Every operation answers with the same envelope:
//!
//! ```json
//! {"response": {"header": {"resultCode": "00", "resultMsg": "NORMAL SERVICE."},
//!               "body": {"items": {"item": [ {...}, {...} ]}, "totalCount": 2}}}
//! ```
//!
//! A single row may arrive unwrapped (`"item": {...}`) and an empty result
//! as `"items": ""`; both are normalized to a row list here.

use async_trait::async_trait;
use parcelscope_core::{CategoryId, DecodedIdentifier, PayloadShape};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{RegistryConfig, RegistryError};

const SUCCESS_CODE: &str = "00";

/// Rows returned for one category of one parcel.
#[derive(Debug, Clone, PartialEq)]
pub enum CategoryPayload {
    /// No rows.
    Empty,
    /// First row of a scalar category.
    Scalar(Map<String, Value>),
    /// All rows of a list category; never empty.
    List(Vec<Map<String, Value>>),
}

impl CategoryPayload {
    /// Shape raw rows according to the category's catalog entry.
    pub fn from_rows(category: CategoryId, mut rows: Vec<Map<String, Value>>) -> Self {
        if rows.is_empty() {
            return Self::Empty;
        }
        match category.shape() {
            PayloadShape::Scalar => Self::Scalar(rows.swap_remove(0)),
            PayloadShape::List => Self::List(rows),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Anything that can fetch one registry category for one parcel.
#[async_trait]
pub trait CategorySource: Send + Sync {
    async fn fetch(
        &self,
        id: &DecodedIdentifier,
        category: CategoryId,
    ) -> Result<CategoryPayload, RegistryError>;
}

/// HTTP client for the building-registry hub service.
pub struct BuildingRegistryClient {
    client: reqwest::Client,
    config: RegistryConfig,
}

impl BuildingRegistryClient {
    pub fn new(client: reqwest::Client, mut config: RegistryConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self { client, config }
    }

    fn query(&self, id: &DecodedIdentifier) -> Vec<(&'static str, String)> {
        vec![
            ("serviceKey", self.config.service_key.clone()),
            ("sigunguCd", id.region_code.clone()),
            ("bjdongCd", id.sub_region_code.clone()),
            ("bun", id.lot_numerator.clone()),
            ("ji", id.lot_denominator.clone()),
            ("numOfRows", self.config.page_size.to_string()),
            ("pageNo", self.config.page_no.to_string()),
            ("_type", "json".to_string()),
        ]
    }
}

#[async_trait]
impl CategorySource for BuildingRegistryClient {
    async fn fetch(
        &self,
        id: &DecodedIdentifier,
        category: CategoryId,
    ) -> Result<CategoryPayload, RegistryError> {
        let operation = category
            .info()
            .operation
            .ok_or(RegistryError::NoEndpoint(category))?;
        let url = format!("{}/{}", self.config.base_url, operation);

        debug!(url = %url, category = %category, parcel = %id, "fetching registry category");
        let resp = self.client.get(&url).query(&self.query(id)).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RegistryError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = serde_json::from_str(&resp.text().await?)?;
        let rows = envelope_rows(&body)?;
        debug!(category = %category, rows = rows.len(), "registry category fetched");
        Ok(CategoryPayload::from_rows(category, rows))
    }
}

/// Extract item rows from a registry envelope.
pub fn envelope_rows(body: &Value) -> Result<Vec<Map<String, Value>>, RegistryError> {
    if let Some(code) = body.pointer("/response/header/resultCode").and_then(Value::as_str)
        && code != SUCCESS_CODE
    {
        let message = body
            .pointer("/response/header/resultMsg")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(RegistryError::Upstream {
            code: code.to_string(),
            message: message.to_string(),
        });
    }

    let rows = match body.pointer("/response/body/items/item") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_object().cloned())
            .collect(),
        Some(Value::Object(item)) => vec![item.clone()],
        _ => Vec::new(),
    };
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn decoded() -> DecodedIdentifier {
        parcelscope_core::decode("4113510300104150023").unwrap()
    }

    fn envelope(items: Value) -> Value {
        json!({
            "response": {
                "header": {"resultCode": "00", "resultMsg": "NORMAL SERVICE."},
                "body": {"items": items, "numOfRows": 100, "pageNo": 1, "totalCount": 1}
            }
        })
    }

    fn client_for(server: &MockServer) -> BuildingRegistryClient {
        BuildingRegistryClient::new(
            reqwest::Client::new(),
            RegistryConfig {
                base_url: format!("{}/", server.uri()),
                service_key: "test-key".into(),
                ..Default::default()
            },
        )
    }

    #[test]
    fn unwrapped_item_equals_single_element_array() {
        let row = json!({"flrNoNm": "1F", "area": "35.2"});
        let wrapped = envelope_rows(&envelope(json!({"item": [row.clone()]}))).unwrap();
        let unwrapped = envelope_rows(&envelope(json!({"item": row}))).unwrap();
        assert_eq!(wrapped, unwrapped);
        assert_eq!(wrapped.len(), 1);
    }

    #[test]
    fn empty_items_string_yields_no_rows() {
        assert!(envelope_rows(&envelope(json!(""))).unwrap().is_empty());
        assert!(envelope_rows(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn non_success_code_is_upstream_error() {
        let body = json!({
            "response": {"header": {"resultCode": "30", "resultMsg": "SERVICE KEY IS NOT REGISTERED"}}
        });
        match envelope_rows(&body) {
            Err(RegistryError::Upstream { code, message }) => {
                assert_eq!(code, "30");
                assert!(message.contains("SERVICE KEY"));
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[test]
    fn scalar_payload_keeps_first_row() {
        let rows = vec![
            json!({"bldNm": "A"}).as_object().cloned().unwrap(),
            json!({"bldNm": "B"}).as_object().cloned().unwrap(),
        ];
        match CategoryPayload::from_rows(CategoryId::TitleSection, rows) {
            CategoryPayload::Scalar(row) => assert_eq!(row["bldNm"], "A"),
            other => panic!("expected scalar, got {other:?}"),
        }
        assert!(CategoryPayload::from_rows(CategoryId::FloorOutline, vec![]).is_empty());
    }

    #[tokio::test]
    async fn fetch_sends_decoded_fields_and_paging() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getBrFlrOulnInfo"))
            .and(query_param("serviceKey", "test-key"))
            .and(query_param("sigunguCd", "41135"))
            .and(query_param("bjdongCd", "10300"))
            .and(query_param("bun", "0415"))
            .and(query_param("ji", "0023"))
            .and(query_param("numOfRows", "100"))
            .and(query_param("pageNo", "1"))
            .and(query_param("_type", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
                "item": [{"flrNoNm": "1F", "area": 35.2}, {"flrNoNm": "2F", "area": 30}]
            }))))
            .expect(1)
            .mount(&server)
            .await;

        let payload = client_for(&server)
            .fetch(&decoded(), CategoryId::FloorOutline)
            .await
            .unwrap();
        match payload {
            CategoryPayload::List(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[1]["flrNoNm"], "2F");
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_unwrapped_single_item_as_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getBrJijiguInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
                "item": {"jijiguCdNm": "제2종일반주거지역"}
            }))))
            .mount(&server)
            .await;

        let payload = client_for(&server)
            .fetch(&decoded(), CategoryId::Zoning)
            .await
            .unwrap();
        assert!(matches!(payload, CategoryPayload::List(ref rows) if rows.len() == 1));
    }

    #[tokio::test]
    async fn fetch_maps_http_failure_to_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch(&decoded(), CategoryId::BasicOutline)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Server { status: 503, ref body } if body == "busy"));
    }

    #[tokio::test]
    async fn fetch_rejects_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<OpenAPI_ServiceResponse/>"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .fetch(&decoded(), CategoryId::BasicOutline)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Json(_)));
    }

    #[tokio::test]
    async fn owner_category_has_no_endpoint() {
        let server = MockServer::start().await;
        let err = client_for(&server)
            .fetch(&decoded(), CategoryId::OwnerRecords)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::NoEndpoint(CategoryId::OwnerRecords)));
    }
}
