//! Owner enrichment through the authenticated scraping backend.

use std::sync::Arc;

use async_trait::async_trait;
use parcelscope_core::{Credential, NormalizedRecord, OwnerRecord};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::RegistryError;

/// Anything that can look up the owners of a parcel by address.
#[async_trait]
pub trait OwnerSource: Send + Sync {
    async fn owners(
        &self,
        credential: &Credential,
        address: &str,
    ) -> Result<Vec<OwnerRecord>, RegistryError>;
}

#[derive(Serialize)]
struct OwnerRequest<'a> {
    id: &'a str,
    pw: &'a str,
    address: &'a str,
}

#[derive(Deserialize)]
struct OwnerEnvelope {
    success: bool,
    #[serde(default)]
    data: Vec<OwnerRecord>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the owner backend: one POST per parcel.
pub struct OwnerClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OwnerClient {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl OwnerSource for OwnerClient {
    async fn owners(
        &self,
        credential: &Credential,
        address: &str,
    ) -> Result<Vec<OwnerRecord>, RegistryError> {
        if !credential.is_complete() {
            return Err(RegistryError::MissingCredential);
        }

        let body = OwnerRequest {
            id: &credential.id,
            pw: &credential.pw,
            address,
        };
        let resp = self.client.post(&self.endpoint).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RegistryError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: OwnerEnvelope = serde_json::from_str(&resp.text().await?)?;
        if !envelope.success {
            return Err(RegistryError::OwnerRejected(
                envelope.message.unwrap_or_else(|| "unknown error".into()),
            ));
        }
        Ok(envelope.data)
    }
}

/// Merges owner lists into normalized records, containing every failure.
#[derive(Clone)]
pub struct OwnerEnricher {
    source: Arc<dyn OwnerSource>,
}

impl OwnerEnricher {
    pub fn new(source: Arc<dyn OwnerSource>) -> Self {
        Self { source }
    }

    /// Look up owners for `address` and store them under `ownerInfo`.
    ///
    /// Any successful answer is merged, an empty list included. Returns
    /// whether a merge happened; failures are logged and leave the record
    /// untouched.
    pub async fn enrich(
        &self,
        record: &mut NormalizedRecord,
        address: &str,
        credential: &Credential,
    ) -> bool {
        match self.source.owners(credential, address).await {
            Ok(owners) => {
                info!(address, count = owners.len(), "owners merged");
                record.set_owners(&owners);
                true
            }
            Err(e) => {
                warn!(address, error = %e, "owner enrichment failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parcelscope_core::CategoryId;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ADDRESS: &str = "경기도 성남시 분당구 정자동 415-23";

    fn credential() -> Credential {
        Credential::new("operator", "pw")
    }

    async fn client_for(server: &MockServer) -> Arc<OwnerClient> {
        Arc::new(OwnerClient::new(
            reqwest::Client::new(),
            format!("{}/api/owners", server.uri()),
        ))
    }

    #[tokio::test]
    async fn posts_credential_and_address() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/owners"))
            .and(body_json(json!({"id": "operator", "pw": "pw", "address": ADDRESS})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [
                    {"name": "Kim", "id": "800101-1******", "address": "Seoul", "share": "1/2", "date": "2019-03-04", "reason": "sale"},
                    {"name": "Park", "id": "820202-2******", "address": "Seoul", "share": "1/2", "date": "2019-03-04", "reason": "sale"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let owners = client_for(&server)
            .await
            .owners(&credential(), ADDRESS)
            .await
            .unwrap();
        assert_eq!(owners.len(), 2);
        assert_eq!(owners[1].name, "Park");
    }

    #[tokio::test]
    async fn failure_envelope_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": false,
                "message": "login failed"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .owners(&credential(), ADDRESS)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::OwnerRejected(ref m) if m == "login failed"));
    }

    #[tokio::test]
    async fn empty_credential_fails_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .owners(&Credential::new("", ""), ADDRESS)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingCredential));
    }

    #[tokio::test]
    async fn enrich_merges_owner_info() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": [{"name": "Kim", "share": "1/1"}]
            })))
            .mount(&server)
            .await;

        let enricher = OwnerEnricher::new(client_for(&server).await);
        let mut record = NormalizedRecord::new();
        record.insert("bldNm", json!("Tower"));
        assert!(enricher.enrich(&mut record, ADDRESS, &credential()).await);
        assert_eq!(record.owners()[0].name, "Kim");
        assert_eq!(record.text("bldNm").as_deref(), Some("Tower"));
    }

    #[tokio::test]
    async fn enrich_failure_preserves_record() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let enricher = OwnerEnricher::new(client_for(&server).await);
        let mut record = NormalizedRecord::new();
        record.insert("bldNm", json!("Tower"));
        let before = record.clone();
        assert!(!enricher.enrich(&mut record, ADDRESS, &credential()).await);
        assert_eq!(record, before);
    }

    #[tokio::test]
    async fn enrich_with_empty_owner_list_stores_empty_owner_info() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
            .mount(&server)
            .await;

        let enricher = OwnerEnricher::new(client_for(&server).await);
        let mut record = NormalizedRecord::new();
        assert!(enricher.enrich(&mut record, ADDRESS, &credential()).await);
        assert_eq!(record.get(CategoryId::OWNER_KEY), Some(&json!([])));
        assert!(record.owners().is_empty());
        assert!(!record.is_empty());
    }
}
