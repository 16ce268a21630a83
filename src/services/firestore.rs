//! Firestore REST 客户端
//!
//! 地址格式：
//! `{base}/v1/projects/{project}/databases/(default)/documents/Users/{localId}/{Collection}[/{docId}]`
//!
//! 每次调用只发一次请求，以调用方的 idToken 作为 Bearer Token，
//! 上游状态码和响应体原样返回给处理器

use actix_web::web::Bytes;
use reqwest::Client;
use url::Url;

use crate::config::FirestoreConfig;
use crate::error::StoreError;
use crate::models::{Document, UserSession};

/// 上游响应
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Clone)]
pub struct FirestoreClient {
    client: Client,
    base_url: String,
    project_id: String,
}

impl FirestoreClient {
    pub fn new(client: Client, config: &FirestoreConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            project_id: config.project_id.clone(),
        }
    }

    /// 拼接用户子集合地址，每段单独做百分号编码
    pub fn user_url(&self, local_id: &str, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|_| StoreError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend([
                "v1",
                "projects",
                self.project_id.as_str(),
                "databases",
                "(default)",
                "documents",
                "Users",
                local_id,
            ])
            .extend(segments);
        Ok(url)
    }

    async fn relay(request: reqwest::RequestBuilder) -> Result<UpstreamResponse, StoreError> {
        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        Ok(UpstreamResponse { status, body })
    }

    /// 读取整个集合
    pub async fn list(&self, session: &UserSession, collection: &str) -> Result<UpstreamResponse, StoreError> {
        let url = self.user_url(&session.local_id, &[collection])?;
        log::debug!("GET {}", url);
        Self::relay(self.client.get(url).bearer_auth(&session.id_token)).await
    }

    /// 读取单个文档
    pub async fn get(
        &self,
        session: &UserSession,
        collection: &str,
        doc_id: &str,
    ) -> Result<UpstreamResponse, StoreError> {
        let url = self.user_url(&session.local_id, &[collection, doc_id])?;
        log::debug!("GET {}", url);
        Self::relay(self.client.get(url).bearer_auth(&session.id_token)).await
    }

    /// 读取并解析单个文档
    ///
    /// 只有 404 表示文档不存在；其他非 200 状态和无法解析的响应体都是错误
    pub async fn fetch_document(
        &self,
        session: &UserSession,
        collection: &str,
        doc_id: &str,
    ) -> Result<Option<Document>, StoreError> {
        let response = self.get(session, collection, doc_id).await?;
        match response.status {
            200 => Ok(Some(serde_json::from_slice::<Document>(&response.body)?)),
            404 => Ok(None),
            status => Err(StoreError::ReadStatus(status)),
        }
    }

    /// 写入文档（不存在则创建，存在则覆盖）
    pub async fn patch(
        &self,
        session: &UserSession,
        collection: &str,
        doc_id: &str,
        document: &Document,
    ) -> Result<UpstreamResponse, StoreError> {
        let url = self.user_url(&session.local_id, &[collection, doc_id])?;
        log::debug!("PATCH {}", url);
        Self::relay(
            self.client
                .patch(url)
                .bearer_auth(&session.id_token)
                .json(document),
        )
        .await
    }

    /// 删除文档
    pub async fn delete(
        &self,
        session: &UserSession,
        collection: &str,
        doc_id: &str,
    ) -> Result<UpstreamResponse, StoreError> {
        let url = self.user_url(&session.local_id, &[collection, doc_id])?;
        log::debug!("DELETE {}", url);
        Self::relay(self.client.delete(url).bearer_auth(&session.id_token)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldValue, Fields};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> FirestoreClient {
        FirestoreClient::new(
            Client::new(),
            &FirestoreConfig {
                base_url: base_url.to_string(),
                project_id: "cashclimb-test".to_string(),
            },
        )
    }

    #[test]
    fn test_user_url_layout() {
        let c = client("https://firestore.googleapis.com/");
        let url = c.user_url("u1", &["Expenses", "doc 1"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://firestore.googleapis.com/v1/projects/cashclimb-test/databases/(default)/documents/Users/u1/Expenses/doc%201"
        );
    }

    #[test]
    fn test_user_url_encodes_slashes_in_ids() {
        let c = client("https://firestore.googleapis.com");
        let url = c.user_url("u1", &["SavedTips", "a/b"]).unwrap();
        assert!(url.as_str().ends_with("/Users/u1/SavedTips/a%2Fb"));
    }

    #[actix_web::test]
    async fn test_patch_sends_bearer_and_document() {
        let server = MockServer::start().await;
        let mut fields = Fields::new();
        fields.insert("result".into(), FieldValue::string("ok"));
        let doc = Document::new(fields);

        Mock::given(method("PATCH"))
            .and(path("/v1/projects/cashclimb-test/databases/(default)/documents/Users/u1/TaxHistory/latest"))
            .and(header("authorization", "Bearer tok"))
            .and(body_json(serde_json::json!({"fields": {"result": {"stringValue": "ok"}}})))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let session = UserSession::new("tok", "u1");
        let resp = client(&server.uri())
            .patch(&session, "TaxHistory", "latest", &doc)
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
    }

    #[actix_web::test]
    async fn test_fetch_document_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let session = UserSession::new("tok", "u1");
        let doc = client(&server.uri())
            .fetch_document(&session, "Expenses", "nope")
            .await
            .unwrap();
        assert!(doc.is_none());
    }

    #[actix_web::test]
    async fn test_fetch_document_other_failures_are_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/cashclimb-test/databases/(default)/documents/Users/u1/Summaries/busy"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/projects/cashclimb-test/databases/(default)/documents/Users/u1/Summaries/garbled"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let session = UserSession::new("tok", "u1");
        let c = client(&server.uri());
        assert!(matches!(
            c.fetch_document(&session, "Summaries", "busy").await,
            Err(StoreError::ReadStatus(503))
        ));
        assert!(matches!(
            c.fetch_document(&session, "Summaries", "garbled").await,
            Err(StoreError::Decode(_))
        ));
    }

    #[actix_web::test]
    async fn test_fetch_document_reads_reference_and_geo_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "projects/p/databases/(default)/documents/Users/u1/Summaries/s",
                "fields": {
                    "owner": {"referenceValue": "projects/p/databases/(default)/documents/Users/u1"},
                    "where": {"geoPointValue": {"latitude": 1.5, "longitude": -2.0}},
                    "blob": {"bytesValue": "AAE="},
                    "totalExpense": {"doubleValue": 3.0}
                }
            })))
            .mount(&server)
            .await;

        let session = UserSession::new("tok", "u1");
        let doc = client(&server.uri())
            .fetch_document(&session, "Summaries", "s")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.get_f64("totalExpense"), Some(3.0));
        assert!(matches!(doc.get("where"), Some(FieldValue::GeoPointValue(_))));
    }
}
