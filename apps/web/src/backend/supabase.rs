//! REST client for the hosted BaaS: PostgREST tables, GoTrue auth and
//! object storage.
//!
//! Reads retry on 429 and 5xx with exponential backoff. Writes are sent
//! exactly once; a failed write surfaces to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{
    AuthSession, AuthUser, Backend, BackendError, Certification, CertificationFile, Company,
    LegalDocumentRecord, Market, Profile, ProfileMatch, ProfileUpdate, RowId, SignUp,
    SignUpResult, Upload, UserCertification, UserMarket,
};

const MAX_RETRIES: u32 = 3;
const RETRY_BASE_MS: u64 = 500;
const REQUEST_TIMEOUT_SECS: u64 = 30;
const UPLOAD_CACHE_CONTROL: &str = "max-age=3600";

/// A storage bucket as reported by the storage API.
#[derive(Debug, Clone, Deserialize)]
pub struct Bucket {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub public: bool,
}

/// Bucket creation parameters.
#[derive(Debug, Clone, Serialize)]
pub struct BucketSpec {
    pub id: &'static str,
    pub name: &'static str,
    pub public: bool,
    pub file_size_limit: u64,
    pub allowed_mime_types: &'static [&'static str],
}

#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: Option<String>,
}

impl SupabaseClient {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        service_role_key: Option<String>,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            service_role_key,
        })
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn storage_url(&self, path: &str) -> String {
        format!("{}/storage/v1/{path}", self.base_url)
    }

    /// Request carrying the anon key, authorized as `token` when present.
    fn request(&self, method: Method, url: &str, token: Option<&str>) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token.unwrap_or(&self.anon_key))
    }

    fn admin_request(&self, method: Method, url: &str) -> Result<RequestBuilder, BackendError> {
        let key = self
            .service_role_key
            .as_deref()
            .ok_or(BackendError::MissingServiceKey)?;
        Ok(self
            .client
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(key))
    }

    /// GET with retry on 429 and 5xx.
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, BackendError> {
        let mut last_error: Option<BackendError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = Duration::from_millis(RETRY_BASE_MS * (1 << (attempt - 1)));
                warn!(
                    "GET {url} attempt {attempt} failed, retrying after {}ms...",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self.request(Method::GET, url, None).query(query).send().await {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(BackendError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("GET {url} returned {status}: {body}");
                last_error = Some(api_error(status, &body));
                continue;
            }

            let response = ensure_success(response).await?;
            return Ok(response.json().await?);
        }

        Err(last_error.unwrap_or(BackendError::RetriesExhausted {
            retries: MAX_RETRIES,
        }))
    }

    async fn send_json<B: Serialize + ?Sized>(
        &self,
        request: RequestBuilder,
        body: &B,
    ) -> Result<Response, BackendError> {
        ensure_success(request.json(body).send().await?).await
    }

    async fn first_row<T: DeserializeOwned>(
        response: Response,
        table: &str,
    ) -> Result<T, BackendError> {
        let mut rows: Vec<T> = response.json().await?;
        if rows.is_empty() {
            return Err(BackendError::NoRow(table.to_string()));
        }
        Ok(rows.swap_remove(0))
    }

    async fn profiles_where(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Vec<ProfileMatch>, BackendError> {
        self.get_json(
            &self.rest_url("profiles"),
            &[
                ("select", "email,phone,created_at".to_string()),
                (column, format!("eq.{value}")),
            ],
        )
        .await
    }

    /// Buckets visible to the service role.
    pub async fn list_buckets(&self) -> Result<Vec<Bucket>, BackendError> {
        let request = self.admin_request(Method::GET, &self.storage_url("bucket"))?;
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json().await?)
    }

    pub async fn create_bucket(&self, spec: &BucketSpec) -> Result<(), BackendError> {
        let request = self.admin_request(Method::POST, &self.storage_url("bucket"))?;
        self.send_json(request, spec).await?;
        Ok(())
    }
}

#[async_trait]
impl Backend for SupabaseClient {
    async fn markets(&self) -> Result<Vec<Market>, BackendError> {
        self.get_json(
            &self.rest_url("markets"),
            &[("select", "id,name".into()), ("order", "name".into())],
        )
        .await
    }

    async fn companies(&self) -> Result<Vec<Company>, BackendError> {
        self.get_json(
            &self.rest_url("companies"),
            &[("select", "id,name".into()), ("order", "name".into())],
        )
        .await
    }

    async fn active_certifications(&self) -> Result<Vec<Certification>, BackendError> {
        self.get_json(
            &self.rest_url("certifications"),
            &[
                ("select", "id,name".into()),
                ("is_active", "eq.true".into()),
                ("order", "id".into()),
            ],
        )
        .await
    }

    async fn profiles_with_email(&self, email: &str) -> Result<Vec<ProfileMatch>, BackendError> {
        self.profiles_where("email", email).await
    }

    async fn profiles_with_phone(&self, phone: &str) -> Result<Vec<ProfileMatch>, BackendError> {
        self.profiles_where("phone", phone).await
    }

    async fn sign_up(&self, request: &SignUp) -> Result<SignUpResult, BackendError> {
        let body = sign_up_body(request);
        let http = self
            .request(Method::POST, &self.auth_url("signup"), None)
            .query(&[("redirect_to", request.redirect_to.as_str())]);
        let response = self.send_json(http, &body).await?;
        let value: Value = response.json().await?;
        parse_sign_up(value)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError> {
        let http = self
            .request(Method::POST, &self.auth_url("token"), None)
            .query(&[("grant_type", "password")]);
        let response = self
            .send_json(http, &json!({ "email": email, "password": password }))
            .await?;
        Ok(response.json().await?)
    }

    async fn create_company(
        &self,
        token: Option<&str>,
        name: &str,
        email: &str,
    ) -> Result<Company, BackendError> {
        let http = self
            .request(Method::POST, &self.rest_url("companies"), token)
            .header("Prefer", "return=representation");
        let response = self
            .send_json(http, &json!([{ "name": name, "email": email }]))
            .await?;
        Self::first_row(response, "companies").await
    }

    async fn update_profile(
        &self,
        token: Option<&str>,
        auth_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Profile, BackendError> {
        let http = self
            .request(Method::PATCH, &self.rest_url("profiles"), token)
            .query(&[("auth_id", format!("eq.{auth_id}"))])
            .header("Prefer", "return=representation");
        let response = self.send_json(http, update).await?;
        Self::first_row(response, "profiles").await
    }

    async fn assign_markets(
        &self,
        token: Option<&str>,
        rows: &[UserMarket],
    ) -> Result<(), BackendError> {
        let http = self
            .request(Method::POST, &self.rest_url("user_markets"), token)
            .header("Prefer", "return=minimal");
        self.send_json(http, rows).await?;
        Ok(())
    }

    async fn assign_certifications(
        &self,
        token: Option<&str>,
        rows: &[UserCertification],
    ) -> Result<(), BackendError> {
        let http = self
            .request(Method::POST, &self.rest_url("user_certifications"), token)
            .header("Prefer", "return=minimal");
        self.send_json(http, rows).await?;
        Ok(())
    }

    async fn attach_certification_file(
        &self,
        token: Option<&str>,
        user_id: &RowId,
        certification_id: i64,
        file: &CertificationFile,
    ) -> Result<(), BackendError> {
        let http = self
            .request(Method::PATCH, &self.rest_url("user_certifications"), token)
            .query(&[
                ("user_id", format!("eq.{user_id}")),
                ("certification_id", format!("eq.{certification_id}")),
            ])
            .header("Prefer", "return=minimal");
        self.send_json(http, file).await?;
        Ok(())
    }

    async fn upsert_legal_document(
        &self,
        token: Option<&str>,
        table: &str,
        record: &LegalDocumentRecord,
    ) -> Result<(), BackendError> {
        let http = self
            .request(Method::POST, &self.rest_url(table), token)
            .query(&[("on_conflict", "user_id,document_type")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal");
        self.send_json(http, record).await?;
        Ok(())
    }

    async fn upload(&self, token: Option<&str>, upload: Upload) -> Result<String, BackendError> {
        let url = self.storage_url(&object_path(upload.bucket, &upload.path));
        let size = upload.bytes.len();
        let response = self
            .request(Method::POST, &url, token)
            .header("content-type", upload.content_type)
            .header("cache-control", UPLOAD_CACHE_CONTROL)
            .header("x-upsert", "false")
            .body(upload.bytes)
            .send()
            .await?;
        ensure_success(response).await?;
        debug!("Uploaded {size} bytes to {}/{}", upload.bucket, upload.path);
        Ok(upload.path)
    }
}

fn object_path(bucket: &str, path: &str) -> String {
    format!("object/{bucket}/{}", path.trim_start_matches('/'))
}

fn sign_up_body(request: &SignUp) -> Value {
    let mut body = json!({
        "email": request.email,
        "password": request.password,
        "data": {
            "confirm": false,
            "full_name": request.full_name,
            "phone": request.phone.clone().unwrap_or_default(),
        }
    });
    if let Some(phone) = &request.phone {
        body["phone"] = json!(phone);
    }
    body
}

/// Accepts both sign-up response shapes: a session wrapping the user, or
/// the bare user when email confirmation is pending.
fn parse_sign_up(value: Value) -> Result<SignUpResult, BackendError> {
    if value.get("access_token").is_some() {
        let session: AuthSession = serde_json::from_value(value)?;
        return Ok(SignUpResult {
            user: Some(session.user.clone()),
            session: Some(session),
        });
    }
    if let Some(user) = value.get("user").filter(|u| !u.is_null()) {
        let user: AuthUser = serde_json::from_value(user.clone())?;
        return Ok(SignUpResult {
            user: Some(user),
            session: None,
        });
    }
    if value.get("id").is_some() {
        let user: AuthUser = serde_json::from_value(value)?;
        return Ok(SignUpResult {
            user: Some(user),
            session: None,
        });
    }
    Ok(SignUpResult::default())
}

async fn ensure_success(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(api_error(status, &body))
}

fn api_error(status: StatusCode, body: &str) -> BackendError {
    BackendError::Api {
        status: status.as_u16(),
        message: error_message(status, body),
    }
}

/// PostgREST reports `message`, GoTrue `msg` or `error_description`.
fn error_message(status: StatusCode, body: &str) -> String {
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["message", "msg", "error_description", "error"]
            .iter()
            .find_map(|field| v.get(field).and_then(|m| m.as_str()).map(String::from))
    });
    match from_json {
        Some(message) => message,
        None if !body.trim().is_empty() => body.trim().to_string(),
        None => format!("HTTP {}", status.as_u16()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_ID: &str = "5f1c7a52-6a0e-4f56-9a4c-0e4d2a9f3b11";

    #[test]
    fn test_error_message_from_postgrest() {
        let body = r#"{"code":"23505","details":null,"hint":null,"message":"duplicate key value violates unique constraint \"profiles_email_key\""}"#;
        assert_eq!(
            error_message(StatusCode::CONFLICT, body),
            "duplicate key value violates unique constraint \"profiles_email_key\""
        );
    }

    #[test]
    fn test_error_message_from_gotrue() {
        let body = r#"{"code":422,"error_code":"user_already_exists","msg":"User already registered"}"#;
        assert_eq!(
            error_message(StatusCode::UNPROCESSABLE_ENTITY, body),
            "User already registered"
        );
        let body = r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#;
        assert_eq!(
            error_message(StatusCode::BAD_REQUEST, body),
            "Invalid login credentials"
        );
    }

    #[test]
    fn test_error_message_falls_back_to_body_or_status() {
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, "upstream down"), "upstream down");
        assert_eq!(error_message(StatusCode::BAD_GATEWAY, ""), "HTTP 502");
    }

    #[test]
    fn test_parse_sign_up_with_session() {
        let value = json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "user": { "id": USER_ID, "email": "ana@example.com" }
        });
        let result = parse_sign_up(value).unwrap();
        assert_eq!(result.session.map(|s| s.access_token), Some("jwt".to_string()));
        assert_eq!(result.user.unwrap().id.to_string(), USER_ID);
    }

    #[test]
    fn test_parse_sign_up_with_bare_user() {
        let value = json!({ "id": USER_ID, "email": "ana@example.com", "confirmation_sent_at": "2025-01-01T00:00:00Z" });
        let result = parse_sign_up(value).unwrap();
        assert!(result.session.is_none());
        assert_eq!(result.user.unwrap().email.as_deref(), Some("ana@example.com"));
    }

    #[test]
    fn test_parse_sign_up_without_user() {
        let result = parse_sign_up(json!({ "user": null, "session": null })).unwrap();
        assert!(result.user.is_none());
        assert!(result.session.is_none());
    }

    #[test]
    fn test_sign_up_body_only_sets_top_level_phone_when_present() {
        let mut request = SignUp {
            email: "ana@example.com".into(),
            password: "secret1".into(),
            phone: None,
            full_name: "Ana".into(),
            redirect_to: "http://localhost:8080/auth".into(),
        };
        let body = sign_up_body(&request);
        assert!(body.get("phone").is_none());
        assert_eq!(body["data"]["phone"], "");
        assert_eq!(body["data"]["confirm"], false);

        request.phone = Some("+573001112233".into());
        let body = sign_up_body(&request);
        assert_eq!(body["phone"], "+573001112233");
        assert_eq!(body["data"]["full_name"], "Ana");
    }

    #[test]
    fn test_object_path() {
        assert_eq!(
            object_path("certifications", "12/3_1700000000000.pdf"),
            "object/certifications/12/3_1700000000000.pdf"
        );
        assert_eq!(object_path("b", "/x.pdf"), "object/b/x.pdf");
    }

    #[test]
    fn test_admin_calls_need_service_key() {
        let client = SupabaseClient::new("https://x.supabase.co/", "anon", None).unwrap();
        assert_eq!(client.rest_url("markets"), "https://x.supabase.co/rest/v1/markets");
        assert!(matches!(
            client.admin_request(Method::GET, "https://x.supabase.co/storage/v1/bucket"),
            Err(BackendError::MissingServiceKey)
        ));
    }

    mod http {
        use std::time::Instant;

        use bytes::Bytes;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        use super::*;

        fn client(server: &MockServer) -> SupabaseClient {
            SupabaseClient::new(server.uri(), "anon", Some("service".into())).unwrap()
        }

        async fn requests(server: &MockServer) -> Vec<wiremock::Request> {
            server.received_requests().await.unwrap()
        }

        fn header(request: &wiremock::Request, name: &str) -> Option<String> {
            request
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        }

        fn query(request: &wiremock::Request, key: &str) -> Option<String> {
            request
                .url
                .query_pairs()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.into_owned())
        }

        #[tokio::test]
        async fn test_reads_retry_with_backoff_until_success() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/rest/v1/markets"))
                .respond_with(ResponseTemplate::new(503))
                .up_to_n_times(2)
                .with_priority(1)
                .mount(&server)
                .await;
            Mock::given(method("GET"))
                .and(path("/rest/v1/markets"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(json!([{ "id": 1, "name": "China" }])),
                )
                .mount(&server)
                .await;

            let started = Instant::now();
            let markets = client(&server).markets().await.unwrap();
            assert_eq!(markets, vec![Market { id: 1, name: "China".into() }]);
            // 500ms, then 1000ms
            assert!(started.elapsed() >= Duration::from_millis(1500));

            let received = requests(&server).await;
            assert_eq!(received.len(), 3);
            let first = &received[0];
            assert_eq!(header(first, "apikey").as_deref(), Some("anon"));
            assert_eq!(header(first, "authorization").as_deref(), Some("Bearer anon"));
            assert_eq!(query(first, "select").as_deref(), Some("id,name"));
            assert_eq!(query(first, "order").as_deref(), Some("name"));
        }

        #[tokio::test]
        async fn test_reads_give_up_after_max_retries() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/rest/v1/certifications"))
                .respond_with(
                    ResponseTemplate::new(429).set_body_json(json!({ "message": "slow down" })),
                )
                .mount(&server)
                .await;

            let err = client(&server).active_certifications().await.unwrap_err();
            assert!(matches!(
                err,
                BackendError::Api { status: 429, ref message } if message == "slow down"
            ));
            let received = requests(&server).await;
            assert_eq!(received.len(), MAX_RETRIES as usize);
            assert_eq!(query(&received[0], "is_active").as_deref(), Some("eq.true"));
        }

        #[tokio::test]
        async fn test_client_errors_are_not_retried() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/rest/v1/profiles"))
                .respond_with(ResponseTemplate::new(401))
                .mount(&server)
                .await;

            let err = client(&server)
                .profiles_with_email("ana@example.com")
                .await
                .unwrap_err();
            assert!(matches!(err, BackendError::Api { status: 401, .. }));

            let received = requests(&server).await;
            assert_eq!(received.len(), 1);
            assert_eq!(query(&received[0], "email").as_deref(), Some("eq.ana@example.com"));
            assert_eq!(
                query(&received[0], "select").as_deref(),
                Some("email,phone,created_at")
            );
        }

        #[tokio::test]
        async fn test_writes_are_sent_once() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/rest/v1/user_markets"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let rows = [UserMarket {
                user_id: RowId::Int(77),
                market_id: 1,
            }];
            let err = client(&server)
                .assign_markets(Some("user-jwt"), &rows)
                .await
                .unwrap_err();
            assert!(matches!(err, BackendError::Api { status: 500, .. }));

            let received = requests(&server).await;
            assert_eq!(received.len(), 1);
            let request = &received[0];
            assert_eq!(header(request, "apikey").as_deref(), Some("anon"));
            assert_eq!(header(request, "authorization").as_deref(), Some("Bearer user-jwt"));
            assert_eq!(header(request, "prefer").as_deref(), Some("return=minimal"));
            let body: Value = request.body_json().unwrap();
            assert_eq!(body, json!([{ "user_id": 77, "market_id": 1 }]));
        }

        #[tokio::test]
        async fn test_sign_up_passes_redirect_and_metadata() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/auth/v1/signup"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!({ "id": USER_ID, "email": "ana@example.com" })),
                )
                .mount(&server)
                .await;

            let request = SignUp {
                email: "ana@example.com".into(),
                password: "secret1".into(),
                phone: None,
                full_name: "Ana Pérez".into(),
                redirect_to: "http://localhost:8080/auth".into(),
            };
            let result = client(&server).sign_up(&request).await.unwrap();
            assert!(result.session.is_none());
            assert_eq!(result.user.map(|u| u.id.to_string()).as_deref(), Some(USER_ID));

            let received = requests(&server).await;
            assert_eq!(
                query(&received[0], "redirect_to").as_deref(),
                Some("http://localhost:8080/auth")
            );
            let body: Value = received[0].body_json().unwrap();
            assert_eq!(body["email"], "ana@example.com");
            assert_eq!(body["data"]["full_name"], "Ana Pérez");
        }

        #[tokio::test]
        async fn test_update_profile_filters_by_auth_id() {
            let server = MockServer::start().await;
            Mock::given(method("PATCH"))
                .and(path("/rest/v1/profiles"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 77 }])))
                .up_to_n_times(1)
                .with_priority(1)
                .mount(&server)
                .await;
            Mock::given(method("PATCH"))
                .and(path("/rest/v1/profiles"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
                .mount(&server)
                .await;

            let auth_id = Uuid::parse_str(USER_ID).unwrap();
            let update = ProfileUpdate {
                email: "ana@example.com".into(),
                full_name: "Ana Pérez".into(),
                phone: String::new(),
                role: "customer".into(),
                language: "es".into(),
                company_id: Some(10),
                company_name: Some("Acme Import SAS".into()),
            };
            let backend = client(&server);
            let profile = backend
                .update_profile(Some("signup-jwt"), auth_id, &update)
                .await
                .unwrap();
            assert_eq!(profile.id, RowId::Int(77));

            let received = requests(&server).await;
            assert_eq!(
                query(&received[0], "auth_id"),
                Some(format!("eq.{USER_ID}"))
            );
            assert_eq!(
                header(&received[0], "prefer").as_deref(),
                Some("return=representation")
            );
            assert_eq!(
                header(&received[0], "authorization").as_deref(),
                Some("Bearer signup-jwt")
            );

            let err = backend
                .update_profile(None, auth_id, &update)
                .await
                .unwrap_err();
            assert!(matches!(err, BackendError::NoRow(ref table) if table == "profiles"));
        }

        #[tokio::test]
        async fn test_legal_document_upsert_merges_duplicates() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/rest/v1/legal_documents_agent"))
                .respond_with(ResponseTemplate::new(201))
                .mount(&server)
                .await;

            let record = LegalDocumentRecord {
                user_id: RowId::Int(77),
                document_type: "rut".into(),
                rut_number: Some("900123456-7".into()),
                file_name: "rut.pdf".into(),
                file_path: "77/rut_1.pdf".into(),
                file_size: 64,
                uploaded_at: chrono::Utc::now(),
            };
            client(&server)
                .upsert_legal_document(Some("user-jwt"), "legal_documents_agent", &record)
                .await
                .unwrap();

            let received = requests(&server).await;
            let request = &received[0];
            assert_eq!(
                query(request, "on_conflict").as_deref(),
                Some("user_id,document_type")
            );
            assert_eq!(
                header(request, "prefer").as_deref(),
                Some("resolution=merge-duplicates,return=minimal")
            );
            let body: Value = request.body_json().unwrap();
            assert_eq!(body["rut_number"], "900123456-7");
        }

        #[tokio::test]
        async fn test_upload_never_overwrites() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/storage/v1/object/client-documents/77/77_rut_1.pdf"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Key": "x" })))
                .mount(&server)
                .await;

            let stored = client(&server)
                .upload(
                    Some("user-jwt"),
                    Upload {
                        bucket: "client-documents",
                        path: "77/77_rut_1.pdf".into(),
                        content_type: "application/pdf".into(),
                        bytes: Bytes::from_static(b"%PDF-1.4"),
                    },
                )
                .await
                .unwrap();
            assert_eq!(stored, "77/77_rut_1.pdf");

            let received = requests(&server).await;
            let request = &received[0];
            assert_eq!(header(request, "x-upsert").as_deref(), Some("false"));
            assert_eq!(header(request, "cache-control").as_deref(), Some("max-age=3600"));
            assert_eq!(header(request, "content-type").as_deref(), Some("application/pdf"));
            assert_eq!(header(request, "authorization").as_deref(), Some("Bearer user-jwt"));
            assert_eq!(request.body, b"%PDF-1.4".to_vec());
        }

        #[tokio::test]
        async fn test_bucket_admin_uses_service_key() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/storage/v1/bucket"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(json!([{ "id": "certifications", "name": "certifications" }])),
                )
                .mount(&server)
                .await;

            let buckets = client(&server).list_buckets().await.unwrap();
            assert_eq!(buckets[0].id, "certifications");
            assert!(!buckets[0].public);

            let received = requests(&server).await;
            assert_eq!(header(&received[0], "apikey").as_deref(), Some("service"));
            assert_eq!(
                header(&received[0], "authorization").as_deref(),
                Some("Bearer service")
            );
        }
    }
}
