//! Backend-as-a-service access: auth, tables and object storage.
//!
//! Registration code only talks to the [`Backend`] trait. The production
//! implementation is [`supabase::SupabaseClient`]; tests use an in-memory one.

pub mod supabase;

#[cfg(test)]
pub mod memory;

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("No row returned from {0}")]
    NoRow(String),

    #[error("Gave up after {retries} attempts")]
    RetriesExhausted { retries: u32 },

    #[error("SUPABASE_SERVICE_ROLE_KEY is required for this operation")]
    MissingServiceKey,
}

impl BackendError {
    /// The BaaS-provided message when there is one, the display text otherwise.
    pub fn message(&self) -> String {
        match self {
            BackendError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Table primary keys are integers or uuids depending on the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(id) => write!(f, "{id}"),
            RowId::Text(id) => f.write_str(id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
    pub id: i64,
    pub name: String,
}

/// Minimal projection of a `profiles` row used by the duplicate checks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileMatch {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: RowId,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileUpdate {
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub role: String,
    pub language: String,
    pub company_id: Option<i64>,
    pub company_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    /// Only set when non-blank; also copied into the user metadata.
    pub phone: Option<String>,
    pub full_name: String,
    pub redirect_to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

/// Sign-up answers with a session when email confirmation is off and with
/// the bare user otherwise.
#[derive(Debug, Clone, Default)]
pub struct SignUpResult {
    pub user: Option<AuthUser>,
    pub session: Option<AuthSession>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserMarket {
    pub user_id: RowId,
    pub market_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserCertification {
    pub user_id: RowId,
    pub certification_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CertificationFile {
    pub pdf_file_name: String,
    pub pdf_file_path: String,
    pub pdf_file_size: u64,
    pub pdf_uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LegalDocumentRecord {
    pub user_id: RowId,
    pub document_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rut_number: Option<String>,
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Upload {
    pub bucket: &'static str,
    /// Object path inside the bucket.
    pub path: String,
    pub content_type: String,
    pub bytes: Bytes,
}

/// Everything the registration forms let users pick from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReferenceData {
    pub markets: Vec<Market>,
    pub companies: Vec<Company>,
    pub certifications: Vec<Certification>,
}

impl ReferenceData {
    pub fn market(&self, id: i64) -> Option<&Market> {
        self.markets.iter().find(|m| m.id == id)
    }

    pub fn company(&self, id: i64) -> Option<&Company> {
        self.companies.iter().find(|c| c.id == id)
    }

    pub fn certification(&self, id: i64) -> Option<&Certification> {
        self.certifications.iter().find(|c| c.id == id)
    }
}

/// Loads markets and companies, plus active certifications when asked.
pub async fn load_reference_data(
    backend: &dyn Backend,
    with_certifications: bool,
) -> Result<ReferenceData, BackendError> {
    let markets = backend.markets().await?;
    let companies = backend.companies().await?;
    let certifications = if with_certifications {
        backend.active_certifications().await?
    } else {
        Vec::new()
    };
    tracing::debug!(
        "Reference data loaded: {} markets, {} companies, {} certifications",
        markets.len(),
        companies.len(),
        certifications.len()
    );
    Ok(ReferenceData {
        markets,
        companies,
        certifications,
    })
}

/// Calls that take `token` run as the signed-in user when one is given and
/// as the anonymous role otherwise.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn markets(&self) -> Result<Vec<Market>, BackendError>;
    async fn companies(&self) -> Result<Vec<Company>, BackendError>;
    async fn active_certifications(&self) -> Result<Vec<Certification>, BackendError>;

    async fn profiles_with_email(&self, email: &str) -> Result<Vec<ProfileMatch>, BackendError>;
    async fn profiles_with_phone(&self, phone: &str) -> Result<Vec<ProfileMatch>, BackendError>;

    async fn sign_up(&self, request: &SignUp) -> Result<SignUpResult, BackendError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, BackendError>;

    async fn create_company(
        &self,
        token: Option<&str>,
        name: &str,
        email: &str,
    ) -> Result<Company, BackendError>;

    /// Fills in the profile row the BaaS creates for every new auth user.
    async fn update_profile(
        &self,
        token: Option<&str>,
        auth_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Profile, BackendError>;

    async fn assign_markets(
        &self,
        token: Option<&str>,
        rows: &[UserMarket],
    ) -> Result<(), BackendError>;

    async fn assign_certifications(
        &self,
        token: Option<&str>,
        rows: &[UserCertification],
    ) -> Result<(), BackendError>;

    async fn attach_certification_file(
        &self,
        token: Option<&str>,
        user_id: &RowId,
        certification_id: i64,
        file: &CertificationFile,
    ) -> Result<(), BackendError>;

    /// Upsert keyed on `(user_id, document_type)`.
    async fn upsert_legal_document(
        &self,
        token: Option<&str>,
        table: &str,
        record: &LegalDocumentRecord,
    ) -> Result<(), BackendError>;

    /// Stores an object without overwriting; returns its path in the bucket.
    async fn upload(&self, token: Option<&str>, upload: Upload) -> Result<String, BackendError>;
}
