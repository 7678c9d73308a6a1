//! In-memory [`Backend`] used by the workflow and router tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use super::{
    AuthSession, AuthUser, Backend, BackendError, Certification, CertificationFile, Company,
    LegalDocumentRecord, Market, Profile, ProfileMatch, ProfileUpdate, RowId, SignUp,
    SignUpResult, Upload, UserCertification, UserMarket,
};

/// Operations that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fail {
    Catalog,
    EmailLookup,
    PhoneLookup,
    CreateCompany,
    UpdateProfile,
    AssignMarkets,
    AssignCertifications,
    AttachCertification,
    SignIn,
    Upload,
    LegalDocument,
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub sign_ups: Vec<SignUp>,
    pub companies_created: Vec<(String, String)>,
    pub profile_updates: Vec<(Uuid, ProfileUpdate)>,
    pub markets: Vec<UserMarket>,
    pub certifications: Vec<UserCertification>,
    pub certification_files: Vec<(RowId, i64, CertificationFile)>,
    pub legal_documents: Vec<(String, LegalDocumentRecord)>,
    pub uploads: Vec<(String, String, usize)>,
    pub tokens_seen: Vec<Option<String>>,
}

pub struct InMemoryBackend {
    pub markets: Vec<Market>,
    pub companies: Vec<Company>,
    pub certifications: Vec<Certification>,
    pub existing_profiles: Vec<ProfileMatch>,
    /// Message returned by sign-up as an API error.
    pub sign_up_error: Option<String>,
    /// Sign-up answers without a user.
    pub sign_up_without_user: bool,
    /// Message returned by profile update as an API error.
    pub profile_error: Option<String>,
    pub failing: HashSet<Fail>,
    /// Upload paths containing this fragment fail.
    pub failing_upload_fragment: Option<String>,
    pub user_id: Uuid,
    pub profile_id: RowId,
    pub recorded: Mutex<Recorded>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self {
            markets: vec![
                Market { id: 1, name: "China".into() },
                Market { id: 2, name: "Estados Unidos".into() },
            ],
            companies: vec![Company { id: 10, name: "Acme Import SAS".into() }],
            certifications: vec![
                Certification { id: 1, name: "BASC".into() },
                Certification { id: 2, name: "OEA".into() },
                Certification { id: 9, name: "Ninguna".into() },
            ],
            existing_profiles: Vec::new(),
            sign_up_error: None,
            sign_up_without_user: false,
            profile_error: None,
            failing: HashSet::new(),
            failing_upload_fragment: None,
            user_id: Uuid::new_v4(),
            profile_id: RowId::Int(77),
            recorded: Mutex::new(Recorded::default()),
        }
    }
}

impl InMemoryBackend {
    pub fn failing(mut self, op: Fail) -> Self {
        self.failing.insert(op);
        self
    }

    fn check(&self, op: Fail) -> Result<(), BackendError> {
        if self.failing.contains(&op) {
            return Err(BackendError::Api {
                status: 500,
                message: format!("{op:?} failed"),
            });
        }
        Ok(())
    }

    fn record<F: FnOnce(&mut Recorded)>(&self, token: Option<&str>, f: F) {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.tokens_seen.push(token.map(String::from));
        f(&mut recorded);
    }
}

#[async_trait]
impl Backend for InMemoryBackend {
    async fn markets(&self) -> Result<Vec<Market>, BackendError> {
        self.check(Fail::Catalog)?;
        Ok(self.markets.clone())
    }

    async fn companies(&self) -> Result<Vec<Company>, BackendError> {
        self.check(Fail::Catalog)?;
        Ok(self.companies.clone())
    }

    async fn active_certifications(&self) -> Result<Vec<Certification>, BackendError> {
        self.check(Fail::Catalog)?;
        Ok(self.certifications.clone())
    }

    async fn profiles_with_email(&self, email: &str) -> Result<Vec<ProfileMatch>, BackendError> {
        self.check(Fail::EmailLookup)?;
        Ok(self
            .existing_profiles
            .iter()
            .filter(|p| p.email.as_deref() == Some(email))
            .cloned()
            .collect())
    }

    async fn profiles_with_phone(&self, phone: &str) -> Result<Vec<ProfileMatch>, BackendError> {
        self.check(Fail::PhoneLookup)?;
        Ok(self
            .existing_profiles
            .iter()
            .filter(|p| p.phone.as_deref() == Some(phone))
            .cloned()
            .collect())
    }

    async fn sign_up(&self, request: &SignUp) -> Result<SignUpResult, BackendError> {
        self.recorded.lock().unwrap().sign_ups.push(request.clone());
        if let Some(message) = &self.sign_up_error {
            return Err(BackendError::Api {
                status: 400,
                message: message.clone(),
            });
        }
        if self.sign_up_without_user {
            return Ok(SignUpResult::default());
        }
        Ok(SignUpResult {
            user: Some(AuthUser {
                id: self.user_id,
                email: Some(request.email.clone()),
            }),
            session: None,
        })
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<AuthSession, BackendError> {
        self.check(Fail::SignIn)?;
        Ok(AuthSession {
            access_token: "user-jwt".into(),
            user: AuthUser {
                id: self.user_id,
                email: Some(email.to_string()),
            },
        })
    }

    async fn create_company(
        &self,
        token: Option<&str>,
        name: &str,
        email: &str,
    ) -> Result<Company, BackendError> {
        self.check(Fail::CreateCompany)?;
        self.record(token, |r| {
            r.companies_created.push((name.to_string(), email.to_string()))
        });
        Ok(Company {
            id: 500,
            name: name.to_string(),
        })
    }

    async fn update_profile(
        &self,
        token: Option<&str>,
        auth_id: Uuid,
        update: &ProfileUpdate,
    ) -> Result<Profile, BackendError> {
        self.check(Fail::UpdateProfile)?;
        if let Some(message) = &self.profile_error {
            return Err(BackendError::Api {
                status: 409,
                message: message.clone(),
            });
        }
        self.record(token, |r| r.profile_updates.push((auth_id, update.clone())));
        Ok(Profile {
            id: self.profile_id.clone(),
        })
    }

    async fn assign_markets(
        &self,
        token: Option<&str>,
        rows: &[UserMarket],
    ) -> Result<(), BackendError> {
        self.check(Fail::AssignMarkets)?;
        self.record(token, |r| r.markets.extend_from_slice(rows));
        Ok(())
    }

    async fn assign_certifications(
        &self,
        token: Option<&str>,
        rows: &[UserCertification],
    ) -> Result<(), BackendError> {
        self.check(Fail::AssignCertifications)?;
        self.record(token, |r| r.certifications.extend_from_slice(rows));
        Ok(())
    }

    async fn attach_certification_file(
        &self,
        token: Option<&str>,
        user_id: &RowId,
        certification_id: i64,
        file: &CertificationFile,
    ) -> Result<(), BackendError> {
        self.check(Fail::AttachCertification)?;
        self.record(token, |r| {
            r.certification_files
                .push((user_id.clone(), certification_id, file.clone()))
        });
        Ok(())
    }

    async fn upsert_legal_document(
        &self,
        token: Option<&str>,
        table: &str,
        record: &LegalDocumentRecord,
    ) -> Result<(), BackendError> {
        self.check(Fail::LegalDocument)?;
        self.record(token, |r| {
            r.legal_documents.push((table.to_string(), record.clone()))
        });
        Ok(())
    }

    async fn upload(&self, token: Option<&str>, upload: Upload) -> Result<String, BackendError> {
        self.check(Fail::Upload)?;
        if let Some(fragment) = &self.failing_upload_fragment {
            if upload.path.contains(fragment.as_str()) {
                return Err(BackendError::Api {
                    status: 400,
                    message: "The resource already exists".into(),
                });
            }
        }
        self.record(token, |r| {
            r.uploads
                .push((upload.bucket.to_string(), upload.path.clone(), upload.bytes.len()))
        });
        Ok(upload.path)
    }
}
