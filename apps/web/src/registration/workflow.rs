//! The registration sequence after both form steps validate.
//!
//! Steps run strictly in order. Everything up to the market assignment is
//! fatal on failure; from sign-in on the account exists, so later problems
//! only degrade the outcome.

use chrono::Utc;
use tracing::{error, info, warn};

use super::error::{classify_profile_error, classify_sign_up_error, RegistrationError};
use super::form::{AccountForm, CompanyChoice, DocumentsForm, UploadedFile};
use super::validation::{none_certification_id, validate_account, validate_documents};
use super::{certification_path, DocumentKind, Role, CERTIFICATION_BUCKET, PDF_MIME};
use crate::backend::{
    Backend, CertificationFile, LegalDocumentRecord, ProfileUpdate, ReferenceData, RowId, SignUp,
    Upload, UserCertification, UserMarket,
};
use crate::mailer::{Mailer, WelcomeEmail};

/// Collaborators the workflow needs.
pub struct Services<'a> {
    pub backend: &'a dyn Backend,
    pub mailer: &'a dyn Mailer,
    /// Link target of the sign-up confirmation email.
    pub email_redirect: &'a str,
}

pub struct Registration<'a> {
    pub role: Role,
    pub account: &'a AccountForm,
    pub documents: &'a DocumentsForm,
    pub reference: &'a ReferenceData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Signed in, documents processed, welcome email attempted.
    Welcome,
    /// The account exists but automatic sign-in failed.
    SignInManually,
}

/// A document the user has to upload again later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailedUpload {
    Document(DocumentKind),
    Certification { id: i64, name: String },
}

#[derive(Debug, Clone)]
pub struct RegistrationOutcome {
    pub profile_id: RowId,
    pub completion: Completion,
    pub failed_uploads: Vec<FailedUpload>,
}

pub async fn register(
    services: &Services<'_>,
    registration: Registration<'_>,
) -> Result<RegistrationOutcome, RegistrationError> {
    let Registration {
        role,
        account,
        documents,
        reference,
    } = registration;
    let backend = services.backend;

    validate_account(account, reference)?;
    validate_documents(role, documents, reference)?;

    ensure_unique_contact(backend, role, account).await?;

    info!("Creating auth user for {}", account.email);
    let phone = account.phone.trim();
    let sign_up = SignUp {
        email: account.email.clone(),
        password: account.password.clone(),
        phone: (!phone.is_empty()).then(|| phone.to_string()),
        full_name: account.full_name.trim().to_string(),
        redirect_to: services.email_redirect.to_string(),
    };
    let signed_up = backend.sign_up(&sign_up).await.map_err(|e| {
        error!("Auth user creation failed: {e}");
        classify_sign_up_error(e, phone)
    })?;
    let user = signed_up.user.ok_or(RegistrationError::UserNotCreated)?;
    info!("Auth user created: {}", user.id);
    let signup_token = signed_up.session.as_ref().map(|s| s.access_token.as_str());

    let (company_id, company_name) = match &account.company {
        CompanyChoice::New(name) => {
            let name = name.trim();
            let company = backend
                .create_company(signup_token, name, &account.email)
                .await
                .map_err(|e| {
                    error!("Company creation failed: {e}");
                    RegistrationError::CompanyCreate(e)
                })?;
            info!("Company created: {}", company.id);
            (Some(company.id), Some(name.to_string()))
        }
        CompanyChoice::Existing(id) => (Some(*id), reference.company(*id).map(|c| c.name.clone())),
        CompanyChoice::None => (None, None),
    };

    let update = ProfileUpdate {
        email: account.email.clone(),
        full_name: account.full_name.trim().to_string(),
        phone: phone.to_string(),
        role: role.stored_role().to_string(),
        language: account.language.as_str().to_string(),
        company_id,
        company_name: company_name.clone(),
    };
    let profile = backend
        .update_profile(signup_token, user.id, &update)
        .await
        .map_err(|e| {
            error!("Profile update failed: {e}");
            classify_profile_error(e)
        })?;
    let profile_id = profile.id;
    info!("Profile ready: {profile_id}");

    if role.has_certifications() && !documents.certifications.is_empty() {
        let rows: Vec<UserCertification> = documents
            .certifications
            .iter()
            .map(|id| UserCertification {
                user_id: profile_id.clone(),
                certification_id: *id,
            })
            .collect();
        match backend.assign_certifications(signup_token, &rows).await {
            Ok(()) => info!("Certifications assigned: {:?}", documents.certifications),
            Err(e) => warn!("Certification assignment failed: {e}"),
        }
    }

    let markets: Vec<UserMarket> = account
        .markets
        .iter()
        .map(|id| UserMarket {
            user_id: profile_id.clone(),
            market_id: *id,
        })
        .collect();
    backend
        .assign_markets(signup_token, &markets)
        .await
        .map_err(|e| {
            error!("Market assignment failed: {e}");
            RegistrationError::Markets(e)
        })?;
    info!("Markets assigned: {:?}", account.markets);

    let session = match backend.sign_in(&account.email, &account.password).await {
        Ok(session) => session,
        Err(e) => {
            warn!("Automatic sign-in failed for {}: {e}", account.email);
            return Ok(RegistrationOutcome {
                profile_id,
                completion: Completion::SignInManually,
                failed_uploads: Vec::new(),
            });
        }
    };
    info!("Signed in as {}", session.user.id);
    let token = Some(session.access_token.as_str());

    let mut failed_uploads = Vec::new();
    if role.has_certifications() {
        failed_uploads.extend(
            upload_certifications(backend, token, &profile_id, documents, reference).await,
        );
    }
    failed_uploads.extend(upload_documents(backend, token, role, &profile_id, documents).await);

    let welcome = WelcomeEmail {
        email: account.email.clone(),
        full_name: account.full_name.trim().to_string(),
        role: role.stored_role().to_string(),
        language: account.language.as_str().to_string(),
        company_name,
    };
    if let Err(e) = services.mailer.send_welcome(&welcome).await {
        warn!("Welcome email failed (registration still successful): {e}");
    }

    Ok(RegistrationOutcome {
        profile_id,
        completion: Completion::Welcome,
        failed_uploads,
    })
}

async fn ensure_unique_contact(
    backend: &dyn Backend,
    role: Role,
    account: &AccountForm,
) -> Result<(), RegistrationError> {
    let existing = backend
        .profiles_with_email(&account.email)
        .await
        .map_err(|e| {
            error!("Email lookup failed: {e}");
            RegistrationError::EmailCheck(e)
        })?;
    if let Some(profile) = existing.first() {
        info!(
            "Email {} already registered (since {})",
            account.email,
            profile.created_at.as_deref().unwrap_or("unknown")
        );
        // Importers are told when the existing account was opened.
        let since = match role {
            Role::Importer => profile.created_at.as_deref().map(registration_date),
            Role::Agent => None,
        };
        return Err(RegistrationError::EmailTaken { since });
    }

    let phone = account.phone.trim();
    if !phone.is_empty() {
        let existing = backend.profiles_with_phone(phone).await.map_err(|e| {
            error!("Phone lookup failed: {e}");
            RegistrationError::PhoneCheck(e)
        })?;
        if !existing.is_empty() {
            info!("Phone {phone} already registered");
            return Err(RegistrationError::PhoneTaken {
                phone: phone.to_string(),
            });
        }
    }
    Ok(())
}

/// Date part of a BaaS timestamp such as `2024-05-01T12:30:00+00:00`.
fn registration_date(created_at: &str) -> String {
    created_at
        .split_once('T')
        .map(|(date, _)| date)
        .unwrap_or(created_at)
        .to_string()
}

fn pdf_upload(bucket: &'static str, path: String, file: &UploadedFile) -> Upload {
    Upload {
        bucket,
        path,
        content_type: PDF_MIME.to_string(),
        bytes: file.bytes.clone(),
    }
}

async fn upload_certifications(
    backend: &dyn Backend,
    token: Option<&str>,
    profile_id: &RowId,
    documents: &DocumentsForm,
    reference: &ReferenceData,
) -> Vec<FailedUpload> {
    let none_id = none_certification_id(reference);
    let mut failed = Vec::new();

    for id in documents.certifications.iter().filter(|id| **id != none_id) {
        let Some(file) = documents.certification_files.get(id) else {
            continue;
        };
        let failure = FailedUpload::Certification {
            id: *id,
            name: reference
                .certification(*id)
                .map(|c| c.name.clone())
                .unwrap_or_else(|| id.to_string()),
        };

        let path = certification_path(
            profile_id,
            *id,
            Utc::now().timestamp_millis(),
            &file.extension(),
        );
        let stored = match backend
            .upload(token, pdf_upload(CERTIFICATION_BUCKET, path, file))
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                warn!("Certification {id} PDF upload failed: {e}");
                failed.push(failure);
                continue;
            }
        };

        let record = CertificationFile {
            pdf_file_name: file.file_name.clone(),
            pdf_file_path: stored,
            pdf_file_size: file.size(),
            pdf_uploaded_at: Utc::now(),
        };
        match backend
            .attach_certification_file(token, profile_id, *id, &record)
            .await
        {
            Ok(()) => info!("Certification {id} PDF stored at {}", record.pdf_file_path),
            Err(e) => {
                warn!("Certification {id} record update failed: {e}");
                failed.push(failure);
            }
        }
    }
    failed
}

async fn upload_documents(
    backend: &dyn Backend,
    token: Option<&str>,
    role: Role,
    profile_id: &RowId,
    documents: &DocumentsForm,
) -> Vec<FailedUpload> {
    let mut failed = Vec::new();

    for (kind, file) in &documents.documents {
        let location = role.document_location(
            profile_id,
            *kind,
            Utc::now().timestamp_millis(),
            &file.extension(),
            &file.file_name,
        );
        let stored = match backend
            .upload(
                token,
                pdf_upload(role.document_bucket(), location.path.clone(), file),
            )
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                warn!("{} upload failed: {e}", kind.as_str());
                failed.push(FailedUpload::Document(*kind));
                continue;
            }
        };

        let record = LegalDocumentRecord {
            user_id: profile_id.clone(),
            document_type: kind.as_str().to_string(),
            rut_number: (*kind == DocumentKind::Rut && !documents.rut_number.is_empty())
                .then(|| documents.rut_number.clone()),
            file_name: location.file_name,
            file_path: stored,
            file_size: file.size(),
            uploaded_at: Utc::now(),
        };
        match backend
            .upsert_legal_document(token, role.document_table(), &record)
            .await
        {
            Ok(()) => info!("{} stored at {}", kind.as_str(), record.file_path),
            Err(e) => {
                warn!("{} metadata save failed: {e}", kind.as_str());
                failed.push(FailedUpload::Document(*kind));
            }
        }
    }
    failed
}
