use thiserror::Error;

use super::form::{AccountForm, CompanyChoice, DocumentsForm};
use super::{
    DocumentKind, Role, MAX_FILE_BYTES, MIN_PASSWORD_LEN, NONE_CERTIFICATION_FALLBACK_ID,
    NONE_CERTIFICATION_NAME,
};
use crate::backend::ReferenceData;

/// First problem found in a submission. Checks run in form order.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Invalid {
    #[error("name is required")]
    NameRequired,
    #[error("email is required")]
    EmailRequired,
    #[error("email is malformed")]
    EmailInvalid,
    #[error("phone is required")]
    PhoneRequired,
    #[error("password is required")]
    PasswordRequired,
    #[error("password is too short")]
    PasswordTooShort,
    #[error("passwords do not match")]
    PasswordMismatch,
    #[error("no market selected")]
    MarketsRequired,
    #[error("unknown market {0}")]
    UnknownMarket(i64),
    #[error("company name is required")]
    CompanyNameRequired,
    #[error("unknown company {0}")]
    UnknownCompany(i64),
    #[error("RUT number is required")]
    RutNumberRequired,
    #[error("document {} is required", .0.as_str())]
    DocumentRequired(DocumentKind),
    #[error("no certification selected")]
    CertificationsRequired,
    #[error("unknown certification {0}")]
    UnknownCertification(i64),
    #[error("'no certification' combined with other certifications")]
    NoneIsExclusive,
    #[error("certification {0} has no PDF")]
    CertificationFileRequired(i64),
    #[error("{0} is larger than the upload limit")]
    FileTooLarge(String),
    #[error("{0} is not a PDF")]
    FileNotPdf(String),
    #[error("submission exceeds the upload allowance")]
    UploadTooLarge,
}

impl Invalid {
    /// Translation key of the user-facing message.
    pub fn message_key(&self) -> &'static str {
        match self {
            Invalid::NameRequired => "errors.nameRequired",
            Invalid::EmailRequired => "errors.emailRequired",
            Invalid::EmailInvalid => "errors.emailInvalid",
            Invalid::PhoneRequired => "errors.phoneRequired",
            Invalid::PasswordRequired => "errors.passwordRequired",
            Invalid::PasswordTooShort => "errors.passwordTooShort",
            Invalid::PasswordMismatch => "errors.passwordMismatch",
            Invalid::MarketsRequired => "errors.marketsRequired",
            Invalid::UnknownMarket(_) => "errors.unknownMarket",
            Invalid::CompanyNameRequired => "errors.companyNameRequired",
            Invalid::UnknownCompany(_) => "errors.unknownCompany",
            Invalid::RutNumberRequired => "errors.rutNumberRequired",
            Invalid::DocumentRequired(DocumentKind::Rut) => "errors.rutDocumentRequired",
            Invalid::DocumentRequired(DocumentKind::ChamberOfCommerce) => {
                "errors.chamberOfCommerceRequired"
            }
            Invalid::DocumentRequired(DocumentKind::LegalRepresentative) => {
                "errors.legalRepresentativeRequired"
            }
            Invalid::CertificationsRequired => "errors.certificationsRequired",
            Invalid::UnknownCertification(_) => "errors.unknownCertification",
            Invalid::NoneIsExclusive => "errors.noneIsExclusive",
            Invalid::CertificationFileRequired(_) => "errors.certificationFilesRequired",
            Invalid::FileTooLarge(_) => "errors.fileTooLarge",
            Invalid::FileNotPdf(_) => "errors.fileNotPdf",
            Invalid::UploadTooLarge => "errors.uploadTooLarge",
        }
    }

    pub fn vars(&self) -> Vec<(&'static str, String)> {
        match self {
            Invalid::FileTooLarge(name) | Invalid::FileNotPdf(name) => {
                vec![("file", name.clone())]
            }
            _ => Vec::new(),
        }
    }
}

/// Step 1 checks.
pub fn validate_account(form: &AccountForm, reference: &ReferenceData) -> Result<(), Invalid> {
    if form.full_name.trim().is_empty() {
        return Err(Invalid::NameRequired);
    }
    if form.email.trim().is_empty() {
        return Err(Invalid::EmailRequired);
    }
    if !looks_like_email(form.email.trim()) {
        return Err(Invalid::EmailInvalid);
    }
    if form.phone.trim().is_empty() {
        return Err(Invalid::PhoneRequired);
    }
    if form.password.trim().is_empty() {
        return Err(Invalid::PasswordRequired);
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(Invalid::PasswordTooShort);
    }
    if form.password != form.confirm_password {
        return Err(Invalid::PasswordMismatch);
    }
    if form.markets.is_empty() {
        return Err(Invalid::MarketsRequired);
    }
    if let Some(unknown) = form.markets.iter().find(|id| reference.market(**id).is_none()) {
        return Err(Invalid::UnknownMarket(*unknown));
    }
    match &form.company {
        CompanyChoice::None => {}
        CompanyChoice::New(name) if name.trim().is_empty() => {
            return Err(Invalid::CompanyNameRequired)
        }
        CompanyChoice::New(_) => {}
        CompanyChoice::Existing(id) if reference.company(*id).is_none() => {
            return Err(Invalid::UnknownCompany(*id))
        }
        CompanyChoice::Existing(_) => {}
    }
    Ok(())
}

/// Step 2 checks.
pub fn validate_documents(
    role: Role,
    form: &DocumentsForm,
    reference: &ReferenceData,
) -> Result<(), Invalid> {
    if form.rut_number.trim().is_empty() {
        return Err(Invalid::RutNumberRequired);
    }
    for kind in DocumentKind::ALL {
        if !form.documents.contains_key(&kind) {
            return Err(Invalid::DocumentRequired(kind));
        }
    }

    if role.has_certifications() {
        validate_certifications(form, reference)?;
    }

    for file in form.all_files() {
        if file.size() > MAX_FILE_BYTES {
            return Err(Invalid::FileTooLarge(file.file_name.clone()));
        }
        if !file.is_pdf() {
            return Err(Invalid::FileNotPdf(file.file_name.clone()));
        }
    }
    Ok(())
}

fn validate_certifications(form: &DocumentsForm, reference: &ReferenceData) -> Result<(), Invalid> {
    if form.certifications.is_empty() {
        return Err(Invalid::CertificationsRequired);
    }
    if let Some(unknown) = form
        .certifications
        .iter()
        .find(|id| reference.certification(**id).is_none())
    {
        return Err(Invalid::UnknownCertification(*unknown));
    }

    let none_id = none_certification_id(reference);
    if form.certifications.contains(&none_id) && form.certifications.len() > 1 {
        return Err(Invalid::NoneIsExclusive);
    }
    if let Some(missing) = form
        .certifications
        .iter()
        .find(|id| **id != none_id && !form.certification_files.contains_key(*id))
    {
        return Err(Invalid::CertificationFileRequired(*missing));
    }
    Ok(())
}

/// Id of the "no certification" entry.
pub fn none_certification_id(reference: &ReferenceData) -> i64 {
    reference
        .certifications
        .iter()
        .find(|c| c.name == NONE_CERTIFICATION_NAME)
        .map(|c| c.id)
        .unwrap_or(NONE_CERTIFICATION_FALLBACK_ID)
}

/// `local@domain.tld` with no whitespace.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
