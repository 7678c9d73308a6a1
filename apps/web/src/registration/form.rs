//! Multipart form decoding for both registration steps.
//!
//! Both steps post `multipart/form-data` so repeated fields (markets,
//! certifications) and files share one decoding path.

use std::collections::BTreeMap;

use axum::{
    extract::multipart::{Multipart, MultipartError},
    http::StatusCode,
};
use bytes::{Bytes, BytesMut};

use super::{DocumentKind, PDF_MIME};
use crate::i18n::Language;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercased extension of the original name, `pdf` when it has none.
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext)
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_else(|| "pdf".to_string())
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type.as_deref() == Some(PDF_MIME)
            || self.file_name.to_ascii_lowercase().ends_with(".pdf")
    }
}

/// Every text field and file of a submitted form, in arrival order.
#[derive(Debug, Default)]
pub struct RawForm {
    fields: Vec<(String, String)>,
    files: Vec<(String, UploadedFile)>,
}

#[derive(Debug)]
pub enum ReadFailure {
    /// The body outgrew the allowance; names the file being read, if any.
    TooLarge { file: Option<String> },
    Malformed(MultipartError),
}

/// A submission cut short, with every part that arrived before the failure.
#[derive(Debug)]
pub struct IncompleteForm {
    pub partial: RawForm,
    pub failure: ReadFailure,
}

impl RawForm {
    /// Reads the whole submission, giving up once more than `limit` bytes
    /// of part content have arrived.
    pub async fn read(mut multipart: Multipart, limit: usize) -> Result<Self, IncompleteForm> {
        let mut form = RawForm::default();
        let mut total = 0usize;
        loop {
            let mut field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => return Ok(form),
                Err(e) => return Err(form.cut_short(e, None)),
            };
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(String::from);
            let content_type = field.content_type().map(String::from);

            let mut buffer = BytesMut::new();
            loop {
                match field.chunk().await {
                    Ok(Some(chunk)) => {
                        total += chunk.len();
                        if total > limit {
                            return Err(IncompleteForm {
                                partial: form,
                                failure: ReadFailure::TooLarge { file: file_name },
                            });
                        }
                        buffer.extend_from_slice(&chunk);
                    }
                    Ok(None) => break,
                    Err(e) => return Err(form.cut_short(e, file_name)),
                }
            }
            let bytes = buffer.freeze();

            match file_name {
                // Browsers send an empty part for file inputs left blank.
                Some(file_name) if file_name.is_empty() && bytes.is_empty() => {}
                Some(file_name) => form.files.push((
                    name,
                    UploadedFile {
                        file_name,
                        content_type,
                        bytes,
                    },
                )),
                None => form
                    .fields
                    .push((name, String::from_utf8_lossy(&bytes).into_owned())),
            }
        }
    }

    fn cut_short(self, error: MultipartError, file: Option<String>) -> IncompleteForm {
        let failure = if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ReadFailure::TooLarge { file }
        } else {
            ReadFailure::Malformed(error)
        };
        IncompleteForm {
            partial: self,
            failure,
        }
    }

    pub fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_file(mut self, name: &str, file: UploadedFile) -> Self {
        self.files.push((name.to_string(), file));
        self
    }

    /// First value of a text field, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
            .unwrap_or_default()
    }

    pub fn ids(&self, name: &str) -> Vec<i64> {
        let mut ids: Vec<i64> = Vec::new();
        for (_, value) in self.fields.iter().filter(|(k, _)| k == name) {
            if let Ok(id) = value.trim().parse::<i64>() {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.iter().find(|(k, _)| k == name).map(|(_, f)| f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyChoice {
    None,
    Existing(i64),
    /// Carries the name as typed; blank is rejected by validation.
    New(String),
}

/// Step 1: personal data, credentials, company and markets.
#[derive(Debug, Clone)]
pub struct AccountForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
    pub language: Language,
    pub company: CompanyChoice,
    pub markets: Vec<i64>,
}

impl Default for AccountForm {
    fn default() -> Self {
        Self {
            full_name: String::new(),
            email: String::new(),
            phone: String::new(),
            password: String::new(),
            confirm_password: String::new(),
            language: Language::Es,
            company: CompanyChoice::None,
            markets: Vec::new(),
        }
    }
}

impl AccountForm {
    pub fn from_raw(raw: &RawForm) -> Self {
        let company = if raw.text("company_mode") == "new" {
            CompanyChoice::New(raw.text("company_name"))
        } else {
            match raw.text("company_id").trim() {
                "" => CompanyChoice::None,
                id => id
                    .parse::<i64>()
                    .map(CompanyChoice::Existing)
                    // Unparseable ids cannot match the catalog.
                    .unwrap_or(CompanyChoice::Existing(-1)),
            }
        };

        Self {
            full_name: raw.text("full_name"),
            email: raw.text("email").trim().to_string(),
            phone: raw.text("phone").trim().to_string(),
            password: raw.text("password"),
            confirm_password: raw.text("confirm_password"),
            language: Language::parse(&raw.text("language")).unwrap_or(Language::Es),
            company,
            markets: raw.ids("markets"),
        }
    }
}

/// Step 2: legal documents and, for agents, certifications.
#[derive(Debug, Clone, Default)]
pub struct DocumentsForm {
    pub rut_number: String,
    pub documents: BTreeMap<DocumentKind, UploadedFile>,
    pub certifications: Vec<i64>,
    pub certification_files: BTreeMap<i64, UploadedFile>,
}

impl DocumentsForm {
    pub fn from_raw(raw: &RawForm) -> Self {
        let documents = DocumentKind::ALL
            .iter()
            .filter_map(|kind| raw.file(&kind.field_name()).map(|f| (*kind, f.clone())))
            .collect();

        let certifications = raw.ids("certifications");
        let certification_files = certifications
            .iter()
            .filter_map(|id| {
                raw.file(&certification_field(*id))
                    .map(|f| (*id, f.clone()))
            })
            .collect();

        Self {
            rut_number: raw.text("rut_number").trim().to_string(),
            documents,
            certifications,
            certification_files,
        }
    }

    /// Every uploaded file, documents first.
    pub fn all_files(&self) -> impl Iterator<Item = &UploadedFile> {
        self.documents
            .values()
            .chain(self.certification_files.values())
    }
}

pub fn certification_field(id: i64) -> String {
    format!("cert_file_{id}")
}

#[cfg(test)]
pub(crate) fn pdf(name: &str, size: usize) -> UploadedFile {
    UploadedFile {
        file_name: name.to_string(),
        content_type: Some(PDF_MIME.to_string()),
        bytes: Bytes::from(vec![b'%'; size]),
    }
}
