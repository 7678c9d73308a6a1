//! Self-service registration for importers and agents.
//!
//! Two form steps (account, then documents) followed by a workflow that
//! writes the new user to the BaaS: duplicate checks, sign-up, company and
//! profile rows, market/certification assignments, document uploads and a
//! welcome email.

pub mod error;
pub mod form;
pub mod handlers;
pub mod validation;
pub mod workflow;

use crate::backend::{ReferenceData, RowId};

/// Upload limit per file, matching the storage buckets.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
/// Text fields and multipart framing on top of the files.
pub const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const PDF_MIME: &str = "application/pdf";

pub const CERTIFICATION_BUCKET: &str = "certifications";
/// The certification meaning "no certification"; excludes every other one.
pub const NONE_CERTIFICATION_NAME: &str = "Ninguna";
/// Id of [`NONE_CERTIFICATION_NAME`] when the catalog does not list it.
pub const NONE_CERTIFICATION_FALLBACK_ID: i64 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Importer,
    Agent,
}

impl Role {
    /// Path of the registration page.
    pub fn path(self) -> &'static str {
        match self {
            Role::Importer => "/register-importer",
            Role::Agent => "/register-agent",
        }
    }

    /// Value stored in `profiles.role`.
    pub fn stored_role(self) -> &'static str {
        match self {
            Role::Importer => "customer",
            Role::Agent => "agent",
        }
    }

    pub fn document_bucket(self) -> &'static str {
        match self {
            Role::Importer => "client-documents",
            Role::Agent => "legal-documents",
        }
    }

    pub fn document_table(self) -> &'static str {
        match self {
            Role::Importer => "legal_documents_customer",
            Role::Agent => "legal_documents_agent",
        }
    }

    pub fn has_certifications(self) -> bool {
        matches!(self, Role::Agent)
    }

    /// Largest submission step 2 can produce: every document and every
    /// offered certification at the per-file limit.
    pub fn upload_allowance(self, reference: &ReferenceData) -> usize {
        let certifications = if self.has_certifications() {
            reference.certifications.len()
        } else {
            0
        };
        (DocumentKind::ALL.len() + certifications) * MAX_FILE_BYTES as usize + FORM_OVERHEAD_BYTES
    }

    /// Where a legal document is stored and which file name its metadata
    /// row records.
    pub fn document_location(
        self,
        profile_id: &RowId,
        kind: DocumentKind,
        millis: i64,
        extension: &str,
        original_name: &str,
    ) -> DocumentLocation {
        match self {
            Role::Importer => {
                let file_name = format!("{profile_id}_{}_{millis}.{extension}", kind.as_str());
                DocumentLocation {
                    path: format!("{profile_id}/{file_name}"),
                    file_name,
                }
            }
            Role::Agent => DocumentLocation {
                path: format!("{profile_id}/{}_{millis}.{extension}", kind.as_str()),
                file_name: original_name.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLocation {
    pub path: String,
    pub file_name: String,
}

/// Object path of an agent's certification PDF.
pub fn certification_path(
    profile_id: &RowId,
    certification_id: i64,
    millis: i64,
    extension: &str,
) -> String {
    format!("{profile_id}/{certification_id}_{millis}.{extension}")
}

/// Legal documents every registrant uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DocumentKind {
    Rut,
    ChamberOfCommerce,
    LegalRepresentative,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 3] = [
        DocumentKind::Rut,
        DocumentKind::ChamberOfCommerce,
        DocumentKind::LegalRepresentative,
    ];

    /// Stored as `document_type`.
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentKind::Rut => "rut",
            DocumentKind::ChamberOfCommerce => "camaraComercio",
            DocumentKind::LegalRepresentative => "cedulaRepresentante",
        }
    }

    pub fn field_name(self) -> String {
        format!("doc_{}", self.as_str())
    }

    pub fn label_key(self) -> &'static str {
        match self {
            DocumentKind::Rut => "register.rutDocument",
            DocumentKind::ChamberOfCommerce => "register.chamberOfCommerceDocument",
            DocumentKind::LegalRepresentative => "register.legalRepresentativeDocument",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_storage_targets() {
        assert_eq!(Role::Importer.stored_role(), "customer");
        assert_eq!(Role::Agent.stored_role(), "agent");
        assert_eq!(Role::Importer.document_bucket(), "client-documents");
        assert_eq!(Role::Agent.document_table(), "legal_documents_agent");
        assert!(!Role::Importer.has_certifications());
    }

    #[test]
    fn test_upload_allowance_covers_every_file() {
        let reference = ReferenceData {
            certifications: vec![
                crate::backend::Certification { id: 1, name: "BASC".into() },
                crate::backend::Certification { id: 2, name: "OEA".into() },
            ],
            ..ReferenceData::default()
        };
        let per_file = MAX_FILE_BYTES as usize;
        assert_eq!(
            Role::Importer.upload_allowance(&reference),
            3 * per_file + FORM_OVERHEAD_BYTES
        );
        assert_eq!(
            Role::Agent.upload_allowance(&reference),
            5 * per_file + FORM_OVERHEAD_BYTES
        );
    }

    #[test]
    fn test_importer_document_location_uses_generated_name() {
        let loc = Role::Importer.document_location(
            &RowId::Int(12),
            DocumentKind::Rut,
            1700000000000,
            "pdf",
            "mi rut.pdf",
        );
        assert_eq!(loc.file_name, "12_rut_1700000000000.pdf");
        assert_eq!(loc.path, "12/12_rut_1700000000000.pdf");
    }

    #[test]
    fn test_agent_document_location_keeps_original_name() {
        let loc = Role::Agent.document_location(
            &RowId::Text("ab-1".into()),
            DocumentKind::ChamberOfCommerce,
            5,
            "pdf",
            "camara.pdf",
        );
        assert_eq!(loc.path, "ab-1/camaraComercio_5.pdf");
        assert_eq!(loc.file_name, "camara.pdf");
    }

    #[test]
    fn test_certification_path() {
        assert_eq!(certification_path(&RowId::Int(3), 2, 9, "pdf"), "3/2_9.pdf");
    }
}
