//! `setup-storage`: creates the private PDF buckets registration uploads to.

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::backend::supabase::{Bucket, BucketSpec, SupabaseClient};
use crate::registration::{MAX_FILE_BYTES, PDF_MIME};

const PDF_ONLY: &[&str] = &[PDF_MIME];

pub static BUCKETS: [BucketSpec; 3] = [
    BucketSpec {
        id: "certifications",
        name: "certifications",
        public: false,
        file_size_limit: MAX_FILE_BYTES,
        allowed_mime_types: PDF_ONLY,
    },
    BucketSpec {
        id: "legal-documents",
        name: "legal-documents",
        public: false,
        file_size_limit: MAX_FILE_BYTES,
        allowed_mime_types: PDF_ONLY,
    },
    BucketSpec {
        id: "client-documents",
        name: "client-documents",
        public: false,
        file_size_limit: MAX_FILE_BYTES,
        allowed_mime_types: PDF_ONLY,
    },
];

#[derive(Debug, Default, PartialEq, Eq)]
pub struct SetupReport {
    pub existing: Vec<&'static str>,
    pub created: Vec<&'static str>,
    pub failed: Vec<&'static str>,
}

/// Buckets from [`BUCKETS`] that `existing` lacks.
pub fn missing_buckets(existing: &[Bucket]) -> Vec<&'static BucketSpec> {
    BUCKETS
        .iter()
        .filter(|spec| !existing.iter().any(|b| b.id == spec.id || b.name == spec.name))
        .collect()
}

pub async fn ensure_buckets(client: &SupabaseClient) -> Result<SetupReport> {
    let existing = client
        .list_buckets()
        .await
        .context("Failed to list storage buckets")?;
    info!("Found {} existing buckets", existing.len());

    let mut report = SetupReport::default();
    let missing = missing_buckets(&existing);
    for spec in &BUCKETS {
        if !missing.iter().any(|m| m.id == spec.id) {
            info!("Bucket '{}' already exists", spec.id);
            report.existing.push(spec.id);
        }
    }

    for spec in missing {
        match client.create_bucket(spec).await {
            Ok(()) => {
                info!("Bucket '{}' created", spec.id);
                report.created.push(spec.id);
            }
            Err(e) => {
                error!("Bucket '{}' could not be created: {e}", spec.id);
                report.failed.push(spec.id);
            }
        }
    }
    Ok(report)
}
