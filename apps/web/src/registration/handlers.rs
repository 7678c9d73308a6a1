use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::Html,
};
use tracing::{info, warn};

use super::error::RegistrationError;
use super::form::{AccountForm, DocumentsForm, IncompleteForm, RawForm, ReadFailure};
use super::validation::{validate_account, Invalid};
use super::workflow::{self, Registration, Services};
use super::Role;
use crate::backend::{load_reference_data, ReferenceData};
use crate::i18n::{Lang, Language};
use crate::pages::register::{account_step, completion, documents_step, FormView};
use crate::state::AppState;

type Page = (StatusCode, Html<String>);

/// GET /register-importer
pub async fn importer_form(State(state): State<AppState>, Lang(lang): Lang) -> Page {
    show_form(&state, Role::Importer, lang).await
}

/// GET /register-agent
pub async fn agent_form(State(state): State<AppState>, Lang(lang): Lang) -> Page {
    show_form(&state, Role::Agent, lang).await
}

/// POST /register-importer/step-1
pub async fn importer_step_one(
    State(state): State<AppState>,
    Lang(lang): Lang,
    multipart: Multipart,
) -> Page {
    step_one(&state, Role::Importer, lang, multipart).await
}

/// POST /register-agent/step-1
pub async fn agent_step_one(
    State(state): State<AppState>,
    Lang(lang): Lang,
    multipart: Multipart,
) -> Page {
    step_one(&state, Role::Agent, lang, multipart).await
}

/// POST /register-importer
pub async fn importer_submit(
    State(state): State<AppState>,
    Lang(lang): Lang,
    multipart: Multipart,
) -> Page {
    submit(&state, Role::Importer, lang, multipart).await
}

/// POST /register-agent
pub async fn agent_submit(
    State(state): State<AppState>,
    Lang(lang): Lang,
    multipart: Multipart,
) -> Page {
    submit(&state, Role::Agent, lang, multipart).await
}

async fn reference_data(state: &AppState, role: Role) -> Result<ReferenceData, RegistrationError> {
    load_reference_data(state.backend.as_ref(), role.has_certifications())
        .await
        .map_err(|e| {
            warn!("Reference data unavailable: {e}");
            RegistrationError::ReferenceData(e)
        })
}

struct Rendering<'a> {
    state: &'a AppState,
    role: Role,
    lang: Language,
    reference: &'a ReferenceData,
    account: &'a AccountForm,
    sign_in_url: String,
}

impl<'a> Rendering<'a> {
    fn new(
        state: &'a AppState,
        role: Role,
        lang: Language,
        reference: &'a ReferenceData,
        account: &'a AccountForm,
    ) -> Self {
        Self {
            state,
            role,
            lang,
            reference,
            account,
            sign_in_url: state.config.app_auth_url(),
        }
    }

    fn view(&self, error: Option<String>) -> FormView<'_> {
        FormView {
            role: self.role,
            tr: self.state.catalog.translator(self.lang),
            reference: self.reference,
            account: self.account,
            error,
            sign_in_url: &self.sign_in_url,
        }
    }

    fn account_step(&self, status: StatusCode, error: Option<String>) -> Page {
        (status, Html(account_step(&self.view(error))))
    }

    fn documents_step(
        &self,
        status: StatusCode,
        error: Option<String>,
        documents: &DocumentsForm,
    ) -> Page {
        (
            status,
            Html(documents_step(
                &self.view(error),
                &documents.rut_number,
                &documents.certifications,
            )),
        )
    }
}

async fn show_form(state: &AppState, role: Role, lang: Language) -> Page {
    match reference_data(state, role).await {
        Ok(reference) => {
            let account = AccountForm::default();
            Rendering::new(state, role, lang, &reference, &account)
                .account_step(StatusCode::OK, None)
        }
        Err(e) => {
            let message = e.message(&state.catalog.translator(lang));
            blank_account_step(state, role, lang, e.status(), message)
        }
    }
}

/// An empty step 1 carrying only an error banner.
fn blank_account_step(
    state: &AppState,
    role: Role,
    lang: Language,
    status: StatusCode,
    message: String,
) -> Page {
    let reference = ReferenceData::default();
    let account = AccountForm::default();
    Rendering::new(state, role, lang, &reference, &account).account_step(status, Some(message))
}

fn malformed_message(state: &AppState, lang: Language) -> Option<String> {
    Some(state.catalog.translator(lang).t("errors.malformedForm"))
}

async fn step_one(state: &AppState, role: Role, lang: Language, multipart: Multipart) -> Page {
    let reference = match reference_data(state, role).await {
        Ok(reference) => reference,
        Err(e) => {
            let message = e.message(&state.catalog.translator(lang));
            return blank_account_step(state, role, lang, e.status(), message);
        }
    };
    let (raw, failure) = match RawForm::read(multipart, role.upload_allowance(&reference)).await {
        Ok(raw) => (raw, None),
        Err(IncompleteForm { partial, failure }) => (partial, Some(failure)),
    };
    let account = AccountForm::from_raw(&raw);
    let rendering = Rendering::new(state, role, lang, &reference, &account);

    match failure {
        // Step 1 has no file inputs, so only "Previous" with step-2 files
        // attached gets this large.
        Some(ReadFailure::TooLarge { .. }) => return rendering.account_step(StatusCode::OK, None),
        Some(ReadFailure::Malformed(e)) => {
            warn!("Unreadable step-1 form: {e}");
            return rendering.account_step(StatusCode::BAD_REQUEST, malformed_message(state, lang));
        }
        None => {}
    }

    // "Previous" on step 2 posts here to return with the values kept.
    if raw.text("action") == "back" {
        return rendering.account_step(StatusCode::OK, None);
    }

    match validate_account(&account, &reference) {
        Ok(()) => rendering.documents_step(StatusCode::OK, None, &DocumentsForm::default()),
        Err(invalid) => {
            info!("Step 1 rejected for {}: {invalid}", role.stored_role());
            let error = RegistrationError::from(invalid);
            rendering.account_step(
                error.status(),
                Some(error.message(&state.catalog.translator(lang))),
            )
        }
    }
}

async fn submit(state: &AppState, role: Role, lang: Language, multipart: Multipart) -> Page {
    let reference = match reference_data(state, role).await {
        Ok(reference) => reference,
        Err(e) => {
            let message = e.message(&state.catalog.translator(lang));
            return blank_account_step(state, role, lang, e.status(), message);
        }
    };
    let (raw, failure) = match RawForm::read(multipart, role.upload_allowance(&reference)).await {
        Ok(raw) => (raw, None),
        Err(IncompleteForm { partial, failure }) => (partial, Some(failure)),
    };
    let account = AccountForm::from_raw(&raw);
    let documents = DocumentsForm::from_raw(&raw);
    let tr = state.catalog.translator(lang);
    let rendering = Rendering::new(state, role, lang, &reference, &account);

    match failure {
        Some(ReadFailure::TooLarge { file }) => {
            warn!(
                "Registration upload for {} exceeded the allowance at {}",
                account.email,
                file.as_deref().unwrap_or("a form field")
            );
            let invalid = file
                .filter(|name| !name.is_empty())
                .map(Invalid::FileTooLarge)
                .unwrap_or(Invalid::UploadTooLarge);
            let message = RegistrationError::from(invalid).message(&tr);
            return rendering.documents_step(StatusCode::PAYLOAD_TOO_LARGE, Some(message), &documents);
        }
        Some(ReadFailure::Malformed(e)) => {
            warn!("Unreadable registration form: {e}");
            return rendering.account_step(StatusCode::BAD_REQUEST, malformed_message(state, lang));
        }
        None => {}
    }

    info!("Registration submitted: {} {}", role.stored_role(), account.email);
    let email_redirect = format!("{}/auth", state.config.public_url);
    let services = Services {
        backend: state.backend.as_ref(),
        mailer: state.mailer.as_ref(),
        email_redirect: &email_redirect,
    };
    let result = workflow::register(
        &services,
        Registration {
            role,
            account: &account,
            documents: &documents,
            reference: &reference,
        },
    )
    .await;

    match result {
        Ok(outcome) => {
            info!(
                "Registration finished for {} ({:?}, {} failed uploads)",
                account.email,
                outcome.completion,
                outcome.failed_uploads.len()
            );
            (
                StatusCode::OK,
                Html(completion(tr, role, &outcome, &state.config.app_auth_url())),
            )
        }
        Err(e) => {
            info!("Registration rejected for {}: {e}", account.email);
            let message = Some(e.message(&tr));
            if e.concerns_account_step() {
                rendering.account_step(e.status(), message)
            } else {
                rendering.documents_step(e.status(), message, &documents)
            }
        }
    }
}
