//! Registration wizard views.

use std::fmt::Write;

use super::{escape, Page};
use crate::backend::ReferenceData;
use crate::i18n::{Language, Translator};
use crate::registration::form::{certification_field, AccountForm, CompanyChoice};
use crate::registration::validation::none_certification_id;
use crate::registration::workflow::{Completion, FailedUpload, RegistrationOutcome};
use crate::registration::{DocumentKind, Role};

/// Seconds before the completion page forwards to the application.
pub const COMPLETION_REFRESH_SECS: u32 = 5;

/// What every wizard step renders from.
pub struct FormView<'a> {
    pub role: Role,
    pub tr: Translator<'a>,
    pub reference: &'a ReferenceData,
    pub account: &'a AccountForm,
    pub error: Option<String>,
    /// Sign-in page for users who already have an account.
    pub sign_in_url: &'a str,
}

impl FormView<'_> {
    fn t(&self, key: &str) -> String {
        escape(&self.tr.t(key))
    }

    fn heading(&self) -> String {
        let (title, subtitle) = match self.role {
            Role::Importer => ("register.importerHeading", "register.joinImporters"),
            Role::Agent => ("register.agentHeading", "register.joinAgents"),
        };
        let error = self
            .error
            .as_deref()
            .map(|message| format!(r#"<div class="error" role="alert">{}</div>"#, escape(message)))
            .unwrap_or_default();
        format!(
            "<h1>{}</h1><p>{}</p>{error}",
            self.t(title),
            self.t(subtitle)
        )
    }

    fn step_marker(&self, step: u8, title_key: &str) -> String {
        format!(
            r#"<p class="hint">{} {step}/2 · {}</p>"#,
            self.t("register.step"),
            self.t(title_key)
        )
    }

    fn page(&self, body: &str) -> String {
        let title = match self.role {
            Role::Importer => self.tr.t("register.importerHeading"),
            Role::Agent => self.tr.t("register.agentHeading"),
        };
        Page::new(self.tr, self.role.path(), title).render(body)
    }
}

fn checked(on: bool) -> &'static str {
    if on {
        " checked"
    } else {
        ""
    }
}

fn selected(on: bool) -> &'static str {
    if on {
        " selected"
    } else {
        ""
    }
}

fn hidden(out: &mut String, name: &str, value: &str) {
    let _ = write!(
        out,
        r#"<input type="hidden" name="{name}" value="{}">"#,
        escape(value)
    );
}

/// Step 1: personal data, credentials, company and markets. Password
/// fields always render empty.
pub fn account_step(view: &FormView<'_>) -> String {
    let account = view.account;
    let mut body = view.heading();
    body.push_str(&view.step_marker(1, "register.personalInfo"));
    let _ = write!(
        body,
        r#"<form method="post" action="{}/step-1" enctype="multipart/form-data">"#,
        view.role.path()
    );

    let _ = write!(
        body,
        r#"<fieldset><legend>{legend}</legend>
<label for="full_name">{name} *</label><input type="text" id="full_name" name="full_name" value="{full_name}" placeholder="{name_ph}" required>
<label for="email">{email} *</label><input type="email" id="email" name="email" value="{email_value}" placeholder="{email_ph}" required>
<label for="phone">{phone} *</label><input type="tel" id="phone" name="phone" value="{phone_value}" placeholder="{phone_ph}" required><p class="hint">{phone_hint}</p>
<label for="language">{language}</label><select id="language" name="language"><option value="es"{es}>{spanish}</option><option value="en"{en}>{english}</option></select>
</fieldset>"#,
        legend = view.t("form.personalInfo"),
        name = view.t("form.name"),
        full_name = escape(&account.full_name),
        name_ph = view.t("form.namePlaceholder"),
        email = view.t("form.email"),
        email_value = escape(&account.email),
        email_ph = view.t("form.emailPlaceholder"),
        phone = view.t("form.phone"),
        phone_value = escape(&account.phone),
        phone_ph = view.t("form.phonePlaceholder"),
        phone_hint = view.t("register.optionalPhoneHint"),
        language = view.t("form.language"),
        es = selected(account.language == Language::Es),
        en = selected(account.language == Language::En),
        spanish = view.t("form.spanish"),
        english = view.t("form.english"),
    );

    let _ = write!(
        body,
        r#"<fieldset><legend>{legend}</legend>
<label for="password">{password} *</label><input type="password" id="password" name="password" placeholder="{password_ph}" minlength="6" required>
<label for="confirm_password">{confirm} *</label><input type="password" id="confirm_password" name="confirm_password" placeholder="{confirm_ph}" minlength="6" required>
</fieldset>"#,
        legend = view.t("form.credentials"),
        password = view.t("form.password"),
        password_ph = view.t("form.passwordPlaceholder"),
        confirm = view.t("form.confirmPassword"),
        confirm_ph = view.t("form.confirmPasswordPlaceholder"),
    );

    let (new_company, new_name, existing_id) = match &account.company {
        CompanyChoice::New(name) => (true, name.as_str(), None),
        CompanyChoice::Existing(id) => (false, "", Some(*id)),
        CompanyChoice::None => (false, "", None),
    };
    let _ = write!(
        body,
        r#"<fieldset><legend>{legend}</legend>
<div class="checks"><label><input type="checkbox" name="company_mode" value="new"{new_checked}> {create}</label></div>
<label for="company_name">{company_name}</label><input type="text" id="company_name" name="company_name" value="{new_name}" placeholder="{company_ph}">
<label for="company_id">{existing}</label><select id="company_id" name="company_id"><option value="">{select}</option>"#,
        legend = view.t("form.company"),
        new_checked = checked(new_company),
        create = view.t("form.createNewCompany"),
        company_name = view.t("form.companyName"),
        new_name = escape(new_name),
        company_ph = view.t("form.companyNamePlaceholder"),
        existing = view.t("form.existingCompany"),
        select = view.t("form.selectCompany"),
    );
    for company in &view.reference.companies {
        let _ = write!(
            body,
            r#"<option value="{}"{}>{}</option>"#,
            company.id,
            selected(existing_id == Some(company.id)),
            escape(&company.name)
        );
    }
    body.push_str("</select></fieldset>");

    let markets_hint = match view.role {
        Role::Importer => "form.marketsDescription",
        Role::Agent => "form.marketsAgentDescription",
    };
    let _ = write!(
        body,
        r#"<fieldset><legend>{} *</legend><p class="hint">{}</p><div class="checks">"#,
        view.t("form.markets"),
        view.t(markets_hint)
    );
    for market in &view.reference.markets {
        let _ = write!(
            body,
            r#"<label><input type="checkbox" name="markets" value="{}"{}> {}</label>"#,
            market.id,
            checked(account.markets.contains(&market.id)),
            escape(&market.name)
        );
    }
    let _ = write!(
        body,
        r#"</div></fieldset><button class="button" type="submit">{}</button></form><p><a href="{}">{}</a></p>"#,
        view.t("register.nextDocuments"),
        escape(view.sign_in_url),
        view.t("register.alreadyHaveAccount"),
    );

    view.page(&body)
}

/// Step-1 values as hidden inputs so the final submission carries them.
fn account_hidden_fields(account: &AccountForm) -> String {
    let mut out = String::new();
    hidden(&mut out, "full_name", &account.full_name);
    hidden(&mut out, "email", &account.email);
    hidden(&mut out, "phone", &account.phone);
    hidden(&mut out, "password", &account.password);
    hidden(&mut out, "confirm_password", &account.confirm_password);
    hidden(&mut out, "language", account.language.as_str());
    match &account.company {
        CompanyChoice::New(name) => {
            hidden(&mut out, "company_mode", "new");
            hidden(&mut out, "company_name", name);
        }
        CompanyChoice::Existing(id) => hidden(&mut out, "company_id", &id.to_string()),
        CompanyChoice::None => {}
    }
    for market in &account.markets {
        hidden(&mut out, "markets", &market.to_string());
    }
    out
}

/// Step 2: legal documents and, for agents, certifications. Files are
/// never pre-filled; `rut_number` and `certifications` are echoed back.
pub fn documents_step(view: &FormView<'_>, rut_number: &str, certifications: &[i64]) -> String {
    let mut body = view.heading();
    body.push_str(&view.step_marker(2, "register.documents"));
    let _ = write!(
        body,
        r#"<form method="post" action="{}" enctype="multipart/form-data">{}"#,
        view.role.path(),
        account_hidden_fields(view.account)
    );

    let section = match view.role {
        Role::Importer => ("register.importerDocuments", "register.requiredDocuments"),
        Role::Agent => ("register.legalDocuments", "register.legalDocumentsDescription"),
    };
    let _ = write!(
        body,
        r#"<fieldset><legend>{}</legend><p class="hint">{}</p>
<label for="rut_number">{} *</label><input type="text" id="rut_number" name="rut_number" value="{}" placeholder="{}" required>"#,
        view.t(section.0),
        view.t(section.1),
        view.t("register.rutNumber"),
        escape(rut_number),
        view.t("register.rutPlaceholder"),
    );
    for kind in DocumentKind::ALL {
        let _ = write!(
            body,
            r#"<label for="{field}">{label} *</label><input type="file" id="{field}" name="{field}" accept="application/pdf,.pdf" required>"#,
            field = kind.field_name(),
            label = view.t(kind.label_key()),
        );
        if kind == DocumentKind::ChamberOfCommerce {
            let _ = write!(
                body,
                r#"<p class="hint">{}</p>"#,
                view.t("register.chamberOfCommerceValidation")
            );
        }
    }
    body.push_str("</fieldset>");

    if view.role.has_certifications() {
        let none_id = none_certification_id(view.reference);
        let _ = write!(
            body,
            r#"<fieldset><legend>{}</legend><p class="hint">{}</p><div class="checks">"#,
            view.t("register.certificationsTitle"),
            view.t("register.certificationsDescription"),
        );
        for certification in &view.reference.certifications {
            let _ = write!(
                body,
                r#"<label><input type="checkbox" name="certifications" value="{}"{}> {}</label>"#,
                certification.id,
                checked(certifications.contains(&certification.id)),
                escape(&certification.name)
            );
        }
        let _ = write!(
            body,
            r#"</div></fieldset><fieldset><legend>{}</legend><p class="hint">{}</p>"#,
            view.t("register.certificationDocumentsTitle"),
            view.t("register.certificationDocumentsDescription"),
        );
        for certification in view
            .reference
            .certifications
            .iter()
            .filter(|c| c.id != none_id)
        {
            let field = certification_field(certification.id);
            let _ = write!(
                body,
                r#"<label for="{field}">{}</label><input type="file" id="{field}" name="{field}" accept="application/pdf,.pdf">"#,
                escape(
                    &view
                        .tr
                        .t_with("register.certificationFile", &[("name", certification.name.as_str())])
                ),
            );
        }
        body.push_str("</fieldset>");
    }

    let create = match view.role {
        Role::Importer => "register.createImporterAccount",
        Role::Agent => "register.createAgentAccount",
    };
    let _ = write!(
        body,
        r#"<p><button class="button secondary" type="submit" formaction="{path}/step-1" formnovalidate name="action" value="back">{previous}</button> <button class="button" type="submit">{create}</button></p></form>"#,
        path = view.role.path(),
        previous = view.t("register.previous"),
        create = view.t(create),
    );

    view.page(&body)
}

fn failed_upload_label(tr: &Translator<'_>, failed: &FailedUpload) -> String {
    match failed {
        FailedUpload::Document(kind) => tr.t(kind.label_key()),
        FailedUpload::Certification { name, .. } => {
            tr.t_with("register.certificationFile", &[("name", name.as_str())])
        }
    }
}

/// Shown after the workflow finished; forwards to the application.
pub fn completion(
    tr: Translator<'_>,
    role: Role,
    outcome: &RegistrationOutcome,
    app_auth_url: &str,
) -> String {
    let t = |key: &str| escape(&tr.t(key));
    let mut body = format!(r#"<section class="notice"><h1>{}</h1>"#, t("notices.title"));
    match outcome.completion {
        Completion::Welcome => {
            let _ = write!(
                body,
                "<p>{}</p><p>{}</p>",
                t("notices.welcome"),
                t("notices.checkEmail")
            );
        }
        Completion::SignInManually => {
            let _ = write!(body, "<p>{}</p>", t("notices.loginFailed"));
        }
    }
    if !outcome.failed_uploads.is_empty() {
        let documents: Vec<String> = outcome
            .failed_uploads
            .iter()
            .map(|failed| failed_upload_label(&tr, failed))
            .collect();
        let _ = write!(
            body,
            r#"<p class="error">{}</p>"#,
            escape(&tr.t_with(
                "notices.uploadsFailed",
                &[("documents", documents.join(", ").as_str())]
            ))
        );
    }
    let _ = write!(
        body,
        r#"<p><a class="button" href="{}">{}</a></p></section>"#,
        escape(app_auth_url),
        t("notices.continue")
    );

    Page::new(tr, role.path(), tr.t("notices.title"))
        .refresh_to(COMPLETION_REFRESH_SECS, app_auth_url)
        .render(&body)
}
