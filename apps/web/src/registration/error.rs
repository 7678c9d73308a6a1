use axum::http::StatusCode;
use thiserror::Error;

use super::validation::Invalid;
use crate::backend::BackendError;
use crate::i18n::Translator;

/// Why a registration stopped. Shown to the user on the form.
#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Invalid submission: {0}")]
    Invalid(#[from] Invalid),

    #[error("Reference data unavailable: {0}")]
    ReferenceData(BackendError),

    #[error("Email lookup failed: {0}")]
    EmailCheck(BackendError),

    #[error("Phone lookup failed: {0}")]
    PhoneCheck(BackendError),

    #[error("Email already has a profile")]
    EmailTaken {
        /// When the existing profile was created, if shown to the user.
        since: Option<String>,
    },

    #[error("Phone {phone} already has a profile")]
    PhoneTaken { phone: String },

    #[error("Auth user already registered")]
    AlreadyRegistered,

    #[error("Sign-up email rate limit reached")]
    EmailRateLimited,

    #[error("Sign-up failed: {0}")]
    SignUp(BackendError),

    #[error("Sign-up returned no user")]
    UserNotCreated,

    #[error("Company creation failed: {0}")]
    CompanyCreate(BackendError),

    #[error("Profile update failed: {0}")]
    Profile(BackendError),

    #[error("Market assignment failed: {0}")]
    Markets(BackendError),
}

impl RegistrationError {
    pub fn status(&self) -> StatusCode {
        match self {
            RegistrationError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RegistrationError::EmailTaken { .. }
            | RegistrationError::PhoneTaken { .. }
            | RegistrationError::AlreadyRegistered => StatusCode::CONFLICT,
            RegistrationError::EmailRateLimited => StatusCode::TOO_MANY_REQUESTS,
            RegistrationError::ReferenceData(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        }
    }

    /// Localized message for the form banner.
    pub fn message(&self, tr: &Translator<'_>) -> String {
        match self {
            RegistrationError::Invalid(invalid) => {
                let vars = invalid.vars();
                let vars: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
                tr.t_with(invalid.message_key(), &vars)
            }
            RegistrationError::ReferenceData(_) => tr.t("errors.catalogUnavailable"),
            RegistrationError::EmailCheck(_) => tr.t("errors.emailCheckFailed"),
            RegistrationError::PhoneCheck(_) => tr.t("errors.phoneCheckFailed"),
            RegistrationError::EmailTaken { since: None } => tr.t("errors.emailTaken"),
            RegistrationError::EmailTaken { since: Some(since) } => {
                tr.t_with("errors.emailTakenSince", &[("since", since.as_str())])
            }
            RegistrationError::PhoneTaken { phone } => {
                tr.t_with("errors.phoneTaken", &[("phone", phone.as_str())])
            }
            RegistrationError::AlreadyRegistered => tr.t("errors.alreadyRegistered"),
            RegistrationError::EmailRateLimited => tr.t("errors.emailRateLimited"),
            RegistrationError::SignUp(e) => {
                tr.t_with("errors.signUpFailed", &[("message", e.message().as_str())])
            }
            RegistrationError::UserNotCreated => tr.t("errors.userNotCreated"),
            RegistrationError::CompanyCreate(e) => {
                tr.t_with("errors.companyCreateFailed", &[("message", e.message().as_str())])
            }
            RegistrationError::Profile(e) => {
                tr.t_with("errors.profileFailed", &[("message", e.message().as_str())])
            }
            RegistrationError::Markets(e) => {
                tr.t_with("errors.marketsFailed", &[("message", e.message().as_str())])
            }
        }
    }

    /// Whether the failure belongs on the first form step.
    pub fn concerns_account_step(&self) -> bool {
        match self {
            RegistrationError::Invalid(invalid) => matches!(
                invalid,
                Invalid::NameRequired
                    | Invalid::EmailRequired
                    | Invalid::EmailInvalid
                    | Invalid::PhoneRequired
                    | Invalid::PasswordRequired
                    | Invalid::PasswordTooShort
                    | Invalid::PasswordMismatch
                    | Invalid::MarketsRequired
                    | Invalid::UnknownMarket(_)
                    | Invalid::CompanyNameRequired
                    | Invalid::UnknownCompany(_)
            ),
            RegistrationError::EmailTaken { .. }
            | RegistrationError::PhoneTaken { .. }
            | RegistrationError::AlreadyRegistered => true,
            _ => false,
        }
    }
}

/// Maps a sign-up failure onto the cases the form explains specifically.
pub fn classify_sign_up_error(error: BackendError, phone: &str) -> RegistrationError {
    let message = error.message();
    if message.contains("users_phone_key") {
        RegistrationError::PhoneTaken {
            phone: phone.to_string(),
        }
    } else if message.contains("User already registered") {
        RegistrationError::AlreadyRegistered
    } else if message.to_ascii_lowercase().contains("rate limit") {
        RegistrationError::EmailRateLimited
    } else {
        RegistrationError::SignUp(error)
    }
}

pub fn classify_profile_error(error: BackendError) -> RegistrationError {
    if error.message().contains("profiles_email_key") {
        RegistrationError::EmailTaken { since: None }
    } else {
        RegistrationError::Profile(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::{Catalog, Language};

    fn api(message: &str) -> BackendError {
        BackendError::Api {
            status: 400,
            message: message.to_string(),
        }
    }

    #[test]
    fn test_classify_sign_up_errors() {
        assert!(matches!(
            classify_sign_up_error(
                api("duplicate key value violates unique constraint \"users_phone_key\""),
                "+57300"
            ),
            RegistrationError::PhoneTaken { phone } if phone == "+57300"
        ));
        assert!(matches!(
            classify_sign_up_error(api("User already registered"), ""),
            RegistrationError::AlreadyRegistered
        ));
        assert!(matches!(
            classify_sign_up_error(api("Email rate limit exceeded"), ""),
            RegistrationError::EmailRateLimited
        ));
        assert!(matches!(
            classify_sign_up_error(api("Signups not allowed"), ""),
            RegistrationError::SignUp(_)
        ));
    }

    #[test]
    fn test_classify_profile_errors() {
        assert!(matches!(
            classify_profile_error(api(
                "duplicate key value violates unique constraint \"profiles_email_key\""
            )),
            RegistrationError::EmailTaken { since: None }
        ));
        assert!(matches!(
            classify_profile_error(api("permission denied")),
            RegistrationError::Profile(_)
        ));
    }

    #[test]
    fn test_localized_messages() {
        let catalog = Catalog::embedded().unwrap();
        let es = catalog.translator(Language::Es);
        let en = catalog.translator(Language::En);

        assert_eq!(
            RegistrationError::SignUp(api("boom")).message(&es),
            "Error al crear usuario: boom"
        );
        assert_eq!(
            RegistrationError::Invalid(Invalid::FileTooLarge("rut.pdf".into())).message(&en),
            "rut.pdf is larger than 10MB"
        );
        assert_eq!(
            RegistrationError::EmailTaken { since: None }.message(&en),
            "This email is already registered. Please use a different email."
        );
        assert_eq!(
            RegistrationError::EmailTaken {
                since: Some("2024-05-01".into())
            }
            .message(&es),
            "Este email ya está registrado (desde 2024-05-01). Por favor usa un email diferente."
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            RegistrationError::Invalid(Invalid::NameRequired).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            RegistrationError::EmailTaken { since: None }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            RegistrationError::Markets(api("x")).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            RegistrationError::Profile(api("permission denied")).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_account_step_errors() {
        assert!(RegistrationError::Invalid(Invalid::PasswordMismatch).concerns_account_step());
        assert!(RegistrationError::EmailTaken { since: None }.concerns_account_step());
        assert!(!RegistrationError::Invalid(Invalid::RutNumberRequired).concerns_account_step());
        assert!(!RegistrationError::UserNotCreated.concerns_account_step());
        assert!(!RegistrationError::Profile(api("permission denied")).concerns_account_step());
    }
}
