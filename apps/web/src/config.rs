use anyhow::{Context, Result};

const DEFAULT_APP_URL: &str = "https://app.logbid.co";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Only needed by `setup-storage`; the website itself runs on the anon key.
    pub supabase_service_role_key: Option<String>,
    /// Marketplace application users land on after registering.
    pub app_url: String,
    /// Public origin of this site, used for the sign-up confirmation redirect.
    pub public_url: String,
    pub welcome_email_webhook_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .context("PORT must be a valid port number")?;

        Ok(Config {
            supabase_url: trim_slash(require_env("SUPABASE_URL")?),
            supabase_anon_key: require_env("SUPABASE_ANON_KEY")?,
            supabase_service_role_key: optional_env("SUPABASE_SERVICE_ROLE_KEY"),
            app_url: trim_slash(
                optional_env("APP_URL").unwrap_or_else(|| DEFAULT_APP_URL.to_string()),
            ),
            public_url: trim_slash(
                optional_env("PUBLIC_URL").unwrap_or_else(|| format!("http://localhost:{port}")),
            ),
            welcome_email_webhook_url: optional_env("WELCOME_EMAIL_WEBHOOK_URL"),
            port,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Sign-in page of the marketplace application.
    pub fn app_auth_url(&self) -> String {
        format!("{}/auth", self.app_url)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn trim_slash(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_slash() {
        assert_eq!(trim_slash("https://x.supabase.co/".into()), "https://x.supabase.co");
        assert_eq!(trim_slash("https://x.supabase.co".into()), "https://x.supabase.co");
    }

    #[test]
    fn test_app_auth_url() {
        let config = Config {
            supabase_url: "https://x.supabase.co".into(),
            supabase_anon_key: "anon".into(),
            supabase_service_role_key: None,
            app_url: DEFAULT_APP_URL.into(),
            public_url: "http://localhost:8080".into(),
            welcome_email_webhook_url: None,
            port: 8080,
            rust_log: "info".into(),
        };
        assert_eq!(config.app_auth_url(), "https://app.logbid.co/auth");
    }
}
