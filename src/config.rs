use std::{env, time::Duration};

use crate::domain::TransitionPolicy;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub client_url: String,
    pub cors_origin: String,
    pub currency: String,
    pub smtp: Option<SmtpConfig>,
    pub stripe_secret_key: Option<String>,
    pub stripe_webhook_secret: Option<String>,
    pub stripe_api_base: String,
    pub outbound_timeout: Duration,
    pub transition_policy: TransitionPolicy,
    /// Key rate limits on `X-Forwarded-For` / `X-Real-IP`. Only safe behind a
    /// proxy that overwrites them.
    pub trust_proxy_headers: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET is not set"))?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let jwt_ttl_hours = env::var("JWT_TTL_HOURS")
            .ok()
            .and_then(|h| h.parse::<i64>().ok())
            .filter(|h| *h > 0)
            .unwrap_or(24 * 30);
        let client_url = env::var("CLIENT_URL")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .trim_end_matches('/')
            .to_string();
        let cors_origin = env::var("CORS_ORIGIN").unwrap_or_else(|_| client_url.clone());
        let currency = env::var("CURRENCY")
            .unwrap_or_else(|_| "usd".to_string())
            .to_ascii_lowercase();
        let outbound_timeout = env::var("OUTBOUND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(10));
        let transition_policy = match env::var("ORDER_TRANSITION_POLICY") {
            Ok(raw) => raw.parse()?,
            Err(_) => TransitionPolicy::default(),
        };

        let trust_proxy_headers = env::var("TRUST_PROXY_HEADERS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            host,
            port,
            jwt_secret,
            jwt_ttl_hours,
            client_url,
            cors_origin,
            currency,
            smtp: smtp_from_env(),
            stripe_secret_key: non_empty_var("STRIPE_SECRET_KEY"),
            stripe_webhook_secret: non_empty_var("STRIPE_WEBHOOK_SECRET"),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".to_string()),
            outbound_timeout,
            transition_policy,
            trust_proxy_headers,
        })
    }

    /// Defaults for tests and tooling that never touch the outside world.
    pub fn for_tests(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            host: "127.0.0.1".into(),
            port: 0,
            jwt_secret: "test-secret-please-change-me-0123456789".into(),
            jwt_ttl_hours: 1,
            client_url: "http://localhost:5173".into(),
            cors_origin: "http://localhost:5173".into(),
            currency: "usd".into(),
            smtp: None,
            stripe_secret_key: None,
            stripe_webhook_secret: Some("whsec_test".into()),
            stripe_api_base: "http://127.0.0.1:9".into(),
            outbound_timeout: Duration::from_secs(2),
            transition_policy: TransitionPolicy::Permissive,
            trust_proxy_headers: false,
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

// Mail stays disabled (log-only) unless host and credentials are all present.
fn smtp_from_env() -> Option<SmtpConfig> {
    let host = non_empty_var("SMTP_HOST")?;
    let username = non_empty_var("SMTP_USERNAME")?;
    let password = non_empty_var("SMTP_PASSWORD")?;
    let port = env::var("SMTP_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(587);
    let from = non_empty_var("EMAIL_FROM").unwrap_or_else(|| "no-reply@exporium.com".to_string());
    Some(SmtpConfig {
        host,
        port,
        username,
        password,
        from,
    })
}
