use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::{DbPool, OrmConn, create_orm_conn},
    integrations::{
        mailer::{LogMailer, Mailer, SmtpMailer},
        payments::{DisabledGateway, PaymentGateway, StripeGateway},
    },
    session::SessionKeys,
};

/// Shared handles, built once at startup and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub sessions: SessionKeys,
    pub mailer: Arc<dyn Mailer>,
    pub payments: Arc<dyn PaymentGateway>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire real clients from config: SMTP and Stripe when configured,
    /// log-only mail and a refusing gateway otherwise.
    pub fn new(config: AppConfig, pool: DbPool) -> anyhow::Result<Self> {
        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp, config.outbound_timeout)?),
            None => {
                tracing::warn!("SMTP is not configured; emails will only be logged");
                Arc::new(LogMailer)
            }
        };
        let payments: Arc<dyn PaymentGateway> = match &config.stripe_secret_key {
            Some(key) => Arc::new(StripeGateway::new(
                key.clone(),
                config.stripe_api_base.clone(),
                config.outbound_timeout,
            )?),
            None => {
                tracing::warn!("STRIPE_SECRET_KEY is not set; checkout is disabled");
                Arc::new(DisabledGateway)
            }
        };
        Ok(Self::with_clients(config, pool, mailer, payments))
    }

    pub fn with_clients(
        config: AppConfig,
        pool: DbPool,
        mailer: Arc<dyn Mailer>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        let sessions = SessionKeys::new(
            &config.jwt_secret,
            chrono::Duration::hours(config.jwt_ttl_hours),
        );
        Self {
            orm: create_orm_conn(&pool),
            pool,
            sessions,
            mailer,
            payments,
            config: Arc::new(config),
        }
    }
}
