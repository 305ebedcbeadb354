//! `atelier-admin check-config`: validate the deployment environment.
//!
//! Parses every configuration group the server reads at startup, then
//! checks the database and the storage disk. Missing optional integrations
//! (SMTP, Stripe) are warnings; anything that would stop the server from
//! booting or serving is an error.

use std::time::Duration;

use atelier_api::config::ServerConfig;
use atelier_events::mail::EmailConfig;
use atelier_storage::config::StorageConfig;

/// Key looked up on the storage disk. It does not need to exist.
const STORAGE_CHECK_KEY: &str = ".atelier-check";

const DB_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Default)]
pub struct CheckReport {
    pub passed: Vec<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl CheckReport {
    pub fn pass(&mut self, message: impl Into<String>) {
        self.passed.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn print(&self) {
        for line in &self.passed {
            println!("  ok    {line}");
        }
        for line in &self.warnings {
            println!("  warn  {line}");
        }
        for line in &self.errors {
            println!("  error {line}");
        }
        println!(
            "\n{} passed, {} warnings, {} errors",
            self.passed.len(),
            self.warnings.len(),
            self.errors.len()
        );
    }
}

/// Settings the live checks need, present only when they parsed.
#[derive(Debug, Default)]
pub struct CheckTargets {
    pub database_url: Option<String>,
    pub storage: Option<StorageConfig>,
}

/// Parse every configuration group without touching the network.
pub fn check_settings(get: &dyn Fn(&str) -> Option<String>) -> (CheckReport, CheckTargets) {
    let mut report = CheckReport::default();
    let mut targets = CheckTargets::default();

    match get("DATABASE_URL").filter(|v| !v.trim().is_empty()) {
        Some(url) => {
            report.pass("DATABASE_URL is set");
            targets.database_url = Some(url);
        }
        None => report.error("DATABASE_URL must be set"),
    }

    match ServerConfig::from_lookup(get) {
        Ok(config) => {
            report.pass(format!("server: {}:{}", config.host, config.port));
            report.pass(format!(
                "uploads: {} bytes per file, {} per batch",
                config.upload.max_upload_bytes, config.upload.max_batch_bytes
            ));
            check_stripe(&config, &mut report);
        }
        Err(e) => report.error(format!("server: {e}")),
    }

    match StorageConfig::from_lookup(get) {
        Ok(storage) => {
            report.pass(format!("storage: {} disk", storage.disk));
            targets.storage = Some(storage);
        }
        Err(e) => report.error(format!("storage: {e}")),
    }

    match EmailConfig::from_lookup(get) {
        Some(email) => report.pass(format!("smtp: {}:{}", email.smtp_host, email.smtp_port)),
        None => report.warn("smtp: SMTP_HOST is unset, emails are only logged"),
    }

    (report, targets)
}

fn check_stripe(config: &ServerConfig, report: &mut CheckReport) {
    let stripe = &config.stripe;
    if stripe.secret_key.is_none() {
        report.warn("stripe: STRIPE_SECRET_KEY is unset, checkout is disabled");
        return;
    }
    report.pass("stripe: secret key present");

    if stripe.webhook_secret.is_none() {
        report.error("stripe: STRIPE_WEBHOOK_SECRET is required when checkout is enabled");
    }

    let prices = [
        ("pro", &stripe.price_pro),
        ("team", &stripe.price_team),
        ("enterprise", &stripe.price_enterprise),
    ];
    for (tier, price) in prices {
        if price.is_none() {
            report.warn(format!("stripe: no price configured for the {tier} tier"));
        }
    }
}

/// Run [`check_settings`] and then the live database and storage checks.
pub async fn run(get: &dyn Fn(&str) -> Option<String>) -> CheckReport {
    let (mut report, targets) = check_settings(get);

    if let Some(url) = targets.database_url {
        check_database(&url, &mut report).await;
    }
    if let Some(storage) = targets.storage {
        check_storage(&storage, &mut report).await;
    }

    report
}

async fn check_database(url: &str, report: &mut CheckReport) {
    let pool = match tokio::time::timeout(DB_CONNECT_TIMEOUT, atelier_db::create_pool(url)).await
    {
        Ok(Ok(pool)) => pool,
        Ok(Err(e)) => {
            report.error(format!("database: connection failed: {e}"));
            return;
        }
        Err(_) => {
            report.error(format!(
                "database: no connection after {}s",
                DB_CONNECT_TIMEOUT.as_secs()
            ));
            return;
        }
    };

    match atelier_db::health_check(&pool).await {
        Ok(()) => report.pass("database: SELECT 1 succeeded"),
        Err(e) => report.error(format!("database: health check failed: {e}")),
    }
    pool.close().await;
}

async fn check_storage(config: &StorageConfig, report: &mut CheckReport) {
    let disk = match atelier_storage::build_disk(config).await {
        Ok(disk) => disk,
        Err(e) => {
            report.error(format!("storage: {e}"));
            return;
        }
    };

    match disk.exists(STORAGE_CHECK_KEY).await {
        Ok(_) => report.pass(format!("storage: {} disk reachable", disk.name())),
        Err(e) => report.error(format!("storage: lookup failed: {e}")),
    }
}
