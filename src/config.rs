use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub mail: Option<MailConfig>,
}

/// SMTP relay used to send bills. Mail is disabled when `SMTP_HOST` is unset.
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            port,
            database_url,
            host,
            mail: MailConfig::from_env()?,
        })
    }
}

impl MailConfig {
    pub fn from_env() -> anyhow::Result<Option<Self>> {
        let host = match env::var("SMTP_HOST") {
            Ok(host) if !host.trim().is_empty() => host,
            _ => return Ok(None),
        };
        let port = env::var("SMTP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(587);
        let username = env::var("SMTP_USERNAME").ok().filter(|u| !u.is_empty());
        let password = env::var("SMTP_PASSWORD").ok().filter(|p| !p.is_empty());
        let from = match env::var("SMTP_FROM") {
            Ok(from) => from,
            Err(_) => username
                .clone()
                .ok_or_else(|| anyhow::anyhow!("SMTP_FROM or SMTP_USERNAME must be set"))?,
        };
        Ok(Some(Self {
            host,
            port,
            username,
            password,
            from,
        }))
    }
}
