use std::env;

/// Runtime configuration, loaded once at startup. Components that talk to
/// the outside world (gateway client, mailer, token issuing) receive their
/// slice of this at construction instead of reading the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub auth: AuthConfig,
    pub gateway: GatewayConfig,
    pub smtp: SmtpConfig,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub key_id: String,
    pub key_secret: String,
    pub currency: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub relay: String,
    pub username: String,
    pub password: String,
    pub sender: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let get_env = |name: &str| {
            env::var(name).map_err(|e| format!("missing environment variable {}: {}", name, e))
        };

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_owned());
        let database_url = get_env("DATABASE_URL")?;

        let auth = AuthConfig {
            access_secret: get_env("JWT_ACCESS_SECRET")?,
            refresh_secret: get_env("JWT_REFRESH_SECRET")?,
            access_ttl_secs: parse_env("JWT_ACCESS_TTL_SECS", 900)?,
            refresh_ttl_secs: parse_env("JWT_REFRESH_TTL_SECS", 604_800)?,
        };

        let gateway = GatewayConfig {
            base_url: env::var("GATEWAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_owned()),
            key_id: get_env("GATEWAY_KEY_ID")?,
            key_secret: get_env("GATEWAY_KEY_SECRET")?,
            currency: env::var("GATEWAY_CURRENCY").unwrap_or_else(|_| "INR".to_owned()),
            timeout_secs: parse_env("GATEWAY_TIMEOUT_SECS", 10)?,
        };

        let smtp = SmtpConfig {
            relay: env::var("SMTP_RELAY").unwrap_or_else(|_| "smtp.gmail.com".to_owned()),
            username: get_env("SMTP_USERNAME")?,
            password: get_env("SMTP_PASSWORD")?,
            sender: env::var("SMTP_SENDER").unwrap_or_else(|_| "no-reply@storefront.shop".to_owned()),
        };

        Ok(Self {
            bind_addr,
            database_url,
            auth,
            gateway,
            smtp,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| format!("invalid {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}
