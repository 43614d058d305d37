use serde::{Deserialize, Serialize};
use std::env;

/// Process configuration. Constructed once in `main` and passed to the
/// collaborators that need it; nothing here is a global.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub port: u16,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Name of the credential cookie carrying the signed claims token.
    pub cookie_name: String,
    /// HMAC secret the cookie token is signed with.
    pub secret: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        Self {
            environment,
            port: 3000,
            database: DatabaseConfig {
                url: "postgresql://localhost:5432/admin".to_string(),
                max_connections: 10,
                connection_timeout: 30,
            },
            auth: AuthConfig {
                cookie_name: "admin_session".to_string(),
                secret: String::new(),
            },
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("PORT") {
            self.port = v.parse().unwrap_or(self.port);
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout =
                v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("ADMIN_AUTH_COOKIE") {
            self.auth.cookie_name = v;
        }
        if let Ok(v) = env::var("ADMIN_SECRET") {
            self.auth.secret = v;
        }
        self
    }
}
