use std::env;

/// Process configuration, read from the environment once at startup and
/// injected into handlers via `web::Data`.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    /// When both are set, an admin account is seeded at startup.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Config {
        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            log::warn!("JWT_SECRET not set, falling back to an insecure development secret");
            "internlink-dev-secret".to_string()
        });

        Config {
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "internlink.db".to_string()),
            jwt_secret,
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_path_defaults_when_unset() {
        env::remove_var("DATABASE_PATH");
        let cfg = Config::from_env();
        assert_eq!(cfg.database_path, "internlink.db");
    }

    #[test]
    fn port_parses_from_env() {
        env::set_var("PORT", "9100");
        let cfg = Config::from_env();
        assert_eq!(cfg.port, 9100);
        env::remove_var("PORT");
    }
}
