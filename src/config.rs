use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub max_db_connections: u32,
    pub run_migrations: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| AppError::EnvError("DATABASE_URL must be set".into()))?;
        let jwt_secret = lookup("JWT_SECRET")
            .ok_or_else(|| AppError::EnvError("JWT_SECRET must be set".into()))?;

        let port = lookup("PORT")
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(3001);

        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_db_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(10);

        let run_migrations = lookup("RUN_MIGRATIONS")
            .map(|s| matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        Ok(Self {
            database_url,
            jwt_secret,
            port,
            allowed_origins,
            max_db_connections,
            run_migrations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/reviews"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();

        assert_eq!(config.port, 3001);
        assert_eq!(config.allowed_origins, vec!["http://localhost:3000"]);
        assert_eq!(config.max_db_connections, 10);
        assert!(!config.run_migrations);
    }

    #[test]
    fn parses_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/reviews"),
            ("JWT_SECRET", "secret"),
            ("PORT", "8080"),
            ("ALLOWED_ORIGINS", "https://a.example, https://b.example"),
            ("DATABASE_MAX_CONNECTIONS", "25"),
            ("RUN_MIGRATIONS", "true"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(
            config.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        assert_eq!(config.max_db_connections, 25);
        assert!(config.run_migrations);
    }

    #[test]
    fn missing_database_url_is_an_env_error() {
        let result = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "secret")]));
        assert!(matches!(result, Err(AppError::EnvError(_))));
    }
}
