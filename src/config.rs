use std::env;
use std::path::PathBuf;

const DEFAULT_UPLOAD_DIR: &str = "uploads/business_images";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub session_ttl_hours: i64,
    /// `None` allows any origin.
    pub cors_origin: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| "DATABASE_URL must be set in environment".to_string())?;

        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| format!("PORT must be a valid port number, got '{raw}'"))?,
            None => 5000,
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(raw) => raw
                .parse::<usize>()
                .map_err(|_| format!("MAX_UPLOAD_BYTES must be a byte count, got '{raw}'"))?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        let session_ttl_hours = match lookup("SESSION_TTL_HOURS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|hours| (1..=MAX_SESSION_TTL_HOURS).contains(hours))
                .ok_or_else(|| {
                    format!("SESSION_TTL_HOURS must be between 1 and {MAX_SESSION_TTL_HOURS}, got '{raw}'")
                })?,
            None => DEFAULT_SESSION_TTL_HOURS,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            database_url,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_bytes,
            session_ttl_hours,
            cors_origin: lookup("CORS_ORIGIN").filter(|v| !v.trim().is_empty() && v != "*"),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
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
    fn defaults_apply_when_only_database_url_is_set() {
        let config =
            AppConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/dir")]))
                .unwrap();

        assert_eq!(config.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.upload_dir, PathBuf::from("uploads/business_images"));
        assert_eq!(config.max_upload_bytes, 5 * 1024 * 1024);
        assert_eq!(config.session_ttl_hours, 12);
        assert!(config.cors_origin.is_none());
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[("PORT", "8080")])).unwrap_err();
        assert!(err.contains("DATABASE_URL"));
    }

    #[test]
    fn rejects_bad_port_and_ttl() {
        let bad_port = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/dir"),
            ("PORT", "eighty"),
        ]));
        assert!(bad_port.is_err());

        let bad_ttl = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/dir"),
            ("SESSION_TTL_HOURS", "0"),
        ]));
        assert!(bad_ttl.is_err());
    }

    #[test]
    fn session_ttl_is_bounded() {
        let one_year = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/dir"),
            ("SESSION_TTL_HOURS", "8760"),
        ]))
        .unwrap();
        assert_eq!(one_year.session_ttl_hours, MAX_SESSION_TTL_HOURS);

        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/dir"),
            ("SESSION_TTL_HOURS", "3000000000"),
        ]))
        .unwrap_err();
        assert!(err.contains("SESSION_TTL_HOURS"));
    }

    #[test]
    fn wildcard_cors_origin_means_any() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/dir"),
            ("CORS_ORIGIN", "*"),
        ]))
        .unwrap();
        assert!(config.cors_origin.is_none());
    }
}
