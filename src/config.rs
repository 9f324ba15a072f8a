use std::path::PathBuf;

use crate::errors::AppError;

const DEFAULT_PORT: u16 = 8000;

/// Process-level settings read from the environment.
///
/// `JWT_*` variables are read separately by [`crate::jwt::JwtConfig`].
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub port: u16,
    pub tls: Option<TlsPaths>,
}

#[derive(Debug, Clone)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| AppError::configuration("DATABASE_URL not set"))?;

        let port = match std::env::var("APP_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| AppError::configuration("APP_PORT must be a valid port number"))?,
            Err(_) => DEFAULT_PORT,
        };

        let tls = match (std::env::var("TLS_CERT_PATH").ok(), std::env::var("TLS_KEY_PATH").ok()) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            _ => {
                return Err(AppError::configuration(
                    "TLS_CERT_PATH and TLS_KEY_PATH must be set together",
                ))
            }
        };

        Ok(Self { database_url, port, tls })
    }
}

/// Loads `.env` from the working directory, falling back to the crate directory.
pub fn load_env() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(crate_env);
}
