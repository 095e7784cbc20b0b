//! Failures raised while standing up the process: sockets, the media
//! directory, the database pool, logging.

use std::{net::SocketAddr, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to bind {addr}")]
    Listener {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("media directory {directory:?} is unusable")]
    MediaStorage {
        directory: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("database error: {message}")]
    Database { message: String },
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {message}")]
    Configuration { message: String },
}

impl InfraError {
    pub fn listener(addr: SocketAddr, source: std::io::Error) -> Self {
        Self::Listener { addr, source }
    }

    pub fn media_storage(directory: PathBuf, source: std::io::Error) -> Self {
        Self::MediaStorage { directory, source }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_failures_name_the_resource() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let bind = InfraError::listener(
            addr,
            std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use"),
        );
        assert_eq!(bind.to_string(), "failed to bind 127.0.0.1:8080");

        let media = InfraError::media_storage(
            PathBuf::from("/var/lib/tertulia/media"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            media.to_string(),
            "media directory \"/var/lib/tertulia/media\" is unusable"
        );
    }
}
