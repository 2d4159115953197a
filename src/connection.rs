use crate::client::{ftp::FtpClient, webdav::WebDavClient, RemoteFileSystem};
use crate::config::Config;
use crate::error::{Error, Result};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Hands out one client per protocol, created on first use, so that all
/// calls for a protocol share that client's connection group.
pub struct ConnectionManager {
    config: Config,
    ftp: Option<Arc<FtpClient>>,
    webdav: Option<Arc<WebDavClient>>,
}

impl ConnectionManager {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            ftp: None,
            webdav: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Picks the client whose protocol matches the scheme of `address`.
    pub fn client_for(&mut self, address: &str) -> Result<Arc<dyn RemoteFileSystem>> {
        if address.trim().is_empty() {
            return Err(Error::NullArgument);
        }
        let url = Url::parse(address).map_err(|e| Error::invalid_address(address, e.to_string()))?;

        match url.scheme() {
            "ftp" => {
                if let Some(client) = &self.ftp {
                    return Ok(client.clone());
                }
                debug!(limit = self.config.connection_limit, "creating ftp client");
                let client = Arc::new(FtpClient::with_connection_limit(
                    self.config.credentials(),
                    self.config.connection_limit,
                ));
                self.ftp = Some(client.clone());
                Ok(client)
            }
            "http" | "https" => {
                if let Some(client) = &self.webdav {
                    return Ok(client.clone());
                }
                debug!(limit = self.config.connection_limit, "creating webdav client");
                let client = Arc::new(WebDavClient::with_connection_limit(
                    self.config.credentials(),
                    self.config.connection_limit,
                )?);
                self.webdav = Some(client.clone());
                Ok(client)
            }
            other => Err(Error::invalid_address(
                address,
                format!("unsupported scheme `{other}`, expected ftp, http or https"),
            )),
        }
    }
}
