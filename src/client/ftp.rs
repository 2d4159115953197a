use super::{check_address, read_source, Credentials, RemoteFileSystem, SourceStream};
use crate::entry::{EntryKind, FileEntry};
use crate::error::{Error, Result};
use crate::listing;
use crate::pool::{ConnectionGroup, DEFAULT_CONNECTION_LIMIT};
use async_trait::async_trait;
use percent_encoding::percent_decode_str;
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};
use suppaftp::types::FileType;
use suppaftp::{FtpResult, FtpStream};
use tracing::{debug, warn};
use url::Url;

const SCHEMES: &[&str] = &["ftp"];
pub const CONNECTION_GROUP: &str = "remote-fs.ftp";

type IdleConnections = Arc<Mutex<HashMap<String, Vec<FtpStream>>>>;

/// FTP implementation of [`RemoteFileSystem`].
///
/// Logged-in control connections are kept open after a successful command
/// and reused by later requests to the same host, up to the connection
/// group's limit. A connection whose command failed is dropped.
pub struct FtpClient {
    credentials: Credentials,
    group: ConnectionGroup,
    idle: IdleConnections,
}

impl FtpClient {
    pub fn new(credentials: Credentials) -> Self {
        Self::with_connection_limit(credentials, DEFAULT_CONNECTION_LIMIT)
    }

    pub fn with_connection_limit(credentials: Credentials, limit: usize) -> Self {
        Self {
            credentials,
            group: ConnectionGroup::new(CONNECTION_GROUP, limit),
            idle: Arc::default(),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn connection_group(&self) -> &ConnectionGroup {
        &self.group
    }

    fn connect_ftp(authority: &str, credentials: &Credentials) -> FtpResult<FtpStream> {
        let mut ftp = FtpStream::connect(authority)?;
        ftp.login(&credentials.username, &credentials.password)?;
        Ok(ftp)
    }

    /// Runs one command on a pooled connection inside the blocking pool.
    async fn execute<T, F>(&self, verb: &'static str, url: &Url, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut FtpStream) -> FtpResult<T> + Send + 'static,
    {
        let authority = authority(url)?;
        let permit = self.group.acquire().await?;
        debug!(verb, address = %url, group = self.group.name(), "ftp request");

        let idle = Arc::clone(&self.idle);
        let credentials = self.credentials.clone();
        let limit = self.group.limit();

        // Held until the blocking command returns, even if the caller is gone.
        let outcome = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            let mut ftp = checkout(&idle, &authority, &credentials)?;
            let outcome = op(&mut ftp);
            if outcome.is_ok() {
                checkin(&idle, authority, ftp, limit);
            }
            outcome
        })
        .await?;

        Ok(outcome?)
    }

    async fn list(&self, address: &str, kind: EntryKind) -> Result<Vec<FileEntry>> {
        let url = self.check_address(address)?;
        let path = remote_path(&url)?;

        let lines = self
            .execute("LIST", &url, move |ftp| ftp.list(Some(path.as_str())))
            .await?;
        let entries = listing::ftp::parse_listing(&url, &lines.join("\n"), kind)?;
        debug!(address = %url, ?kind, count = entries.len(), "ftp listing parsed");
        Ok(entries)
    }
}

fn lock(idle: &IdleConnections) -> std::sync::MutexGuard<'_, HashMap<String, Vec<FtpStream>>> {
    idle.lock().unwrap_or_else(PoisonError::into_inner)
}

// Reuses an idle connection that still answers NOOP, otherwise logs in anew.
fn checkout(idle: &IdleConnections, authority: &str, credentials: &Credentials) -> FtpResult<FtpStream> {
    loop {
        let pooled = lock(idle).get_mut(authority).and_then(Vec::pop);
        let Some(mut ftp) = pooled else {
            return FtpClient::connect_ftp(authority, credentials);
        };
        match ftp.noop() {
            Ok(()) => return Ok(ftp),
            Err(e) => warn!(authority, error = %e, "dropping dead pooled ftp connection"),
        }
    }
}

fn checkin(idle: &IdleConnections, authority: String, mut ftp: FtpStream, limit: usize) {
    let mut connections = lock(idle);
    let pooled: usize = connections.values().map(Vec::len).sum();
    if pooled < limit {
        connections.entry(authority).or_default().push(ftp);
    } else {
        drop(connections);
        let _ = ftp.quit();
    }
}

fn authority(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| Error::invalid_address(url.as_str(), "missing host"))?;
    let port = url.port_or_known_default().unwrap_or(21);
    Ok(format!("{host}:{port}"))
}

fn remote_path(url: &Url) -> Result<String> {
    percent_decode_str(url.path())
        .decode_utf8()
        .map(|path| path.into_owned())
        .map_err(|e| Error::invalid_address(url.as_str(), e.to_string()))
}

#[async_trait]
impl RemoteFileSystem for FtpClient {
    fn check_address(&self, address: &str) -> Result<Url> {
        check_address(address, SCHEMES)
    }

    async fn create_directory(&self, address: &str) -> Result<()> {
        let url = self.check_address(address)?;
        let path = remote_path(&url)?;
        self.execute("MKD", &url, move |ftp| ftp.mkdir(&path)).await
    }

    async fn delete_directory(&self, address: &str) -> Result<()> {
        let url = self.check_address(address)?;
        let path = remote_path(&url)?;
        self.execute("RMD", &url, move |ftp| ftp.rmdir(&path)).await
    }

    async fn delete_file(&self, address: &str) -> Result<()> {
        let url = self.check_address(address)?;
        let path = remote_path(&url)?;
        self.execute("DELE", &url, move |ftp| ftp.rm(&path)).await
    }

    async fn list_directories(&self, address: &str) -> Result<Vec<FileEntry>> {
        self.list(address, EntryKind::Directory).await
    }

    async fn list_files(&self, address: &str) -> Result<Vec<FileEntry>> {
        self.list(address, EntryKind::File).await
    }

    async fn move_file(&self, source: &str, new_name: &str) -> Result<()> {
        let url = self.check_address(source)?;
        let path = remote_path(&url)?;
        let new_name = new_name.to_string();
        self.execute("RNFR/RNTO", &url, move |ftp| {
            ftp.rename(path.as_str(), new_name.as_str())
        })
        .await
    }

    async fn open_read(&self, address: &str) -> Result<Cursor<Vec<u8>>> {
        let url = self.check_address(address)?;
        let path = remote_path(&url)?;
        let mut content = self
            .execute("RETR", &url, move |ftp| {
                ftp.transfer_type(FileType::Binary)?;
                ftp.retr_as_buffer(&path)
            })
            .await?;
        content.set_position(0);
        Ok(content)
    }

    async fn open_write(&self, address: &str, source: &mut dyn SourceStream) -> Result<()> {
        let url = self.check_address(address)?;
        let path = remote_path(&url)?;
        let body = read_source(source)?;
        debug!(address = %url, length = body.len(), "ftp upload");

        self.execute("STOR", &url, move |ftp| {
            ftp.transfer_type(FileType::Binary)?;
            ftp.put_file(&path, &mut body.as_slice()).map(|_| ())
        })
        .await
    }
}
