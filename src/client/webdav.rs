use super::{check_address, read_source, Credentials, RemoteFileSystem, SourceStream};
use crate::entry::{EntryKind, FileEntry};
use crate::error::{Error, Result};
use crate::listing;
use crate::pool::{ConnectionGroup, DEFAULT_CONNECTION_LIMIT};
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::io::{self, Cursor};
use tracing::debug;
use url::Url;

const SCHEMES: &[&str] = &["http", "https"];
pub const CONNECTION_GROUP: &str = "remote-fs.http";

/// WebDAV implementation of [`RemoteFileSystem`] on top of `reqwest`.
pub struct WebDavClient {
    credentials: Credentials,
    group: ConnectionGroup,
    http: Client,
}

impl WebDavClient {
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::with_connection_limit(credentials, DEFAULT_CONNECTION_LIMIT)
    }

    pub fn with_connection_limit(credentials: Credentials, limit: usize) -> Result<Self> {
        let group = ConnectionGroup::new(CONNECTION_GROUP, limit);
        // reqwest never sends `Expect: 100-continue`.
        let http = Client::builder()
            .pool_max_idle_per_host(group.limit())
            .build()?;

        Ok(Self {
            credentials,
            group,
            http,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn connection_group(&self) -> &ConnectionGroup {
        &self.group
    }

    /// Sends one request and drains the response body while holding a slot
    /// of the connection group. Non-2xx statuses become transport errors.
    async fn send(
        &self,
        verb: &'static str,
        url: &Url,
        headers: &[(&str, &str)],
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>> {
        let method = Method::from_bytes(verb.as_bytes())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let _permit = self.group.acquire().await?;
        debug!(verb, address = %url, group = self.group.name(), "webdav request");

        let mut request = self
            .http
            .request(method, url.clone())
            .basic_auth(&self.credentials.username, Some(&self.credentials.password));
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn list(&self, address: &str, kind: EntryKind) -> Result<Vec<FileEntry>> {
        let url = self.check_address(address)?;

        let body = self
            .send(
                "PROPFIND",
                &url,
                &[
                    ("Depth", "1"),
                    ("Content-Type", "application/xml; charset=utf-8"),
                ],
                Some(listing::webdav::PROPFIND_BODY.as_bytes().to_vec()),
            )
            .await?;
        let raw = String::from_utf8(body)
            .map_err(|e| Error::malformed(format!("multistatus is not UTF-8: {e}")))?;

        let entries = listing::webdav::parse_listing(&url, &raw, kind)?;
        debug!(address = %url, ?kind, count = entries.len(), "webdav listing parsed");
        Ok(entries)
    }
}

#[async_trait]
impl RemoteFileSystem for WebDavClient {
    fn check_address(&self, address: &str) -> Result<Url> {
        check_address(address, SCHEMES)
    }

    async fn create_directory(&self, address: &str) -> Result<()> {
        let url = self.check_address(address)?;
        self.send("MKCOL", &url, &[], None).await.map(drop)
    }

    async fn delete_directory(&self, address: &str) -> Result<()> {
        let url = self.check_address(address)?;
        self.send("DELETE", &url, &[], None).await.map(drop)
    }

    async fn delete_file(&self, address: &str) -> Result<()> {
        let url = self.check_address(address)?;
        self.send("DELETE", &url, &[], None).await.map(drop)
    }

    async fn list_directories(&self, address: &str) -> Result<Vec<FileEntry>> {
        self.list(address, EntryKind::Directory).await
    }

    async fn list_files(&self, address: &str) -> Result<Vec<FileEntry>> {
        self.list(address, EntryKind::File).await
    }

    async fn move_file(&self, source: &str, new_name: &str) -> Result<()> {
        let url = self.check_address(source)?;
        self.send("MOVE", &url, &[("Destination", new_name)], None)
            .await
            .map(drop)
    }

    async fn open_read(&self, address: &str) -> Result<Cursor<Vec<u8>>> {
        let url = self.check_address(address)?;
        let content = self.send("GET", &url, &[], None).await?;
        Ok(Cursor::new(content))
    }

    async fn open_write(&self, address: &str, source: &mut dyn SourceStream) -> Result<()> {
        let url = self.check_address(address)?;
        let body = read_source(source)?;
        debug!(address = %url, length = body.len(), "webdav upload");
        self.send("PUT", &url, &[], Some(body)).await.map(drop)
    }
}
