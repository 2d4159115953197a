pub mod ftp;
pub mod webdav;

use crate::entry::FileEntry;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::fmt;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use url::Url;

/// Uniform filesystem-like access to a remote server.
///
/// Every address-taking operation validates the address before any network
/// activity: a blank address fails with [`Error::NullArgument`], an address
/// of another protocol with [`Error::InvalidAddress`]. Each operation is one
/// request/response round-trip; nothing is retried or cached.
#[async_trait]
pub trait RemoteFileSystem: Send + Sync {
    /// Parses `address` and checks that its scheme belongs to this client.
    fn check_address(&self, address: &str) -> Result<Url>;

    async fn create_directory(&self, address: &str) -> Result<()>;
    async fn delete_directory(&self, address: &str) -> Result<()>;
    async fn delete_file(&self, address: &str) -> Result<()>;

    /// Immediate subdirectories of `address`, in server order.
    async fn list_directories(&self, address: &str) -> Result<Vec<FileEntry>>;
    /// Immediate files of `address`, in server order.
    async fn list_files(&self, address: &str) -> Result<Vec<FileEntry>>;

    /// Renames `source` in place. `new_name` is handed to the server as-is:
    /// an `RNTO` argument for FTP, a `Destination` header for WebDAV.
    async fn move_file(&self, source: &str, new_name: &str) -> Result<()>;

    /// Downloads the whole file into memory and returns it positioned at 0.
    async fn open_read(&self, address: &str) -> Result<Cursor<Vec<u8>>>;

    /// Uploads the remaining content of `source` in one request.
    async fn open_write(&self, address: &str, source: &mut dyn SourceStream) -> Result<()>;

    /// Lists the parent of `address` and looks for an entry with exactly the
    /// same address. The comparison is textual: `.../reports/` and
    /// `.../reports` are different addresses.
    async fn directory_exists(&self, address: &str) -> Result<bool> {
        let target = self.check_address(address)?;
        let parent = parent_of(&target)?;
        let entries = self.list_directories(parent.as_str()).await?;
        Ok(entries.iter().any(|e| e.address().as_str() == target.as_str()))
    }

    /// File counterpart of [`directory_exists`](Self::directory_exists).
    async fn file_exists(&self, address: &str) -> Result<bool> {
        let target = self.check_address(address)?;
        let parent = parent_of(&target)?;
        let entries = self.list_files(parent.as_str()).await?;
        Ok(entries.iter().any(|e| e.address().as_str() == target.as_str()))
    }
}

/// A seekable upload source whose length can be determined up front.
pub trait SourceStream: Read + Seek + Send {}

impl<T: Read + Seek + Send + ?Sized> SourceStream for T {}

/// Credentials attached to every request. Read-only once the client exists.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new("anonymous", "anonymous@")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

pub(crate) fn check_address(address: &str, schemes: &[&str]) -> Result<Url> {
    if address.trim().is_empty() {
        return Err(Error::NullArgument);
    }
    let url = Url::parse(address).map_err(|e| Error::invalid_address(address, e.to_string()))?;
    if !schemes.contains(&url.scheme()) {
        return Err(Error::invalid_address(
            address,
            format!("expected scheme {}", schemes.join(" or ")),
        ));
    }
    Ok(url)
}

fn parent_of(address: &Url) -> Result<Url> {
    address
        .join("./")
        .map_err(|e| Error::invalid_address(address.as_str(), e.to_string()))
}

/// Reads everything from the current position to the end of `source`.
/// The length is taken from seeking, so a stream that cannot seek, or
/// that yields fewer bytes than it reported, is an I/O error.
pub(crate) fn read_source(source: &mut dyn SourceStream) -> Result<Vec<u8>> {
    let start = source.stream_position()?;
    let end = source.seek(SeekFrom::End(0))?;
    source.seek(SeekFrom::Start(start))?;
    let len = end.saturating_sub(start);

    let mut body = Vec::with_capacity(usize::try_from(len).unwrap_or_default());
    (&mut *source).take(len).read_to_end(&mut body)?;
    if body.len() as u64 != len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("source stream reported {len} bytes but yielded {}", body.len()),
        )
        .into());
    }
    Ok(body)
}
