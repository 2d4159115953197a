#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

//! Filesystem-like access to FTP and WebDAV servers through one contract,
//! [`RemoteFileSystem`].

pub mod client;
pub mod config;
pub mod connection;
pub mod entry;
pub mod error;
pub mod listing;
pub mod logging;
pub mod pool;

pub use client::{ftp::FtpClient, webdav::WebDavClient, Credentials, RemoteFileSystem, SourceStream};
pub use entry::{EntryKind, FileEntry};
pub use error::{Error, Result, TransportError};
