//! Protocol listing parsers.
//!
//! Both variants share one shape, `(directory, raw response, kind) -> entries`,
//! so call sites stay protocol-agnostic while the parsing strategies differ:
//! line patterns for FTP `LIST`, tree navigation for WebDAV `multistatus`.

pub mod ftp;
pub mod webdav;
