use crate::entry::{resolve_child, EntryKind, FileEntry};
use crate::error::{Error, Result};
use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

const DIR_MARKER: &str = "<DIR>";
const TIMESTAMP_FORMAT: &str = "%m-%d-%y %I:%M%p";

// `08-15-20  02:30PM       <DIR>          reports`
fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)^(\d+-\d+-\d+\s+\d+:\d+(?:AM|PM))\s+(<DIR>|\d+)\s+(.+)$")
            .expect("static FTP listing pattern is valid")
    })
}

/// Parses a `LIST` response body into the entries of the requested kind.
///
/// Lines that do not look like a listing line (banners, totals, blank
/// lines) are skipped, as are the `.` and `..` self/parent entries. A line that matches but carries an impossible
/// timestamp or size fails the whole listing.
pub fn parse_listing(directory: &Url, raw: &str, kind: EntryKind) -> Result<Vec<FileEntry>> {
    let mut entries = Vec::new();

    for line in raw.lines() {
        let Some(caps) = line_pattern().captures(line.trim_end_matches('\r')) else {
            continue;
        };
        let size_field = &caps[2];
        let name = &caps[3];
        if matches!(name, "." | "..") {
            continue;
        }
        let is_dir = size_field.eq_ignore_ascii_case(DIR_MARKER);

        match (kind, is_dir) {
            (EntryKind::Directory, true) => {
                entries.push(FileEntry::directory(resolve_child(directory, name)?));
            }
            (EntryKind::File, false) => {
                let modified = NaiveDateTime::parse_from_str(&caps[1], TIMESTAMP_FORMAT)
                    .map_err(|e| Error::malformed(format!("bad timestamp in `{line}`: {e}")))?;
                let size = size_field
                    .parse::<u64>()
                    .map_err(|e| Error::malformed(format!("bad size in `{line}`: {e}")))?;
                entries.push(FileEntry::file(resolve_child(directory, name)?, modified, size));
            }
            _ => {}
        }
    }

    Ok(entries)
}
