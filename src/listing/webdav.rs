use crate::entry::{EntryKind, FileEntry};
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime};
use roxmltree::{Document, Node};
use url::Url;

pub const DAV_NAMESPACE: &str = "DAV:";

/// Body of the depth-1 `PROPFIND` whose answer [`parse_listing`] understands.
pub const PROPFIND_BODY: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<propfind xmlns="DAV:"><prop>"#,
    r"<getlastmodified/><displayname/><getcontentlength/><iscollection/>",
    r"</prop></propfind>",
);

/// `displayname` the server gives the queried collection itself.
const SELF_DISPLAY_NAME: &str = "/";

/// Parses a `multistatus` document into the entries of the requested kind.
///
/// Every `response` must carry `href` and `iscollection`; collections also
/// need `displayname`, and non-collections need `getlastmodified` and
/// `getcontentlength`. These are checked for every response, not only the
/// ones of the requested kind, so a single incomplete response fails the
/// whole listing.
pub fn parse_listing(directory: &Url, raw: &str, kind: EntryKind) -> Result<Vec<FileEntry>> {
    let doc = Document::parse(raw).map_err(|e| Error::malformed(format!("invalid XML: {e}")))?;
    let root = doc.root_element();
    if !root.has_tag_name((DAV_NAMESPACE, "multistatus")) {
        return Err(Error::malformed(format!(
            "expected DAV: multistatus root, found `{}`",
            root.tag_name().name()
        )));
    }

    let mut entries = Vec::new();
    for response in children(root, "response") {
        let href = required_text(child(response, "href"), "href")?;
        let is_collection = match required_text(property(response, "iscollection"), "iscollection")? {
            "1" => true,
            "0" => false,
            other => return Err(Error::malformed(format!("unexpected iscollection value `{other}`"))),
        };

        if is_collection {
            let display_name = required_text(property(response, "displayname"), "displayname")?;
            if kind == EntryKind::Directory && display_name != SELF_DISPLAY_NAME {
                entries.push(FileEntry::directory(resolve_href(directory, href)?));
            }
        } else {
            let modified = parse_http_date(required_text(
                property(response, "getlastmodified"),
                "getlastmodified",
            )?)?;
            let length = required_text(property(response, "getcontentlength"), "getcontentlength")?;
            let size = length
                .parse::<u64>()
                .map_err(|e| Error::malformed(format!("bad getcontentlength `{length}`: {e}")))?;
            if kind == EntryKind::File {
                entries.push(FileEntry::file(resolve_href(directory, href)?, modified, size));
            }
        }
    }

    Ok(entries)
}

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |n| n.has_tag_name((DAV_NAMESPACE, name)))
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &'static str) -> Option<Node<'a, 'input>> {
    children(node, name).next()
}

// First match of `propstat/prop/<name>` across all propstat blocks.
fn property<'a, 'input>(response: Node<'a, 'input>, name: &'static str) -> Option<Node<'a, 'input>> {
    children(response, "propstat")
        .flat_map(|propstat| children(propstat, "prop"))
        .find_map(|prop| child(prop, name))
}

fn required_text<'a>(node: Option<Node<'a, '_>>, name: &str) -> Result<&'a str> {
    let node = node.ok_or_else(|| Error::malformed(format!("response is missing `{name}`")))?;
    Ok(node.text().map(str::trim).unwrap_or_default())
}

fn resolve_href(directory: &Url, href: &str) -> Result<Url> {
    let address = directory
        .join(href)
        .map_err(|e| Error::malformed(format!("bad href `{href}`: {e}")))?;
    match address.scheme() {
        "http" | "https" => Ok(address),
        other => Err(Error::malformed(format!(
            "href `{href}` resolves to a `{other}` address"
        ))),
    }
}

// Obsolete HTTP-date forms, always in GMT.
const RFC850_FORMAT: &str = "%A, %d-%b-%y %T GMT";
const ASCTIME_FORMAT: &str = "%a %b %e %T %Y";

/// Parses an HTTP-date into UTC. Besides the IMF-fixdate form
/// (`Sun, 06 Nov 1994 08:49:37 GMT`) this accepts the obsolete RFC 850 and
/// asctime forms, and RFC 3339 which some servers send instead.
fn parse_http_date(text: &str) -> Result<NaiveDateTime> {
    if let Ok(date) = DateTime::parse_from_rfc2822(text).or_else(|_| DateTime::parse_from_rfc3339(text)) {
        return Ok(date.naive_utc());
    }
    [RFC850_FORMAT, ASCTIME_FORMAT]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .ok_or_else(|| Error::malformed(format!("bad getlastmodified `{text}`")))
}
