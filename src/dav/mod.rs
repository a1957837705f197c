//! The read-only WebDAV engine.
//!
//! [`DavHandler`] turns HTTP requests into calls on a
//! [`ReadableFilesystem`](crate::provider::ReadableFilesystem) and writes the
//! answers back: OPTIONS, GET (files and HTML listings) and PROPFIND.

pub mod body;
mod depth;
mod handler;
pub mod listing;
pub mod multistatus;
mod names;
mod request;
mod result;

pub use depth::{Depth, InvalidDepth};
pub use handler::DavHandler;
pub use names::{DAV_NAMESPACE, PD2_NAMESPACE, PropName};
pub use request::{PropfindParseError, PropfindRequest};
pub use result::{PropStatus, PropValue, PropfindResult};

use chrono::{DateTime, NaiveDateTime, Utc};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use std::str::Utf8Error;

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Characters escaped in one path segment of an href.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'/');

/// RFC 7231 IMF-fixdate.
pub fn http_date(date: &DateTime<Utc>) -> String {
    date.format(HTTP_DATE).to_string()
}

pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), HTTP_DATE)
        .ok()
        .map(|date| date.and_utc())
}

/// Href for a provider path under `prefix`; collections end in `/`.
pub fn href(prefix: &str, path: &str, is_collection: bool) -> String {
    let mut out = String::from(prefix);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        out.extend(utf8_percent_encode(segment, SEGMENT));
    }
    if is_collection || out.is_empty() {
        out.push('/');
    }
    out
}

pub fn decode_path(path: &str) -> Result<String, Utf8Error> {
    percent_decode_str(path)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn http_dates() {
        let date = Utc.with_ymd_and_hms(2020, 5, 17, 9, 3, 59).unwrap();
        assert_eq!(http_date(&date), "Sun, 17 May 2020 09:03:59 GMT");
        assert_eq!(parse_http_date("Sun, 17 May 2020 09:03:59 GMT"), Some(date));
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn hrefs_escape_segments() {
        assert_eq!(href("", "/", true), "/");
        assert_eq!(href("", "/units/a b.texture", false), "/units/a%20b.texture");
        assert_eq!(href("/assets", "/units", true), "/assets/units/");
        assert_eq!(href("/assets", "/", true), "/assets/");
        assert_eq!(href("", "/@ID00000000000000ff@.dds", false), "/@ID00000000000000ff@.dds");
        assert_eq!(href("", "/100%?#", false), "/100%25%3F%23");
    }

    #[test]
    fn paths_decode() {
        assert_eq!(decode_path("/a%20b/%C3%BC").unwrap(), "/a b/ü");
        assert!(decode_path("/%FF").is_err());
    }
}
