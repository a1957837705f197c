//! HTML pages for GET on a collection.

use quick_xml::escape::escape;
use std::cmp::Ordering;

use super::names::PropName;
use super::result::{PropValue, PropfindResult};

pub const CONTENT_TYPE: &str = "text/html; encoding=UTF-8";

/// One row of the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub href: String,
    pub name: String,
    pub is_collection: bool,
    pub size: String,
    pub modified: String,
}

impl ListingEntry {
    pub fn new(result: &PropfindResult, href: String) -> Self {
        let is_collection = result.is_collection();
        let name = match result.get(&PropName::DisplayName) {
            Some(PropValue::Text(name)) => name.clone(),
            _ => result
                .path()
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        let size = match result.get(&PropName::GetContentLength) {
            Some(PropValue::Text(size)) if !is_collection => size.clone(),
            _ => String::new(),
        };
        let modified = match result.get(&PropName::GetLastModified) {
            Some(PropValue::Date(date)) => date.format("%Y-%m-%d %H:%M").to_string(),
            _ => String::new(),
        };
        Self {
            href,
            name,
            is_collection,
            size,
            modified,
        }
    }
}

/// Collections first, then by name.
pub fn sort_entries(entries: &mut [ListingEntry]) {
    entries.sort_by(|a, b| match (a.is_collection, b.is_collection) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.name.cmp(&b.name),
    });
}

/// Start of the page, up to the first row.
pub fn page_head(title: &str, parent: Option<&str>) -> String {
    let title = escape(title);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Index of {title}</title>\n</head>\n<body>\n\
         <h1>Index of {title}</h1>\n<table>\n\
         <tr><th>Name</th><th>Size</th><th>Last modified</th></tr>\n"
    );
    if let Some(parent) = parent {
        html.push_str(&format!(
            "<tr><td><a href=\"{}\">../</a></td><td></td><td></td></tr>\n",
            escape(parent)
        ));
    }
    html
}

pub fn page_row(entry: &ListingEntry) -> String {
    let suffix = if entry.is_collection { "/" } else { "" };
    format!(
        "<tr><td><a href=\"{}\">{}{suffix}</a></td><td>{}</td><td>{}</td></tr>\n",
        escape(&entry.href),
        escape(&entry.name),
        entry.size,
        entry.modified,
    )
}

pub fn page_tail() -> &'static str {
    "</table>\n</body>\n</html>\n"
}
