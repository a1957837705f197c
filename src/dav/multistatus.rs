//! `207 Multi-Status` bodies.
//!
//! A body is written in pieces so it can be streamed: [`head`], one
//! [`response`] per resource, then [`tail`]. The head declares the `D` and
//! `pd2` prefixes used by every response.

use anyhow::bail;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use super::names::{DAV_NAMESPACE, PD2_NAMESPACE, PropName};
use super::request::PropfindRequest;
use super::result::{PropStatus, PropValue, PropfindResult};

pub const CONTENT_TYPE: &str = "application/xml; encoding=UTF-8";

type XmlWriter = Writer<Vec<u8>>;

pub fn head() -> anyhow::Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    let mut start = BytesStart::new("D:multistatus");
    start.push_attribute(("xmlns:D", DAV_NAMESPACE));
    start.push_attribute(("xmlns:pd2", PD2_NAMESPACE));
    writer.write_event(Event::Start(start))?;
    Ok(writer.into_inner())
}

pub fn tail() -> Vec<u8> {
    b"</D:multistatus>\n".to_vec()
}

/// One `D:response` element for `result`, answering `request`.
pub fn response(
    result: &PropfindResult,
    href: &str,
    request: &PropfindRequest,
) -> anyhow::Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    open(&mut writer, "D:response")?;
    text_element(&mut writer, "D:href", href)?;

    if let PropfindRequest::PropNames = request {
        let Some(names) = result.get(&PropName::Names) else {
            bail!("no property names were listed for {}", result.path());
        };
        open(&mut writer, "D:propstat")?;
        open(&mut writer, "D:prop")?;
        write_value(&mut writer, names)?;
        close(&mut writer, "D:prop")?;
        text_element(&mut writer, "D:status", PropStatus::Found.status_line())?;
        close(&mut writer, "D:propstat")?;
    } else {
        let selected = |name: &PropName| match request {
            PropfindRequest::Prop(props) => props.contains(name),
            _ => *name != PropName::Names,
        };
        let found: Vec<_> = result.found().filter(|(name, _)| selected(name)).collect();
        let denied: Vec<_> = result.access_denied().filter(|name| selected(name)).collect();
        let missing: Vec<_> = match request {
            PropfindRequest::Prop(props) => props.iter().collect(),
            PropfindRequest::AllProp { include } => include.iter().collect(),
            PropfindRequest::PropNames => Vec::new(),
        }
        .into_iter()
        .filter(|name| result.status_for(name) == PropStatus::NotFound)
        .collect();

        // At least one propstat, even when nothing was asked for
        if !found.is_empty() || (denied.is_empty() && missing.is_empty()) {
            propstat(&mut writer, PropStatus::Found, found.into_iter())?;
        }
        if !denied.is_empty() {
            let empty = PropValue::Empty;
            propstat(
                &mut writer,
                PropStatus::AccessDenied,
                denied.into_iter().map(|name| (name, &empty)),
            )?;
        }
        if !missing.is_empty() {
            let empty = PropValue::Empty;
            propstat(
                &mut writer,
                PropStatus::NotFound,
                missing.into_iter().map(|name| (name, &empty)),
            )?;
        }
    }

    close(&mut writer, "D:response")?;
    Ok(writer.into_inner())
}

fn propstat<'a>(
    writer: &mut XmlWriter,
    status: PropStatus,
    props: impl Iterator<Item = (&'a PropName, &'a PropValue)>,
) -> anyhow::Result<()> {
    open(writer, "D:propstat")?;
    open(writer, "D:prop")?;
    for (name, value) in props {
        write_element(writer, name, value)?;
    }
    close(writer, "D:prop")?;
    text_element(writer, "D:status", status.status_line())?;
    close(writer, "D:propstat")?;
    Ok(())
}

fn write_value(writer: &mut XmlWriter, value: &PropValue) -> anyhow::Result<()> {
    match value {
        PropValue::Empty => {}
        PropValue::Text(text) => {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        PropValue::Date(date) => {
            let text = super::http_date(date);
            writer.write_event(Event::Text(BytesText::new(&text)))?;
        }
        PropValue::Element(name, inner) => write_element(writer, name, inner)?,
        PropValue::Sequence(items) => {
            for item in items {
                write_value(writer, item)?;
            }
        }
    }
    Ok(())
}

fn write_element(writer: &mut XmlWriter, name: &PropName, value: &PropValue) -> anyhow::Result<()> {
    let (qname, namespace) = match name.namespace() {
        DAV_NAMESPACE => (format!("D:{}", name.local_name()), None),
        PD2_NAMESPACE => (format!("pd2:{}", name.local_name()), None),
        other => (name.local_name().to_string(), Some(other)),
    };
    let mut start = BytesStart::new(qname.as_str());
    if let Some(namespace) = namespace {
        start.push_attribute(("xmlns", namespace));
    }

    if *value == PropValue::Empty {
        writer.write_event(Event::Empty(start))?;
    } else {
        writer.write_event(Event::Start(start))?;
        write_value(writer, value)?;
        writer.write_event(Event::End(BytesEnd::new(qname.as_str())))?;
    }
    Ok(())
}

fn open(writer: &mut XmlWriter, name: &str) -> anyhow::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    Ok(())
}

fn close(writer: &mut XmlWriter, name: &str) -> anyhow::Result<()> {
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> anyhow::Result<()> {
    open(writer, name)?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    close(writer, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn render(result: &PropfindResult, request: &PropfindRequest) -> String {
        String::from_utf8(response(result, "/a%20b", request).unwrap()).unwrap()
    }

    fn file() -> PropfindResult {
        let mut result = PropfindResult::new("/a b", false);
        result.add(PropName::GetContentLength, PropValue::text(12));
        result.add(PropName::DisplayName, PropValue::text("a <b>"));
        result.add_failure(PropName::GetContentType, PropStatus::AccessDenied);
        result
    }

    #[test]
    fn found_denied_and_missing_get_separate_propstats() {
        let request = PropfindRequest::Prop(BTreeSet::from([
            PropName::GetContentLength,
            PropName::GetContentType,
            PropName::new("urn:x", "color"),
        ]));
        let xml = render(&file(), &request);

        assert!(xml.starts_with("<D:response><D:href>/a%20b</D:href>"));
        assert!(xml.contains(
            "<D:prop><D:getcontentlength>12</D:getcontentlength></D:prop>\
             <D:status>HTTP/1.1 200 OK</D:status>"
        ));
        assert!(xml.contains(
            "<D:prop><D:getcontenttype/></D:prop><D:status>HTTP/1.1 403 Forbidden</D:status>"
        ));
        assert!(xml.contains(
            "<D:prop><color xmlns=\"urn:x\"/></D:prop><D:status>HTTP/1.1 404 Not Found</D:status>"
        ));
        // Not asked for
        assert!(!xml.contains("displayname"));
    }

    #[test]
    fn allprop_escapes_text_and_marks_collections() {
        let xml = render(&file(), &PropfindRequest::default());
        assert!(xml.contains("<D:displayname>a &lt;b&gt;</D:displayname>"));

        let dir = PropfindResult::new("/", true);
        let xml = render(&dir, &PropfindRequest::default());
        assert!(xml.contains("<D:resourcetype><D:collection/></D:resourcetype>"));
        assert!(!xml.contains("404"));
    }

    #[test]
    fn propname_lists_empty_elements() {
        let mut result = PropfindResult::new("/a", false);
        result.add(
            PropName::Names,
            PropValue::Sequence(vec![
                PropValue::marker(PropName::GetLastModified),
                PropValue::marker(PropName::InPackages),
            ]),
        );
        let xml = render(&result, &PropfindRequest::PropNames);
        assert!(xml.contains("<D:prop><D:getlastmodified/><pd2:in-packages/></D:prop>"));

        let missing = PropfindResult::new("/b", false);
        assert!(response(&missing, "/b", &PropfindRequest::PropNames).is_err());
    }

    #[test]
    fn head_declares_prefixes() {
        let head = String::from_utf8(head().unwrap()).unwrap();
        assert!(head.starts_with("<?xml version=\"1.0\" encoding=\"utf-8\"?>"));
        assert!(head.ends_with(&format!(
            "<D:multistatus xmlns:D=\"DAV:\" xmlns:pd2=\"{PD2_NAMESPACE}\">"
        )));
    }
}
