use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use std::collections::BTreeSet;
use thiserror::Error;

use super::names::PropName;

/// What a PROPFIND body asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropfindRequest {
    /// Every standard property, plus the `include`d ones
    AllProp { include: BTreeSet<PropName> },
    /// Only the names of the properties
    PropNames,
    Prop(BTreeSet<PropName>),
}

impl Default for PropfindRequest {
    /// An empty body asks for all properties.
    fn default() -> Self {
        PropfindRequest::AllProp {
            include: BTreeSet::new(),
        }
    }
}

/// Why a PROPFIND body was refused.
#[derive(Debug, Error)]
pub enum PropfindParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("{0}")]
    Shape(&'static str),
}

impl PropfindRequest {
    /// Parse a non-empty PROPFIND body.
    ///
    /// The root must be `DAV:propfind` holding either `allprop` (optionally
    /// followed by `include`), `propname`, or `prop`. Anything else is a
    /// [`PropfindParseError::Shape`].
    ///
    /// # Arguments
    ///
    /// * `body` - The raw request body
    ///
    /// # Returns
    ///
    /// The request, with property names resolved to their namespaces.
    pub fn parse(body: &[u8]) -> Result<Self, PropfindParseError> {
        use PropfindParseError::Shape;

        let mut reader = NsReader::from_reader(body);
        reader.config_mut().trim_text(true);

        let mut depth = 0usize;
        let mut root: Option<PropName> = None;
        // Children of the root, each with its own children
        let mut sections: Vec<(PropName, Vec<PropName>)> = Vec::new();

        loop {
            let (resolved, event) = reader.read_resolved_event()?;
            let (name, empty) = match &event {
                Event::Start(e) => (element_name(&resolved, e.local_name().as_ref()), false),
                Event::Empty(e) => (element_name(&resolved, e.local_name().as_ref()), true),
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    continue;
                }
                Event::Eof if depth > 0 => return Err(Shape("unclosed element")),
                Event::Eof => break,
                _ => continue,
            };

            depth += 1;
            match depth {
                1 if root.is_some() => return Err(Shape("more than one root element")),
                1 => root = Some(name),
                2 => sections.push((name, Vec::new())),
                3 => {
                    if let Some((_, children)) = sections.last_mut() {
                        children.push(name);
                    }
                }
                _ => {}
            }
            if empty {
                depth -= 1;
            }
        }

        match root {
            Some(root) if root.is_dav("propfind") => {}
            Some(_) => return Err(Shape("root element is not DAV:propfind")),
            None => return Err(Shape("no root element")),
        }

        const SHAPE: &str = "expected allprop (with an optional include), propname, or prop";
        let mut sections = sections.into_iter();
        let (first, children) = sections.next().ok_or(Shape(SHAPE))?;
        let second = sections.next();
        if sections.next().is_some() {
            return Err(Shape(SHAPE));
        }

        if first.is_dav("allprop") {
            let include = match second {
                None => BTreeSet::new(),
                Some((name, children)) if name.is_dav("include") => children.into_iter().collect(),
                Some(_) => return Err(Shape(SHAPE)),
            };
            return Ok(PropfindRequest::AllProp { include });
        }
        if second.is_some() {
            return Err(Shape(SHAPE));
        }
        if first.is_dav("propname") {
            Ok(PropfindRequest::PropNames)
        } else if first.is_dav("prop") {
            Ok(PropfindRequest::Prop(children.into_iter().collect()))
        } else {
            Err(Shape(SHAPE))
        }
    }

    /// Whether every standard property is wanted.
    pub fn all_props(&self) -> bool {
        matches!(self, PropfindRequest::AllProp { .. })
    }

    /// Properties to compute beyond the standard set.
    pub fn extra_props(&self) -> BTreeSet<PropName> {
        match self {
            PropfindRequest::AllProp { include } => include.clone(),
            PropfindRequest::PropNames => BTreeSet::from([PropName::Names]),
            PropfindRequest::Prop(props) => props.clone(),
        }
    }
}

fn element_name(resolved: &ResolveResult, local: &[u8]) -> PropName {
    let namespace = match resolved {
        ResolveResult::Bound(ns) => String::from_utf8_lossy(ns.as_ref()).into_owned(),
        _ => String::new(),
    };
    PropName::new(&namespace, &String::from_utf8_lossy(local))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dav::names::PD2_NAMESPACE;

    #[test]
    fn allprop_with_include() {
        let body = format!(
            r#"<?xml version="1.0"?>
            <D:propfind xmlns:D="DAV:" xmlns:p="{PD2_NAMESPACE}">
              <D:allprop/>
              <D:include><p:in-packages/></D:include>
            </D:propfind>"#
        );
        assert_eq!(
            PropfindRequest::parse(body.as_bytes()).unwrap(),
            PropfindRequest::AllProp {
                include: BTreeSet::from([PropName::InPackages])
            }
        );
    }

    #[test]
    fn prop_list_with_default_namespace() {
        let body = br#"<propfind xmlns="DAV:"><prop><getcontentlength/><x:color xmlns:x="urn:x"/></prop></propfind>"#;
        let request = PropfindRequest::parse(body).unwrap();
        assert_eq!(
            request,
            PropfindRequest::Prop(BTreeSet::from([
                PropName::GetContentLength,
                PropName::new("urn:x", "color"),
            ]))
        );
        assert!(!request.all_props());
    }

    #[test]
    fn propname() {
        let body = br#"<D:propfind xmlns:D="DAV:"><D:propname/></D:propfind>"#;
        let request = PropfindRequest::parse(body).unwrap();
        assert_eq!(request, PropfindRequest::PropNames);
        assert_eq!(request.extra_props(), BTreeSet::from([PropName::Names]));
    }

    #[test]
    fn bad_shapes_are_rejected() {
        let bodies: [&[u8]; 13] = [
            b"",
            b"not xml at all",
            br#"<D:prop xmlns:D="DAV:"/>"#,
            br#"<propfind><allprop/></propfind>"#,
            br#"<D:propfind xmlns:D="DAV:"><D:allprop/><D:propname/></D:propfind>"#,
            br#"<D:propfind xmlns:D="DAV:"><D:propname/><D:include/></D:propfind>"#,
            br#"<D:propfind xmlns:D="DAV:"><D:prop>"#,
            br#"<D:propfind xmlns:D="DAV:"/>"#,
            br#"<D:propfind xmlns:D="DAV:"><D:allprop/><D:prop/></D:propfind>"#,
            br#"<D:propfind xmlns:D="DAV:"><D:allprop/><D:foo/></D:propfind>"#,
            br#"<D:propfind xmlns:D="DAV:"><D:include/><D:allprop/></D:propfind>"#,
            br#"<D:propfind xmlns:D="DAV:"><D:allprop/><D:include/><D:foo/></D:propfind>"#,
            br#"<D:propfind xmlns:D="DAV:"><D:prop><D:displayname/></D:prop><D:bogus/></D:propfind>"#,
        ];
        for body in bodies {
            assert!(
                PropfindRequest::parse(body).is_err(),
                "{}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn unknown_sections_are_rejected() {
        let body = br#"<D:propfind xmlns:D="DAV:"><D:bogus/><D:propname/></D:propfind>"#;
        assert!(matches!(
            PropfindRequest::parse(body),
            Err(PropfindParseError::Shape(_))
        ));
    }

    #[test]
    fn mismatched_tags_are_rejected() {
        let body = br#"<D:propfind xmlns:D="DAV:"><D:allprop></D:prop></D:propfind>"#;
        assert!(matches!(
            PropfindRequest::parse(body),
            Err(PropfindParseError::Xml(_))
        ));
    }
}
