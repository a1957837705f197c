use std::fmt;

/// Namespace of the core WebDAV properties.
pub const DAV_NAMESPACE: &str = "DAV:";

/// Namespace of the archive-specific properties.
pub const PD2_NAMESPACE: &str = "https://ns.berigora.net/2020/payday2-tools";

/// Name of a WebDAV property or of an element used inside a property value.
///
/// Every name the server understands has its own variant; anything else a
/// client asks for is carried as [`PropName::Other`] so it can be reported
/// back as not found. The derived ordering puts the well-known names first,
/// which keeps multistatus output stable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropName {
    GetLastModified,
    ResourceType,
    GetContentLength,
    GetContentType,
    DisplayName,
    /// `DAV:propname`, the request for a list of property names
    Names,
    /// `DAV:collection`, the marker inside `resourcetype`
    Collection,
    /// Packages holding a copy of a file
    InPackages,
    /// One entry of [`PropName::InPackages`]
    Package,
    Other { namespace: String, local: String },
}

impl PropName {
    pub fn new(namespace: &str, local: &str) -> Self {
        use PropName::*;
        match (namespace, local) {
            (DAV_NAMESPACE, "getlastmodified") => GetLastModified,
            (DAV_NAMESPACE, "resourcetype") => ResourceType,
            (DAV_NAMESPACE, "getcontentlength") => GetContentLength,
            (DAV_NAMESPACE, "getcontenttype") => GetContentType,
            (DAV_NAMESPACE, "displayname") => DisplayName,
            (DAV_NAMESPACE, "propname") => Names,
            (DAV_NAMESPACE, "collection") => Collection,
            (PD2_NAMESPACE, "in-packages") => InPackages,
            (PD2_NAMESPACE, "package") => Package,
            _ => Other {
                namespace: namespace.to_string(),
                local: local.to_string(),
            },
        }
    }

    pub fn namespace(&self) -> &str {
        use PropName::*;
        match self {
            GetLastModified | ResourceType | GetContentLength | GetContentType | DisplayName
            | Names | Collection => DAV_NAMESPACE,
            InPackages | Package => PD2_NAMESPACE,
            Other { namespace, .. } => namespace,
        }
    }

    pub fn local_name(&self) -> &str {
        use PropName::*;
        match self {
            GetLastModified => "getlastmodified",
            ResourceType => "resourcetype",
            GetContentLength => "getcontentlength",
            GetContentType => "getcontenttype",
            DisplayName => "displayname",
            Names => "propname",
            Collection => "collection",
            InPackages => "in-packages",
            Package => "package",
            Other { local, .. } => local,
        }
    }

    /// True for `DAV:<local>`, including names without a variant of their own.
    pub fn is_dav(&self, local: &str) -> bool {
        self.namespace() == DAV_NAMESPACE && self.local_name() == local
    }
}

/// Clark notation, `{namespace}local`.
impl fmt::Display for PropName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace(), self.local_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_map_to_variants() {
        assert_eq!(PropName::new("DAV:", "getlastmodified"), PropName::GetLastModified);
        assert_eq!(PropName::new(PD2_NAMESPACE, "in-packages"), PropName::InPackages);
        assert_eq!(PropName::GetContentLength.to_string(), "{DAV:}getcontentlength");
    }

    #[test]
    fn unknown_names_keep_their_namespace() {
        let name = PropName::new("urn:x", "getlastmodified");
        assert_eq!(
            name,
            PropName::Other {
                namespace: "urn:x".into(),
                local: "getlastmodified".into()
            }
        );
        assert_eq!(name.namespace(), "urn:x");
        assert!(!name.is_dav("getlastmodified"));
        assert!(PropName::new("DAV:", "propfind").is_dav("propfind"));
    }
}
