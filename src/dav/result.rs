use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};

use super::names::PropName;

/// Value of a found property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropValue {
    /// Present but without content, like `resourcetype` of a file
    Empty,
    Text(String),
    /// Written as an HTTP date
    Date(DateTime<Utc>),
    /// A child element, such as the `collection` marker
    Element(PropName, Box<PropValue>),
    Sequence(Vec<PropValue>),
}

impl PropValue {
    pub fn text(value: impl ToString) -> Self {
        PropValue::Text(value.to_string())
    }

    /// An empty child element.
    pub fn marker(name: PropName) -> Self {
        PropValue::Element(name, Box::new(PropValue::Empty))
    }

    /// Whether this value is, or directly contains, the element `name`.
    pub fn contains_element(&self, name: &PropName) -> bool {
        match self {
            PropValue::Element(element, _) => element == name,
            PropValue::Sequence(items) => items
                .iter()
                .any(|item| matches!(item, PropValue::Element(element, _) if element == name)),
            _ => false,
        }
    }
}

/// Outcome for one property of one resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropStatus {
    Found,
    NotFound,
    AccessDenied,
}

impl PropStatus {
    pub fn status_line(self) -> &'static str {
        match self {
            PropStatus::Found => "HTTP/1.1 200 OK",
            PropStatus::NotFound => "HTTP/1.1 404 Not Found",
            PropStatus::AccessDenied => "HTTP/1.1 403 Forbidden",
        }
    }
}

/// Properties of one resource in a PROPFIND answer.
///
/// A name is either found with a value, access denied, or absent. Absent
/// names that were asked for are reported as not found when serialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropfindResult {
    path: String,
    found: BTreeMap<PropName, PropValue>,
    access_denied: BTreeSet<PropName>,
}

impl PropfindResult {
    /// Start a result; collections get their `resourcetype` right away.
    pub fn new(path: impl Into<String>, is_collection: bool) -> Self {
        let mut result = Self {
            path: path.into(),
            found: BTreeMap::new(),
            access_denied: BTreeSet::new(),
        };
        if is_collection {
            result.add(
                PropName::ResourceType,
                PropValue::marker(PropName::Collection),
            );
        }
        result
    }

    /// Path relative to the served root, with a leading slash.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn is_collection(&self) -> bool {
        self.found
            .get(&PropName::ResourceType)
            .is_some_and(|value| value.contains_element(&PropName::Collection))
    }

    pub fn get(&self, name: &PropName) -> Option<&PropValue> {
        self.found.get(name)
    }

    /// Set a found property, replacing any earlier value or failure.
    pub fn add(&mut self, name: PropName, value: PropValue) {
        self.access_denied.remove(&name);
        self.found.insert(name, value);
    }

    /// Set a found property unless it already has a value or a failure.
    pub fn add_if_missing(&mut self, name: PropName, value: PropValue) {
        if !self.access_denied.contains(&name) {
            self.found.entry(name).or_insert(value);
        }
    }

    /// Record a status other than a value for `name`.
    pub fn add_failure(&mut self, name: PropName, status: PropStatus) {
        match status {
            PropStatus::Found => self.add(name, PropValue::Empty),
            PropStatus::NotFound => self.remove(&name),
            PropStatus::AccessDenied => {
                self.found.remove(&name);
                self.access_denied.insert(name);
            }
        }
    }

    pub fn remove(&mut self, name: &PropName) {
        self.found.remove(name);
        self.access_denied.remove(name);
    }

    pub fn status_for(&self, name: &PropName) -> PropStatus {
        if self.found.contains_key(name) {
            PropStatus::Found
        } else if self.access_denied.contains(name) {
            PropStatus::AccessDenied
        } else {
            PropStatus::NotFound
        }
    }

    pub fn found(&self) -> impl Iterator<Item = (&PropName, &PropValue)> {
        self.found.iter()
    }

    pub fn access_denied(&self) -> impl Iterator<Item = &PropName> {
        self.access_denied.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collections_carry_the_marker() {
        let dir = PropfindResult::new("/units", true);
        assert!(dir.is_collection());
        assert_eq!(dir.status_for(&PropName::ResourceType), PropStatus::Found);

        let file = PropfindResult::new("/units/a.texture", false);
        assert!(!file.is_collection());
        assert_eq!(file.status_for(&PropName::ResourceType), PropStatus::NotFound);
    }

    #[test]
    fn a_name_has_exactly_one_status() {
        let mut result = PropfindResult::new("/a", false);
        result.add(PropName::DisplayName, PropValue::text("a"));
        result.add_failure(PropName::DisplayName, PropStatus::AccessDenied);
        assert_eq!(result.status_for(&PropName::DisplayName), PropStatus::AccessDenied);
        assert_eq!(result.found().count(), 0);

        result.add_if_missing(PropName::DisplayName, PropValue::text("b"));
        assert_eq!(result.status_for(&PropName::DisplayName), PropStatus::AccessDenied);

        result.add(PropName::DisplayName, PropValue::text("c"));
        assert_eq!(result.access_denied().count(), 0);
        assert_eq!(result.get(&PropName::DisplayName), Some(&PropValue::text("c")));

        result.add_failure(PropName::DisplayName, PropStatus::NotFound);
        assert_eq!(result.status_for(&PropName::DisplayName), PropStatus::NotFound);
    }
}
