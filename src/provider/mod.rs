//! Filesystem providers behind the WebDAV engine.
//!
//! The engine only talks to [`ReadableFilesystem`]. [`ExtractProvider`] serves
//! the archive index as is; [`TransformProvider`] wraps any provider to rename
//! files and convert their contents on the fly.

mod extract;
mod transform;

pub use extract::ExtractProvider;
pub use transform::{StreamTransform, TransformProvider, TransformRule};

use async_trait::async_trait;
use bitflags::bitflags;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::dav::{PropName, PropfindResult};
use crate::io::ContentStream;

bitflags! {
    /// Which items a PROPFIND covers, relative to the requested one.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OperationDepth: u8 {
        const INCLUDE_SELF = 1;
        const INCLUDE_CHILDREN = 1 << 1;
        /// Everything below the children, and the children themselves
        const INCLUDE_DESCENDANTS = 1 << 2;
    }
}

impl OperationDepth {
    pub const ZERO: Self = Self::INCLUDE_SELF;
    pub const ONE: Self = Self::INCLUDE_SELF.union(Self::INCLUDE_CHILDREN);
    pub const INFINITY: Self = Self::ONE.union(Self::INCLUDE_DESCENDANTS);
    pub const ONE_NO_ROOT: Self = Self::INCLUDE_CHILDREN;
    pub const INFINITY_NO_ROOT: Self = Self::INCLUDE_CHILDREN.union(Self::INCLUDE_DESCENDANTS);
}

pub type PropfindIter = Box<dyn Iterator<Item = PropfindResult> + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentStatus {
    Found,
    NotFound,
    AccessDenied,
}

/// Opens the bytes of a resource once the engine decides to send them.
#[async_trait]
pub trait BodySource: Send + Sync {
    async fn open(&self) -> anyhow::Result<ContentStream>;
}

/// Answer to a GET.
pub struct Content {
    pub status: ContentStatus,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    /// Size of the body, when known before reading it
    pub content_length: Option<u64>,
    /// The resource is a collection; the engine renders a listing instead
    pub use_collection_fallback: bool,
    pub body: Option<Box<dyn BodySource>>,
}

impl Content {
    fn with_status(status: ContentStatus) -> Self {
        Self {
            status,
            content_type: None,
            last_modified: None,
            content_length: None,
            use_collection_fallback: false,
            body: None,
        }
    }

    pub fn not_found() -> Self {
        Self::with_status(ContentStatus::NotFound)
    }

    pub fn access_denied() -> Self {
        Self::with_status(ContentStatus::AccessDenied)
    }

    pub fn collection(last_modified: DateTime<Utc>) -> Self {
        Self {
            last_modified: Some(last_modified),
            content_length: Some(0),
            use_collection_fallback: true,
            ..Self::with_status(ContentStatus::Found)
        }
    }

    pub fn file(
        content_type: impl Into<String>,
        last_modified: DateTime<Utc>,
        content_length: u64,
        body: Box<dyn BodySource>,
    ) -> Self {
        Self {
            content_type: Some(content_type.into()),
            last_modified: Some(last_modified),
            content_length: Some(content_length),
            body: Some(body),
            ..Self::with_status(ContentStatus::Found)
        }
    }
}

/// A read-only tree of resources.
#[async_trait]
pub trait ReadableFilesystem: Send + Sync {
    /// Whether [`OperationDepth::INCLUDE_DESCENDANTS`] is honoured. When it
    /// is not, the engine walks the tree one level at a time.
    fn supports_descendant_depth(&self) -> bool;

    /// Properties of `path` and the items below it, as selected by `depth`.
    ///
    /// With `all_props` every standard property is filled in; `props` names
    /// further properties to compute. `None` means the path does not exist.
    /// Results are produced lazily as the caller iterates.
    fn enumerate_properties(
        &self,
        path: &str,
        depth: OperationDepth,
        all_props: bool,
        props: &BTreeSet<PropName>,
    ) -> Option<PropfindIter>;

    async fn get_content(&self, path: &str, accept: &[String]) -> Content;
}
