use anyhow::Context;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs::File;

use crate::bundle::{BundleDatabase, ItemId, ItemKind, Walk};
use crate::dav::{PropName, PropValue, PropfindResult};
use crate::io::{ContentStream, SliceReader};

use super::{BodySource, Content, OperationDepth, PropfindIter, ReadableFilesystem};

const OCTET_STREAM: &str = "application/octet-stream";

/// Serves the archive index read-only, one resource per indexed item.
#[derive(Debug, Clone)]
pub struct ExtractProvider {
    db: Arc<BundleDatabase>,
}

impl ExtractProvider {
    /// Create a provider over an index that is already built.
    pub fn new(db: Arc<BundleDatabase>) -> Self {
        Self { db }
    }

    /// The index this provider serves.
    pub fn database(&self) -> &Arc<BundleDatabase> {
        &self.db
    }
}

#[async_trait]
impl ReadableFilesystem for ExtractProvider {
    fn supports_descendant_depth(&self) -> bool {
        true
    }

    fn enumerate_properties(
        &self,
        path: &str,
        depth: OperationDepth,
        all_props: bool,
        props: &BTreeSet<PropName>,
    ) -> Option<PropfindIter> {
        let id = self.db.lookup_path(path)?;

        let walk = if depth.contains(OperationDepth::INCLUDE_DESCENDANTS) {
            Some(Walk::descendants(&self.db, id))
        } else if depth.contains(OperationDepth::INCLUDE_CHILDREN) {
            Some(Walk::children(&self.db, id))
        } else {
            None
        };

        Some(Box::new(PropertyIter {
            db: self.db.clone(),
            start: depth.contains(OperationDepth::INCLUDE_SELF).then_some(id),
            walk,
            all_props,
            props: props.clone(),
        }))
    }

    /// Content of a file comes from its preferred placement, the largest
    /// copy among the packages that store it.
    async fn get_content(&self, path: &str, _accept: &[String]) -> Content {
        let Some(id) = self.db.lookup_path(path) else {
            return Content::not_found();
        };
        let item = self.db.item(id);
        match &item.kind {
            ItemKind::Collection { .. } => Content::collection(item.last_modified),
            ItemKind::File { placements } => {
                let Some(placement) = placements.first() else {
                    return Content::not_found();
                };
                let package = self.db.package(placement.package);
                Content::file(
                    OCTET_STREAM,
                    item.last_modified,
                    placement.length,
                    Box::new(PlacementBody {
                        data_path: package.data_path.clone(),
                        offset: placement.offset,
                        length: placement.length,
                    }),
                )
            }
        }
    }
}

/// Results for one PROPFIND, computed as the engine pulls them.
struct PropertyIter {
    db: Arc<BundleDatabase>,
    start: Option<ItemId>,
    walk: Option<Walk>,
    all_props: bool,
    props: BTreeSet<PropName>,
}

impl Iterator for PropertyIter {
    type Item = PropfindResult;

    fn next(&mut self) -> Option<PropfindResult> {
        let id = match self.start.take() {
            Some(id) => id,
            None => self.walk.as_mut()?.next(&self.db)?,
        };
        Some(describe(&self.db, id, self.all_props, &self.props))
    }
}

/// Properties of one item.
///
/// Standard properties are filled in when `all_props` is set or they are
/// named in `props`. `pd2:in-packages` and the property-name list are only
/// filled in when named.
fn describe(
    db: &BundleDatabase,
    id: ItemId,
    all_props: bool,
    props: &BTreeSet<PropName>,
) -> PropfindResult {
    let item = db.item(id);
    let collection = item.is_collection();
    let wants = |name: &PropName| all_props || props.contains(name);

    let mut result = PropfindResult::new(format!("/{}", item.path), collection);

    if wants(&PropName::GetLastModified) {
        result.add(PropName::GetLastModified, PropValue::Date(item.last_modified));
    }
    if wants(&PropName::ResourceType) && !collection {
        result.add(PropName::ResourceType, PropValue::Empty);
    }
    if !collection {
        if wants(&PropName::GetContentLength) {
            result.add(
                PropName::GetContentLength,
                PropValue::text(item.content_length()),
            );
        }
        if wants(&PropName::GetContentType) {
            result.add(PropName::GetContentType, PropValue::text(OCTET_STREAM));
        }
    }
    if wants(&PropName::DisplayName) {
        result.add(PropName::DisplayName, PropValue::text(item.name()));
    }

    // Only on request: listing packages is not part of allprop
    if props.contains(&PropName::InPackages) {
        let packages = item
            .placements()
            .iter()
            .map(|p| {
                PropValue::Element(
                    PropName::Package,
                    Box::new(PropValue::text(&db.package(p.package).display_name)),
                )
            })
            .collect();
        result.add(PropName::InPackages, PropValue::Sequence(packages));
    }

    if props.contains(&PropName::Names) {
        let mut names = vec![
            PropName::GetLastModified,
            PropName::ResourceType,
            PropName::DisplayName,
            PropName::InPackages,
        ];
        if !collection {
            names.extend([PropName::GetContentLength, PropName::GetContentType]);
        }
        names.sort();
        result.add(
            PropName::Names,
            PropValue::Sequence(names.into_iter().map(PropValue::marker).collect()),
        );
    }

    result
}

/// Byte range of a package data file.
struct PlacementBody {
    data_path: PathBuf,
    offset: u64,
    length: u64,
}

#[async_trait]
impl BodySource for PlacementBody {
    async fn open(&self) -> anyhow::Result<ContentStream> {
        let file = File::open(&self.data_path)
            .await
            .with_context(|| format!("Failed to open {}", self.data_path.display()))?;
        let slice = SliceReader::new(file, self.offset, self.length)
            .await
            .with_context(|| format!("Failed to slice {}", self.data_path.display()))?;
        Ok(Box::pin(slice))
    }
}
