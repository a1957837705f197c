//! The archive index: every file of the header database arranged into a
//! directory tree, with the byte ranges each file occupies in the packages.
//!
//! Items live in one arena and refer to each other by [`ItemId`]. The tree is
//! built once by [`BundleDatabase::open`] and never changes afterwards, so a
//! single instance can be shared by every request through an `Arc`.

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{IndexError, Result};

use super::idstring::{HashList, Idstring};
use super::parser::{self, LoadedPackage};

/// Lookup key of an item: hashed path plus optional language and extension.
///
/// Collections always have neither language nor extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub path: Idstring,
    pub language: Option<Idstring>,
    pub extension: Option<Idstring>,
}

impl ItemKey {
    pub fn collection(path: Idstring) -> Self {
        Self {
            path,
            language: None,
            extension: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackageId(u32);

/// Where one copy of a file's bytes lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub package: PackageId,
    pub offset: u64,
    pub length: u64,
}

/// A file stored in a package, seen from the package's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileRef {
    pub file: ItemId,
    pub offset: u64,
    pub length: u64,
}

/// One physical package pair on disk.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: Idstring,
    /// Name as shown to clients
    pub display_name: String,
    pub data_path: PathBuf,
    /// Later of the data and header file modification times
    pub last_modified: DateTime<Utc>,
    /// Files stored in this package, ordered by offset
    pub files: Vec<FileRef>,
}

#[derive(Debug, Clone)]
pub enum ItemKind {
    Collection {
        children: BTreeMap<String, ItemId>,
    },
    File {
        /// Largest placement first after loading
        placements: Vec<Placement>,
    },
}

/// A node of the tree.
#[derive(Debug, Clone)]
pub struct Item {
    pub key: ItemKey,
    /// Full path without a leading slash; empty for the root
    pub path: String,
    pub last_modified: DateTime<Utc>,
    pub kind: ItemKind,
}

impl Item {
    pub fn is_collection(&self) -> bool {
        matches!(self.kind, ItemKind::Collection { .. })
    }

    /// Final path segment.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Length of the preferred placement; collections have none.
    pub fn content_length(&self) -> u64 {
        match &self.kind {
            ItemKind::File { placements } => placements.first().map_or(0, |p| p.length),
            ItemKind::Collection { .. } => 0,
        }
    }

    pub fn placements(&self) -> &[Placement] {
        match &self.kind {
            ItemKind::File { placements } => placements,
            ItemKind::Collection { .. } => &[],
        }
    }
}

/// Breadth-first cursor over the items below a collection.
///
/// The walk only holds ids, never borrows the database, so it can live next
/// to an `Arc<BundleDatabase>` in an owning iterator. The queue never holds
/// more than the items of one tree level plus the next.
#[derive(Debug, Clone, Default)]
pub struct Walk {
    queue: VecDeque<ItemId>,
    recurse: bool,
}

impl Walk {
    /// Direct children of `id` only.
    pub fn children(db: &BundleDatabase, id: ItemId) -> Self {
        Self::start(db, id, false)
    }

    /// Every item below `id`, level by level.
    pub fn descendants(db: &BundleDatabase, id: ItemId) -> Self {
        Self::start(db, id, true)
    }

    fn start(db: &BundleDatabase, id: ItemId, recurse: bool) -> Self {
        let mut walk = Walk {
            queue: VecDeque::new(),
            recurse,
        };
        walk.enqueue_children(db, id);
        walk
    }

    fn enqueue_children(&mut self, db: &BundleDatabase, id: ItemId) {
        if let ItemKind::Collection { children } = &db.item(id).kind {
            self.queue.extend(children.values().copied());
        }
    }

    pub fn next(&mut self, db: &BundleDatabase) -> Option<ItemId> {
        let id = self.queue.pop_front()?;
        if self.recurse {
            self.enqueue_children(db, id);
        }
        Some(id)
    }
}

/// Candidate keys for a request path, most specific first.
///
/// The final segment is read as `name.language.extension`, then as
/// `name.extension`, then as a plain name. Only the first reading follows the
/// engine's own convention; the others let names with extra dots resolve.
pub fn path_candidates(path: &str) -> Vec<ItemKey> {
    let (dir, name) = match path.rfind('/') {
        Some(i) => path.split_at(i + 1),
        None => ("", path),
    };
    let mut candidates = Vec::with_capacity(3);

    let parts: Vec<&str> = name.rsplitn(3, '.').collect();
    if let [extension, language, stem] = parts[..] {
        if !stem.is_empty() && !language.is_empty() && !extension.is_empty() {
            candidates.push(ItemKey {
                path: Idstring::from_display(&format!("{dir}{stem}")),
                language: Some(Idstring::from_display(language)),
                extension: Some(Idstring::from_display(extension)),
            });
        }
    }

    if let Some((stem, extension)) = name.rsplit_once('.') {
        if !stem.is_empty() && !extension.is_empty() {
            candidates.push(ItemKey {
                path: Idstring::from_display(&format!("{dir}{stem}")),
                language: None,
                extension: Some(Idstring::from_display(extension)),
            });
        }
    }

    candidates.push(ItemKey::collection(Idstring::from_display(path)));
    candidates
}

/// The archive index.
#[derive(Debug)]
pub struct BundleDatabase {
    base_path: PathBuf,
    hashlist: Arc<HashList>,
    packages: Vec<Package>,
    items: Vec<Item>,
    by_key: HashMap<ItemKey, ItemId>,
    root: ItemId,
}

/// A database entry waiting for its placements.
struct PendingFile {
    file_id: u32,
    key: ItemKey,
    placements: Vec<Placement>,
}

impl BundleDatabase {
    /// Index an archive directory.
    ///
    /// Fails only when the header database is missing or corrupt. Packages
    /// that cannot be read are logged and left out; files found in no
    /// readable package are left out of the tree.
    pub fn open(dir: &Path, hashlist: HashList) -> Result<Self> {
        let database = parser::load_database(dir)?;
        let languages = database.language_map();

        let mut pending = Vec::with_capacity(database.entries.len());
        let mut by_file_id = HashMap::with_capacity(database.entries.len());
        for entry in &database.entries {
            let language = match entry.language {
                0 => None,
                representation => Some(*languages.get(&representation).ok_or_else(|| {
                    IndexError::DatabaseCorrupt(format!(
                        "entry {} names unknown language {}",
                        entry.file_id, representation
                    ))
                })?),
            };
            if by_file_id.insert(entry.file_id, pending.len()).is_some() {
                return Err(IndexError::DatabaseCorrupt(format!(
                    "file id {} appears twice",
                    entry.file_id
                )));
            }
            pending.push(PendingFile {
                file_id: entry.file_id,
                key: ItemKey {
                    path: entry.path,
                    language,
                    extension: entry.extension,
                },
                placements: Vec::new(),
            });
        }
        info!(
            "Read {} database entries in {} languages",
            pending.len(),
            languages.len()
        );

        let mut packages = Vec::new();
        for source in parser::discover_packages(dir)? {
            let loaded = match parser::load_package(&source) {
                Ok(loaded) => loaded,
                Err(err) => {
                    warn!("Skipping package: {}", err);
                    continue;
                }
            };
            if let Some(entry) = loaded
                .entries
                .iter()
                .find(|e| !by_file_id.contains_key(&e.file_id))
            {
                warn!(
                    "Skipping package: {}",
                    IndexError::package(
                        &source.data_path,
                        format!("file id {} is not in the database", entry.file_id)
                    )
                );
                continue;
            }

            let package = PackageId(packages.len() as u32);
            for entry in &loaded.entries {
                pending[by_file_id[&entry.file_id]].placements.push(Placement {
                    package,
                    offset: entry.address as u64,
                    length: entry.length as u64,
                });
            }
            packages.push(new_package(loaded, &hashlist));
        }

        let mut db = BundleDatabase {
            base_path: dir.to_path_buf(),
            hashlist: Arc::new(hashlist),
            packages,
            items: Vec::with_capacity(pending.len()),
            by_key: HashMap::with_capacity(pending.len()),
            root: ItemId(0),
        };
        db.root = db.push_item(ItemKey::collection(Idstring::hash("")), String::new(), true);

        pending.sort_by_key(|p| p.file_id);
        let mut unplaced = 0usize;
        for file in pending {
            if file.placements.is_empty() {
                unplaced += 1;
                continue;
            }
            db.insert_file(file);
        }
        if unplaced > 0 {
            debug!("{} database entries are not stored in any readable package", unplaced);
        }

        db.post_load();

        info!(
            "Indexed {} files in {} packages",
            db.file_count(),
            db.packages.len()
        );
        Ok(db)
    }

    fn push_item(&mut self, key: ItemKey, path: String, collection: bool) -> ItemId {
        let id = ItemId(self.items.len() as u32);
        let kind = if collection {
            ItemKind::Collection {
                children: BTreeMap::new(),
            }
        } else {
            ItemKind::File {
                placements: Vec::new(),
            }
        };
        self.items.push(Item {
            key,
            path,
            last_modified: DateTime::UNIX_EPOCH,
            kind,
        });
        self.by_key.insert(key, id);
        id
    }

    fn insert_file(&mut self, file: PendingFile) {
        if self.by_key.contains_key(&file.key) {
            warn!(
                "Database entry {} duplicates an existing path, ignoring it",
                file.file_id
            );
            return;
        }

        let mut path = self.hashlist.resolve(file.key.path).into_owned();
        if let Some(language) = file.key.language {
            path.push('.');
            path.push_str(&self.hashlist.resolve(language));
        }
        if let Some(extension) = file.key.extension {
            path.push('.');
            path.push_str(&self.hashlist.resolve(extension));
        }

        let id = self.push_item(file.key, path, false);
        for placement in &file.placements {
            self.packages[placement.package.0 as usize].files.push(FileRef {
                file: id,
                offset: placement.offset,
                length: placement.length,
            });
        }
        self.items[id.0 as usize].kind = ItemKind::File {
            placements: file.placements,
        };
        self.attach(id);
    }

    /// Link an item to its parent, creating missing ancestors on the way up.
    fn attach(&mut self, mut child: ItemId) {
        loop {
            let child_path = &self.items[child.0 as usize].path;
            if child_path.is_empty() {
                return;
            }
            let (parent_path, name) = match child_path.rfind('/') {
                Some(i) => (child_path[..i].to_string(), child_path[i + 1..].to_string()),
                None => (String::new(), child_path.clone()),
            };

            let key = ItemKey::collection(Idstring::hash(&parent_path));
            let (parent, created) = match self.by_key.get(&key) {
                Some(&parent) => (parent, false),
                None => (self.push_item(key, parent_path, true), true),
            };

            match &mut self.items[parent.0 as usize].kind {
                ItemKind::Collection { children } => {
                    if children.insert(name, child).is_some() {
                        warn!(
                            "Two items share the path {}",
                            self.items[child.0 as usize].path
                        );
                    }
                }
                ItemKind::File { .. } => {
                    warn!(
                        "Cannot place {} below a file",
                        self.items[child.0 as usize].path
                    );
                    return;
                }
            }

            if !created {
                return;
            }
            child = parent;
        }
    }

    fn post_load(&mut self) {
        let root = self.root;
        post_load_item(&mut self.items, &self.packages, root);
        for package in &mut self.packages {
            package.files.sort_by_key(|f| f.offset);
            package.files.shrink_to_fit();
        }
        self.by_key.shrink_to_fit();
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn hashlist(&self) -> &Arc<HashList> {
        &self.hashlist
    }

    pub fn root(&self) -> ItemId {
        self.root
    }

    pub fn item(&self, id: ItemId) -> &Item {
        &self.items[id.0 as usize]
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.0 as usize]
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn file_count(&self) -> usize {
        self.items.iter().filter(|i| !i.is_collection()).count()
    }

    pub fn lookup(&self, key: &ItemKey) -> Option<ItemId> {
        self.by_key.get(key).copied()
    }

    /// Resolve a path such as `units/foo.english.texture`.
    ///
    /// Leading and trailing slashes are ignored; an empty path is the root.
    pub fn lookup_path(&self, path: &str) -> Option<ItemId> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Some(self.root);
        }
        path_candidates(path)
            .iter()
            .find_map(|key| self.lookup(key))
    }

    /// Direct children; empty for files.
    pub fn children(&self, id: ItemId) -> impl Iterator<Item = ItemId> + '_ {
        let mut walk = Walk::children(self, id);
        std::iter::from_fn(move || walk.next(self))
    }

    /// All items below `id` in breadth-first order; empty for files.
    pub fn descendants(&self, id: ItemId) -> impl Iterator<Item = ItemId> + '_ {
        let mut walk = Walk::descendants(self, id);
        std::iter::from_fn(move || walk.next(self))
    }
}

fn new_package(loaded: LoadedPackage, hashlist: &HashList) -> Package {
    let source = loaded.source;
    Package {
        name: source.name,
        display_name: hashlist
            .get(source.name)
            .map_or_else(|| source.stem.clone(), str::to_string),
        data_path: source.data_path,
        last_modified: loaded.last_modified,
        files: Vec::with_capacity(loaded.entries.len()),
    }
}

/// Sort placements and propagate modification times up the tree.
fn post_load_item(items: &mut [Item], packages: &[Package], id: ItemId) -> DateTime<Utc> {
    let last_modified = match &mut items[id.0 as usize].kind {
        ItemKind::File { placements } => {
            // Stable, so equal lengths keep package order
            placements.sort_by(|a, b| b.length.cmp(&a.length));
            placements.shrink_to_fit();
            placements
                .iter()
                .map(|p| packages[p.package.0 as usize].last_modified)
                .max()
                .unwrap_or(DateTime::UNIX_EPOCH)
        }
        ItemKind::Collection { children } => {
            let children: Vec<ItemId> = children.values().copied().collect();
            children
                .into_iter()
                .map(|child| post_load_item(items, packages, child))
                .max()
                .unwrap_or(DateTime::UNIX_EPOCH)
        }
    };
    items[id.0 as usize].last_modified = last_modified;
    last_modified
}
