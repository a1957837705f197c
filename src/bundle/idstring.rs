//! Hashed identifiers used throughout the bundle format.
//!
//! Every path, extension, language and package name in a bundle archive is
//! stored as a 64-bit hash of its source string. The hash is Bob Jenkins'
//! lookup8 with a zero seed; lookups only work if this matches the engine
//! bit for bit.

use byteorder::{ByteOrder, LittleEndian};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use crate::error::{IndexError, Result};

const GOLDEN_RATIO: u64 = 0x9e37_79b9_7f4a_7c13;

fn mix64(mut a: u64, mut b: u64, mut c: u64) -> (u64, u64, u64) {
    a = a.wrapping_sub(b).wrapping_sub(c) ^ (c >> 43);
    b = b.wrapping_sub(c).wrapping_sub(a) ^ (a << 9);
    c = c.wrapping_sub(a).wrapping_sub(b) ^ (b >> 8);
    a = a.wrapping_sub(b).wrapping_sub(c) ^ (c >> 38);
    b = b.wrapping_sub(c).wrapping_sub(a) ^ (a << 23);
    c = c.wrapping_sub(a).wrapping_sub(b) ^ (b >> 5);
    a = a.wrapping_sub(b).wrapping_sub(c) ^ (c >> 35);
    b = b.wrapping_sub(c).wrapping_sub(a) ^ (a << 49);
    c = c.wrapping_sub(a).wrapping_sub(b) ^ (b >> 11);
    a = a.wrapping_sub(b).wrapping_sub(c) ^ (c >> 12);
    b = b.wrapping_sub(c).wrapping_sub(a) ^ (a << 18);
    c = c.wrapping_sub(a).wrapping_sub(b) ^ (b >> 22);
    (a, b, c)
}

/// Hash a byte string the way the engine does.
pub fn hash64(data: &[u8]) -> u64 {
    let mut a = 0u64;
    let mut b = 0u64;
    let mut c = GOLDEN_RATIO;

    let mut blocks = data.chunks_exact(24);
    for block in &mut blocks {
        a = a.wrapping_add(LittleEndian::read_u64(&block[0..8]));
        b = b.wrapping_add(LittleEndian::read_u64(&block[8..16]));
        c = c.wrapping_add(LittleEndian::read_u64(&block[16..24]));
        (a, b, c) = mix64(a, b, c);
    }

    // The low byte of `c` is reserved for the length
    c = c.wrapping_add(data.len() as u64);
    for (i, &byte) in blocks.remainder().iter().enumerate() {
        let byte = byte as u64;
        match i {
            0..=7 => a = a.wrapping_add(byte << (8 * i)),
            8..=15 => b = b.wrapping_add(byte << (8 * (i - 8))),
            _ => c = c.wrapping_add(byte << (8 * (i - 15))),
        }
    }

    mix64(a, b, c).2
}

/// A hashed string identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Idstring(pub u64);

impl Idstring {
    /// Hash a source string.
    pub fn hash(source: &str) -> Self {
        Idstring(hash64(source.as_bytes()))
    }

    /// Parse a string as shown to clients.
    ///
    /// Unknown hashes are displayed as `@ID<hex>@`; that form is decoded
    /// back to the raw hash, anything else is hashed.
    pub fn from_display(text: &str) -> Self {
        Self::parse_raw(text).unwrap_or_else(|| Self::hash(text))
    }

    fn parse_raw(text: &str) -> Option<Self> {
        let hex = text.strip_prefix("@ID")?.strip_suffix('@')?;
        if hex.len() != 16 {
            return None;
        }
        u64::from_str_radix(hex, 16).ok().map(Idstring)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Idstring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@ID{:016x}@", self.0)
    }
}

/// Reverse lookup from hashes to the strings they were made from.
#[derive(Debug, Default, Clone)]
pub struct HashList {
    strings: HashMap<u64, Box<str>>,
}

impl HashList {
    pub fn new() -> Self {
        let mut list = Self::default();
        list.insert("");
        list
    }

    /// Load a newline-separated list of source strings.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| IndexError::HashList {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_lines(text.lines()))
    }

    pub fn from_lines<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut list = Self::new();
        for line in lines {
            list.insert(line.trim_end_matches('\r'));
        }
        list
    }

    /// Remember a source string, returning its hash.
    pub fn insert(&mut self, source: &str) -> Idstring {
        let id = Idstring::hash(source);
        self.strings.entry(id.0).or_insert_with(|| source.into());
        id
    }

    pub fn get(&self, id: Idstring) -> Option<&str> {
        self.strings.get(&id.0).map(|s| &**s)
    }

    /// The source string if known, otherwise the `@ID<hex>@` form.
    pub fn resolve(&self, id: Idstring) -> Cow<'_, str> {
        match self.get(id) {
            Some(s) => Cow::Borrowed(s),
            None => Cow::Owned(id.to_string()),
        }
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
