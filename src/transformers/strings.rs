//! String tables (`.strings`) as JSON.
//!
//! ```text
//! u32 count
//! u32 reserved
//! u64 entries_offset
//! count x { u64 id, u64 text_offset }      at entries_offset
//! NUL-terminated UTF-8 text                 at each text_offset
//! ```

use anyhow::{Context, bail};
use async_trait::async_trait;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde_json::{Map, Value};
use std::io::{Cursor, Seek, SeekFrom};
use std::sync::Arc;

use crate::bundle::{HashList, Idstring};
use crate::io::ContentStream;
use crate::provider::StreamTransform;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringTable {
    pub entries: Vec<(Idstring, String)>,
}

impl StringTable {
    const PREAMBLE_SIZE: u64 = 16;
    const ENTRY_SIZE: u64 = 16;

    pub fn from_bytes(data: &[u8]) -> anyhow::Result<Self> {
        let mut cursor = Cursor::new(data);
        let count = cursor.read_u32::<LittleEndian>().context("string table too short")?;
        let _reserved = cursor.read_u32::<LittleEndian>()?;
        let entries_offset = cursor.read_u64::<LittleEndian>()?;

        let table_end = (count as u64)
            .checked_mul(Self::ENTRY_SIZE)
            .and_then(|size| size.checked_add(entries_offset));
        if table_end.is_none_or(|end| end > data.len() as u64) {
            bail!("{count} entries at offset {entries_offset} do not fit in {} bytes", data.len());
        }

        cursor.seek(SeekFrom::Start(entries_offset))?;
        let mut entries = Vec::with_capacity(count as usize);
        for index in 0..count {
            let id = Idstring(cursor.read_u64::<LittleEndian>()?);
            let text_offset = cursor.read_u64::<LittleEndian>()?;
            let text = data
                .get(text_offset as usize..)
                .and_then(|rest| rest.iter().position(|&b| b == 0).map(|end| &rest[..end]))
                .with_context(|| format!("text of entry {index} is not terminated"))?;
            entries.push((id, String::from_utf8_lossy(text).into_owned()));
        }

        Ok(Self { entries })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let texts_start = Self::PREAMBLE_SIZE + Self::ENTRY_SIZE * self.entries.len() as u64;
        let mut out = Vec::new();
        // Writes into a Vec cannot fail
        let _ = out.write_u32::<LittleEndian>(self.entries.len() as u32);
        let _ = out.write_u32::<LittleEndian>(0);
        let _ = out.write_u64::<LittleEndian>(Self::PREAMBLE_SIZE);

        let mut texts = Vec::new();
        for (id, text) in &self.entries {
            let _ = out.write_u64::<LittleEndian>(id.raw());
            let _ = out.write_u64::<LittleEndian>(texts_start + texts.len() as u64);
            texts.extend_from_slice(text.as_bytes());
            texts.push(0);
        }
        out.extend_from_slice(&texts);
        out
    }

    /// JSON object of resolved id to text. Later duplicates win.
    pub fn to_json(&self, hashlist: &HashList) -> Value {
        let mut map = Map::new();
        for (id, text) in &self.entries {
            let key = hashlist.resolve(*id);
            if key.is_empty() && text.is_empty() {
                continue;
            }
            map.insert(key.into_owned(), Value::String(text.clone()));
        }
        Value::Object(map)
    }
}

/// Converts a string table into pretty-printed JSON.
pub struct StringsToJson {
    hashlist: Arc<HashList>,
}

impl StringsToJson {
    pub fn new(hashlist: Arc<HashList>) -> Self {
        Self { hashlist }
    }
}

#[async_trait]
impl StreamTransform for StringsToJson {
    async fn transform(&self, mut input: ContentStream) -> anyhow::Result<ContentStream> {
        use tokio::io::AsyncReadExt;

        let mut data = Vec::new();
        input
            .read_to_end(&mut data)
            .await
            .context("Failed to read string table")?;
        let table = StringTable::from_bytes(&data)?;
        let json = serde_json::to_vec_pretty(&table.to_json(&self.hashlist))?;
        Ok(Box::pin(Cursor::new(json)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    fn table() -> StringTable {
        StringTable {
            entries: vec![
                (Idstring::hash("menu_title"), "PAYDAY".to_string()),
                (Idstring::hash(""), String::new()),
                (Idstring::hash("unnamed"), "Üñí".to_string()),
            ],
        }
    }

    #[test]
    fn entries_decode() {
        let decoded = StringTable::from_bytes(&table().to_bytes()).unwrap();
        assert_eq!(decoded, table());
    }

    #[test]
    fn unterminated_text_is_an_error() {
        let mut bytes = table().to_bytes();
        bytes.pop();
        assert!(StringTable::from_bytes(&bytes).is_err());
        assert!(StringTable::from_bytes(&bytes[..10]).is_err());
    }

    #[test]
    fn json_skips_blank_entries_and_names_unknown_ids() {
        let hashlist = HashList::from_lines(["menu_title"]);
        let json = table().to_json(&hashlist);
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2);
        assert_eq!(object["menu_title"], "PAYDAY");
        assert_eq!(
            object[&Idstring::hash("unnamed").to_string()],
            "Üñí"
        );
    }

    #[tokio::test]
    async fn transform_produces_json() {
        let transform = StringsToJson::new(Arc::new(HashList::from_lines(["menu_title"])));
        let input: ContentStream = Box::pin(Cursor::new(table().to_bytes()));
        let mut output = transform.transform(input).await.unwrap();
        let mut text = String::new();
        output.read_to_string(&mut text).await.unwrap();

        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["menu_title"], "PAYDAY");
        assert!(text.contains('\n'));
    }
}
