//! Conversions offered by [`TransformProvider`](crate::provider::TransformProvider).

pub mod strings;

pub use strings::{StringTable, StringsToJson};

use std::sync::Arc;

use crate::bundle::HashList;
use crate::provider::TransformRule;

pub const DDS_CONTENT_TYPE: &str = "image/vnd-ms.dds";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Rules applied when serving an archive:
///
/// - `.texture` files are DDS images and are served as `.dds`
/// - `.strings` tables are also offered as `.strings.json`
pub fn default_rules(hashlist: Arc<HashList>) -> Vec<TransformRule> {
    vec![
        TransformRule::rename(".texture", ".dds").with_content_type(DDS_CONTENT_TYPE),
        TransformRule::derive(
            ".strings",
            ".strings.json",
            Arc::new(StringsToJson::new(hashlist)),
        )
        .with_content_type(JSON_CONTENT_TYPE),
    ]
}
