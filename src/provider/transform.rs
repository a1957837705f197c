use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::dav::{PropName, PropValue, PropfindResult};
use crate::io::ContentStream;

use super::{BodySource, Content, ContentStatus, OperationDepth, PropfindIter, ReadableFilesystem};

/// Rewrites the bytes of a file on their way to the client.
#[async_trait]
pub trait StreamTransform: Send + Sync {
    async fn transform(&self, input: ContentStream) -> anyhow::Result<ContentStream>;
}

/// Maps files ending in `internal_extension` to names ending in
/// `external_extension`.
///
/// A replacing rule renames the file. Otherwise the renamed file is offered
/// next to the original one.
#[derive(Clone)]
pub struct TransformRule {
    pub internal_extension: String,
    pub external_extension: String,
    pub replace: bool,
    pub transform: Option<Arc<dyn StreamTransform>>,
    pub content_type: Option<String>,
}

impl TransformRule {
    pub fn rename(internal: impl Into<String>, external: impl Into<String>) -> Self {
        Self {
            internal_extension: internal.into(),
            external_extension: external.into(),
            replace: true,
            transform: None,
            content_type: None,
        }
    }

    pub fn derive(
        internal: impl Into<String>,
        external: impl Into<String>,
        transform: Arc<dyn StreamTransform>,
    ) -> Self {
        Self {
            internal_extension: internal.into(),
            external_extension: external.into(),
            replace: false,
            transform: Some(transform),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Rename a result of the wrapped provider to this rule's external name.
    fn apply(&self, mut result: PropfindResult) -> PropfindResult {
        let path = result.path();
        let stem = &path[..path.len() - self.internal_extension.len()];
        let path = format!("{stem}{}", self.external_extension);

        if result.get(&PropName::DisplayName).is_some() {
            let name = path.rsplit('/').next().unwrap_or(&path);
            result.add(PropName::DisplayName, PropValue::text(name));
        }
        if let Some(content_type) = &self.content_type {
            if result.get(&PropName::GetContentType).is_some() {
                result.add(PropName::GetContentType, PropValue::text(content_type));
            }
        }
        if self.transform.is_some() {
            // Converted size is only known after converting
            result.remove(&PropName::GetContentLength);
        }
        result.set_path(path);
        result
    }
}

/// Decorator applying [`TransformRule`]s to another provider.
pub struct TransformProvider<F> {
    inner: F,
    rules: Arc<[TransformRule]>,
}

impl<F: ReadableFilesystem> TransformProvider<F> {
    pub fn new(inner: F, rules: Vec<TransformRule>) -> Self {
        Self {
            inner,
            rules: rules.into(),
        }
    }

    pub fn inner(&self) -> &F {
        &self.inner
    }

    /// Rule whose external extension ends `path`, with the path translated
    /// back to the wrapped provider's name. The longest extension wins.
    fn external_rule(&self, path: &str) -> Option<(usize, String)> {
        let mut best: Option<usize> = None;
        for (index, rule) in self.rules.iter().enumerate() {
            if !ends_with_ignore_case(path, &rule.external_extension) {
                continue;
            }
            let longer = |b: usize| {
                self.rules[b].external_extension.len() < rule.external_extension.len()
            };
            if best.is_none_or(longer) {
                best = Some(index);
            }
        }

        let index = best?;
        let rule = &self.rules[index];
        let stem = &path[..path.len() - rule.external_extension.len()];
        Some((index, format!("{stem}{}", rule.internal_extension)))
    }
}

#[async_trait]
impl<F: ReadableFilesystem> ReadableFilesystem for TransformProvider<F> {
    fn supports_descendant_depth(&self) -> bool {
        self.inner.supports_descendant_depth()
    }

    fn enumerate_properties(
        &self,
        path: &str,
        depth: OperationDepth,
        all_props: bool,
        props: &BTreeSet<PropName>,
    ) -> Option<PropfindIter> {
        if let Some((index, internal)) = self.external_rule(path) {
            if let Some(inner) = self.inner.enumerate_properties(&internal, depth, all_props, props) {
                let rules = self.rules.clone();
                let requested = normalize(&internal).to_string();
                return Some(Box::new(inner.flat_map(move |result| {
                    if normalize(result.path()) == requested && !result.is_collection() {
                        vec![rules[index].apply(result)]
                    } else {
                        rewrite(&rules, result)
                    }
                })));
            }
        }

        // A file asked for by its stored name is described as stored
        let inner = self.inner.enumerate_properties(path, depth, all_props, props)?;
        let rules = self.rules.clone();
        let requested = normalize(path).to_string();
        Some(Box::new(inner.flat_map(move |result| {
            if normalize(result.path()) == requested && !result.is_collection() {
                vec![result]
            } else {
                rewrite(&rules, result)
            }
        })))
    }

    async fn get_content(&self, path: &str, accept: &[String]) -> Content {
        if let Some((index, internal)) = self.external_rule(path) {
            let content = self.inner.get_content(&internal, accept).await;
            if content.status != ContentStatus::NotFound {
                return transform_content(&self.rules[index], content);
            }
        }
        self.inner.get_content(path, accept).await
    }
}

/// The results a single wrapped result turns into.
fn rewrite(rules: &[TransformRule], result: PropfindResult) -> Vec<PropfindResult> {
    if result.is_collection() {
        return vec![result];
    }

    let matching: Vec<&TransformRule> = rules
        .iter()
        .filter(|rule| ends_with_ignore_case(result.path(), &rule.internal_extension))
        .collect();
    if matching.is_empty() {
        return vec![result];
    }

    let mut out = Vec::with_capacity(matching.len() + 1);
    for rule in matching.iter().filter(|rule| !rule.replace) {
        out.push(rule.apply(result.clone()));
    }
    match matching.iter().find(|rule| rule.replace) {
        Some(rule) => out.insert(0, rule.apply(result)),
        None => out.insert(0, result),
    }
    out
}

fn transform_content(rule: &TransformRule, mut content: Content) -> Content {
    if content.status != ContentStatus::Found || content.use_collection_fallback {
        return content;
    }
    if let Some(content_type) = &rule.content_type {
        content.content_type = Some(content_type.clone());
    }
    if let Some(transform) = &rule.transform {
        content.content_length = None;
        content.body = content.body.map(|inner| {
            Box::new(TransformedBody {
                inner,
                transform: transform.clone(),
            }) as Box<dyn BodySource>
        });
    }
    content
}

struct TransformedBody {
    inner: Box<dyn BodySource>,
    transform: Arc<dyn StreamTransform>,
}

#[async_trait]
impl BodySource for TransformedBody {
    async fn open(&self) -> anyhow::Result<ContentStream> {
        let input = self.inner.open().await?;
        self.transform.transform(input).await
    }
}

fn ends_with_ignore_case(path: &str, suffix: &str) -> bool {
    path.len() >= suffix.len()
        && path.is_char_boundary(path.len() - suffix.len())
        && path[path.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

fn normalize(path: &str) -> &str {
    path.trim_matches('/')
}
