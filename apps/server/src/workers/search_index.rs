//! Search index rebuild handler
//!
//! Builds an inverted index over wiki articles and published blog posts and
//! swaps it into the shared `SearchIndex` one document kind at a time, so
//! readers never see a half-built index.

use super::base::{parse_payload, JobContext, JobHandler};
use crate::{queue::JobType, Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentKind {
    Article,
    BlogPost,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 2] = [DocumentKind::Article, DocumentKind::BlogPost];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Article => "article",
            DocumentKind::BlogPost => "blogPost",
        }
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        DocumentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::Validation(format!("Unknown document kind: {s}")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub kind: DocumentKind,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Where documents to index come from
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Indexable documents of one kind (approved articles, non-draft posts)
    async fn documents(&self, kind: DocumentKind) -> Result<Vec<Document>>;
}

/// Document source backed by a vector, fed by the content services
#[derive(Debug, Default)]
pub struct InMemoryDocumentSource {
    documents: RwLock<Vec<Document>>,
}

impl InMemoryDocumentSource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Insert or replace a document by kind and id. Returns `true` when the
    /// document was new.
    pub async fn upsert(&self, document: Document) -> bool {
        let mut documents = self.documents.write().await;
        match documents
            .iter_mut()
            .find(|d| d.kind == document.kind && d.id == document.id)
        {
            Some(existing) => {
                *existing = document;
                false
            }
            None => {
                documents.push(document);
                true
            }
        }
    }

    pub async fn remove(&self, kind: DocumentKind, id: &str) -> bool {
        let mut documents = self.documents.write().await;
        let before = documents.len();
        documents.retain(|d| !(d.kind == kind && d.id == id));
        documents.len() != before
    }
}

#[async_trait]
impl DocumentSource for InMemoryDocumentSource {
    async fn documents(&self, kind: DocumentKind) -> Result<Vec<Document>> {
        let documents = self.documents.read().await;
        Ok(documents.iter().filter(|d| d.kind == kind).cloned().collect())
    }
}

type Postings = HashMap<String, BTreeSet<String>>;

/// Term → document id postings, per document kind
#[derive(Debug, Default)]
pub struct SearchIndex {
    kinds: RwLock<HashMap<DocumentKind, Postings>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    async fn replace(&self, kind: DocumentKind, postings: Postings) {
        self.kinds.write().await.insert(kind, postings);
    }

    /// Ids of documents of `kind` containing every term of `query`
    pub async fn search(&self, kind: DocumentKind, query: &str) -> Vec<String> {
        let kinds = self.kinds.read().await;
        let Some(postings) = kinds.get(&kind) else {
            return Vec::new();
        };

        let mut terms = tokenize(query).into_iter();
        let Some(first) = terms.next() else {
            return Vec::new();
        };
        let mut hits = postings.get(&first).cloned().unwrap_or_default();
        for term in terms {
            let ids = postings.get(&term);
            hits.retain(|id| ids.is_some_and(|ids| ids.contains(id)));
        }

        hits.into_iter().collect()
    }

    pub async fn term_count(&self, kind: DocumentKind) -> usize {
        self.kinds.read().await.get(&kind).map_or(0, |p| p.len())
    }
}

/// Lowercased alphanumeric terms of at least two characters
fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= 2)
        .map(str::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
enum RebuildScope {
    Articles,
    BlogPosts,
    #[default]
    All,
}

impl RebuildScope {
    fn kinds(self) -> &'static [DocumentKind] {
        match self {
            RebuildScope::Articles => &[DocumentKind::Article],
            RebuildScope::BlogPosts => &[DocumentKind::BlogPost],
            RebuildScope::All => &[DocumentKind::Article, DocumentKind::BlogPost],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RebuildParams {
    #[serde(default, rename = "type")]
    scope: RebuildScope,
}

#[derive(Debug, Serialize)]
struct RebuildResult {
    success: bool,
    indexed: usize,
    errors: usize,
    duration: u64,
}

pub struct RebuildSearchIndexHandler {
    source: Arc<dyn DocumentSource>,
    index: Arc<SearchIndex>,
}

impl RebuildSearchIndexHandler {
    pub fn new(source: Arc<dyn DocumentSource>, index: Arc<SearchIndex>) -> Self {
        Self { source, index }
    }

    fn progress_window(kind: DocumentKind) -> (u8, u8) {
        match kind {
            DocumentKind::Article => (20, 60),
            DocumentKind::BlogPost => (60, 95),
        }
    }
}

#[async_trait]
impl JobHandler for RebuildSearchIndexHandler {
    fn name(&self) -> &str {
        "RebuildSearchIndexHandler"
    }

    fn job_type(&self) -> JobType {
        JobType::RebuildSearchIndex
    }

    async fn handle(
        &self,
        ctx: &JobContext,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value> {
        let start = Instant::now();
        let params: RebuildParams = if payload.is_null() {
            RebuildParams::default()
        } else {
            parse_payload(payload)?
        };

        ctx.report_progress(5, "Starting search index rebuild...").await;

        let mut indexed = 0usize;
        let mut errors = 0usize;

        for &kind in params.scope.kinds() {
            let (from, to) = Self::progress_window(kind);
            ctx.report_progress(from, format!("Rebuilding {:?} search index...", kind))
                .await;

            let documents = match self.source.documents(kind).await {
                Ok(documents) => documents,
                Err(e) => {
                    tracing::error!(kind = ?kind, error = %e, "Failed to load documents");
                    errors += 1;
                    continue;
                }
            };

            let mut postings = Postings::new();
            let total = documents.len().max(1);
            for (i, document) in documents.iter().enumerate() {
                let text = format!(
                    "{} {} {}",
                    document.title,
                    document.body,
                    document.tags.join(" ")
                );
                let terms = tokenize(&text);
                if terms.is_empty() {
                    tracing::warn!(document_id = %document.id, "Document has no indexable text");
                    errors += 1;
                    continue;
                }
                for term in terms {
                    postings.entry(term).or_default().insert(document.id.clone());
                }
                indexed += 1;

                let span = (to - from) as usize;
                let progress = from as usize + (i * span) / total;
                ctx.report_progress(progress as u8, format!("Indexed {} items...", indexed))
                    .await;
            }

            self.index.replace(kind, postings).await;
        }

        let result = RebuildResult {
            success: errors == 0,
            indexed,
            errors,
            duration: start.elapsed().as_millis() as u64,
        };
        tracing::info!(indexed, errors, "Search index rebuilt");
        ctx.report_progress(
            100,
            format!("Completed: {} indexed, {} errors", indexed, errors),
        )
        .await;

        serde_json::to_value(result).map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::test_support::claimed_context;
    use serde_json::json;

    fn doc(id: &str, kind: DocumentKind, title: &str, body: &str) -> Document {
        Document {
            id: id.to_string(),
            kind,
            title: title.to_string(),
            body: body.to_string(),
            tags: vec![],
        }
    }

    fn fixture() -> (Arc<InMemoryDocumentSource>, Arc<SearchIndex>) {
        let source = Arc::new(InMemoryDocumentSource::new(vec![
            doc("a1", DocumentKind::Article, "Caring for Cats", "Brush your cat weekly"),
            doc("a2", DocumentKind::Article, "Dog Training", "Reward good behaviour"),
            doc("p1", DocumentKind::BlogPost, "My cat Luna", "Luna likes boxes"),
        ]));
        (source, Arc::new(SearchIndex::new()))
    }

    #[test]
    fn tokenize_lowercases_and_drops_short_words() {
        let terms = tokenize("A Cat, a DOG & 2 birds!");
        assert_eq!(
            terms.into_iter().collect::<Vec<_>>(),
            vec!["birds", "cat", "dog"]
        );
    }

    #[tokio::test]
    async fn rebuild_all_indexes_both_kinds() {
        let (source, index) = fixture();
        let handler = RebuildSearchIndexHandler::new(source, index.clone());
        let (ctx, _queue) = claimed_context(JobType::RebuildSearchIndex, json!({})).await;

        let result = handler.handle(&ctx, json!({})).await.unwrap();
        assert_eq!(result["success"], true);
        assert_eq!(result["indexed"], 3);
        assert_eq!(result["errors"], 0);

        assert_eq!(index.search(DocumentKind::Article, "cat").await, vec!["a1"]);
        assert_eq!(index.search(DocumentKind::BlogPost, "luna boxes").await, vec!["p1"]);
        assert!(index.search(DocumentKind::Article, "luna").await.is_empty());
    }

    #[tokio::test]
    async fn scoped_rebuild_leaves_other_kind_untouched() {
        let (source, index) = fixture();
        let handler = RebuildSearchIndexHandler::new(source, index.clone());
        let payload = json!({"type": "articles"});
        let (ctx, _queue) = claimed_context(JobType::RebuildSearchIndex, payload.clone()).await;

        let result = handler.handle(&ctx, payload).await.unwrap();
        assert_eq!(result["indexed"], 2);
        assert_eq!(index.term_count(DocumentKind::BlogPost).await, 0);
    }

    #[tokio::test]
    async fn documents_without_text_count_as_errors() {
        let source = Arc::new(InMemoryDocumentSource::new(vec![doc(
            "empty",
            DocumentKind::BlogPost,
            "",
            "!",
        )]));
        let handler = RebuildSearchIndexHandler::new(source, Arc::new(SearchIndex::new()));
        let payload = json!({"type": "blogPosts"});
        let (ctx, _queue) = claimed_context(JobType::RebuildSearchIndex, payload.clone()).await;

        let result = handler.handle(&ctx, payload).await.unwrap();
        assert_eq!(result["success"], false);
        assert_eq!(result["errors"], 1);
    }

    #[tokio::test]
    async fn upsert_replaces_existing_document() {
        let (source, index) = fixture();
        let created = source
            .upsert(doc("a1", DocumentKind::Article, "Caring for Ferrets", "Ferrets nap"))
            .await;
        assert!(!created);
        assert!(source.remove(DocumentKind::BlogPost, "p1").await);
        assert!(!source.remove(DocumentKind::BlogPost, "p1").await);
        let handler = RebuildSearchIndexHandler::new(source, index.clone());
        let (ctx, _queue) = claimed_context(JobType::RebuildSearchIndex, json!(null)).await;

        handler.handle(&ctx, json!(null)).await.unwrap();
        assert!(index.search(DocumentKind::Article, "cat").await.is_empty());
        assert_eq!(index.search(DocumentKind::Article, "ferrets").await, vec!["a1"]);
        assert!(index.search(DocumentKind::BlogPost, "luna").await.is_empty());
    }

    #[test]
    fn document_kind_parses_wire_names() {
        assert_eq!("blogPost".parse::<DocumentKind>().unwrap(), DocumentKind::BlogPost);
        assert!(matches!(
            "wiki".parse::<DocumentKind>(),
            Err(Error::Validation(_))
        ));
    }
}
