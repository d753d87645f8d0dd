//! Search service: the document store fed by content writers and the index
//! the rebuild job publishes into

use crate::{
    workers::{Document, DocumentKind, InMemoryDocumentSource, SearchIndex},
    Error, Result,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub kind: DocumentKind,
    pub id: String,
}

/// Documents written here become searchable after the next
/// `rebuild-search-index` job for their kind.
#[derive(Default)]
pub struct SearchService {
    documents: Arc<InMemoryDocumentSource>,
    index: Arc<SearchIndex>,
}

impl SearchService {
    pub fn documents(&self) -> Arc<InMemoryDocumentSource> {
        self.documents.clone()
    }

    pub fn index(&self) -> Arc<SearchIndex> {
        self.index.clone()
    }

    /// Store a document, replacing any with the same kind and id.
    /// Returns `true` when the document was new.
    pub async fn upsert_document(&self, document: Document) -> Result<bool> {
        if document.id.trim().is_empty() {
            return Err(Error::Validation("Document id is required".to_string()));
        }

        let kind = document.kind;
        let id = document.id.clone();
        let created = self.documents.upsert(document).await;
        tracing::debug!(kind = kind.as_str(), document_id = %id, created, "Document stored");
        Ok(created)
    }

    pub async fn remove_document(&self, kind: DocumentKind, id: &str) -> Result<()> {
        if !self.documents.remove(kind, id).await {
            return Err(Error::DocumentNotFound(format!("{}/{}", kind.as_str(), id)));
        }
        tracing::debug!(kind = kind.as_str(), document_id = %id, "Document removed");
        Ok(())
    }

    /// Query the published index. Without a kind every kind is searched.
    pub async fn search(&self, kind: Option<DocumentKind>, query: &str) -> Vec<SearchHit> {
        let kinds = match kind {
            Some(kind) => vec![kind],
            None => DocumentKind::ALL.to_vec(),
        };

        let mut hits = Vec::new();
        for kind in kinds {
            hits.extend(
                self.index
                    .search(kind, query)
                    .await
                    .into_iter()
                    .map(|id| SearchHit { kind, id }),
            );
        }
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, title: &str) -> Document {
        Document {
            id: id.to_string(),
            kind: DocumentKind::Article,
            title: title.to_string(),
            body: String::new(),
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn upsert_reports_whether_document_is_new() {
        let service = SearchService::default();
        assert!(service.upsert_document(article("a1", "Cats")).await.unwrap());
        assert!(!service.upsert_document(article("a1", "Dogs")).await.unwrap());
    }

    #[tokio::test]
    async fn blank_id_is_rejected() {
        let service = SearchService::default();
        assert!(matches!(
            service.upsert_document(article("  ", "Cats")).await,
            Err(Error::Validation(_))
        ));
    }

    #[tokio::test]
    async fn removing_unknown_document_is_not_found() {
        let service = SearchService::default();
        assert!(matches!(
            service.remove_document(DocumentKind::BlogPost, "p9").await,
            Err(Error::DocumentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn search_is_empty_until_the_index_is_published() {
        let service = SearchService::default();
        service.upsert_document(article("a1", "Cats")).await.unwrap();
        assert!(service.search(None, "cats").await.is_empty());
    }
}
