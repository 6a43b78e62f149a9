use super::backend::{Collection, Cursor, Query};
use crate::core::{Document, Result};
use std::ops::ControlFlow;
use tracing::{trace, warn};

/// Scoped owner of a backend cursor.
///
/// The cursor is closed exactly once: by [`Scan::close`], at the end of
/// [`Scan::visit`] whatever the visitor returned, or by `Drop` when the scan is
/// abandoned (early return, cancellation, unwinding visitor).
pub struct Scan {
    cursor: Option<Box<dyn Cursor>>,
    collection: String,
}

impl Scan {
    pub async fn open(collection: &dyn Collection, query: &Query) -> Result<Self> {
        let cursor = collection.find(query).await?;
        trace!(collection = collection.name(), "scan opened");
        Ok(Self {
            cursor: Some(cursor),
            collection: collection.name().to_string(),
        })
    }

    /// Next document; a closed scan is exhausted.
    pub async fn next(&mut self) -> Result<Option<Document>> {
        match self.cursor.as_mut() {
            Some(cursor) => cursor.next().await,
            None => Ok(None),
        }
    }

    /// Feed documents to `visitor` until it breaks or the cursor runs dry, then
    /// close. A visitor error is returned in preference to a close error.
    pub async fn visit<F>(mut self, mut visitor: F) -> Result<()>
    where
        F: FnMut(Document) -> Result<ControlFlow<()>> + Send,
    {
        let outcome = self.drive(&mut visitor).await;
        let closed = self.release().await;
        outcome.and(closed)
    }

    /// Drain the remaining documents and close.
    pub async fn collect(mut self) -> Result<Vec<Document>> {
        let outcome = match self.cursor.as_mut() {
            Some(cursor) => cursor.to_array().await,
            None => Ok(Vec::new()),
        };
        let closed = self.release().await;
        let docs = outcome?;
        closed?;
        Ok(docs)
    }

    pub async fn close(mut self) -> Result<()> {
        self.release().await
    }

    async fn drive<F>(&mut self, visitor: &mut F) -> Result<()>
    where
        F: FnMut(Document) -> Result<ControlFlow<()>> + Send,
    {
        while let Some(doc) = self.next().await? {
            if visitor(doc)?.is_break() {
                break;
            }
        }
        Ok(())
    }

    async fn release(&mut self) -> Result<()> {
        match self.cursor.take() {
            Some(mut cursor) => {
                trace!(collection = %self.collection, "scan closed");
                cursor.close().await
            }
            None => Ok(()),
        }
    }
}

impl Drop for Scan {
    fn drop(&mut self) {
        if let Some(cursor) = self.cursor.take() {
            // Async close is not possible here; the cursor releases itself on drop.
            warn!(collection = %self.collection, "scan dropped without close");
            drop(cursor);
        }
    }
}
