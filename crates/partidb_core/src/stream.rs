//! Lazy result streams over paged store cursors.
//!
//! A [`DocumentStream`] owns the store cursor it reads from. The cursor is
//! dropped as soon as it is exhausted, when a page fetch fails, or when the
//! stream itself is dropped, including while a page fetch is pending.

use crate::entity::{decode, Entity};
use crate::error::RepoResult;
use futures_util::future::BoxFuture;
use futures_util::{FutureExt, Stream};
use partidb_store::{PageCursor, StoreResult, StoredDocument};
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{Context, Poll};
use tracing::trace;

type PageFetch = BoxFuture<'static, (Box<dyn PageCursor>, StoreResult<Vec<StoredDocument>>)>;

enum State {
    Idle(Box<dyn PageCursor>),
    Fetching(PageFetch),
    Done,
}

fn fetch_page(mut cursor: Box<dyn PageCursor>) -> PageFetch {
    async move {
        let page = cursor.next_page().await;
        (cursor, page)
    }
    .boxed()
}

/// A forward-only stream of stored documents.
///
/// Pages are fetched on demand; between fetches items are yielded from an
/// in-memory buffer. After the first error the stream ends.
pub struct DocumentStream {
    state: State,
    buffer: VecDeque<StoredDocument>,
    pages: usize,
}

impl DocumentStream {
    /// Wraps a cursor.
    pub fn new(cursor: Box<dyn PageCursor>) -> Self {
        Self {
            state: State::Idle(cursor),
            buffer: VecDeque::new(),
            pages: 0,
        }
    }

    /// Returns true once the underlying cursor has been released.
    pub fn is_released(&self) -> bool {
        matches!(self.state, State::Done)
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> usize {
        self.pages
    }
}

impl Stream for DocumentStream {
    type Item = StoreResult<StoredDocument>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if let Some(document) = this.buffer.pop_front() {
                return Poll::Ready(Some(Ok(document)));
            }

            match std::mem::replace(&mut this.state, State::Done) {
                State::Idle(cursor) => {
                    if !cursor.has_more_results() {
                        trace!(pages = this.pages, "cursor exhausted");
                        return Poll::Ready(None);
                    }
                    this.state = State::Fetching(fetch_page(cursor));
                }
                State::Fetching(mut fetch) => match fetch.poll_unpin(cx) {
                    Poll::Pending => {
                        this.state = State::Fetching(fetch);
                        return Poll::Pending;
                    }
                    Poll::Ready((cursor, Ok(page))) => {
                        this.pages += 1;
                        trace!(page = this.pages, items = page.len(), "fetched page");
                        this.buffer.extend(page);
                        this.state = State::Idle(cursor);
                    }
                    Poll::Ready((_, Err(err))) => {
                        trace!(page = this.pages + 1, error = %err, "page fetch failed");
                        return Poll::Ready(Some(Err(err)));
                    }
                },
                State::Done => return Poll::Ready(None),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            State::Done => (self.buffer.len(), Some(self.buffer.len())),
            _ => (self.buffer.len(), None),
        }
    }
}

impl std::fmt::Debug for DocumentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStream")
            .field("buffered", &self.buffer.len())
            .field("pages", &self.pages)
            .field("released", &self.is_released())
            .finish()
    }
}

/// A stream of decoded entities.
pub struct EntityStream<T> {
    inner: DocumentStream,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> EntityStream<T> {
    /// Wraps a document stream.
    pub fn new(inner: DocumentStream) -> Self {
        Self {
            inner,
            _entity: PhantomData,
        }
    }

    /// Returns the underlying document stream.
    pub fn into_documents(self) -> DocumentStream {
        self.inner
    }
}

impl<T: Entity> Stream for EntityStream<T> {
    type Item = RepoResult<T>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        Pin::new(&mut this.inner).poll_next(cx).map(|next| {
            next.map(|result| -> RepoResult<T> {
                let document = result?;
                decode(document.body)
            })
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> std::fmt::Debug for EntityStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStream")
            .field("inner", &self.inner)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures_util::StreamExt;
    use partidb_store::{
        DocumentStore, Filter, InMemoryStore, ItemKey, QueryOptions, StoreError,
    };
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    async fn seeded(count: usize) -> InMemoryStore {
        let store = InMemoryStore::new();
        for i in 0..count {
            store
                .create_item(&ItemKey::new(format!("item-{i}"), "p"), json!({ "n": i }))
                .await
                .unwrap();
        }
        store
    }

    /// A cursor whose fetches never complete, or fail, on request.
    struct ScriptedCursor {
        dropped: Arc<AtomicBool>,
        fail: bool,
        served: bool,
    }

    #[async_trait]
    impl PageCursor for ScriptedCursor {
        fn has_more_results(&self) -> bool {
            !self.served
        }

        async fn next_page(&mut self) -> StoreResult<Vec<StoredDocument>> {
            if self.fail {
                self.served = true;
                return Err(StoreError::unavailable("connection reset"));
            }
            std::future::pending::<()>().await;
            Ok(Vec::new())
        }
    }

    impl Drop for ScriptedCursor {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn stream_yields_every_item_across_pages() {
        let store = seeded(5).await;
        let cursor = store
            .query(&Filter::all(), QueryOptions::default().max_item_count(2))
            .await
            .unwrap();
        let mut stream = DocumentStream::new(cursor);

        let mut seen = Vec::new();
        while let Some(item) = stream.next().await {
            seen.push(item.unwrap().key.id);
        }

        assert_eq!(seen.len(), 5);
        assert_eq!(stream.pages_fetched(), 3);
        assert!(stream.is_released());
        assert_eq!(store.open_cursors(), 0);
    }

    #[tokio::test]
    async fn stream_over_no_matches_is_empty() {
        let store = seeded(3).await;
        let cursor = store
            .query(&Filter::field("n").gt(100), QueryOptions::default())
            .await
            .unwrap();
        let items: Vec<_> = DocumentStream::new(cursor).collect().await;
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn early_drop_releases_cursor() {
        let store = seeded(6).await;
        let cursor = store
            .query(&Filter::all(), QueryOptions::default().max_item_count(2))
            .await
            .unwrap();
        let mut stream = DocumentStream::new(cursor);
        let first = stream.next().await.unwrap().unwrap();
        assert!(first.key.id.starts_with("item-"));
        assert_eq!(store.open_cursors(), 1);

        drop(stream);
        assert_eq!(store.open_cursors(), 0);
    }

    #[tokio::test]
    async fn take_releases_cursor() {
        let store = seeded(6).await;
        let cursor = store
            .query(&Filter::all(), QueryOptions::default().max_item_count(2))
            .await
            .unwrap();
        let taken: Vec<_> = DocumentStream::new(cursor).take(3).collect().await;
        assert_eq!(taken.len(), 3);
        assert_eq!(store.open_cursors(), 0);
    }

    #[tokio::test]
    async fn drop_during_pending_fetch_releases_cursor() {
        let dropped = Arc::new(AtomicBool::new(false));
        let cursor = ScriptedCursor {
            dropped: Arc::clone(&dropped),
            fail: false,
            served: false,
        };
        let mut stream = DocumentStream::new(Box::new(cursor));

        assert!(stream.next().now_or_never().is_none());
        assert!(!dropped.load(Ordering::SeqCst));

        drop(stream);
        assert!(dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn failed_fetch_ends_stream_and_releases_cursor() {
        let dropped = Arc::new(AtomicBool::new(false));
        let cursor = ScriptedCursor {
            dropped: Arc::clone(&dropped),
            fail: true,
            served: false,
        };
        let mut stream = DocumentStream::new(Box::new(cursor));

        let first = stream.next().await.unwrap();
        assert!(matches!(first, Err(StoreError::Unavailable { .. })));
        assert!(dropped.load(Ordering::SeqCst));
        assert!(stream.next().await.is_none());
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Counter {
        id: String,
        n: u32,
    }

    impl Entity for Counter {
        type Id = String;
        const FIELDS: &'static [&'static str] = &["id", "n"];

        fn id(&self) -> &String {
            &self.id
        }
    }

    #[tokio::test]
    async fn entity_stream_decodes_and_reports_bad_shapes() {
        let store = InMemoryStore::new();
        store
            .create_item(&ItemKey::new("a", "p"), json!({ "id": "a", "n": 1 }))
            .await
            .unwrap();
        store
            .create_item(&ItemKey::new("b", "p"), json!({ "id": "b", "n": "x" }))
            .await
            .unwrap();

        let cursor = store
            .query(&Filter::all(), QueryOptions::default())
            .await
            .unwrap();
        let results: Vec<RepoResult<Counter>> =
            EntityStream::new(DocumentStream::new(cursor)).collect().await;

        assert_eq!(results.len(), 2);
        assert_eq!(
            results[0].as_ref().unwrap(),
            &Counter {
                id: "a".into(),
                n: 1
            }
        );
        assert!(results[1].is_err());
    }
}
