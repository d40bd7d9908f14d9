//! Cursor implementations shared by the storage backends

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::future::Future;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::trait_def::BucketCursor;
use crate::stats::{RawBucketRow, StatsError, StatsResult};

/// Rows buffered between the database stream and the consumer
const CURSOR_BUFFER: usize = 64;

pub type RowSender<R> = mpsc::Sender<Result<R, sqlx::Error>>;

type RowDecoder<R> = Box<dyn Fn(&R) -> StatsResult<RawBucketRow> + Send>;

/// Cursor fed by a producer task streaming rows from the database
///
/// The producer forwards rows into a bounded channel, so a slow consumer
/// applies backpressure to the database stream. An error before the first row
/// means the query itself failed; later errors are iteration failures.
pub struct StreamCursor<R> {
    rows: mpsc::Receiver<Result<R, sqlx::Error>>,
    producer: Option<JoinHandle<()>>,
    decode: RowDecoder<R>,
    yielded: bool,
}

impl<R: Send + 'static> StreamCursor<R> {
    pub fn spawn<F, Fut, D>(produce: F, decode: D) -> Self
    where
        F: FnOnce(RowSender<R>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
        D: Fn(&R) -> StatsResult<RawBucketRow> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(CURSOR_BUFFER);
        let producer = tokio::spawn(produce(tx));

        Self {
            rows: rx,
            producer: Some(producer),
            decode: Box::new(decode),
            yielded: false,
        }
    }
}

/// Forward a row stream into a cursor channel until it ends, fails, or the
/// cursor is closed
pub async fn forward_rows<R, S>(mut stream: S, tx: RowSender<R>)
where
    S: Stream<Item = Result<R, sqlx::Error>> + Unpin,
{
    while let Some(item) = stream.next().await {
        let failed = item.is_err();
        if tx.send(item).await.is_err() || failed {
            break;
        }
    }
}

#[async_trait]
impl<R: Send + 'static> BucketCursor for StreamCursor<R> {
    async fn next_row(&mut self) -> StatsResult<Option<RawBucketRow>> {
        match self.rows.recv().await {
            Some(Ok(row)) => {
                self.yielded = true;
                (self.decode)(&row).map(Some)
            }
            Some(Err(e)) if !self.yielded => Err(StatsError::Query(e.into())),
            Some(Err(e)) => Err(StatsError::CursorIteration(e.into())),
            None => Ok(None),
        }
    }

    async fn close(&mut self) -> StatsResult<()> {
        self.rows.close();

        if let Some(producer) = self.producer.take() {
            producer
                .await
                .map_err(|e| StatsError::CursorClose(e.into()))?;
        }

        Ok(())
    }
}

impl<R> Drop for StreamCursor<R> {
    fn drop(&mut self) {
        // Abandoned cursors (timeouts, early errors) must not keep the query running
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

/// Cursor over rows that were aggregated in memory
pub struct VecCursor {
    rows: std::vec::IntoIter<RawBucketRow>,
}

impl VecCursor {
    pub fn new(rows: Vec<RawBucketRow>) -> Self {
        Self {
            rows: rows.into_iter(),
        }
    }
}

#[async_trait]
impl BucketCursor for VecCursor {
    async fn next_row(&mut self) -> StatsResult<Option<RawBucketRow>> {
        Ok(self.rows.next())
    }

    async fn close(&mut self) -> StatsResult<()> {
        Ok(())
    }
}
