//! Cross-entity "recently updated" feed.
//!
//! Every source table is declared statically below and queried through
//! [`Db::list_source_updates`]; the per-source result streams are merged
//! k-way on `(date_updated DESC, id DESC)`. That total order, combined
//! with a keyset [`Cursor`], guarantees no row is skipped or duplicated
//! across pages even when many rows share a timestamp.

mod cursor;

pub use cursor::Cursor;

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};

use crate::db::Db;
use crate::error::Result;

/// Tables carrying a `date_updated` column. `review_photos` is a child of
/// reviews and is deliberately absent.
pub const FEED_SOURCES: &[&str] = &[
    "users",
    "breweries",
    "beers",
    "reviews",
    "stores",
    "store_menus",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub table_name: String,
    pub id: String,
    /// Stored timestamp text, passed through verbatim.
    pub date_updated: String,
}

#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub data: Vec<FeedItem>,
    pub next_cursor: Option<String>,
}

/// Fetches one feed page: up to `limit` rows below `cursor`, newest
/// first, plus the cursor for the next page (None when this page came
/// back short).
pub fn fetch_feed(
    db: &dyn Db,
    sources: &[&str],
    cursor: Option<&Cursor>,
    limit: usize,
) -> Result<FeedPage> {
    let mut columns = Vec::with_capacity(sources.len());
    for table in sources {
        columns.push(db.list_source_updates(table, cursor, limit as i64)?);
    }

    let data = merge_columns(columns, limit);

    let next_cursor = if data.len() == limit {
        data.last().map(|item| {
            Cursor {
                date_updated: item.date_updated.clone(),
                id: item.id.clone(),
            }
            .encode()
        })
    } else {
        None
    };

    Ok(FeedPage { data, next_cursor })
}

struct Head {
    item: FeedItem,
    source: usize,
}

impl Head {
    fn key(&self) -> (&str, &str) {
        (&self.item.date_updated, &self.item.id)
    }
}

impl PartialEq for Head {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Head {}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Head {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-heap on (date_updated, id): the newest head wins.
        self.key().cmp(&other.key())
    }
}

/// K-way merge over per-source columns, each already sorted by
/// `(date_updated DESC, id DESC)`.
fn merge_columns(columns: Vec<Vec<FeedItem>>, limit: usize) -> Vec<FeedItem> {
    let mut iters: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();
    let mut heap = BinaryHeap::with_capacity(iters.len());

    for (source, iter) in iters.iter_mut().enumerate() {
        if let Some(item) = iter.next() {
            heap.push(Head { item, source });
        }
    }

    let mut merged = Vec::with_capacity(limit);
    while merged.len() < limit {
        let Some(head) = heap.pop() else { break };
        if let Some(item) = iters[head.source].next() {
            heap.push(Head {
                item,
                source: head.source,
            });
        }
        merged.push(head.item);
    }
    merged
}
