use serde::Serialize;

use super::scheduler::SelectionPolicy;
use crate::error::SqlPoolError;
use crate::results::QueryResult;

pub(crate) const STORAGE_QUERY: &str = "SELECT p.page_count, f.freelist_count, s.page_size \
     FROM pragma_page_count() AS p, pragma_freelist_count() AS f, pragma_page_size() AS s";

/// Page counters reported by the storage engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub page_count: i64,
    pub freelist_count: i64,
    pub page_size: i64,
}

impl StorageStats {
    pub(crate) fn from_pragma_row(res: &QueryResult) -> Result<Self, SqlPoolError> {
        let read = |column: &str| {
            res.first_value(column)
                .and_then(|v| v.as_int().copied())
                .ok_or_else(|| {
                    SqlPoolError::ConnectionError(format!("storage sample returned no `{column}`"))
                })
        };
        Ok(Self {
            page_count: read("page_count")?,
            freelist_count: read("freelist_count")?,
            page_size: read("page_size")?,
        })
    }

    #[must_use]
    pub fn total_bytes(&self) -> i64 {
        self.page_count.saturating_mul(self.page_size)
    }

    #[must_use]
    pub fn free_bytes(&self) -> i64 {
        self.freelist_count.saturating_mul(self.page_size)
    }
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStatistics {
    pub size: usize,
    pub policy: SelectionPolicy,
    /// Requests currently dispatched to each slot, by slot index
    pub in_flight: Vec<usize>,
    /// Last completed storage sample; `None` until one has finished
    pub storage: Option<StorageStats>,
}
