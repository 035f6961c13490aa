//! Offset/length pagination of one fetch-page function.

use std::future::Future;

use serde_json::Value;

use crate::platform::PlatformError;

use super::pacing::{PacePoint, Pacer};

/// One page returned by a task handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub records: Vec<Value>,
    /// Total reported by the API, if any.
    pub total: Option<u64>,
}

/// Everything fetched for one range.
#[derive(Debug, Default)]
pub struct FetchResult {
    pub records: Vec<Value>,
    /// Total captured from the first page.
    pub total: Option<u64>,
    pub pages: u32,
    /// A page failed after some records were already fetched.
    pub partial_error: Option<PlatformError>,
}

impl FetchResult {
    pub fn is_complete(&self) -> bool {
        self.partial_error.is_none()
    }
}

/// Drives a fetch-page function to exhaustion.
pub struct PaginationDriver<'a> {
    page_size: u32,
    max_pages: u32,
    pacer: &'a dyn Pacer,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(page_size: u32, max_pages: u32, pacer: &'a dyn Pacer) -> Self {
        Self {
            page_size: page_size.max(1),
            max_pages: max_pages.max(1),
            pacer,
        }
    }

    /// Fetch pages until a short page, the first page's total is reached, or
    /// a page fails. Hitting `max_pages` first leaves the result partial.
    ///
    /// A missing total defaults to the first page's length. A failure after
    /// some records were fetched is returned in
    /// [`FetchResult::partial_error`]; a failure with nothing fetched is
    /// returned as `Err`.
    ///
    /// `on_page` receives `(page number, page length, total so far, total)`.
    pub async fn drive<F, Fut, P>(
        &self,
        mut fetch_page: F,
        mut on_page: P,
    ) -> Result<FetchResult, PlatformError>
    where
        F: FnMut(u64, u32) -> Fut,
        Fut: Future<Output = Result<Page, PlatformError>>,
        P: FnMut(u32, usize, usize, Option<u64>),
    {
        let mut result = FetchResult::default();
        let mut expected: Option<u64> = None;

        loop {
            if result.pages >= self.max_pages {
                // Only reachable with the first page's total still unmet.
                tracing::warn!(
                    pages = result.pages,
                    records = result.records.len(),
                    expected = ?expected,
                    "Page limit reached before the reported total"
                );
                result.partial_error = Some(PlatformError::internal(format!(
                    "page limit of {} reached after {} of {} records",
                    self.max_pages,
                    result.records.len(),
                    expected.unwrap_or_default()
                )));
                break;
            }
            if result.pages > 0 {
                self.pacer.pause(PacePoint::Page).await;
            }

            let offset = result.records.len() as u64;
            let page = match fetch_page(offset, self.page_size).await {
                Ok(page) => page,
                Err(e) if result.records.is_empty() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        offset,
                        fetched = result.records.len(),
                        error = %e,
                        "Page failed after partial fetch"
                    );
                    result.partial_error = Some(e);
                    break;
                }
            };

            result.pages += 1;
            let count = page.records.len();
            if result.pages == 1 {
                result.total = page.total;
                expected = Some(page.total.unwrap_or(count as u64));
            }
            result.records.extend(page.records);

            on_page(result.pages, count, result.records.len(), result.total);
            tracing::debug!(
                page = result.pages,
                count,
                total_so_far = result.records.len(),
                expected = ?expected,
                "Fetched page"
            );

            let short = count < self.page_size as usize;
            let reached = expected.is_some_and(|t| result.records.len() as u64 >= t);
            if short || reached {
                break;
            }
        }

        Ok(result)
    }
}
