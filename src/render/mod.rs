//! Page-rendering collaborator: navigate, wait for a selector, read the table.

pub mod http;
pub mod table;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScrapeError;
use crate::shutdown::Cancel;
use crate::types::TableSnapshot;

pub use http::HttpRenderer;

/// Opens render sessions. One session per extraction.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn RenderSession>, ScrapeError>;
}

#[async_trait]
pub trait RenderSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), ScrapeError>;

    /// Returns once `selector` matches in the current page, or fails with
    /// `ScrapeError::Timeout` after `timeout`.
    async fn wait_for_selector(
        &mut self,
        selector: &str,
        timeout: Duration,
        cancel: &Cancel,
    ) -> Result<(), ScrapeError>;

    /// Header cells of the table's first `thead > tr` and the cells of every
    /// `tbody > tr`, in document order.
    async fn evaluate_table(&mut self, table_selector: &str) -> Result<TableSnapshot, ScrapeError>;

    async fn close(self: Box<Self>);
}
