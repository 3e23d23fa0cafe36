//! Browser driver abstraction.
//!
//! The executor sequences calls through these traits and never depends on a
//! concrete browser. Elements are addressed by opaque handle tokens, the way
//! remote automation protocols hand out node ids.

use async_trait::async_trait;

use crate::error::ProbeResult;

pub mod playwright;

/// Opaque handle to an element previously located on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementId(pub String);

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Factory for browser sessions. One session per probe run; sessions from
/// concurrent runs must be fully independent.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Launch or attach to a browser, returning a session owned by the
    /// caller for the duration of one run.
    async fn connect(&self) -> ProbeResult<Box<dyn BrowserSession>>;
}

/// One live browser connection, scoped to a single probe run.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate to `url`, returning a handle onto the loaded page.
    async fn open_page(&mut self, url: &str) -> ProbeResult<Box<dyn PageHandle>>;

    /// Tear the session down. Also implied by drop; an explicit close lets
    /// the executor release the browser on the happy path.
    async fn close(&mut self) -> ProbeResult<()>;
}

/// A page the session has navigated to.
#[async_trait]
pub trait PageHandle: Send {
    /// Block until the page reports its load event.
    async fn wait_load(&mut self) -> ProbeResult<()>;

    /// Resolve a locator to an element handle.
    /// Fails with [`crate::error::ProbeError::ElementNotFound`] when the
    /// locator matches nothing.
    async fn find_element(&mut self, identifier: &str) -> ProbeResult<ElementId>;

    /// Click a previously located element.
    async fn click(&mut self, element: &ElementId) -> ProbeResult<()>;

    /// Type text into a previously located element.
    async fn type_text(&mut self, element: &ElementId, value: &str) -> ProbeResult<()>;
}
