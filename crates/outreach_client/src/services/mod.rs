//! Typed facades over the request pipeline.
//!
//! Reads used by primary views fall back to an empty listing, one-shot writes
//! report through the notice sink and return a sentinel, and the `try_*` /
//! `status_of` reads used by pollers propagate errors untouched.

mod configs;
mod message_tasks;
mod search_tasks;
mod templates;
mod user_groups;
mod users;

use std::sync::Arc;

use outreach_core::{Listing, ResponseShape};
use outreach_logging::outreach_warn;
use serde::de::DeserializeOwned;

use crate::{
    ApiError, Backend, ClientSettings, LocalConfigCache, LogNoticeSink, Notice, NoticeSink,
    ReqwestBackend, RequestEnvelope,
};

pub use configs::ConfigService;
pub use message_tasks::{MessageTaskFilter, MessageTaskService, MESSAGE_POLL_INTERVAL};
pub use search_tasks::{SearchResultsFilter, SearchTaskFilter, SearchTaskService};
pub use templates::{TemplateFilter, TemplateService};
pub use user_groups::{UserGroupFilter, UserGroupService};
pub use users::{UserFilter, UserService};

/// Shared dependencies of every facade.
#[derive(Clone)]
pub struct ServiceContext {
    backend: Arc<dyn Backend>,
    cache: LocalConfigCache,
    notices: Arc<dyn NoticeSink>,
}

impl ServiceContext {
    pub fn new(
        backend: Arc<dyn Backend>,
        cache: LocalConfigCache,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            backend,
            cache,
            notices,
        }
    }

    /// Builds a context talking HTTP, with notices going to the log.
    pub fn connect(settings: &ClientSettings, cache: LocalConfigCache) -> Result<Self, ApiError> {
        let backend = ReqwestBackend::new(settings, cache.clone())?;
        Ok(Self::new(Arc::new(backend), cache, Arc::new(LogNoticeSink)))
    }

    pub fn with_notices(mut self, notices: Arc<dyn NoticeSink>) -> Self {
        self.notices = notices;
        self
    }

    pub fn cache(&self) -> &LocalConfigCache {
        &self.cache
    }

    pub fn configs(&self) -> ConfigService {
        ConfigService::new(self.clone())
    }

    pub fn search_tasks(&self) -> SearchTaskService {
        SearchTaskService::new(self.clone())
    }

    pub fn message_tasks(&self) -> MessageTaskService {
        MessageTaskService::new(self.clone())
    }

    pub fn templates(&self) -> TemplateService {
        TemplateService::new(self.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.clone())
    }

    pub fn user_groups(&self) -> UserGroupService {
        UserGroupService::new(self.clone())
    }

    pub(crate) fn notify(&self, notice: Notice) {
        self.notices.emit(notice);
    }

    pub(crate) async fn execute(&self, request: RequestEnvelope) -> Result<ResponseShape, ApiError> {
        self.backend.execute(request).await
    }

    pub(crate) async fn fetch_listing<T: DeserializeOwned>(
        &self,
        request: RequestEnvelope,
    ) -> Result<Listing<T>, ApiError> {
        Ok(self.execute(request).await?.into_listing()?)
    }

    pub(crate) async fn fetch_item<T: DeserializeOwned>(
        &self,
        request: RequestEnvelope,
    ) -> Result<T, ApiError> {
        Ok(self.execute(request).await?.into_item()?)
    }

    /// Primary-view list read: failures degrade to an empty listing.
    pub(crate) async fn list_or_empty<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestEnvelope,
    ) -> Listing<T> {
        match self.fetch_listing(request).await {
            Ok(listing) => listing,
            Err(err) => {
                outreach_warn!("Failed to load {}: {}", what, err);
                self.notify(Notice::warning(format!("Failed to load {what}: {err}")));
                Listing::empty()
            }
        }
    }

    /// Single-object read: failures become `None` with a notice.
    pub(crate) async fn item_or_none<T: DeserializeOwned>(
        &self,
        what: &str,
        request: RequestEnvelope,
    ) -> Option<T> {
        match self.fetch_item(request).await {
            Ok(item) => Some(item),
            Err(err) => {
                outreach_warn!("Failed to load {}: {}", what, err);
                self.notify(Notice::error(format!("Failed to load {what}: {err}")));
                None
            }
        }
    }

    /// One-shot write returning the written object, or `None` if it did not happen.
    pub(crate) async fn write_item<T: DeserializeOwned>(
        &self,
        what: &str,
        request: Result<RequestEnvelope, ApiError>,
    ) -> Option<T> {
        let result = match request {
            Ok(request) => self.fetch_item(request).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(item) => {
                self.notify(Notice::success(format!("{what} succeeded")));
                Some(item)
            }
            Err(err) => {
                outreach_warn!("{} failed: {}", what, err);
                self.notify(Notice::error(format!("{what} failed: {err}")));
                None
            }
        }
    }

    /// One-shot write whose response body is ignored.
    pub(crate) async fn write_ack(
        &self,
        what: &str,
        request: Result<RequestEnvelope, ApiError>,
    ) -> bool {
        let result = match request {
            Ok(request) => self.execute(request).await.map(drop),
            Err(err) => Err(err),
        };
        match result {
            Ok(()) => {
                self.notify(Notice::success(format!("{what} succeeded")));
                true
            }
            Err(err) => {
                outreach_warn!("{} failed: {}", what, err);
                self.notify(Notice::error(format!("{what} failed: {err}")));
                false
            }
        }
    }

    /// Reports a failed write that returns its error to the caller.
    pub(crate) fn report_failure(&self, what: &str, err: &ApiError) {
        outreach_warn!("{} failed: {}", what, err);
        self.notify(Notice::error(format!("{what} failed: {err}")));
    }
}
