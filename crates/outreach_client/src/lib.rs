//! Outreach client: request pipeline, local config cache, job monitors and
//! typed service facades over the admin backend.
mod cache;
mod monitor;
mod notice;
mod pipeline;
mod request;
mod services;
mod storage;
mod types;

pub use cache::{LocalConfigCache, CONFIG_STORAGE_KEY};
pub use monitor::{JobMonitor, JobSource};
pub use notice::{ChannelNoticeSink, LogNoticeSink, Notice, NoticeLevel, NoticeSink};
pub use pipeline::{
    Backend, CacheBuster, ClientSettings, ReqwestBackend, API_TOKEN_HEADER, CACHE_BUSTER_PARAM,
};
pub use request::{QueryValue, RequestEnvelope};
pub use services::{
    ConfigService, MessageTaskFilter, MessageTaskService, SearchResultsFilter, SearchTaskFilter,
    SearchTaskService, ServiceContext, TemplateFilter, TemplateService, UserFilter,
    UserGroupFilter, UserGroupService, UserService, MESSAGE_POLL_INTERVAL,
};
pub use storage::{CacheStorage, FileStorage, MemoryStorage, StorageError};
pub use types::{ApiError, NetworkFailure, FALLBACK_ERROR_MESSAGE};
