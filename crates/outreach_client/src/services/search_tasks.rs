use std::sync::Arc;

use outreach_core::{
    JobId, Listing, Platform, PollConfig, PollTarget, SearchTask, SearchTaskCreate,
    SearchTaskStatus, User, API_TOKEN_KEY,
};

use crate::{ApiError, JobMonitor, JobSource, Notice, RequestEnvelope, ServiceContext};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchTaskFilter {
    pub platform: Option<Platform>,
    pub keyword: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl SearchTaskFilter {
    fn apply(&self, request: RequestEnvelope) -> RequestEnvelope {
        request
            .query_opt("platform", self.platform)
            .query_opt("keyword", self.keyword.as_deref())
            .query_opt("page", self.page)
            .query_opt("pageSize", self.page_size)
    }
}

/// Paging over the users a search task found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchResultsFilter {
    pub keyword: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Clone)]
pub struct SearchTaskService {
    ctx: ServiceContext,
}

impl SearchTaskService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, filter: &SearchTaskFilter) -> Listing<SearchTask> {
        self.ctx
            .list_or_empty("search tasks", filter.apply(RequestEnvelope::get("/search-tasks")))
            .await
    }

    /// Like [`Self::list`] but hands the failure back instead of degrading.
    pub async fn try_list(&self, filter: &SearchTaskFilter) -> Result<Listing<SearchTask>, ApiError> {
        self.ctx
            .fetch_listing(filter.apply(RequestEnvelope::get("/search-tasks")))
            .await
    }

    pub async fn get(&self, id: JobId) -> Option<SearchTask> {
        self.ctx
            .item_or_none("search task", RequestEnvelope::get(format!("/search-tasks/{id}")))
            .await
    }

    /// Creates a task. Without a cached provider token nothing is sent.
    pub async fn create(&self, payload: &SearchTaskCreate) -> Result<SearchTask, ApiError> {
        if self.ctx.cache().get(API_TOKEN_KEY).is_none() {
            let err = ApiError::Configuration(format!(
                "{API_TOKEN_KEY} is not configured; set the provider token first"
            ));
            self.ctx.report_failure("Creating search task", &err);
            return Err(err);
        }

        let request = RequestEnvelope::post("/search-tasks").json(payload)?;
        match self.ctx.fetch_item::<SearchTask>(request).await {
            Ok(task) => {
                self.ctx
                    .notify(Notice::success(format!("Search task {} created", task.name)));
                Ok(task)
            }
            Err(err) => {
                self.ctx.report_failure("Creating search task", &err);
                Err(err)
            }
        }
    }

    pub async fn start(&self, id: JobId) -> bool {
        self.ctx
            .write_ack(
                "Starting search task",
                Ok(RequestEnvelope::post(format!("/search-tasks/{id}/start"))),
            )
            .await
    }

    pub async fn stop(&self, id: JobId) -> bool {
        self.ctx
            .write_ack(
                "Stopping search task",
                Ok(RequestEnvelope::post(format!("/search-tasks/{id}/stop"))),
            )
            .await
    }

    pub async fn delete(&self, id: JobId) -> bool {
        self.ctx
            .write_ack(
                "Deleting search task",
                Ok(RequestEnvelope::delete(format!("/search-tasks/{id}"))),
            )
            .await
    }

    /// Status rows for the given tasks. Errors propagate; pollers count them.
    pub async fn status_of(&self, ids: &[JobId]) -> Result<Vec<SearchTaskStatus>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = RequestEnvelope::get("/search-tasks/status").query("ids", ids);
        Ok(self.ctx.fetch_listing(request).await?.items)
    }

    pub async fn results(&self, id: JobId, filter: &SearchResultsFilter) -> Listing<User> {
        let request = RequestEnvelope::get(format!("/search-tasks/{id}/results"))
            .query_opt("keyword", filter.keyword.as_deref())
            .query_opt("page", filter.page)
            .query_opt("pageSize", filter.page_size);
        self.ctx.list_or_empty("search results", request).await
    }

    /// Spawns a poller over the given tasks. Requires a Tokio runtime.
    pub fn monitor(&self, target: PollTarget, config: PollConfig) -> JobMonitor<SearchTaskStatus> {
        JobMonitor::spawn(
            "search-tasks",
            Arc::new(SearchTaskSource {
                service: self.clone(),
            }),
            config,
            target,
        )
    }
}

struct SearchTaskSource {
    service: SearchTaskService,
}

#[async_trait::async_trait]
impl JobSource<SearchTaskStatus> for SearchTaskSource {
    async fn fetch(&self, target: &PollTarget) -> Result<Vec<SearchTaskStatus>, ApiError> {
        match target {
            PollTarget::All => {
                let listing = self.service.try_list(&SearchTaskFilter::default()).await?;
                Ok(listing.items.into_iter().map(SearchTaskStatus::from).collect())
            }
            PollTarget::Ids(ids) => {
                let ids: Vec<JobId> = ids.iter().copied().collect();
                self.service.status_of(&ids).await
            }
        }
    }
}
