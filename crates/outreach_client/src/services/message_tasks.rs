use std::sync::Arc;
use std::time::Duration;

use outreach_core::{
    JobId, Listing, MessageTask, MessageTaskCreate, MessageTaskStatus, PollConfig, PollTarget,
};

use crate::{ApiError, JobMonitor, JobSource, Notice, RequestEnvelope, ServiceContext};

const BASE: &str = "/messages/message-tasks";

/// Progress of a send run moves quickly, so its poller ticks faster.
pub const MESSAGE_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageTaskFilter {
    pub keyword: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl MessageTaskFilter {
    fn apply(&self, request: RequestEnvelope) -> RequestEnvelope {
        request
            .query_opt("keyword", self.keyword.as_deref())
            .query_opt("page", self.page)
            .query_opt("pageSize", self.page_size)
    }
}

#[derive(Clone)]
pub struct MessageTaskService {
    ctx: ServiceContext,
}

impl MessageTaskService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, filter: &MessageTaskFilter) -> Listing<MessageTask> {
        self.ctx
            .list_or_empty("message tasks", filter.apply(RequestEnvelope::get(BASE)))
            .await
    }

    pub async fn try_list(
        &self,
        filter: &MessageTaskFilter,
    ) -> Result<Listing<MessageTask>, ApiError> {
        self.ctx.fetch_listing(filter.apply(RequestEnvelope::get(BASE))).await
    }

    pub async fn get(&self, id: JobId) -> Option<MessageTask> {
        self.ctx
            .item_or_none("message task", RequestEnvelope::get(format!("{BASE}/{id}")))
            .await
    }

    pub async fn create(&self, payload: &MessageTaskCreate) -> Result<MessageTask, ApiError> {
        let result = match RequestEnvelope::post(BASE).json(payload) {
            Ok(request) => self.ctx.fetch_item::<MessageTask>(request).await,
            Err(err) => Err(err),
        };
        match result {
            Ok(task) => {
                self.ctx
                    .notify(Notice::success(format!("Message task {} created", task.name)));
                Ok(task)
            }
            Err(err) => {
                self.ctx.report_failure("Creating message task", &err);
                Err(err)
            }
        }
    }

    pub async fn start(&self, id: JobId) -> bool {
        self.ctx
            .write_ack(
                "Starting message task",
                Ok(RequestEnvelope::post(format!("{BASE}/{id}/start"))),
            )
            .await
    }

    pub async fn stop(&self, id: JobId) -> bool {
        self.ctx
            .write_ack(
                "Stopping message task",
                Ok(RequestEnvelope::post(format!("{BASE}/{id}/stop"))),
            )
            .await
    }

    pub async fn delete(&self, id: JobId) -> bool {
        self.ctx
            .write_ack(
                "Deleting message task",
                Ok(RequestEnvelope::delete(format!("{BASE}/{id}"))),
            )
            .await
    }

    pub async fn status_of(&self, ids: &[JobId]) -> Result<Vec<MessageTaskStatus>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let request = RequestEnvelope::get(format!("{BASE}/status")).query("ids", ids);
        Ok(self.ctx.fetch_listing(request).await?.items)
    }

    /// Spawns a poller over the given tasks. Requires a Tokio runtime.
    pub fn monitor(&self, target: PollTarget, config: PollConfig) -> JobMonitor<MessageTaskStatus> {
        JobMonitor::spawn(
            "message-tasks",
            Arc::new(MessageTaskSource {
                service: self.clone(),
            }),
            config,
            target,
        )
    }
}

struct MessageTaskSource {
    service: MessageTaskService,
}

#[async_trait::async_trait]
impl JobSource<MessageTaskStatus> for MessageTaskSource {
    async fn fetch(&self, target: &PollTarget) -> Result<Vec<MessageTaskStatus>, ApiError> {
        match target {
            PollTarget::All => {
                let listing = self.service.try_list(&MessageTaskFilter::default()).await?;
                Ok(listing.items.into_iter().map(MessageTaskStatus::from).collect())
            }
            PollTarget::Ids(ids) => {
                let ids: Vec<JobId> = ids.iter().copied().collect();
                self.service.status_of(&ids).await
            }
        }
    }
}
