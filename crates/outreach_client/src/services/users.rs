use outreach_core::{Listing, Platform, TagLogic, TagOption, User, UserCreate, UserUpdate};
use outreach_logging::outreach_warn;
use serde_json::Value;

use crate::{RequestEnvelope, ServiceContext};

const SEARCH_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub keyword: Option<String>,
    pub platform: Option<Platform>,
    pub tags: Vec<String>,
    /// Only sent when `tags` is non-empty.
    pub tag_logic: Option<TagLogic>,
    pub contacted: Option<bool>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl UserFilter {
    fn apply(&self, request: RequestEnvelope) -> RequestEnvelope {
        let request = request
            .query_opt("keyword", self.keyword.as_deref())
            .query_opt("platform", self.platform)
            .query_list("tags", &self.tags);
        let request = if self.tags.is_empty() {
            request
        } else {
            request.query_opt("tag_logic", self.tag_logic)
        };
        request
            .query_opt("contacted", self.contacted)
            .query_opt("page", self.page)
            .query_opt("page_size", self.page_size)
    }
}

#[derive(Clone)]
pub struct UserService {
    ctx: ServiceContext,
}

impl UserService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, filter: &UserFilter) -> Listing<User> {
        self.ctx
            .list_or_empty("users", filter.apply(RequestEnvelope::get("/users")))
            .await
    }

    pub async fn get(&self, id: i64) -> Option<User> {
        self.ctx
            .item_or_none("user", RequestEnvelope::get(format!("/users/{id}")))
            .await
    }

    pub async fn create(&self, payload: &UserCreate) -> Option<User> {
        self.ctx
            .write_item("Creating user", RequestEnvelope::post("/users").json(payload))
            .await
    }

    pub async fn update(&self, id: i64, payload: &UserUpdate) -> Option<User> {
        self.ctx
            .write_item(
                "Updating user",
                RequestEnvelope::put(format!("/users/{id}")).json(payload),
            )
            .await
    }

    pub async fn delete(&self, id: i64) -> bool {
        self.ctx
            .write_ack(
                "Deleting user",
                Ok(RequestEnvelope::delete(format!("/users/{id}"))),
            )
            .await
    }

    /// Keyword search over the first page of matches.
    pub async fn search(&self, keyword: &str) -> Vec<User> {
        let request = RequestEnvelope::get("/users/search")
            .query("keyword", keyword)
            .query("page", 1u32)
            .query("page_size", SEARCH_PAGE_SIZE);
        self.ctx.list_or_empty("user search", request).await.items
    }

    /// Known tags. Plain strings are accepted as well as `{value, label}`.
    pub async fn tags(&self) -> Vec<TagOption> {
        match self
            .ctx
            .fetch_listing::<Value>(RequestEnvelope::get("/users/tags"))
            .await
        {
            Ok(listing) => listing.items.into_iter().filter_map(tag_option).collect(),
            Err(err) => {
                outreach_warn!("Failed to load user tags: {}", err);
                Vec::new()
            }
        }
    }
}

fn tag_option(value: Value) -> Option<TagOption> {
    match value {
        Value::String(tag) => Some(TagOption {
            value: tag.clone(),
            label: tag,
        }),
        other => serde_json::from_value(other).ok(),
    }
}
