use outreach_core::{Listing, Platform, User, UserGroup, UserGroupCreate, UserGroupUpdate};
use serde_json::json;

use crate::{RequestEnvelope, ServiceContext};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserGroupFilter {
    pub keyword: Option<String>,
    pub platform: Option<Platform>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Clone)]
pub struct UserGroupService {
    ctx: ServiceContext,
}

impl UserGroupService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self, filter: &UserGroupFilter) -> Listing<UserGroup> {
        let request = RequestEnvelope::get("/user-groups")
            .query_opt("keyword", filter.keyword.as_deref())
            .query_opt("platform", filter.platform)
            .query_opt("page", filter.page)
            .query_opt("page_size", filter.page_size);
        self.ctx.list_or_empty("user groups", request).await
    }

    pub async fn get(&self, id: i64) -> Option<UserGroup> {
        self.ctx
            .item_or_none("user group", RequestEnvelope::get(format!("/user-groups/{id}")))
            .await
    }

    pub async fn create(&self, payload: &UserGroupCreate) -> Option<UserGroup> {
        self.ctx
            .write_item(
                "Creating user group",
                RequestEnvelope::post("/user-groups").json(payload),
            )
            .await
    }

    pub async fn update(&self, id: i64, payload: &UserGroupUpdate) -> Option<UserGroup> {
        self.ctx
            .write_item(
                "Updating user group",
                RequestEnvelope::put(format!("/user-groups/{id}")).json(payload),
            )
            .await
    }

    pub async fn delete(&self, id: i64) -> bool {
        self.ctx
            .write_ack(
                "Deleting user group",
                Ok(RequestEnvelope::delete(format!("/user-groups/{id}"))),
            )
            .await
    }

    pub async fn members(&self, id: i64) -> Listing<User> {
        self.ctx
            .list_or_empty(
                "group members",
                RequestEnvelope::get(format!("/user-groups/{id}/users")),
            )
            .await
    }

    pub async fn add_users(&self, id: i64, user_ids: &[i64]) -> bool {
        self.ctx
            .write_ack(
                "Adding users to group",
                RequestEnvelope::post(format!("/user-groups/{id}/users"))
                    .json(&json!({ "user_ids": user_ids })),
            )
            .await
    }

    pub async fn remove_users(&self, id: i64, user_ids: &[i64]) -> bool {
        self.ctx
            .write_ack(
                "Removing users from group",
                RequestEnvelope::delete(format!("/user-groups/{id}/users"))
                    .json(&json!({ "user_ids": user_ids })),
            )
            .await
    }
}
