use std::collections::BTreeMap;

use outreach_core::{Listing, Platform, Template, TemplateCreate, TemplateUpdate};
use outreach_logging::outreach_warn;
use serde_json::{json, Value};

use crate::{RequestEnvelope, ServiceContext};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateFilter {
    pub keyword: Option<String>,
    pub platform: Option<Platform>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Clone)]
pub struct TemplateService {
    ctx: ServiceContext,
}

impl TemplateService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Templates come back either bare or paginated; both normalize here.
    pub async fn list(&self, filter: &TemplateFilter) -> Listing<Template> {
        let request = RequestEnvelope::get("/templates")
            .query_opt("keyword", filter.keyword.as_deref())
            .query_opt("platform", filter.platform)
            .query_opt("page", filter.page)
            .query_opt("pageSize", filter.page_size);
        self.ctx.list_or_empty("templates", request).await
    }

    pub async fn get(&self, id: i64) -> Option<Template> {
        self.ctx
            .item_or_none("template", RequestEnvelope::get(format!("/templates/{id}")))
            .await
    }

    pub async fn create(&self, payload: &TemplateCreate) -> Option<Template> {
        self.ctx
            .write_item(
                "Creating template",
                RequestEnvelope::post("/templates").json(payload),
            )
            .await
    }

    pub async fn update(&self, id: i64, payload: &TemplateUpdate) -> Option<Template> {
        self.ctx
            .write_item(
                "Updating template",
                RequestEnvelope::put(format!("/templates/{id}")).json(payload),
            )
            .await
    }

    pub async fn delete(&self, id: i64) -> bool {
        self.ctx
            .write_ack(
                "Deleting template",
                Ok(RequestEnvelope::delete(format!("/templates/{id}"))),
            )
            .await
    }

    pub async fn set_default(&self, id: i64) -> bool {
        self.ctx
            .write_ack(
                "Setting default template",
                Ok(RequestEnvelope::post(format!("/templates/{id}/default"))),
            )
            .await
    }

    /// Renders the template server-side. Empty on any failure.
    pub async fn preview(&self, id: i64, variables: &BTreeMap<String, String>) -> String {
        let request = match RequestEnvelope::post(format!("/templates/{id}/preview"))
            .json(&json!({ "variables": variables }))
        {
            Ok(request) => request,
            Err(err) => {
                self.ctx.report_failure("Previewing template", &err);
                return String::new();
            }
        };

        match self.ctx.execute(request).await {
            Ok(shape) => match preview_text(&shape.into_value()) {
                Some(text) => text,
                None => {
                    outreach_warn!("Template {} preview carried no text", id);
                    String::new()
                }
            },
            Err(err) => {
                self.ctx.report_failure("Previewing template", &err);
                String::new()
            }
        }
    }
}

/// `preview` may sit at the top level or one `data` level down.
fn preview_text(payload: &Value) -> Option<String> {
    payload
        .get("preview")
        .or_else(|| payload.get("data").and_then(|data| data.get("preview")))
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}
