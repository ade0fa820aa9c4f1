use outreach_core::{ConfigEntry, ConfigUpdate};
use outreach_logging::{outreach_debug, outreach_warn};

use crate::{Notice, RequestEnvelope, ServiceContext};

/// Server-side configs with the local cache as fallback tier.
///
/// Reads are total: when the backend is unreachable the cached copy is
/// returned. Writes touch the cache only after the backend accepted them.
#[derive(Clone)]
pub struct ConfigService {
    ctx: ServiceContext,
}

impl ConfigService {
    pub(crate) fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    pub async fn list(&self) -> Vec<ConfigEntry> {
        match self
            .ctx
            .fetch_listing::<ConfigEntry>(RequestEnvelope::get("/configs"))
            .await
        {
            Ok(listing) => {
                self.ctx.cache().refresh_mirror(&listing.items);
                listing.items
            }
            Err(err) => {
                outreach_warn!("Failed to fetch configs, using cached copy: {}", err);
                self.ctx.cache().entries()
            }
        }
    }

    pub async fn get(&self, key: &str) -> Option<ConfigEntry> {
        match self
            .ctx
            .fetch_item::<ConfigEntry>(RequestEnvelope::get("/configs").segment(key))
            .await
        {
            Ok(entry) => {
                self.ctx.cache().upsert(entry.clone());
                Some(entry)
            }
            Err(err) => {
                outreach_warn!("Failed to fetch config {}, using cached copy: {}", key, err);
                self.ctx.cache().entry(key)
            }
        }
    }

    /// Writes a config. Returns `None` and leaves the cache alone on failure.
    pub async fn update(
        &self,
        key: &str,
        value: &str,
        description: Option<&str>,
    ) -> Option<ConfigEntry> {
        let body = ConfigUpdate {
            value: value.to_string(),
            description: description.map(ToOwned::to_owned),
        };
        let request = match RequestEnvelope::put("/configs").segment(key).json(&body) {
            Ok(request) => request,
            Err(err) => {
                self.ctx.report_failure("Updating config", &err);
                return None;
            }
        };

        match self.ctx.execute(request).await {
            Ok(_) => {
                let entry =
                    ConfigEntry::new(key, Some(body.value)).with_description(body.description);
                self.ctx.cache().upsert(entry.clone());
                outreach_debug!("Config {} updated and mirrored", key);
                self.ctx.notify(Notice::success(format!("Config {key} updated")));
                Some(entry)
            }
            Err(err) => {
                self.ctx.report_failure("Updating config", &err);
                None
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self
            .ctx
            .execute(RequestEnvelope::delete("/configs").segment(key))
            .await
        {
            Ok(_) => {
                self.ctx.cache().remove(key);
                self.ctx.notify(Notice::success(format!("Config {key} deleted")));
                true
            }
            Err(err) => {
                self.ctx.report_failure("Deleting config", &err);
                false
            }
        }
    }

    /// Cached value only; never touches the network.
    pub fn value(&self, key: &str) -> Option<String> {
        self.ctx.cache().get(key)
    }
}
