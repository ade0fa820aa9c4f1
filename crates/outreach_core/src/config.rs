use serde::{Deserialize, Serialize};

/// Config key holding the scraping provider token sent as `X-Apify-Token`.
pub const API_TOKEN_KEY: &str = "APIFY_API_TOKEN";
/// Config key holding the session token sent as `Authorization: Bearer`.
pub const SESSION_TOKEN_KEY: &str = "token";
/// Credentials set on this machine. A server listing that omits them leaves
/// the cached values in place.
pub const LOCAL_CREDENTIAL_KEYS: [&str; 2] = [API_TOKEN_KEY, SESSION_TOKEN_KEY];
pub const INSTAGRAM_COOKIES_KEY: &str = "INSTAGRAM_COOKIES";
pub const INSTAGRAM_USERNAME_KEY: &str = "INSTAGRAM_USERNAME";
pub const INSTAGRAM_PASSWORD_KEY: &str = "INSTAGRAM_PASSWORD";

/// Named configuration value, as stored by the backend and mirrored locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl ConfigEntry {
    pub fn new(key: impl Into<String>, value: Option<String>) -> Self {
        Self {
            key: key.into(),
            value,
            description: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// Body of `PUT /configs/{key}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Inserts or replaces the entry with the same key, keeping list order.
pub fn upsert_entry(entries: &mut Vec<ConfigEntry>, entry: ConfigEntry) {
    match entries.iter_mut().find(|existing| existing.key == entry.key) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_replaces_in_place() {
        let mut entries = vec![
            ConfigEntry::new("a", Some("1".into())),
            ConfigEntry::new("b", Some("2".into())),
        ];
        upsert_entry(&mut entries, ConfigEntry::new("a", Some("3".into())));
        upsert_entry(&mut entries, ConfigEntry::new("c", None));

        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(entries[0].value.as_deref(), Some("3"));
    }
}
