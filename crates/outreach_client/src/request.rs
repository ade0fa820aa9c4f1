use outreach_core::{JobId, Platform, TagLogic};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use crate::ApiError;

/// A query value; lists are sent comma-joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Scalar(String),
    List(Vec<String>),
}

impl QueryValue {
    pub fn render(&self) -> String {
        match self {
            QueryValue::Scalar(value) => value.clone(),
            QueryValue::List(items) => items.join(","),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty),*) => {
        $(impl From<$ty> for QueryValue {
            fn from(value: $ty) -> Self {
                QueryValue::Scalar(value.to_string())
            }
        })*
    };
}

scalar_from!(&str, String, i64, u32, u64, bool, Platform);

impl From<TagLogic> for QueryValue {
    fn from(value: TagLogic) -> Self {
        QueryValue::Scalar(value.as_str().to_string())
    }
}

impl From<&[JobId]> for QueryValue {
    fn from(ids: &[JobId]) -> Self {
        QueryValue::List(ids.iter().map(ToString::to_string).collect())
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(items: Vec<String>) -> Self {
        QueryValue::List(items)
    }
}

/// One outbound call, built by a facade and executed by a [`crate::Backend`].
#[derive(Debug, Clone, PartialEq)]
pub struct RequestEnvelope {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, QueryValue)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestEnvelope {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends one percent-encoded path segment, so `/`, `?` and `#` stay
    /// inside it.
    pub fn segment(mut self, segment: &str) -> Self {
        self.path.push('/');
        self.path.push_str(&urlencoding::encode(segment));
        self
    }

    pub fn query(mut self, key: &str, value: impl Into<QueryValue>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn query_opt<V: Into<QueryValue>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Appends a comma-joined list; empty lists are left out.
    pub fn query_list<I, S>(self, key: &str, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        let items: Vec<String> = items.into_iter().map(|item| item.to_string()).collect();
        if items.is_empty() {
            self
        } else {
            self.query(key, QueryValue::List(items))
        }
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|err| ApiError::Encode(err.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Reads go through caches and receive a cache-busting parameter.
    pub fn is_read(&self) -> bool {
        self.method == Method::GET
    }

    pub(crate) fn rendered_query(&self) -> Vec<(String, String)> {
        self.query
            .iter()
            .map(|(key, value)| (key.clone(), value.render()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_lists_are_comma_joined() {
        let ids: &[JobId] = &[3, 1, 2];
        let request = RequestEnvelope::get("/search-tasks/status").query("ids", ids);
        assert_eq!(
            request.rendered_query(),
            vec![("ids".to_string(), "3,1,2".to_string())]
        );
    }

    #[test]
    fn empty_lists_and_missing_values_are_skipped() {
        let request = RequestEnvelope::get("/users")
            .query_list("tags", Vec::<String>::new())
            .query_opt::<&str>("keyword", None)
            .query("page", 1u32);
        assert_eq!(
            request.rendered_query(),
            vec![("page".to_string(), "1".to_string())]
        );
    }

    #[test]
    fn segments_are_percent_encoded() {
        let request = RequestEnvelope::get("/configs").segment("a?b/c#d e");
        assert_eq!(request.path, "/configs/a%3Fb%2Fc%23d%20e");
        assert_eq!(RequestEnvelope::get("/configs").segment("plain").path, "/configs/plain");
    }

    #[test]
    fn only_get_is_a_read() {
        assert!(RequestEnvelope::get("/configs").is_read());
        assert!(!RequestEnvelope::put("/configs/x").is_read());
    }
}
