use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Arc;

use outreach_client::{
    ApiError, ChannelNoticeSink, ClientSettings, LocalConfigCache, Notice, NoticeLevel,
    SearchTaskFilter, ServiceContext, UserFilter, API_TOKEN_HEADER,
};
use outreach_core::{
    JobStatus, Platform, SearchParams, SearchTaskCreate, TagLogic, API_TOKEN_KEY,
    SESSION_TOKEN_KEY,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    ctx: ServiceContext,
    notices: mpsc::Receiver<Notice>,
}

impl Harness {
    fn new(server: &MockServer, cache: LocalConfigCache) -> Self {
        outreach_logging::initialize_for_tests();
        let settings = ClientSettings {
            base_url: format!("{}/api", server.uri()),
            ..ClientSettings::default()
        };
        let (tx, notices) = mpsc::channel();
        let ctx = ServiceContext::connect(&settings, cache)
            .expect("context")
            .with_notices(Arc::new(ChannelNoticeSink::new(tx)));
        Self { ctx, notices }
    }

    fn levels(&self) -> Vec<NoticeLevel> {
        self.notices.try_iter().map(|notice| notice.level).collect()
    }
}

fn search_payload() -> SearchTaskCreate {
    SearchTaskCreate {
        name: "coffee".into(),
        platform: Platform::Instagram,
        search_params: SearchParams {
            keywords: vec!["espresso".into()],
            ..SearchParams::default()
        },
        results_limit: Some(100),
    }
}

#[tokio::test]
async fn successful_config_write_is_visible_in_both_tiers() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/configs/greeting"))
        .and(body_json(json!({"value": "hello"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "greeting", "value": "hello"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/configs/greeting"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "greeting", "value": "hello"})))
        .mount(&server)
        .await;

    let harness = Harness::new(&server, LocalConfigCache::in_memory());
    let configs = harness.ctx.configs();

    let written = configs.update("greeting", "hello", None).await.expect("written");
    assert_eq!(written.value.as_deref(), Some("hello"));
    assert_eq!(configs.value("greeting").as_deref(), Some("hello"));
    let fetched = configs.get("greeting").await.expect("fetched");
    assert_eq!(fetched.value.as_deref(), Some("hello"));
    assert_eq!(harness.levels(), vec![NoticeLevel::Success]);
}

#[tokio::test]
async fn failed_config_write_leaves_cache_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/configs/greeting"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"detail": "db down"})))
        .mount(&server)
        .await;

    let cache = LocalConfigCache::in_memory();
    cache.set("greeting", "old");
    let harness = Harness::new(&server, cache.clone());

    assert_eq!(harness.ctx.configs().update("greeting", "new", None).await, None);
    assert_eq!(cache.get("greeting").as_deref(), Some("old"));
    assert_eq!(harness.levels(), vec![NoticeLevel::Error]);
}

#[tokio::test]
async fn config_reads_fall_back_to_cache_when_backend_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let cache = LocalConfigCache::in_memory();
    cache.set("INSTAGRAM_USERNAME", "ana");
    let harness = Harness::new(&server, cache);
    let configs = harness.ctx.configs();

    let listed = configs.list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key, "INSTAGRAM_USERNAME");
    let single = configs.get("INSTAGRAM_USERNAME").await.expect("cached");
    assert_eq!(single.value.as_deref(), Some("ana"));
    assert_eq!(configs.get("missing").await, None);
}

#[tokio::test]
async fn config_list_replaces_the_cached_mirror() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": [{"key": "APIFY_API_TOKEN", "value": "fresh", "description": "provider"}]
        })))
        .mount(&server)
        .await;

    let cache = LocalConfigCache::in_memory();
    cache.set("stale", "x");
    let harness = Harness::new(&server, cache.clone());

    let listed = harness.ctx.configs().list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(cache.get("stale"), None);
    assert_eq!(cache.get(API_TOKEN_KEY).as_deref(), Some("fresh"));
}

#[tokio::test]
async fn config_list_keeps_local_credentials_the_server_omits() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/configs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"key": "INSTAGRAM_USERNAME", "value": "ana"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/search-tasks"))
        .and(header(API_TOKEN_HEADER, "apify-local"))
        .and(header("Authorization", "Bearer session-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let cache = LocalConfigCache::in_memory();
    cache.set(SESSION_TOKEN_KEY, "session-abc");
    cache.set(API_TOKEN_KEY, "apify-local");
    cache.set("stale", "x");
    let harness = Harness::new(&server, cache.clone());

    let listed = harness.ctx.configs().list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(cache.get(SESSION_TOKEN_KEY).as_deref(), Some("session-abc"));
    assert_eq!(cache.get(API_TOKEN_KEY).as_deref(), Some("apify-local"));
    assert_eq!(cache.get("INSTAGRAM_USERNAME").as_deref(), Some("ana"));
    assert_eq!(cache.get("stale"), None);

    let tasks = harness.ctx.search_tasks().list(&SearchTaskFilter::default()).await;
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn config_keys_are_sent_as_a_single_encoded_segment() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/configs/a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "a", "value": "from-a"})))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/configs/a%3Fb%2Fc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"key": "a?b/c", "value": "odd"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/configs/a%3Fb%2Fc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let cache = LocalConfigCache::in_memory();
    let harness = Harness::new(&server, cache.clone());
    let configs = harness.ctx.configs();

    let entry = configs.get("a?b/c").await.expect("fetched");
    assert_eq!(entry.key, "a?b/c");
    assert_eq!(entry.value.as_deref(), Some("odd"));
    assert_eq!(cache.get("a"), None);
    assert!(configs.delete("a?b/c").await);
    assert_eq!(cache.get("a?b/c"), None);
}

#[tokio::test]
async fn config_delete_only_drops_cache_on_success() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/configs/kept"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "not found"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/configs/gone"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let cache = LocalConfigCache::in_memory();
    cache.set("kept", "1");
    cache.set("gone", "2");
    let harness = Harness::new(&server, cache.clone());
    let configs = harness.ctx.configs();

    assert!(!configs.delete("kept").await);
    assert!(configs.delete("gone").await);
    assert_eq!(cache.get("kept").as_deref(), Some("1"));
    assert_eq!(cache.get("gone"), None);
}

#[tokio::test]
async fn search_task_create_without_token_never_reaches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search-tasks"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, LocalConfigCache::in_memory());
    let err = harness
        .ctx
        .search_tasks()
        .create(&search_payload())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Configuration(_)));
    assert_eq!(harness.levels(), vec![NoticeLevel::Error]);
    assert!(server.received_requests().await.expect("recording on").is_empty());
}

#[tokio::test]
async fn search_task_create_with_token_returns_the_task() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search-tasks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 12,
            "name": "coffee",
            "platform": "instagram",
            "status": "pending"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let cache = LocalConfigCache::in_memory();
    cache.set(API_TOKEN_KEY, "apify-1");
    let harness = Harness::new(&server, cache);
    let task = harness
        .ctx
        .search_tasks()
        .create(&search_payload())
        .await
        .expect("created");

    assert_eq!(task.id, 12);
    assert_eq!(task.status, JobStatus::Pending);
    assert_eq!(harness.levels(), vec![NoticeLevel::Success]);
}

#[tokio::test]
async fn status_of_sends_comma_joined_ids() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search-tasks/status"))
        .and(query_param("ids", "3,7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "status": "running", "result_count": 10},
            {"id": 7, "status": "completed", "is_completed": true}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, LocalConfigCache::in_memory());
    let service = harness.ctx.search_tasks();
    let rows = service.status_of(&[3, 7]).await.expect("status rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].result_count, 10);
    assert!(rows[1].is_completed);

    assert_eq!(service.status_of(&[]).await.expect("no ids"), Vec::new());
}

#[tokio::test]
async fn failed_list_degrades_to_empty_with_a_warning() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search-tasks"))
        .and(query_param("pageSize", "20"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let harness = Harness::new(&server, LocalConfigCache::in_memory());
    let filter = SearchTaskFilter {
        page_size: Some(20),
        ..SearchTaskFilter::default()
    };
    let listing = harness.ctx.search_tasks().list(&filter).await;

    assert!(listing.is_empty());
    assert_eq!(listing.total, 0);
    assert_eq!(harness.levels(), vec![NoticeLevel::Warning]);
    assert!(harness.ctx.search_tasks().try_list(&filter).await.is_err());
}

#[tokio::test]
async fn start_and_stop_post_to_action_routes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/messages/message-tasks/5/start"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200, "message": "ok", "data": null})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/messages/message-tasks/5/stop"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 400, "message": "not running", "data": null})))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, LocalConfigCache::in_memory());
    let tasks = harness.ctx.message_tasks();
    assert!(tasks.start(5).await);
    assert!(!tasks.stop(5).await);
    assert_eq!(harness.levels(), vec![NoticeLevel::Success, NoticeLevel::Error]);
}

#[tokio::test]
async fn user_filter_uses_snake_case_paging_and_joined_tags() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("tags", "vip,eu"))
        .and(query_param("tag_logic", "and"))
        .and(query_param("page_size", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"id": 1, "username": "ana", "platform": "instagram"}],
            "total": 31
        })))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, LocalConfigCache::in_memory());
    let filter = UserFilter {
        tags: vec!["vip".into(), "eu".into()],
        tag_logic: Some(TagLogic::And),
        page_size: Some(10),
        ..UserFilter::default()
    };
    let listing = harness.ctx.users().list(&filter).await;
    assert_eq!(listing.total, 31);
    assert_eq!(listing.items[0].username, "ana");
}

#[tokio::test]
async fn group_membership_changes_send_user_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user-groups/2/users"))
        .and(body_json(json!({"user_ids": [4, 5]})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/user-groups/2/users"))
        .and(body_json(json!({"user_ids": [4]})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, LocalConfigCache::in_memory());
    let groups = harness.ctx.user_groups();
    assert!(groups.add_users(2, &[4, 5]).await);
    assert!(groups.remove_users(2, &[4]).await);
}

#[tokio::test]
async fn template_preview_is_empty_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/templates/1/preview"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"preview": "Hi Ana"}})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/templates/2/preview"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let harness = Harness::new(&server, LocalConfigCache::in_memory());
    let templates = harness.ctx.templates();
    let mut variables = BTreeMap::new();
    variables.insert("name".to_string(), "Ana".to_string());

    assert_eq!(templates.preview(1, &variables).await, "Hi Ana");
    assert_eq!(templates.preview(2, &variables).await, "");
}
