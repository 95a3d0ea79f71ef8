//! End-to-end tests against a mocked API server.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, header, method, path, query_param,
    query_param_contains};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skylark::{
    ChallengeSolver, Client, ClientConfig, Error, LoginArgs, UserTweetKind, WEB_BEARER_TOKEN,
};

fn config_for(server: &MockServer) -> ClientConfig {
    ClientConfig {
        graphql_base: format!("{}/i/api/graphql", server.uri()),
        rest_base: format!("{}/i/api", server.uri()),
        api_base: server.uri(),
        ..Default::default()
    }
}

fn client_for(server: &MockServer) -> Client {
    Client::new(config_for(server)).unwrap()
}

fn tweet_entry(id: &str, text: &str) -> Value {
    json!({
        "entryId": format!("tweet-{id}"),
        "content": {"itemContent": {"tweet_results": {"result": {
            "rest_id": id,
            "legacy": {"full_text": text, "favorite_count": 1}
        }}}}
    })
}

fn timeline_response(entries: Vec<Value>) -> Value {
    json!({"data": {"search_by_raw_query": {"search_timeline": {"timeline": {
        "instructions": [{"type": "TimelineAddEntries", "entries": entries}]
    }}}}})
}

#[tokio::test]
async fn user_lookup_sends_signed_request() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    client.set_cookies(
        HashMap::from([
            ("ct0".to_string(), "csrf-token".to_string()),
            ("auth_token".to_string(), "tok".to_string()),
        ]),
        false,
    );

    Mock::given(method("GET"))
        .and(path("/i/api/graphql/NimuplG1OB7Fd2btCLdBOw/UserByScreenName"))
        .and(header("authorization", format!("Bearer {WEB_BEARER_TOKEN}").as_str()))
        .and(header("x-csrf-token", "csrf-token"))
        .and(header("x-twitter-auth-type", "OAuth2Session"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"user": {"result": {
                "rest_id": "42",
                "legacy": {"screen_name": "somebody", "followers_count": 7}
            }}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = client.user_by_screen_name("somebody").await.unwrap();
    assert_eq!(user.id, "42");
    assert_eq!(user.screen_name, "somebody");
    assert_eq!(user.followers_count, 7);
}

#[tokio::test]
async fn search_paginates_through_cursors() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let first_page = timeline_response(vec![
        tweet_entry("1", "first"),
        tweet_entry("2", "second"),
        json!({"entryId": "cursor-bottom-0", "content": {"value": "CURSOR-2"}}),
    ]);
    let second_page = timeline_response(vec![
        tweet_entry("3", "third"),
        json!({"entryId": "cursor-bottom-0", "content": {"value": ""}}),
    ]);

    Mock::given(method("GET"))
        .and(path("/i/api/graphql/flaR-PUMshxFWZWPNpq4zA/SearchTimeline"))
        .and(query_param_contains("variables", "\"cursor\":\"CURSOR-2\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(second_page))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/i/api/graphql/flaR-PUMshxFWZWPNpq4zA/SearchTimeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first_page))
        .with_priority(5)
        .mount(&server)
        .await;

    let page = client.search_tweet("rust", "Latest", 20).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].text, "first");
    assert_eq!(page.next_cursor(), Some("CURSOR-2"));

    let next = page.next().await.unwrap().unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].id, "3");
    // Empty cursor token on the last page ends the walk.
    assert!(next.next().await.unwrap().is_none());
}

#[tokio::test]
async fn tombstones_and_promoted_entries_are_skipped() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let body = timeline_response(vec![
        tweet_entry("123", "hi"),
        json!({"entryId": "tweet-999", "content": {"itemContent": {
            "tweetDisplayType": "Tombstone",
            "tombstoneInfo": {"richText": {"text": "unavailable"}}
        }}}),
        json!({"entryId": "promoted-tweet-55", "content": {"itemContent": {}}}),
    ]);
    Mock::given(method("GET"))
        .and(path("/i/api/graphql/flaR-PUMshxFWZWPNpq4zA/SearchTimeline"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let page = client.search_tweet("anything", "Top", 20).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, "123");
    assert_eq!(page[0].text, "hi");
}

#[tokio::test]
async fn rate_limit_and_suspension_map_to_typed_errors() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("GET"))
        .and(path("/i/api/graphql/tD8zKvQzwY3kdx5yz6YmOw/UserByRestId"))
        .respond_with(ResponseTemplate::new(429).insert_header("x-rate-limit-remaining", "0"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/i/api/graphql/NimuplG1OB7Fd2btCLdBOw/UserByScreenName"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "errors": [{"code": 64, "message": "Your account is suspended"}]
        })))
        .mount(&server)
        .await;

    let err = client.user_by_id("1").await.unwrap_err();
    assert!(matches!(err, Error::RateLimited { .. }));
    assert!(err.is_retryable());

    let err = client.user_by_screen_name("x").await.unwrap_err();
    assert!(matches!(err, Error::AccountSuspended(_)));
}

struct FakeSolver;

#[async_trait]
impl ChallengeSolver for FakeSolver {
    async fn solve(&self, js_source: &str) -> skylark::Result<Value> {
        assert!(js_source.contains("function"));
        Ok(json!({"rf": {"a": 1}, "s": "sig"}))
    }
}

#[tokio::test]
async fn login_flow_threads_the_flow_token() {
    let server = MockServer::start().await;
    let client =
        Client::with_solver(config_for(&server), Box::new(FakeSolver)).unwrap();

    Mock::given(method("POST"))
        .and(path("/1.1/guest/activate.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"guest_token": "guest-1"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/i/js_inst"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "function fX() {return {'rf':{'a':1},'s':'sig'};};",
        ))
        .expect(1)
        .mount(&server)
        .await;

    // Flow opening: the server names the first subtask.
    Mock::given(method("POST"))
        .and(path("/1.1/onboarding/task.json"))
        .and(query_param("flow_name", "login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "flow_token": "f;1",
            "subtasks": [{"subtask_id": "LoginJsInstrumentationSubtask"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    // Each answer must carry the token from the previous response.
    Mock::given(method("POST"))
        .and(path("/1.1/onboarding/task.json"))
        .and(body_partial_json(json!({"flow_token": "f;1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "flow_token": "f;2",
            "subtasks": [{"subtask_id": "LoginEnterUserIdentifierSSO"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1.1/onboarding/task.json"))
        .and(body_partial_json(json!({
            "flow_token": "f;2",
            "subtask_inputs": [{"settings_list": {"setting_responses": [{
                "response_data": {"text_data": {"result": "example_user"}}
            }]}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "flow_token": "f;3",
            "subtasks": [{"subtask_id": "LoginEnterPassword"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1.1/onboarding/task.json"))
        .and(body_partial_json(json!({
            "flow_token": "f;3",
            "subtask_inputs": [{"enter_password": {"password": "hunter2"}}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "flow_token": "f;4",
            "subtasks": [{"subtask_id": "AccountDuplicationCheck"}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1.1/onboarding/task.json"))
        .and(body_partial_json(json!({"flow_token": "f;4"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "flow_token": "f;5",
                    "subtasks": [{"subtask_id": "LoginSuccessSubtask"}]
                }))
                .append_header("set-cookie", "auth_token=secret; Path=/; Secure")
                .append_header("set-cookie", "ct0=csrf-after-login; Path=/")
                .append_header("set-cookie", "twid=u%3D4242; Path=/"),
        )
        .expect(1)
        .mount(&server)
        .await;

    client
        .login(LoginArgs {
            auth_info_1: "example_user",
            auth_info_2: None,
            password: "hunter2",
            totp_code: None,
        })
        .await
        .unwrap();

    assert!(client.is_authenticated());
    assert_eq!(client.user_id().as_deref(), Some("4242"));
    assert_eq!(
        client.get_cookies().get("ct0").map(String::as_str),
        Some("csrf-after-login")
    );
}

#[tokio::test]
async fn two_factor_challenge_requires_a_code() {
    let server = MockServer::start().await;
    let client =
        Client::with_solver(config_for(&server), Box::new(FakeSolver)).unwrap();

    Mock::given(method("POST"))
        .and(path("/1.1/guest/activate.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"guest_token": "guest-1"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1.1/onboarding/task.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "flow_token": "f;1",
            "subtasks": [{"subtask_id": "LoginTwoFactorAuthChallenge"}]
        })))
        .mount(&server)
        .await;

    let err = client
        .login(LoginArgs {
            auth_info_1: "example_user",
            auth_info_2: None,
            password: "hunter2",
            totp_code: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Auth(_)));
}

#[tokio::test]
async fn cookies_persist_across_clients() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let cookie_path = dir.path().join("cookies.json");

    let first = client_for(&server);
    first.set_cookies(
        HashMap::from([
            ("auth_token".to_string(), "tok".to_string()),
            ("ct0".to_string(), "csrf".to_string()),
            ("twid".to_string(), "u%3D77".to_string()),
        ]),
        true,
    );
    first.save_cookies(&cookie_path).await.unwrap();

    let second = client_for(&server);
    assert!(!second.is_authenticated());
    second.load_cookies(&cookie_path).await.unwrap();
    assert!(second.is_authenticated());
    assert_eq!(second.user_id().as_deref(), Some("77"));
}

#[tokio::test]
async fn tweet_actions_post_the_query_id() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("POST"))
        .and(path("/i/api/graphql/lI07N6Otwv1PhnEgXILM7A/FavoriteTweet"))
        .and(body_partial_json(json!({
            "queryId": "lI07N6Otwv1PhnEgXILM7A",
            "variables": {"tweet_id": "555"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"favorite_tweet": "Done"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    client.favorite_tweet("555").await.unwrap();
}

#[tokio::test]
async fn create_tweet_hydrates_the_result() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("POST"))
        .and(path("/i/api/graphql/SiM_cAu83R0wnrpmKQQSEw/CreateTweet"))
        .and(body_partial_json(json!({
            "variables": {
                "tweet_text": "hello world",
                "reply": {"in_reply_to_tweet_id": "100"}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"create_tweet": {"tweet_results": {"result": {
                "rest_id": "101",
                "legacy": {
                    "full_text": "hello world",
                    "in_reply_to_status_id_str": "100"
                }
            }}}}
        })))
        .mount(&server)
        .await;

    let tweet = client.create_tweet("hello world", Some("100")).await.unwrap();
    assert_eq!(tweet.id, "101");
    assert_eq!(tweet.in_reply_to.as_deref(), Some("100"));
}

#[tokio::test]
async fn me_resolves_through_account_settings() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("GET"))
        .and(path("/1.1/account/settings.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "screen_name": "own_account",
            "language": "en"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/i/api/graphql/NimuplG1OB7Fd2btCLdBOw/UserByScreenName"))
        .and(query_param_contains("variables", "\"screen_name\":\"own_account\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"user": {"result": {
                "rest_id": "8",
                "legacy": {"screen_name": "own_account"}
            }}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let user = client.me().await.unwrap();
    assert_eq!(user.id, "8");
    assert_eq!(user.screen_name, "own_account");
}

#[tokio::test]
async fn user_tweet_tabs_pick_distinct_operations() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let body = json!({"data": {"user": {"result": {"timeline_v2": {"timeline": {
        "instructions": [{"entries": [tweet_entry("70", "liked one")]}]
    }}}}}});
    Mock::given(method("GET"))
        .and(path("/i/api/graphql/IohM3gxQHfvWePH5E3KuNA/Likes"))
        .and(query_param_contains("variables", "\"userId\":\"42\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(1)
        .mount(&server)
        .await;

    let page = client
        .user_tweets("42", UserTweetKind::Likes, 20)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].text, "liked one");
}

#[tokio::test]
async fn dm_history_pages_by_max_id() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    client.set_cookies(
        HashMap::from([
            ("twid".to_string(), "u%3D1".to_string()),
            ("auth_token".to_string(), "tok".to_string()),
        ]),
        false,
    );

    Mock::given(method("GET"))
        .and(path("/i/api/1.1/dm/conversation/1-2.json"))
        .and(query_param("max_id", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_timeline": {
                "status": "AT_END",
                "entries": [{"message": {"message_data": {
                    "id": "9", "time": "1716000000000", "text": "older", "sender_id": "2"
                }}}]
            }
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/i/api/1.1/dm/conversation/1-2.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "conversation_timeline": {
                "status": "HAS_MORE",
                "min_entry_id": "10",
                "entries": [{"message": {"message_data": {
                    "id": "11", "time": "1716100000000", "text": "newest", "sender_id": "1"
                }}}]
            }
        })))
        .with_priority(5)
        .mount(&server)
        .await;

    let page = client.dm_history("2").await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].text, "newest");
    assert_eq!(page.next_cursor(), Some("10"));

    let older = page.next().await.unwrap().unwrap();
    assert_eq!(older[0].text, "older");
    assert!(older.next().await.unwrap().is_none());
}

#[tokio::test]
async fn trends_hydrate_from_the_guide() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("GET"))
        .and(path("/i/api/2/guide.json"))
        .and(query_param("initial_tab_id", "trending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "timeline": {"instructions": [{"entries": [
                {"entryId": "trend-0", "content": {"item": {"content": {"trend": {
                    "name": "#RustLang",
                    "trendMetadata": {"metaDescription": "35.4K posts"}
                }}}}},
                {"entryId": "trend-1", "content": {"item": {"content": {"trend": {
                    "name": "cargo"
                }}}}}
            ]}]}
        })))
        .mount(&server)
        .await;

    let trends = client.trends("trending", 20).await.unwrap();
    assert_eq!(trends.len(), 2);
    assert_eq!(trends[0].name, "#RustLang");
    assert_eq!(trends[0].meta_description.as_deref(), Some("35.4K posts"));
    assert_eq!(trends[1].name, "cargo");
}

#[tokio::test]
async fn retries_recover_from_server_errors() {
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    config.retry.initial_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    let client = Client::new(config).unwrap();

    Mock::given(method("GET"))
        .and(path("/i/api/graphql/tD8zKvQzwY3kdx5yz6YmOw/UserByRestId"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/i/api/graphql/tD8zKvQzwY3kdx5yz6YmOw/UserByRestId"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"user": {"result": {"rest_id": "9"}}}
        })))
        .with_priority(5)
        .mount(&server)
        .await;

    let user = client.user_by_id("9").await.unwrap();
    assert_eq!(user.id, "9");
}

#[tokio::test]
async fn stream_session_reads_config_then_events() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let body = [
        json!({"topic": null, "payload": {"config": {
            "session_id": "sess-1", "heartbeat_millis": 3000, "subscription_ttl_millis": 240000
        }}})
        .to_string(),
        json!({"topic": "/tweet_engagement/5", "payload": {"tweet_engagement": {
            "like_count": 10
        }}})
        .to_string(),
    ]
    .join("\n");

    Mock::given(method("GET"))
        .and(path("/live_pipeline/events"))
        .and(query_param("topics", "/tweet_engagement/5"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let mut session = client
        .stream(&[skylark::topics::tweet_engagement("5")])
        .await
        .unwrap();
    assert_eq!(session.session_id(), "sess-1");
    assert_eq!(session.heartbeat_millis(), 3000);

    let event = session.next_event().await.unwrap().unwrap();
    assert_eq!(event.topic.as_deref(), Some("/tweet_engagement/5"));
    assert_eq!(
        event.payload.tweet_engagement.unwrap().like_count,
        Some(10)
    );
    assert!(session.next_event().await.unwrap().is_none());
}

#[tokio::test]
async fn stream_subscription_update_carries_session_header() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    Mock::given(method("GET"))
        .and(path("/live_pipeline/events"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            json!({"payload": {"config": {"session_id": "sess-9"}}}).to_string(),
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/1.1/live_pipeline/update_subscriptions"))
        .and(header("livepipeline-session", "sess-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"subscriptions": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let session = client
        .stream(&[skylark::topics::dm_update("1-2")])
        .await
        .unwrap();
    session
        .update_subscriptions(&[skylark::topics::tweet_engagement("7")], &[])
        .await
        .unwrap();
}

#[tokio::test]
async fn arc_handles_share_session_state() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let clone = client.clone();
    let handle = Arc::new(client);

    handle.set_cookies(
        HashMap::from([("twid".to_string(), "u=5".to_string())]),
        false,
    );
    assert_eq!(clone.user_id().as_deref(), Some("5"));
}
