//! Endpoint catalog and GraphQL request construction.
//!
//! GraphQL endpoints are addressed by a persisted-query id baked into the
//! web client bundle; the ids change only when the bundle ships a new query
//! version. Each request also carries a `features` map of client feature
//! flags that the server validates against the query id.

use std::sync::LazyLock;

use serde_json::{json, Value};

use crate::config::ClientConfig;

/// One persisted GraphQL operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GqlOp {
    pub query_id: &'static str,
    pub name: &'static str,
}

macro_rules! gql_ops {
    ($($const_name:ident => $query_id:literal / $name:literal;)*) => {
        $(pub(crate) const $const_name: GqlOp = GqlOp {
            query_id: $query_id,
            name: $name,
        };)*
    };
}

gql_ops! {
    SEARCH_TIMELINE => "flaR-PUMshxFWZWPNpq4zA" / "SearchTimeline";
    USER_BY_SCREEN_NAME => "NimuplG1OB7Fd2btCLdBOw" / "UserByScreenName";
    USER_BY_REST_ID => "tD8zKvQzwY3kdx5yz6YmOw" / "UserByRestId";
    TWEET_RESULT_BY_REST_ID => "Xl5pC_lBk_gcO2ItU39DQw" / "TweetResultByRestId";
    CREATE_TWEET => "SiM_cAu83R0wnrpmKQQSEw" / "CreateTweet";
    DELETE_TWEET => "VaenaVgh5q5ih7kvyVjgtg" / "DeleteTweet";
    FAVORITE_TWEET => "lI07N6Otwv1PhnEgXILM7A" / "FavoriteTweet";
    UNFAVORITE_TWEET => "ZYKSe-w7KEslx3JhSIk5LA" / "UnfavoriteTweet";
    CREATE_RETWEET => "ojPdsZsimiJrUGLR1sjUtA" / "CreateRetweet";
    DELETE_RETWEET => "iQtK4dl5hBmXewYZuEOKVw" / "DeleteRetweet";
    HOME_TIMELINE => "-X_hcgQzmHGl29-UXxz4sw" / "HomeTimeline";
    HOME_LATEST_TIMELINE => "U0cdisy7QFIoTfu3-Okw0A" / "HomeLatestTimeline";
    USER_TWEETS => "QWF3SzpHmykQHsQMixG0cg" / "UserTweets";
    USER_TWEETS_AND_REPLIES => "vMkJyzx1wdmvOeeNG0n6Wg" / "UserTweetsAndReplies";
    USER_MEDIA => "2tLOJWwGuCTytDrGBg8VwQ" / "UserMedia";
    USER_LIKES => "IohM3gxQHfvWePH5E3KuNA" / "Likes";
    FAVORITERS => "LLkw5EcVutJL6y-2gkz22A" / "Favoriters";
    RETWEETERS => "X-XEqG5qHQSAwmvy00xfyQ" / "Retweeters";
    FOLLOWERS => "gC_lyAxZOptAMLCJX5UhWw" / "Followers";
    FOLLOWING => "2vUj-_Ek-UmBVDNtd8OnQA" / "Following";
    DM_MESSAGE_DELETE => "BJ6DtxA2llfjnRoRjaiIiw" / "DMMessageDeleteMutation";
    SEARCH_COMMUNITY => "daVUkhfHn7-Z8llpYVKJSw" / "CommunitiesSearchQuery";
    COMMUNITY_QUERY => "lUBKrilodgg9Nikaw3cIiA" / "CommunityQuery";
    COMMUNITY_TWEETS_TIMELINE => "mhwSsmub4JZgHcs0dtsjrw" / "CommunityTweetsTimeline";
}

/// Resolved URLs for the configured bases.
#[derive(Debug, Clone)]
pub(crate) struct Endpoints {
    graphql_base: String,
    rest_base: String,
    api_base: String,
}

impl Endpoints {
    pub(crate) fn new(config: &ClientConfig) -> Self {
        Self {
            graphql_base: config.graphql_base.trim_end_matches('/').to_string(),
            rest_base: config.rest_base.trim_end_matches('/').to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) fn gql(&self, op: GqlOp) -> String {
        format!("{}/{}/{}", self.graphql_base, op.query_id, op.name)
    }

    pub(crate) fn guest_activate(&self) -> String {
        format!("{}/1.1/guest/activate.json", self.api_base)
    }

    pub(crate) fn onboarding_task(&self) -> String {
        format!("{}/1.1/onboarding/task.json", self.api_base)
    }

    pub(crate) fn account_logout(&self) -> String {
        format!("{}/1.1/account/logout.json", self.api_base)
    }

    pub(crate) fn account_settings(&self) -> String {
        format!("{}/1.1/account/settings.json", self.api_base)
    }

    pub(crate) fn friendships_create(&self) -> String {
        format!("{}/1.1/friendships/create.json", self.rest_base)
    }

    pub(crate) fn friendships_destroy(&self) -> String {
        format!("{}/1.1/friendships/destroy.json", self.rest_base)
    }

    pub(crate) fn dm_new(&self) -> String {
        format!("{}/1.1/dm/new2.json", self.rest_base)
    }

    pub(crate) fn dm_conversation(&self, conversation_id: &str) -> String {
        format!("{}/1.1/dm/conversation/{conversation_id}.json", self.rest_base)
    }

    pub(crate) fn notifications(&self, kind: &str) -> String {
        format!("{}/2/notifications/{kind}.json", self.rest_base)
    }

    pub(crate) fn guide(&self) -> String {
        format!("{}/2/guide.json", self.rest_base)
    }

    /// The served ui_metrics challenge script; lives beside `/i/api` on the
    /// main host.
    pub(crate) fn ui_metrics(&self) -> String {
        format!(
            "{}/js_inst?c_name=ui_metrics",
            self.rest_base.trim_end_matches("/api")
        )
    }

    pub(crate) fn live_pipeline_events(&self) -> String {
        format!("{}/live_pipeline/events", self.api_base)
    }

    pub(crate) fn live_pipeline_update_subscriptions(&self) -> String {
        format!("{}/1.1/live_pipeline/update_subscriptions", self.api_base)
    }
}

/// Query params for a GraphQL GET: JSON-encoded `variables` plus optional
/// `features`.
pub(crate) fn gql_get_params(variables: &Value, features: Option<&Value>) -> Vec<(String, String)> {
    let mut params = vec![("variables".to_string(), variables.to_string())];
    if let Some(features) = features {
        params.push(("features".to_string(), features.to_string()));
    }
    params
}

/// Body for a GraphQL POST: `variables`, `queryId`, optional `features`.
pub(crate) fn gql_post_body(op: GqlOp, variables: Value, features: Option<&Value>) -> Value {
    let mut body = json!({
        "variables": variables,
        "queryId": op.query_id,
    });
    if let Some(features) = features {
        body["features"] = features.clone();
    }
    body
}

/// Feature flags for timeline-shaped queries.
pub(crate) static TIMELINE_FEATURES: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "c9s_tweet_anatomy_moderator_badge_enabled": true,
        "tweetypie_unmention_optimization_enabled": true,
        "responsive_web_edit_tweet_api_enabled": true,
        "graphql_is_translatable_rweb_tweet_is_translatable_enabled": true,
        "view_counts_everywhere_api_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "responsive_web_twitter_article_tweet_consumption_enabled": true,
        "tweet_awards_web_tipping_enabled": false,
        "longform_notetweets_rich_text_read_enabled": true,
        "longform_notetweets_inline_media_enabled": true,
        "rweb_video_timestamps_enabled": true,
        "responsive_web_graphql_exclude_directive_enabled": true,
        "verified_phone_label_enabled": false,
        "freedom_of_speech_not_reach_fetch_enabled": true,
        "standardized_nudges_misinfo": true,
        "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled": true,
        "responsive_web_media_download_video_enabled": false,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "responsive_web_graphql_timeline_navigation_enabled": true,
        "responsive_web_enhance_cards_enabled": false
    })
});

/// Feature flags for user-profile queries.
pub(crate) static USER_FEATURES: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "hidden_profile_likes_enabled": true,
        "hidden_profile_subscriptions_enabled": true,
        "responsive_web_graphql_exclude_directive_enabled": true,
        "verified_phone_label_enabled": false,
        "subscriptions_verification_info_is_identity_verified_enabled": true,
        "subscriptions_verification_info_verified_since_enabled": true,
        "highlights_tweets_tab_ui_enabled": true,
        "responsive_web_twitter_article_notes_tab_enabled": false,
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "responsive_web_graphql_timeline_navigation_enabled": true
    })
});

/// Feature flags for community queries.
pub(crate) static COMMUNITY_TWEETS_FEATURES: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "rweb_tipjar_consumption_enabled": true,
        "responsive_web_graphql_exclude_directive_enabled": true,
        "verified_phone_label_enabled": false,
        "creator_subscriptions_tweet_preview_api_enabled": true,
        "responsive_web_graphql_timeline_navigation_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "communities_web_enable_tweet_community_results_fetch": true,
        "c9s_tweet_anatomy_moderator_badge_enabled": true,
        "tweetypie_unmention_optimization_enabled": true,
        "responsive_web_edit_tweet_api_enabled": true,
        "graphql_is_translatable_rweb_tweet_is_translatable_enabled": true,
        "view_counts_everywhere_api_enabled": true,
        "longform_notetweets_consumption_enabled": true,
        "responsive_web_twitter_article_tweet_consumption_enabled": true,
        "tweet_awards_web_tipping_enabled": false,
        "creator_subscriptions_quote_tweet_preview_enabled": false,
        "freedom_of_speech_not_reach_fetch_enabled": true,
        "standardized_nudges_misinfo": true,
        "tweet_with_visibility_results_prefer_gql_limited_actions_policy_enabled": true,
        "rweb_video_timestamps_enabled": true,
        "longform_notetweets_rich_text_read_enabled": true,
        "longform_notetweets_inline_media_enabled": true,
        "responsive_web_enhance_cards_enabled": false
    })
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gql_urls_join_query_id_and_name() {
        let endpoints = Endpoints::new(&ClientConfig::default());
        assert_eq!(
            endpoints.gql(USER_BY_SCREEN_NAME),
            "https://twitter.com/i/api/graphql/NimuplG1OB7Fd2btCLdBOw/UserByScreenName"
        );
        assert!(endpoints.dm_conversation("1-2").ends_with("/1.1/dm/conversation/1-2.json"));
    }

    #[test]
    fn get_params_encode_variables_as_json() {
        let params = gql_get_params(&json!({"userId": "1"}), Some(&TIMELINE_FEATURES));
        assert_eq!(params[0].0, "variables");
        assert_eq!(params[0].1, r#"{"userId":"1"}"#);
        assert_eq!(params[1].0, "features");
        assert!(params[1].1.contains("view_counts_everywhere_api_enabled"));
    }

    #[test]
    fn post_body_carries_query_id() {
        let body = gql_post_body(FAVORITE_TWEET, json!({"tweet_id": "1"}), None);
        assert_eq!(body["queryId"], "lI07N6Otwv1PhnEgXILM7A");
        assert_eq!(body["variables"]["tweet_id"], "1");
        assert!(body.get("features").is_none());
    }
}
