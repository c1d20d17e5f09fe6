use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use super::reddit_harness::{
    BASE_CREATED_UTC, completion_server, config, link, listing, mount_listing, reddit_server,
};
use seattle_simulator::context::{ContextFetcher, SourceType};
use seattle_simulator::reddit::RedditContextFetcher;
use seattle_simulator::{SimError, Target};

fn comment(subreddit: &str, body: &str, offset: i64) -> Value {
    json!({
        "kind": "t1",
        "data": {
            "body": body,
            "author": "commenter",
            "score": 3,
            "created_utc": (BASE_CREATED_UTC + offset) as f64,
            "subreddit": subreddit,
        }
    })
}

#[tokio::test]
async fn community_merges_top_comments_newest_first() {
    let reddit = reddit_server().await;
    let llm = completion_server("unused", 0).await;
    mount_listing(
        &reddit,
        "/r/Seattle/new",
        listing(vec![link("Seattle", 1), link("Seattle", 2)]),
    )
    .await;
    for i in 1..=2 {
        let comments = listing(vec![
            comment("Seattle", "[deleted]", 100 + i),
            comment("Seattle", &format!("reply to {i}"), 50 + i),
            comment("Seattle", "another take", 40 + i),
            comment("Seattle", "third take", 30 + i),
        ]);
        mount_listing(
            &reddit,
            &format!("/r/Seattle/comments/p{i}"),
            json!([listing(vec![link("Seattle", i)]), comments]),
        )
        .await;
    }

    let mut config = config(&reddit, &llm);
    config.comments_per_post = 2;
    let fetcher = RedditContextFetcher::from_config(&config).unwrap();
    let items = fetcher
        .fetch(&Target::Community("Seattle".into()), 25)
        .await
        .unwrap();

    assert_eq!(items.len(), 6);
    assert!(
        items
            .windows(2)
            .all(|pair| pair[0].created_utc >= pair[1].created_utc)
    );
    let comments = items
        .iter()
        .filter(|item| item.source_type == SourceType::Comment)
        .count();
    assert_eq!(comments, 4);
    assert!(items.iter().all(|item| item.text != "[deleted]"));
}

#[tokio::test]
async fn vanished_post_contributes_no_comments() {
    let reddit = reddit_server().await;
    let llm = completion_server("unused", 0).await;
    mount_listing(
        &reddit,
        "/r/Seattle/new",
        listing(vec![link("Seattle", 1), link("Seattle", 2), link("Seattle", 3)]),
    )
    .await;
    mount_listing(
        &reddit,
        "/r/Seattle/comments/p1",
        json!([
            listing(vec![link("Seattle", 1)]),
            listing(vec![comment("Seattle", "still here", 10)]),
        ]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/r/Seattle/comments/p2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&reddit)
        .await;
    mount_listing(
        &reddit,
        "/r/Seattle/comments/p3",
        json!([
            listing(vec![link("Seattle", 3)]),
            listing(vec![comment("Seattle", "also here", 20)]),
        ]),
    )
    .await;

    let mut config = config(&reddit, &llm);
    config.comments_per_post = 1;
    let fetcher = RedditContextFetcher::from_config(&config).unwrap();
    let items = fetcher
        .fetch(&Target::Community("Seattle".into()), 25)
        .await
        .unwrap();

    assert_eq!(items.len(), 5);
    assert_eq!(items[0].text, "also here");
    assert_eq!(items[1].text, "still here");
}

#[tokio::test]
async fn community_respects_limit() {
    let reddit = reddit_server().await;
    let llm = completion_server("unused", 0).await;
    let links = (0..10).map(|i| link("SeattleWA", i)).collect();
    mount_listing(&reddit, "/r/SeattleWA/new", listing(links)).await;

    let fetcher = RedditContextFetcher::from_config(&config(&reddit, &llm)).unwrap();
    let items = fetcher
        .fetch(&Target::Community("SeattleWA".into()), 5)
        .await
        .unwrap();

    assert_eq!(items.len(), 5);
    assert!(items[0].text.starts_with("Title: Post number 9"));
}

#[tokio::test]
async fn banned_community_redirect_is_not_found() {
    let reddit = reddit_server().await;
    let llm = completion_server("unused", 0).await;
    Mock::given(method("GET"))
        .and(path("/r/gone/new"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", "https://www.reddit.com/subreddits/search"),
        )
        .mount(&reddit)
        .await;

    let fetcher = RedditContextFetcher::from_config(&config(&reddit, &llm)).unwrap();
    let err = fetcher
        .fetch(&Target::Community("gone".into()), 25)
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::NotFound { target } if target == "r/gone"));
}

#[tokio::test]
async fn user_merges_comments_and_capped_submissions() {
    let reddit = reddit_server().await;
    let llm = completion_server("unused", 0).await;
    Mock::given(method("GET"))
        .and(path("/user/rainy_day/comments"))
        .and(query_param("limit", "25"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![
            comment("Seattle", "mountain is out", 30),
            comment("SeattleWA", "[removed]", 40),
        ])))
        .expect(1)
        .mount(&reddit)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/rainy_day/submitted"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(vec![link("Seattle", 35)])))
        .expect(1)
        .mount(&reddit)
        .await;

    let fetcher = RedditContextFetcher::from_config(&config(&reddit, &llm)).unwrap();
    let items = fetcher
        .fetch(&Target::User("rainy_day".into()), 25)
        .await
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].source_type, SourceType::Post);
    assert_eq!(items[1].text, "mountain is out");
}

#[tokio::test]
async fn reddit_outage_is_upstream_unavailable() {
    let reddit = reddit_server().await;
    let llm = completion_server("unused", 0).await;
    Mock::given(method("GET"))
        .and(path("/r/Seattle/new"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream connect error"))
        .mount(&reddit)
        .await;

    let fetcher = RedditContextFetcher::from_config(&config(&reddit, &llm)).unwrap();
    let err = fetcher
        .fetch(&Target::Community("Seattle".into()), 25)
        .await
        .unwrap_err();
    assert!(matches!(err, SimError::UpstreamUnavailable { service, .. } if service == "reddit"));
}
