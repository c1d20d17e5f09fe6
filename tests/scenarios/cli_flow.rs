use clap::Parser;
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

use super::reddit_harness::{
    completion_server, config, link, listing, mount_listing, only_completion_request,
    reddit_server,
};
use seattle_simulator::cli::{Cli, Outcome, execute, report};
use seattle_simulator::reddit::SubmittedPost;
use seattle_simulator::{Pipeline, SimError};

const GENERATED: &str = "TITLE: Mountain spotted\nBODY: Drizzle";

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("seattle-simulator").chain(args.iter().copied())).unwrap()
}

fn no_prompt(_: &str) -> anyhow::Result<bool> {
    panic!("confirmation should not be requested")
}

#[tokio::test]
async fn default_community_prints_generated_post() {
    let reddit = reddit_server().await;
    let items = (0..10).map(|i| link("Seattle", i)).collect();
    mount_listing(&reddit, "/r/Seattle/new", listing(items)).await;
    let llm = completion_server(GENERATED, 1).await;

    let config = config(&reddit, &llm);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let mut out = Vec::new();
    let outcome = execute(&cli(&[]), &config, &pipeline, &mut out, no_prompt)
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Printed);
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("TITLE: Mountain spotted"));
    assert!(printed.contains("Drizzle"));

    let request = only_completion_request(&llm).await;
    let system = request["messages"][0]["content"].as_str().unwrap();
    let user = request["messages"][1]["content"].as_str().unwrap();
    assert!(system.contains("parodies r/Seattle"));
    assert_eq!(user.lines().filter(|l| l.starts_with("- [post]")).count(), 10);
    assert!(user.contains("Here's recent content from r/Seattle:"));
}

#[tokio::test]
async fn ghost_user_fails_without_generation() {
    let reddit = reddit_server().await;
    mount_listing(&reddit, "/user/ghost_user/comments", listing(vec![])).await;
    mount_listing(&reddit, "/user/ghost_user/submitted", listing(vec![])).await;
    let llm = completion_server(GENERATED, 0).await;

    let config = config(&reddit, &llm);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let mut out = Vec::new();
    let err = execute(&cli(&["u/ghost_user"]), &config, &pipeline, &mut out, no_prompt)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SimError>(),
        Some(SimError::NotFound { target }) if target == "u/ghost_user"
    ));
    assert!(out.is_empty());
}

#[tokio::test]
async fn failed_run_reports_error_on_stderr_with_failure_status() {
    let reddit = reddit_server().await;
    mount_listing(&reddit, "/user/ghost_user/comments", listing(vec![])).await;
    mount_listing(&reddit, "/user/ghost_user/submitted", listing(vec![])).await;
    let llm = completion_server(GENERATED, 0).await;

    let config = config(&reddit, &llm);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let mut out = Vec::new();
    let result = execute(&cli(&["u/ghost_user"]), &config, &pipeline, &mut out, no_prompt).await;
    let mut err = Vec::new();
    let code = report(result, &mut err);

    assert_eq!(format!("{code:?}"), format!("{:?}", std::process::ExitCode::FAILURE));
    let stderr = String::from_utf8(err).unwrap();
    assert!(stderr.starts_with("Error: "));
    assert!(stderr.contains("u/ghost_user not found"));
    assert!(!stderr.contains("test-token"));
    assert!(out.is_empty());
}

#[tokio::test]
async fn post_submits_generated_body_once() {
    let reddit = reddit_server().await;
    mount_listing(&reddit, "/r/Seattle/new", listing(vec![link("Seattle", 1)])).await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_string_contains("sr=circlejerkseattle"))
        .and(body_string_contains("kind=self"))
        .and(body_string_contains("text=Drizzle"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "json": {
                "errors": [],
                "data": {
                    "url": "https://www.reddit.com/r/circlejerkseattle/comments/abc/mountain_spotted/",
                    "name": "t3_abc",
                }
            }
        })))
        .expect(1)
        .mount(&reddit)
        .await;
    let llm = completion_server(GENERATED, 1).await;

    let config = config(&reddit, &llm);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let mut out = Vec::new();
    let outcome = execute(&cli(&["--post", "-y"]), &config, &pipeline, &mut out, no_prompt)
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::Posted(SubmittedPost {
            id: Some("t3_abc".into()),
            url: Some(
                "https://www.reddit.com/r/circlejerkseattle/comments/abc/mountain_spotted/".into()
            ),
        })
    );
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("Posted! https://www.reddit.com/r/circlejerkseattle/"));
}

#[tokio::test]
async fn rejected_post_fails_after_generation() {
    let reddit = reddit_server().await;
    mount_listing(&reddit, "/r/Seattle/new", listing(vec![link("Seattle", 1)])).await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "json": {
                "errors": [["SUBREDDIT_NOTALLOWED", "you aren't allowed to post there.", "sr"]]
            }
        })))
        .expect(1)
        .mount(&reddit)
        .await;
    let llm = completion_server(GENERATED, 1).await;

    let config = config(&reddit, &llm);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let mut out = Vec::new();
    let err = execute(&cli(&["--post", "--yes"]), &config, &pipeline, &mut out, no_prompt)
        .await
        .unwrap_err();

    match err.downcast_ref::<SimError>() {
        Some(SimError::PostFailed { subreddit, reason }) => {
            assert_eq!(subreddit, "circlejerkseattle");
            assert!(reason.contains("SUBREDDIT_NOTALLOWED"));
        }
        other => panic!("expected PostFailed, got {other:?}"),
    }
    // the post was still generated and shown
    assert!(String::from_utf8(out).unwrap().contains("TITLE: Mountain spotted"));
}

#[tokio::test]
async fn declined_confirmation_skips_submit() {
    let reddit = reddit_server().await;
    mount_listing(&reddit, "/r/SeattleWA/new", listing(vec![link("SeattleWA", 1)])).await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&reddit)
        .await;
    let llm = completion_server(GENERATED, 1).await;

    let config = config(&reddit, &llm);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let mut out = Vec::new();
    let mut asked = None;
    let outcome = execute(
        &cli(&["r/SeattleWA", "--post"]),
        &config,
        &pipeline,
        &mut out,
        |question| {
            asked = Some(question.to_string());
            Ok(false)
        },
    )
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Cancelled);
    assert_eq!(asked.as_deref(), Some("Post to r/circlejerkseattle?"));
    assert!(String::from_utf8(out).unwrap().ends_with("Cancelled.\n"));
}

#[tokio::test]
async fn invalid_target_is_rejected_before_any_request() {
    let reddit = reddit_server().await;
    let llm = completion_server(GENERATED, 0).await;

    let config = config(&reddit, &llm);
    let pipeline = Pipeline::from_config(&config).unwrap();
    let mut out = Vec::new();
    let err = execute(&cli(&["not a sub!"]), &config, &pipeline, &mut out, no_prompt)
        .await
        .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<SimError>(),
        Some(SimError::InvalidTarget { .. })
    ));
}
