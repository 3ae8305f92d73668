use mockito::{Matcher, Server, ServerGuard};
use std::{collections::HashMap, io::Write};
use sweeper::{
    batch::BatchDeleter,
    config::{BatchConfig, SweepConfig},
    sweeper::Sweeper,
    twitter_api::TwitterApi,
};

fn env_for(server: &ServerGuard, extra: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
    let mut vars: HashMap<String, String> = [
        ("TWITTER_CONSUMER_KEY", "consumer"),
        ("TWITTER_CONSUMER_SECRET", "consumer-secret"),
        ("TWITTER_ACCESS_TOKEN", "token"),
        ("TWITTER_ACCESS_TOKEN_SECRET", "token-secret"),
    ]
    .iter()
    .chain(extra)
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    vars.insert("TWITTER_API_BASE_URL".to_string(), server.url());
    move |name| vars.get(name).cloned()
}

#[tokio::test]
async fn sweeps_old_posts_and_follows_the_cursor() {
    let mut server = Server::new_async().await;
    let lookup = env_for(
        &server,
        &[
            ("MAX_TWEET_AGE", "720h"),
            ("WHITELIST", "60"),
            ("SWEEP_PAGE_DELAY_SECS", "0"),
        ],
    );
    let config = SweepConfig::from_lookup(&lookup).unwrap();
    let api = TwitterApi::from_config(&config.api).unwrap();

    let recent = chrono::Utc::now() - chrono::TimeDelta::hours(2);
    let first_page = format!(
        r#"[
            {{"id": 90, "created_at": "{}", "text": "fresh"}},
            {{"id": 80, "created_at": "Mon Jan 05 10:00:00 +0000 2015", "text": "old"}},
            {{"id": 60, "created_at": "Sun Jan 04 10:00:00 +0000 2015", "text": "keep me"}},
            {{"id": 77, "created_at": "Wed Jan 01 10:00:00 +0000 2014", "text": "oldest"}}
        ]"#,
        sweeper::models::posts::format_created_at(recent)
    );

    let first = server
        .mock("GET", "/statuses/user_timeline.json")
        .match_query(Matcher::Regex("^count=200&include_rts=true$".into()))
        .with_status(200)
        .with_body(first_page)
        .expect(1)
        .create_async()
        .await;
    let second = server
        .mock("GET", "/statuses/user_timeline.json")
        .match_query(Matcher::UrlEncoded("max_id".into(), "77".into()))
        .with_status(200)
        .with_body(r#"[{"id": 77, "created_at": "Wed Jan 01 10:00:00 +0000 2014", "text": "oldest"}]"#)
        .expect(1)
        .create_async()
        .await;
    let delete_80 = server
        .mock("POST", "/statuses/destroy/80.json")
        .match_query(Matcher::UrlEncoded("trim_user".into(), "true".into()))
        .with_status(200)
        .with_body(r#"{"id": 80, "created_at": "Mon Jan 05 10:00:00 +0000 2015", "text": "old"}"#)
        .expect(1)
        .create_async()
        .await;
    let delete_77 = server
        .mock("POST", "/statuses/destroy/77.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id": 77, "created_at": "Wed Jan 01 10:00:00 +0000 2014", "text": "oldest"}"#)
        .expect(1)
        .create_async()
        .await;
    let delete_allowlisted = server
        .mock("POST", "/statuses/destroy/60.json")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let summary = Sweeper::new(api, config).run().await.unwrap();

    assert_eq!(summary.fetches, 2);
    assert_eq!(summary.pages, 1);
    assert_eq!(summary.deleted, 2);
    assert_eq!(summary.kept, 2);

    first.assert_async().await;
    second.assert_async().await;
    delete_80.assert_async().await;
    delete_77.assert_async().await;
    delete_allowlisted.assert_async().await;
}

#[tokio::test]
async fn batch_deletes_everything_in_the_export() {
    let mut server = Server::new_async().await;
    let mut export = tempfile::NamedTempFile::new().unwrap();
    write!(export, r#"{{"tweets": ["5", "five", "6"]}}"#).unwrap();
    let export_path = export.path().to_string_lossy().to_string();

    let lookup = env_for(&server, &[("EXPORT_PATH", export_path.as_str()), ("BATCH_PAUSE_SECS", "0")]);
    let config = BatchConfig::from_lookup(&lookup).unwrap();
    let api = TwitterApi::from_config(&config.api).unwrap();

    let delete_5 = server
        .mock("POST", "/statuses/destroy/5.json")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"id": 5, "created_at": "Wed Jan 01 10:00:00 +0000 2014", "text": ""}"#)
        .expect(1)
        .create_async()
        .await;
    let delete_6 = server
        .mock("POST", "/statuses/destroy/6.json")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"errors":[{"code":144,"message":"No status found with that ID."}]}"#)
        .expect(1)
        .create_async()
        .await;

    let summary = BatchDeleter::new(api, config).run().await.unwrap();

    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.deleted, 1);
    assert_eq!(summary.unparsable, 1);
    assert_eq!(summary.delete_failures, 1);

    delete_5.assert_async().await;
    delete_6.assert_async().await;
}
