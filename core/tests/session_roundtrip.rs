use std::time::Duration;
use std::time::Instant;

use chrono::Utc;
use husk_core::HuskConfig;
use husk_core::RemotePath;
use husk_core::Session;
use husk_core::SessionError;
use husk_core::SessionManager;
use husk_core::SessionRegistry;
use husk_protocol::SessionInfo;
use husk_protocol::ShellKind;
use tempfile::tempdir;
use uuid::Uuid;
use wiremock::Mock;
use wiremock::MockServer;
use wiremock::ResponseTemplate;
use wiremock::matchers::body_string;
use wiremock::matchers::body_string_contains;
use wiremock::matchers::method;
use wiremock::matchers::path;

fn profile(url: String) -> SessionInfo {
    SessionInfo {
        session_id: Uuid::new_v4(),
        name: "it-shell".to_string(),
        kind: ShellKind::Php,
        url,
        secret: "s3cret".to_string(),
        secret_param: String::new(),
        command_param: String::new(),
        marker: None,
        note: None,
        created_at: Utc::now(),
    }
}

fn config() -> HuskConfig {
    HuskConfig::new(std::env::temp_dir()).with_request_timeout(Duration::from_secs(2))
}

fn bind(info: SessionInfo, config: &HuskConfig) -> Session {
    Session::bind(info, &reqwest::Client::new(), config)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn execute_command_posts_secret_and_merged_command() {
    let server = MockServer::start().await;
    // `id` gains a `2>&1` merge and rides the flavor-default form fields.
    Mock::given(method("POST"))
        .and(path("/shell.php"))
        .and(body_string("pass=s3cret&cmd=id+2%3E%261"))
        .respond_with(ResponseTemplate::new(200).set_body_string("uid=33(www-data)\n"))
        .expect(1)
        .mount(&server)
        .await;

    let session = bind(profile(format!("{}/shell.php", server.uri())), &config());
    let output = session.execute_command("id").await.expect("exec");
    assert_eq!(output, "uid=33(www-data)\n");
    server.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn commands_that_already_redirect_stderr_are_left_alone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string("pass=s3cret&cmd=id+2%3E%2Fdev%2Fnull"))
        .respond_with(ResponseTemplate::new(200).set_body_string("uid=0(root)\n"))
        .expect(1)
        .mount(&server)
        .await;

    let session = bind(profile(server.uri()), &config());
    session.execute_command("id 2>/dev/null").await.expect("exec");
    server.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn hanging_shell_fails_with_network_error_within_the_bound() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    let cfg = config().with_request_timeout(Duration::from_millis(250));
    let session = bind(profile(server.uri()), &cfg);

    let started = Instant::now();
    let err = session.execute_command("id").await.expect_err("must time out");
    assert!(matches!(err, SessionError::Network { .. }));
    assert!(err.is_retryable());
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "timeout must trip well before the remote answers"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unreachable_host_is_a_network_error() {
    // Grab a port nothing listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("listener");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let session = bind(profile(format!("http://{addr}/shell.php")), &config());
    let err = session.test_usability().await.expect_err("must fail");
    assert!(matches!(err, SessionError::Network { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn probe_is_false_when_the_shell_does_not_echo() {
    let server = MockServer::start().await;
    // Reachable endpoint, but nothing executes: empty body comes back.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let session = bind(profile(server.uri()), &config());
    assert!(!session.test_usability().await.expect("probe completes"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn probe_is_false_on_a_server_error_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let session = bind(profile(server.uri()), &config());
    // The endpoint answered, so this is "not usable", not a failure.
    assert!(!session.test_usability().await.expect("probe completes"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn auth_challenge_page_fails_listing_with_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Please sign in</title></head><body>login</body></html>",
        ))
        .mount(&server)
        .await;

    let session = bind(profile(server.uri()), &config());
    let err = session
        .list_directory(&RemotePath::parse("/var/www"))
        .await
        .expect_err("challenge page must not parse");
    assert!(matches!(err, SessionError::Unexpected { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn marker_envelope_strips_page_garbage_around_output() {
    let server = MockServer::start().await;
    let body = "<!-- banner -->::HUSK::total 0\n-rw-r--r-- 1 u g 9 Aug  6 12:00 a.txt\n::HUSK::<!-- trailer -->";
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let mut info = profile(server.uri());
    info.marker = Some("::HUSK::".to_string());
    let session = bind(info, &config());

    let entries = session
        .list_directory(&RemotePath::parse("/srv"))
        .await
        .expect("listing inside the envelope parses");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].name, "a.txt");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn working_directory_falls_back_to_cd_on_windows_shells() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("cmd=pwd"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("'pwd' is not recognized as an internal or external command\r\n"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("cmd=cd"))
        .respond_with(ResponseTemplate::new(200).set_body_string("C:\\inetpub\\wwwroot\r\n"))
        .expect(1)
        .mount(&server)
        .await;

    let session = bind(profile(server.uri()), &config());
    let cwd = session.working_directory().await.expect("cwd");
    assert_eq!(cwd.to_string(), "C:\\inetpub\\wwwroot");

    // Navigation derives values in the same style from here on.
    assert_eq!(cwd.resolve("..").to_string(), "C:\\inetpub");
    server.verify().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn working_directory_parses_posix_pwd() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("cmd=pwd"))
        .respond_with(ResponseTemplate::new(200).set_body_string("/var/www/html\n"))
        .mount(&server)
        .await;

    let session = bind(profile(server.uri()), &config());
    let cwd = session.working_directory().await.expect("cwd");
    assert_eq!(cwd.to_string(), "/var/www/html");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn manager_reuses_bindings_until_the_profile_changes() {
    let dir = tempdir().expect("tempdir");
    let registry = SessionRegistry::in_memory();
    let manager =
        SessionManager::new(HuskConfig::new(dir.path().to_path_buf()), registry).expect("manager");

    let info = profile("http://10.0.0.5/a.php".to_string());
    let id = info.session_id;
    manager.upsert(info.clone()).expect("upsert");

    let first = manager.open_session(id).expect("bound");
    let second = manager.open_session(id).expect("bound");
    assert!(std::sync::Arc::ptr_eq(&first, &second));

    // Replacing the profile drops the old binding.
    let mut updated = info;
    updated.url = "http://10.0.0.5/b.php".to_string();
    manager.upsert(updated).expect("upsert");
    let third = manager.open_session(id).expect("rebound");
    assert!(!std::sync::Arc::ptr_eq(&first, &third));
    assert_eq!(third.info().url, "http://10.0.0.5/b.php");

    assert!(manager.delete(id).expect("delete"));
    assert!(manager.open_session(id).is_none());
    assert!(manager.open_session_raw("definitely-not-a-uuid").is_none());
}
