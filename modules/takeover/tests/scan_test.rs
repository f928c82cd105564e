use std::time::Duration;
use subrecon_core::Host;
use takeover::{scan, scan_with, FetchError, Fingerprint, ScanOptions};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

const S3_PAGE: &str = "<?xml version=\"1.0\"?><Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist</Message></Error>";
const PAGES_PAGE: &str = "<html><body><h1>404</h1><p><strong>There isn't a GitHub Pages site here.</strong></p></body></html>";
const README_PAGE: &str = "<html><body>Project doesnt exist... yet!</body></html>";
const CLEAN_PAGE: &str = "<html><head><title>Welcome</title></head><body>ok</body></html>";

async fn serve(status: u16, body: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn host(uri: &str) -> Host {
    Host::parse(uri).unwrap()
}

fn quick_opts() -> ScanOptions {
    let mut opts = ScanOptions::default();
    opts.fetch.timeout_ms = 1_000;
    opts.fetch.connect_timeout_ms = 1_000;
    opts
}

#[tokio::test]
async fn bucket_pages_and_clean_host() {
    let bucket = serve(404, S3_PAGE).await;
    let abandoned = serve(404, PAGES_PAGE).await;
    let clean = serve(200, CLEAN_PAGE).await;

    let hosts = vec![host(&bucket.uri()), host(&abandoned.uri()), host(&clean.uri())];
    let report = scan(hosts.clone(), Fingerprint::builtin(), &quick_opts()).await.unwrap();

    assert_eq!(report.findings.len(), 2);
    assert_eq!(report.findings[0].service, "AWS");
    assert_eq!(report.findings[0].host, hosts[0]);
    assert_eq!(report.findings[0].status, Some(404));
    assert_eq!(report.findings[1].service, "GitHub Pages");
    assert_eq!(report.findings[1].host, hosts[1]);

    assert_eq!(report.hosts.len(), 3);
    assert_eq!(report.failure_count(), 0);
    assert_eq!(report.hosts[2].status, Some(200));
    assert_eq!(report.hosts[2].findings, 0);
}

#[tokio::test]
async fn two_hosts_same_service_are_both_reported() {
    let first = serve(404, S3_PAGE).await;
    let second = serve(404, S3_PAGE).await;
    let readme = serve(404, README_PAGE).await;

    let hosts = vec![host(&first.uri()), host(&readme.uri()), host(&second.uri())];
    let report = scan(hosts.clone(), Fingerprint::builtin(), &quick_opts()).await.unwrap();

    let aws: Vec<&Host> = report.findings.iter().filter(|f| f.service == "AWS").map(|f| &f.host).collect();
    assert_eq!(aws, vec![&hosts[0], &hosts[2]]);
    assert_eq!(report.findings.len(), 3);
    assert_eq!(report.findings[2].service, "Readme.io");
    assert_eq!(report.findings[2].host, hosts[1]);
}

#[tokio::test]
async fn each_finding_carries_its_own_host() {
    let mut servers = Vec::new();
    for i in 0..12 {
        let body = if i % 3 == 0 { PAGES_PAGE } else { CLEAN_PAGE };
        servers.push(serve(200, body).await);
    }
    let hosts: Vec<Host> = servers.iter().map(|s| host(&s.uri())).collect();
    let mut opts = quick_opts();
    opts.concurrency = 3;
    let report = scan(hosts.clone(), Fingerprint::builtin(), &opts).await.unwrap();

    let got: Vec<&Host> = report.findings.iter().map(|f| &f.host).collect();
    let want: Vec<&Host> = hosts.iter().step_by(3).collect();
    assert_eq!(got, want);
    assert_eq!(report.hosts.len(), hosts.len());
}

#[tokio::test]
async fn slow_host_times_out_without_blocking_others() {
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(S3_PAGE).set_delay(Duration::from_secs(5)))
        .mount(&slow)
        .await;
    let fast = serve(404, PAGES_PAGE).await;

    let hosts = vec![host(&slow.uri()), host(&fast.uri())];
    let mut opts = quick_opts();
    opts.fetch.timeout_ms = 300;
    let report = scan(hosts.clone(), Fingerprint::builtin(), &opts).await.unwrap();

    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].service, "GitHub Pages");
    assert_eq!(report.findings[0].host, hosts[1]);
    assert_eq!(report.hosts[0].error, Some(FetchError::Timeout));
    assert!(report.hosts[1].error.is_none());
}

#[tokio::test]
async fn failures_are_counted_not_dropped() {
    let ok = serve(404, S3_PAGE).await;
    let hosts = vec![
        host("http://127.0.0.1:1"),
        host(&ok.uri()),
        host("http://"),
    ];
    let report = scan(hosts.clone(), Fingerprint::builtin(), &quick_opts()).await.unwrap();

    assert_eq!(report.hosts.len(), 3);
    assert_eq!(report.failure_count(), 2);
    assert!(report.hosts[0].error.is_some());
    assert!(report.hosts[2].error.is_some());
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].host, hosts[1]);
}

#[tokio::test]
async fn deadline_marks_pending_hosts() {
    let slow = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(S3_PAGE).set_delay(Duration::from_secs(5)))
        .mount(&slow)
        .await;
    let fast = serve(404, S3_PAGE).await;

    let hosts = vec![host(&fast.uri()), host(&slow.uri())];
    let mut opts = quick_opts();
    opts.fetch.timeout_ms = 10_000;
    opts.deadline = Some(Duration::from_millis(800));
    let report = scan(hosts.clone(), Fingerprint::builtin(), &opts).await.unwrap();

    assert_eq!(report.hosts.len(), 2);
    assert_eq!(report.hosts[1].error, Some(FetchError::Deadline));
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].host, hosts[0]);
}

#[tokio::test]
async fn full_url_with_path_is_fetched_as_given() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bucket"))
        .respond_with(ResponseTemplate::new(404).set_body_string(S3_PAGE))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(CLEAN_PAGE))
        .mount(&server)
        .await;

    let hosts = vec![host(&format!("{}/bucket", server.uri())), host(&server.uri())];
    let report = scan(hosts.clone(), Fingerprint::builtin(), &quick_opts()).await.unwrap();
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].host, hosts[0]);
}

#[tokio::test]
async fn custom_fingerprint_with_status() {
    let heroku = serve(404, "<title>No such app</title>").await;
    let decoy = serve(200, "<p>No such app</p>").await;

    let mut fps = Fingerprint::builtin();
    fps.push(Fingerprint::new("Heroku", "No such app").with_status(404));
    let hosts = vec![host(&heroku.uri()), host(&decoy.uri())];
    let report = scan(hosts.clone(), fps, &quick_opts()).await.unwrap();

    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].service, "Heroku");
    assert_eq!(report.findings[0].host, hosts[0]);
}

#[tokio::test]
async fn callback_sees_each_finding_once() {
    let a = serve(404, S3_PAGE).await;
    let b = serve(404, README_PAGE).await;
    let hosts = vec![host(&a.uri()), host(&b.uri())];

    let mut seen = Vec::new();
    let report = scan_with(hosts, Fingerprint::builtin(), &quick_opts(), |f| seen.push(f.service.clone()))
        .await
        .unwrap();
    seen.sort();
    assert_eq!(seen, vec!["AWS".to_string(), "Readme.io".to_string()]);
    assert_eq!(report.findings.len(), 2);
}

#[tokio::test]
async fn bare_host_is_fetched_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(404).set_body_string(S3_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let bare = server.uri().trim_start_matches("http://").to_string();
    assert!(!bare.contains("://"));
    let h = host(&bare);
    assert_eq!(h.as_str(), server.uri());

    let report = scan(vec![h.clone()], Fingerprint::builtin(), &quick_opts()).await.unwrap();
    assert_eq!(report.failure_count(), 0);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].host, h);
    assert_eq!(server.received_requests().await.map(|r| r.len()), Some(1));
}
