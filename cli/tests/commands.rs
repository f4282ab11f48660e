//! Drive the `bandcamp` subcommands against the mock server.

use std::path::Path;

use bandcamp_cli::cli::Args;
use bandcamp_cli::commands::{self, EXIT_PARTIAL_FAILURE, EXIT_SUCCESS};
use bandcamp_cli::config::AppConfig;
use clap::Parser;
use mock_server::Db;

fn start_server(db: Db) -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run_with_db(listener, db).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

/// Run one command line and return (exit status, stdout).
fn bandcamp(origin: &str, credentials: &Path, argv: &[&str]) -> anyhow::Result<(u8, String)> {
    let credentials = credentials.to_str().unwrap();
    let mut full = vec![
        "bandcamp",
        "--origin",
        origin,
        "--credentials",
        credentials,
        "--retries",
        "0",
    ];
    full.extend_from_slice(argv);
    let args = Args::try_parse_from(full).unwrap();
    let config = AppConfig::from_args(&args);

    let mut out = Vec::new();
    let code = commands::run(config, args.command, &mut out)?;
    Ok((code, String::from_utf8(out).unwrap()))
}

fn login_args() -> Vec<String> {
    vec![
        "login".to_string(),
        "--client-id".to_string(),
        mock_server::CLIENT_ID.to_string(),
        "--client-secret".to_string(),
        mock_server::CLIENT_SECRET.to_string(),
    ]
}

#[test]
fn commands_end_to_end() {
    let db = mock_server::seeded_db();
    let origin = start_server(db.clone());
    let dir = tempfile::tempdir().unwrap();
    let creds = dir.path().join(".bandcamp/credentials.json");

    // Before login every resource command reports the login hint.
    let err = bandcamp(&origin, &creds, &["bands"]).unwrap_err();
    assert_eq!(format!("{err:#}"), "fetching bands: unauthorised, please log in first");

    let login_args = login_args();
    let login: Vec<&str> = login_args.iter().map(String::as_str).collect();
    let (code, out) = bandcamp(&origin, &creds, &login).unwrap();
    assert_eq!(code, EXIT_SUCCESS);
    assert_eq!(out, "Success\n");
    assert!(creds.exists());

    let (_, out) = bandcamp(&origin, &creds, &["bands"]).unwrap();
    assert!(out.contains("nightlabel"));
    assert!(out.contains("Day Band"));

    let (_, out) = bandcamp(
        &origin,
        &creds,
        &["orders", "-b", "100", "-n", "Cassette", "-f", "payment_id"],
    )
    .unwrap();
    let ids: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(ids, serde_json::json!([5, 7]));

    // Dry run from an id file with a duplicate.
    let ids_file = dir.path().join("ids.json");
    std::fs::write(&ids_file, "[5,5,7]").unwrap();
    let (code, out) = bandcamp(
        &origin,
        &creds,
        &["ship", "-f", ids_file.to_str().unwrap(), "--shipped"],
    )
    .unwrap();
    assert_eq!(code, EXIT_SUCCESS);
    assert!(out.contains("TO 2 ids"));
    assert!(out.contains("[5,7]"));
    assert_eq!(db.blocking_read().update_calls, 0);

    // Committed sequential run with one rejected id.
    db.blocking_write().rejected_ids.insert(7);
    let (code, out) = bandcamp(
        &origin,
        &creds,
        &[
            "ship", "5", "7", "9", "--shipped", "--carrier", "DHL", "--commit",
            "--strategy", "sequential", "--interval", "5", "--warmup", "0",
        ],
    )
    .unwrap();
    assert_eq!(code, EXIT_PARTIAL_FAILURE);
    assert!(out.contains("Shipped 2 of 3 ids"));
    assert!(out.contains("7: no such id: 7"));
    assert_eq!(db.blocking_read().update_calls, 3);

    // Batched commit with the report as JSON.
    let (code, out) = bandcamp(
        &origin,
        &creds,
        &["ship", "--shipped", "5", "9", "--commit", "--warmup", "0", "--json"],
    )
    .unwrap();
    assert_eq!(code, EXIT_SUCCESS);
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["strategy"], "batched");
    assert_eq!(report["succeeded"], serde_json::json!([5, 9]));
    assert_eq!(report["failed"], serde_json::json!([]));
    assert_eq!(db.blocking_read().update_calls, 4);
}

#[test]
fn dry_run_report_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let creds = dir.path().join("credentials.json");
    let (code, out) = bandcamp(
        "http://127.0.0.1:9",
        &creds,
        &["ship", "5", "5", "7", "--notify=false", "--json"],
    )
    .unwrap();
    assert_eq!(code, EXIT_SUCCESS);
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["count"], 2);
    assert_eq!(report["ids"], serde_json::json!([5, 7]));
    assert_eq!(report["options"]["id_type"], "p");
    assert_eq!(report["options"]["notification"], false);
}

#[test]
fn partial_failure_status_differs_from_usage_error() {
    let err = Args::try_parse_from(["bandcamp", "ship", "--no-such-flag"]).unwrap_err();
    assert_ne!(err.exit_code(), i32::from(EXIT_PARTIAL_FAILURE));
    assert_ne!(EXIT_PARTIAL_FAILURE, EXIT_SUCCESS);
}

#[test]
fn ship_without_any_id_source_is_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let creds = dir.path().join("credentials.json");
    // No server needed: the error is raised before any network activity.
    let err = bandcamp("http://127.0.0.1:9", &creds, &["ship", "--shipped"]).unwrap_err();
    assert!(format!("{err:#}").starts_with("invalid input: no ids given"));
}

#[test]
fn malformed_id_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let creds = dir.path().join("credentials.json");
    let ids_file = dir.path().join("ids.txt");
    std::fs::write(&ids_file, "5, seven").unwrap();
    let err = bandcamp(
        "http://127.0.0.1:9",
        &creds,
        &["ship", "-f", ids_file.to_str().unwrap()],
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("non-integer"));
}
