use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::cli::*;
use crate::fixtures::mount_hotel;

#[tokio::test(flavor = "multi_thread")]
async fn test_one_off_runs_template() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    mount_hotel(&server).await;
    let (_dir, config) = setup_temp_config(&server.uri())?;

    let output = run_one_off(&config, "\\d bookings; \\run all_active", &[]);
    assert!(output.status.success());

    let lines = stdout_lines(&output);
    assert_eq!(lines.len(), 5);
    assert_eq!(
        r#"{"id":3,"clientName":"Ann"}
{"id":9,"clientName":"Cid"}"#,
        lines[3..].join("\n"),
    );

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_one_off_base_url_from_env() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    mount_hotel(&server).await;

    let output = Command::cargo_bin("dbadmin")?
        .arg("--one-off")
        .arg("\\d")
        .env("DBADMIN__BACKEND__BASE_URL", server.uri())
        .output()?;

    assert!(output.status.success());
    assert_eq!(stdout_lines(&output), vec!["bookings", "clients"]);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_one_off_failure_exits_nonzero() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let (_dir, config) = setup_temp_config(&server.uri())?;

    let output = run_one_off(&config, "\\d nope; \\t", &[]);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: Loading table failed"));
    // Stopped at the first failure
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_one_off_drop_requires_yes() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    mount_hotel(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/api/tables/bookings"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, config) = setup_temp_config(&server.uri())?;

    let output = run_one_off(&config, "\\d bookings; \\drop", &[]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Drop cancelled"));

    let output = run_one_off(&config, "\\d bookings; \\drop", &["--yes"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Table bookings dropped"));

    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn test_one_off_export_uses_configured_name() -> Result<(), Box<dyn std::error::Error>> {
    let server = MockServer::start().await;
    mount_hotel(&server).await;
    Mock::given(method("POST"))
        .and(path("/api/database/export-to-excel"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"xlsx".to_vec()))
        .expect(1)
        .mount(&server)
        .await;
    let (dir, config) = setup_temp_config(&server.uri())?;

    let command = format!("\\d bookings; \\export {}", dir.path().display());
    let output = run_one_off(&config, &command, &[]);

    assert!(output.status.success());
    assert_eq!(fs::read(dir.path().join("bookings.xlsx"))?, b"xlsx");

    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let (_dir, config) = setup_temp_config("ftp://files.example.com")?;

    let output = run_one_off(&config, "\\d", &[]);
    assert!(!output.status.success());

    Ok(())
}
