//! Integration tests for the `covcast` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// 30 days of department 59 data with a weekly pattern plus an all-ages filter row.
fn regional_csv() -> String {
    let mut csv = String::from("dep;jour;P;T;cl_age90;pop\n");
    for i in 0..30u32 {
        let value = 100 + (i % 7) * 10 + i;
        csv.push_str(&format!("59;2022-01-{:02};{value};1000;0;2600000\n", i + 1));
        csv.push_str(&format!("59;2022-01-{:02};3;50;9;300000\n", i + 1));
    }
    csv
}

fn covcast(temp: &TempDir, data_url: &str) -> Command {
    let mut cmd = Command::cargo_bin("covcast").unwrap();
    cmd.current_dir(temp.path())
        .env("MODEL_DIR", temp.path())
        .env("COV_REG_DATA_URL", data_url)
        .env_remove("COV_NAT_DATA_URL")
        .env_remove("LIBRARY_SIZE")
        .env_remove("MAX_DAYS_AHEAD")
        .env_remove("MAX_DAYS_BEHIND")
        .args(["--log-level", "error"]);
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("covcast").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("predict"))
        .stdout(predicate::str::contains("library"));
}

#[test]
fn test_library_empty_store() {
    let temp = TempDir::new().unwrap();
    covcast(&temp, "http://127.0.0.1:9/unused.csv")
        .arg("library")
        .assert()
        .success()
        .stdout(predicate::str::contains("No models found"));
}

#[test]
fn test_train_unknown_region_fails() {
    let temp = TempDir::new().unwrap();
    covcast(&temp, "http://127.0.0.1:9/unused.csv")
        .args(["train", "75"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Region 75 is not available"));
}

#[test]
fn test_predict_untrained_region_fails() {
    let temp = TempDir::new().unwrap();
    covcast(&temp, "http://127.0.0.1:9/unused.csv")
        .args(["predict", "--region", "62", "--start", "2022-01-05", "--end", "2022-01-08"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No trained model available for region 62"));
}

#[test]
fn test_predict_rejects_reversed_dates() {
    let temp = TempDir::new().unwrap();
    covcast(&temp, "http://127.0.0.1:9/unused.csv")
        .args(["predict", "--region", "59", "--start", "2022-01-08", "--end", "2022-01-05"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("End date is before start date"));
}

#[test]
fn test_train_then_predict_and_list() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/reg.csv")
        .with_status(200)
        .with_body(regional_csv())
        .create();
    let url = format!("{}/reg.csv", server.url());
    let temp = TempDir::new().unwrap();

    covcast(&temp, &url)
        .args(["train", "59"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SARIMAX_59"))
        .stdout(predicate::str::contains("2022-01-30"));

    assert!(temp.path().join("models").join("SARIMAX_59.json").is_file());

    covcast(&temp, &url)
        .args(["library", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"key\": \"SARIMAX_59\""))
        .stdout(predicate::str::contains("\"last_true_date\": \"2022-01-30\""));

    let output = covcast(&temp, &url)
        .args(["predict", "--region", "59", "--start", "2022-01-28", "--end", "2022-02-02", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let points: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(points.len(), 6);
    assert_eq!(points[0]["date"], "2022-01-28");
    assert_eq!(points[2]["date"], "2022-01-30");
    assert_eq!(points[2]["predicted"], false);
    assert_eq!(points[3]["date"], "2022-01-31");
    assert_eq!(points[3]["predicted"], true);
    // 2022-01-28 is day index 27: 100 + 6 * 10 + 27.
    assert_eq!(points[0]["cases"], 187);
}
