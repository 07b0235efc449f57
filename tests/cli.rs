mod common;

use assert_cmd::Command;
use common::quantity_sales;
use common::revenue_sales;
use common::TestWorkspace;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;

fn rusty_cfo(workspace: &TestWorkspace) -> Command {
    let mut command = Command::cargo_bin("rusty-cfo").expect("binary exists");
    command
        .current_dir(workspace.path())
        .env_remove("OPENAI_API_KEY")
        .env_remove("RUSTY_CFO_MODEL")
        .env_remove("RUSTY_CFO_TEMPERATURE")
        .env_remove("RUSTY_CFO_BASE_URL")
        .env_remove("RUSTY_CFO_TIMEOUT_SECS");
    command
}

#[test]
fn summary_prints_preview_and_metrics() {
    let workspace = TestWorkspace::new();
    let enero = workspace.write("enero.xlsx", &quantity_sales());
    let febrero = workspace.write("febrero.xlsx", &revenue_sales());

    rusty_cfo(&workspace)
        .args(["summary", "-f", enero.to_str().unwrap(), febrero.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Data preview (5 row(s), 3 column(s))"))
        .stdout(contains("Columns: REVENUE=INGRESO, QUANTITY=CANTIDAD, PRODUCT=PRODUCTO"))
        .stdout(contains("Total Revenue  3250"))
        .stdout(contains("Top 5 products by quantity"));
}

#[test]
fn summary_reports_skipped_files() {
    let workspace = TestWorkspace::new();
    let enero = workspace.write("enero.xlsx", &quantity_sales());
    let notes = workspace.write("notas.txt", b"hola");

    rusty_cfo(&workspace)
        .args(["summary", "--preview-rows", "1", "-f", enero.to_str().unwrap(), notes.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("Skipped files"))
        .stdout(contains("Unsupported file format 'notas.txt'"))
        .stdout(contains("... 2 more row(s)"));
}

#[test]
fn summary_requires_files() {
    let workspace = TestWorkspace::new();
    rusty_cfo(&workspace).arg("summary").assert().failure();
}

#[test]
fn ask_without_api_key_fails_before_reading_files() {
    let workspace = TestWorkspace::new();
    rusty_cfo(&workspace)
        .args(["ask", "-f", "missing.xlsx", "-q", "¿cómo vamos?"])
        .assert()
        .failure()
        .stderr(contains("error: Loading configuration: Missing API key"))
        .stderr(contains("missing.xlsx").not());
}

#[test]
fn ask_shows_the_finding_when_the_service_is_unreachable() {
    let workspace = TestWorkspace::new();
    let enero = workspace.write("enero.xlsx", &quantity_sales());

    rusty_cfo(&workspace)
        .env("OPENAI_API_KEY", "sk-test")
        .env("RUSTY_CFO_BASE_URL", "http://127.0.0.1:9")
        .env("RUSTY_CFO_TIMEOUT_SECS", "2")
        .args(["ask", "-f", enero.to_str().unwrap()])
        .write_stdin("¿Cuál es el producto más vendido?\n")
        .assert()
        .success()
        .stdout(contains("Q: ¿Cuál es el producto más vendido?"))
        .stdout(contains("El producto más vendido es Bandas con 25 unidades."))
        .stderr(contains("error: Completion request failed"));
}
