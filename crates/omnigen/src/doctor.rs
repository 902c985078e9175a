// SPDX-FileCopyrightText: 2026 Omnigen Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `omnigen doctor` command implementation.
//!
//! Runs diagnostic checks against the Omnigen environment to identify
//! configuration issues, missing credentials, unreachable providers, and
//! database problems.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use omnigen_config::model::OmnigenConfig;
use omnigen_core::{HealthReport, HealthState, OmnigenError};
use omnigen_registry::builtin_registry;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    /// Check passed successfully.
    Pass,
    /// Check passed with a warning.
    Warn,
    /// Check failed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Name of the check.
    pub name: String,
    /// Check status.
    pub status: CheckStatus,
    /// Human-readable message.
    pub message: String,
    /// Duration the check took.
    pub duration: Duration,
}

/// Run the `omnigen doctor` command.
///
/// Runs quick diagnostic checks. With `--deep`, runs additional intensive
/// checks. With `--plain`, disables colored output.
pub async fn run_doctor(
    config: &OmnigenConfig,
    config_path: Option<&Path>,
    deep: bool,
    plain: bool,
) -> Result<(), OmnigenError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let mut results = Vec::new();

    // Quick checks (always run)
    results.push(check_config(config_path).await);
    results.push(check_database(&config.store.database_path).await);
    results.push(check_credentials(config));
    results.extend(check_providers(config).await);
    results.push(check_api_endpoint(config).await);

    // Deep checks (only with --deep)
    if deep {
        results.push(check_db_integrity(&config.store.database_path).await);
        results.push(check_queue_backlog(&config.store.database_path).await);
        results.push(check_disk_space(&config.store.database_path).await);
    }

    // Print results
    println!();
    println!("  omnigen doctor");
    println!("  {}", "-".repeat(50));

    let mut fail_count = 0;
    let mut warn_count = 0;

    for result in &results {
        let duration_ms = result.duration.as_millis();
        let line;

        match result.status {
            CheckStatus::Pass => {
                if use_color {
                    use colored::Colorize;
                    let symbol = "✓".green().to_string();
                    line = format!(
                        "    {symbol} {:<20} {} ({duration_ms}ms)",
                        result.name, result.message
                    );
                } else {
                    line = format!(
                        "    [OK]   {:<20} {} ({duration_ms}ms)",
                        result.name, result.message
                    );
                }
            }
            CheckStatus::Warn => {
                warn_count += 1;
                if use_color {
                    use colored::Colorize;
                    let symbol = "!".yellow().to_string();
                    line = format!(
                        "    {symbol} {:<20} {} ({duration_ms}ms)",
                        result.name,
                        result.message.yellow()
                    );
                } else {
                    line = format!(
                        "    [WARN] {:<20} {} ({duration_ms}ms)",
                        result.name, result.message
                    );
                }
            }
            CheckStatus::Fail => {
                fail_count += 1;
                if use_color {
                    use colored::Colorize;
                    let symbol = "✗".red().to_string();
                    line = format!(
                        "    {symbol} {:<20} {} ({duration_ms}ms)",
                        result.name,
                        result.message.red()
                    );
                } else {
                    line = format!(
                        "    [FAIL] {:<20} {} ({duration_ms}ms)",
                        result.name, result.message
                    );
                }
            }
        }

        println!("{line}");
    }

    println!();

    if fail_count > 0 || warn_count > 0 {
        let issues = fail_count + warn_count;
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
        if !deep {
            println!("  Run with --deep for detailed diagnostics.");
        }
    } else {
        println!("  All checks passed.");
    }

    println!();

    Ok(())
}

/// Check configuration loads without errors.
async fn check_config(config_path: Option<&Path>) -> CheckResult {
    let start = Instant::now();
    let loaded = match config_path {
        Some(path) => omnigen_config::load_and_validate_path(path),
        None => omnigen_config::load_and_validate(),
    };
    match loaded {
        Ok(_) => CheckResult {
            name: "Configuration".to_string(),
            status: CheckStatus::Pass,
            message: "valid".to_string(),
            duration: start.elapsed(),
        },
        Err(errors) => CheckResult {
            name: "Configuration".to_string(),
            status: CheckStatus::Fail,
            message: format!("{} error(s)", errors.len()),
            duration: start.elapsed(),
        },
    }
}

/// Check database file exists and can be opened.
async fn check_database(db_path: &str) -> CheckResult {
    let start = Instant::now();
    let path = std::path::Path::new(db_path);

    if !path.exists() {
        return CheckResult {
            name: "Database".to_string(),
            status: CheckStatus::Warn,
            message: format!("not found: {db_path} (will be created on first run)"),
            duration: start.elapsed(),
        };
    }

    match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => {
            let query_result: Result<(), tokio_rusqlite::Error> = conn
                .call(|conn| {
                    conn.execute_batch("SELECT 1")?;
                    Ok(())
                })
                .await;

            match query_result {
                Ok(()) => CheckResult {
                    name: "Database".to_string(),
                    status: CheckStatus::Pass,
                    message: "connected".to_string(),
                    duration: start.elapsed(),
                },
                Err(e) => CheckResult {
                    name: "Database".to_string(),
                    status: CheckStatus::Fail,
                    message: format!("query failed: {e}"),
                    duration: start.elapsed(),
                },
            }
        }
        Err(e) => CheckResult {
            name: "Database".to_string(),
            status: CheckStatus::Fail,
            message: format!("open failed: {e}"),
            duration: start.elapsed(),
        },
    }
}

/// Check how many registered providers have a credential configured.
fn check_credentials(config: &OmnigenConfig) -> CheckResult {
    let start = Instant::now();
    let registry = builtin_registry(config);
    let catalog = registry.catalog(None, false);
    let available = catalog.iter().filter(|entry| entry.available).count();
    let total = catalog.len();

    if available == 0 {
        CheckResult {
            name: "Credentials".to_string(),
            status: CheckStatus::Warn,
            message: "no provider credentials configured".to_string(),
            duration: start.elapsed(),
        }
    } else {
        CheckResult {
            name: "Credentials".to_string(),
            status: CheckStatus::Pass,
            message: format!("{available} of {total} providers ready"),
            duration: start.elapsed(),
        }
    }
}

/// Health-check every registered provider, one result per provider.
///
/// Providers without a credential report as warnings rather than failures;
/// doctor is expected to run on half-configured machines.
async fn check_providers(config: &OmnigenConfig) -> Vec<CheckResult> {
    let registry = builtin_registry(config);
    let reports = registry.health_check_all().await;
    reports
        .into_iter()
        .map(|(name, report)| provider_check(&name, &report))
        .collect()
}

fn provider_check(name: &str, report: &HealthReport) -> CheckResult {
    let duration = Duration::from_millis(report.latency_ms.unwrap_or(0));
    let (status, message) = match report.status {
        HealthState::Healthy => (CheckStatus::Pass, "healthy".to_string()),
        HealthState::NoKey => (CheckStatus::Warn, "no API key configured".to_string()),
        HealthState::Degraded => (
            CheckStatus::Warn,
            report.error.clone().unwrap_or_else(|| "degraded".to_string()),
        ),
        HealthState::Down => (
            CheckStatus::Fail,
            report.error.clone().unwrap_or_else(|| "down".to_string()),
        ),
    };
    CheckResult {
        name: format!("Provider {name}"),
        status,
        message,
        duration,
    }
}

/// Check the local API endpoint (is a server already running?).
async fn check_api_endpoint(config: &OmnigenConfig) -> CheckResult {
    let start = Instant::now();
    let host = &config.server.host;
    let port = config.server.port;
    let url = format!("http://{host}:{port}/health");

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            return CheckResult {
                name: "API endpoint".to_string(),
                status: CheckStatus::Fail,
                message: format!("HTTP client error: {e}"),
                duration: start.elapsed(),
            };
        }
    };

    match client.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => CheckResult {
            name: "API endpoint".to_string(),
            status: CheckStatus::Pass,
            message: "reachable".to_string(),
            duration: start.elapsed(),
        },
        Ok(resp) => CheckResult {
            name: "API endpoint".to_string(),
            status: CheckStatus::Warn,
            message: format!("status {}", resp.status()),
            duration: start.elapsed(),
        },
        Err(_) => CheckResult {
            name: "API endpoint".to_string(),
            status: CheckStatus::Warn,
            message: format!("not reachable at {url} (server may not be running)"),
            duration: start.elapsed(),
        },
    }
}

/// Deep check: SQLite integrity check.
async fn check_db_integrity(db_path: &str) -> CheckResult {
    let start = Instant::now();
    let path = std::path::Path::new(db_path);

    if !path.exists() {
        return CheckResult {
            name: "DB integrity".to_string(),
            status: CheckStatus::Warn,
            message: "database not found (skipped)".to_string(),
            duration: start.elapsed(),
        };
    }

    match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => {
            let result: Result<Vec<String>, tokio_rusqlite::Error> = conn
                .call(|conn| {
                    let mut stmt = conn.prepare("PRAGMA integrity_check")?;
                    let rows: Vec<String> = stmt
                        .query_map([], |row| row.get(0))?
                        .filter_map(|r| r.ok())
                        .collect();
                    Ok(rows)
                })
                .await;

            match result {
                Ok(rows) if rows.len() == 1 && rows[0] == "ok" => CheckResult {
                    name: "DB integrity".to_string(),
                    status: CheckStatus::Pass,
                    message: "ok".to_string(),
                    duration: start.elapsed(),
                },
                Ok(rows) => CheckResult {
                    name: "DB integrity".to_string(),
                    status: CheckStatus::Fail,
                    message: format!("{} issue(s) found", rows.len()),
                    duration: start.elapsed(),
                },
                Err(e) => CheckResult {
                    name: "DB integrity".to_string(),
                    status: CheckStatus::Fail,
                    message: format!("check failed: {e}"),
                    duration: start.elapsed(),
                },
            }
        }
        Err(e) => CheckResult {
            name: "DB integrity".to_string(),
            status: CheckStatus::Fail,
            message: format!("open failed: {e}"),
            duration: start.elapsed(),
        },
    }
}

/// Deep check: live entries in the poll queue.
async fn check_queue_backlog(db_path: &str) -> CheckResult {
    let start = Instant::now();
    let path = std::path::Path::new(db_path);

    if !path.exists() {
        return CheckResult {
            name: "Poll queue".to_string(),
            status: CheckStatus::Warn,
            message: "database not found (skipped)".to_string(),
            duration: start.elapsed(),
        };
    }

    match tokio_rusqlite::Connection::open(db_path).await {
        Ok(conn) => {
            let result: Result<i64, tokio_rusqlite::Error> = conn
                .call(|conn| {
                    let count = conn.query_row(
                        "SELECT COUNT(*) FROM poll_queue \
                         WHERE status IN ('pending', 'claimed')",
                        [],
                        |row| row.get(0),
                    )?;
                    Ok(count)
                })
                .await;

            match result {
                Ok(count) => CheckResult {
                    name: "Poll queue".to_string(),
                    status: CheckStatus::Pass,
                    message: format!("{count} live entr{}", if count == 1 { "y" } else { "ies" }),
                    duration: start.elapsed(),
                },
                Err(e) if e.to_string().contains("no such table") => CheckResult {
                    name: "Poll queue".to_string(),
                    status: CheckStatus::Warn,
                    message: "schema not initialized (run serve once)".to_string(),
                    duration: start.elapsed(),
                },
                Err(e) => CheckResult {
                    name: "Poll queue".to_string(),
                    status: CheckStatus::Fail,
                    message: format!("query failed: {e}"),
                    duration: start.elapsed(),
                },
            }
        }
        Err(e) => CheckResult {
            name: "Poll queue".to_string(),
            status: CheckStatus::Fail,
            message: format!("open failed: {e}"),
            duration: start.elapsed(),
        },
    }
}

/// Deep check: database size as a disk-usage heuristic.
async fn check_disk_space(db_path: &str) -> CheckResult {
    let start = Instant::now();
    let path = std::path::Path::new(db_path);
    let check_path = if path.exists() {
        path.to_path_buf()
    } else {
        path.parent()
            .unwrap_or(std::path::Path::new("."))
            .to_path_buf()
    };

    match std::fs::metadata(&check_path) {
        Ok(_) => {
            if path.exists() {
                let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
                let size_mb = size as f64 / (1024.0 * 1024.0);
                CheckResult {
                    name: "Disk space".to_string(),
                    status: CheckStatus::Pass,
                    message: format!("DB size: {size_mb:.1} MB"),
                    duration: start.elapsed(),
                }
            } else {
                CheckResult {
                    name: "Disk space".to_string(),
                    status: CheckStatus::Pass,
                    message: "directory accessible".to_string(),
                    duration: start.elapsed(),
                }
            }
        }
        Err(e) => CheckResult {
            name: "Disk space".to_string(),
            status: CheckStatus::Warn,
            message: format!("cannot access: {e}"),
            duration: start.elapsed(),
        },
    }
}
