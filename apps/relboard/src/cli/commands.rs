//! # CLI Command Implementations
//!
//! Each command opens the configured store, runs one service call and
//! prints either a human-readable table or JSON (`--json-mode`).

use super::CliError;
use crate::api::{self, Service};
use crate::config::{Backend, Config};
use mockable::DefaultClock;
use relboard_core::{
    Dashboard, Hashrelease, ProjectId, Release, ReleaseService, ReleaseStep, StepStatus,
};
use serde::Serialize;
use std::sync::Arc;

// =============================================================================
// SERVICE SETUP
// =============================================================================

/// Open the configured store and seed it when configured to.
///
/// A memory store is always seeded, since it starts empty on every run.
pub fn open_service(config: &Config) -> Result<Service, CliError> {
    let store = config.storage.open_store()?;
    let service = ReleaseService::new(
        store,
        Arc::new(DefaultClock),
        config.storage.max_write_retries,
    );

    if config.seed_on_start || config.storage.backend == Backend::Memory {
        let report = service.ensure_seeded()?;
        if report.releases > 0 || report.hashreleases > 0 {
            tracing::info!(
                releases = report.releases,
                hashreleases = report.hashreleases,
                "seeded empty store"
            );
        }
    }

    Ok(service)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// =============================================================================
// SERVE COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_serve(config: &Config) -> Result<(), CliError> {
    let service = open_service(config)?;

    println!("relboard server starting...");
    println!();
    println!("Configuration:");
    println!("  Address:  {}", config.server.bind_addr());
    println!("  Backend:  {}", config.storage.backend);
    if config.storage.backend == Backend::Redb {
        println!("  Database: {}", config.storage.path.display());
    }
    println!();
    println!("Endpoints:");
    println!("  GET   /api/dashboard                  - Recent activity per project");
    println!("  GET   /api/releases[?projectId=]      - List releases");
    println!("  GET   /api/releases/{{id}}              - Show a release");
    println!("  PATCH /api/releases/{{id}}/step         - Set a step status");
    println!("  POST  /api/releases/{{id}}/step/advance - Cycle a step");
    println!("  GET   /api/hashreleases[?projectId=]  - List hashreleases");
    println!("  GET   /api/hashreleases/{{id}}          - Show a hashrelease");
    println!("  GET   /health                         - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    api::run_server(service, &config.server).await?;
    Ok(())
}

// =============================================================================
// SEED COMMAND
// =============================================================================

/// Seed the store regardless of `seed_on_start`.
pub fn cmd_seed(config: &Config, json_mode: bool) -> Result<(), CliError> {
    let store = config.storage.open_store()?;
    let service = ReleaseService::new(
        store,
        Arc::new(DefaultClock),
        config.storage.max_write_retries,
    );
    let report = service.ensure_seeded()?;

    if json_mode {
        return print_json(&report);
    }

    if report.releases == 0 && report.hashreleases == 0 {
        println!("Store already seeded; nothing written.");
    } else {
        println!(
            "Seeded {} releases and {} hashreleases.",
            report.releases, report.hashreleases
        );
    }
    Ok(())
}

// =============================================================================
// RELEASE COMMANDS
// =============================================================================

/// List releases.
pub fn cmd_releases(
    config: &Config,
    json_mode: bool,
    project: Option<ProjectId>,
) -> Result<(), CliError> {
    let releases = open_service(config)?.list_releases(project)?;

    if json_mode {
        return print_json(&releases);
    }

    if releases.is_empty() {
        println!("No releases.");
        return Ok(());
    }
    print_release_table(&releases);
    Ok(())
}

/// Show one release.
pub fn cmd_release(config: &Config, json_mode: bool, id: &str) -> Result<(), CliError> {
    let release = open_service(config)?.get_release(id)?;
    if json_mode {
        return print_json(&release);
    }
    print_release(&release);
    Ok(())
}

/// Set a step status.
pub fn cmd_step(
    config: &Config,
    json_mode: bool,
    id: &str,
    step: &str,
    status: StepStatus,
) -> Result<(), CliError> {
    let release = open_service(config)?.update_step(id, step, status)?;
    if json_mode {
        return print_json(&release);
    }
    println!("{} / {} -> {}", release.id, step, status);
    println!();
    print_release(&release);
    Ok(())
}

/// Cycle a step to its next status.
pub fn cmd_advance(config: &Config, json_mode: bool, id: &str, step: &str) -> Result<(), CliError> {
    let release = open_service(config)?.advance_step(id, step)?;
    if json_mode {
        return print_json(&release);
    }
    if let Some(updated) = release.step(step) {
        println!("{} / {} -> {}", release.id, step, updated.status);
        println!();
    }
    print_release(&release);
    Ok(())
}

// =============================================================================
// HASHRELEASE COMMANDS
// =============================================================================

/// List hashreleases.
pub fn cmd_hashreleases(
    config: &Config,
    json_mode: bool,
    project: Option<ProjectId>,
) -> Result<(), CliError> {
    let hashreleases = open_service(config)?.list_hashreleases(project)?;

    if json_mode {
        return print_json(&hashreleases);
    }

    if hashreleases.is_empty() {
        println!("No hashreleases.");
        return Ok(());
    }
    print_hashrelease_table(&hashreleases);
    Ok(())
}

/// Show one hashrelease.
pub fn cmd_hashrelease(config: &Config, json_mode: bool, id: &str) -> Result<(), CliError> {
    let hashrelease = open_service(config)?.get_hashrelease(id)?;
    if json_mode {
        return print_json(&hashrelease);
    }

    println!("Hashrelease {}", hashrelease.id);
    println!("==================");
    println!("Project:  {}", hashrelease.project_id);
    println!("Branch:   {}", hashrelease.branch);
    println!("Version:  {}", hashrelease.version);
    println!(
        "Created:  {}",
        hashrelease.created_at.format("%Y-%m-%d %H:%M")
    );
    println!("Build:    {}", pass_fail(hashrelease.build_success));
    println!("Tests:    {}", pass_fail(hashrelease.test_success));
    println!(
        "Ready:    {}",
        if hashrelease.is_ready_for_release {
            "yes"
        } else {
            "no"
        }
    );
    println!();
    println!("Components:");
    for (component, version) in &hashrelease.component_versions {
        println!("  {:<10} {}", component, version);
    }
    Ok(())
}

// =============================================================================
// DASHBOARD COMMAND
// =============================================================================

/// Show recent activity per project.
pub fn cmd_dashboard(config: &Config, json_mode: bool) -> Result<(), CliError> {
    let dashboard: Dashboard = open_service(config)?.dashboard()?;

    if json_mode {
        return print_json(&dashboard);
    }

    for (project, summary) in &dashboard.projects {
        println!("Project: {}", project);
        println!("==================");
        println!(
            "Active releases: {}    Ready hashreleases: {}",
            summary.active_releases, summary.ready_hashreleases
        );
        println!();
        println!("Recent releases:");
        print_release_table(&summary.releases);
        println!();
        println!("Recent hashreleases:");
        print_hashrelease_table(&summary.hashreleases);
        println!();
    }
    Ok(())
}

// =============================================================================
// FORMATTING
// =============================================================================

fn pass_fail(ok: bool) -> &'static str {
    if ok { "passed" } else { "failed" }
}

/// Short marker for a step status, as shown in the lifecycle view.
fn status_marker(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "[ ]",
        StepStatus::InProgress => "[~]",
        StepStatus::Done => "[x]",
        StepStatus::Error => "[!]",
    }
}

fn print_release_table(releases: &[Release]) {
    println!(
        "  {:<10} {:<11} {:<13} {:<17} {}",
        "ID", "PROJECT", "BRANCH", "STARTED", "PROGRESS"
    );
    for release in releases {
        let done = release
            .lifecycle
            .iter()
            .filter(|s| s.status == StepStatus::Done)
            .count();
        println!(
            "  {:<10} {:<11} {:<13} {:<17} {}/{}{}",
            release.id,
            release.project_id,
            release.branch,
            release.started_at.format("%Y-%m-%d %H:%M"),
            done,
            release.lifecycle.len(),
            if release.completed_at.is_some() {
                " (complete)"
            } else {
                ""
            }
        );
    }
}

fn print_hashrelease_table(hashreleases: &[Hashrelease]) {
    println!(
        "  {:<9} {:<11} {:<13} {:<12} {:<7} {:<7} {}",
        "ID", "PROJECT", "BRANCH", "VERSION", "BUILD", "TESTS", "READY"
    );
    for hr in hashreleases {
        println!(
            "  {:<9} {:<11} {:<13} {:<12} {:<7} {:<7} {}",
            hr.id,
            hr.project_id,
            hr.branch,
            hr.version,
            pass_fail(hr.build_success),
            pass_fail(hr.test_success),
            if hr.is_ready_for_release { "yes" } else { "no" }
        );
    }
}

fn print_release(release: &Release) {
    println!("Release {}", release.id);
    println!("==================");
    println!("Project:     {}", release.project_id);
    println!("Branch:      {}", release.branch);
    println!("Hashrelease: {}", release.hashrelease_id);
    println!("Manager:     {}", release.release_manager);
    println!(
        "Started:     {}",
        release.started_at.format("%Y-%m-%d %H:%M")
    );
    if let Some(completed) = release.completed_at {
        println!("Completed:   {}", completed.format("%Y-%m-%d %H:%M"));
    }
    println!();
    println!("Lifecycle:");
    for step in &release.lifecycle {
        print_step(step);
    }
}

fn print_step(step: &ReleaseStep) {
    let mut line = format!(
        "  {} {:<22} {}",
        status_marker(step.status),
        step.name,
        step.status
    );
    if let Some(started) = step.started_at {
        line.push_str(&format!("  started {}", started.format("%m-%d %H:%M")));
    }
    if let Some(completed) = step.completed_at {
        line.push_str(&format!("  completed {}", completed.format("%m-%d %H:%M")));
    }
    println!("{}", line);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;

    fn memory_config() -> Config {
        Config {
            storage: StorageConfig {
                backend: Backend::Memory,
                ..StorageConfig::default()
            },
            seed_on_start: false,
            ..Config::default()
        }
    }

    #[test]
    fn memory_backend_is_always_seeded() {
        let service = open_service(&memory_config()).expect("open");
        assert_eq!(service.list_releases(None).expect("list").len(), 4);
    }

    #[test]
    fn redb_backend_respects_seed_flag() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut config = Config {
            storage: StorageConfig {
                backend: Backend::Redb,
                path: dir.path().join("relboard.redb"),
                ..StorageConfig::default()
            },
            seed_on_start: false,
            ..Config::default()
        };

        {
            let service = open_service(&config).expect("open");
            assert!(service.list_releases(None).expect("list").is_empty());
        }

        config.seed_on_start = true;
        let service = open_service(&config).expect("reopen");
        assert_eq!(service.list_hashreleases(None).expect("list").len(), 8);
    }

    #[test]
    fn step_command_persists_to_redb() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config {
            storage: StorageConfig {
                backend: Backend::Redb,
                path: dir.path().join("relboard.redb"),
                ..StorageConfig::default()
            },
            ..Config::default()
        };

        cmd_step(&config, true, "v2.5.0", "Docs Merged", StepStatus::Done).expect("step");
        cmd_advance(&config, true, "v2.5.0", "Started").expect("advance");

        let release = open_service(&config)
            .expect("open")
            .get_release("v2.5.0")
            .expect("get");
        assert_eq!(
            release.step("Docs Merged").expect("step").status,
            StepStatus::Done
        );
        assert_eq!(
            release.step("Started").expect("step").status,
            StepStatus::Error
        );
    }

    #[test]
    fn unknown_release_is_an_error() {
        let result = cmd_release(&memory_config(), true, "v0.0.0");
        assert!(matches!(
            result,
            Err(CliError::Core(
                relboard_core::RelboardError::ReleaseNotFound(_)
            ))
        ));
    }
}
