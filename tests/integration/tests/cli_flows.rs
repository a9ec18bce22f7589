//! CLI command integration tests.

use authws_cli::cli::{SyncArgs, UsersArgs};
use authws_cli::commands::{run_sync, run_users};
use authws_cli::config::{CliConfig, OutputFormat};
use authws_cli::CliError;
use authws_storage::{DirectoryState, InMemoryDirectory, JsonDirectoryFile};
use serde_json::Value;

use crate::common::{cohort, ws_identity, TestEnv};

fn cli_config(env: &TestEnv, dir: &tempfile::TempDir) -> CliConfig {
    CliConfig {
        directory: dir.path().join("directory.json"),
        output_format: OutputFormat::Quiet,
        ws: Some(env.config.clone()),
    }
}

#[tokio::test]
async fn test_sync_persists_directory_and_trace() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.serve_students(&cohort()).await;
    let dir = tempfile::tempdir()?;
    let config = cli_config(&env, &dir);
    JsonDirectoryFile::new(&config.directory)
        .save(&InMemoryDirectory::with_identities(vec![ws_identity(50, "gone", "500")]))?;
    let trace = dir.path().join("trace.json");

    run_sync(
        SyncArgs {
            dry_run: false,
            trace: Some(trace.clone()),
        },
        &config,
        None,
        OutputFormat::Quiet,
    )
    .await?;

    let state: DirectoryState = JsonDirectoryFile::new(&config.directory).load()?.state();
    assert_eq!(state.identities.len(), 6);
    assert!(state.identities.iter().any(|i| i.id == 50 && i.suspended));

    let events: Value = serde_json::from_str(&std::fs::read_to_string(trace)?)?;
    let events = events.as_array().expect("trace is a list");
    assert_eq!(events[0]["event"], "staging_created");
    assert!(events.iter().any(|e| e["event"] == "user_suspended"));

    run_users(
        &UsersArgs {
            auth: Some("ws".to_string()),
            suspended: true,
        },
        &config,
        None,
        OutputFormat::Quiet,
    )?;
    Ok(())
}

#[tokio::test]
async fn test_dry_run_leaves_file_untouched() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.serve_students(&cohort()).await;
    let dir = tempfile::tempdir()?;
    let config = cli_config(&env, &dir);

    run_sync(
        SyncArgs {
            dry_run: true,
            trace: None,
        },
        &config,
        None,
        OutputFormat::Quiet,
    )
    .await?;

    assert!(!config.directory.exists());
    Ok(())
}

#[tokio::test]
async fn test_safety_abort_maps_to_exit_code() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.serve_students(&[]).await;
    let dir = tempfile::tempdir()?;
    let config = cli_config(&env, &dir);

    let err = run_sync(
        SyncArgs {
            dry_run: false,
            trace: None,
        },
        &config,
        None,
        OutputFormat::Quiet,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CliError::SafetyAbort));
    assert_eq!(err.exit_code(), 3);
    assert!(!config.directory.exists());
    Ok(())
}

#[tokio::test]
async fn test_disabled_provider_stops_sync() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    let dir = tempfile::tempdir()?;
    let mut config = cli_config(&env, &dir);
    if let Some(ws) = config.ws.as_mut() {
        ws.enabled = false;
    }

    let err = run_sync(
        SyncArgs {
            dry_run: false,
            trace: None,
        },
        &config,
        None,
        OutputFormat::Quiet,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CliError::Disabled));
    assert_eq!(err.exit_code(), 2);
    Ok(())
}
