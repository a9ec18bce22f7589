//! Synchronisation pass integration tests.

use authws_federation::{FederationError, MatchKey, TraceEvent, TraceLevel, TraceLog};
use authws_model::{LocalIdentity, UserSession};
use authws_storage::InMemoryDirectory;
use wiremock::ResponseTemplate;

use crate::common::{cohort, ws_identity, Student, TestEnv, REALM};

fn has_event(log: &TraceLog, predicate: impl Fn(&TraceEvent) -> bool) -> bool {
    log.events().iter().any(predicate)
}

/// An empty student list must not touch the directory at all.
#[tokio::test]
async fn test_empty_fetch_aborts_before_any_change() -> anyhow::Result<()> {
    let env = TestEnv::with_identities(
        vec![ws_identity(5, "asilva", "10"), ws_identity(6, "bsouza", "11")],
        MatchKey::Idnumber,
    )
    .await?;
    env.serve_students(&[]).await;

    let mut log = TraceLog::new();
    let err = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await
        .unwrap_err();

    assert!(matches!(err, FederationError::SafetyAbort));
    assert_eq!(env.directory.mutation_count(), 0);
    assert!(env.directory.state().identities.iter().all(|i| !i.suspended));
    assert_eq!(
        log.lines().last().map(String::as_str),
        Some("did not get any users from the webservice")
    );
    Ok(())
}

/// An unreachable webservice behaves like an empty one.
#[tokio::test]
async fn test_remote_failure_aborts_before_any_change() -> anyhow::Result<()> {
    let env = TestEnv::with_identities(vec![ws_identity(5, "asilva", "10")], MatchKey::Idnumber)
        .await?;
    env.serve("GetAlunos", ResponseTemplate::new(503)).await;

    let mut log = TraceLog::new();
    let result = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await;

    assert!(matches!(result, Err(FederationError::SafetyAbort)));
    assert!(has_event(&log, |e| matches!(e, TraceEvent::RemoteUnavailable { .. })));
    assert!(has_event(&log, |e| matches!(e, TraceEvent::EmptyFetch)));
    assert_eq!(env.directory.mutation_count(), 0);
    Ok(())
}

/// Records that all fail normalization count as an empty fetch.
#[tokio::test]
async fn test_only_invalid_records_abort() -> anyhow::Result<()> {
    let env = TestEnv::with_identities(vec![ws_identity(5, "asilva", "10")], MatchKey::Idnumber)
        .await?;
    env.serve_students(&[
        Student::new("10", "asilva", "Ana Silva", ""),
        Student::new("11", "", "Bruno Souza", "bruno@example.edu"),
    ])
    .await;

    let mut log = TraceLog::new();
    let result = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await;

    assert!(matches!(result, Err(FederationError::SafetyAbort)));
    let rejected = log
        .events()
        .iter()
        .filter(|e| matches!(e, TraceEvent::RecordRejected { .. }))
        .count();
    assert_eq!(rejected, 2);
    assert!(!env.directory.get(5).unwrap().suspended);
    Ok(())
}

/// A student with no local match is created active and confirmed.
#[tokio::test]
async fn test_new_student_is_created() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.serve_students(&[Student::new("99", " NMoura ", "Nina de Moura", "nina@example.edu")])
        .await;

    let mut log = TraceLog::new();
    let report = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await?;

    assert_eq!(report.created, 1);
    assert!(!report.has_errors());

    let nina = env.identity("nmoura").expect("identity created");
    assert_eq!(nina.idnumber, "99");
    assert_eq!(nina.first_name, "Nina de");
    assert_eq!(nina.last_name, "Moura");
    assert_eq!(nina.email, "nina@example.edu");
    assert_eq!(nina.auth_method, "ws");
    assert_eq!(nina.realm_id, REALM);
    assert!(nina.confirmed);
    assert!(!nina.suspended);
    assert!(!nina.deleted);
    Ok(())
}

/// A student who left the registry is suspended and logged out.
#[tokio::test]
async fn test_missing_student_is_suspended_and_logged_out() -> anyhow::Result<()> {
    let env = TestEnv::with_identities(vec![ws_identity(42, "gone", "42")], MatchKey::Idnumber)
        .await?;
    env.directory.insert_session(UserSession::new(42));
    env.directory.insert_session(UserSession::new(42));
    env.serve_students(&cohort()).await;

    let mut log = TraceLog::new();
    let report = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await?;

    assert_eq!(report.staged, 5);
    assert_eq!(report.created, 5);
    assert_eq!(report.suspended, 1);
    assert_eq!(report.sessions_killed, 2);
    assert!(env.directory.get(42).unwrap().suspended);
    assert_eq!(env.directory.active_sessions(42), 0);
    assert!(has_event(&log, |e| matches!(
        e,
        TraceEvent::UserSuspended { id: 42, .. }
    )));
    Ok(())
}

/// A suspended student who reappears is reactivated with fresh profile data.
#[tokio::test]
async fn test_returning_student_is_reactivated() -> anyhow::Result<()> {
    let old = ws_identity(7, "asilva", "10")
        .with_name("A.", "S.")
        .with_suspended(true);
    let env = TestEnv::with_identities(vec![old], MatchKey::Idnumber).await?;
    env.serve_students(&cohort()[..1]).await;

    let mut log = TraceLog::new();
    let report = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await?;

    assert_eq!(report.updated, 1);
    assert_eq!(report.created, 0);
    let ana = env.directory.get(7).unwrap();
    assert!(!ana.suspended);
    assert_eq!(ana.first_name, "Ana");
    assert_eq!(ana.last_name, "Silva");
    assert_eq!(ana.email, "ana@example.edu");
    Ok(())
}

/// Duplicate records keep the first occurrence only.
#[tokio::test]
async fn test_duplicates_keep_first_record() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.serve_students(&[
        Student::new("1", "first", "First Student", "a@example.edu"),
        Student::new("1", "second", "Second Student", "b@example.edu"),
        Student::new("2", "third", "Third Student", "a@example.edu"),
    ])
    .await;

    let mut log = TraceLog::new();
    let report = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await?;

    assert_eq!(report.fetched, 3);
    assert_eq!(report.duplicates, 2);
    assert_eq!(report.staged, 1);
    assert_eq!(report.created, 1);
    assert!(env.identity("first").is_some());
    assert!(env.identity("second").is_none());
    assert!(env.identity("third").is_none());
    assert_eq!(log.count_at_least(TraceLevel::Warn), 2);
    Ok(())
}

/// Protected ids and identities of other auth methods are never suspended.
#[tokio::test]
async fn test_protected_and_foreign_identities_are_kept() -> anyhow::Result<()> {
    let env = TestEnv::with_identities(
        vec![
            ws_identity(2, "admin", "").with_email("admin@example.edu"),
            LocalIdentity::new(8, REALM, "lecturer", "manual").with_idnumber("800"),
            ws_identity(9, "left", "900"),
        ],
        MatchKey::Idnumber,
    )
    .await?;
    env.serve_students(&cohort()).await;

    let mut log = TraceLog::new();
    let report = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await?;

    assert_eq!(report.suspended, 1);
    assert!(!env.directory.get(2).unwrap().suspended);
    assert!(!env.directory.get(8).unwrap().suspended);
    assert!(env.directory.get(9).unwrap().suspended);
    Ok(())
}

/// A second pass over unchanged data creates and suspends nothing.
#[tokio::test]
async fn test_second_pass_is_stable() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.serve_students(&cohort()).await;
    let engine = env.engine()?;

    let first = engine
        .run(&env.directory, &env.directory, &mut TraceLog::new())
        .await?;
    let state = env.directory.state().identities;
    let second = engine
        .run(&env.directory, &env.directory, &mut TraceLog::new())
        .await?;

    assert_eq!(first.created, 5);
    assert_eq!(second.created, 0);
    assert_eq!(second.suspended, 0);
    assert_eq!(second.updated, 5);

    let after = env.directory.state().identities;
    assert_eq!(after.len(), state.len());
    for (before, after) in state.iter().zip(&after) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.username, after.username);
        assert_eq!(before.email, after.email);
    }
    Ok(())
}

/// A failing record does not stop the rest of the pass.
#[tokio::test]
async fn test_record_failure_is_reported_and_pass_continues() -> anyhow::Result<()> {
    let env = TestEnv::with_identities(vec![ws_identity(30, "gone", "300")], MatchKey::Idnumber)
        .await?;
    env.directory.fail_create_for("bsouza");
    env.directory.fail_suspend_for(30);
    env.serve_students(&cohort()).await;

    let mut log = TraceLog::new();
    let report = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await?;

    assert_eq!(report.created, 4);
    assert_eq!(report.suspended, 0);
    assert_eq!(report.failed, 2);
    assert!(report
        .errors
        .iter()
        .any(|e| e.username.as_deref() == Some("bsouza")));
    assert!(env.identity("bsouza").is_none());
    assert!(env.identity("erocha").is_some());
    assert!(has_event(&log, |e| matches!(e, TraceEvent::CreateFailed { .. })));
    assert!(has_event(&log, |e| matches!(e, TraceEvent::SuspendFailed { id: 30, .. })));
    assert!(report.status.contains("2 failed"));
    Ok(())
}

/// A dry run plans the pass without touching the directory.
#[tokio::test]
async fn test_dry_run_changes_nothing() -> anyhow::Result<()> {
    let env = TestEnv::with_identities(
        vec![ws_identity(5, "asilva", "10"), ws_identity(6, "gone", "600")],
        MatchKey::Idnumber,
    )
    .await?;
    env.serve_students(&cohort()).await;

    let mut log = TraceLog::new();
    let (plan, report) = env.engine()?.plan_only(&env.directory, &mut log).await?;

    assert!(report.dry_run);
    assert_eq!(plan.to_create.len(), 4);
    assert_eq!(plan.to_update.len(), 1);
    assert_eq!(plan.to_update[0].local.id, 5);
    assert_eq!(plan.to_suspend.len(), 1);
    assert_eq!(plan.to_suspend[0].id, 6);
    assert_eq!(env.directory.mutation_count(), 0);
    Ok(())
}

/// Username matching pairs records by sanitized login.
#[tokio::test]
async fn test_username_matching() -> anyhow::Result<()> {
    let env = TestEnv::with_identities(
        vec![
            ws_identity(5, "asilva", "old-code"),
            ws_identity(6, "gone", ""),
        ],
        MatchKey::Username,
    )
    .await?;
    env.serve_students(&[Student::new("10", "ASilva", "Ana Silva", "ana@example.edu")])
        .await;

    let mut log = TraceLog::new();
    let report = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await?;

    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 1);
    assert_eq!(report.suspended, 1);
    assert_eq!(env.directory.get(5).unwrap().idnumber, "10");
    assert!(env.directory.get(6).unwrap().suspended);
    Ok(())
}

/// An update may not take a username another identity already holds.
#[tokio::test]
async fn test_update_cannot_duplicate_username() -> anyhow::Result<()> {
    let env = TestEnv::with_identities(
        vec![ws_identity(5, "asilva", "10"), ws_identity(6, "bsouza", "11")],
        MatchKey::Idnumber,
    )
    .await?;
    env.serve_students(&[
        Student::new("10", "bsouza", "Ana Silva", "ana@example.edu"),
        Student::new("11", "bsouza", "Bruno Souza", "bruno@example.edu"),
    ])
    .await;

    let mut log = TraceLog::new();
    let report = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await?;

    assert_eq!(report.updated, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.errors[0].external_id, "10");
    let usernames: Vec<_> = env
        .directory
        .state()
        .identities
        .iter()
        .map(|i| (i.id, i.username.clone()))
        .collect();
    assert_eq!(usernames, vec![(5, "asilva".to_string()), (6, "bsouza".to_string())]);
    assert!(has_event(&log, |e| matches!(
        e,
        TraceEvent::UserUpdateFailed { id: 5, .. }
    )));
    assert!(log.count_at_least(TraceLevel::Error) >= 1);
    Ok(())
}

/// Legacy local logins with uppercase letters still match in username mode.
#[tokio::test]
async fn test_username_matching_sanitises_local_logins() -> anyhow::Result<()> {
    let env = TestEnv::with_identities(vec![ws_identity(5, "ASilva", "")], MatchKey::Username)
        .await?;
    env.serve_students(&[Student::new("10", "asilva", "Ana Silva", "ana@example.edu")])
        .await;

    let mut log = TraceLog::new();
    let report = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await?;

    assert_eq!(report.created, 0);
    assert_eq!(report.updated, 1);
    assert_eq!(report.suspended, 0);
    let ana = env.directory.get(5).unwrap();
    assert_eq!(ana.username, "asilva");
    assert_eq!(ana.idnumber, "10");
    assert!(!ana.suspended);
    Ok(())
}

/// Emails differing only in case are one address.
#[tokio::test]
async fn test_email_duplicates_ignore_case() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.serve_students(&[
        Student::new("10", "asilva", "Ana Silva", "Ana@X.edu"),
        Student::new("11", "bsouza", "Bruno Souza", "ana@x.edu"),
    ])
    .await;

    let mut log = TraceLog::new();
    let report = env
        .engine()?
        .run(&env.directory, &env.directory, &mut log)
        .await?;

    assert_eq!(report.duplicates, 1);
    assert_eq!(report.created, 1);
    assert!(env.identity("asilva").is_some());
    assert!(env.identity("bsouza").is_none());
    Ok(())
}

/// Running against an unseeded directory leaves no partial state on abort.
#[tokio::test]
async fn test_abort_leaves_empty_directory_empty() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;
    env.serve_students(&[]).await;

    let result = env
        .engine()?
        .run(&env.directory, &env.directory, &mut TraceLog::new())
        .await;

    assert!(result.is_err());
    assert_eq!(env.directory.state(), InMemoryDirectory::new().state());
    Ok(())
}
