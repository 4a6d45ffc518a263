use quiz_core::import::{ImportRow, SkipReason};
use quiz_core::model::SessionSetup;
use quiz_core::time::fixed_clock;
use services::{AppConfig, AppServices, PracticePhase};

fn row(stem: &str, correct: &str) -> ImportRow {
    ImportRow {
        category: Some("Safety".into()),
        stem: Some(stem.into()),
        option_a: Some("Raise the side rails".into()),
        option_b: Some("Leave the room".into()),
        option_c: Some("Dim the lights".into()),
        option_d: Some("Call a family member".into()),
        kind: Some("single".into()),
        correct_indices: Some(correct.into()),
        rationale: Some("Fall prevention comes first.".into()),
        ..ImportRow::default()
    }
}

#[tokio::test]
async fn import_practice_and_retry_missed() {
    let mut services = AppServices::new_in_memory(fixed_clock()).await;

    let rows = vec![
        row("Which action prevents falls?", "0"),
        row("  which action PREVENTS falls? ", "1"),
        ImportRow {
            stem: None,
            ..row("", "0")
        },
    ];
    let report = services.state_mut().import_rows(rows).await.unwrap();
    assert_eq!(
        (report.inserted, report.duplicates, report.skipped, report.total),
        (1, 1, 1, 1)
    );
    assert_eq!(report.skipped_rows[0].reason, SkipReason::MissingStem);

    let (practice, state) = services.split_mut();
    practice.set_setup(SessionSetup::default().with_count(10).unwrap());
    practice.start_session(state.snapshot());
    assert_eq!(practice.run().unwrap().pool().len(), 1);
    assert_eq!(practice.phase(), PracticePhase::Running);

    practice.toggle_selection(3);
    let attempt = practice.submit(state).await.unwrap().unwrap();
    assert!(!attempt.is_correct);
    assert_eq!(practice.phase(), PracticePhase::Submitted);

    practice.advance();
    assert_eq!(practice.phase(), PracticePhase::Completed);
    let run = practice.run().unwrap();
    assert_eq!((run.session_correct(), run.session_total()), (0, 1));
    let missed = run.pool()[0].clone();

    assert!(practice.retry_missed());
    let run = practice.run().unwrap();
    assert_eq!(practice.phase(), PracticePhase::Running);
    assert_eq!(run.pool(), std::slice::from_ref(&missed));

    let stats = state.stats();
    assert_eq!(stats.total_attempts, 1);
    assert_eq!(stats.unique_mastered, 0);
    assert_eq!(state.categories(), vec!["Safety".to_string()]);
}

#[tokio::test]
async fn sqlite_services_rehydrate_persisted_state() {
    let config = AppConfig {
        db_url: "sqlite:file:practice_flow_rehydrate?mode=memory&cache=shared".into(),
        ..AppConfig::default()
    };

    let mut first = AppServices::new_sqlite(&config, fixed_clock()).await.unwrap();
    first
        .state_mut()
        .import_rows(vec![row("Which action prevents falls?", "0")])
        .await
        .unwrap();
    assert!(!first.state().sync().enabled());

    let second = AppServices::new_sqlite(&config, fixed_clock()).await.unwrap();
    assert_eq!(second.state().snapshot(), first.state().snapshot());
    assert_eq!(second.practice().phase(), PracticePhase::Setup);
}
