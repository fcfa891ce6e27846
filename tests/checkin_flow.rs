mod common;

use std::sync::Arc;

use checkin_backend::{
    common::error::{AppError, ErrorKind},
    db::{CheckinStore, MemoryCheckinStore},
    models::alert::ResponseStatus,
};
use common::{app_state, member, seed, supervisor};

#[tokio::test]
async fn north_scenario_counts_down_and_auto_completes() {
    let store = MemoryCheckinStore::new();
    let (a, b, c) = (member("A", "north"), member("B", "north"), member("C", "north"));
    let boss = supervisor("Boss", &["north"]);
    seed(&store, &[&a, &b, &c, &boss]).await;
    let state = app_state(&store);

    let e1 = state
        .alert_service
        .trigger_alert("north", Some(boss.id))
        .await
        .unwrap()
        .event;
    let pending = |report: &checkin_backend::models::status::EventStatusReport| report.counts.pending;

    let report = state.status_service.get_event_status(e1.id, &boss).await.unwrap();
    assert_eq!(pending(&report), 3);

    let steps = [(&a, ResponseStatus::Ok, 2), (&b, ResponseStatus::Help, 1), (&c, ResponseStatus::Ok, 0)];
    let mut completions = 0;
    for (who, status, expected_pending) in steps {
        let outcome = state
            .response_service
            .submit_response(who, e1.id, status, None)
            .await
            .unwrap();
        if outcome.completed_event.is_some() {
            completions += 1;
        }
        let report = state.status_service.get_event_status(e1.id, &boss).await.unwrap();
        assert_eq!(pending(&report), expected_pending);
    }
    assert_eq!(completions, 1);

    let stored = store.find_event(e1.id).await.unwrap().unwrap();
    assert!(stored.completed_at.is_some());
    assert_eq!(stored.completed_by_user_id, None);

    let err = state
        .response_service
        .submit_response(&a, e1.id, ResponseStatus::Ok, None)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DuplicateResponse));
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn active_summary_rolls_up_areas_in_scope() {
    let store = MemoryCheckinStore::new();
    let north: Vec<_> = (0..4).map(|i| member(&format!("N{}", i), "north")).collect();
    let south: Vec<_> = (0..2).map(|i| member(&format!("S{}", i), "south")).collect();
    for u in north.iter().chain(south.iter()) {
        store.insert_user(u.clone()).await;
    }
    let boss = supervisor("Boss", &["north", "south", "east"]);
    let state = app_state(&store);

    let n_event = state.alert_service.trigger_alert("north", None).await.unwrap().event;
    let s_event = state.alert_service.trigger_alert("south", None).await.unwrap().event;

    state
        .response_service
        .submit_response(&north[0], n_event.id, ResponseStatus::Ok, None)
        .await
        .unwrap();
    state
        .response_service
        .submit_response(&north[1], n_event.id, ResponseStatus::Help, None)
        .await
        .unwrap();
    for s in &south {
        state
            .response_service
            .submit_response(s, s_event.id, ResponseStatus::Ok, None)
            .await
            .unwrap();
    }

    // south fechou sozinho: só north continua ativo
    let summary = state.status_service.get_active_summary(&boss).await.unwrap();
    assert_eq!(summary.areas.len(), 1);
    let area = &summary.areas[0];
    assert_eq!(area.area_id, "north");
    assert_eq!(area.total_users, 4);
    let event = &area.active_events[0];
    assert_eq!((event.ok, event.help, event.pending), (1, 1, 2));
    assert_eq!(event.responded, 2);
    assert!(event.is_overdue);
    assert_eq!(summary.totals.active_events, 1);
}

#[tokio::test]
async fn resubmission_is_idempotent() {
    let store = MemoryCheckinStore::new();
    let (a, b) = (member("A", "east"), member("B", "east"));
    seed(&store, &[&a, &b]).await;
    let state = app_state(&store);
    let event = state.alert_service.trigger_alert("east", None).await.unwrap().event;

    let first = state
        .response_service
        .submit_response(&a, event.id, ResponseStatus::Help, Some("preso no elevador".into()))
        .await
        .unwrap();
    for status in [ResponseStatus::Help, ResponseStatus::Ok] {
        assert!(matches!(
            state.response_service.submit_response(&a, event.id, status, None).await,
            Err(AppError::DuplicateResponse)
        ));
    }

    let stored = store.responses_for_event(event.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].id, first.response.id);
    assert_eq!(stored[0].status, ResponseStatus::Help);
    assert!(store.find_event(event.id).await.unwrap().unwrap().is_active());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_final_responses_complete_exactly_once() {
    const MEMBERS: usize = 12;

    let store = MemoryCheckinStore::new();
    let members: Vec<_> = (0..MEMBERS).map(|i| member(&format!("M{}", i), "north")).collect();
    for m in &members {
        store.insert_user(m.clone()).await;
    }
    let state = app_state(&store);
    let event_id = state.alert_service.trigger_alert("north", None).await.unwrap().event.id;

    let service = Arc::new(state.response_service.clone());
    let tasks: Vec<_> = members
        .into_iter()
        .map(|m| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .submit_response(&m, event_id, ResponseStatus::Ok, None)
                    .await
            })
        })
        .collect();

    let mut completions = 0;
    for task in tasks {
        let outcome = task.await.unwrap().unwrap();
        if outcome.completed_event.is_some() {
            completions += 1;
        }
    }

    assert_eq!(completions, 1);
    assert_eq!(store.response_count(event_id).await, MEMBERS);
    assert!(!store.find_event(event_id).await.unwrap().unwrap().is_active());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn manual_close_and_auto_close_are_mutually_exclusive() {
    for _ in 0..20 {
        let store = MemoryCheckinStore::new();
        let last = member("Last", "south");
        let boss = supervisor("Boss", &["south"]);
        seed(&store, &[&last, &boss]).await;
        let state = app_state(&store);
        let event_id = state.alert_service.trigger_alert("south", None).await.unwrap().event.id;

        let alerts = state.alert_service.clone();
        let responses = state.response_service.clone();
        let closer = boss.clone();
        let close = tokio::spawn(async move { alerts.close_event(&closer, event_id, None).await });
        let submit = tokio::spawn(async move {
            responses
                .submit_response(&last, event_id, ResponseStatus::Ok, None)
                .await
        });

        let closed = close.await.unwrap();
        let submitted = submit.await.unwrap().unwrap();

        match closed {
            Ok(e) => {
                assert_eq!(e.completed_by_user_id, Some(boss.id));
                assert!(submitted.completed_event.is_none());
            }
            Err(AppError::EventAlreadyCompleted) => {
                assert!(submitted.completed_event.is_some());
            }
            Err(other) => panic!("unexpected close error: {other}"),
        }
        assert_eq!(store.response_count(event_id).await, 1);
    }
}

#[tokio::test]
async fn responses_never_exceed_population() {
    let store = MemoryCheckinStore::new();
    let a = member("A", "north");
    let visitor = member("V", "south");
    let boss = supervisor("Boss", &["north"]);
    seed(&store, &[&a, &visitor, &boss]).await;
    let state = app_state(&store);
    let event = state.alert_service.trigger_alert("north", None).await.unwrap().event;

    for caller in [&visitor, &boss] {
        assert!(matches!(
            state
                .response_service
                .submit_response(caller, event.id, ResponseStatus::Ok, None)
                .await,
            Err(AppError::Forbidden(_))
        ));
    }
    state
        .response_service
        .submit_response(&a, event.id, ResponseStatus::Ok, None)
        .await
        .unwrap();

    let population = store.count_members_in_area("north").await.unwrap();
    assert!(store.response_count(event.id).await as i64 <= population);
}

#[tokio::test]
async fn supervisors_see_the_whole_lifecycle_and_late_joiners_get_catch_up() {
    use checkin_backend::realtime::RealtimeMessage;

    let store = MemoryCheckinStore::new();
    let a = member("A", "north");
    let boss = supervisor("Boss", &["north"]);
    seed(&store, &[&a, &boss]).await;
    let state = app_state(&store);

    let (sup_conn, mut sup_rx) = state.hub.connect(boss.id);
    state.hub.join_supervisors(sup_conn, &boss).unwrap();

    let event = state.alert_service.trigger_alert("north", Some(boss.id)).await.unwrap().event;

    // Membro que conecta depois do disparo recebe o alerta ativo
    let (late_conn, mut late_rx) = state.hub.connect(a.id);
    let replayed = state.hub.join_area(late_conn, &a, "north").await.unwrap();
    assert_eq!(replayed, 1);
    assert_eq!(late_rx.recv().await.unwrap(), RealtimeMessage::new_alert(&event));

    let outcome = state
        .response_service
        .submit_response(&a, event.id, ResponseStatus::Ok, None)
        .await
        .unwrap();
    let closed = outcome.completed_event.unwrap();

    assert_eq!(sup_rx.recv().await.unwrap(), RealtimeMessage::new_alert(&event));
    assert_eq!(
        sup_rx.recv().await.unwrap(),
        RealtimeMessage::response_update(&outcome.response)
    );
    assert_eq!(
        sup_rx.recv().await.unwrap(),
        RealtimeMessage::event_completed(&closed).unwrap()
    );
    // a área também é avisada do encerramento
    assert!(matches!(
        late_rx.recv().await.unwrap(),
        RealtimeMessage::EventCompleted { auto_closed: true, .. }
    ));
}
