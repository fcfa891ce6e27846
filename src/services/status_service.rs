// src/services/status_service.rs

use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use futures::future::try_join_all;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CheckinStore,
    models::{
        alert::{AlertEvent, ResponseCounts, ResponseStatus},
        auth::User,
        status::{
            ActiveSummary, AreaSummary, EventStatusReport, EventSummary, MemberStatus, StatusCounts,
            StatusLabel, SummaryTotals,
        },
    },
};

// Agregação lida sempre do store, sem cache
#[derive(Clone)]
pub struct StatusService {
    store: Arc<dyn CheckinStore>,
}

impl StatusService {
    pub fn new(store: Arc<dyn CheckinStore>) -> Self {
        Self { store }
    }

    fn ensure_supervisor(requester: &User) -> Result<(), AppError> {
        if requester.is_supervisor() {
            Ok(())
        } else {
            Err(AppError::forbidden("Only supervisors can view alert status"))
        }
    }

    // --- STATUS DE UM EVENTO ---
    pub async fn get_event_status(
        &self,
        event_id: Uuid,
        requester: &User,
    ) -> Result<EventStatusReport, AppError> {
        Self::ensure_supervisor(requester)?;

        let event = self
            .store
            .find_event(event_id)
            .await?
            .ok_or(AppError::EventNotFound)?;
        if !requester.can_see_area(&event.area_id) {
            return Err(AppError::forbidden("This alert is outside your supervised areas"));
        }

        let (members, responses) = tokio::try_join!(
            self.store.members_in_area(&event.area_id),
            self.store.responses_for_event(event_id),
        )?;

        let by_user: HashMap<Uuid, _> = responses.into_iter().map(|r| (r.user_id, r)).collect();
        let mut counts = ResponseCounts::default();

        let members: Vec<MemberStatus> = members
            .into_iter()
            .map(|member| {
                let response = by_user.get(&member.id);
                let status = match response {
                    Some(r) => {
                        match r.status {
                            ResponseStatus::Ok => counts.ok += 1,
                            ResponseStatus::Help => counts.help += 1,
                        }
                        StatusLabel::from(r.status)
                    }
                    None => StatusLabel::Pending,
                };
                MemberStatus {
                    user_id: member.id,
                    name: member.name,
                    phone: member.phone,
                    status,
                    responded_at: response.map(|r| r.responded_at),
                    notes: response.and_then(|r| r.notes.clone()),
                }
            })
            .collect();

        let counts = StatusCounts::compute(members.len() as i64, counts);
        Ok(EventStatusReport {
            event,
            counts,
            members,
        })
    }

    // --- RESUMO DOS EVENTOS ATIVOS ---
    pub async fn get_active_summary(&self, requester: &User) -> Result<ActiveSummary, AppError> {
        Self::ensure_supervisor(requester)?;

        // Consultas por área em paralelo; todas terminam antes do retorno
        let scope = requester.scope_areas();
        let per_area = try_join_all(scope.iter().map(|area_id| self.area_summary(area_id))).await?;

        let areas: Vec<AreaSummary> = per_area.into_iter().flatten().collect();
        let totals = SummaryTotals::from_areas(&areas);

        Ok(ActiveSummary {
            areas,
            totals,
            generated_at: Utc::now(),
        })
    }

    // Áreas sem evento ativo retornam None e ficam fora do resumo
    async fn area_summary(&self, area_id: &str) -> Result<Option<AreaSummary>, AppError> {
        let events = self.store.active_events_in_area(area_id).await?;
        if events.is_empty() {
            return Ok(None);
        }

        let population = self.store.count_members_in_area(area_id).await?;
        let summaries = try_join_all(events.into_iter().map(|event| self.event_summary(event, population))).await?;

        Ok(Some(AreaSummary::rollup(area_id.to_string(), population, summaries)))
    }

    async fn event_summary(&self, event: AlertEvent, population: i64) -> Result<EventSummary, AppError> {
        let counts = self.store.response_counts(event.id).await?;
        Ok(EventSummary::new(event, StatusCounts::compute(population, counts)))
    }

    // --- ALERTAS PENDENTES DO MEMBRO ---
    pub async fn get_my_pending_alerts(&self, caller: &User) -> Result<Vec<AlertEvent>, AppError> {
        let active = self.store.active_events_in_area(&caller.area_id).await?;
        if active.is_empty() || !caller.is_member_of(&caller.area_id) {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = active.iter().map(|e| e.id).collect();
        let answered: Vec<Uuid> = self
            .store
            .responses_by_user(caller.id, &ids)
            .await?
            .into_iter()
            .map(|r| r.event_id)
            .collect();

        Ok(active
            .into_iter()
            .filter(|e| !answered.contains(&e.id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{CheckinTransaction, MemoryCheckinStore},
        models::{alert::NewResponse, auth::Role},
    };

    fn user(role: Role, area: &str, supervised: &[&str]) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Hugo".into(),
            phone: None,
            area_id: area.into(),
            role,
            supervised_areas: supervised.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn respond(store: &MemoryCheckinStore, user: &User, event: &AlertEvent, status: ResponseStatus) {
        let mut tx = store.begin().await.unwrap();
        tx.insert_response(&NewResponse {
            id: Uuid::new_v4(),
            user_id: user.id,
            event_id: event.id,
            status,
            notes: None,
            responded_at: Utc::now(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn event_status_labels_every_member() {
        let store = MemoryCheckinStore::new();
        let a = user(Role::Member, "north", &[]);
        let b = user(Role::Member, "north", &[]);
        let c = user(Role::Member, "north", &[]);
        for u in [&a, &b, &c] {
            store.insert_user(u.clone()).await;
        }
        let event = store.create_event("north", None, Utc::now()).await.unwrap();
        respond(&store, &a, &event, ResponseStatus::Ok).await;
        respond(&store, &b, &event, ResponseStatus::Help).await;

        let service = StatusService::new(Arc::new(store));
        let boss = user(Role::Supervisor, "north", &[]);
        let report = service.get_event_status(event.id, &boss).await.unwrap();

        assert_eq!(report.counts.total_users, 3);
        assert_eq!(report.counts.responded, 2);
        assert_eq!(report.counts.pending, 1);
        assert_eq!((report.counts.ok, report.counts.help), (1, 1));
        let label_of = |id: Uuid| report.members.iter().find(|m| m.user_id == id).unwrap().status;
        assert_eq!(label_of(a.id), StatusLabel::Ok);
        assert_eq!(label_of(b.id), StatusLabel::Help);
        assert_eq!(label_of(c.id), StatusLabel::Pending);
    }

    #[tokio::test]
    async fn event_status_authorization() {
        let store = MemoryCheckinStore::new();
        let event = store.create_event("south", None, Utc::now()).await.unwrap();
        let service = StatusService::new(Arc::new(store));

        let member = user(Role::Member, "south", &[]);
        assert!(matches!(
            service.get_event_status(event.id, &member).await,
            Err(AppError::Forbidden(_))
        ));

        let north_boss = user(Role::Supervisor, "north", &[]);
        assert!(matches!(
            service.get_event_status(event.id, &north_boss).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.get_event_status(Uuid::new_v4(), &north_boss).await,
            Err(AppError::EventNotFound)
        ));
    }

    #[tokio::test]
    async fn summary_omits_quiet_areas() {
        let store = MemoryCheckinStore::new();
        let a = user(Role::Member, "north", &[]);
        store.insert_user(a.clone()).await;
        store.insert_user(user(Role::Member, "north", &[])).await;
        store.insert_user(user(Role::Member, "south", &[])).await;
        let event = store.create_event("north", None, Utc::now()).await.unwrap();
        respond(&store, &a, &event, ResponseStatus::Ok).await;

        let service = StatusService::new(Arc::new(store));
        let boss = user(Role::Supervisor, "hq", &["north", "south"]);
        let summary = service.get_active_summary(&boss).await.unwrap();

        assert_eq!(summary.areas.len(), 1);
        let north = &summary.areas[0];
        assert_eq!(north.area_id, "north");
        assert_eq!(north.active_events.len(), 1);
        let e = &north.active_events[0];
        assert_eq!((e.total_users, e.responded, e.pending), (2, 1, 1));
        assert!(e.is_overdue);
        assert!(!e.is_complete);
        assert_eq!(summary.totals.active_areas, 1);
        assert_eq!(summary.totals.active_events, 1);
    }

    #[tokio::test]
    async fn repeated_scope_entries_do_not_double_totals() {
        let store = MemoryCheckinStore::new();
        let a = user(Role::Member, "north", &[]);
        store.insert_user(a.clone()).await;
        store.insert_user(user(Role::Member, "north", &[])).await;
        let event = store.create_event("north", None, Utc::now()).await.unwrap();
        respond(&store, &a, &event, ResponseStatus::Ok).await;

        let service = StatusService::new(Arc::new(store));
        let boss = user(Role::Supervisor, "hq", &["north", "north"]);
        let summary = service.get_active_summary(&boss).await.unwrap();

        assert_eq!(summary.areas.len(), 1);
        assert_eq!(summary.totals.active_areas, 1);
        assert_eq!(summary.totals.active_events, 1);
        assert_eq!(summary.totals.total_users, 2);
        assert_eq!(summary.totals.responded, 1);
    }

    #[tokio::test]
    async fn summary_requires_supervisor() {
        let service = StatusService::new(Arc::new(MemoryCheckinStore::new()));
        let member = user(Role::Member, "north", &[]);
        assert!(matches!(
            service.get_active_summary(&member).await,
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn pending_alerts_exclude_answered_events() {
        let store = MemoryCheckinStore::new();
        let member = user(Role::Member, "north", &[]);
        store.insert_user(member.clone()).await;
        let answered = store.create_event("north", None, Utc::now()).await.unwrap();
        let open = store.create_event("north", None, Utc::now()).await.unwrap();
        respond(&store, &member, &answered, ResponseStatus::Ok).await;

        let service = StatusService::new(Arc::new(store));
        let pending = service.get_my_pending_alerts(&member).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, open.id);
    }
}
