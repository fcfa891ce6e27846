// src/db/memory_store.rs

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{CheckinStore, CheckinTransaction},
    models::{
        alert::{AlertEvent, EventCompletion, NewResponse, Response, ResponseCounts, ResponseStatus},
        auth::{Role, User},
    },
    services::area_directory::AreaDirectory,
};

#[derive(Default)]
struct MemoryState {
    areas: HashSet<String>,
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, AlertEvent>,
    responses: Vec<Response>,
}

impl MemoryState {
    fn members_in_area(&self, area_id: &str) -> impl Iterator<Item = &User> {
        self.users
            .values()
            .filter(move |u| u.role == Role::Member && u.area_id == area_id)
    }
}

/// Store em memória com as mesmas garantias do Postgres.
///
/// Uma transação segura o lock do estado inteiro até o commit ou o drop, o que
/// equivale a isolamento serializável. As escritas ficam pendentes e só são
/// aplicadas no commit.
#[derive(Clone, Default)]
pub struct MemoryCheckinStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCheckinStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_area(&self, area_id: impl Into<String>) {
        self.state.lock().await.areas.insert(area_id.into());
    }

    pub async fn insert_user(&self, user: User) {
        let mut state = self.state.lock().await;
        state.areas.insert(user.area_id.clone());
        state.users.insert(user.id, user);
    }

    pub async fn response_count(&self, event_id: Uuid) -> usize {
        self.state
            .lock()
            .await
            .responses
            .iter()
            .filter(|r| r.event_id == event_id)
            .count()
    }
}

#[async_trait]
impl CheckinStore for MemoryCheckinStore {
    async fn find_user(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn members_in_area(&self, area_id: &str) -> Result<Vec<User>, AppError> {
        let state = self.state.lock().await;
        let mut members: Vec<User> = state.members_in_area(area_id).cloned().collect();
        members.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(members)
    }

    async fn count_members_in_area(&self, area_id: &str) -> Result<i64, AppError> {
        Ok(self.state.lock().await.members_in_area(area_id).count() as i64)
    }

    async fn create_event(
        &self,
        area_id: &str,
        triggered_by_user_id: Option<Uuid>,
        triggered_at: DateTime<Utc>,
    ) -> Result<AlertEvent, AppError> {
        let event = AlertEvent {
            id: Uuid::new_v4(),
            area_id: area_id.to_string(),
            triggered_at,
            triggered_by_user_id,
            completed_at: None,
            completed_by_user_id: None,
            completion_reason: None,
        };
        self.state.lock().await.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, event_id: Uuid) -> Result<Option<AlertEvent>, AppError> {
        Ok(self.state.lock().await.events.get(&event_id).cloned())
    }

    async fn active_events_in_area(&self, area_id: &str) -> Result<Vec<AlertEvent>, AppError> {
        let state = self.state.lock().await;
        let mut events: Vec<AlertEvent> = state
            .events
            .values()
            .filter(|e| e.area_id == area_id && e.is_active())
            .cloned()
            .collect();
        events.sort_by_key(|e| e.triggered_at);
        Ok(events)
    }

    async fn responses_for_event(&self, event_id: Uuid) -> Result<Vec<Response>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .responses
            .iter()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn response_counts(&self, event_id: Uuid) -> Result<ResponseCounts, AppError> {
        let state = self.state.lock().await;
        let counts = state
            .responses
            .iter()
            .filter(|r| r.event_id == event_id)
            .fold(ResponseCounts::default(), |mut acc, r| {
                match r.status {
                    ResponseStatus::Ok => acc.ok += 1,
                    ResponseStatus::Help => acc.help += 1,
                }
                acc
            });
        Ok(counts)
    }

    async fn responses_by_user(&self, user_id: Uuid, event_ids: &[Uuid]) -> Result<Vec<Response>, AppError> {
        let state = self.state.lock().await;
        Ok(state
            .responses
            .iter()
            .filter(|r| r.user_id == user_id && event_ids.contains(&r.event_id))
            .cloned()
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn CheckinTransaction>, AppError> {
        let guard = self.state.clone().lock_owned().await;
        Ok(Box::new(MemoryTransaction {
            state: guard,
            staged_responses: Vec::new(),
            staged_completions: HashMap::new(),
        }))
    }
}

#[async_trait]
impl AreaDirectory for MemoryCheckinStore {
    async fn is_known_area(&self, area_id: &str) -> Result<bool, AppError> {
        Ok(self.state.lock().await.areas.contains(area_id))
    }
}

pub struct MemoryTransaction {
    state: OwnedMutexGuard<MemoryState>,
    staged_responses: Vec<Response>,
    staged_completions: HashMap<Uuid, AlertEvent>,
}

impl MemoryTransaction {
    // Leitura dentro da transação enxerga as próprias escritas pendentes
    fn current_event(&self, event_id: Uuid) -> Option<AlertEvent> {
        self.staged_completions
            .get(&event_id)
            .cloned()
            .or_else(|| self.state.events.get(&event_id).cloned())
    }

    fn all_responses(&self) -> impl Iterator<Item = &Response> {
        self.state.responses.iter().chain(self.staged_responses.iter())
    }
}

#[async_trait]
impl CheckinTransaction for MemoryTransaction {
    async fn lock_event(&mut self, event_id: Uuid) -> Result<Option<AlertEvent>, AppError> {
        Ok(self.current_event(event_id))
    }

    async fn find_response(&mut self, user_id: Uuid, event_id: Uuid) -> Result<Option<Response>, AppError> {
        Ok(self
            .all_responses()
            .find(|r| r.user_id == user_id && r.event_id == event_id)
            .cloned())
    }

    async fn insert_response(&mut self, new_response: &NewResponse) -> Result<Response, AppError> {
        let duplicate = self
            .all_responses()
            .any(|r| r.user_id == new_response.user_id && r.event_id == new_response.event_id);
        if duplicate {
            return Err(AppError::DuplicateResponse);
        }
        if !self.state.events.contains_key(&new_response.event_id) {
            return Err(AppError::EventNotFound);
        }

        let response = Response {
            id: new_response.id,
            user_id: new_response.user_id,
            event_id: new_response.event_id,
            status: new_response.status,
            notes: new_response.notes.clone(),
            responded_at: new_response.responded_at,
        };
        self.staged_responses.push(response.clone());
        Ok(response)
    }

    async fn count_members_in_area(&mut self, area_id: &str) -> Result<i64, AppError> {
        Ok(self.state.members_in_area(area_id).count() as i64)
    }

    async fn count_responses(&mut self, event_id: Uuid) -> Result<i64, AppError> {
        Ok(self.all_responses().filter(|r| r.event_id == event_id).count() as i64)
    }

    async fn complete_event(
        &mut self,
        event_id: Uuid,
        completion: &EventCompletion,
    ) -> Result<Option<AlertEvent>, AppError> {
        let Some(mut event) = self.current_event(event_id) else {
            return Ok(None);
        };
        if !event.is_active() {
            return Ok(None);
        }

        event.completed_at = Some(completion.completed_at);
        event.completed_by_user_id = completion.completed_by_user_id;
        event.completion_reason = Some(completion.reason.clone());
        self.staged_completions.insert(event_id, event.clone());
        Ok(Some(event))
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        let MemoryTransaction {
            mut state,
            staged_responses,
            staged_completions,
        } = *self;

        state.responses.extend(staged_responses);
        for (id, event) in staged_completions {
            state.events.insert(id, event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(area: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Bia".into(),
            phone: None,
            area_id: area.into(),
            role: Role::Member,
            supervised_areas: vec![],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn new_response(user_id: Uuid, event_id: Uuid) -> NewResponse {
        NewResponse {
            id: Uuid::new_v4(),
            user_id,
            event_id,
            status: ResponseStatus::Ok,
            notes: None,
            responded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn dropped_transaction_discards_staged_writes() {
        let store = MemoryCheckinStore::new();
        let user = member("north");
        store.insert_user(user.clone()).await;
        let event = store.create_event("north", None, Utc::now()).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.insert_response(&new_response(user.id, event.id)).await.unwrap();
            assert_eq!(tx.count_responses(event.id).await.unwrap(), 1);
            // sem commit
        }

        assert_eq!(store.response_count(event.id).await, 0);
    }

    #[tokio::test]
    async fn unique_constraint_rejects_second_row() {
        let store = MemoryCheckinStore::new();
        let user = member("north");
        store.insert_user(user.clone()).await;
        let event = store.create_event("north", None, Utc::now()).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.insert_response(&new_response(user.id, event.id)).await.unwrap();
        let err = tx.insert_response(&new_response(user.id, event.id)).await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateResponse));
        tx.commit().await.unwrap();

        assert_eq!(store.response_count(event.id).await, 1);
    }

    #[tokio::test]
    async fn completion_is_single_writer() {
        let store = MemoryCheckinStore::new();
        let event = store.create_event("north", None, Utc::now()).await.unwrap();
        let completion = EventCompletion {
            completed_at: Utc::now(),
            completed_by_user_id: None,
            reason: "done".into(),
        };

        let mut tx = store.begin().await.unwrap();
        assert!(tx.complete_event(event.id, &completion).await.unwrap().is_some());
        assert!(tx.complete_event(event.id, &completion).await.unwrap().is_none());
        tx.commit().await.unwrap();

        let stored = store.find_event(event.id).await.unwrap().unwrap();
        assert_eq!(stored.completed_at, Some(completion.completed_at));
        assert!(stored.was_auto_closed());
    }

    #[tokio::test]
    async fn known_areas_come_from_users_and_explicit_inserts() {
        let store = MemoryCheckinStore::new();
        store.insert_user(member("north")).await;
        store.insert_area("east").await;

        assert!(store.is_known_area("north").await.unwrap());
        assert!(store.is_known_area("east").await.unwrap());
        assert!(!store.is_known_area("atlantis").await.unwrap());
    }
}
