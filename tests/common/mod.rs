#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use uuid::Uuid;

use checkin_backend::{
    config::AppState,
    db::MemoryCheckinStore,
    models::auth::{Role, User},
    services::{area_directory::StaticAreaDirectory, push::LoggingPushNotifier},
};

pub const JWT_SECRET: &str = "test-secret";

pub fn user(name: &str, role: Role, area: &str, supervised: &[&str]) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        phone: None,
        area_id: area.to_string(),
        role,
        supervised_areas: supervised.iter().map(|s| s.to_string()).collect(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn member(name: &str, area: &str) -> User {
    user(name, Role::Member, area, &[])
}

pub fn supervisor(name: &str, supervised: &[&str]) -> User {
    user(name, Role::Supervisor, "hq", supervised)
}

pub async fn seed(store: &MemoryCheckinStore, users: &[&User]) {
    for u in users {
        store.insert_user((*u).clone()).await;
    }
}

pub fn app_state(store: &MemoryCheckinStore) -> AppState {
    AppState::from_parts(
        Arc::new(store.clone()),
        Arc::new(StaticAreaDirectory::new(["north", "south", "east"])),
        Arc::new(LoggingPushNotifier),
        JWT_SECRET.to_string(),
        16,
        Duration::from_millis(500),
    )
}
