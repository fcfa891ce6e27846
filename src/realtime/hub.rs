// src/realtime/hub.rs

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CheckinStore,
    models::auth::User,
    realtime::messages::{Audience, RealtimeMessage},
};

/// Interface de publicação usada pelos serviços.
///
/// O hub local implementa este trait; um adaptador para um barramento externo
/// (vários processos) pode implementar a mesma interface.
pub trait RealtimePublisher: Send + Sync {
    /// Entrega best-effort. Retorna quantas conexões aceitaram a mensagem.
    fn publish(&self, audience: &Audience, message: &RealtimeMessage) -> usize;

    fn publish_all(&self, audiences: &[Audience], message: &RealtimeMessage) -> usize {
        audiences.iter().map(|a| self.publish(a, message)).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

struct ConnectionEntry {
    user_id: Uuid,
    sender: mpsc::Sender<RealtimeMessage>,
    audiences: HashSet<Audience>,
}

/// Registro das conexões de uma instância. Pertence ao hub, nunca é global.
#[derive(Default)]
pub struct ConnectionRegistry {
    next_id: AtomicU64,
    connections: DashMap<ConnectionId, ConnectionEntry>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, user_id: Uuid, sender: mpsc::Sender<RealtimeMessage>) -> ConnectionId {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.connections.insert(
            id,
            ConnectionEntry {
                user_id,
                sender,
                audiences: HashSet::new(),
            },
        );
        id
    }

    pub fn remove(&self, id: ConnectionId) -> bool {
        self.connections.remove(&id).is_some()
    }

    pub fn join(&self, id: ConnectionId, audience: Audience) -> bool {
        match self.connections.get_mut(&id) {
            Some(mut entry) => {
                entry.audiences.insert(audience);
                true
            }
            None => false,
        }
    }

    pub fn leave(&self, id: ConnectionId, audience: &Audience) -> bool {
        match self.connections.get_mut(&id) {
            Some(mut entry) => entry.audiences.remove(audience),
            None => false,
        }
    }

    /// Troca o contexto de área: sai de qualquer outra área e entra em `area_id`.
    pub fn switch_area(&self, id: ConnectionId, area_id: &str) -> bool {
        match self.connections.get_mut(&id) {
            Some(mut entry) => {
                entry.audiences.retain(|a| !matches!(a, Audience::Area(_)));
                entry.audiences.insert(Audience::Area(area_id.to_string()));
                true
            }
            None => false,
        }
    }

    pub fn audiences_of(&self, id: ConnectionId) -> Vec<Audience> {
        self.connections
            .get(&id)
            .map(|entry| entry.audiences.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn send_to(&self, id: ConnectionId, message: &RealtimeMessage) -> bool {
        let outcome = match self.connections.get(&id) {
            Some(entry) => try_deliver(id, entry.user_id, &entry.sender, message),
            None => return false,
        };
        if outcome == Delivery::Closed {
            self.remove(id);
        }
        outcome == Delivery::Sent
    }

    pub fn broadcast(&self, audience: &Audience, message: &RealtimeMessage) -> usize {
        let mut delivered = 0;
        let mut stale = Vec::new();

        for entry in self.connections.iter() {
            if !entry.audiences.contains(audience) {
                continue;
            }
            match try_deliver(*entry.key(), entry.user_id, &entry.sender, message) {
                Delivery::Sent => delivered += 1,
                Delivery::Dropped => {}
                Delivery::Closed => stale.push(*entry.key()),
            }
        }

        // Remoção fora da iteração para não travar o shard do DashMap
        for id in stale {
            self.remove(id);
        }
        delivered
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Delivery {
    Sent,
    Dropped,
    Closed,
}

fn try_deliver(
    id: ConnectionId,
    user_id: Uuid,
    sender: &mpsc::Sender<RealtimeMessage>,
    message: &RealtimeMessage,
) -> Delivery {
    match sender.try_send(message.clone()) {
        Ok(()) => Delivery::Sent,
        Err(TrySendError::Full(_)) => {
            warn!(%id, %user_id, "Fila de saída cheia, mensagem descartada");
            Delivery::Dropped
        }
        Err(TrySendError::Closed(_)) => {
            debug!(%id, %user_id, "Conexão encerrada, removendo do registro");
            Delivery::Closed
        }
    }
}

// O canal em tempo real: registro de conexões + catch-up a partir do store
pub struct RealtimeHub {
    registry: ConnectionRegistry,
    store: Arc<dyn CheckinStore>,
    buffer: usize,
}

impl RealtimeHub {
    pub fn new(registry: ConnectionRegistry, store: Arc<dyn CheckinStore>, buffer: usize) -> Self {
        Self {
            registry,
            store,
            buffer: buffer.max(1),
        }
    }

    pub fn connect(&self, user_id: Uuid) -> (ConnectionId, mpsc::Receiver<RealtimeMessage>) {
        let (tx, rx) = mpsc::channel(self.buffer);
        let id = self.registry.register(user_id, tx);
        debug!(%id, %user_id, "Nova conexão em tempo real");
        (id, rx)
    }

    pub fn disconnect(&self, id: ConnectionId) {
        if self.registry.remove(id) {
            debug!(%id, "Conexão removida");
        }
    }

    pub fn join_supervisors(&self, id: ConnectionId, user: &User) -> Result<(), AppError> {
        if !user.is_supervisor() {
            return Err(AppError::forbidden("Only supervisors can join the supervisors channel"));
        }
        self.registry.join(id, Audience::Supervisors);
        Ok(())
    }

    /// Entra no grupo da área e reenvia os eventos ativos dela.
    ///
    /// O catch-up é recalculado do store no momento da entrada; não é um log.
    /// Retorna quantos eventos foram reenviados.
    pub async fn join_area(&self, id: ConnectionId, user: &User, area_id: &str) -> Result<usize, AppError> {
        if user.area_id != area_id && !(user.is_supervisor() && user.can_see_area(area_id)) {
            return Err(AppError::forbidden(format!("You cannot follow area '{}'", area_id)));
        }
        if !self.registry.switch_area(id, area_id) {
            return Ok(0);
        }

        let active = self.store.active_events_in_area(area_id).await?;
        let mut replayed = 0;
        for event in &active {
            if self.registry.send_to(id, &RealtimeMessage::new_alert(event)) {
                replayed += 1;
            }
        }
        debug!(%id, %area_id, replayed, "Eventos ativos reenviados");
        Ok(replayed)
    }

    pub fn leave_area(&self, id: ConnectionId, area_id: &str) -> bool {
        self.registry.leave(id, &Audience::Area(area_id.to_string()))
    }

    pub fn send_to(&self, id: ConnectionId, message: &RealtimeMessage) -> bool {
        self.registry.send_to(id, message)
    }

    pub fn audiences_of(&self, id: ConnectionId) -> Vec<Audience> {
        self.registry.audiences_of(id)
    }

    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }
}

impl RealtimePublisher for RealtimeHub {
    fn publish(&self, audience: &Audience, message: &RealtimeMessage) -> usize {
        let delivered = self.registry.broadcast(audience, message);
        debug!(%audience, delivered, "Mensagem publicada");
        delivered
    }
}
