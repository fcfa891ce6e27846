//! Coalescer de atualizações do lado do cliente
//!
//! Rajadas de `response-update` viram uma única atualização por chave depois
//! de uma janela de debounce. `new-alert` nunca espera: é um incidente novo.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::realtime::messages::RealtimeMessage;

/// O que deve ser recarregado do servidor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RefreshKey {
    ActiveSummary,
    EventStatus(Uuid),
}

impl fmt::Display for RefreshKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshKey::ActiveSummary => write!(f, "active-summary"),
            RefreshKey::EventStatus(id) => write!(f, "event-status-{}", id),
        }
    }
}

/// Ações emitidas para a camada de apresentação do cliente.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    Refresh(RefreshKey),
    NewAlert {
        event_id: Uuid,
        area_id: String,
        triggered_at: DateTime<Utc>,
    },
}

#[derive(Debug, Clone)]
pub struct CoalescerConfig {
    /// Janela de debounce
    pub window: Duration,
    /// Espera máxima desde a primeira chave pendente
    pub max_wait: Duration,
    pub channel_buffer: usize,
}

impl Default for CoalescerConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(1),
            max_wait: Duration::from_secs(5),
            channel_buffer: 256,
        }
    }
}

#[derive(Debug)]
enum CoalescerState {
    Idle,
    Pending {
        keys: BTreeSet<RefreshKey>,
        started: Instant,
        deadline: Instant,
    },
}

/// Handle para alimentar o coalescer. Ao descartar todos os handles, as chaves
/// pendentes são descarregadas e a task termina.
#[derive(Clone)]
pub struct CoalescerHandle {
    tx: mpsc::Sender<RealtimeMessage>,
}

impl CoalescerHandle {
    pub async fn push(&self, message: RealtimeMessage) -> bool {
        self.tx.send(message).await.is_ok()
    }
}

/// Ator dono do estado {Idle, Pending}. Nenhum timer é compartilhado entre threads.
pub struct UpdateCoalescer {
    config: CoalescerConfig,
    rx: mpsc::Receiver<RealtimeMessage>,
    out: mpsc::Sender<ClientAction>,
    state: CoalescerState,
}

impl UpdateCoalescer {
    pub fn spawn(config: CoalescerConfig, out: mpsc::Sender<ClientAction>) -> (CoalescerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.channel_buffer.max(1));
        let coalescer = Self {
            config,
            rx,
            out,
            state: CoalescerState::Idle,
        };
        let task = tokio::spawn(coalescer.run());
        (CoalescerHandle { tx }, task)
    }

    async fn run(mut self) {
        loop {
            let deadline = match &self.state {
                CoalescerState::Pending { deadline, .. } => Some(*deadline),
                CoalescerState::Idle => None,
            };

            tokio::select! {
                message = self.rx.recv() => match message {
                    Some(message) => {
                        if !self.on_message(message).await {
                            break;
                        }
                    }
                    None => {
                        self.flush().await;
                        break;
                    }
                },
                _ = wait_for(deadline) => {
                    self.flush().await;
                }
            }
        }
        debug!("UpdateCoalescer: encerrado");
    }

    // Retorna false quando o consumidor das ações desapareceu
    async fn on_message(&mut self, message: RealtimeMessage) -> bool {
        match message {
            RealtimeMessage::NewAlert {
                event_id,
                area_id,
                triggered_at,
            } => {
                let action = ClientAction::NewAlert {
                    event_id,
                    area_id,
                    triggered_at,
                };
                self.out.send(action).await.is_ok()
            }
            RealtimeMessage::ResponseUpdate { event_id, .. } | RealtimeMessage::EventCompleted { event_id, .. } => {
                self.schedule([RefreshKey::EventStatus(event_id), RefreshKey::ActiveSummary]);
                true
            }
            RealtimeMessage::Pong => true,
        }
    }

    fn schedule<I>(&mut self, new_keys: I)
    where
        I: IntoIterator<Item = RefreshKey>,
    {
        let now = Instant::now();
        match &mut self.state {
            CoalescerState::Idle => {
                self.state = CoalescerState::Pending {
                    keys: new_keys.into_iter().collect(),
                    started: now,
                    deadline: now + self.config.window,
                };
            }
            CoalescerState::Pending {
                keys,
                started,
                deadline,
            } => {
                keys.extend(new_keys);
                // Estende a janela, mas nunca além de started + max_wait
                let cap = *started + self.config.max_wait.max(self.config.window);
                *deadline = (now + self.config.window).min(cap);
            }
        }
    }

    async fn flush(&mut self) {
        let state = std::mem::replace(&mut self.state, CoalescerState::Idle);
        if let CoalescerState::Pending { keys, .. } = state {
            debug!(count = keys.len(), "UpdateCoalescer: descarregando chaves");
            for key in keys {
                if self.out.send(ClientAction::Refresh(key)).await.is_err() {
                    warn!("UpdateCoalescer: consumidor fechado, atualizações descartadas");
                    return;
                }
            }
        }
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}
