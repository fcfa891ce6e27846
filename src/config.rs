// src/config.rs

use std::{env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{CheckinStore, PgCheckinStore},
    realtime::{ConnectionRegistry, RealtimeHub, RealtimePublisher},
    services::{
        alert_service::AlertService,
        area_directory::{AreaDirectory, StaticAreaDirectory},
        auth::TokenService,
        push::{HttpPushGateway, LoggingPushNotifier, PushNotifier},
        response_service::ResponseService,
        status_service::StatusService,
    },
};

// Configuração lida do ambiente (.env opcional)
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub db_max_connections: u32,
    pub push_gateway_url: Option<String>,
    pub push_timeout: Duration,
    /// Vazio: as áreas válidas vêm da tabela `areas`
    pub known_areas: Vec<String>,
    pub realtime_buffer: usize,
}

fn var_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} tem um valor inválido: '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;

        let push_gateway_url = env::var("PUSH_GATEWAY_URL")
            .ok()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        let known_areas = env::var("KNOWN_AREAS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr: var_or("BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", 5)?,
            push_gateway_url,
            push_timeout: Duration::from_millis(var_or("PUSH_TIMEOUT_MS", 3000)?),
            known_areas,
            realtime_buffer: var_or("REALTIME_BUFFER", 64)?,
        })
    }
}

pub async fn connect_database(settings: &Settings) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.db_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&settings.database_url)
        .await
        .context("Falha ao conectar ao banco de dados")?;

    tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");
    Ok(pool)
}

#[derive(Clone)]
pub struct AppState {
    pub token_service: TokenService,
    pub alert_service: AlertService,
    pub response_service: ResponseService,
    pub status_service: StatusService,
    pub hub: Arc<RealtimeHub>,
}

impl AppState {
    pub fn new(settings: &Settings, pool: PgPool) -> anyhow::Result<Self> {
        let pg_store = Arc::new(PgCheckinStore::new(pool));

        let areas: Arc<dyn AreaDirectory> = if settings.known_areas.is_empty() {
            pg_store.clone()
        } else {
            Arc::new(StaticAreaDirectory::new(settings.known_areas.iter().cloned()))
        };

        let push: Arc<dyn PushNotifier> = match &settings.push_gateway_url {
            Some(url) => Arc::new(
                HttpPushGateway::new(url.clone(), settings.push_timeout)
                    .context("Falha ao montar o cliente de push")?,
            ),
            None => {
                tracing::warn!("PUSH_GATEWAY_URL ausente: push apenas registrado em log");
                Arc::new(LoggingPushNotifier)
            }
        };

        Ok(Self::from_parts(
            pg_store,
            areas,
            push,
            settings.jwt_secret.clone(),
            settings.realtime_buffer,
            settings.push_timeout,
        ))
    }

    // --- Monta o gráfico de dependências ---
    pub fn from_parts(
        store: Arc<dyn CheckinStore>,
        areas: Arc<dyn AreaDirectory>,
        push: Arc<dyn PushNotifier>,
        jwt_secret: String,
        realtime_buffer: usize,
        push_timeout: Duration,
    ) -> Self {
        let hub = Arc::new(RealtimeHub::new(
            ConnectionRegistry::new(),
            store.clone(),
            realtime_buffer,
        ));
        let publisher: Arc<dyn RealtimePublisher> = hub.clone();

        Self {
            token_service: TokenService::new(store.clone(), jwt_secret),
            alert_service: AlertService::new(
                store.clone(),
                areas,
                push,
                publisher.clone(),
                push_timeout,
            ),
            response_service: ResponseService::new(store.clone(), publisher),
            status_service: StatusService::new(store),
            hub,
        }
    }
}
