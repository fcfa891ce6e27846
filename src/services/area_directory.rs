// src/services/area_directory.rs

use std::collections::HashSet;

use async_trait::async_trait;

use crate::common::error::AppError;

/// Diretório de áreas válidas, consultado apenas no disparo do alerta.
#[async_trait]
pub trait AreaDirectory: Send + Sync {
    async fn is_known_area(&self, area_id: &str) -> Result<bool, AppError>;
}

// Lista fixa vinda da configuração (KNOWN_AREAS)
#[derive(Debug, Clone)]
pub struct StaticAreaDirectory {
    areas: HashSet<String>,
}

impl StaticAreaDirectory {
    pub fn new<I, S>(areas: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            areas: areas.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl AreaDirectory for StaticAreaDirectory {
    async fn is_known_area(&self, area_id: &str) -> Result<bool, AppError> {
        Ok(self.areas.contains(area_id))
    }
}
