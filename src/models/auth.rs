// src/models/auth.rs

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Member,
    Supervisor,
}

// Representa um usuário vindo do diretório (somente leitura para o núcleo)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub area_id: String,
    pub role: Role,
    pub supervised_areas: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_supervisor(&self) -> bool {
        self.role == Role::Supervisor
    }

    /// Áreas visíveis para este usuário: `supervised_areas`, ou a própria área se vazio.
    ///
    /// É um conjunto: repetições vindas do `TEXT[]` aparecem uma vez só, na ordem original.
    pub fn scope_areas(&self) -> Vec<String> {
        if self.supervised_areas.is_empty() {
            return vec![self.area_id.clone()];
        }
        let mut seen = HashSet::new();
        self.supervised_areas
            .iter()
            .filter(|a| seen.insert(a.as_str()))
            .cloned()
            .collect()
    }

    pub fn can_see_area(&self, area_id: &str) -> bool {
        if self.supervised_areas.is_empty() {
            self.area_id == area_id
        } else {
            self.supervised_areas.iter().any(|a| a == area_id)
        }
    }

    /// Um alerta da área se aplica ao usuário apenas se ele for membro dela.
    pub fn is_member_of(&self, area_id: &str) -> bool {
        self.role == Role::Member && self.area_id == area_id
    }
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role, area: &str, supervised: &[&str]) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ana".into(),
            phone: None,
            area_id: area.into(),
            role,
            supervised_areas: supervised.iter().map(|s| s.to_string()).collect(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn empty_supervised_areas_defaults_to_home_area() {
        let u = user(Role::Supervisor, "north", &[]);
        assert_eq!(u.scope_areas(), vec!["north".to_string()]);
        assert!(u.can_see_area("north"));
        assert!(!u.can_see_area("south"));
    }

    #[test]
    fn supervised_areas_replace_home_area() {
        let u = user(Role::Supervisor, "hq", &["north", "south"]);
        assert_eq!(u.scope_areas().len(), 2);
        assert!(u.can_see_area("south"));
        assert!(!u.can_see_area("hq"));
    }

    #[test]
    fn repeated_supervised_areas_count_once() {
        let u = user(Role::Supervisor, "hq", &["north", "south", "north"]);
        assert_eq!(u.scope_areas(), vec!["north".to_string(), "south".to_string()]);
    }

    #[test]
    fn supervisors_are_not_members() {
        let u = user(Role::Supervisor, "north", &[]);
        assert!(!u.is_member_of("north"));
        let m = user(Role::Member, "north", &[]);
        assert!(m.is_member_of("north"));
        assert!(!m.is_member_of("south"));
    }
}
