use std::fmt;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Staff hierarchy. Declaration order is rank order, lowest first; exactly one
/// user may hold [`Role::Owner`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[sea_orm(string_value = "customer")]
    Customer,
    #[sea_orm(string_value = "editor")]
    Editor,
    #[sea_orm(string_value = "manager")]
    Manager,
    #[sea_orm(string_value = "admin")]
    Admin,
    #[sea_orm(string_value = "owner")]
    Owner,
}

impl Role {
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Editor => "editor",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    pub fn is_staff(self) -> bool {
        self > Role::Customer
    }

    pub fn at_least(self, min: Role) -> bool {
        self >= min
    }

    /// The role directly below this one. A replaced owner lands here.
    pub const fn demoted(self) -> Role {
        match self {
            Role::Owner => Role::Admin,
            Role::Admin => Role::Manager,
            Role::Manager => Role::Editor,
            Role::Editor | Role::Customer => Role::Customer,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chosen at login and baked into the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    #[default]
    Customer,
    Admin,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hierarchy_is_a_strict_total_order() {
        let ordered = [
            Role::Customer,
            Role::Editor,
            Role::Manager,
            Role::Admin,
            Role::Owner,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1]);
        }
        assert_eq!(ordered.iter().max(), Some(&Role::Owner));
    }

    #[test]
    fn staff_and_minimum_rank() {
        assert!(!Role::Customer.is_staff());
        assert!(Role::Editor.is_staff());
        assert!(Role::Owner.at_least(Role::Admin));
        assert!(!Role::Manager.at_least(Role::Admin));
    }

    #[test]
    fn demotion_moves_one_rank_down() {
        assert_eq!(Role::Owner.demoted(), Role::Admin);
        assert_eq!(Role::Admin.demoted(), Role::Manager);
        assert_eq!(Role::Customer.demoted(), Role::Customer);
    }

    #[test]
    fn session_mode_wire_format() {
        let mode: SessionMode = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(mode, SessionMode::Admin);
        assert_eq!(serde_json::to_string(&Role::Owner).unwrap(), "\"owner\"");
    }
}
