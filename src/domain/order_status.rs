use std::{fmt, str::FromStr};

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub const CONFIRMATION_MESSAGE: &str = "Order confirmed. Preparing shipment.";
pub const CONFIRMATION_LOCATION: &str = "China";

/// Fulfillment status of an order. The wire strings are persisted as-is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum OrderStatus {
    #[sea_orm(string_value = "CONFIRMED")]
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[sea_orm(string_value = "PROCESSING")]
    #[serde(rename = "PROCESSING")]
    Processing,
    #[sea_orm(string_value = "SHIPPED_CHINA")]
    #[serde(rename = "SHIPPED_CHINA")]
    ShippedFromOrigin,
    #[sea_orm(string_value = "IN_TRANSIT")]
    #[serde(rename = "IN_TRANSIT")]
    InTransit,
    #[sea_orm(string_value = "ARRIVED_BD")]
    #[serde(rename = "ARRIVED_BD")]
    ArrivedAtDestination,
    #[sea_orm(string_value = "OUT_FOR_DELIVERY")]
    #[serde(rename = "OUT_FOR_DELIVERY")]
    OutForDelivery,
    #[sea_orm(string_value = "DELIVERED")]
    #[serde(rename = "DELIVERED")]
    Delivered,
    #[sea_orm(string_value = "CANCELED")]
    #[serde(rename = "CANCELED")]
    Canceled,
}

/// The linear delivery chain; `Canceled` sits outside it.
const CHAIN: [OrderStatus; 7] = [
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::ShippedFromOrigin,
    OrderStatus::InTransit,
    OrderStatus::ArrivedAtDestination,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
];

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Confirmed,
        OrderStatus::Processing,
        OrderStatus::ShippedFromOrigin,
        OrderStatus::InTransit,
        OrderStatus::ArrivedAtDestination,
        OrderStatus::OutForDelivery,
        OrderStatus::Delivered,
        OrderStatus::Canceled,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Confirmed => "CONFIRMED",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::ShippedFromOrigin => "SHIPPED_CHINA",
            OrderStatus::InTransit => "IN_TRANSIT",
            OrderStatus::ArrivedAtDestination => "ARRIVED_BD",
            OrderStatus::OutForDelivery => "OUT_FOR_DELIVERY",
            OrderStatus::Delivered => "DELIVERED",
            OrderStatus::Canceled => "CANCELED",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Canceled)
    }

    fn chain_position(self) -> Option<usize> {
        CHAIN.iter().position(|s| *s == self)
    }

    /// Forward along the chain (skipping stages is fine) or cancellation from
    /// any non-terminal state.
    pub fn can_advance_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if next == OrderStatus::Canceled {
            return true;
        }
        match (self.chain_position(), next.chain_position()) {
            (Some(from), Some(to)) => to > from,
            _ => false,
        }
    }

    pub fn allowed_next(self) -> Vec<OrderStatus> {
        Self::ALL
            .into_iter()
            .filter(|next| self.can_advance_to(*next))
            .collect()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn status_change_message(status: OrderStatus) -> String {
    format!("Status updated to {status}")
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "FAILED")]
    Failed,
}

/// How staff status changes are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any status may follow any other, so staff can correct mistakes.
    #[default]
    Permissive,
    /// Only [`OrderStatus::can_advance_to`] transitions are accepted.
    ForwardOnly,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Cannot move order from {from} to {to}; allowed next: {}", list_or_none(.allowed))]
pub struct IllegalTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub allowed: Vec<OrderStatus>,
}

fn list_or_none(statuses: &[OrderStatus]) -> String {
    if statuses.is_empty() {
        return "none".to_string();
    }
    statuses
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl TransitionPolicy {
    pub fn check(self, from: OrderStatus, to: OrderStatus) -> Result<(), IllegalTransition> {
        match self {
            TransitionPolicy::Permissive => Ok(()),
            TransitionPolicy::ForwardOnly if from.can_advance_to(to) => Ok(()),
            TransitionPolicy::ForwardOnly => Err(IllegalTransition {
                from,
                to,
                allowed: from.allowed_next(),
            }),
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(TransitionPolicy::Permissive),
            "forward_only" | "forward-only" => Ok(TransitionPolicy::ForwardOnly),
            other => Err(anyhow::anyhow!("unknown transition policy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_the_wire_name() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn serde_uses_persisted_names() {
        let json = serde_json::to_string(&OrderStatus::ShippedFromOrigin).unwrap();
        assert_eq!(json, "\"SHIPPED_CHINA\"");
        let parsed: OrderStatus = serde_json::from_str("\"ARRIVED_BD\"").unwrap();
        assert_eq!(parsed, OrderStatus::ArrivedAtDestination);
        let paid = serde_json::to_string(&PaymentStatus::Paid).unwrap();
        assert_eq!(paid, "\"PAID\"");
    }

    #[test]
    fn terminal_states() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Canceled.is_terminal());
        assert!(!OrderStatus::OutForDelivery.is_terminal());
    }

    #[test]
    fn forward_moves_and_cancellation_are_allowed() {
        assert!(OrderStatus::Confirmed.can_advance_to(OrderStatus::Processing));
        assert!(OrderStatus::Confirmed.can_advance_to(OrderStatus::InTransit));
        assert!(OrderStatus::InTransit.can_advance_to(OrderStatus::Canceled));
        assert!(!OrderStatus::InTransit.can_advance_to(OrderStatus::Processing));
        assert!(!OrderStatus::Processing.can_advance_to(OrderStatus::Processing));
        assert!(!OrderStatus::Delivered.can_advance_to(OrderStatus::Canceled));
        assert!(OrderStatus::Canceled.allowed_next().is_empty());
        assert_eq!(
            OrderStatus::OutForDelivery.allowed_next(),
            vec![OrderStatus::Delivered, OrderStatus::Canceled]
        );
    }

    #[test]
    fn permissive_policy_accepts_regressions() {
        let policy = TransitionPolicy::Permissive;
        assert!(policy.check(OrderStatus::Delivered, OrderStatus::Processing).is_ok());
        assert!(policy.check(OrderStatus::Canceled, OrderStatus::Confirmed).is_ok());
    }

    #[test]
    fn forward_only_policy_rejects_regressions() {
        let policy = TransitionPolicy::ForwardOnly;
        assert!(policy.check(OrderStatus::Confirmed, OrderStatus::ShippedFromOrigin).is_ok());
        let err = policy
            .check(OrderStatus::Delivered, OrderStatus::Processing)
            .unwrap_err();
        assert!(err.allowed.is_empty());
        assert_eq!(
            err.to_string(),
            "Cannot move order from DELIVERED to PROCESSING; allowed next: none"
        );

        let err = policy
            .check(OrderStatus::OutForDelivery, OrderStatus::InTransit)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot move order from OUT_FOR_DELIVERY to IN_TRANSIT; allowed next: DELIVERED, CANCELED"
        );
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("permissive".parse::<TransitionPolicy>().unwrap(), TransitionPolicy::Permissive);
        assert_eq!(
            "FORWARD_ONLY".parse::<TransitionPolicy>().unwrap(),
            TransitionPolicy::ForwardOnly
        );
        assert!("strict".parse::<TransitionPolicy>().is_err());
    }

    #[test]
    fn status_change_message_names_the_status() {
        assert_eq!(
            status_change_message(OrderStatus::ShippedFromOrigin),
            "Status updated to SHIPPED_CHINA"
        );
    }
}
