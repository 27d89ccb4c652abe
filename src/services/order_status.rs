//! Order status enum and the rules governing how it may change.
//!
//! Two independent tables exist:
//! * the delivery table, driven by staff through `PUT /orders/:id/status`
//!   (`taken -> delivering | finished`, `delivering -> delivered`,
//!   `delivered -> done`);
//! * the intake chain, driven by staff through `POST /orders/:id/intake`
//!   (`preorder -> pending -> confirmed -> taken`).
//!
//! Cancellation deletes the order, so no `cancelled` value is ever stored.

/// Name reported for an order that has been cancelled. Never stored.
pub const CANCELLED: &str = "cancelled";

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "preorder")]
    Preorder,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "finished")]
    Finished,
    #[sea_orm(string_value = "taken")]
    Taken,
    #[sea_orm(string_value = "delivering")]
    Delivering,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "done")]
    Done,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Preorder => "preorder",
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Finished => "finished",
            OrderStatus::Taken => "taken",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Done => "done",
        }
    }

    /// Orders the customer may still withdraw.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, OrderStatus::Preorder | OrderStatus::Pending)
    }

    /// Next step of the intake chain, `None` once the order is `taken` or
    /// has left the chain.
    pub fn next_intake(&self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Preorder => Some(OrderStatus::Pending),
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Taken),
            _ => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a status string names no known status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown order status: {}", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "preorder" => Ok(OrderStatus::Preorder),
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "finished" => Ok(OrderStatus::Finished),
            "taken" => Ok(OrderStatus::Taken),
            "delivering" => Ok(OrderStatus::Delivering),
            "delivered" => Ok(OrderStatus::Delivered),
            "done" => Ok(OrderStatus::Done),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// Staff-driven delivery transitions. Same-status requests are never valid.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Taken, Delivering) | (Taken, Finished) | (Delivering, Delivered) | (Delivered, Done)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;

    #[test]
    fn same_status_is_never_a_transition() {
        for status in OrderStatus::iter() {
            assert!(!is_valid_transition(status, status), "{status}");
        }
    }

    #[test]
    fn delivery_table() {
        use OrderStatus::*;
        assert!(is_valid_transition(Taken, Delivering));
        assert!(is_valid_transition(Taken, Finished));
        assert!(is_valid_transition(Delivering, Delivered));
        assert!(is_valid_transition(Delivered, Done));

        assert!(!is_valid_transition(Taken, Delivered));
        assert!(!is_valid_transition(Pending, Taken));
        assert!(!is_valid_transition(Confirmed, Delivering));
        assert!(!is_valid_transition(Done, Delivered));
        assert!(!is_valid_transition(Finished, Delivering));
    }

    #[test]
    fn only_pre_transit_orders_are_cancellable() {
        let cancellable: Vec<_> = OrderStatus::iter().filter(|s| s.is_cancellable()).collect();
        assert_eq!(cancellable, vec![OrderStatus::Preorder, OrderStatus::Pending]);
    }

    #[test]
    fn intake_chain_ends_at_taken() {
        let mut status = OrderStatus::Preorder;
        let mut visited = vec![status];
        while let Some(next) = status.next_intake() {
            visited.push(next);
            status = next;
        }
        assert_eq!(
            visited,
            vec![
                OrderStatus::Preorder,
                OrderStatus::Pending,
                OrderStatus::Confirmed,
                OrderStatus::Taken
            ]
        );
        assert_eq!(OrderStatus::Delivering.next_intake(), None);
    }

    #[test]
    fn parses_case_insensitively_and_round_trips_display() {
        for status in OrderStatus::iter() {
            assert_eq!(status.to_string().parse::<OrderStatus>(), Ok(status));
        }
        assert_eq!("TAKEN".parse::<OrderStatus>(), Ok(OrderStatus::Taken));
        assert!("cancelled".parse::<OrderStatus>().is_err());
    }
}
