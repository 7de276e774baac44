//! Status enums and the order workflow.
//!
//! A book project starts life `in_cart` and unpaid. Checkout flips it to paid
//! and `pending`, after which staff walk it through shipment:
//!
//! ```text
//! in_cart ──checkout──▶ pending ──prepare──▶ prepared_for_shipment ──▶ shipped ──▶ delivered
//!    │                     │                          │
//!    └──────────────▶ cancelled ◀─────────────────────┘
//! ```
//!
//! `delivered` and `cancelled` are terminal.

use serde::{Deserialize, Serialize};

/// Profile account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    Personal,
    Business,
}

impl AccountType {
    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Business => "business",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(Self::Personal),
            "business" => Ok(Self::Business),
            _ => Err(format!("invalid account type: {s}")),
        }
    }
}

/// Whether a book project has been paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

impl PaymentStatus {
    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unpaid" => Ok(Self::Unpaid),
            "paid" => Ok(Self::Paid),
            _ => Err(format!("invalid payment status: {s}")),
        }
    }
}

/// Order status of a book project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Uploaded, not yet paid for.
    #[default]
    InCart,
    /// Paid, waiting for production.
    Pending,
    /// Packed and handed to staff for dispatch.
    PreparedForShipment,
    Shipped,
    Delivered,
    Cancelled,
}

/// Who is asking for a status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionActor {
    /// The customer who owns the project.
    Owner,
    /// A staff member using the admin endpoints.
    Staff,
    /// The checkout flow after a successful payment.
    Checkout,
}

/// A rejected status change.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionError {
    /// The move is not in the workflow at all.
    #[error("cannot move an order from {from} to {to}")]
    Illegal { from: OrderStatus, to: OrderStatus },
    /// The move exists but this actor may not make it.
    #[error("not allowed to move an order from {from} to {to}")]
    NotPermitted { from: OrderStatus, to: OrderStatus },
    /// Source status is terminal.
    #[error("order is already {0}")]
    Terminal(OrderStatus),
}

impl OrderStatus {
    /// Every status, in workflow order.
    pub const ALL: [Self; 6] = [
        Self::InCart,
        Self::Pending,
        Self::PreparedForShipment,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Wire and storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InCart => "in_cart",
            Self::Pending => "pending",
            Self::PreparedForShipment => "prepared_for_shipment",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// Terminal statuses accept no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Statuses shown on the staff shipment board.
    #[must_use]
    pub const fn is_in_shipment(self) -> bool {
        matches!(self, Self::PreparedForShipment | Self::Shipped)
    }

    /// Actors allowed to make the `self -> to` move, or `None` if the move is
    /// not part of the workflow.
    const fn allowed_actors(self, to: Self) -> Option<&'static [TransitionActor]> {
        use TransitionActor::{Checkout, Owner, Staff};

        match (self, to) {
            (Self::InCart, Self::Pending) => Some(&[Checkout]),
            (Self::InCart | Self::Pending, Self::Cancelled) => Some(&[Owner, Staff]),
            (Self::Pending, Self::PreparedForShipment)
            | (Self::PreparedForShipment, Self::Shipped | Self::Cancelled)
            | (Self::Shipped, Self::Delivered) => Some(&[Staff]),
            _ => None,
        }
    }

    /// Check a status change and return the new status.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Terminal`] when `self` is terminal,
    /// [`TransitionError::Illegal`] when the move is not in the workflow
    /// (including a move to the same status), and
    /// [`TransitionError::NotPermitted`] when `actor` may not make it.
    pub fn transition(self, to: Self, actor: TransitionActor) -> Result<Self, TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal(self));
        }

        let actors = self
            .allowed_actors(to)
            .ok_or(TransitionError::Illegal { from: self, to })?;

        if !actors.contains(&actor) {
            return Err(TransitionError::NotPermitted { from: self, to });
        }

        Ok(to)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::TransitionActor::{Checkout, Owner, Staff};
    use super::*;

    #[test]
    fn test_checkout_moves_cart_to_pending() {
        assert_eq!(
            OrderStatus::InCart.transition(OrderStatus::Pending, Checkout),
            Ok(OrderStatus::Pending)
        );
        assert!(matches!(
            OrderStatus::InCart.transition(OrderStatus::Pending, Owner),
            Err(TransitionError::NotPermitted { .. })
        ));
    }

    #[test]
    fn test_owner_may_only_cancel_before_shipment() {
        assert!(
            OrderStatus::Pending
                .transition(OrderStatus::Cancelled, Owner)
                .is_ok()
        );
        assert!(matches!(
            OrderStatus::PreparedForShipment.transition(OrderStatus::Cancelled, Owner),
            Err(TransitionError::NotPermitted { .. })
        ));
        assert!(matches!(
            OrderStatus::Pending.transition(OrderStatus::Shipped, Owner),
            Err(TransitionError::Illegal { .. })
        ));
    }

    #[test]
    fn test_staff_walks_shipment() {
        let status = OrderStatus::Pending
            .transition(OrderStatus::PreparedForShipment, Staff)
            .unwrap();
        let status = status.transition(OrderStatus::Shipped, Staff).unwrap();
        let status = status.transition(OrderStatus::Delivered, Staff).unwrap();
        assert_eq!(status, OrderStatus::Delivered);
    }

    #[test]
    fn test_re_preparing_is_rejected() {
        assert_eq!(
            OrderStatus::PreparedForShipment.transition(OrderStatus::PreparedForShipment, Staff),
            Err(TransitionError::Illegal {
                from: OrderStatus::PreparedForShipment,
                to: OrderStatus::PreparedForShipment,
            })
        );
    }

    #[test]
    fn test_terminal_statuses_are_final() {
        for to in OrderStatus::ALL {
            assert_eq!(
                OrderStatus::Cancelled.transition(to, Staff),
                Err(TransitionError::Terminal(OrderStatus::Cancelled))
            );
            assert_eq!(
                OrderStatus::Delivered.transition(to, Staff),
                Err(TransitionError::Terminal(OrderStatus::Delivered))
            );
        }
    }

    #[test]
    fn test_cannot_skip_preparation() {
        assert!(matches!(
            OrderStatus::Pending.transition(OrderStatus::Shipped, Staff),
            Err(TransitionError::Illegal { .. })
        ));
    }

    #[test]
    fn test_status_strings_round_trip() {
        for status in OrderStatus::ALL {
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
        assert!("archived".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_account_type_parse() {
        assert_eq!(
            "business".parse::<AccountType>().unwrap(),
            AccountType::Business
        );
        assert!("enterprise".parse::<AccountType>().is_err());
    }
}
