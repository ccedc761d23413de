use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("unknown {kind} `{value}`")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

/// String-backed enums stored as TEXT columns.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ParseEnumError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

text_enum!(OrderStatus, "order status", {
    Pending => "Pending",
    Preparing => "Preparing",
    Ready => "Ready",
    Completed => "Completed",
    Cancelled => "Cancelled",
});

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    fn rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Preparing => Some(1),
            OrderStatus::Ready => Some(2),
            OrderStatus::Completed => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    /// Forward moves along Pending → Preparing → Ready → Completed (skipping
    /// ahead is fine) and cancellation of anything not yet terminal.
    /// Staying on the same status is always allowed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if *self == next {
            return true;
        }
        if self.is_terminal() {
            return false;
        }
        match (self.rank(), next.rank()) {
            (_, None) => true,
            (Some(from), Some(to)) => to > from,
            (None, Some(_)) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
    Partial,
}

text_enum!(PaymentStatus, "payment status", {
    Unpaid => "Unpaid",
    Paid => "Paid",
    Partial => "Partial",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TableStatus {
    Available,
    Occupied,
    Reserved,
}

text_enum!(TableStatus, "table status", {
    Available => "Available",
    Occupied => "Occupied",
    Reserved => "Reserved",
});

/// Top-level menu group; decides the id prefix of new items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MenuSection {
    Beverages,
    Food,
}

text_enum!(MenuSection, "menu section", {
    Beverages => "beverages",
    Food => "food",
});

impl MenuSection {
    pub fn id_prefix(&self) -> &'static str {
        match self {
            MenuSection::Beverages => "BEV",
            MenuSection::Food => "FOOD",
        }
    }

    pub fn format_id(&self, number: i64) -> String {
        format!("{}{:03}", self.id_prefix(), number)
    }
}

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_STAFF: &str = "staff";

#[derive(Debug, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MenuItem {
    pub id: String,
    pub section: MenuSection,
    pub name: String,
    pub price: Decimal,
    pub category: String,
    pub available: bool,
    pub description: String,
    pub inventory: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct OrderSession {
    pub id: Uuid,
    pub table_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartLine {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: String,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub table_number: Option<String>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub tax: Decimal,
    pub service_charge: Decimal,
    pub total: Decimal,
    pub tax_rate: Decimal,
    pub service_charge_rate: Decimal,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub timestamp: DateTime<Utc>,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, sqlx::FromRow)]
pub struct Table {
    pub table_number: String,
    #[sqlx(try_from = "String")]
    pub status: TableStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Settings {
    pub cafe_name: String,
    pub menu_url: String,
    pub tax_rate: Decimal,
    pub service_charge_rate: Decimal,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_moves_forward_and_can_skip_ahead() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Preparing));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Ready));
        assert!(OrderStatus::Ready.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Ready.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn cancellation_only_from_open_orders() {
        assert!(OrderStatus::Preparing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn same_status_is_always_allowed() {
        for status in OrderStatus::ALL {
            assert!(status.can_transition_to(*status));
        }
    }

    #[test]
    fn enums_round_trip_through_text() {
        assert_eq!("Partial".parse::<PaymentStatus>().unwrap(), PaymentStatus::Partial);
        assert_eq!("beverages".parse::<MenuSection>().unwrap(), MenuSection::Beverages);
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn menu_ids_are_prefixed_and_padded() {
        assert_eq!(MenuSection::Beverages.format_id(6), "BEV006");
        assert_eq!(MenuSection::Food.format_id(12), "FOOD012");
    }
}
