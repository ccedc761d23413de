use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Order, OrderItem, OrderStatus, PaymentStatus};

/// Customer self-order from a table session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub customer_name: String,
    pub customer_email: Option<String>,
}

/// Order placed by staff on behalf of a customer.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StaffCheckoutRequest {
    pub customer_name: String,
    pub customer_email: Option<String>,
    /// Overrides the table attached to the session.
    pub table_number: Option<String>,
    #[serde(default)]
    pub discount: Decimal,
    pub payment_status: Option<PaymentStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EmailBillRequest {
    pub to: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlacedOrder {
    pub order: Order,
    pub items: Vec<OrderItem>,
    /// True when the bill was handed to the mail relay.
    pub bill_emailed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmailBillResult {
    pub order_id: String,
    pub to: String,
    pub sent: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}
