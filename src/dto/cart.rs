use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{models::CartLine, services::billing::Totals};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub menu_item_id: String,
    pub quantity: i32,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct StartSessionRequest {
    pub table_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub session_id: uuid::Uuid,
    pub table_number: Option<String>,
    pub lines: Vec<CartLine>,
    /// Preview with no discount and the current rates.
    pub totals: Totals,
}
