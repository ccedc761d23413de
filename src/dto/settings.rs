use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    pub cafe_name: String,
    pub menu_url: String,
    pub tax_rate: Decimal,
    pub service_charge_rate: Decimal,
    pub currency: Option<String>,
}
