use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AnalyticsQuery {
    /// Inclusive, defaults to the first day of the current month.
    pub start: Option<NaiveDate>,
    /// Inclusive, defaults to today.
    pub end: Option<NaiveDate>,
    /// Number of best sellers to report, default 10.
    pub top: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyRevenue {
    pub date: NaiveDate,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ItemSales {
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SalesSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_revenue: Decimal,
    pub order_count: i64,
    pub average_order_value: Decimal,
    pub daily_revenue: Vec<DailyRevenue>,
    pub top_items: Vec<ItemSales>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Dashboard {
    pub total_menu_items: i64,
    pub total_orders: i64,
    pub today_orders: i64,
    pub today_revenue: Decimal,
}
