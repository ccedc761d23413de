use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Local, NaiveDate};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter};

use crate::{
    dto::{
        analytics::{AnalyticsQuery, DailyRevenue, Dashboard, ItemSales, SalesSummary},
        orders::OrderWithItems,
    },
    entity::{MenuItems, Orders, orders::Column as OrderCol},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_staff},
    response::{ApiResponse, Meta},
    services::{billing::round_money, order_service},
    state::AppState,
};

const DEFAULT_TOP: usize = 10;

/// Aggregate the orders dated within `[start, end]`.
///
/// Top items are grouped by name and ordered by quantity sold, ties broken
/// alphabetically.
pub fn summarize(
    orders: &[OrderWithItems],
    start: NaiveDate,
    end: NaiveDate,
    top: usize,
) -> SalesSummary {
    let mut total_revenue = Decimal::ZERO;
    let mut order_count: i64 = 0;
    let mut daily: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
    let mut sold: HashMap<&str, i64> = HashMap::new();

    for entry in orders
        .iter()
        .filter(|o| o.order.date >= start && o.order.date <= end)
    {
        total_revenue += entry.order.total;
        order_count += 1;
        *daily.entry(entry.order.date).or_default() += entry.order.total;
        for item in &entry.items {
            *sold.entry(item.name.as_str()).or_default() += i64::from(item.quantity);
        }
    }

    let average_order_value = if order_count == 0 {
        Decimal::ZERO
    } else {
        round_money(total_revenue / Decimal::from(order_count))
    };

    let mut top_items: Vec<ItemSales> = sold
        .into_iter()
        .map(|(name, quantity)| ItemSales {
            name: name.to_string(),
            quantity,
        })
        .collect();
    top_items.sort_by(|a, b| b.quantity.cmp(&a.quantity).then_with(|| a.name.cmp(&b.name)));
    top_items.truncate(top);

    SalesSummary {
        start,
        end,
        total_revenue,
        order_count,
        average_order_value,
        daily_revenue: daily
            .into_iter()
            .map(|(date, revenue)| DailyRevenue { date, revenue })
            .collect(),
        top_items,
    }
}

fn resolve_range(query: &AnalyticsQuery, today: NaiveDate) -> AppResult<(NaiveDate, NaiveDate)> {
    let start = query.start.unwrap_or_else(|| today.with_day(1).unwrap_or(today));
    let end = query.end.unwrap_or(today);
    if start > end {
        return Err(AppError::BadRequest(format!(
            "start {start} is after end {end}"
        )));
    }
    Ok((start, end))
}

pub async fn sales_summary(
    state: &AppState,
    user: &AuthUser,
    query: AnalyticsQuery,
) -> AppResult<ApiResponse<SalesSummary>> {
    ensure_admin(user)?;
    let (start, end) = resolve_range(&query, Local::now().date_naive())?;
    let top = query.top.unwrap_or(DEFAULT_TOP);

    let orders = order_service::load_orders_with_items(
        &state.orm,
        Condition::all()
            .add(OrderCol::OrderDate.gte(start))
            .add(OrderCol::OrderDate.lte(end)),
    )
    .await?;

    let summary = summarize(&orders, start, end, top);
    let total = summary.order_count;
    Ok(ApiResponse::success(
        "Sales summary",
        summary,
        Some(Meta::new(1, total, total)),
    ))
}

pub async fn dashboard(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Dashboard>> {
    ensure_staff(user)?;
    let today = Local::now().date_naive();

    let total_menu_items = MenuItems::find().count(&state.orm).await? as i64;
    let total_orders = Orders::find().count(&state.orm).await? as i64;

    let todays = Orders::find()
        .filter(OrderCol::OrderDate.eq(today))
        .all(&state.orm)
        .await?;
    let today_revenue = todays.iter().map(|o| o.total).sum();

    Ok(ApiResponse::success(
        "Dashboard",
        Dashboard {
            total_menu_items,
            total_orders,
            today_orders: todays.len() as i64,
            today_revenue,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, OrderItem, OrderStatus, PaymentStatus};
    use chrono::{NaiveTime, Utc};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn order(day: u32, total: &str, items: &[(&str, i32)]) -> OrderWithItems {
        let now = Utc::now();
        OrderWithItems {
            order: Order {
                id: format!("ORD{day:05}"),
                customer_name: "Guest".into(),
                customer_email: None,
                table_number: None,
                subtotal: dec(total),
                discount: Decimal::ZERO,
                tax: Decimal::ZERO,
                service_charge: Decimal::ZERO,
                total: dec(total),
                tax_rate: Decimal::ZERO,
                service_charge_rate: Decimal::ZERO,
                date: date(day),
                time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                timestamp: now,
                status: OrderStatus::Completed,
                payment_status: PaymentStatus::Paid,
                updated_at: now,
            },
            items: items
                .iter()
                .map(|(name, quantity)| OrderItem {
                    menu_item_id: name.to_uppercase(),
                    name: name.to_string(),
                    unit_price: Decimal::ONE,
                    quantity: *quantity,
                    subtotal: Decimal::from(*quantity),
                })
                .collect(),
        }
    }

    #[test]
    fn ties_in_top_items_are_alphabetical() {
        let orders = vec![
            order(1, "3.00", &[("Tea", 3)]),
            order(2, "7.00", &[("Tea", 2), ("Cake", 5)]),
        ];
        let summary = summarize(&orders, date(1), date(30), 10);
        assert_eq!(
            summary.top_items,
            vec![
                ItemSales { name: "Cake".into(), quantity: 5 },
                ItemSales { name: "Tea".into(), quantity: 5 },
            ]
        );
    }

    #[test]
    fn only_orders_in_range_count() {
        let orders = vec![
            order(1, "10.00", &[("Latte", 1)]),
            order(5, "20.00", &[("Latte", 2)]),
            order(5, "5.00", &[("Bagel", 1)]),
            order(9, "99.00", &[("Bagel", 9)]),
        ];
        let summary = summarize(&orders, date(1), date(5), 1);

        assert_eq!(summary.order_count, 3);
        assert_eq!(summary.total_revenue, dec("35.00"));
        assert_eq!(summary.average_order_value, dec("11.67"));
        assert_eq!(
            summary.daily_revenue,
            vec![
                DailyRevenue { date: date(1), revenue: dec("10.00") },
                DailyRevenue { date: date(5), revenue: dec("25.00") },
            ]
        );
        assert_eq!(summary.top_items.len(), 1);
        assert_eq!(summary.top_items[0].name, "Latte");
    }

    #[test]
    fn empty_range_has_zero_average() {
        let summary = summarize(&[], date(1), date(2), 10);
        assert_eq!(summary.order_count, 0);
        assert_eq!(summary.average_order_value, Decimal::ZERO);
        assert!(summary.top_items.is_empty());
    }

    #[test]
    fn range_defaults_to_month_to_date_and_rejects_inverted() {
        let today = date(17);
        let (start, end) = resolve_range(&AnalyticsQuery::default(), today).unwrap();
        assert_eq!((start, end), (date(1), date(17)));

        let inverted = AnalyticsQuery {
            start: Some(date(10)),
            end: Some(date(3)),
            top: None,
        };
        assert!(matches!(
            resolve_range(&inverted, today),
            Err(AppError::BadRequest(_))
        ));
    }
}
