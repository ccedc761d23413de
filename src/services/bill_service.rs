use rust_decimal::Decimal;

use crate::{
    dto::orders::{EmailBillRequest, EmailBillResult, OrderWithItems},
    error::{AppError, AppResult},
    mailer::{MailAttachment, MailError},
    middleware::auth::{AuthUser, ensure_staff},
    models::Settings,
    pdf::{CM, Font, PdfDocument},
    response::{ApiResponse, Meta},
    services::{order_service, settings_service},
    state::AppState,
};

const A4_WIDTH: f64 = 595.28;
const A4_HEIGHT: f64 = 841.89;
const LEFT: f64 = 2.0 * CM;
const LINE: f64 = 0.55 * CM;

const QTY_RIGHT: f64 = 11.0 * CM;
const PRICE_RIGHT: f64 = 14.5 * CM;
const SUBTOTAL_RIGHT: f64 = 19.0 * CM;

/// Rows stop above this line so they never run into the footer.
const BOTTOM: f64 = 2.5 * CM;
const TOP: f64 = A4_HEIGHT - 2.0 * CM;

fn item_header(doc: &mut PdfDocument, y: f64) -> f64 {
    doc.text(Font::Bold, 9.0, LEFT, y, "Item");
    doc.text_right(Font::Bold, 9.0, QTY_RIGHT, y, "Qty");
    doc.text_right(Font::Bold, 9.0, PRICE_RIGHT, y, "Price");
    doc.text_right(Font::Bold, 9.0, SUBTOTAL_RIGHT, y, "Subtotal");
    let rule = y - 0.2 * CM;
    doc.line(LEFT, rule, SUBTOTAL_RIGHT, rule);
    rule - LINE
}

fn footer(doc: &mut PdfDocument, settings: &Settings) {
    doc.text_centered(
        Font::Italic,
        8.0,
        1.5 * CM,
        &format!("Thank you for visiting {}!", settings.cafe_name),
    );
}

/// Close the current page and open the next; returns where drawing resumes.
fn continue_page(doc: &mut PdfDocument, bill: &OrderWithItems, settings: &Settings) -> f64 {
    footer(doc, settings);
    doc.new_page();
    doc.text(Font::Bold, 10.0, LEFT, TOP, &format!("Bill - {} (continued)", bill.order.id));
    TOP - 1.0 * CM
}

/// A4 bill, continued on further pages when the items do not fit. The same
/// order always renders to the same bytes.
pub fn render_bill(bill: &OrderWithItems, settings: &Settings) -> Vec<u8> {
    let order = &bill.order;
    let money = |amount: Decimal| format!("{} {:.2}", settings.currency, amount);

    let mut doc = PdfDocument::new(&format!("Bill {}", order.id), A4_WIDTH, A4_HEIGHT);
    let mut y = TOP;

    doc.text_centered(Font::Bold, 18.0, y, &settings.cafe_name);
    y -= 1.0 * CM;
    doc.text_centered(Font::Bold, 14.0, y, &format!("Bill - {}", order.id));
    y -= 1.2 * CM;

    let table = order.table_number.as_deref().unwrap_or("Take-away");
    let meta = [
        format!("Customer : {}", order.customer_name),
        format!("Table    : {table}"),
        format!(
            "Date     : {}  {}",
            order.date.format("%Y-%m-%d"),
            order.time.format("%H:%M:%S")
        ),
        format!("Status   : {} / {}", order.status, order.payment_status),
    ];
    for line in &meta {
        doc.text(Font::Regular, 10.0, LEFT, y, line);
        y -= LINE;
    }

    y -= 0.3 * CM;
    y = item_header(&mut doc, y);

    for item in &bill.items {
        if y < BOTTOM {
            let resume = continue_page(&mut doc, bill, settings);
            y = item_header(&mut doc, resume);
        }
        doc.text(Font::Regular, 9.0, LEFT, y, &item.name);
        doc.text_right(Font::Mono, 9.0, QTY_RIGHT, y, &item.quantity.to_string());
        doc.text_right(Font::Mono, 9.0, PRICE_RIGHT, y, &money(item.unit_price));
        doc.text_right(Font::Mono, 9.0, SUBTOTAL_RIGHT, y, &money(item.subtotal));
        y -= LINE;
    }

    let totals = [
        ("Subtotal", order.subtotal),
        ("Discount", Decimal::ZERO - order.discount),
        ("Tax", order.tax),
        ("Service", order.service_charge),
        ("Total", order.total),
    ];
    // The totals block stays together.
    let block = 0.3 * CM + LINE * (totals.len() - 1) as f64;
    if y - block < BOTTOM {
        y = continue_page(&mut doc, bill, settings);
    }

    doc.line(LEFT, y + 0.3 * CM, SUBTOTAL_RIGHT, y + 0.3 * CM);
    y -= 0.3 * CM;
    for (label, value) in totals {
        doc.text_right(Font::Bold, 10.0, PRICE_RIGHT, y, &format!("{label}:"));
        doc.text_right(Font::Mono, 10.0, SUBTOTAL_RIGHT, y, &money(value));
        y -= LINE;
    }

    footer(&mut doc, settings);
    doc.to_bytes()
}

/// Render and mail the bill. Callers decide whether a failure is fatal.
pub async fn send_bill(
    state: &AppState,
    bill: &OrderWithItems,
    settings: &Settings,
    to: &str,
) -> Result<(), MailError> {
    let mailer = state.mailer.as_ref().ok_or(MailError::NotConfigured)?;
    let order = &bill.order;
    let body = format!(
        "Hi {},\n\nPlease find your bill attached.\nThank you for visiting us!\n\nRegards,\n{}",
        order.customer_name, settings.cafe_name
    );
    mailer
        .send(
            to,
            &format!("Your bill - {}", order.id),
            body,
            Some(MailAttachment {
                filename: format!("{}.pdf", order.id),
                content_type: "application/pdf",
                bytes: render_bill(bill, settings),
            }),
        )
        .await
}

pub async fn download_bill(state: &AppState, user: &AuthUser, order_id: &str) -> AppResult<Vec<u8>> {
    ensure_staff(user)?;
    let bill = order_service::load_order_with_items(&state.orm, order_id).await?;
    let settings = settings_service::load_settings(&state.orm).await?;
    Ok(render_bill(&bill, &settings))
}

pub async fn email_bill(
    state: &AppState,
    user: &AuthUser,
    order_id: &str,
    payload: EmailBillRequest,
) -> AppResult<ApiResponse<EmailBillResult>> {
    ensure_staff(user)?;
    let to = payload.to.trim().to_string();
    if to.is_empty() {
        return Err(AppError::BadRequest("recipient address is required".into()));
    }

    let bill = order_service::load_order_with_items(&state.orm, order_id).await?;
    let settings = settings_service::load_settings(&state.orm).await?;

    let outcome = send_bill(state, &bill, &settings, &to).await;
    let result = EmailBillResult {
        order_id: bill.order.id.clone(),
        to,
        sent: outcome.is_ok(),
    };
    match outcome {
        Ok(()) => Ok(ApiResponse::success("Bill emailed", result, Some(Meta::empty()))),
        Err(err) => {
            tracing::warn!(order_id = %result.order_id, error = %err, "bill email failed");
            Ok(
                ApiResponse::success("Bill not emailed", result, Some(Meta::empty()))
                    .with_warning(format!("bill email failed: {err}")),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Order, OrderItem, OrderStatus, PaymentStatus};
    use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
    use std::str::FromStr;

    fn label_y(text: &str, label: &str) -> f64 {
        let needle = format!("({label}) Tj");
        let line = text.lines().find(|l| l.contains(&needle)).unwrap();
        let fields: Vec<&str> = line.split_whitespace().collect();
        let td = fields.iter().position(|f| *f == "Td").unwrap();
        fields[td - 1].parse().unwrap()
    }

    fn sample() -> OrderWithItems {
        let d = |s: &str| Decimal::from_str(s).unwrap();
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
        OrderWithItems {
            order: Order {
                id: "ORD00042".into(),
                customer_name: "Asha".into(),
                customer_email: None,
                table_number: None,
                subtotal: d("9.00"),
                discount: d("0.00"),
                tax: d("0.90"),
                service_charge: d("0.45"),
                total: d("10.35"),
                tax_rate: d("0.10"),
                service_charge_rate: d("0.05"),
                date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
                timestamp: at,
                status: OrderStatus::Pending,
                payment_status: PaymentStatus::Unpaid,
                updated_at: at,
            },
            items: vec![OrderItem {
                menu_item_id: "BEV001".into(),
                name: "Espresso".into(),
                unit_price: d("2.50"),
                quantity: 2,
                subtotal: d("5.00"),
            }],
        }
    }

    #[test]
    fn bill_lists_items_totals_and_take_away() {
        let bytes = render_bill(&sample(), &Settings::default());
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF"));
        assert!(text.contains("(Bill - ORD00042)"));
        assert!(text.contains("Take-away"));
        assert!(text.contains("(Espresso)"));
        assert!(text.contains("(USD 10.35)"));
    }

    #[test]
    fn long_orders_continue_on_a_new_page() {
        let mut bill = sample();
        let item = bill.items[0].clone();
        bill.items = (0..60)
            .map(|i| OrderItem {
                name: format!("Espresso {i}"),
                ..item.clone()
            })
            .collect();

        let bytes = render_bill(&bill, &Settings::default());
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Count 2"));
        assert!(text.contains("(Bill - ORD00042 \\(continued\\)) Tj"));
        for label in ["Espresso 59", "Total:", "Subtotal:"] {
            let y = label_y(&text, label);
            assert!(y >= BOTTOM && y < A4_HEIGHT, "{label} at {y}");
        }
    }

    #[test]
    fn short_bill_fits_on_one_page() {
        let text = String::from_utf8_lossy(&render_bill(&sample(), &Settings::default())).into_owned();
        assert!(text.contains("/Count 1"));
        assert!(label_y(&text, "Total:") > BOTTOM);
    }

    #[test]
    fn rendering_is_deterministic() {
        let settings = Settings::default();
        assert_eq!(render_bill(&sample(), &settings), render_bill(&sample(), &settings));
    }
}
