use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};

use crate::{
    audit,
    dto::settings::UpdateSettingsRequest,
    entity::settings::{ActiveModel as SettingsActive, Entity as SettingsRow, Model as SettingsModel},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_staff},
    models::Settings,
    response::{ApiResponse, Meta},
    state::AppState,
};

const SETTINGS_ID: i32 = 1;

impl Default for Settings {
    fn default() -> Self {
        Self {
            cafe_name: "My Cafe".into(),
            menu_url: "https://mycafe.com/menu".into(),
            tax_rate: Decimal::new(10, 2),
            service_charge_rate: Decimal::new(5, 2),
            currency: "USD".into(),
        }
    }
}

/// Current settings; works inside a transaction so checkout sees a consistent snapshot.
pub async fn load_settings<C: ConnectionTrait>(conn: &C) -> AppResult<Settings> {
    let row = SettingsRow::find_by_id(SETTINGS_ID).one(conn).await?;
    Ok(row.map(settings_from_entity).unwrap_or_default())
}

pub async fn get_settings(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Settings>> {
    ensure_staff(user)?;
    let settings = load_settings(&state.orm).await?;
    Ok(ApiResponse::success("Settings", settings, Some(Meta::empty())))
}

pub async fn update_settings(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateSettingsRequest,
) -> AppResult<ApiResponse<Settings>> {
    ensure_admin(user)?;
    validate_settings(&payload)?;

    let currency = payload
        .currency
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "USD".into());

    let settings = save_settings(
        &state.orm,
        Settings {
            cafe_name: payload.cafe_name.trim().to_string(),
            menu_url: payload.menu_url.trim().to_string(),
            tax_rate: payload.tax_rate,
            service_charge_rate: payload.service_charge_rate,
            currency,
        },
    )
    .await?;

    audit::record(
        &state.pool,
        Some(user.user_id),
        "settings_update",
        "settings",
        serde_json::json!({
            "tax_rate": settings.tax_rate,
            "service_charge_rate": settings.service_charge_rate,
        }),
    )
    .await;

    Ok(ApiResponse::success("Settings saved", settings, Some(Meta::empty())))
}

/// Store a new menu URL, keeping the other settings.
pub async fn set_menu_url(state: &AppState, url: &str) -> AppResult<()> {
    let mut settings = load_settings(&state.orm).await?;
    if settings.menu_url != url {
        settings.menu_url = url.to_string();
        save_settings(&state.orm, settings).await?;
    }
    Ok(())
}

async fn save_settings<C: ConnectionTrait>(conn: &C, settings: Settings) -> AppResult<Settings> {
    let active = SettingsActive {
        id: Set(SETTINGS_ID),
        cafe_name: Set(settings.cafe_name),
        menu_url: Set(settings.menu_url),
        tax_rate: Set(settings.tax_rate),
        service_charge_rate: Set(settings.service_charge_rate),
        currency: Set(settings.currency),
        updated_at: Set(Utc::now().into()),
    };
    let saved = match SettingsRow::find_by_id(SETTINGS_ID).one(conn).await? {
        Some(_) => active.update(conn).await?,
        None => active.insert(conn).await?,
    };
    Ok(settings_from_entity(saved))
}

fn validate_settings(payload: &UpdateSettingsRequest) -> Result<(), AppError> {
    if payload.cafe_name.trim().is_empty() {
        return Err(AppError::BadRequest("cafe_name is required".into()));
    }
    if payload.menu_url.trim().is_empty() {
        return Err(AppError::BadRequest("menu_url is required".into()));
    }
    for (field, rate) in [
        ("tax_rate", payload.tax_rate),
        ("service_charge_rate", payload.service_charge_rate),
    ] {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(AppError::BadRequest(format!(
                "{field} must be a fraction between 0 and 1"
            )));
        }
    }
    Ok(())
}

fn settings_from_entity(model: SettingsModel) -> Settings {
    Settings {
        cafe_name: model.cafe_name,
        menu_url: model.menu_url,
        tax_rate: model.tax_rate,
        service_charge_rate: model.service_charge_rate,
        currency: model.currency,
    }
}
