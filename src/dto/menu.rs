use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{MenuItem, MenuSection};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMenuItemRequest {
    pub section: MenuSection,
    pub name: String,
    pub price: Decimal,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub inventory: i32,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateMenuItemRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub inventory: Option<i32>,
    pub available: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct InventoryAdjustRequest {
    pub delta: i32,
}

/// Items keyed by section name (`beverages`, `food`).
#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct MenuBySection {
    #[schema(value_type = Object)]
    pub sections: BTreeMap<String, Vec<MenuItem>>,
}

impl MenuBySection {
    pub fn group(items: Vec<MenuItem>) -> Self {
        let mut sections: BTreeMap<String, Vec<MenuItem>> = MenuSection::ALL
            .iter()
            .map(|section| (section.as_str().to_string(), Vec::new()))
            .collect();
        for item in items {
            sections
                .entry(item.section.as_str().to_string())
                .or_default()
                .push(item);
        }
        Self { sections }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct MenuItemList {
    #[schema(value_type = Vec<MenuItem>)]
    pub items: Vec<MenuItem>,
}
