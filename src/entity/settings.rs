use sea_orm::entity::prelude::*;

/// Singleton row, `id` is always 1.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: i32,
    pub cafe_name: String,
    pub menu_url: String,
    #[sea_orm(column_type = "Decimal(Some((6, 4)))")]
    pub tax_rate: Decimal,
    #[sea_orm(column_type = "Decimal(Some((6, 4)))")]
    pub service_charge_rate: Decimal,
    pub currency: String,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
