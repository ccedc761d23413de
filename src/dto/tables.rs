use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Table, TableStatus};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateTableRequest {
    pub table_number: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateTableStatusRequest {
    pub status: TableStatus,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TableList {
    #[schema(value_type = Vec<Table>)]
    pub items: Vec<Table>,
}

/// New menu URL; it is saved and encoded into the returned QR code.
#[derive(Debug, Deserialize, ToSchema)]
pub struct MenuQrRequest {
    pub url: String,
}
