//! Generation error log entity: one failed call to the proposal generator

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "generation_error_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub model: String,

    #[sea_orm(column_type = "Text")]
    pub source_text_hash: String,

    pub source_text_length: i32,

    #[sea_orm(column_type = "Text")]
    pub error_code: String,

    #[sea_orm(column_type = "Text")]
    pub error_message: String,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
