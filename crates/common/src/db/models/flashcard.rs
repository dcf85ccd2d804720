//! Flashcard entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a flashcard came to exist. Fixed at creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum FlashcardSource {
    /// Proposal accepted exactly as generated
    #[sea_orm(string_value = "ai-full")]
    #[serde(rename = "ai-full")]
    AiFull,

    /// Proposal accepted after the user changed it
    #[sea_orm(string_value = "ai-edited")]
    #[serde(rename = "ai-edited")]
    AiEdited,

    /// Written by the user, no generation behind it
    #[sea_orm(string_value = "manual")]
    #[serde(rename = "manual")]
    Manual,
}

impl FlashcardSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashcardSource::AiFull => "ai-full",
            FlashcardSource::AiEdited => "ai-edited",
            FlashcardSource::Manual => "manual",
        }
    }

    /// Whether cards with this source must reference a generation
    pub fn is_generated(&self) -> bool {
        !matches!(self, FlashcardSource::Manual)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "flashcards")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub front: String,

    #[sea_orm(column_type = "Text")]
    pub back: String,

    pub source: FlashcardSource,

    /// Null exactly when `source` is manual
    pub generation_id: Option<i64>,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::generation::Entity",
        from = "Column::GenerationId",
        to = "super::generation::Column::Id",
        on_delete = "Restrict"
    )]
    Generation,
}

impl Related<super::generation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Generation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
