//! Generation entity: one successful call to the proposal generator

use crate::errors::AppError;
use crate::generator::Proposal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "generations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub user_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub model: String,

    pub generated_count: i32,

    pub accepted_unedited_count: i32,

    pub accepted_edited_count: i32,

    /// SHA-256 of the source text, hex encoded
    #[sea_orm(column_type = "Text")]
    pub source_text_hash: String,

    pub source_text_length: i32,

    /// Wall-clock time of the generator call in milliseconds
    pub generation_duration: i64,

    /// Proposals as returned by the generator, kept so that unedited
    /// acceptances reproduce them verbatim
    #[sea_orm(column_type = "JsonBinary")]
    pub proposals: Json,

    pub created_at: DateTimeUtc,

    pub updated_at: DateTimeUtc,
}

impl Model {
    /// Decode the stored proposal list
    pub fn proposal_list(&self) -> crate::errors::Result<Vec<Proposal>> {
        serde_json::from_value(self.proposals.clone()).map_err(|e| AppError::Internal {
            message: format!("Generation {} has unreadable proposals: {}", self.id, e),
        })
    }

    /// Proposals the user kept, edited or not
    pub fn accepted_total(&self) -> i64 {
        self.accepted_unedited_count as i64 + self.accepted_edited_count as i64
    }

    /// Fraction of proposals accepted, 0 when nothing was generated
    pub fn acceptance_rate(&self) -> f64 {
        if self.generated_count <= 0 {
            0.0
        } else {
            self.accepted_total() as f64 / self.generated_count as f64
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::flashcard::Entity")]
    Flashcards,

    #[sea_orm(has_many = "super::proposal_resolution::Entity")]
    Resolutions,
}

impl Related<super::flashcard::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Flashcards.def()
    }
}

impl Related<super::proposal_resolution::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Resolutions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
