//! Proposal resolution entity
//!
//! One row per `(generation_id, proposal_index)` the user has decided on.
//! The composite primary key is what makes a second decision on the same
//! proposal fail.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// What the user did with a proposal
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum DecisionOutcome {
    #[sea_orm(string_value = "accepted-unedited")]
    #[serde(rename = "accepted-unedited")]
    AcceptedUnedited,

    #[sea_orm(string_value = "accepted-edited")]
    #[serde(rename = "accepted-edited")]
    AcceptedEdited,

    #[sea_orm(string_value = "rejected")]
    #[serde(rename = "rejected")]
    Rejected,
}

impl DecisionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionOutcome::AcceptedUnedited => "accepted-unedited",
            DecisionOutcome::AcceptedEdited => "accepted-edited",
            DecisionOutcome::Rejected => "rejected",
        }
    }

    /// Provenance of the flashcard this outcome creates, if any
    pub fn flashcard_source(&self) -> Option<super::FlashcardSource> {
        match self {
            DecisionOutcome::AcceptedUnedited => Some(super::FlashcardSource::AiFull),
            DecisionOutcome::AcceptedEdited => Some(super::FlashcardSource::AiEdited),
            DecisionOutcome::Rejected => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "proposal_resolutions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub generation_id: i64,

    #[sea_orm(primary_key, auto_increment = false)]
    pub proposal_index: i32,

    pub outcome: DecisionOutcome,

    /// Flashcard created by an accepting decision
    pub flashcard_id: Option<i64>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::generation::Entity",
        from = "Column::GenerationId",
        to = "super::generation::Column::Id"
    )]
    Generation,
}

impl Related<super::generation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Generation.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
