//! SeaORM entity models
//!
//! Database entities for CardForge

mod flashcard;
mod generation;
mod generation_error_log;
mod proposal_resolution;

pub use flashcard::{
    Entity as FlashcardEntity,
    Model as Flashcard,
    ActiveModel as FlashcardActiveModel,
    Column as FlashcardColumn,
    FlashcardSource,
};

pub use generation::{
    Entity as GenerationEntity,
    Model as Generation,
    ActiveModel as GenerationActiveModel,
    Column as GenerationColumn,
};

pub use generation_error_log::{
    Entity as GenerationErrorLogEntity,
    Model as GenerationErrorLog,
    ActiveModel as GenerationErrorLogActiveModel,
    Column as GenerationErrorLogColumn,
};

pub use proposal_resolution::{
    Entity as ProposalResolutionEntity,
    Model as ProposalResolution,
    ActiveModel as ProposalResolutionActiveModel,
    Column as ProposalResolutionColumn,
    DecisionOutcome,
};
