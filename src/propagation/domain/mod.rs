//! Domain model for status propagation.
//!
//! The propagation domain models entity references, status vocabularies,
//! the validated mapping table, observed status events, and the
//! instructions and outcomes exchanged between resolver and dispatcher. No
//! infrastructure concerns cross this boundary.

mod entity;
mod error;
mod event;
mod instruction;
mod mapping;
mod outcome;
mod status;

pub use entity::{EntityId, EntityRef, EntityType, StepName};
pub use error::{MappingConfigError, ParseEntityTypeError, PropagationDomainError};
pub use event::{
    StatusEvent, StatusTransition, TaskStatusChange, VersionCreation, VersionStatusChange,
};
pub use instruction::{InstructionReason, InstructionTarget, PropagationInstruction};
pub use mapping::{
    MappingDocument, MappingRule, StatusEntryDocument, StatusMappingTable, StatusTarget,
    StepFanoutDocument, StepFanoutRule, VersionCreatedDocument, VersionCreatedRule,
    VocabularyDocument,
};
pub use outcome::{DispatchReport, DispatchSummary, InstructionOutcome, OutcomeKind};
pub use status::{StatusCode, StatusDefinition, StatusVocabulary};
