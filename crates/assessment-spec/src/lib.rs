#![allow(missing_docs)]

pub mod builder;
pub mod capture;
pub mod config;
pub mod edit;
pub mod error;
pub mod ids;
pub mod render;
pub mod responses;
pub mod responses_schema;
pub mod runtime;
pub mod session;
pub mod spec;
pub mod store;
pub mod validate;
pub mod visibility;

pub use builder::{AssessmentBuilder, BuilderCommand, DragSource};
pub use capture::{CaptureError, Input, capture};
pub use config::{ConfigError, EngineConfig, QuestionDefaults, StoreConfig};
pub use edit::{SectionPatch, check_structure};
pub use error::StructuralConstraintError;
pub use ids::IdGenerator;
pub use render::{
    RenderPayload, RenderProgress, RenderQuestion, RenderSection, RenderStatus,
    build_render_payload, render_json_ui, render_text, runtime_payload,
};
pub use responses::{Answer, FileRef, ResponseSet, Submission};
pub use responses_schema::generate as responses_schema;
pub use runtime::{AssessmentRuntime, RuntimeError, RuntimeState, SubmitOutcome};
pub use session::AssessmentSession;
pub use spec::{
    Assessment, Condition, Conditional, FALLBACK_TITLE, JobId, Question, QuestionKind,
    QuestionType, Section, assessment_json_schema, default_assessment,
};
pub use store::{
    AssessmentStore, Job, JobFilter, JobStatus, MemoryStore, Page, PersistenceError, slugify,
};
pub use validate::{Violation, ViolationCode, ViolationMap, validate, validate_responses};
pub use visibility::{VisibilityMap, find_cycle, resolve_visibility};
