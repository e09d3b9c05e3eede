//! Data models
//!
//! Database entities (User, Session, Topic, Course, Module, Content and the
//! content items) plus the input types the services accept.

mod content;
mod course;
mod module;
mod session;
mod topic;
mod user;

pub use content::{
    Content, ContentKind, Item, ItemInput, ItemPayload, ResolvedContent, UnknownContentKind,
};
pub use course::{Course, CourseInput, CourseSummary};
pub use module::{Module, ModuleForm};
pub use session::Session;
pub use topic::{Topic, TopicWithCount};
pub use user::User;
