//! Database repositories
//!
//! Repository pattern implementations for database access.
//! Each repository handles one aggregate; multi-table writes that must not
//! be observed half-done run inside a single transaction.

pub mod content;
pub mod course;
pub mod item;
pub mod module;
pub mod session;
pub mod topic;
pub mod user;

pub use content::{ContentRepository, SqlxContentRepository};
pub use course::{CourseFilter, CourseRepository, SqlxCourseRepository};
pub use item::{ItemRepository, SqlxItemRepository};
pub use module::{ModuleChange, ModuleRepository, SqlxModuleRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use topic::{SqlxTopicRepository, TopicRepository};
pub use user::{SqlxUserRepository, UserRepository};
