//! Services layer - Business logic
//!
//! Services implement the rules the repositories don't know about:
//! ownership scoping, validation, slug rules and enrollment. Each has its
//! own error enum; handlers map those onto HTTP responses.

pub mod content;
pub mod course;
pub mod password;
pub mod slug;
pub mod student;
pub mod topic;
pub mod user;

pub use content::{ContentService, ContentServiceError, ModuleContents};
pub use course::{Catalog, CourseDetail, CourseService, CourseServiceError, CourseWithTopics};
pub use password::{hash_password, verify_password};
pub use slug::{generate_slug, is_valid_slug};
pub use student::{StudentCourseView, StudentService, StudentServiceError};
pub use topic::{CreateTopicInput, TopicService, TopicServiceError};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
