pub mod devlog;
pub mod pagination;
pub mod project;
pub mod user;

pub use devlog::{CommentAuthor, Devlog, DevlogComment, DevlogMedia};
pub use pagination::{Page, Pagination};
pub use project::{Project, ProjectFields, ProjectPatch};
pub use user::User;
