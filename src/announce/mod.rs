//! Announcement vocabulary: languages, kinds, templates and jobs.

pub mod job;
pub mod kind;
pub mod language;
pub mod template;

pub use job::{AnnouncementJob, AnnouncementText, JobId, JobStatus};
pub use kind::AnnouncementKind;
pub use language::Language;
pub use template::{TemplateExtras, TemplateTable};
