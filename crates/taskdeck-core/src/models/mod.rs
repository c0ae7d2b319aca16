//! Data models for Taskdeck

mod entity;
mod goal;
mod meeting;
mod message;
mod post;
mod record;
mod task;

pub use entity::{Entity, EntityId, Revision};
pub use goal::{Goal, GoalPatch};
pub use meeting::{Meeting, MeetingPatch};
pub use message::{Message, MessagePatch};
pub use post::{Post, PostPatch};
pub use record::Record;
pub use task::{Priority, Task, TaskPatch, TaskStatus};
