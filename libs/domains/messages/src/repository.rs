use async_trait::async_trait;
use uuid::Uuid;

use crate::error::MessageResult;
use crate::models::{Message, Side, Thread, ThreadFilter, ThreadStatus};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    async fn create(&self, thread: Thread) -> MessageResult<Thread>;

    async fn get_by_id(&self, id: Uuid) -> MessageResult<Option<Thread>>;

    /// A customer's threads, most recent activity first
    async fn list_by_user(&self, user_id: Uuid) -> MessageResult<Vec<Thread>>;

    async fn list(&self, filter: ThreadFilter) -> MessageResult<Vec<Thread>>;

    async fn count(&self, filter: ThreadFilter) -> MessageResult<u64>;

    /// Append a message to an open thread that still has room. Flags the
    /// thread unread for the other side and read for the author's side.
    /// Returns `None` when no such thread matched.
    async fn append_message(&self, id: Uuid, message: Message)
    -> MessageResult<Option<Thread>>;

    /// Clear one side's unread flag
    async fn mark_read(&self, id: Uuid, side: Side) -> MessageResult<()>;

    /// Threads unread by `side`; customer counts are scoped to `user_id`
    async fn count_unread(&self, side: Side, user_id: Option<Uuid>) -> MessageResult<u64>;

    async fn set_status(&self, id: Uuid, status: ThreadStatus) -> MessageResult<Option<Thread>>;

    async fn delete(&self, id: Uuid) -> MessageResult<bool>;
}
