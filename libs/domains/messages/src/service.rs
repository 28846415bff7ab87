use axum_helpers::AuthUser;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::error::{MessageError, MessageResult};
use crate::models::{
    ContactRequest, MAX_PAGE_SIZE, Message, ReplyRequest, Side, Thread, ThreadFilter, ThreadList,
    ThreadStatus, UnreadCount,
};
use crate::repository::ThreadRepository;

pub struct MessageService<R: ThreadRepository> {
    repository: Arc<R>,
}

impl<R: ThreadRepository> Clone for MessageService<R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}

impl<R: ThreadRepository> MessageService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    /// The side `viewer` speaks for on a thread, `None` when they may not
    /// see it. Owners speak as the customer even when they are admins.
    fn side_of(viewer: &AuthUser, thread: &Thread) -> Option<Side> {
        if thread.is_owned_by(viewer.id) {
            Some(Side::Customer)
        } else if viewer.is_admin() {
            Some(Side::Admin)
        } else {
            None
        }
    }

    async fn load(&self, id: Uuid) -> MessageResult<Thread> {
        self.repository
            .get_by_id(id)
            .await?
            .ok_or(MessageError::NotFound(id))
    }

    /// Open a thread. Guests must supply a name and email.
    #[instrument(skip(self, sender, input), fields(user = ?sender.map(|u| u.id)))]
    pub async fn contact(
        &self,
        sender: Option<&AuthUser>,
        input: ContactRequest,
    ) -> MessageResult<Thread> {
        input
            .validate()
            .map_err(|e| MessageError::Validation(e.to_string()))?;

        let (user_id, name, email) = match sender {
            Some(user) => (
                Some(user.id),
                input.name.unwrap_or_else(|| user.name.clone()),
                input.email.unwrap_or_else(|| user.email.clone()),
            ),
            None => match (input.name, input.email) {
                (Some(name), Some(email)) => (None, name, email),
                _ => {
                    return Err(MessageError::Validation(
                        "Name and email are required when not signed in".to_string(),
                    ));
                }
            },
        };

        self.repository
            .create(Thread::open(user_id, name, email, input.subject, input.body))
            .await
    }

    #[instrument(skip(self))]
    pub async fn list_mine(&self, user_id: Uuid) -> MessageResult<Vec<Thread>> {
        self.repository.list_by_user(user_id).await
    }

    /// Fetch a thread and mark it read for the viewer's side. Threads the
    /// viewer may not see are reported as missing.
    #[instrument(skip(self, viewer), fields(viewer = %viewer.id))]
    pub async fn get(&self, viewer: &AuthUser, id: Uuid) -> MessageResult<Thread> {
        let mut thread = self.load(id).await?;
        let side = Self::side_of(viewer, &thread).ok_or(MessageError::NotFound(id))?;

        if thread.is_unread_by(side) {
            self.repository.mark_read(id, side).await?;
            thread.mark_read(side);
        }
        Ok(thread)
    }

    #[instrument(skip(self, author, input), fields(author = %author.id))]
    pub async fn reply(
        &self,
        author: &AuthUser,
        id: Uuid,
        input: ReplyRequest,
    ) -> MessageResult<Thread> {
        input
            .validate()
            .map_err(|e| MessageError::Validation(e.to_string()))?;

        let thread = self.load(id).await?;
        let side = Self::side_of(author, &thread).ok_or(MessageError::NotFound(id))?;
        if thread.status == ThreadStatus::Closed {
            return Err(MessageError::Closed);
        }
        if thread.is_full() {
            return Err(MessageError::ThreadFull);
        }

        let message = Message::new(side, author.name.clone(), input.body);
        match self.repository.append_message(id, message).await? {
            Some(thread) => Ok(thread),
            // Lost a race with a close, a delete or another reply
            None => match self.repository.get_by_id(id).await? {
                None => Err(MessageError::NotFound(id)),
                Some(t) if t.status == ThreadStatus::Closed => Err(MessageError::Closed),
                Some(_) => Err(MessageError::ThreadFull),
            },
        }
    }

    /// Threads waiting for the customer
    #[instrument(skip(self))]
    pub async fn unread_for_customer(&self, user_id: Uuid) -> MessageResult<UnreadCount> {
        let threads = self
            .repository
            .count_unread(Side::Customer, Some(user_id))
            .await?;
        Ok(UnreadCount { threads })
    }

    /// Threads waiting for the shop
    #[instrument(skip(self))]
    pub async fn unread_for_admin(&self) -> MessageResult<UnreadCount> {
        let threads = self.repository.count_unread(Side::Admin, None).await?;
        Ok(UnreadCount { threads })
    }

    #[instrument(skip(self))]
    pub async fn list(&self, filter: ThreadFilter) -> MessageResult<ThreadList> {
        let mut filter = filter;
        filter.limit = filter.limit.clamp(1, MAX_PAGE_SIZE);
        let total = self.repository.count(filter.clone()).await?;
        let (limit, offset) = (filter.limit, filter.offset);
        let data = self.repository.list(filter).await?;
        Ok(ThreadList {
            data,
            total,
            limit,
            offset,
        })
    }

    #[instrument(skip(self))]
    pub async fn close(&self, id: Uuid) -> MessageResult<Thread> {
        self.set_status(id, ThreadStatus::Closed).await
    }

    #[instrument(skip(self))]
    pub async fn reopen(&self, id: Uuid) -> MessageResult<Thread> {
        self.set_status(id, ThreadStatus::Open).await
    }

    async fn set_status(&self, id: Uuid, status: ThreadStatus) -> MessageResult<Thread> {
        self.repository
            .set_status(id, status)
            .await?
            .ok_or(MessageError::NotFound(id))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid) -> MessageResult<()> {
        if !self.repository.delete(id).await? {
            return Err(MessageError::NotFound(id));
        }
        Ok(())
    }
}
