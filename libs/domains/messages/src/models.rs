use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const MAX_PAGE_SIZE: i64 = 100;

/// Messages a single thread can hold
pub const MAX_MESSAGES: usize = 200;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ThreadStatus {
    #[default]
    Open,
    Closed,
}

/// Which side of the conversation wrote a message. Also names the side whose
/// unread flag a read or a reply touches.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Side {
    Customer,
    Admin,
}

impl Side {
    pub fn other(self) -> Self {
        match self {
            Side::Customer => Side::Admin,
            Side::Admin => Side::Customer,
        }
    }

    /// Document field holding this side's unread flag
    pub fn unread_field(self) -> &'static str {
        match self {
            Side::Customer => "unread_by_customer",
            Side::Admin => "unread_by_admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub id: Uuid,
    pub author: Side,
    pub author_name: String,
    pub body: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    pub fn new(author: Side, author_name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            author,
            author_name: author_name.into(),
            body: body.into(),
            sent_at: Utc::now(),
        }
    }
}

/// Conversation between a customer (or guest) and the shop
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Thread {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    /// Unset for guest contact
    pub user_id: Option<Uuid>,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub status: ThreadStatus,
    pub messages: Vec<Message>,
    pub unread_by_admin: bool,
    pub unread_by_customer: bool,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Open a thread whose first message comes from the customer
    pub fn open(
        user_id: Option<Uuid>,
        name: String,
        email: String,
        subject: String,
        body: String,
    ) -> Self {
        let first = Message::new(Side::Customer, name.clone(), body);
        let now = first.sent_at;
        Self {
            id: Uuid::now_v7(),
            user_id,
            name,
            email,
            subject,
            status: ThreadStatus::Open,
            messages: vec![first],
            unread_by_admin: true,
            unread_by_customer: false,
            last_message_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == Some(user_id)
    }

    pub fn is_full(&self) -> bool {
        self.messages.len() >= MAX_MESSAGES
    }

    pub fn is_unread_by(&self, side: Side) -> bool {
        match side {
            Side::Customer => self.unread_by_customer,
            Side::Admin => self.unread_by_admin,
        }
    }

    pub fn mark_read(&mut self, side: Side) {
        match side {
            Side::Customer => self.unread_by_customer = false,
            Side::Admin => self.unread_by_admin = false,
        }
    }
}

/// Start a conversation. Guests must give their name and email; signed-in
/// customers default to their account details.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReplyRequest {
    #[validate(length(min = 1, max = 5000))]
    pub body: String,
}

/// Admin thread filters
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct ThreadFilter {
    pub status: Option<ThreadStatus>,
    /// Only threads with customer messages the shop has not read
    #[serde(default)]
    pub unread_only: bool,
    /// Matches subject, name or email
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for ThreadFilter {
    fn default() -> Self {
        Self {
            status: None,
            unread_only: false,
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ThreadList {
    pub data: Vec<Thread>,
    pub total: u64,
    pub limit: i64,
    pub offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UnreadCount {
    /// Threads with messages waiting for this side
    pub threads: u64,
}
