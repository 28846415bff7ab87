//! Messages Domain
//!
//! Contact threads between customers and the shop. Anyone can open a thread;
//! guests leave a name and email, signed-in customers can follow up from
//! their account. Each side has an unread flag that a reply from the other
//! side raises and reading the thread clears.

pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;

pub use error::{MessageError, MessageResult};
pub use handlers::ApiDoc;
pub use models::{
    ContactRequest, MAX_MESSAGES, Message, ReplyRequest, Side, Thread, ThreadFilter, ThreadList,
    ThreadStatus, UnreadCount,
};
pub use mongodb::MongoThreadRepository;
pub use repository::ThreadRepository;
pub use service::MessageService;
