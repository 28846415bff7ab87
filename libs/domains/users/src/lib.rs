//! Users Domain
//!
//! Customer and admin accounts with argon2 password hashes and stateless JWT
//! sign-in.
//!
//! - [`auth_handlers`]: `/auth` register, login, logout, own profile, password
//! - [`handlers`]: `/users` admin management
//!
//! Startup calls [`UserService::ensure_admin`] to create the bootstrap admin.

pub mod auth_handlers;
pub mod error;
pub mod handlers;
pub mod models;
pub mod mongodb;
pub mod repository;
pub mod service;

pub use auth_handlers::{AuthApiDoc, AuthState};
pub use error::{UserError, UserResult};
pub use handlers::ApiDoc;
pub use models::{
    Address, AdminUpdateUser, AuthResponse, ChangePasswordRequest, LoginRequest,
    RegisterRequest, Role, UpdateProfile, User, UserFilter, UserList, UserResponse,
};
pub use mongodb::MongoUserRepository;
pub use repository::UserRepository;
pub use service::UserService;
