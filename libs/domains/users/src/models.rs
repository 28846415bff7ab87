use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const MAX_PAGE_SIZE: i64 = 100;
pub const MAX_ADDRESSES: usize = 10;

/// User roles
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

/// Postal address kept on the profile for checkout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Address {
    /// e.g. "Home", "Office"
    #[validate(length(max = 50))]
    pub label: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub line1: String,
    #[validate(length(max = 200))]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 2, max = 56))]
    pub country: String,
    #[serde(default)]
    pub is_default: bool,
}

/// User entity as stored in MongoDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: Uuid,
    /// Lower-cased, unique
    pub email: String,
    pub name: String,
    /// Argon2 PHC string
    pub password_hash: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
    pub roles: Vec<Role>,
    pub is_active: bool,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User as returned by the API, without credentials
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub addresses: Vec<Address>,
    pub roles: Vec<Role>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            addresses: user.addresses,
            roles: user.roles,
            is_active: user.is_active,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl UserResponse {
    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.to_string()).collect()
    }
}

/// DTO for user registration
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

/// DTO for user login
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email, length(max = 255))]
    pub email: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Issued token plus the signed-in user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    /// Always "Bearer"
    pub token_type: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub user: UserResponse,
}

/// Fields a user may change on their own profile
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    /// Empty string clears the phone number
    #[validate(length(max = 30))]
    pub phone: Option<String>,
    /// Replaces the whole address book
    pub addresses: Option<Vec<Address>>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, max = 128))]
    pub current_password: String,
    pub new_password: String,
}

/// Admin changes to an account
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct AdminUpdateUser {
    #[validate(length(min = 1))]
    pub roles: Option<Vec<Role>>,
    pub is_active: Option<bool>,
}

/// Query filters for listing users
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct UserFilter {
    /// Case-insensitive match on email or name
    pub search: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            search: None,
            role: None,
            is_active: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

fn default_limit() -> i64 {
    50
}

/// Page of users with the total matching the filter
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserList {
    pub data: Vec<UserResponse>,
    pub total: u64,
    pub limit: i64,
    pub offset: u64,
}

/// Lower-case and trim so lookups and the unique index agree.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Create a new user (password is hashed by the service layer)
    pub fn new(email: &str, name: &str, password_hash: String, roles: Vec<Role>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email: normalize_email(email),
            name: name.trim().to_string(),
            password_hash,
            phone: None,
            addresses: Vec::new(),
            roles: if roles.is_empty() {
                vec![Role::Customer]
            } else {
                roles
            },
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }

    pub fn apply_profile(&mut self, update: UpdateProfile) {
        if let Some(name) = update.name {
            self.name = name.trim().to_string();
        }
        if let Some(phone) = update.phone {
            let phone = phone.trim();
            self.phone = (!phone.is_empty()).then(|| phone.to_string());
        }
        if let Some(mut addresses) = update.addresses {
            normalize_default_address(&mut addresses);
            self.addresses = addresses;
        }
        self.updated_at = Utc::now();
    }

    pub fn apply_admin_update(&mut self, update: AdminUpdateUser) {
        if let Some(roles) = update.roles {
            let mut unique = Vec::with_capacity(roles.len());
            for role in roles {
                if !unique.contains(&role) {
                    unique.push(role);
                }
            }
            if unique.is_empty() {
                unique.push(Role::Customer);
            }
            self.roles = unique;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        self.updated_at = Utc::now();
    }
}

/// At most one default address; the first one when none is flagged.
fn normalize_default_address(addresses: &mut [Address]) {
    let default = addresses.iter().position(|a| a.is_default).unwrap_or(0);
    for (index, address) in addresses.iter_mut().enumerate() {
        address.is_default = index == default;
    }
}
