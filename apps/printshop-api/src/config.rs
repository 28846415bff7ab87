use axum_helpers::JwtConfig;
use core_config::{AppInfo, ConfigError, FromEnv, app_info, server::ServerConfig};
use database::MongoConfig;
use domain_orders::PricingConfig;
use media_store::MediaConfig;

pub use core_config::Environment;

/// Application configuration, composed from each library's own config.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub mongodb: MongoConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub media: MediaConfig,
    pub pricing: PricingConfig,
    pub admin: Option<AdminSeed>,
    pub environment: Environment,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let mongodb = MongoConfig::from_env()?.with_app_name("printshop-api");

        Ok(Self {
            app: app_info!(),
            mongodb,
            server: ServerConfig::from_env()?,
            jwt: JwtConfig::from_env()?,
            media: MediaConfig::from_env()?,
            pricing: PricingConfig::from_env()?,
            admin: AdminSeed::from_env_optional()?,
            environment,
        })
    }
}

/// Bootstrap admin account created at startup when missing.
///
/// - `ADMIN_EMAIL`, `ADMIN_PASSWORD` (both or neither)
/// - `ADMIN_NAME` (default: `Administrator`)
#[derive(Clone)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
    pub name: String,
}

impl std::fmt::Debug for AdminSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminSeed")
            .field("email", &self.email)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl AdminSeed {
    /// `None` when neither `ADMIN_EMAIL` nor `ADMIN_PASSWORD` is set.
    pub fn from_env_optional() -> Result<Option<Self>, ConfigError> {
        let email = std::env::var("ADMIN_EMAIL").ok().filter(|v| !v.is_empty());
        let password = std::env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty());

        match (email, password) {
            (None, None) => Ok(None),
            (Some(email), Some(password)) => Ok(Some(Self {
                email,
                password,
                name: core_config::env_or_default("ADMIN_NAME", "Administrator"),
            })),
            (Some(_), None) => Err(ConfigError::MissingEnvVar("ADMIN_PASSWORD".to_string())),
            (None, Some(_)) => Err(ConfigError::MissingEnvVar("ADMIN_EMAIL".to_string())),
        }
    }
}
