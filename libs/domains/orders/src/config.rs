use core_config::{ConfigError, FromEnv, env_parse_or_default};

/// Checkout pricing, all amounts in cents.
///
/// - `ORDER_TAX_RATE_BPS` (default: 0) tax in basis points of the subtotal
/// - `ORDER_SHIPPING_FEE` (default: 500)
/// - `ORDER_EXPRESS_SHIPPING_FEE` (default: 1500)
/// - `ORDER_FREE_SHIPPING_THRESHOLD` (default: 5000, 0 disables free shipping)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingConfig {
    pub tax_rate_bps: u32,
    pub shipping_fee: i64,
    pub express_shipping_fee: i64,
    pub free_shipping_threshold: i64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate_bps: 0,
            shipping_fee: 500,
            express_shipping_fee: 1500,
            free_shipping_threshold: 5000,
        }
    }
}

impl FromEnv for PricingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            tax_rate_bps: env_parse_or_default("ORDER_TAX_RATE_BPS", defaults.tax_rate_bps)?,
            shipping_fee: env_parse_or_default("ORDER_SHIPPING_FEE", defaults.shipping_fee)?,
            express_shipping_fee: env_parse_or_default(
                "ORDER_EXPRESS_SHIPPING_FEE",
                defaults.express_shipping_fee,
            )?,
            free_shipping_threshold: env_parse_or_default(
                "ORDER_FREE_SHIPPING_THRESHOLD",
                defaults.free_shipping_threshold,
            )?,
        };

        if config.tax_rate_bps > 10_000 {
            return Err(ConfigError::ParseError {
                key: "ORDER_TAX_RATE_BPS".to_string(),
                details: "must be at most 10000 (100%)".to_string(),
            });
        }
        for (key, value) in [
            ("ORDER_SHIPPING_FEE", config.shipping_fee),
            ("ORDER_EXPRESS_SHIPPING_FEE", config.express_shipping_fee),
            ("ORDER_FREE_SHIPPING_THRESHOLD", config.free_shipping_threshold),
        ] {
            if value < 0 {
                return Err(ConfigError::ParseError {
                    key: key.to_string(),
                    details: "must not be negative".to_string(),
                });
            }
        }

        Ok(config)
    }
}
