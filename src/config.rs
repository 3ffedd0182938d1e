use std::env;

/// Knobs for the checkout engine and the inventory ledger.
#[derive(Debug, Clone)]
pub struct CheckoutPolicy {
    /// Flat shipping fee added to every order, in minor units.
    pub shipping_fee: i64,
    /// Empty the cart once an order has been placed from it.
    pub clear_cart_on_checkout: bool,
    /// Attempts a stock update gets before giving up with a conflict.
    pub stock_retry_limit: u32,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            shipping_fee: 30_000,
            clear_cart_on_checkout: false,
            stock_retry_limit: 5,
        }
    }
}

impl CheckoutPolicy {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let shipping_fee = env::var("SHIPPING_FEE")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .filter(|fee| *fee >= 0)
            .unwrap_or(defaults.shipping_fee);
        let clear_cart_on_checkout = env::var("CLEAR_CART_AFTER_CHECKOUT")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(defaults.clear_cart_on_checkout);
        let stock_retry_limit = env::var("STOCK_RETRY_LIMIT")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.stock_retry_limit);
        Self {
            shipping_fee,
            clear_cart_on_checkout,
            stock_retry_limit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub policy: CheckoutPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        Ok(Self {
            port,
            database_url,
            host,
            policy: CheckoutPolicy::from_env(),
        })
    }
}
