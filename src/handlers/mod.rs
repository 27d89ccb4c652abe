pub mod carts;
pub mod common;
pub mod health;
pub mod orders;

use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::{carts::CartService, factory::ServiceFactory, orders::OrderService};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub carts: Arc<CartService>,
    pub orders: Arc<OrderService>,
}

impl AppServices {
    pub fn new(factory: &ServiceFactory, config: &AppConfig) -> Self {
        Self {
            carts: Arc::new(factory.cart_service()),
            orders: Arc::new(factory.order_service(config)),
        }
    }
}
