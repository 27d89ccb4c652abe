// Catalog lookups and snapshot pricing
pub mod catalog;
pub mod pricing;

// Cart Manager
pub mod carts;

// Order Lifecycle Engine
pub mod order_status;
pub mod orders;

// Collaborators
pub mod notifications;

// Service factory for dependency injection
pub mod factory;
