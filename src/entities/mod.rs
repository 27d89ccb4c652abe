//! Database entities.
//!
//! Catalog tables (`stores`, `dishes`, `topping_groups`, `toppings`,
//! `ratings`) are owned by the catalog and only read here. Cart and order
//! tables hold priced snapshots copied from the catalog at mutation time.

pub mod cart;
pub mod cart_item;
pub mod cart_item_topping;
pub mod dish;
pub mod notification;
pub mod order;
pub mod order_item;
pub mod order_item_topping;
pub mod order_ship_info;
pub mod rating;
pub mod store;
pub mod topping;
pub mod topping_group;
