//! Priced snapshots and order pricing.
//!
//! A snapshot freezes the name and price of a dish or topping at the moment
//! it is written into a cart, and is copied verbatim into orders and back
//! into carts on reorder. Live catalog rows never flow past this boundary.

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{
    cart_item, cart_item_topping, dish, order_item, order_item_topping, topping,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ToppingSnapshot {
    pub topping_id: Uuid,
    pub name: String,
    pub price: Decimal,
}

impl From<&topping::Model> for ToppingSnapshot {
    fn from(live: &topping::Model) -> Self {
        Self {
            topping_id: live.id,
            name: live.name.clone(),
            price: live.price,
        }
    }
}

impl From<&cart_item_topping::Model> for ToppingSnapshot {
    fn from(row: &cart_item_topping::Model) -> Self {
        Self {
            topping_id: row.topping_id,
            name: row.topping_name.clone(),
            price: row.price,
        }
    }
}

impl From<&order_item_topping::Model> for ToppingSnapshot {
    fn from(row: &order_item_topping::Model) -> Self {
        Self {
            topping_id: row.topping_id,
            name: row.topping_name.clone(),
            price: row.price,
        }
    }
}

/// Dish line with its frozen unit price and topping prices
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemSnapshot {
    pub dish_id: Uuid,
    pub dish_name: String,
    pub unit_price: Decimal,
    pub quantity: i32,
    pub note: Option<String>,
    pub toppings: Vec<ToppingSnapshot>,
}

impl ItemSnapshot {
    /// Snapshot of a live dish with the given topping selection.
    pub fn from_catalog(
        live: &dish::Model,
        quantity: i32,
        note: Option<String>,
        toppings: &[topping::Model],
    ) -> Self {
        Self {
            dish_id: live.id,
            dish_name: live.name.clone(),
            unit_price: live.price,
            quantity,
            note,
            toppings: toppings.iter().map(ToppingSnapshot::from).collect(),
        }
    }

    pub fn from_cart_row(item: &cart_item::Model, toppings: &[cart_item_topping::Model]) -> Self {
        Self {
            dish_id: item.dish_id,
            dish_name: item.dish_name.clone(),
            unit_price: item.price,
            quantity: item.quantity,
            note: item.note.clone(),
            toppings: toppings.iter().map(ToppingSnapshot::from).collect(),
        }
    }

    pub fn from_order_row(item: &order_item::Model, toppings: &[order_item_topping::Model]) -> Self {
        Self {
            dish_id: item.dish_id,
            dish_name: item.dish_name.clone(),
            unit_price: item.price,
            quantity: item.quantity,
            note: item.note.clone(),
            toppings: toppings.iter().map(ToppingSnapshot::from).collect(),
        }
    }

    pub fn toppings_total(&self) -> Decimal {
        self.toppings.iter().map(|t| t.price).sum()
    }

    /// `(unit price + sum of topping prices) * quantity`
    pub fn line_total(&self) -> Decimal {
        (self.unit_price + self.toppings_total()) * Decimal::from(self.quantity)
    }

    /// Same as [`line_total`](Self::line_total), `None` when the amount
    /// does not fit in a `Decimal`.
    pub fn checked_line_total(&self) -> Option<Decimal> {
        let toppings = self
            .toppings
            .iter()
            .try_fold(Decimal::ZERO, |acc, t| acc.checked_add(t.price))?;
        self.unit_price
            .checked_add(toppings)?
            .checked_mul(Decimal::from(self.quantity))
    }
}

/// Money columns written onto an order at checkout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal_price: Decimal,
    pub total_discount: Decimal,
    pub shipping_fee: Decimal,
    pub final_total: Decimal,
}

/// Prices a set of snapshots. Discount and shipping are caller-supplied
/// inputs and are not re-derived here. Returns `None` on overflow.
pub fn price_order(
    items: &[ItemSnapshot],
    total_discount: Decimal,
    shipping_fee: Decimal,
) -> Option<OrderTotals> {
    let subtotal_price = items.iter().try_fold(Decimal::ZERO, |acc, item| {
        acc.checked_add(item.checked_line_total()?)
    })?;
    let final_total = subtotal_price
        .checked_sub(total_discount)?
        .checked_add(shipping_fee)?;
    Some(OrderTotals {
        subtotal_price,
        total_discount,
        shipping_fee,
        final_total,
    })
}
