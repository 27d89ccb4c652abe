use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        cart, cart_item, cart_item_topping,
        dish::StockStatus,
        order, order_item, order_item_topping,
        store::{self, StoreStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        catalog::{self, RatingSummary},
        pricing::{ItemSnapshot, ToppingSnapshot},
    },
};

/// Body of `PUT /carts`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpsertCartItemInput {
    pub store_id: Uuid,
    pub dish_id: Uuid,
    /// New quantity; `0` removes the line
    #[validate(range(min = 0, max = 1000))]
    pub quantity: i32,
    #[serde(default)]
    pub toppings: Vec<Uuid>,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreSummary {
    pub id: Uuid,
    pub name: String,
    pub status: StoreStatus,
}

impl From<&store::Model> for StoreSummary {
    fn from(model: &store::Model) -> Self {
        Self {
            id: model.id,
            name: model.name.clone(),
            status: model.status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: Uuid,
    #[serde(flatten)]
    pub item: ItemSnapshot,
    pub line_total: Decimal,
}

/// Cart with its lines and their topping snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreSummary>,
    pub items: Vec<CartLine>,
    pub subtotal: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartListEntry {
    #[serde(flatten)]
    pub cart: CartView,
    #[serde(flatten)]
    pub rating: RatingSummary,
}

/// Outcome of a line upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartMutation {
    Updated(CartView),
    /// The last line went away, taking the cart with it
    Removed { cart_id: Uuid },
}

/// Cart Manager: one cart per (user, store), never persisted empty.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Lists the user's carts at approved stores, each with the store's
    /// rating aggregate.
    #[instrument(skip(self))]
    pub async fn list_carts(&self, user_id: Uuid) -> Result<Vec<CartListEntry>, ServiceError> {
        let db = &*self.db;
        let carts = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .order_by_desc(cart::Column::UpdatedAt)
            .all(db)
            .await?;

        let stores =
            catalog::stores_by_id(db, carts.iter().map(|c| c.store_id).collect()).await?;
        let carts: Vec<cart::Model> = carts
            .into_iter()
            .filter(|c| {
                stores
                    .get(&c.store_id)
                    .map_or(false, |s| s.status == StoreStatus::Approved)
            })
            .collect();
        if carts.is_empty() {
            return Err(ServiceError::NotFound("No carts found".to_string()));
        }

        let ratings =
            catalog::rating_summaries(db, carts.iter().map(|c| c.store_id).collect()).await?;

        let mut entries = Vec::with_capacity(carts.len());
        for cart in carts {
            let rating = ratings.get(&cart.store_id).copied().unwrap_or_default();
            let store = stores.get(&cart.store_id);
            let view = cart_view(db, cart, store).await?;
            entries.push(CartListEntry { cart: view, rating });
        }
        Ok(entries)
    }

    /// Cart detail; carts owned by someone else read as missing.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid, cart_id: Uuid) -> Result<CartView, ServiceError> {
        let db = &*self.db;
        let cart = cart::Entity::find_by_id(cart_id)
            .filter(cart::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", cart_id)))?;
        let store = catalog::find_store(db, cart.store_id).await?;
        cart_view(db, cart, store.as_ref()).await
    }

    /// Adds, overwrites or removes the line for `input.dish_id`.
    ///
    /// Dish and topping ownership are validated before anything is written.
    /// Quantity `0` removes the line; removing the last line deletes the
    /// cart and yields [`CartMutation::Removed`].
    #[instrument(skip(self, input), fields(store_id = %input.store_id, dish_id = %input.dish_id, quantity = input.quantity))]
    pub async fn upsert_item(
        &self,
        user_id: Uuid,
        input: UpsertCartItemInput,
    ) -> Result<CartMutation, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let dish = catalog::dish_in_store(&txn, input.store_id, input.dish_id).await?;
        let toppings = catalog::toppings_in_store(&txn, input.store_id, &input.toppings).await?;

        let existing_cart = find_cart(&txn, user_id, input.store_id).await?;
        let existing_item = match &existing_cart {
            Some(c) => cart_item::Entity::find()
                .filter(cart_item::Column::CartId.eq(c.id))
                .filter(cart_item::Column::DishId.eq(input.dish_id))
                .one(&txn)
                .await?,
            None => None,
        };

        let now = Utc::now();
        let cart = match (existing_cart, &existing_item, input.quantity) {
            (None, _, 0) => {
                return Err(ServiceError::EmptyOperation(
                    "Cart not found, nothing to remove".to_string(),
                ))
            }
            (Some(_), None, 0) => {
                return Err(ServiceError::EmptyOperation(
                    "Item is not in the cart, nothing to remove".to_string(),
                ))
            }
            (Some(cart), _, _) => cart,
            (None, _, _) => cart::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                store_id: Set(input.store_id),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await
            .map_err(|e| {
                ServiceError::from_insert(e, "A cart for this store was created concurrently")
            })?,
        };

        match existing_item {
            Some(item) if input.quantity == 0 => {
                delete_item_graph(&txn, item.id).await?;
            }
            Some(item) => {
                let item_id = item.id;
                let note = input.note.clone().or_else(|| item.note.clone());
                let mut active: cart_item::ActiveModel = item.into();
                active.quantity = Set(input.quantity);
                active.note = Set(note);
                active.updated_at = Set(now);
                active.update(&txn).await?;

                cart_item_topping::Entity::delete_many()
                    .filter(cart_item_topping::Column::CartItemId.eq(item_id))
                    .exec(&txn)
                    .await?;
                let snapshots: Vec<ToppingSnapshot> =
                    toppings.iter().map(ToppingSnapshot::from).collect();
                insert_topping_snapshots(&txn, item_id, &snapshots).await?;
            }
            None => {
                let snapshot =
                    ItemSnapshot::from_catalog(&dish, input.quantity, input.note.clone(), &toppings);
                insert_item_snapshot(&txn, cart.id, &snapshot).await?;
            }
        }

        let remaining = cart_item::Entity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .count(&txn)
            .await?;

        if remaining == 0 {
            cart::Entity::delete_by_id(cart.id).exec(&txn).await?;
            txn.commit().await?;

            metrics::counter!("carts.removed_empty", 1);
            info!(cart_id = %cart.id, %user_id, "Cart deleted because it's empty");
            self.event_sender
                .send_or_log(Event::CartRemoved {
                    cart_id: cart.id,
                    user_id,
                    store_id: cart.store_id,
                })
                .await;
            return Ok(CartMutation::Removed { cart_id: cart.id });
        }

        let cart_id = cart.id;
        let mut active: cart::ActiveModel = cart.into();
        active.updated_at = Set(now);
        let cart = active.update(&txn).await?;
        txn.commit().await?;

        info!(%cart_id, %user_id, "Cart updated");
        self.event_sender
            .send_or_log(Event::CartUpdated {
                cart_id,
                user_id,
                store_id: cart.store_id,
            })
            .await;

        let db = &*self.db;
        let store = catalog::find_store(db, cart.store_id).await?;
        Ok(CartMutation::Updated(cart_view(db, cart, store.as_ref()).await?))
    }

    /// Deletes the user's cart for one store; a missing cart is `NotFound`.
    #[instrument(skip(self))]
    pub async fn clear_store_cart(&self, user_id: Uuid, store_id: Uuid) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;
        let cart = find_cart(&txn, user_id, store_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart not found".to_string()))?;
        delete_cart_graph(&txn, cart.id).await?;
        txn.commit().await?;

        info!(cart_id = %cart.id, %user_id, "Cart cleared");
        self.event_sender
            .send_or_log(Event::CartRemoved {
                cart_id: cart.id,
                user_id,
                store_id,
            })
            .await;
        Ok(())
    }

    /// Deletes every cart the user holds. Returns how many were removed;
    /// having none is not an error.
    #[instrument(skip(self))]
    pub async fn clear_all(&self, user_id: Uuid) -> Result<u64, ServiceError> {
        let txn = self.db.begin().await?;
        let carts = cart::Entity::find()
            .filter(cart::Column::UserId.eq(user_id))
            .all(&txn)
            .await?;

        let mut removed = 0;
        for cart in &carts {
            removed += delete_cart_graph(&txn, cart.id).await?;
        }
        txn.commit().await?;

        info!(%user_id, carts_removed = removed, "All carts cleared");
        self.event_sender
            .send_or_log(Event::CartsCleared {
                user_id,
                carts_removed: removed,
            })
            .await;
        Ok(removed)
    }

    /// Rebuilds the user's cart for the order's store from the order's
    /// snapshots, replacing any cart already there. Historical prices are
    /// reproduced; only availability is checked against the live catalog.
    #[instrument(skip(self))]
    pub async fn reconstruct_from_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let order = order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;
        if order.user_id != user_id {
            warn!(%order_id, %user_id, "Reorder attempted by non-owner");
            return Err(ServiceError::Forbidden(
                "You can only reorder your own orders".to_string(),
            ));
        }

        let store = catalog::find_store(&txn, order.store_id).await?;
        let store = match store {
            Some(s) if !s.is_blocked() => s,
            _ => {
                return Err(ServiceError::BlockedStore(
                    "Store is blocked and cannot take orders".to_string(),
                ))
            }
        };

        let items = order_snapshots(&txn, order.id).await?;
        if items.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "Order has no items to reorder".to_string(),
            ));
        }

        let live = catalog::dishes_by_id(&txn, items.iter().map(|i| i.dish_id).collect()).await?;
        let unavailable: Vec<&str> = items
            .iter()
            .filter(|i| {
                live.get(&i.dish_id)
                    .map_or(true, |d| d.stock_status == StockStatus::OutOfStock)
            })
            .map(|i| i.dish_name.as_str())
            .collect();
        if !unavailable.is_empty() {
            return Err(ServiceError::OutOfStock(format!(
                "Dishes currently unavailable: {}",
                unavailable.join(", ")
            )));
        }

        if let Some(existing) = find_cart(&txn, user_id, order.store_id).await? {
            delete_cart_graph(&txn, existing.id).await?;
        }

        let now = Utc::now();
        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            store_id: Set(order.store_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| ServiceError::from_insert(e, "A cart for this store was created concurrently"))?;

        for item in &items {
            insert_item_snapshot(&txn, cart.id, item).await?;
        }

        let view = cart_view(&txn, cart, Some(&store)).await?;
        txn.commit().await?;

        info!(cart_id = %view.id, %order_id, %user_id, "Cart reconstructed from order");
        self.event_sender
            .send_or_log(Event::CartReconstructed {
                cart_id: view.id,
                source_order_id: order_id,
                user_id,
            })
            .await;
        Ok(view)
    }
}

pub(crate) async fn find_cart<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    store_id: Uuid,
) -> Result<Option<cart::Model>, ServiceError> {
    Ok(cart::Entity::find()
        .filter(cart::Column::UserId.eq(user_id))
        .filter(cart::Column::StoreId.eq(store_id))
        .one(conn)
        .await?)
}

/// Items of a cart paired with their toppings, oldest line first.
pub(crate) async fn cart_lines<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> Result<Vec<(cart_item::Model, Vec<cart_item_topping::Model>)>, ServiceError> {
    let items = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .all(conn)
        .await?;
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let mut toppings: HashMap<Uuid, Vec<cart_item_topping::Model>> = HashMap::new();
    for row in cart_item_topping::Entity::find()
        .filter(cart_item_topping::Column::CartItemId.is_in(items.iter().map(|i| i.id)))
        .all(conn)
        .await?
    {
        toppings.entry(row.cart_item_id).or_default().push(row);
    }

    Ok(items
        .into_iter()
        .map(|item| {
            let t = toppings.remove(&item.id).unwrap_or_default();
            (item, t)
        })
        .collect())
}

async fn cart_view<C: ConnectionTrait>(
    conn: &C,
    cart: cart::Model,
    store: Option<&store::Model>,
) -> Result<CartView, ServiceError> {
    let items: Vec<CartLine> = cart_lines(conn, cart.id)
        .await?
        .iter()
        .map(|(item, toppings)| {
            let snapshot = ItemSnapshot::from_cart_row(item, toppings);
            CartLine {
                id: item.id,
                line_total: snapshot.line_total(),
                item: snapshot,
            }
        })
        .collect();

    Ok(CartView {
        id: cart.id,
        user_id: cart.user_id,
        store_id: cart.store_id,
        store: store.map(StoreSummary::from),
        subtotal: items.iter().map(|l| l.line_total).sum(),
        items,
        created_at: cart.created_at,
        updated_at: cart.updated_at,
    })
}

/// Snapshots of an order's lines, as stored at checkout.
pub(crate) async fn order_snapshots<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<Vec<ItemSnapshot>, ServiceError> {
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(conn)
        .await?;
    if items.is_empty() {
        return Ok(Vec::new());
    }

    let mut toppings: HashMap<Uuid, Vec<order_item_topping::Model>> = HashMap::new();
    for row in order_item_topping::Entity::find()
        .filter(order_item_topping::Column::OrderItemId.is_in(items.iter().map(|i| i.id)))
        .all(conn)
        .await?
    {
        toppings.entry(row.order_item_id).or_default().push(row);
    }

    Ok(items
        .iter()
        .map(|item| {
            let t = toppings.get(&item.id).map(Vec::as_slice).unwrap_or(&[]);
            ItemSnapshot::from_order_row(item, t)
        })
        .collect())
}

async fn insert_item_snapshot<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
    snapshot: &ItemSnapshot,
) -> Result<cart_item::Model, ServiceError> {
    let now = Utc::now();
    let item = cart_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        cart_id: Set(cart_id),
        dish_id: Set(snapshot.dish_id),
        dish_name: Set(snapshot.dish_name.clone()),
        price: Set(snapshot.unit_price),
        quantity: Set(snapshot.quantity),
        note: Set(snapshot.note.clone()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|e| ServiceError::from_insert(e, "This dish was added to the cart concurrently"))?;

    insert_topping_snapshots(conn, item.id, &snapshot.toppings).await?;
    Ok(item)
}

async fn insert_topping_snapshots<C: ConnectionTrait>(
    conn: &C,
    cart_item_id: Uuid,
    toppings: &[ToppingSnapshot],
) -> Result<(), ServiceError> {
    if toppings.is_empty() {
        return Ok(());
    }
    cart_item_topping::Entity::insert_many(toppings.iter().map(|t| {
        cart_item_topping::ActiveModel {
            id: Set(Uuid::new_v4()),
            cart_item_id: Set(cart_item_id),
            topping_id: Set(t.topping_id),
            topping_name: Set(t.name.clone()),
            price: Set(t.price),
        }
    }))
    .exec(conn)
    .await?;
    Ok(())
}

async fn delete_item_graph<C: ConnectionTrait>(conn: &C, item_id: Uuid) -> Result<(), ServiceError> {
    cart_item_topping::Entity::delete_many()
        .filter(cart_item_topping::Column::CartItemId.eq(item_id))
        .exec(conn)
        .await?;
    cart_item::Entity::delete_by_id(item_id).exec(conn).await?;
    Ok(())
}

/// Deletes a cart with its items and toppings. Returns the number of cart
/// rows removed (0 when another writer got there first).
pub(crate) async fn delete_cart_graph<C: ConnectionTrait>(
    conn: &C,
    cart_id: Uuid,
) -> Result<u64, ServiceError> {
    let item_ids: Vec<Uuid> = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|i| i.id)
        .collect();

    if !item_ids.is_empty() {
        cart_item_topping::Entity::delete_many()
            .filter(cart_item_topping::Column::CartItemId.is_in(item_ids))
            .exec(conn)
            .await?;
        cart_item::Entity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_id))
            .exec(conn)
            .await?;
    }

    let result = cart::Entity::delete_by_id(cart_id).exec(conn).await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_input_uses_camel_case_and_defaults() {
        let store_id = Uuid::new_v4();
        let dish_id = Uuid::new_v4();
        let json = format!(r#"{{"storeId":"{store_id}","dishId":"{dish_id}","quantity":2}}"#);
        let input: UpsertCartItemInput = serde_json::from_str(&json).unwrap();

        assert_eq!(input.store_id, store_id);
        assert_eq!(input.quantity, 2);
        assert!(input.toppings.is_empty());
        assert!(input.note.is_none());
        assert!(input.validate().is_ok());
    }

    #[test]
    fn negative_quantity_fails_validation() {
        let input = UpsertCartItemInput {
            store_id: Uuid::new_v4(),
            dish_id: Uuid::new_v4(),
            quantity: -1,
            toppings: vec![],
            note: None,
        };
        assert!(input.validate().is_err());
    }
}
