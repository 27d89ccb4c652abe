use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::{Expr, Func},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, instrument, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    entities::{
        order::{self, OrderStatus, PaymentMethod, PaymentStatus},
        order_item, order_item_topping, order_ship_info,
        store::{self, StoreStatus},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        carts::{self, StoreSummary},
        catalog,
        notifications::{notify_detached, NewNotification, NotificationSink},
        order_status::{is_valid_transition, CANCELLED},
        pricing::{price_order, ItemSnapshot},
    },
};

/// Largest shipping fee or discount accepted at checkout; fits `NUMERIC(19, 4)`.
const MAX_MONEY_INPUT: Decimal = dec!(999999999999999.9999);

/// Body of `POST /carts/checkout`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInput {
    pub store_id: Uuid,
    /// `cash` or `credit_card`
    pub payment_method: String,
    #[validate(length(max = 100))]
    pub customer_name: Option<String>,
    #[validate(length(max = 20))]
    pub customer_phonenumber: Option<String>,
    pub delivery_address: Option<String>,
    #[validate(length(max = 255))]
    pub detail_address: Option<String>,
    #[validate(length(max = 500))]
    pub note: Option<String>,
    /// `[longitude, latitude]`
    #[schema(value_type = Option<Vec<f64>>)]
    pub location: Option<Vec<Value>>,
    pub shipping_fee: Option<Decimal>,
    pub total_discount: Option<Decimal>,
}

/// Checkout input after every precondition has been checked
#[derive(Debug, Clone, PartialEq)]
struct CheckedCheckout {
    payment_method: PaymentMethod,
    delivery_address: String,
    longitude: f64,
    latitude: f64,
    shipping_fee: Decimal,
    total_discount: Decimal,
}

impl CheckoutInput {
    fn check(&self) -> Result<CheckedCheckout, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::InvalidCheckout(e.to_string()))?;

        let payment_method: PaymentMethod = self
            .payment_method
            .parse()
            .map_err(ServiceError::InvalidCheckout)?;

        let delivery_address = self
            .delivery_address
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| ServiceError::InvalidCheckout("Delivery address is required".to_string()))?
            .to_string();

        let (longitude, latitude) = match self.location.as_deref() {
            Some([lng, lat]) => match (lng.as_f64(), lat.as_f64()) {
                (Some(lng), Some(lat)) if lng.is_finite() && lat.is_finite() => (lng, lat),
                _ => {
                    return Err(ServiceError::InvalidCheckout(
                        "Location must contain two numbers".to_string(),
                    ))
                }
            },
            _ => {
                return Err(ServiceError::InvalidCheckout(
                    "Location must be [longitude, latitude]".to_string(),
                ))
            }
        };

        let shipping_fee = self.shipping_fee.unwrap_or(Decimal::ZERO);
        let total_discount = self.total_discount.unwrap_or(Decimal::ZERO);
        if shipping_fee.is_sign_negative() || total_discount.is_sign_negative() {
            return Err(ServiceError::InvalidCheckout(
                "Shipping fee and discount cannot be negative".to_string(),
            ));
        }
        if shipping_fee > MAX_MONEY_INPUT || total_discount > MAX_MONEY_INPUT {
            return Err(ServiceError::InvalidCheckout(
                "Shipping fee and discount are out of range".to_string(),
            ));
        }

        Ok(CheckedCheckout {
            payment_method,
            delivery_address,
            longitude,
            latitude,
            shipping_fee,
            total_discount,
        })
    }
}

/// Body of `PUT /orders/:orderId/status`
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateStatusInput {
    pub status: String,
}

/// Body of `PUT /orders/:orderId`; empty values are ignored
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderInput {
    pub payment_status: Option<String>,
    #[validate(length(max = 500))]
    pub staff_note: Option<String>,
}

/// Query of `GET /stores/:storeId/orders`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StoreOrderQuery {
    /// Comma separated statuses
    pub status: Option<String>,
    /// Matches customer name or phone number
    pub name: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl StoreOrderQuery {
    fn statuses(&self) -> Result<Vec<OrderStatus>, ServiceError> {
        self.status
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<OrderStatus>()
                    .map_err(|e| ServiceError::InvalidRequest(e.to_string()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub id: Uuid,
    #[serde(flatten)]
    pub item: ItemSnapshot,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShipInfoView {
    pub customer_name: Option<String>,
    pub customer_phonenumber: Option<String>,
    pub delivery_address: String,
    pub detail_address: Option<String>,
    pub note: Option<String>,
    /// `[longitude, latitude]`
    #[schema(value_type = Vec<f64>)]
    pub location: [f64; 2],
}

impl From<order_ship_info::Model> for ShipInfoView {
    fn from(model: order_ship_info::Model) -> Self {
        Self {
            customer_name: model.customer_name,
            customer_phonenumber: model.customer_phonenumber,
            delivery_address: model.delivery_address,
            detail_address: model.detail_address,
            note: model.note,
            location: [model.longitude, model.latitude],
        }
    }
}

/// Order aggregate: the order row with its lines, toppings and ship info
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub store_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreSummary>,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub subtotal_price: Decimal,
    pub total_discount: Decimal,
    pub shipping_fee: Decimal,
    pub final_total: Decimal,
    pub staff_note: Option<String>,
    pub items: Vec<OrderLine>,
    pub ship_info: Option<ShipInfoView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One page of a store's order board
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreOrderPage {
    pub orders: Vec<OrderView>,
    pub total: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

/// Result of a cancellation; the order itself no longer exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelledOrder {
    pub id: Uuid,
    pub status: String,
}

/// Order Lifecycle Engine: checkout, status progression and cancellation.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
    notifications: Arc<dyn NotificationSink>,
    default_page_size: u64,
    max_page_size: u64,
}

impl OrderService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        event_sender: Arc<EventSender>,
        notifications: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            db,
            event_sender,
            notifications,
            default_page_size: 20,
            max_page_size: 100,
        }
    }

    pub fn with_page_sizes(mut self, default_page_size: u64, max_page_size: u64) -> Self {
        self.default_page_size = default_page_size.max(1);
        self.max_page_size = max_page_size.max(self.default_page_size);
        self
    }

    /// Converts the user's cart for `input.store_id` into an order.
    ///
    /// Order, lines, toppings and ship info are written and the cart deleted
    /// in one transaction. The cart delete must remove exactly one row, so a
    /// concurrent checkout of the same cart fails with `Conflict`.
    #[instrument(skip(self, input), fields(store_id = %input.store_id))]
    pub async fn checkout(
        &self,
        user_id: Uuid,
        input: CheckoutInput,
    ) -> Result<OrderView, ServiceError> {
        let checked = input.check()?;

        let txn = self.db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin checkout transaction");
            ServiceError::DatabaseError(e)
        })?;

        let cart = carts::find_cart(&txn, user_id, input.store_id)
            .await?
            .ok_or_else(|| {
                ServiceError::InvalidCheckout("No cart found for this store".to_string())
            })?;
        let lines = carts::cart_lines(&txn, cart.id).await?;
        if lines.is_empty() {
            return Err(ServiceError::InvalidCheckout("Cart is empty".to_string()));
        }
        let store = catalog::require_store(&txn, input.store_id).await?;

        let snapshots: Vec<ItemSnapshot> = lines
            .iter()
            .map(|(item, toppings)| ItemSnapshot::from_cart_row(item, toppings))
            .collect();
        let totals = price_order(&snapshots, checked.total_discount, checked.shipping_fee)
            .ok_or_else(|| {
                ServiceError::InvalidCheckout("Order total is out of range".to_string())
            })?;

        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            store_id: Set(store.id),
            status: Set(OrderStatus::Pending),
            payment_method: Set(checked.payment_method),
            payment_status: Set(PaymentStatus::Unpaid),
            subtotal_price: Set(totals.subtotal_price),
            total_discount: Set(totals.total_discount),
            shipping_fee: Set(totals.shipping_fee),
            final_total: Set(totals.final_total),
            staff_note: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for snapshot in &snapshots {
            insert_order_line(&txn, order.id, snapshot).await?;
        }

        order_ship_info::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            customer_name: Set(input.customer_name.clone()),
            customer_phonenumber: Set(input.customer_phonenumber.clone()),
            delivery_address: Set(checked.delivery_address),
            detail_address: Set(input.detail_address.clone()),
            note: Set(input.note.clone()),
            longitude: Set(checked.longitude),
            latitude: Set(checked.latitude),
        }
        .insert(&txn)
        .await?;

        if carts::delete_cart_graph(&txn, cart.id).await? != 1 {
            warn!(cart_id = %cart.id, %user_id, "Cart consumed by a concurrent checkout");
            return Err(ServiceError::Conflict(
                "Cart was already checked out".to_string(),
            ));
        }

        let view = order_view(&txn, order, Some(&store)).await?;
        txn.commit().await?;

        metrics::counter!("orders.checkout.completed", 1);
        info!(
            order_id = %view.id,
            %user_id,
            items = view.items.len(),
            final_total = %view.final_total,
            "Order placed"
        );

        notify_detached(
            self.notifications.as_ref(),
            NewNotification::new_order(store.owner_id, view.id, &store.name),
        )
        .await;
        self.event_sender
            .send_or_log(Event::OrderPlaced {
                order_id: view.id,
                user_id,
                store_id: view.store_id,
                final_total: view.final_total,
            })
            .await;

        Ok(view)
    }

    /// The user's orders at approved stores, most recently updated first.
    #[instrument(skip(self))]
    pub async fn list_user_orders(&self, user_id: Uuid) -> Result<Vec<OrderView>, ServiceError> {
        let db = &*self.db;
        let orders = order::Entity::find()
            .join(JoinType::InnerJoin, order::Relation::Store.def())
            .filter(order::Column::UserId.eq(user_id))
            .filter(store::Column::Status.eq(StoreStatus::Approved))
            .order_by_desc(order::Column::UpdatedAt)
            .all(db)
            .await?;
        if orders.is_empty() {
            return Err(ServiceError::NotFound("No orders found".to_string()));
        }
        order_views(db, orders).await
    }

    /// Order detail for its owner or anyone managing its store.
    #[instrument(skip(self, requester), fields(user_id = %requester.user_id))]
    pub async fn get_order(
        &self,
        requester: &AuthUser,
        order_id: Uuid,
    ) -> Result<OrderView, ServiceError> {
        let db = &*self.db;
        let order = require_order(db, order_id).await?;
        let store = catalog::find_store(db, order.store_id).await?;

        let is_staff = store.as_ref().map_or(requester.is_admin(), |s| requester.can_manage_store(s));
        if order.user_id != requester.user_id && !is_staff {
            return Err(ServiceError::Forbidden(
                "You are not allowed to view this order".to_string(),
            ));
        }
        order_view(db, order, store.as_ref()).await
    }

    /// Paginated order board for store staff.
    #[instrument(skip(self, requester, query), fields(user_id = %requester.user_id))]
    pub async fn list_store_orders(
        &self,
        requester: &AuthUser,
        store_id: Uuid,
        query: StoreOrderQuery,
    ) -> Result<StoreOrderPage, ServiceError> {
        let db = &*self.db;
        let store = catalog::require_store(db, store_id).await?;
        ensure_manages(requester, &store)?;

        let statuses = query.statuses()?;
        let limit = query
            .limit
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);
        let page = query.page.filter(|p| *p > 0).unwrap_or(1);

        let mut select = order::Entity::find()
            .filter(order::Column::StoreId.eq(store_id))
            .order_by_desc(order::Column::CreatedAt);
        if !statuses.is_empty() {
            select = select.filter(order::Column::Status.is_in(statuses));
        }
        if let Some(name) = query.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let pattern = format!("%{}%", name.to_lowercase());
            select = select
                .join(JoinType::InnerJoin, order::Relation::ShipInfo.def())
                .filter(
                    Condition::any()
                        .add(
                            Expr::expr(Func::lower(Expr::col((
                                order_ship_info::Entity,
                                order_ship_info::Column::CustomerName,
                            ))))
                            .like(pattern.clone()),
                        )
                        .add(
                            Expr::col((
                                order_ship_info::Entity,
                                order_ship_info::Column::CustomerPhonenumber,
                            ))
                            .like(pattern),
                        ),
                );
        }

        let paginator = select.paginate(db, limit);
        let counts = paginator.num_items_and_pages().await?;
        let orders = paginator.fetch_page(page - 1).await?;

        Ok(StoreOrderPage {
            orders: order_views(db, orders).await?,
            total: counts.number_of_items,
            current_page: page,
            total_pages: counts.number_of_pages,
        })
    }

    /// Applies a staff-driven delivery transition.
    ///
    /// The update is conditional on the status read, so two staff members
    /// racing on the same order cannot both succeed.
    #[instrument(skip(self, requester), fields(user_id = %requester.user_id))]
    pub async fn update_status(
        &self,
        requester: &AuthUser,
        order_id: Uuid,
        status: &str,
    ) -> Result<OrderView, ServiceError> {
        let requested = status.trim().to_ascii_lowercase();
        // `cancelled` is a real state but only reachable through cancel_order
        let target = match requested.parse::<OrderStatus>() {
            Ok(target) => Some(target),
            Err(_) if requested == CANCELLED => None,
            Err(e) => return Err(ServiceError::InvalidRequest(e.to_string())),
        };

        let (order, store) = self.staff_order(requester, order_id).await?;
        let target = match target {
            Some(target) if is_valid_transition(order.status, target) => target,
            _ => {
                warn!(%order_id, from = %order.status, to = %requested, "Rejected status transition");
                return Err(ServiceError::InvalidTransition {
                    from: order.status.to_string(),
                    to: requested,
                });
            }
        };

        self.move_status(order, store, target).await
    }

    /// Advances an order one step along the intake chain
    /// (`preorder -> pending -> confirmed -> taken`).
    #[instrument(skip(self, requester), fields(user_id = %requester.user_id))]
    pub async fn advance_intake(
        &self,
        requester: &AuthUser,
        order_id: Uuid,
    ) -> Result<OrderView, ServiceError> {
        let (order, store) = self.staff_order(requester, order_id).await?;
        let next = order.status.next_intake().ok_or_else(|| {
            ServiceError::Conflict(format!(
                "Order in status {} has no further intake step",
                order.status
            ))
        })?;
        self.move_status(order, store, next).await
    }

    /// Staff edit of payment status and internal note. Pricing, lines and
    /// ship info are never touched.
    #[instrument(skip(self, requester, input), fields(user_id = %requester.user_id))]
    pub async fn update_metadata(
        &self,
        requester: &AuthUser,
        order_id: Uuid,
        input: UpdateOrderInput,
    ) -> Result<OrderView, ServiceError> {
        input.validate()?;
        let payment_status = match input.payment_status.as_deref().map(str::trim) {
            Some(s) if !s.is_empty() => Some(
                s.parse::<PaymentStatus>()
                    .map_err(ServiceError::InvalidRequest)?,
            ),
            _ => None,
        };
        let staff_note = input
            .staff_note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let (order, store) = self.staff_order(requester, order_id).await?;
        if payment_status.is_none() && staff_note.is_none() {
            return order_view(&*self.db, order, Some(&store)).await;
        }

        let mut active: order::ActiveModel = order.into();
        if let Some(payment_status) = payment_status {
            active.payment_status = Set(payment_status);
        }
        if let Some(note) = staff_note {
            active.staff_note = Set(Some(note));
        }
        active.updated_at = Set(Utc::now());
        let order = active.update(&*self.db).await?;

        info!(%order_id, payment_status = ?order.payment_status, "Order metadata updated");
        order_view(&*self.db, order, Some(&store)).await
    }

    /// Withdraws a pre-transit order by deleting it with its lines,
    /// toppings and ship info.
    #[instrument(skip(self))]
    pub async fn cancel(&self, user_id: Uuid, order_id: Uuid) -> Result<CancelledOrder, ServiceError> {
        let txn = self.db.begin().await?;

        let order = require_order(&txn, order_id).await?;
        if order.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "You can only cancel your own orders".to_string(),
            ));
        }
        if !order.status.is_cancellable() {
            warn!(%order_id, status = %order.status, "Rejected cancellation");
            return Err(ServiceError::Conflict(format!(
                "Order in status {} can no longer be cancelled",
                order.status
            )));
        }

        // Claim the row while it is still cancellable; a concurrent staff
        // update leaves zero rows here.
        let claimed = order::Entity::update_many()
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.is_in([OrderStatus::Preorder, OrderStatus::Pending]))
            .exec(&txn)
            .await?;
        if claimed.rows_affected != 1 {
            return Err(ServiceError::Conflict(
                "Order changed while cancelling".to_string(),
            ));
        }

        delete_order_graph(&txn, order_id).await?;
        txn.commit().await?;

        metrics::counter!("orders.cancelled", 1);
        info!(%order_id, %user_id, "Order cancelled");
        self.event_sender
            .send_or_log(Event::OrderCancelled { order_id, user_id })
            .await;

        Ok(CancelledOrder {
            id: order_id,
            status: CANCELLED.to_string(),
        })
    }

    async fn staff_order(
        &self,
        requester: &AuthUser,
        order_id: Uuid,
    ) -> Result<(order::Model, store::Model), ServiceError> {
        let db = &*self.db;
        let order = require_order(db, order_id).await?;
        let store = catalog::require_store(db, order.store_id).await?;
        ensure_manages(requester, &store)?;
        Ok((order, store))
    }

    async fn move_status(
        &self,
        order: order::Model,
        store: store::Model,
        target: OrderStatus,
    ) -> Result<OrderView, ServiceError> {
        let db = &*self.db;
        let from = order.status;
        let result = order::Entity::update_many()
            .col_expr(order::Column::Status, Expr::value(target.as_str()))
            .col_expr(order::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::Status.eq(from))
            .exec(db)
            .await?;
        if result.rows_affected != 1 {
            return Err(ServiceError::Conflict(format!(
                "Order {} changed concurrently",
                order.id
            )));
        }

        let order = require_order(db, order.id).await?;
        info!(order_id = %order.id, %from, to = %target, "Order status changed");
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id: order.id,
                old_status: from.to_string(),
                new_status: target.to_string(),
            })
            .await;

        order_view(db, order, Some(&store)).await
    }
}

fn ensure_manages(requester: &AuthUser, store: &store::Model) -> Result<(), ServiceError> {
    if requester.can_manage_store(store) {
        Ok(())
    } else {
        warn!(user_id = %requester.user_id, store_id = %store.id, "Store management denied");
        Err(ServiceError::Forbidden(
            "You are not staff of this store".to_string(),
        ))
    }
}

async fn require_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
}

async fn insert_order_line<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    snapshot: &ItemSnapshot,
) -> Result<(), ServiceError> {
    let item = order_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        dish_id: Set(snapshot.dish_id),
        dish_name: Set(snapshot.dish_name.clone()),
        price: Set(snapshot.unit_price),
        quantity: Set(snapshot.quantity),
        note: Set(snapshot.note.clone()),
        line_total: Set(snapshot.line_total()),
    }
    .insert(conn)
    .await?;

    if !snapshot.toppings.is_empty() {
        order_item_topping::Entity::insert_many(snapshot.toppings.iter().map(|t| {
            order_item_topping::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_item_id: Set(item.id),
                topping_id: Set(t.topping_id),
                topping_name: Set(t.name.clone()),
                price: Set(t.price),
            }
        }))
        .exec(conn)
        .await?;
    }
    Ok(())
}

async fn delete_order_graph<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> Result<(), ServiceError> {
    let item_ids: Vec<Uuid> = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|i| i.id)
        .collect();

    if !item_ids.is_empty() {
        order_item_topping::Entity::delete_many()
            .filter(order_item_topping::Column::OrderItemId.is_in(item_ids))
            .exec(conn)
            .await?;
    }
    order_item::Entity::delete_many()
        .filter(order_item::Column::OrderId.eq(order_id))
        .exec(conn)
        .await?;
    order_ship_info::Entity::delete_many()
        .filter(order_ship_info::Column::OrderId.eq(order_id))
        .exec(conn)
        .await?;
    order::Entity::delete_by_id(order_id).exec(conn).await?;
    Ok(())
}

async fn order_view<C: ConnectionTrait>(
    conn: &C,
    order: order::Model,
    store: Option<&store::Model>,
) -> Result<OrderView, ServiceError> {
    let stores: HashMap<Uuid, store::Model> = store.map(|s| (s.id, s.clone())).into_iter().collect();
    let mut views = assemble(conn, vec![order], &stores).await?;
    views
        .pop()
        .ok_or_else(|| ServiceError::InternalError("Order view assembly produced nothing".to_string()))
}

async fn order_views<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<order::Model>,
) -> Result<Vec<OrderView>, ServiceError> {
    let mut store_ids: Vec<Uuid> = orders.iter().map(|o| o.store_id).collect();
    store_ids.sort();
    store_ids.dedup();
    let stores = catalog::stores_by_id(conn, store_ids).await?;
    assemble(conn, orders, &stores).await
}

/// Loads lines, toppings and ship info for `orders` in three queries.
async fn assemble<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<order::Model>,
    stores: &HashMap<Uuid, store::Model>,
) -> Result<Vec<OrderView>, ServiceError> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();

    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.is_in(order_ids.clone()))
        .all(conn)
        .await?;

    let mut toppings: HashMap<Uuid, Vec<order_item_topping::Model>> = HashMap::new();
    if !items.is_empty() {
        for row in order_item_topping::Entity::find()
            .filter(order_item_topping::Column::OrderItemId.is_in(items.iter().map(|i| i.id)))
            .all(conn)
            .await?
        {
            toppings.entry(row.order_item_id).or_default().push(row);
        }
    }

    let mut lines: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for item in &items {
        let t = toppings.get(&item.id).map(Vec::as_slice).unwrap_or(&[]);
        let snapshot = ItemSnapshot::from_order_row(item, t);
        lines.entry(item.order_id).or_default().push(OrderLine {
            id: item.id,
            line_total: item.line_total,
            item: snapshot,
        });
    }

    let mut ship_infos: HashMap<Uuid, order_ship_info::Model> = order_ship_info::Entity::find()
        .filter(order_ship_info::Column::OrderId.is_in(order_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.order_id, s))
        .collect();

    Ok(orders
        .into_iter()
        .map(|order| OrderView {
            store: stores.get(&order.store_id).map(StoreSummary::from),
            items: lines.remove(&order.id).unwrap_or_default(),
            ship_info: ship_infos.remove(&order.id).map(ShipInfoView::from),
            id: order.id,
            user_id: order.user_id,
            store_id: order.store_id,
            status: order.status,
            payment_method: order.payment_method,
            payment_status: order.payment_status,
            subtotal_price: order.subtotal_price,
            total_discount: order.total_discount,
            shipping_fee: order.shipping_fee,
            final_total: order.final_total,
            staff_note: order.staff_note,
            created_at: order.created_at,
            updated_at: order.updated_at,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn input(body: Value) -> CheckoutInput {
        let mut base = json!({
            "storeId": Uuid::new_v4(),
            "paymentMethod": "cash",
            "deliveryAddress": "12 Ly Thuong Kiet, Hoan Kiem",
            "location": [105.85, 21.02],
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), body.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn defaults_discount_and_shipping_to_zero() {
        let checked = input(json!({})).check().unwrap();
        assert_eq!(checked.payment_method, PaymentMethod::Cash);
        assert_eq!(checked.shipping_fee, Decimal::ZERO);
        assert_eq!(checked.total_discount, Decimal::ZERO);
        assert_eq!((checked.longitude, checked.latitude), (105.85, 21.02));
    }

    #[test]
    fn accepts_caller_supplied_discount_and_shipping() {
        let checked = input(json!({"shippingFee": 10000, "totalDiscount": "5000"}))
            .check()
            .unwrap();
        assert_eq!(checked.shipping_fee, dec!(10000));
        assert_eq!(checked.total_discount, dec!(5000));
    }

    #[test]
    fn location_must_be_a_numeric_pair() {
        for location in [json!([105.85]), json!([1, 2, 3]), json!(["105", 21]), json!(null)] {
            let err = input(json!({ "location": location })).check().unwrap_err();
            assert_matches!(err, ServiceError::InvalidCheckout(_), "{location}");
        }
    }

    #[test]
    fn blank_delivery_address_is_rejected() {
        let err = input(json!({"deliveryAddress": "   "})).check().unwrap_err();
        assert_matches!(err, ServiceError::InvalidCheckout(_));
    }

    #[test]
    fn unknown_payment_method_is_rejected() {
        let err = input(json!({"paymentMethod": "bitcoin"})).check().unwrap_err();
        assert_matches!(err, ServiceError::InvalidCheckout(_));
    }

    #[test]
    fn negative_money_inputs_are_rejected() {
        let err = input(json!({"totalDiscount": -1})).check().unwrap_err();
        assert_matches!(err, ServiceError::InvalidCheckout(_));
    }

    #[test]
    fn oversized_money_inputs_are_rejected() {
        let max = Decimal::MAX.to_string();
        for body in [json!({ "shippingFee": max }), json!({ "totalDiscount": max })] {
            let err = input(body.clone()).check().unwrap_err();
            assert_matches!(err, ServiceError::InvalidCheckout(_), "{body}");
        }

        let checked = input(json!({"shippingFee": "999999999999999.9999"}))
            .check()
            .unwrap();
        assert_eq!(checked.shipping_fee, MAX_MONEY_INPUT);
    }

    #[test]
    fn status_filter_parses_comma_separated_values() {
        let query = StoreOrderQuery {
            status: Some("pending, taken,,DONE".to_string()),
            ..Default::default()
        };
        assert_eq!(
            query.statuses().unwrap(),
            vec![OrderStatus::Pending, OrderStatus::Taken, OrderStatus::Done]
        );

        let bad = StoreOrderQuery {
            status: Some("pending,cancelled".to_string()),
            ..Default::default()
        };
        assert!(matches!(bad.statuses(), Err(ServiceError::InvalidRequest(_))));
    }
}
