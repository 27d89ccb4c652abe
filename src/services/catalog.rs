//! Read-only lookups against the live catalog (stores, dishes, toppings,
//! ratings). Every helper accepts any connection so it can run inside the
//! caller's transaction.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, JoinType, QueryFilter, QuerySelect, RelationTrait,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{dish, rating, store, topping, topping_group};
use crate::errors::ServiceError;

pub async fn find_store<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
) -> Result<Option<store::Model>, ServiceError> {
    Ok(store::Entity::find_by_id(store_id).one(conn).await?)
}

pub async fn require_store<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
) -> Result<store::Model, ServiceError> {
    find_store(conn, store_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Store {} not found", store_id)))
}

/// Dish `dish_id` as currently listed by `store_id`.
pub async fn dish_in_store<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
    dish_id: Uuid,
) -> Result<dish::Model, ServiceError> {
    dish::Entity::find_by_id(dish_id)
        .filter(dish::Column::StoreId.eq(store_id))
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::InvalidReference(format!(
                "Dish {} does not belong to store {}",
                dish_id, store_id
            ))
        })
}

/// Resolves `topping_ids` against the topping groups owned by `store_id`.
///
/// Duplicate ids collapse to one selection. Any id that is unknown or owned
/// by another store fails the whole selection, listing every offender.
pub async fn toppings_in_store<C: ConnectionTrait>(
    conn: &C,
    store_id: Uuid,
    topping_ids: &[Uuid],
) -> Result<Vec<topping::Model>, ServiceError> {
    let mut seen = HashSet::new();
    let requested: Vec<Uuid> = topping_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();
    if requested.is_empty() {
        return Ok(Vec::new());
    }

    let mut found: HashMap<Uuid, topping::Model> = topping::Entity::find()
        .join(JoinType::InnerJoin, topping::Relation::ToppingGroup.def())
        .filter(topping::Column::Id.is_in(requested.clone()))
        .filter(topping_group::Column::StoreId.eq(store_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    let invalid_toppings: Vec<Uuid> = requested
        .iter()
        .filter(|id| !found.contains_key(id))
        .copied()
        .collect();
    if !invalid_toppings.is_empty() {
        return Err(ServiceError::InvalidToppingSelection { invalid_toppings });
    }

    Ok(requested
        .iter()
        .filter_map(|id| found.remove(id))
        .collect())
}

pub async fn dishes_by_id<C: ConnectionTrait>(
    conn: &C,
    dish_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, dish::Model>, ServiceError> {
    if dish_ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(dish::Entity::find()
        .filter(dish::Column::Id.is_in(dish_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|d| (d.id, d))
        .collect())
}

pub async fn stores_by_id<C: ConnectionTrait>(
    conn: &C,
    store_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, store::Model>, ServiceError> {
    if store_ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(store::Entity::find()
        .filter(store::Column::Id.is_in(store_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect())
}

/// Average and count of a store's ratings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub avg_rating: Decimal,
    pub amount_rating: u64,
}

pub async fn rating_summaries<C: ConnectionTrait>(
    conn: &C,
    store_ids: Vec<Uuid>,
) -> Result<HashMap<Uuid, RatingSummary>, ServiceError> {
    if store_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let mut sums: HashMap<Uuid, (i64, u64)> = HashMap::new();
    for row in rating::Entity::find()
        .filter(rating::Column::StoreId.is_in(store_ids))
        .all(conn)
        .await?
    {
        let entry = sums.entry(row.store_id).or_default();
        entry.0 += i64::from(row.rating_value);
        entry.1 += 1;
    }

    Ok(sums
        .into_iter()
        .map(|(store_id, (total, count))| {
            let avg = (Decimal::from(total) / Decimal::from(count)).round_dp(1);
            (
                store_id,
                RatingSummary {
                    avg_rating: avg,
                    amount_rating: count,
                },
            )
        })
        .collect())
}
