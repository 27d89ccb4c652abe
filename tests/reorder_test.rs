//! Reorder: rebuilding a cart from a past order.

mod common;

use axum::http::{Method, StatusCode};
use common::{dec_field, uuid_field, TestApp};
use delivery_api::{
    auth::AuthUser,
    entities::{cart, dish::StockStatus, store::StoreStatus},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

async fn carts_for(app: &TestApp, user: &AuthUser) -> u64 {
    cart::Entity::find()
        .filter(cart::Column::UserId.eq(user.user_id))
        .count(&*app.db)
        .await
        .unwrap()
}

#[tokio::test]
async fn reorder_restores_items_at_original_prices() {
    let app = TestApp::new().await;
    let shop = app.seed_store("Pho 24").await;
    let user = AuthUser::new(Uuid::new_v4());

    app.add_to_cart(&user, shop.id(), shop.main_dish.id, 2, &[shop.topping.id])
        .await;
    let (_, body) = app
        .checkout(&user, shop.id(), Decimal::ZERO, Decimal::ZERO)
        .await;
    let order_id = uuid_field(&body["data"]["id"]);

    app.set_dish_price(&shop.main_dish, dec!(30000)).await;

    let (status, body) = app
        .call(
            &user,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/reorder"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let cart = &body["data"];
    assert_eq!(uuid_field(&cart["storeId"]), shop.id());
    let line = &cart["items"][0];
    assert_eq!(line["quantity"], 2);
    assert_eq!(dec_field(&line["unitPrice"]), dec!(20000));
    assert_eq!(dec_field(&line["toppings"][0]["price"]), dec!(5000));
    assert_eq!(dec_field(&cart["subtotal"]), dec!(50000));
}

#[tokio::test]
async fn reorder_replaces_existing_cart_for_the_store() {
    let app = TestApp::new().await;
    let shop = app.seed_store("Com nieu").await;
    let user = AuthUser::new(Uuid::new_v4());

    let order_id = app.place_order(&user, &shop).await;
    app.add_to_cart(&user, shop.id(), shop.side_dish.id, 5, &[])
        .await;

    let (status, body) = app
        .call(
            &user,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/reorder"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(uuid_field(&items[0]["dishId"]), shop.main_dish.id);
    assert_eq!(carts_for(&app, &user).await, 1);
}

#[tokio::test]
async fn reorder_with_out_of_stock_dish_is_forbidden() {
    let app = TestApp::new().await;
    let shop = app.seed_store("Bo kho").await;
    let user = AuthUser::new(Uuid::new_v4());

    let order_id = app.place_order(&user, &shop).await;
    app.set_dish_stock(&shop.main_dish, StockStatus::OutOfStock)
        .await;

    let (status, body) = app
        .call(
            &user,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/reorder"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("Bun bo"));
    assert_eq!(carts_for(&app, &user).await, 0);
}

#[tokio::test]
async fn reorder_from_blocked_store_is_forbidden() {
    let app = TestApp::new().await;
    let shop = app.seed_store("Ga nuong").await;
    let user = AuthUser::new(Uuid::new_v4());

    let order_id = app.place_order(&user, &shop).await;
    app.set_store_status(&shop.store, StoreStatus::Blocked).await;

    let (status, _) = app
        .call(
            &user,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/reorder"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(carts_for(&app, &user).await, 0);
}

#[tokio::test]
async fn reorder_of_someone_elses_order_is_forbidden() {
    let app = TestApp::new().await;
    let shop = app.seed_store("Vit quay").await;
    let user = AuthUser::new(Uuid::new_v4());
    let order_id = app.place_order(&user, &shop).await;

    let stranger = AuthUser::new(Uuid::new_v4());
    let (status, _) = app
        .call(
            &stranger,
            Method::POST,
            &format!("/api/v1/orders/{order_id}/reorder"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            &user,
            Method::POST,
            &format!("/api/v1/orders/{}/reorder", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
