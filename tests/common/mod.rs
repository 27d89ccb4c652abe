#![allow(dead_code)]

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use delivery_api::{
    auth::{AuthConfig, AuthService, AuthUser},
    config::AppConfig,
    db,
    entities::{
        dish::{self, StockStatus},
        order::{self, OrderStatus},
        rating,
        store::{self, StoreStatus},
        topping, topping_group,
    },
    events,
    handlers::AppServices,
    services::{factory::ServiceFactory, notifications::NotificationSink},
    AppState,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-signing-key-0123456789-abcdefghijklmnop";

/// A store with two dishes (20000 and 15000) and one topping group holding
/// a single 5000 topping.
pub struct SeededStore {
    pub store: store::Model,
    pub owner: AuthUser,
    pub main_dish: dish::Model,
    pub side_dish: dish::Model,
    pub topping: topping::Model,
}

impl SeededStore {
    pub fn id(&self) -> Uuid {
        self.store.id
    }
}

/// Helper harness for spinning up the application on a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub db: Arc<DatabaseConnection>,
    auth: Arc<AuthService>,
    _dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::build(None).await
    }

    /// Same as [`TestApp::new`], delivering notifications to `sink`.
    pub async fn with_notification_sink(sink: Arc<dyn NotificationSink>) -> Self {
        Self::build(Some(sink)).await
    }

    async fn build(sink: Option<Arc<dyn NotificationSink>>) -> Self {
        let dir = tempfile::tempdir().expect("temp dir for test database");
        let db_path = dir.path().join("delivery_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single connection keeps SQLite writers serialized
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.default_page_size = 2;
        cfg.max_page_size = 50;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_sender, event_rx) = events::channel(cfg.event_channel_capacity);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth = Arc::new(AuthService::new(AuthConfig::from(&cfg)));
        let mut factory = ServiceFactory::new(db_arc.clone(), event_sender);
        if let Some(sink) = sink {
            factory = factory.with_notification_sink(sink);
        }
        let services = AppServices::new(&factory, &cfg);

        let state = AppState {
            db: db_arc.clone(),
            config: Arc::new(cfg),
            auth: auth.clone(),
            services,
        };

        Self {
            router: delivery_api::app(state.clone()),
            state,
            db: db_arc,
            auth,
            _dir: dir,
            _event_task: event_task,
        }
    }

    /// Bearer token for the given principal.
    pub fn token_for(&self, user: &AuthUser) -> String {
        self.auth.issue_token(user).expect("issue test token")
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Authenticated request, returning status and parsed JSON body.
    pub async fn call(
        &self,
        user: &AuthUser,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let token = self.token_for(user);
        let response = self.request(method, uri, body, Some(&token)).await;
        let status = response.status();
        (status, response_json(response).await)
    }

    /// Approved store with the standard menu and a handful of ratings.
    pub async fn seed_store(&self, name: &str) -> SeededStore {
        self.seed_store_with_status(name, StoreStatus::Approved).await
    }

    pub async fn seed_store_with_status(&self, name: &str, status: StoreStatus) -> SeededStore {
        let db = &*self.db;
        let now = Utc::now();
        let owner = AuthUser::new(Uuid::new_v4());

        let store = store::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            owner_id: Set(owner.user_id),
            status: Set(status),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .expect("seed store");

        let main_dish = self.seed_dish(store.id, "Bun bo", dec!(20000)).await;
        let side_dish = self.seed_dish(store.id, "Spring rolls", dec!(15000)).await;

        let group = topping_group::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store.id),
            name: Set("Extras".to_string()),
        }
        .insert(db)
        .await
        .expect("seed topping group");

        let topping = topping::ActiveModel {
            id: Set(Uuid::new_v4()),
            topping_group_id: Set(group.id),
            name: Set("Egg".to_string()),
            price: Set(dec!(5000)),
        }
        .insert(db)
        .await
        .expect("seed topping");

        for value in [4, 5] {
            rating::ActiveModel {
                id: Set(Uuid::new_v4()),
                store_id: Set(store.id),
                user_id: Set(Uuid::new_v4()),
                rating_value: Set(value),
                created_at: Set(now),
            }
            .insert(db)
            .await
            .expect("seed rating");
        }

        SeededStore {
            store,
            owner,
            main_dish,
            side_dish,
            topping,
        }
    }

    pub async fn seed_dish(&self, store_id: Uuid, name: &str, price: Decimal) -> dish::Model {
        let now = Utc::now();
        dish::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            name: Set(name.to_string()),
            price: Set(price),
            stock_status: Set(StockStatus::Available),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db)
        .await
        .expect("seed dish")
    }

    /// Adds a topping to an existing topping group.
    pub async fn seed_topping(&self, group_id: Uuid, name: &str, price: Decimal) -> topping::Model {
        topping::ActiveModel {
            id: Set(Uuid::new_v4()),
            topping_group_id: Set(group_id),
            name: Set(name.to_string()),
            price: Set(price),
        }
        .insert(&*self.db)
        .await
        .expect("seed topping")
    }

    pub async fn set_dish_stock(&self, dish: &dish::Model, stock_status: StockStatus) {
        let mut active: dish::ActiveModel = dish.clone().into();
        active.stock_status = Set(stock_status);
        active.update(&*self.db).await.expect("update dish stock");
    }

    pub async fn set_dish_price(&self, dish: &dish::Model, price: Decimal) {
        let mut active: dish::ActiveModel = dish.clone().into();
        active.price = Set(price);
        active.update(&*self.db).await.expect("update dish price");
    }

    pub async fn set_store_status(&self, store: &store::Model, status: StoreStatus) {
        let mut active: store::ActiveModel = store.clone().into();
        active.status = Set(status);
        active.update(&*self.db).await.expect("update store status");
    }

    /// Forces an order into `status`, bypassing the transition rules.
    pub async fn force_order_status(&self, order_id: Uuid, status: OrderStatus) {
        let model = order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await
            .expect("load order")
            .expect("order exists");
        let mut active: order::ActiveModel = model.into();
        active.status = Set(status);
        active.update(&*self.db).await.expect("update order status");
    }

    /// Puts `quantity` of `dish_id` (with `toppings`) into the user's cart.
    pub async fn add_to_cart(
        &self,
        user: &AuthUser,
        store_id: Uuid,
        dish_id: Uuid,
        quantity: i32,
        toppings: &[Uuid],
    ) -> (StatusCode, Value) {
        self.call(
            user,
            Method::PUT,
            "/api/v1/carts",
            Some(serde_json::json!({
                "storeId": store_id,
                "dishId": dish_id,
                "quantity": quantity,
                "toppings": toppings,
            })),
        )
        .await
    }

    /// Checks out the user's cart for `store_id` with a valid address.
    pub async fn checkout(
        &self,
        user: &AuthUser,
        store_id: Uuid,
        discount: Decimal,
        shipping: Decimal,
    ) -> (StatusCode, Value) {
        self.call(
            user,
            Method::POST,
            "/api/v1/carts/checkout",
            Some(checkout_body(store_id, discount, shipping)),
        )
        .await
    }

    /// Places an order of one main dish and returns its id.
    pub async fn place_order(&self, user: &AuthUser, seeded: &SeededStore) -> Uuid {
        let (status, _) = self
            .add_to_cart(user, seeded.id(), seeded.main_dish.id, 1, &[])
            .await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = self
            .checkout(user, seeded.id(), Decimal::ZERO, Decimal::ZERO)
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        uuid_field(&body["data"]["id"])
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn checkout_body(store_id: Uuid, discount: Decimal, shipping: Decimal) -> Value {
    serde_json::json!({
        "storeId": store_id,
        "paymentMethod": "cash",
        "customerName": "Nguyen Van A",
        "customerPhonenumber": "0901234567",
        "deliveryAddress": "12 Ly Tu Trong, District 1",
        "detailAddress": "Floor 3",
        "location": [106.7009, 10.7769],
        "totalDiscount": discount,
        "shippingFee": shipping,
    })
}

pub async fn response_json(response: Response) -> Value {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

/// Money fields serialize as strings; compare them numerically.
pub fn dec_field(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("expected a decimal, got {other}"),
    }
}

pub fn uuid_field(value: &Value) -> Uuid {
    Uuid::parse_str(value.as_str().expect("uuid string")).expect("valid uuid")
}
