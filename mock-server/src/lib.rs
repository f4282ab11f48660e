//! In-memory stand-in for the Bandcamp token and merch-order endpoints.
//!
//! Seeded with one registered client, two bands and a handful of orders.
//! Ids listed in `MockState::rejected_ids` make `update_shipped` answer with
//! a body-level error on HTTP 200, the way the real provider does.

use std::{
    collections::HashSet,
    sync::Arc,
};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::post,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const CLIENT_ID: u64 = 1234;
pub const CLIENT_SECRET: &str = "mock-secret";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Band {
    pub band_id: u64,
    pub name: String,
    pub subdomain: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Order {
    pub payment_id: u64,
    pub sale_item_id: u64,
    pub band_id: u64,
    pub item_name: String,
    pub buyer_name: String,
    pub sale_date: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MerchItem {
    pub package_id: u64,
    pub band_id: u64,
    pub title: String,
    pub quantity_available: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShippingOrigin {
    pub origin_id: u64,
    pub band_id: u64,
    pub country_name: String,
}

/// One accepted item of an `update_shipped` call, as received.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ShippedItem {
    pub id: u64,
    pub id_type: String,
    pub shipped: Option<bool>,
    pub notification: Option<bool>,
    pub notification_message: Option<String>,
    pub ship_date: Option<String>,
    pub carrier: Option<String>,
    pub tracking_code: Option<String>,
}

#[derive(Debug, Default)]
pub struct MockState {
    pub access_tokens: HashSet<String>,
    pub refresh_tokens: HashSet<String>,
    /// Whether refresh-grant responses include a new refresh token.
    pub rotate_refresh_tokens: bool,
    pub bands: Vec<Band>,
    pub orders: Vec<Order>,
    pub merch: Vec<MerchItem>,
    pub shipping_origins: Vec<ShippingOrigin>,
    pub rejected_ids: HashSet<u64>,
    pub shipped: Vec<ShippedItem>,
    pub update_calls: usize,
}

impl MockState {
    pub fn seeded() -> Self {
        let order = |payment_id, sale_item_id, item_name: &str, buyer_name: &str| Order {
            payment_id,
            sale_item_id,
            band_id: 100,
            item_name: item_name.to_string(),
            buyer_name: buyer_name.to_string(),
            sale_date: "2024-03-01 10:00:00".to_string(),
        };
        Self {
            rotate_refresh_tokens: true,
            bands: vec![
                Band {
                    band_id: 100,
                    name: "Night Label".to_string(),
                    subdomain: "nightlabel".to_string(),
                },
                Band {
                    band_id: 200,
                    name: "Day Band".to_string(),
                    subdomain: "dayband".to_string(),
                },
            ],
            orders: vec![
                order(5, 50, "Cassette", "Ann"),
                order(5, 51, "T-Shirt", "Ann"),
                order(7, 70, "Cassette", "Bo"),
                order(9, 90, "Vinyl LP", "Cy"),
            ],
            merch: vec![MerchItem {
                package_id: 300,
                band_id: 100,
                title: "Cassette".to_string(),
                quantity_available: Some(12),
            }],
            shipping_origins: vec![ShippingOrigin {
                origin_id: 400,
                band_id: 100,
                country_name: "Germany".to_string(),
            }],
            ..Default::default()
        }
    }
}

pub type Db = Arc<RwLock<MockState>>;

pub fn seeded_db() -> Db {
    Arc::new(RwLock::new(MockState::seeded()))
}

pub fn app() -> Router {
    app_with_db(seeded_db())
}

pub fn app_with_db(db: Db) -> Router {
    Router::new()
        .route("/oauth_token", post(oauth_token))
        .route("/api/account/1/my_bands", post(my_bands))
        .route("/api/merchorders/3/get_orders", post(get_orders))
        .route("/api/merchorders/1/get_merch_details", post(get_merch_details))
        .route(
            "/api/merchorders/1/get_shipping_origin_details",
            post(get_shipping_origin_details),
        )
        .route("/api/merchorders/2/update_shipped", post(update_shipped))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_db(listener, seeded_db()).await
}

pub async fn run_with_db(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_db(db)).await
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Deserialize)]
pub struct TokenForm {
    pub client_id: u64,
    pub client_secret: String,
    pub grant_type: String,
    pub refresh_token: Option<String>,
}

fn oauth_error(status: StatusCode, code: &str, description: &str) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "error": code, "error_description": description })),
    )
}

async fn oauth_token(State(db): State<Db>, Form(form): Form<TokenForm>) -> ApiResult {
    if form.client_id != CLIENT_ID || form.client_secret != CLIENT_SECRET {
        return Err(oauth_error(StatusCode::UNAUTHORIZED, "invalid_client", "unknown client"));
    }
    let mut state = db.write().await;
    let issue_refresh = match form.grant_type.as_str() {
        "client_credentials" => true,
        "refresh_token" => {
            let token = form.refresh_token.unwrap_or_default();
            if !state.refresh_tokens.remove(&token) {
                return Err(oauth_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_grant",
                    "unknown refresh token",
                ));
            }
            state.rotate_refresh_tokens
        }
        other => {
            return Err(oauth_error(
                StatusCode::BAD_REQUEST,
                "unsupported_grant_type",
                &format!("unsupported grant type {other}"),
            ))
        }
    };

    let access_token = Uuid::new_v4().to_string();
    state.access_tokens.insert(access_token.clone());
    let mut body = json!({
        "ok": true,
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
    });
    if issue_refresh {
        let refresh_token = Uuid::new_v4().to_string();
        state.refresh_tokens.insert(refresh_token.clone());
        body["refresh_token"] = Value::String(refresh_token);
    }
    Ok(Json(body))
}

async fn authorize(db: &Db, headers: &HeaderMap) -> Result<(), (StatusCode, Json<Value>)> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let known = match token {
        Some(token) => db.read().await.access_tokens.contains(token),
        None => false,
    };
    if !known {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "invalid_token" })),
        ));
    }
    Ok(())
}

async fn my_bands(State(db): State<Db>, headers: HeaderMap) -> ApiResult {
    authorize(&db, &headers).await?;
    let state = db.read().await;
    Ok(Json(json!({ "bands": state.bands })))
}

#[derive(Deserialize)]
pub struct OrdersFilter {
    pub band_id: u64,
    pub name: Option<String>,
}

async fn get_orders(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(filter): Json<OrdersFilter>,
) -> ApiResult {
    authorize(&db, &headers).await?;
    let state = db.read().await;
    let items: Vec<&Order> = state
        .orders
        .iter()
        .filter(|o| o.band_id == filter.band_id)
        .filter(|o| filter.name.as_deref().map_or(true, |n| o.item_name == n))
        .collect();
    Ok(Json(json!({ "success": true, "items": items })))
}

#[derive(Deserialize)]
pub struct BandFilter {
    pub band_id: Option<u64>,
}

async fn get_merch_details(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(filter): Json<BandFilter>,
) -> ApiResult {
    authorize(&db, &headers).await?;
    let Some(band_id) = filter.band_id else {
        return Ok(Json(json!({ "error": true, "error_message": "band_id is required" })));
    };
    let state = db.read().await;
    let items: Vec<&MerchItem> = state.merch.iter().filter(|m| m.band_id == band_id).collect();
    Ok(Json(json!({ "success": true, "items": items })))
}

async fn get_shipping_origin_details(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(filter): Json<BandFilter>,
) -> ApiResult {
    authorize(&db, &headers).await?;
    let state = db.read().await;
    let origins: Vec<&ShippingOrigin> = state
        .shipping_origins
        .iter()
        .filter(|o| filter.band_id.map_or(true, |b| o.band_id == b))
        .collect();
    Ok(Json(json!({ "success": true, "shipping_origins": origins })))
}

#[derive(Deserialize)]
pub struct UpdateShipped {
    pub items: Vec<ShippedItem>,
}

async fn update_shipped(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<UpdateShipped>,
) -> ApiResult {
    authorize(&db, &headers).await?;
    let mut state = db.write().await;
    state.update_calls += 1;
    if let Some(bad) = input.items.iter().find(|i| i.id_type != "p" && i.id_type != "s") {
        return Ok(Json(json!({
            "error": true,
            "error_message": format!("invalid id_type {}", bad.id_type),
        })));
    }
    if let Some(bad) = input.items.iter().find(|i| state.rejected_ids.contains(&i.id)) {
        return Ok(Json(json!({
            "error": true,
            "error_message": format!("no such id: {}", bad.id),
        })));
    }
    state.shipped.extend(input.items);
    Ok(Json(json!({ "success": true })))
}
