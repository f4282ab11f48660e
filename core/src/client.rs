//! Stateless request builder and response parser for the Bandcamp API.
//!
//! # Design
//! `BandcampClient` holds only the provider origin and carries no mutable
//! state between calls. Each operation is split into a `build_*` method that
//! produces an `HttpRequest` and a `parse_*` method that consumes an
//! `HttpResponse`. The caller executes the round-trip in between, which keeps
//! response classification deterministic and testable without a network.
//!
//! Classification order for resource endpoints: a 401 is `Unauthorized`; a
//! body carrying the provider's error flag is `Remote`, whatever the status;
//! any other non-2xx is `HttpStatus`; a 2xx body that does not decode into the
//! expected shape is `Deserialization`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use url::form_urlencoded;

use crate::auth::{AuthRequest, Grant};
use crate::credentials::CredentialRecord;
use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{
    Band, MerchItem, MerchQuery, Order, OrdersQuery, ShipmentUpdate, ShippingOrigin,
    ShippingOriginsQuery,
};

pub const DEFAULT_ORIGIN: &str = "https://bandcamp.com";

/// Resource endpoint paths, relative to `{origin}/api`.
pub mod endpoints {
    pub const MY_BANDS: &str = "/account/1/my_bands";
    pub const GET_ORDERS: &str = "/merchorders/3/get_orders";
    pub const GET_MERCH_DETAILS: &str = "/merchorders/1/get_merch_details";
    pub const GET_SHIPPING_ORIGINS: &str = "/merchorders/1/get_shipping_origin_details";
    pub const UPDATE_SHIPPED: &str = "/merchorders/2/update_shipped";
}

const TOKEN_PATH: &str = "/oauth_token";
const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

#[derive(Deserialize)]
struct BandsEnvelope {
    bands: Vec<Band>,
}

#[derive(Deserialize)]
struct ItemsEnvelope<T> {
    items: Vec<T>,
}

#[derive(Deserialize)]
struct ShippingOriginsEnvelope {
    shipping_origins: Vec<ShippingOrigin>,
}

#[derive(Serialize)]
struct UpdateShippedBody<'a> {
    items: &'a [ShipmentUpdate],
}

/// Empty JSON object, the payload of parameterless endpoints.
#[derive(Serialize)]
struct NoParams {}

#[derive(Debug, Clone)]
pub struct BandcampClient {
    origin: String,
}

impl Default for BandcampClient {
    fn default() -> Self {
        Self::new(DEFAULT_ORIGIN)
    }
}

impl BandcampClient {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    /// Form-encoded token exchange. `refresh_token` is only sent for the
    /// refresh grant.
    pub fn build_token_request(&self, auth: &AuthRequest) -> HttpRequest {
        let mut form = form_urlencoded::Serializer::new(String::new());
        form.append_pair("client_id", &auth.client_id.to_string());
        form.append_pair("client_secret", &auth.client_secret);
        form.append_pair("grant_type", auth.grant.grant_type());
        if let Grant::RefreshToken(token) = &auth.grant {
            form.append_pair("refresh_token", token);
        }
        debug!(grant_type = auth.grant.grant_type(), "building token request");
        HttpRequest {
            url: format!("{}{TOKEN_PATH}", self.origin),
            headers: vec![("content-type".to_string(), CONTENT_TYPE_FORM.to_string())],
            body: form.finish(),
        }
    }

    pub fn parse_token_response(&self, response: HttpResponse) -> Result<CredentialRecord, ApiError> {
        // An OAuth error body explains a 400/401 better than the status does.
        if let Some(message) = body_error(&response.body) {
            return Err(ApiError::Remote(message));
        }
        check_status(&response)?;
        decode(&response.body)
    }

    /// JSON request to a resource endpoint carrying the bearer token.
    pub fn build_api_request<P: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        access_token: &str,
        payload: &P,
    ) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        debug!(endpoint, "building api request");
        Ok(HttpRequest {
            url: format!("{}/api{endpoint}", self.origin),
            headers: vec![
                ("content-type".to_string(), CONTENT_TYPE_JSON.to_string()),
                ("authorization".to_string(), format!("Bearer {access_token}")),
            ],
            body,
        })
    }

    pub fn parse_api_response<T: DeserializeOwned>(&self, response: HttpResponse) -> Result<T, ApiError> {
        classify(&response)?;
        decode(&response.body)
    }

    pub fn build_my_bands(&self, access_token: &str) -> Result<HttpRequest, ApiError> {
        self.build_api_request(endpoints::MY_BANDS, access_token, &NoParams {})
    }

    pub fn parse_my_bands(&self, response: HttpResponse) -> Result<Vec<Band>, ApiError> {
        self.parse_api_response::<BandsEnvelope>(response).map(|e| e.bands)
    }

    pub fn build_get_orders(&self, access_token: &str, query: &OrdersQuery) -> Result<HttpRequest, ApiError> {
        self.build_api_request(endpoints::GET_ORDERS, access_token, query)
    }

    pub fn parse_get_orders(&self, response: HttpResponse) -> Result<Vec<Order>, ApiError> {
        self.parse_api_response::<ItemsEnvelope<Order>>(response).map(|e| e.items)
    }

    pub fn build_get_merch(&self, access_token: &str, query: &MerchQuery) -> Result<HttpRequest, ApiError> {
        self.build_api_request(endpoints::GET_MERCH_DETAILS, access_token, query)
    }

    pub fn parse_get_merch(&self, response: HttpResponse) -> Result<Vec<MerchItem>, ApiError> {
        self.parse_api_response::<ItemsEnvelope<MerchItem>>(response).map(|e| e.items)
    }

    pub fn build_get_shipping_origins(
        &self,
        access_token: &str,
        query: &ShippingOriginsQuery,
    ) -> Result<HttpRequest, ApiError> {
        self.build_api_request(endpoints::GET_SHIPPING_ORIGINS, access_token, query)
    }

    pub fn parse_get_shipping_origins(&self, response: HttpResponse) -> Result<Vec<ShippingOrigin>, ApiError> {
        self.parse_api_response::<ShippingOriginsEnvelope>(response)
            .map(|e| e.shipping_origins)
    }

    pub fn build_update_shipped(
        &self,
        access_token: &str,
        items: &[ShipmentUpdate],
    ) -> Result<HttpRequest, ApiError> {
        self.build_api_request(endpoints::UPDATE_SHIPPED, access_token, &UpdateShippedBody { items })
    }

    pub fn parse_update_shipped(&self, response: HttpResponse) -> Result<(), ApiError> {
        self.parse_api_response::<Value>(response).map(|_| ())
    }
}

/// Classify a resource endpoint response without decoding the payload.
pub fn classify(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status == 401 {
        return Err(ApiError::Unauthorized);
    }
    if let Some(message) = body_error(&response.body) {
        return Err(ApiError::Remote(message));
    }
    check_status(response)
}

fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if (200..300).contains(&response.status) {
        return Ok(());
    }
    Err(ApiError::HttpStatus {
        status: response.status,
        body: response.body.clone(),
    })
}

/// Extract the provider's error message from a response body, if any.
///
/// Resource endpoints flag errors as `{"error": true, "error_message": ".."}`;
/// the token endpoint uses OAuth's `{"error": "code", "error_description": ".."}`.
fn body_error(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let object = value.as_object()?;
    match object.get("error")? {
        Value::Bool(true) => Some(
            object
                .get("error_message")
                .and_then(Value::as_str)
                .unwrap_or("the bandcamp API reported an error")
                .to_string(),
        ),
        Value::String(code) => Some(
            object
                .get("error_description")
                .and_then(Value::as_str)
                .unwrap_or(code)
                .to_string(),
        ),
        _ => None,
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{IdType, ShipmentOptions};

    fn client() -> BandcampClient {
        BandcampClient::new("http://localhost:3000")
    }

    fn form_pairs(body: &str) -> Vec<(String, String)> {
        form_urlencoded::parse(body.as_bytes()).into_owned().collect()
    }

    #[test]
    fn token_request_for_client_credentials_omits_refresh_token() {
        let auth = AuthRequest {
            client_id: 123,
            client_secret: "s3cr&t".into(),
            grant: Grant::ClientCredentials,
        };
        let req = client().build_token_request(&auth);
        assert_eq!(req.url, "http://localhost:3000/oauth_token");
        assert_eq!(req.header("Content-Type"), Some(CONTENT_TYPE_FORM));
        assert_eq!(
            form_pairs(&req.body),
            vec![
                ("client_id".to_string(), "123".to_string()),
                ("client_secret".to_string(), "s3cr&t".to_string()),
                ("grant_type".to_string(), "client_credentials".to_string()),
            ]
        );
    }

    #[test]
    fn token_request_for_refresh_grant_carries_token() {
        let auth = AuthRequest {
            client_id: 1,
            client_secret: "s".into(),
            grant: Grant::RefreshToken("r1".into()),
        };
        let pairs = form_pairs(&client().build_token_request(&auth).body);
        assert!(pairs.contains(&("grant_type".to_string(), "refresh_token".to_string())));
        assert!(pairs.contains(&("refresh_token".to_string(), "r1".to_string())));
    }

    #[test]
    fn token_response_is_stored_verbatim() {
        let response = HttpResponse::new(
            200,
            r#"{"ok":true,"access_token":"a","refresh_token":"r","expires_in":3600,"token_type":"bearer"}"#,
        );
        let record = client().parse_token_response(response).unwrap();
        assert_eq!(record.access_token, "a");
        assert_eq!(record.refresh_token.as_deref(), Some("r"));
        assert_eq!(record.extra["token_type"], "bearer");
        assert_eq!(record.extra["ok"], true);
    }

    #[test]
    fn token_error_body_becomes_remote_error() {
        let response = HttpResponse::new(
            400,
            r#"{"error":"invalid_client","error_description":"bad secret"}"#,
        );
        let err = client().parse_token_response(response).unwrap_err();
        assert!(matches!(err, ApiError::Remote(ref m) if m == "bad secret"));
    }

    #[test]
    fn api_request_carries_bearer_token_and_json_body() {
        let query = OrdersQuery {
            band_id: 9,
            ..Default::default()
        };
        let req = client().build_get_orders("tok", &query).unwrap();
        assert_eq!(req.url, "http://localhost:3000/api/merchorders/3/get_orders");
        assert_eq!(req.header("authorization"), Some("Bearer tok"));
        let body: Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(body, serde_json::json!({"band_id": 9}));
    }

    #[test]
    fn my_bands_sends_empty_object() {
        let req = client().build_my_bands("tok").unwrap();
        assert_eq!(req.url, "http://localhost:3000/api/account/1/my_bands");
        assert_eq!(req.body, "{}");
    }

    #[test]
    fn update_shipped_wraps_items() {
        let options = ShipmentOptions {
            id_type: IdType::Payment,
            shipped: Some(true),
            ..Default::default()
        };
        let items = vec![options.for_id(1), options.for_id(2)];
        let req = client().build_update_shipped("tok", &items).unwrap();
        let body: Value = serde_json::from_str(&req.body).unwrap();
        assert_eq!(body["items"].as_array().unwrap().len(), 2);
        assert_eq!(body["items"][1]["id"], 2);
        assert_eq!(body["items"][0]["id_type"], "p");
    }

    #[test]
    fn ok_status_with_error_flag_is_remote_error() {
        let response = HttpResponse::new(200, r#"{"error":true,"error_message":"bad id"}"#);
        let err = client().parse_update_shipped(response).unwrap_err();
        assert!(matches!(err, ApiError::Remote(ref m) if m == "bad id"));
    }

    #[test]
    fn unauthorized_wins_over_body() {
        let response = HttpResponse::new(401, r#"{"error":true,"error_message":"expired"}"#);
        let err = client().parse_my_bands(response).unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
    }

    #[test]
    fn server_error_keeps_status_and_body() {
        let response = HttpResponse::new(502, "bad gateway");
        let err = client().parse_get_orders(response).unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus { status: 502, ref body } if body == "bad gateway"));
    }

    #[test]
    fn unexpected_shape_is_deserialization_error() {
        let response = HttpResponse::new(200, r#"{"orders":[]}"#);
        let err = client().parse_get_orders(response).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn error_flag_false_is_success() {
        let response = HttpResponse::new(200, r#"{"error":false,"bands":[{"band_id":1,"name":"A","subdomain":"a"}]}"#);
        let bands = client().parse_my_bands(response).unwrap();
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].subdomain, "a");
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = BandcampClient::new("http://localhost:3000/");
        let req = client.build_my_bands("t").unwrap();
        assert_eq!(req.url, "http://localhost:3000/api/account/1/my_bands");
    }
}
