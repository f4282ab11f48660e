//! Domain DTOs for the Bandcamp merchandising API.
//!
//! # Design
//! Response records decode the fields this crate relies on into typed
//! members and keep every other provider field in a flattened `extra` map,
//! so printing a record loses nothing while a missing id is still rejected
//! at the boundary. Query types serialize straight into request bodies;
//! absent optional filters are omitted rather than sent as `null`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// A band or label linked to the authenticated account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub band_id: u64,
    pub name: String,
    #[serde(default)]
    pub subdomain: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One sale item line of a merch order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub payment_id: u64,
    pub sale_item_id: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Order {
    /// The identifier of this order as seen by the given id type.
    pub fn id(&self, id_type: IdType) -> u64 {
        match id_type {
            IdType::Payment => self.payment_id,
            IdType::SaleItem => self.sale_item_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MerchItem {
    pub package_id: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShippingOrigin {
    pub origin_id: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Filters for the order listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrdersQuery {
    pub band_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_band_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unshipped_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<u64>,
}

/// Filters for the merchandise listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MerchQuery {
    pub band_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_band_id: Option<u64>,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub package_ids: Vec<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShippingOriginsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_id: Option<u64>,
}

/// Whether an order identifier names a payment or a single sale item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdType {
    #[default]
    #[serde(rename = "p")]
    Payment,
    #[serde(rename = "s")]
    SaleItem,
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdType::Payment => write!(f, "p"),
            IdType::SaleItem => write!(f, "s"),
        }
    }
}

impl FromStr for IdType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "p" | "payment" => Ok(IdType::Payment),
            "s" | "sale_item" => Ok(IdType::SaleItem),
            other => Err(ApiError::Input(format!(
                "unknown id type {other:?}, expected \"p\" or \"s\""
            ))),
        }
    }
}

/// Fields applied uniformly to every id of one ship invocation.
///
/// The provider calls the notification flags `notification` and
/// `notification_message`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentOptions {
    pub id_type: IdType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped: Option<bool>,
    #[serde(rename = "notification", skip_serializing_if = "Option::is_none")]
    pub notify: Option<bool>,
    #[serde(rename = "notification_message", skip_serializing_if = "Option::is_none")]
    pub notify_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ship_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_code: Option<String>,
}

/// One item of an `update_shipped` request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentUpdate {
    pub id: u64,
    #[serde(flatten)]
    pub options: ShipmentOptions,
}

impl ShipmentOptions {
    pub fn for_id(&self, id: u64) -> ShipmentUpdate {
        ShipmentUpdate {
            id,
            options: self.clone(),
        }
    }
}
