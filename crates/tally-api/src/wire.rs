// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Backend JSON shapes and their conversion into domain records.

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_app::validation::{cents_from_decimal, cents_to_decimal, format_date};
use tally_app::{
    Customer, CustomerId, CustomerRef, CustomerSubmission, Item, ItemId, ItemRef,
    ItemSubmission, QueryState, ResultPage, Sale, SaleId, SaleSubmission,
};
use time::Date;
use time::macros::format_description;

#[derive(Debug, Deserialize)]
pub(crate) struct WireItem {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    quantity: f64,
    #[serde(default)]
    price: f64,
}

impl From<WireItem> for Item {
    fn from(wire: WireItem) -> Self {
        Self {
            id: ItemId::new(wire.id),
            name: wire.name,
            description: wire.description,
            stock_quantity: wire.quantity.round() as i64,
            unit_price_cents: cents_from_decimal(wire.price),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireCustomer {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    address: String,
    #[serde(default, rename = "mobileNumber")]
    mobile_number: String,
}

impl From<WireCustomer> for Customer {
    fn from(wire: WireCustomer) -> Self {
        Self {
            id: CustomerId::new(wire.id),
            name: wire.name,
            address: wire.address,
            mobile_number: wire.mobile_number,
        }
    }
}

/// `itemId` / `customerId` arrive either as a bare id or populated.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireRef<T> {
    Id(String),
    Populated(T),
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSale {
    #[serde(rename = "_id", alias = "id")]
    id: String,
    #[serde(rename = "itemId")]
    item: WireRef<WireItem>,
    #[serde(default, rename = "customerId")]
    customer: Option<WireRef<WireCustomer>>,
    #[serde(default)]
    quantity: f64,
    #[serde(default, rename = "isCash")]
    is_cash: bool,
    date: String,
    #[serde(default, rename = "totalAmount")]
    total_amount: Option<f64>,
}

impl TryFrom<WireSale> for Sale {
    type Error = anyhow::Error;

    fn try_from(wire: WireSale) -> Result<Self> {
        let date = parse_wire_date(&wire.date)
            .with_context(|| format!("sale {} has an unreadable date", wire.id))?;
        let item = match wire.item {
            WireRef::Id(id) => ItemRef::Id(ItemId::new(id)),
            WireRef::Populated(item) => ItemRef::Populated(item.into()),
        };
        let customer = match wire.customer {
            None => None,
            Some(WireRef::Id(id)) if id.is_empty() => None,
            Some(WireRef::Id(id)) => Some(CustomerRef::Id(CustomerId::new(id))),
            Some(WireRef::Populated(customer)) => Some(CustomerRef::Populated(customer.into())),
        };
        Ok(Self {
            id: SaleId::new(wire.id),
            item,
            customer,
            quantity: wire.quantity.round() as i64,
            is_cash: wire.is_cash,
            date,
            total_amount_cents: wire.total_amount.map(cents_from_decimal),
        })
    }
}

/// Accepts `YYYY-MM-DD` or a full ISO timestamp; only the calendar date is
/// kept.
pub(crate) fn parse_wire_date(raw: &str) -> Result<Date> {
    let day = raw.get(..10).unwrap_or(raw);
    Date::parse(day, &format_description!("[year]-[month]-[day]"))
        .map_err(|error| anyhow!("invalid date {raw:?}: {error}"))
}

#[derive(Debug, Serialize)]
pub(crate) struct ItemBody<'a> {
    name: &'a str,
    description: &'a str,
    quantity: i64,
    price: f64,
}

impl<'a> From<&'a ItemSubmission> for ItemBody<'a> {
    fn from(submission: &'a ItemSubmission) -> Self {
        Self {
            name: &submission.name,
            description: &submission.description,
            quantity: submission.stock_quantity,
            price: cents_to_decimal(submission.unit_price_cents),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CustomerBody<'a> {
    name: &'a str,
    address: &'a str,
    #[serde(rename = "mobileNumber")]
    mobile_number: &'a str,
}

impl<'a> From<&'a CustomerSubmission> for CustomerBody<'a> {
    fn from(submission: &'a CustomerSubmission) -> Self {
        Self {
            name: &submission.name,
            address: &submission.address,
            mobile_number: &submission.mobile_number,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SaleBody<'a> {
    #[serde(rename = "itemId")]
    item_id: &'a str,
    quantity: i64,
    #[serde(rename = "customerId", skip_serializing_if = "Option::is_none")]
    customer_id: Option<&'a str>,
    #[serde(rename = "isCash")]
    is_cash: bool,
    date: String,
}

impl<'a> From<&'a SaleSubmission> for SaleBody<'a> {
    fn from(submission: &'a SaleSubmission) -> Self {
        Self {
            item_id: submission.item_id.as_str(),
            quantity: submission.quantity,
            customer_id: if submission.is_cash {
                None
            } else {
                submission.customer_id.as_ref().map(CustomerId::as_str)
            },
            is_cash: submission.is_cash,
            date: format_date(submission.date),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Domain records the client can decode from a backend response.
pub(crate) trait FromWire: Sized {
    type Wire: DeserializeOwned;

    fn from_wire(wire: Self::Wire) -> Result<Self>;
}

impl FromWire for Item {
    type Wire = WireItem;

    fn from_wire(wire: WireItem) -> Result<Self> {
        Ok(wire.into())
    }
}

impl FromWire for Customer {
    type Wire = WireCustomer;

    fn from_wire(wire: WireCustomer) -> Result<Self> {
        Ok(wire.into())
    }
}

impl FromWire for Sale {
    type Wire = WireSale;

    fn from_wire(wire: WireSale) -> Result<Self> {
        wire.try_into()
    }
}

/// Peels an optional `{ "data": ... }` wrapper.
fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Rows of a collection response: `{key: [...]}`, `{data: {key: [...]}}`,
/// `{data: [...]}` or a bare array.
pub(crate) fn decode_rows<W: DeserializeOwned>(value: Value, key: &str) -> Result<Vec<W>> {
    let rows = match unwrap_data(value) {
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Array(Vec::new())),
        other => other,
    };
    match rows {
        Value::Array(_) => serde_json::from_value(rows).with_context(|| format!("decode {key}")),
        Value::Null => Ok(Vec::new()),
        _ => Err(anyhow!("expected a list of {key}")),
    }
}

pub(crate) fn decode_list<T: FromWire>(value: Value, key: &str) -> Result<Vec<T>> {
    decode_rows::<T::Wire>(value, key)?
        .into_iter()
        .map(T::from_wire)
        .collect()
}

/// A single record: `{key: {...}}`, `{data: {...}}` or the bare object.
pub(crate) fn decode_record<W: DeserializeOwned>(value: Value, key: &str) -> Result<W> {
    let record = match unwrap_data(value) {
        Value::Object(mut map) => match map.remove(key) {
            Some(inner @ Value::Object(_)) => inner,
            Some(other) => {
                map.insert(key.to_owned(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    };
    serde_json::from_value(record).with_context(|| format!("decode {key}"))
}

/// A paginated response. Missing totals fall back to the rows returned;
/// `totalPages` is always recomputed from `total` and `limit`.
pub(crate) fn decode_page<T: FromWire>(
    value: Value,
    key: &str,
    query: &QueryState,
) -> Result<ResultPage<T>> {
    let body = unwrap_data(value);
    let number = |field: &str| body.get(field).and_then(Value::as_u64);
    let total = number("total");
    let page = number("page").and_then(|page| u32::try_from(page).ok());
    let limit = number("limit").and_then(|limit| u32::try_from(limit).ok());

    let rows = decode_list::<T>(body.clone(), key)?;
    let total = total.unwrap_or(rows.len() as u64);
    Ok(ResultPage::new(
        rows,
        total,
        page.filter(|page| *page >= 1).unwrap_or(query.page()),
        limit
            .filter(|limit| *limit > 0)
            .unwrap_or(query.page_size().get()),
    ))
}
