// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use time::Date;

use crate::ids::*;

/// Anything a list or lookup can show as a row or candidate.
pub trait Entity: Clone {
    type Id: Clone + PartialEq + std::fmt::Display;

    fn id(&self) -> &Self::Id;

    /// Text shown in a lookup input once the entity is selected.
    fn label(&self) -> &str;
}

/// Entities already loaded, used to resolve references that carry only an id.
pub trait Known<T: Entity> {
    fn known(&self, id: &T::Id) -> Option<&T>;
}

impl<T: Entity> Known<T> for [T] {
    fn known(&self, id: &T::Id) -> Option<&T> {
        self.iter().find(|entity| entity.id() == id)
    }
}

impl<T: Entity> Known<T> for Vec<T> {
    fn known(&self, id: &T::Id) -> Option<&T> {
        self.as_slice().known(id)
    }
}

impl<T, S> Known<T> for HashMap<T::Id, T, S>
where
    T: Entity,
    T::Id: Eq + Hash,
    S: BuildHasher,
{
    fn known(&self, id: &T::Id) -> Option<&T> {
        self.get(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub stock_quantity: i64,
    pub unit_price_cents: i64,
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> &ItemId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub address: String,
    pub mobile_number: String,
}

impl Entity for Customer {
    type Id = CustomerId;

    fn id(&self) -> &CustomerId {
        &self.id
    }

    fn label(&self) -> &str {
        &self.name
    }
}

/// A sale's reference to another record: the backend either sends the bare id
/// or populates the whole entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityRef<I, T> {
    Id(I),
    Populated(T),
}

impl<I, T> EntityRef<I, T>
where
    T: Entity<Id = I>,
{
    pub fn id(&self) -> &I {
        match self {
            Self::Id(id) => id,
            Self::Populated(entity) => entity.id(),
        }
    }

    pub fn populated(&self) -> Option<&T> {
        match self {
            Self::Id(_) => None,
            Self::Populated(entity) => Some(entity),
        }
    }
}

pub type ItemRef = EntityRef<ItemId, Item>;
pub type CustomerRef = EntityRef<CustomerId, Customer>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub item: ItemRef,
    pub customer: Option<CustomerRef>,
    pub quantity: i64,
    pub is_cash: bool,
    pub date: Date,
    pub total_amount_cents: Option<i64>,
}

impl Entity for Sale {
    type Id = SaleId;

    fn id(&self) -> &SaleId {
        &self.id
    }

    fn label(&self) -> &str {
        self.id.as_str()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TabKind {
    Items,
    Customers,
    Sales,
    Reports,
}

impl TabKind {
    pub const ALL: [Self; 4] = [Self::Items, Self::Customers, Self::Sales, Self::Reports];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Items => "Items",
            Self::Customers => "Customers",
            Self::Sales => "Sales",
            Self::Reports => "Reports",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Items => "items",
            Self::Customers => "customers",
            Self::Sales => "sales",
            Self::Reports => "reports",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "items" => Some(Self::Items),
            "customers" => Some(Self::Customers),
            "sales" => Some(Self::Sales),
            "reports" => Some(Self::Reports),
            _ => None,
        }
    }

    /// Path segment of the navigable location for this tab.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Items => "/items",
            Self::Customers => "/customers",
            Self::Sales => "/sales",
            Self::Reports => "/reports",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        let trimmed = path.trim_end_matches('/');
        Self::ALL.into_iter().find(|tab| tab.path() == trimmed)
    }

    pub const fn has_list(self) -> bool {
        !matches!(self, Self::Reports)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    Item,
    Customer,
    Sale,
}

impl FormKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Customer => "customer",
            Self::Sale => "sale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Search,
    Location,
    Form(FormKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportKind {
    Sales,
    Items,
    CustomerLedger,
}

impl ReportKind {
    pub const ALL: [Self; 3] = [Self::Sales, Self::Items, Self::CustomerLedger];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Sales => "sales report",
            Self::Items => "items report",
            Self::CustomerLedger => "customer ledger",
        }
    }
}
