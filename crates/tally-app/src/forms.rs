// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::collections::BTreeMap;
use time::Date;

use crate::validation::{self, FieldError};
use crate::{Customer, CustomerId, FormKind, Item, ItemId, SaleId};

/// Field-scoped validation failures, reported together so every field can
/// show its message at once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormErrors<F: Ord> {
    errors: BTreeMap<F, FieldError>,
}

impl<F: Ord> Default for FormErrors<F> {
    fn default() -> Self {
        Self {
            errors: BTreeMap::new(),
        }
    }
}

impl<F: Ord + Copy> FormErrors<F> {
    pub fn insert(&mut self, field: F, error: FieldError) {
        self.errors.insert(field, error);
    }

    pub fn record<T>(&mut self, field: F, result: validation::ValidationResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.insert(field, error);
                None
            }
        }
    }

    /// Clears one field's error and leaves the rest in place.
    pub fn clear(&mut self, field: F) -> bool {
        self.errors.remove(&field).is_some()
    }

    pub fn get(&self, field: F) -> Option<FieldError> {
        self.errors.get(&field).copied()
    }

    pub fn contains(&self, field: F) -> bool {
        self.errors.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (F, FieldError)> + '_ {
        self.errors.iter().map(|(field, error)| (*field, *error))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ItemField {
    Name,
    Description,
    Quantity,
    Price,
}

impl ItemField {
    pub const ALL: [Self; 4] = [Self::Name, Self::Description, Self::Quantity, Self::Price];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Quantity => "quantity",
            Self::Price => "price",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CustomerField {
    Name,
    Address,
    MobileNumber,
}

impl CustomerField {
    pub const ALL: [Self; 3] = [Self::Name, Self::Address, Self::MobileNumber];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
            Self::MobileNumber => "mobile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SaleField {
    Item,
    Quantity,
    Customer,
    Date,
}

impl SaleField {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Quantity => "quantity",
            Self::Customer => "customer",
            Self::Date => "date",
        }
    }
}

/// Raw text of the item form, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFormInput {
    pub name: String,
    pub description: String,
    pub quantity: String,
    pub price: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSubmission {
    pub name: String,
    pub description: String,
    pub stock_quantity: i64,
    pub unit_price_cents: i64,
}

impl ItemFormInput {
    pub fn from_item(item: &Item) -> Self {
        Self {
            name: item.name.clone(),
            description: item.description.clone(),
            quantity: item.stock_quantity.to_string(),
            price: format!(
                "{}.{:02}",
                item.unit_price_cents / 100,
                item.unit_price_cents % 100
            ),
        }
    }

    pub fn field(&self, field: ItemField) -> &str {
        match field {
            ItemField::Name => &self.name,
            ItemField::Description => &self.description,
            ItemField::Quantity => &self.quantity,
            ItemField::Price => &self.price,
        }
    }

    pub fn field_mut(&mut self, field: ItemField) -> &mut String {
        match field {
            ItemField::Name => &mut self.name,
            ItemField::Description => &mut self.description,
            ItemField::Quantity => &mut self.quantity,
            ItemField::Price => &mut self.price,
        }
    }

    pub fn validate(&self) -> Result<ItemSubmission, FormErrors<ItemField>> {
        let mut errors = FormErrors::default();
        errors.record(ItemField::Name, validation::required(&self.name));
        errors.record(
            ItemField::Description,
            validation::required(&self.description),
        );
        let stock_quantity = errors.record(
            ItemField::Quantity,
            validation::required(&self.quantity)
                .and_then(|()| validation::parse_stock(&self.quantity)),
        );
        let unit_price_cents = errors.record(
            ItemField::Price,
            validation::parse_required_cents(&self.price).and_then(|cents| {
                if cents <= 0 {
                    Err(FieldError::NotPositive)
                } else {
                    Ok(cents)
                }
            }),
        );

        match (stock_quantity, unit_price_cents) {
            (Some(stock_quantity), Some(unit_price_cents)) if errors.is_empty() => {
                Ok(ItemSubmission {
                    name: self.name.trim().to_owned(),
                    description: self.description.trim().to_owned(),
                    stock_quantity,
                    unit_price_cents,
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerFormInput {
    pub name: String,
    pub address: String,
    pub mobile_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerSubmission {
    pub name: String,
    pub address: String,
    pub mobile_number: String,
}

impl CustomerFormInput {
    pub fn from_customer(customer: &Customer) -> Self {
        Self {
            name: customer.name.clone(),
            address: customer.address.clone(),
            mobile_number: customer.mobile_number.clone(),
        }
    }

    pub fn field(&self, field: CustomerField) -> &str {
        match field {
            CustomerField::Name => &self.name,
            CustomerField::Address => &self.address,
            CustomerField::MobileNumber => &self.mobile_number,
        }
    }

    pub fn field_mut(&mut self, field: CustomerField) -> &mut String {
        match field {
            CustomerField::Name => &mut self.name,
            CustomerField::Address => &mut self.address,
            CustomerField::MobileNumber => &mut self.mobile_number,
        }
    }

    pub fn validate(&self) -> Result<CustomerSubmission, FormErrors<CustomerField>> {
        let mut errors = FormErrors::default();
        errors.record(CustomerField::Name, validation::required(&self.name));
        errors.record(CustomerField::Address, validation::required(&self.address));
        errors.record(
            CustomerField::MobileNumber,
            validation::required(&self.mobile_number)
                .and_then(|()| validation::mobile_number(&self.mobile_number)),
        );
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(CustomerSubmission {
            name: self.name.trim().to_owned(),
            address: self.address.trim().to_owned(),
            mobile_number: self.mobile_number.trim().to_owned(),
        })
    }
}

/// What the backend receives when a sale is created or updated. Cash sales
/// never carry a customer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleSubmission {
    pub item_id: ItemId,
    pub quantity: i64,
    pub date: Date,
    pub is_cash: bool,
    pub customer_id: Option<CustomerId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPayload {
    Item {
        id: Option<ItemId>,
        submission: ItemSubmission,
    },
    Customer {
        id: Option<CustomerId>,
        submission: CustomerSubmission,
    },
    Sale {
        id: Option<SaleId>,
        submission: SaleSubmission,
    },
}

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::Item { .. } => FormKind::Item,
            Self::Customer { .. } => FormKind::Customer,
            Self::Sale { .. } => FormKind::Sale,
        }
    }

    pub fn is_update(&self) -> bool {
        match self {
            Self::Item { id, .. } => id.is_some(),
            Self::Customer { id, .. } => id.is_some(),
            Self::Sale { id, .. } => id.is_some(),
        }
    }
}
