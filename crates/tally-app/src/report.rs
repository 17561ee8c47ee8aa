// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Materialized report tables. Rendering them (print, spreadsheet, PDF) is
//! left to whoever consumes the rows.

use time::Date;

use crate::validation::{format_count, format_date, format_money};
use crate::{Customer, EntityRef, Item, Known, Sale, SaleId};

/// Marker appended to totals that were recomputed from the current item price
/// rather than read from the stored sale.
pub const RECOMPUTED_MARK: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TotalSource {
    /// `totalAmount` stored with the sale.
    Persisted,
    /// `unit price × quantity` from the item embedded in the sale.
    RecomputedFromPopulated,
    /// `unit price × quantity` from the loaded item catalog.
    RecomputedFromCatalog,
    /// Neither a stored total nor a resolvable item.
    Unknown,
}

impl TotalSource {
    /// Recomputed totals use today's price and can drift from what was billed.
    pub const fn may_diverge(self) -> bool {
        matches!(
            self,
            Self::RecomputedFromPopulated | Self::RecomputedFromCatalog
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTotal {
    pub cents: i64,
    pub source: TotalSource,
}

impl SaleTotal {
    pub fn display(self) -> String {
        let amount = format_money(self.cents);
        if self.source.may_diverge() {
            format!("{amount}{RECOMPUTED_MARK}")
        } else {
            amount
        }
    }
}

/// Stored total wins; otherwise the total is rebuilt from the referenced item.
pub fn resolve_sale_total(sale: &Sale, catalog: &(impl Known<Item> + ?Sized)) -> SaleTotal {
    if let Some(cents) = sale.total_amount_cents {
        return SaleTotal {
            cents,
            source: TotalSource::Persisted,
        };
    }

    match &sale.item {
        EntityRef::Populated(item) => SaleTotal {
            cents: item.unit_price_cents.saturating_mul(sale.quantity),
            source: TotalSource::RecomputedFromPopulated,
        },
        EntityRef::Id(id) => match catalog.known(id) {
            Some(item) => SaleTotal {
                cents: item.unit_price_cents.saturating_mul(sale.quantity),
                source: TotalSource::RecomputedFromCatalog,
            },
            None => SaleTotal {
                cents: 0,
                source: TotalSource::Unknown,
            },
        },
    }
}

pub fn sale_item_name(sale: &Sale, catalog: &(impl Known<Item> + ?Sized)) -> String {
    match &sale.item {
        EntityRef::Populated(item) if !item.name.is_empty() => item.name.clone(),
        EntityRef::Populated(item) => item.id.to_string(),
        EntityRef::Id(id) => catalog
            .known(id)
            .map_or_else(|| id.to_string(), |item| item.name.clone()),
    }
}

pub fn sale_customer_label(sale: &Sale, customers: &(impl Known<Customer> + ?Sized)) -> String {
    if sale.is_cash {
        return "Cash".to_owned();
    }
    match &sale.customer {
        Some(EntityRef::Populated(customer)) if !customer.name.is_empty() => {
            customer.name.clone()
        }
        Some(EntityRef::Populated(customer)) => customer.id.to_string(),
        Some(EntityRef::Id(id)) => customers
            .known(id)
            .map_or_else(|| id.to_string(), |customer| customer.name.clone()),
        None => "N/A".to_owned(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub title: String,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
    pub footer: Option<Vec<String>>,
    /// At least one total was recomputed and may differ from what was billed.
    pub has_recomputed_totals: bool,
}

impl ReportTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub fn sales_report(sales: &[Sale], catalog: &[Item], customers: &[Customer]) -> ReportTable {
    let mut grand_total = 0i64;
    let mut has_recomputed_totals = false;
    let rows = sales
        .iter()
        .map(|sale| {
            let total = resolve_sale_total(sale, catalog);
            grand_total = grand_total.saturating_add(total.cents);
            has_recomputed_totals |= total.source.may_diverge();
            vec![
                format_date(sale.date),
                sale_item_name(sale, catalog),
                format_count(sale.quantity),
                sale_customer_label(sale, customers),
                total.display(),
            ]
        })
        .collect::<Vec<_>>();

    ReportTable {
        title: "Sales Report".to_owned(),
        columns: vec!["Date", "Item", "Quantity", "Customer/Cash", "Total Price"],
        footer: (!rows.is_empty()).then(|| {
            vec![
                "Total".to_owned(),
                String::new(),
                String::new(),
                String::new(),
                format_money(grand_total),
            ]
        }),
        rows,
        has_recomputed_totals,
    }
}

pub fn items_report(items: &[Item]) -> ReportTable {
    let mut stock_value = 0i64;
    let rows = items
        .iter()
        .map(|item| {
            let value = item.unit_price_cents.saturating_mul(item.stock_quantity);
            stock_value = stock_value.saturating_add(value);
            vec![
                item.name.clone(),
                item.description.clone(),
                format_count(item.stock_quantity),
                format_money(item.unit_price_cents),
                format_money(value),
            ]
        })
        .collect::<Vec<_>>();

    ReportTable {
        title: "Items Report".to_owned(),
        columns: vec!["Name", "Description", "Quantity", "Price", "Stock Value"],
        footer: (!rows.is_empty()).then(|| {
            vec![
                "Total".to_owned(),
                String::new(),
                String::new(),
                String::new(),
                format_money(stock_value),
            ]
        }),
        rows,
        has_recomputed_totals: false,
    }
}

/// One customer's purchases with a running balance.
pub fn customer_ledger(customer_name: &str, sales: &[Sale], catalog: &[Item]) -> ReportTable {
    let mut balance = 0i64;
    let mut has_recomputed_totals = false;
    let rows = sales
        .iter()
        .map(|sale| {
            let total = resolve_sale_total(sale, catalog);
            balance = balance.saturating_add(total.cents);
            has_recomputed_totals |= total.source.may_diverge();
            vec![
                format_date(sale.date),
                sale_item_name(sale, catalog),
                format_count(sale.quantity),
                total.display(),
                format_money(balance),
            ]
        })
        .collect::<Vec<_>>();

    let name = if customer_name.trim().is_empty() {
        "Customer"
    } else {
        customer_name
    };

    ReportTable {
        title: format!("{name} - Customer Ledger"),
        columns: vec!["Date", "Item", "Quantity", "Total Price", "Balance"],
        footer: None,
        rows,
        has_recomputed_totals,
    }
}

/// Items with less stock than this are flagged on the dashboard.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

/// Length of each dashboard list.
pub const DASHBOARD_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardSale {
    pub sale_id: SaleId,
    pub date: Date,
    pub item_name: String,
    pub quantity: i64,
    pub total: SaleTotal,
}

/// Shop-wide counts plus the two short lists the dashboard shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardSnapshot {
    pub total_items: u64,
    pub total_customers: u64,
    pub total_sales: u64,
    pub revenue_cents: i64,
    pub has_recomputed_revenue: bool,
    pub low_stock: Vec<Item>,
    pub recent_sales: Vec<DashboardSale>,
}

impl DashboardSnapshot {
    pub fn revenue_display(&self) -> String {
        let amount = format_money(self.revenue_cents);
        if self.has_recomputed_revenue {
            format!("{amount}{RECOMPUTED_MARK}")
        } else {
            amount
        }
    }
}

/// Revenue sums the same totals the sales report shows. Low stock keeps
/// catalog order; recent sales are newest first.
pub fn dashboard_snapshot(
    items: &[Item],
    total_customers: u64,
    sales: &[Sale],
) -> DashboardSnapshot {
    let mut revenue_cents = 0i64;
    let mut has_recomputed_revenue = false;
    for sale in sales {
        let total = resolve_sale_total(sale, items);
        revenue_cents = revenue_cents.saturating_add(total.cents);
        has_recomputed_revenue |= total.source.may_diverge();
    }

    let low_stock = items
        .iter()
        .filter(|item| item.stock_quantity < LOW_STOCK_THRESHOLD)
        .take(DASHBOARD_ROWS)
        .cloned()
        .collect();

    let mut newest = sales.iter().collect::<Vec<_>>();
    newest.sort_by(|a, b| b.date.cmp(&a.date));
    let recent_sales = newest
        .into_iter()
        .take(DASHBOARD_ROWS)
        .map(|sale| DashboardSale {
            sale_id: sale.id.clone(),
            date: sale.date,
            item_name: sale_item_name(sale, items),
            quantity: sale.quantity,
            total: resolve_sale_total(sale, items),
        })
        .collect();

    DashboardSnapshot {
        total_items: items.len() as u64,
        total_customers,
        total_sales: sales.len() as u64,
        revenue_cents,
        has_recomputed_revenue,
        low_stock,
        recent_sales,
    }
}
