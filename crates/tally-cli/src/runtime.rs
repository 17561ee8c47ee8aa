// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use tally_api::Client;
use tally_app::{
    Customer, DashboardSnapshot, FormPayload, Item, LookupSource, PageSource, QueryState,
    ReportTable, ResultPage, Sale, customer_ledger, dashboard_snapshot, items_report,
    sales_report,
};
use tally_testkit::DemoCatalog;
use tally_tui::{AppRuntime, ReportRequest, RowTarget};
use tracing::info;

/// Forwards the list and lookup traits to the wrapped backend field.
macro_rules! forward_sources {
    ($runtime:ty, $field:ident) => {
        impl PageSource<Item> for $runtime {
            fn fetch_page(&self, query: &QueryState) -> Result<ResultPage<Item>> {
                PageSource::<Item>::fetch_page(&self.$field, query)
            }
        }

        impl PageSource<Customer> for $runtime {
            fn fetch_page(&self, query: &QueryState) -> Result<ResultPage<Customer>> {
                PageSource::<Customer>::fetch_page(&self.$field, query)
            }
        }

        impl PageSource<Sale> for $runtime {
            fn fetch_page(&self, query: &QueryState) -> Result<ResultPage<Sale>> {
                PageSource::<Sale>::fetch_page(&self.$field, query)
            }
        }

        impl LookupSource<Item> for $runtime {
            fn candidates(&self, term: &str) -> Result<Vec<Item>> {
                LookupSource::<Item>::candidates(&self.$field, term)
            }
        }

        impl LookupSource<Customer> for $runtime {
            fn candidates(&self, term: &str) -> Result<Vec<Customer>> {
                LookupSource::<Customer>::candidates(&self.$field, term)
            }
        }
    };
}

/// Talks to the shop backend over HTTP.
pub struct ApiRuntime {
    client: Client,
}

impl ApiRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

forward_sources!(ApiRuntime, client);

impl AppRuntime for ApiRuntime {
    fn submit_form(&self, payload: &FormPayload) -> Result<()> {
        match payload {
            FormPayload::Item { id, submission } => {
                self.client.save_item(id.as_ref(), submission)?;
            }
            FormPayload::Customer { id, submission } => {
                self.client.save_customer(id.as_ref(), submission)?;
            }
            FormPayload::Sale { id, submission } => {
                self.client.save_sale(id.as_ref(), submission)?;
            }
        }
        Ok(())
    }

    fn delete_row(&self, target: &RowTarget) -> Result<()> {
        match target {
            RowTarget::Item(id) => self.client.delete_item(id),
            RowTarget::Customer(id) => self.client.delete_customer(id),
            RowTarget::Sale(id) => self.client.delete_sale(id),
        }
    }

    /// Sale rows may carry bare item ids, so the item report doubles as the
    /// catalog for names and recomputed totals.
    fn load_report(&self, request: &ReportRequest) -> Result<ReportTable> {
        let items = self.client.items_report().context("load items report")?;
        let table = match request {
            ReportRequest::Items => items_report(&items),
            ReportRequest::Sales => {
                let sales = self.client.sales_report().context("load sales report")?;
                sales_report(&sales, &items, &[])
            }
            ReportRequest::CustomerLedger { id, name } => {
                let sales = self
                    .client
                    .customer_ledger(id)
                    .with_context(|| format!("load ledger for {name}"))?;
                customer_ledger(name, &sales, &items)
            }
        };
        Ok(table)
    }

    fn load_dashboard(&self) -> Result<DashboardSnapshot> {
        let items = self.client.items_report().context("load items report")?;
        let sales = self.client.sales_report().context("load sales report")?;
        let customers = self
            .client
            .list_customers(&QueryState::default())
            .context("count customers")?;
        Ok(dashboard_snapshot(&items, customers.total, &sales))
    }

    fn email_sales_report(&self) -> Result<()> {
        self.client.email_sales_report()
    }
}

/// Seeded in-memory shop for `--demo`.
pub struct DemoRuntime {
    catalog: DemoCatalog,
}

impl DemoRuntime {
    pub fn new(catalog: DemoCatalog) -> Self {
        Self { catalog }
    }

    pub fn seeded(seed: u64) -> Self {
        let runtime = Self::new(DemoCatalog::seeded(seed));
        info!(seed, "demo catalog ready");
        runtime
    }
}

forward_sources!(DemoRuntime, catalog);

impl AppRuntime for DemoRuntime {
    fn submit_form(&self, payload: &FormPayload) -> Result<()> {
        match payload {
            FormPayload::Item { id, submission } => {
                self.catalog.save_item(id.as_ref(), submission)?;
            }
            FormPayload::Customer { id, submission } => {
                self.catalog.save_customer(id.as_ref(), submission)?;
            }
            FormPayload::Sale { id, submission } => {
                self.catalog.save_sale(id.as_ref(), submission)?;
            }
        }
        Ok(())
    }

    fn delete_row(&self, target: &RowTarget) -> Result<()> {
        match target {
            RowTarget::Item(id) => self.catalog.delete_item(id),
            RowTarget::Customer(id) => self.catalog.delete_customer(id),
            RowTarget::Sale(id) => self.catalog.delete_sale(id),
        }
    }

    fn load_report(&self, request: &ReportRequest) -> Result<ReportTable> {
        let items = self.catalog.items()?;
        let table = match request {
            ReportRequest::Items => items_report(&items),
            ReportRequest::Sales => {
                sales_report(&self.catalog.sales()?, &items, &self.catalog.customers()?)
            }
            ReportRequest::CustomerLedger { id, name } => {
                customer_ledger(name, &self.catalog.sales_for_customer(id)?, &items)
            }
        };
        Ok(table)
    }

    fn load_dashboard(&self) -> Result<DashboardSnapshot> {
        let customers = self.catalog.customers()?.len() as u64;
        Ok(dashboard_snapshot(
            &self.catalog.items()?,
            customers,
            &self.catalog.sales()?,
        ))
    }

    /// The demo shop has no mail server to hand the report to.
    fn email_sales_report(&self) -> Result<()> {
        Err(anyhow!("the demo shop cannot send email; run against a backend"))
    }
}
