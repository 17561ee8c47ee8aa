// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tally_app::{
    Customer, CustomerId, CustomerRef, CustomerSubmission, Entity, Item, ItemId, ItemRef,
    ItemSubmission, LookupSource, PageSource, QueryState, ResultPage, Sale, SaleId,
    SaleSubmission,
};
use time::{Date, Duration, Month};

/// Upper bound on lookup candidates, like the backend's `/list` routes.
pub const LOOKUP_LIMIT: usize = 10;

const PART_NAMES: [&str; 16] = [
    "Brake Pad",
    "Oil Filter",
    "Air Filter",
    "Spark Plug",
    "Clutch Cable",
    "Chain Kit",
    "Headlight Bulb",
    "Tail Lamp",
    "Battery",
    "Engine Oil",
    "Coolant",
    "Wiper Blade",
    "Fuse Box",
    "Horn",
    "Mirror",
    "Tyre Tube",
];

const PART_GRADES: [&str; 6] = ["Standard", "Premium", "Heavy Duty", "Eco", "Sport", "OEM"];

const FIRST_NAMES: [&str; 16] = [
    "Aarav", "Meena", "Ravi", "Priya", "Arjun", "Kavya", "Rohan", "Anita", "Vikram", "Sneha",
    "Kiran", "Divya", "Suresh", "Lakshmi", "Nikhil", "Pooja",
];
const LAST_NAMES: [&str; 12] = [
    "Sharma", "Iyer", "Patel", "Reddy", "Nair", "Gupta", "Rao", "Menon", "Joshi", "Das", "Kapoor",
    "Verma",
];

const STREET_NAMES: [&str; 10] = [
    "MG Road",
    "Station Road",
    "Ring Road",
    "Temple Street",
    "Market Lane",
    "Lake View",
    "Church Street",
    "Gandhi Nagar",
    "Park Avenue",
    "Hill Road",
];
const CITIES: [&str; 8] = [
    "Pune",
    "Chennai",
    "Kochi",
    "Jaipur",
    "Mysuru",
    "Nagpur",
    "Indore",
    "Vizag",
];

const REFERENCE_YEAR: i32 = 2026;

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator for shop records; the same seed always yields the same
/// catalog.
#[derive(Debug, Clone)]
pub struct ShopFaker {
    rng: DeterministicRng,
    next_id: u64,
}

impl ShopFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1,
        }
    }

    pub fn item(&mut self) -> Item {
        let part = self.pick(&PART_NAMES);
        let grade = self.pick(&PART_GRADES);
        Item {
            id: ItemId::new(self.object_id("i")),
            name: format!("{part} {grade}"),
            description: format!("{grade} grade {}", part.to_lowercase()),
            stock_quantity: self.int_range(0, 120),
            unit_price_cents: self.int_range(50, 25_000) * 10,
        }
    }

    pub fn customer(&mut self) -> Customer {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let address = format!(
            "{} {}, {}",
            self.int_range(1, 400),
            self.pick(&STREET_NAMES),
            self.pick(&CITIES)
        );
        Customer {
            id: CustomerId::new(self.object_id("c")),
            name: format!("{first} {last}"),
            address,
            mobile_number: format!("9{:09}", self.int_range(0, 999_999_999)),
        }
    }

    /// A sale against one of `items`, billed to cash or one of `customers`.
    /// Every seventh sale has no stored total, as older records do.
    pub fn sale(&mut self, items: &[Item], customers: &[Customer]) -> Option<Sale> {
        let item = items.get(self.rng.int_n(items.len()))?.clone();
        let quantity = self.int_range(1, 5);
        let customer = if customers.is_empty() || self.rng.bool() {
            None
        } else {
            customers.get(self.rng.int_n(customers.len())).cloned()
        };
        let id = self.object_id("s");
        let total_amount_cents = if self.next_id % 7 == 0 {
            None
        } else {
            Some(item.unit_price_cents.saturating_mul(quantity))
        };
        Some(Sale {
            id: SaleId::new(id),
            is_cash: customer.is_none(),
            customer: customer.map(CustomerRef::Populated),
            item: ItemRef::Populated(item),
            quantity,
            date: self.date_in_year(REFERENCE_YEAR),
            total_amount_cents,
        })
    }

    pub fn date_in_year(&mut self, year: i32) -> Date {
        let start = Date::from_calendar_date(year, Month::January, 1).unwrap_or(Date::MIN);
        start + Duration::days(self.int_range(0, 364))
    }

    fn object_id(&mut self, prefix: &str) -> String {
        let id = format!("{prefix}{:05}", self.next_id);
        self.next_id += 1;
        id
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

#[derive(Debug, Default)]
struct CatalogData {
    items: Vec<Item>,
    customers: Vec<Customer>,
    sales: Vec<Sale>,
    next_id: u64,
}

impl CatalogData {
    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-new-{}", self.next_id)
    }

    fn item(&self, id: &ItemId) -> Result<&Item> {
        self.items
            .iter()
            .find(|item| &item.id == id)
            .ok_or_else(|| anyhow!("item {id} not found"))
    }

    fn item_mut(&mut self, id: &ItemId) -> Result<&mut Item> {
        self.items
            .iter_mut()
            .find(|item| &item.id == id)
            .ok_or_else(|| anyhow!("item {id} not found"))
    }
}

/// In-memory backend standing in for the REST API: paginated search,
/// lookups and mutations with the same stock rules as the real service.
#[derive(Debug, Default)]
pub struct DemoCatalog {
    data: Mutex<CatalogData>,
}

impl DemoCatalog {
    pub fn new(items: Vec<Item>, customers: Vec<Customer>, sales: Vec<Sale>) -> Self {
        Self {
            data: Mutex::new(CatalogData {
                items,
                customers,
                sales,
                next_id: 0,
            }),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        let mut faker = ShopFaker::new(seed);
        let items = (0..48).map(|_| faker.item()).collect::<Vec<_>>();
        let customers = (0..24).map(|_| faker.customer()).collect::<Vec<_>>();
        let mut sales = (0..60)
            .filter_map(|_| faker.sale(&items, &customers))
            .collect::<Vec<_>>();
        sales.sort_by(|a, b| b.date.cmp(&a.date));
        Self::new(items, customers, sales)
    }

    pub fn items(&self) -> Result<Vec<Item>> {
        Ok(self.lock()?.items.clone())
    }

    pub fn customers(&self) -> Result<Vec<Customer>> {
        Ok(self.lock()?.customers.clone())
    }

    pub fn sales(&self) -> Result<Vec<Sale>> {
        Ok(self.lock()?.sales.clone())
    }

    pub fn sales_for_customer(&self, id: &CustomerId) -> Result<Vec<Sale>> {
        Ok(self
            .lock()?
            .sales
            .iter()
            .filter(|sale| {
                !sale.is_cash && sale.customer.as_ref().is_some_and(|c| c.id() == id)
            })
            .cloned()
            .collect())
    }

    pub fn save_item(&self, id: Option<&ItemId>, submission: &ItemSubmission) -> Result<Item> {
        let mut data = self.lock()?;
        let id = match id {
            Some(id) => id.clone(),
            None => ItemId::new(data.fresh_id("i")),
        };
        let item = Item {
            id: id.clone(),
            name: submission.name.clone(),
            description: submission.description.clone(),
            stock_quantity: submission.stock_quantity,
            unit_price_cents: submission.unit_price_cents,
        };
        match data.items.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => *existing = item.clone(),
            None => data.items.push(item.clone()),
        }
        Ok(item)
    }

    pub fn save_customer(
        &self,
        id: Option<&CustomerId>,
        submission: &CustomerSubmission,
    ) -> Result<Customer> {
        let mut data = self.lock()?;
        let id = match id {
            Some(id) => id.clone(),
            None => CustomerId::new(data.fresh_id("c")),
        };
        let customer = Customer {
            id: id.clone(),
            name: submission.name.clone(),
            address: submission.address.clone(),
            mobile_number: submission.mobile_number.clone(),
        };
        match data.customers.iter_mut().find(|existing| existing.id == id) {
            Some(existing) => *existing = customer.clone(),
            None => data.customers.push(customer.clone()),
        }
        Ok(customer)
    }

    /// Creates or updates a sale, moving stock the way the backend does.
    pub fn save_sale(&self, id: Option<&SaleId>, submission: &SaleSubmission) -> Result<Sale> {
        let mut data = self.lock()?;

        let previous = match id {
            Some(id) => Some(
                data.sales
                    .iter()
                    .find(|sale| &sale.id == id)
                    .cloned()
                    .ok_or_else(|| anyhow!("sale {id} not found"))?,
            ),
            None => None,
        };
        let returned = previous
            .as_ref()
            .filter(|sale| sale.item.id() == &submission.item_id)
            .map_or(0, |sale| sale.quantity);

        let item = data.item(&submission.item_id)?.clone();
        if submission.quantity > item.stock_quantity + returned {
            bail!(
                "only {} of {} in stock",
                item.stock_quantity + returned,
                item.name
            );
        }
        let customer = match (&submission.customer_id, submission.is_cash) {
            (_, true) | (None, false) => None,
            (Some(id), false) => Some(
                data.customers
                    .iter()
                    .find(|customer| &customer.id == id)
                    .cloned()
                    .ok_or_else(|| anyhow!("customer {id} not found"))?,
            ),
        };

        if let Some(previous) = &previous {
            data.item_mut(previous.item.id())?.stock_quantity += previous.quantity;
        }
        let stocked = data.item_mut(&submission.item_id)?;
        stocked.stock_quantity -= submission.quantity;
        let item = stocked.clone();

        let sale = Sale {
            id: match id {
                Some(id) => id.clone(),
                None => SaleId::new(data.fresh_id("s")),
            },
            total_amount_cents: Some(item.unit_price_cents.saturating_mul(submission.quantity)),
            item: ItemRef::Populated(item),
            customer: customer.map(CustomerRef::Populated),
            quantity: submission.quantity,
            is_cash: submission.is_cash,
            date: submission.date,
        };
        match data.sales.iter_mut().find(|existing| existing.id == sale.id) {
            Some(existing) => *existing = sale.clone(),
            None => data.sales.insert(0, sale.clone()),
        }
        Ok(sale)
    }

    pub fn delete_item(&self, id: &ItemId) -> Result<()> {
        let mut data = self.lock()?;
        if data.sales.iter().any(|sale| sale.item.id() == id) {
            bail!("item {id} has sales -- delete those sales first");
        }
        let before = data.items.len();
        data.items.retain(|item| &item.id != id);
        if data.items.len() == before {
            bail!("item {id} not found");
        }
        Ok(())
    }

    pub fn delete_customer(&self, id: &CustomerId) -> Result<()> {
        let mut data = self.lock()?;
        if data
            .sales
            .iter()
            .any(|sale| sale.customer.as_ref().is_some_and(|c| c.id() == id))
        {
            bail!("customer {id} has sales -- delete those sales first");
        }
        let before = data.customers.len();
        data.customers.retain(|customer| &customer.id != id);
        if data.customers.len() == before {
            bail!("customer {id} not found");
        }
        Ok(())
    }

    /// Removes a sale and puts its quantity back in stock.
    pub fn delete_sale(&self, id: &SaleId) -> Result<()> {
        let mut data = self.lock()?;
        let index = data
            .sales
            .iter()
            .position(|sale| &sale.id == id)
            .ok_or_else(|| anyhow!("sale {id} not found"))?;
        let sale = data.sales.remove(index);
        if let Ok(item) = data.item_mut(sale.item.id()) {
            item.stock_quantity += sale.quantity;
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, CatalogData>> {
        self.data
            .lock()
            .map_err(|_| anyhow!("demo catalog lock poisoned"))
    }
}

impl PageSource<Item> for DemoCatalog {
    fn fetch_page(&self, query: &QueryState) -> Result<ResultPage<Item>> {
        let data = self.lock()?;
        let matches = data
            .items
            .iter()
            .filter(|item| {
                matches_any(
                    query.trimmed_term(),
                    &[item.name.as_str(), item.description.as_str()],
                )
            })
            .cloned()
            .collect();
        Ok(paginate(matches, query))
    }
}

impl PageSource<Customer> for DemoCatalog {
    fn fetch_page(&self, query: &QueryState) -> Result<ResultPage<Customer>> {
        let data = self.lock()?;
        let matches = data
            .customers
            .iter()
            .filter(|customer| {
                matches_any(
                    query.trimmed_term(),
                    &[
                        customer.name.as_str(),
                        customer.mobile_number.as_str(),
                        customer.address.as_str(),
                    ],
                )
            })
            .cloned()
            .collect();
        Ok(paginate(matches, query))
    }
}

impl PageSource<Sale> for DemoCatalog {
    fn fetch_page(&self, query: &QueryState) -> Result<ResultPage<Sale>> {
        let data = self.lock()?;
        let matches = data
            .sales
            .iter()
            .filter(|sale| {
                let item = sale.item.populated().map_or("", |item| item.name.as_str());
                let customer = sale
                    .customer
                    .as_ref()
                    .and_then(|customer| customer.populated())
                    .map_or("", |customer| customer.name.as_str());
                matches_any(query.trimmed_term(), &[item, customer])
            })
            .cloned()
            .collect();
        Ok(paginate(matches, query))
    }
}

impl LookupSource<Item> for DemoCatalog {
    fn candidates(&self, term: &str) -> Result<Vec<Item>> {
        let data = self.lock()?;
        Ok(lookup(&data.items, term))
    }
}

impl LookupSource<Customer> for DemoCatalog {
    fn candidates(&self, term: &str) -> Result<Vec<Customer>> {
        let data = self.lock()?;
        Ok(lookup(&data.customers, term))
    }
}

/// Fixed rows plus a failure script; records every request it serves so
/// tests can count fetches.
#[derive(Debug)]
pub struct ScriptedSource<T> {
    rows: Vec<T>,
    failures: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<QueryState>>,
}

impl<T: Entity + Send + Sync> ScriptedSource<T> {
    pub fn new(rows: Vec<T>) -> Self {
        Self {
            rows,
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// The next request fails with `message`.
    pub fn fail_next(&self, message: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push_back(message.to_owned());
        }
    }

    pub fn requests(&self) -> Vec<QueryState> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    fn serve(&self, query: &QueryState) -> Result<Vec<T>> {
        self.requests
            .lock()
            .map_err(|_| anyhow!("request log poisoned"))?
            .push(query.clone());
        let failure = self
            .failures
            .lock()
            .map_err(|_| anyhow!("failure script poisoned"))?
            .pop_front();
        if let Some(message) = failure {
            bail!("{message}");
        }
        Ok(self
            .rows
            .iter()
            .filter(|row| matches_any(query.trimmed_term(), &[row.label()]))
            .cloned()
            .collect())
    }
}

impl<T: Entity + Send + Sync> PageSource<T> for ScriptedSource<T> {
    fn fetch_page(&self, query: &QueryState) -> Result<ResultPage<T>> {
        Ok(paginate(self.serve(query)?, query))
    }
}

impl<T: Entity + Send + Sync> LookupSource<T> for ScriptedSource<T> {
    fn candidates(&self, term: &str) -> Result<Vec<T>> {
        let query = QueryState::default().with_term(term);
        let mut rows = self.serve(&query)?;
        rows.truncate(LOOKUP_LIMIT);
        Ok(rows)
    }
}

/// Case-insensitive substring match against any field; no term matches all.
pub fn matches_any(term: Option<&str>, fields: &[&str]) -> bool {
    let Some(term) = term else {
        return true;
    };
    let needle = term.to_lowercase();
    fields
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

pub fn paginate<T>(rows: Vec<T>, query: &QueryState) -> ResultPage<T> {
    let page_size = query.page_size().get();
    let total = rows.len() as u64;
    let skip = (query.page() as usize - 1) * page_size as usize;
    let rows = rows.into_iter().skip(skip).take(page_size as usize).collect();
    ResultPage::new(rows, total, query.page(), page_size)
}

fn lookup<T: Entity>(rows: &[T], term: &str) -> Vec<T> {
    let term = term.trim();
    if term.is_empty() {
        return Vec::new();
    }
    rows.iter()
        .filter(|row| matches_any(Some(term), &[row.label()]))
        .take(LOOKUP_LIMIT)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{DemoCatalog, LOOKUP_LIMIT, ScriptedSource, ShopFaker, paginate};
    use anyhow::Result;
    use tally_app::{
        Customer, Item, ItemId, LookupSource, PageSize, PageSource, QueryState, Sale,
        SaleSubmission,
    };
    use time::{Date, Month};

    #[test]
    fn faker_is_deterministic() {
        let mut left = ShopFaker::new(42);
        let mut right = ShopFaker::new(42);
        assert_eq!(left.item(), right.item());
        assert_eq!(left.customer(), right.customer());
    }

    #[test]
    fn faker_customers_have_valid_mobiles() {
        let mut faker = ShopFaker::new(7);
        for _ in 0..20 {
            let customer = faker.customer();
            assert_eq!(customer.mobile_number.len(), 10);
            assert!(tally_app::mobile_number(&customer.mobile_number).is_ok());
        }
    }

    #[test]
    fn pagination_reports_totals() {
        let rows = (0..25).collect::<Vec<_>>();
        let page = paginate(rows, &QueryState::new("", 3, PageSize::Ten));
        assert_eq!(page.rows, vec![20, 21, 22, 23, 24]);
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);

        let empty = paginate(Vec::<u8>::new(), &QueryState::default());
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn seeded_catalog_searches_items() -> Result<()> {
        let catalog = DemoCatalog::seeded(1);
        let all: tally_app::ResultPage<Item> = catalog.fetch_page(&QueryState::default())?;
        assert_eq!(all.total, 48);
        assert_eq!(all.rows.len(), 10);

        let filtered: tally_app::ResultPage<Item> =
            catalog.fetch_page(&QueryState::new("brake", 1, PageSize::Hundred))?;
        assert!(
            filtered
                .rows
                .iter()
                .all(|item| item.name.to_lowercase().contains("brake")
                    || item.description.contains("brake"))
        );
        Ok(())
    }

    #[test]
    fn lookups_are_bounded_and_skip_blank_terms() -> Result<()> {
        let catalog = DemoCatalog::seeded(3);
        let blank: Vec<Customer> = catalog.candidates("  ")?;
        assert!(blank.is_empty());
        let hits: Vec<Item> = catalog.candidates("a")?;
        assert!(hits.len() <= LOOKUP_LIMIT);
        Ok(())
    }

    #[test]
    fn sales_move_stock() -> Result<()> {
        let catalog = DemoCatalog::new(
            vec![Item {
                id: ItemId::new("i1"),
                name: "Horn".to_owned(),
                description: "12V".to_owned(),
                stock_quantity: 5,
                unit_price_cents: 45_000,
            }],
            Vec::new(),
            Vec::new(),
        );
        let submission = SaleSubmission {
            item_id: ItemId::new("i1"),
            quantity: 3,
            date: Date::from_calendar_date(2026, Month::May, 1)?,
            is_cash: true,
            customer_id: None,
        };
        let sale = catalog.save_sale(None, &submission)?;
        assert_eq!(sale.total_amount_cents, Some(135_000));
        assert_eq!(catalog.items()?[0].stock_quantity, 2);

        let too_many = SaleSubmission {
            quantity: 3,
            ..submission.clone()
        };
        assert!(catalog.save_sale(None, &too_many).is_err());

        let updated = SaleSubmission {
            quantity: 5,
            ..submission
        };
        catalog.save_sale(Some(&sale.id), &updated)?;
        assert_eq!(catalog.items()?[0].stock_quantity, 0);

        assert!(catalog.delete_item(&ItemId::new("i1")).is_err());
        catalog.delete_sale(&sale.id)?;
        assert_eq!(catalog.items()?[0].stock_quantity, 5);
        let sales: Vec<Sale> = catalog.sales()?;
        assert!(sales.is_empty());
        Ok(())
    }

    #[test]
    fn scripted_source_records_requests_and_failures() -> Result<()> {
        let mut faker = ShopFaker::new(9);
        let source = ScriptedSource::new((0..3).map(|_| faker.item()).collect());
        source.fail_next("connection refused");

        let failed: Result<tally_app::ResultPage<Item>> =
            source.fetch_page(&QueryState::default());
        assert!(failed.is_err());
        let page = source.fetch_page(&QueryState::default())?;
        assert_eq!(page.total, 3);
        assert_eq!(source.requests().len(), 2);
        Ok(())
    }
}
