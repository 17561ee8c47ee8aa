// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::time::{Duration, Instant};
use tally_app::{Customer, Item, LookupSource, PageSize, PageSource, QueryState, ResultPage};
use tally_query::{
    Completion, DEFAULT_DEBOUNCE, ListController, Location, LocationHandle, LocationStore,
    LookupController, MemoryStore, PointerTarget, SaleDraft, SaleLookupRequest,
};
use tally_testkit::{DemoCatalog, ScriptedSource, ShopFaker};
use time::{Date, Month};

fn items(count: usize) -> Vec<Item> {
    let mut faker = ShopFaker::new(11);
    (0..count).map(|_| faker.item()).collect()
}

#[test]
fn burst_of_edits_issues_one_fetch_with_final_term() -> Result<()> {
    let source = ScriptedSource::new(items(30));
    let start = Instant::now();
    let mut list = ListController::<Item, _>::new(MemoryStore::default(), DEFAULT_DEBOUNCE);

    let mut typed = String::new();
    for (step, ch) in "brake".chars().enumerate() {
        typed.push(ch);
        let at = start + Duration::from_millis(step as u64 * 120);
        list.edit_term(&typed, at);
        if let Some(ticket) = list.tick(at) {
            return Err(anyhow!("unexpected fetch for {:?}", ticket.query()));
        }
    }

    let fired = start + Duration::from_millis(4 * 120) + DEFAULT_DEBOUNCE;
    let ticket = list.tick(fired).ok_or_else(|| anyhow!("debounce did not fire"))?;
    let outcome = source.fetch_page(ticket.query());
    assert_eq!(list.complete(ticket, outcome), Completion::Applied);

    let requests = source.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].term(), "brake");
    assert_eq!(requests[0].page(), 1);
    Ok(())
}

#[test]
fn slow_early_response_never_overwrites_fast_late_one() -> Result<()> {
    let catalog = DemoCatalog::seeded(5);
    let start = Instant::now();
    let mut list = ListController::<Item, _>::new(MemoryStore::default(), DEFAULT_DEBOUNCE);

    list.edit_term("oil", start);
    let slow = list
        .tick(start + DEFAULT_DEBOUNCE)
        .ok_or_else(|| anyhow!("first fetch"))?;
    list.edit_term("brake", start + DEFAULT_DEBOUNCE);
    let fast = list
        .tick(start + DEFAULT_DEBOUNCE * 2)
        .ok_or_else(|| anyhow!("second fetch"))?;

    let fast_page: ResultPage<Item> = catalog.fetch_page(fast.query())?;
    let slow_page: ResultPage<Item> = catalog.fetch_page(slow.query())?;
    let expected = fast_page.clone();

    assert_eq!(list.complete(fast, Ok(fast_page)), Completion::Applied);
    assert_eq!(list.complete(slow, Ok(slow_page)), Completion::Discarded);
    assert_eq!(list.page(), Some(&expected));
    assert_eq!(list.query().term(), "brake");
    Ok(())
}

#[test]
fn stale_failure_does_not_raise_banner() -> Result<()> {
    let source = ScriptedSource::new(items(5));
    let mut list = ListController::<Item, _>::new(MemoryStore::default(), DEFAULT_DEBOUNCE);
    let first = list.start();
    let second = list
        .set_page_size(PageSize::Twenty)
        .ok_or_else(|| anyhow!("page size change should fetch"))?;

    source.fail_next("connection reset by peer");
    let failed = source.fetch_page(first.query());
    let ok = source.fetch_page(second.query());

    assert_eq!(list.complete(second, ok), Completion::Applied);
    assert_eq!(list.complete(first, failed), Completion::Discarded);
    assert_eq!(list.error(), None);
    assert_eq!(list.rows().len(), 5);
    Ok(())
}

#[test]
fn bookmark_reproduces_the_same_page() -> Result<()> {
    let catalog = DemoCatalog::seeded(8);
    let handle = LocationHandle::new(Location::parse("/items?q=filter&page=1&limit=20"));
    let mut list = ListController::<Item, _>::new(
        LocationStore::mount(handle.clone(), "/items"),
        DEFAULT_DEBOUNCE,
    );
    let ticket = list.start();
    let outcome = catalog.fetch_page(ticket.query());
    list.complete(ticket, outcome);
    let first_visit = list.page().cloned();

    let href = handle.href();
    let reopened = LocationHandle::new(Location::parse(&href));
    let mut again = ListController::<Item, _>::new(
        LocationStore::mount(reopened, "/items"),
        DEFAULT_DEBOUNCE,
    );
    let ticket = again.start();
    assert_eq!(
        ticket.query(),
        &QueryState::new("filter", 1, PageSize::Twenty)
    );
    let outcome = catalog.fetch_page(ticket.query());
    again.complete(ticket, outcome);
    assert_eq!(again.page().cloned(), first_visit);
    Ok(())
}

#[test]
fn list_edits_write_back_with_replace() -> Result<()> {
    let handle = LocationHandle::new(Location::parse("/customers"));
    let mut list = ListController::<Customer, _>::new(
        LocationStore::mount(handle.clone(), "/customers"),
        DEFAULT_DEBOUNCE,
    );
    let start = Instant::now();
    list.edit_term("ravi", start);
    assert_eq!(handle.href(), "/customers", "write-back waits for debounce");
    list.tick(start + DEFAULT_DEBOUNCE)
        .ok_or_else(|| anyhow!("debounce did not fire"))?;
    assert_eq!(handle.href(), "/customers?q=ravi&page=1&limit=10");
    assert_eq!(handle.snapshot().history_len(), 0);
    Ok(())
}

#[test]
fn lookup_against_demo_catalog() -> Result<()> {
    let catalog = DemoCatalog::seeded(2);
    let start = Instant::now();
    let mut lookup = LookupController::<Customer>::new(DEFAULT_DEBOUNCE);
    lookup.pointer_down(PointerTarget::Input);
    lookup.edit("a", start);
    let ticket = lookup
        .tick(start + DEFAULT_DEBOUNCE)
        .ok_or_else(|| anyhow!("lookup fetch"))?;
    let outcome: Result<Vec<Customer>> = catalog.candidates(ticket.query().term());
    lookup.complete(ticket, outcome);
    assert!(lookup.is_open());

    lookup.pointer_down(PointerTarget::Outside);
    assert!(!lookup.is_open());
    lookup.pointer_down(PointerTarget::Input);
    assert!(lookup.is_open());

    let chosen = lookup.select(0).map(|customer| customer.name.clone());
    assert!(chosen.is_some());
    assert!(!lookup.is_open());
    assert_eq!(lookup.query().term(), "");
    assert_eq!(Some(lookup.display_text().to_owned()), chosen);
    Ok(())
}

#[test]
fn sale_draft_end_to_end_against_demo_catalog() -> Result<()> {
    let catalog = DemoCatalog::seeded(4);
    let in_stock = catalog
        .items()?
        .into_iter()
        .find(|item| item.stock_quantity > 0)
        .ok_or_else(|| anyhow!("seeded catalog has stock"))?;

    let start = Instant::now();
    let today = Date::from_calendar_date(2026, Month::June, 2)?;
    let mut draft = SaleDraft::new(today, DEFAULT_DEBOUNCE);
    draft.edit_item(&in_stock.name, start);
    for request in draft.tick(start + DEFAULT_DEBOUNCE) {
        match request {
            SaleLookupRequest::Item(ticket) => {
                let outcome: Result<Vec<Item>> = catalog.candidates(ticket.query().term());
                draft.complete_item(ticket, outcome);
            }
            SaleLookupRequest::Customer(_) => return Err(anyhow!("no customer search typed")),
        }
    }
    let index = draft
        .item()
        .candidates()
        .iter()
        .position(|item| item.id == in_stock.id)
        .ok_or_else(|| anyhow!("item should be a candidate"))?;
    assert!(draft.select_item(index));

    draft.set_quantity(&(in_stock.stock_quantity + 1).to_string());
    draft.set_cash(true);
    assert!(draft.submit().is_none());

    draft.set_quantity(&in_stock.stock_quantity.to_string());
    let submission = draft
        .submit()
        .ok_or_else(|| anyhow!("quantity equal to stock is valid"))?;
    assert_eq!(
        draft.total_cents(),
        in_stock.unit_price_cents * in_stock.stock_quantity
    );

    catalog.save_sale(None, &submission)?;
    let after = catalog
        .items()?
        .into_iter()
        .find(|item| item.id == in_stock.id)
        .ok_or_else(|| anyhow!("item still exists"))?;
    assert_eq!(after.stock_quantity, 0);
    Ok(())
}
