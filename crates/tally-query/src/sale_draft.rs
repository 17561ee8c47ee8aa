// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::time::{Duration, Instant};
use tally_app::validation::{self, FieldError};
use tally_app::{
    Customer, CustomerRef, Entity, FormErrors, Item, ItemRef, Known, Sale, SaleField, SaleId,
    SaleSubmission,
};
use time::Date;
use tracing::info;

use crate::lookup::LookupController;
use crate::sequencer::{Completion, RequestTicket};

/// Fetch due for one of the draft's two lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaleLookupRequest {
    Item(RequestTicket),
    Customer(RequestTicket),
}

/// A sale being created or edited: an item lookup, a customer lookup and the
/// fields that tie them together.
#[derive(Debug)]
pub struct SaleDraft {
    editing: Option<SaleId>,
    item: LookupController<Item>,
    customer: LookupController<Customer>,
    quantity: String,
    is_cash: bool,
    date: String,
    errors: FormErrors<SaleField>,
    submit_error: Option<String>,
}

impl SaleDraft {
    pub fn new(today: Date, delay: Duration) -> Self {
        Self {
            editing: None,
            item: LookupController::new(delay),
            customer: LookupController::new(delay),
            quantity: String::new(),
            is_cash: false,
            date: validation::format_date(today),
            errors: FormErrors::default(),
            submit_error: None,
        }
    }

    /// Seeds a draft from a stored sale. References the loaded catalogs can't
    /// resolve are left unselected.
    pub fn prefill(
        sale: &Sale,
        items: &(impl Known<Item> + ?Sized),
        customers: &(impl Known<Customer> + ?Sized),
        delay: Duration,
    ) -> Self {
        let mut draft = Self::new(sale.date, delay);
        draft.editing = Some(sale.id.clone());
        draft.quantity = sale.quantity.to_string();
        draft.is_cash = sale.is_cash;

        let item = match &sale.item {
            ItemRef::Populated(item) => Some(item.clone()),
            ItemRef::Id(id) => items.known(id).cloned(),
        };
        if let Some(item) = item {
            draft.item.set_selection(item);
        }

        if !sale.is_cash {
            let customer = match &sale.customer {
                Some(CustomerRef::Populated(customer)) => Some(customer.clone()),
                Some(CustomerRef::Id(id)) => customers.known(id).cloned(),
                None => None,
            };
            if let Some(customer) = customer {
                draft.customer.set_selection(customer);
            }
        }
        draft
    }

    pub fn editing(&self) -> Option<&SaleId> {
        self.editing.as_ref()
    }

    pub fn item(&self) -> &LookupController<Item> {
        &self.item
    }

    pub fn item_mut(&mut self) -> &mut LookupController<Item> {
        &mut self.item
    }

    pub fn customer(&self) -> &LookupController<Customer> {
        &self.customer
    }

    pub fn customer_mut(&mut self) -> &mut LookupController<Customer> {
        &mut self.customer
    }

    pub fn quantity(&self) -> &str {
        &self.quantity
    }

    pub fn is_cash(&self) -> bool {
        self.is_cash
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn errors(&self) -> &FormErrors<SaleField> {
        &self.errors
    }

    pub fn error(&self, field: SaleField) -> Option<FieldError> {
        self.errors.get(field)
    }

    pub fn submit_error(&self) -> Option<&str> {
        self.submit_error.as_deref()
    }

    pub fn edit_item(&mut self, text: &str, now: Instant) {
        self.item.edit(text, now);
        self.errors.clear(SaleField::Item);
    }

    pub fn edit_customer(&mut self, text: &str, now: Instant) {
        self.customer.edit(text, now);
        self.errors.clear(SaleField::Customer);
    }

    pub fn set_quantity(&mut self, text: &str) {
        self.quantity = text.to_owned();
        self.errors.clear(SaleField::Quantity);
    }

    /// Cash and a customer are exclusive; marking cash drops the customer.
    pub fn set_cash(&mut self, is_cash: bool) {
        self.is_cash = is_cash;
        if is_cash {
            self.customer.clear_selection();
            self.customer.teardown();
        }
        self.errors.clear(SaleField::Customer);
    }

    pub fn set_date(&mut self, text: &str) {
        self.date = text.to_owned();
        self.errors.clear(SaleField::Date);
    }

    /// Selects an item candidate. A quantity error already on screen is
    /// recomputed against the new item's stock.
    pub fn select_item(&mut self, index: usize) -> bool {
        if self.item.select(index).is_none() {
            return false;
        }
        self.item_selected();
        true
    }

    pub fn select_highlighted_item(&mut self) -> bool {
        if self.item.select_highlighted().is_none() {
            return false;
        }
        self.item_selected();
        true
    }

    pub fn select_customer(&mut self, index: usize) -> bool {
        if self.customer.select(index).is_none() {
            return false;
        }
        self.customer_selected();
        true
    }

    pub fn select_highlighted_customer(&mut self) -> bool {
        if self.customer.select_highlighted().is_none() {
            return false;
        }
        self.customer_selected();
        true
    }

    pub fn tick(&mut self, now: Instant) -> Vec<SaleLookupRequest> {
        let mut requests = Vec::new();
        if let Some(ticket) = self.item.tick(now) {
            requests.push(SaleLookupRequest::Item(ticket));
        }
        if let Some(ticket) = self.customer.tick(now) {
            requests.push(SaleLookupRequest::Customer(ticket));
        }
        requests
    }

    pub fn complete_item(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<Vec<Item>>,
    ) -> Completion {
        self.item.complete(ticket, outcome)
    }

    pub fn complete_customer(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<Vec<Customer>>,
    ) -> Completion {
        self.customer.complete(ticket, outcome)
    }

    pub fn remaining_debounce(&self, now: Instant) -> Option<Duration> {
        match (
            self.item.remaining_debounce(now),
            self.customer.remaining_debounce(now),
        ) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// `unit price × quantity` once the quantity is valid for the selected
    /// item; zero otherwise.
    pub fn total_cents(&self) -> i64 {
        let Some(item) = self.item.selection() else {
            return 0;
        };
        match validation::parse_quantity(&self.quantity) {
            Ok(quantity) if quantity <= item.stock_quantity => {
                item.unit_price_cents.saturating_mul(quantity)
            }
            _ => 0,
        }
    }

    /// Checks every field without short-circuiting so all messages can be
    /// shown together.
    pub fn validate(&self) -> std::result::Result<SaleSubmission, FormErrors<SaleField>> {
        let mut errors = FormErrors::default();

        let item = self.item.selection();
        if item.is_none() {
            errors.insert(SaleField::Item, FieldError::Required);
        }

        let quantity = errors.record(SaleField::Quantity, self.check_quantity());

        let customer_id = if self.is_cash {
            None
        } else {
            match self.customer.selection() {
                Some(customer) => Some(customer.id().clone()),
                None => {
                    errors.insert(SaleField::Customer, FieldError::CustomerOrCash);
                    None
                }
            }
        };

        let date = errors.record(SaleField::Date, validation::parse_required_date(&self.date));

        match (item, quantity, date) {
            (Some(item), Some(quantity), Some(date)) if errors.is_empty() => Ok(SaleSubmission {
                item_id: item.id.clone(),
                quantity,
                date,
                is_cash: self.is_cash,
                customer_id,
            }),
            _ => Err(errors),
        }
    }

    /// Validates and, on failure, keeps the errors for display.
    pub fn submit(&mut self) -> Option<SaleSubmission> {
        self.submit_error = None;
        match self.validate() {
            Ok(submission) => {
                self.errors = FormErrors::default();
                info!(
                    item = %submission.item_id,
                    quantity = submission.quantity,
                    cash = submission.is_cash,
                    update = self.editing.is_some(),
                    "sale submitted"
                );
                Some(submission)
            }
            Err(errors) => {
                self.errors = errors;
                None
            }
        }
    }

    /// The backend rejected the submission; the draft stays as it was.
    pub fn record_submit_failure(&mut self, error: &anyhow::Error) {
        self.submit_error = Some(format!("{error:#}"));
    }

    pub fn teardown(&mut self) {
        self.item.teardown();
        self.customer.teardown();
    }

    fn check_quantity(&self) -> validation::ValidationResult<i64> {
        let quantity = validation::parse_quantity(&self.quantity)?;
        if let Some(item) = self.item.selection() {
            validation::max_quantity(quantity, item.stock_quantity)?;
        }
        Ok(quantity)
    }

    fn item_selected(&mut self) {
        self.errors.clear(SaleField::Item);
        if self.errors.clear(SaleField::Quantity) {
            let checked = self.check_quantity();
            self.errors.record(SaleField::Quantity, checked);
        }
    }

    fn customer_selected(&mut self) {
        self.is_cash = false;
        self.errors.clear(SaleField::Customer);
    }
}

#[cfg(test)]
mod tests {
    use super::{SaleDraft, SaleLookupRequest};
    use anyhow::{Result, anyhow};
    use std::time::{Duration, Instant};
    use tally_app::validation::FieldError;
    use tally_app::{
        Customer, CustomerId, CustomerRef, Item, ItemId, ItemRef, Sale, SaleField, SaleId,
    };
    use time::{Date, Month};

    const DELAY: Duration = Duration::from_millis(300);

    fn today() -> Result<Date> {
        Ok(Date::from_calendar_date(2026, Month::March, 14)?)
    }

    fn item(id: &str, stock: i64, price_cents: i64) -> Item {
        Item {
            id: ItemId::new(id),
            name: format!("item {id}"),
            description: String::new(),
            stock_quantity: stock,
            unit_price_cents: price_cents,
        }
    }

    fn customer(id: &str) -> Customer {
        Customer {
            id: CustomerId::new(id),
            name: format!("customer {id}"),
            address: "Station road".to_owned(),
            mobile_number: "9876543210".to_owned(),
        }
    }

    fn pick_item(draft: &mut SaleDraft, candidate: Item, now: Instant) -> Result<()> {
        draft.edit_item("item", now);
        let requests = draft.tick(now + DELAY);
        let Some(SaleLookupRequest::Item(ticket)) = requests.into_iter().next() else {
            return Err(anyhow!("expected an item lookup"));
        };
        draft.complete_item(ticket, Ok(vec![candidate]));
        if !draft.select_item(0) {
            return Err(anyhow!("item selection failed"));
        }
        Ok(())
    }

    fn pick_customer(draft: &mut SaleDraft, candidate: Customer, now: Instant) -> Result<()> {
        draft.edit_customer("cust", now);
        let requests = draft.tick(now + DELAY);
        let Some(SaleLookupRequest::Customer(ticket)) = requests.into_iter().next() else {
            return Err(anyhow!("expected a customer lookup"));
        };
        draft.complete_customer(ticket, Ok(vec![candidate]));
        if !draft.select_customer(0) {
            return Err(anyhow!("customer selection failed"));
        }
        Ok(())
    }

    #[test]
    fn empty_draft_reports_every_error_at_once() -> Result<()> {
        let mut draft = SaleDraft::new(today()?, DELAY);
        draft.set_date("");
        assert!(draft.submit().is_none());
        assert_eq!(draft.error(SaleField::Item), Some(FieldError::Required));
        assert_eq!(draft.error(SaleField::Quantity), Some(FieldError::Required));
        assert_eq!(
            draft.error(SaleField::Customer),
            Some(FieldError::CustomerOrCash)
        );
        assert_eq!(draft.error(SaleField::Date), Some(FieldError::Required));
        Ok(())
    }

    #[test]
    fn quantity_is_bounded_by_stock() -> Result<()> {
        let now = Instant::now();
        let mut draft = SaleDraft::new(today()?, DELAY);
        pick_item(&mut draft, item("a", 5, 1_000), now)?;
        draft.set_cash(true);

        draft.set_quantity("6");
        assert!(draft.submit().is_none());
        assert_eq!(
            draft.error(SaleField::Quantity),
            Some(FieldError::ExceedsStock(5))
        );
        assert_eq!(draft.total_cents(), 0);

        draft.set_quantity("5");
        assert_eq!(draft.error(SaleField::Quantity), None);
        let submission = draft.submit().ok_or_else(|| anyhow!("5 should be accepted"))?;
        assert_eq!(submission.quantity, 5);
        assert_eq!(draft.total_cents(), 5_000);
        Ok(())
    }

    #[test]
    fn changing_item_rechecks_quantity_error() -> Result<()> {
        let now = Instant::now();
        let mut draft = SaleDraft::new(today()?, DELAY);
        pick_item(&mut draft, item("small", 2, 100), now)?;
        draft.set_quantity("4");
        draft.set_cash(true);
        assert!(draft.submit().is_none());
        assert!(draft.errors().contains(SaleField::Quantity));

        pick_item(&mut draft, item("large", 10, 100), now + DELAY * 2)?;
        assert_eq!(draft.error(SaleField::Quantity), None);

        draft.set_quantity("40");
        assert!(draft.submit().is_none());
        pick_item(&mut draft, item("medium", 20, 100), now + DELAY * 4)?;
        assert_eq!(
            draft.error(SaleField::Quantity),
            Some(FieldError::ExceedsStock(20))
        );
        Ok(())
    }

    #[test]
    fn cash_makes_customer_inert() -> Result<()> {
        let now = Instant::now();
        let mut draft = SaleDraft::new(today()?, DELAY);
        pick_item(&mut draft, item("a", 5, 250), now)?;
        draft.set_quantity("2");
        pick_customer(&mut draft, customer("c1"), now)?;
        draft.set_cash(true);

        let submission = draft.submit().ok_or_else(|| anyhow!("cash sale is valid"))?;
        assert!(submission.is_cash);
        assert_eq!(submission.customer_id, None);
        assert!(draft.customer().selection().is_none());
        Ok(())
    }

    #[test]
    fn selecting_customer_turns_cash_off() -> Result<()> {
        let now = Instant::now();
        let mut draft = SaleDraft::new(today()?, DELAY);
        pick_item(&mut draft, item("a", 5, 250), now)?;
        draft.set_quantity("1");
        draft.set_cash(true);
        pick_customer(&mut draft, customer("c9"), now)?;
        assert!(!draft.is_cash());

        let submission = draft.submit().ok_or_else(|| anyhow!("credit sale is valid"))?;
        assert_eq!(submission.customer_id, Some(CustomerId::new("c9")));
        Ok(())
    }

    #[test]
    fn editing_a_field_clears_only_its_error() -> Result<()> {
        let mut draft = SaleDraft::new(today()?, DELAY);
        assert!(draft.submit().is_none());
        assert_eq!(draft.errors().len(), 3);

        draft.set_quantity("2");
        assert_eq!(draft.errors().len(), 2);
        assert!(draft.errors().contains(SaleField::Item));
        assert!(draft.errors().contains(SaleField::Customer));
        Ok(())
    }

    #[test]
    fn lookups_tick_independently() -> Result<()> {
        let now = Instant::now();
        let mut draft = SaleDraft::new(today()?, DELAY);
        draft.edit_item("bolt", now);
        draft.edit_customer("me", now + Duration::from_millis(100));

        let first = draft.tick(now + DELAY);
        assert!(matches!(first.as_slice(), [SaleLookupRequest::Item(_)]));
        let second = draft.tick(now + DELAY + Duration::from_millis(100));
        assert!(matches!(second.as_slice(), [SaleLookupRequest::Customer(_)]));
        Ok(())
    }

    #[test]
    fn prefill_resolves_references() -> Result<()> {
        let sale = Sale {
            id: SaleId::new("s1"),
            item: ItemRef::Id(ItemId::new("a")),
            customer: Some(CustomerRef::Populated(customer("c1"))),
            quantity: 3,
            is_cash: false,
            date: today()?,
            total_amount_cents: Some(900),
        };
        let draft = SaleDraft::prefill(
            &sale,
            &vec![item("a", 10, 300)],
            &Vec::<Customer>::new(),
            DELAY,
        );
        assert_eq!(draft.editing(), Some(&SaleId::new("s1")));
        assert_eq!(draft.item().display_text(), "item a");
        assert_eq!(draft.customer().display_text(), "customer c1");
        assert_eq!(draft.date(), "2026-03-14");
        assert_eq!(draft.total_cents(), 900);
        Ok(())
    }

    #[test]
    fn submit_failure_keeps_draft() -> Result<()> {
        let now = Instant::now();
        let mut draft = SaleDraft::new(today()?, DELAY);
        pick_item(&mut draft, item("a", 5, 250), now)?;
        draft.set_quantity("1");
        draft.set_cash(true);
        draft.submit().ok_or_else(|| anyhow!("valid draft"))?;

        draft.record_submit_failure(&anyhow!("server returned 409"));
        assert_eq!(draft.submit_error(), Some("server returned 409"));
        assert_eq!(draft.quantity(), "1");
        assert!(draft.item().selection().is_some());
        Ok(())
    }
}
