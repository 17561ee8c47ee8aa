// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Form overlays: the sale form with its two lookups, and the plain item and
//! customer forms.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use std::ops::Range;
use std::time::{Duration, Instant};
use tally_app::{
    Customer, CustomerField, CustomerFormInput, CustomerId, FormErrors, FormKind, FormPayload,
    Item, ItemField, ItemFormInput, ItemId, Known, Sale,
};
use tally_query::{PointerTarget, SaleDraft};
use time::Date;

/// Most candidate rows a dropdown shows at once.
pub(crate) const DROPDOWN_ROWS: usize = 6;

/// Candidate indexes drawn in the dropdown. The window scrolls so the
/// highlighted candidate is always the last visible row or above it.
pub(crate) fn dropdown_window(len: usize, highlighted: Option<usize>) -> Range<usize> {
    let start = match highlighted {
        Some(index) if index < len && index >= DROPDOWN_ROWS => index + 1 - DROPDOWN_ROWS,
        _ => 0,
    };
    start..len.min(start + DROPDOWN_ROWS)
}

#[derive(Debug)]
pub(crate) enum FormAction {
    Stay,
    Close,
    Submit(FormPayload),
}

#[derive(Debug)]
pub(crate) enum FormUi {
    Sale(SaleForm),
    Item(ItemForm),
    Customer(CustomerForm),
}

impl FormUi {
    pub(crate) fn kind(&self) -> FormKind {
        match self {
            Self::Sale(_) => FormKind::Sale,
            Self::Item(_) => FormKind::Item,
            Self::Customer(_) => FormKind::Customer,
        }
    }

    pub(crate) fn is_update(&self) -> bool {
        match self {
            Self::Sale(form) => form.draft.editing().is_some(),
            Self::Item(form) => form.id.is_some(),
            Self::Customer(form) => form.id.is_some(),
        }
    }

    pub(crate) fn handle_key(&mut self, key: KeyEvent, now: Instant) -> FormAction {
        if key.code == KeyCode::Esc {
            return FormAction::Close;
        }
        match self {
            Self::Sale(form) => form.handle_key(key, now),
            Self::Item(form) => form.handle_key(key),
            Self::Customer(form) => form.handle_key(key),
        }
    }

    pub(crate) fn record_submit_failure(&mut self, error: &anyhow::Error) {
        match self {
            Self::Sale(form) => form.draft.record_submit_failure(error),
            Self::Item(form) => form.submit_error = Some(format!("{error:#}")),
            Self::Customer(form) => form.submit_error = Some(format!("{error:#}")),
        }
    }

    pub(crate) fn teardown(&mut self) {
        if let Self::Sale(form) = self {
            form.draft.teardown();
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SaleFocus {
    Item,
    Quantity,
    Cash,
    Customer,
    Date,
}

impl SaleFocus {
    pub(crate) const ALL: [Self; 5] = [
        Self::Item,
        Self::Quantity,
        Self::Cash,
        Self::Customer,
        Self::Date,
    ];

    pub(crate) const fn label(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Quantity => "quantity",
            Self::Cash => "cash sale",
            Self::Customer => "customer",
            Self::Date => "date",
        }
    }

    fn step(self, delta: isize) -> Self {
        let current = Self::ALL
            .iter()
            .position(|focus| *focus == self)
            .unwrap_or(0) as isize;
        let len = Self::ALL.len() as isize;
        Self::ALL[(current + delta).rem_euclid(len) as usize]
    }
}

#[derive(Debug)]
pub(crate) struct SaleForm {
    pub(crate) draft: SaleDraft,
    pub(crate) focus: SaleFocus,
}

impl SaleForm {
    pub(crate) fn new(today: Date, delay: Duration) -> Self {
        Self::focused(SaleDraft::new(today, delay))
    }

    pub(crate) fn edit(
        sale: &Sale,
        items: &impl Known<Item>,
        customers: &impl Known<Customer>,
        delay: Duration,
    ) -> Self {
        Self::focused(SaleDraft::prefill(sale, items, customers, delay))
    }

    fn focused(mut draft: SaleDraft) -> Self {
        draft.item_mut().focus();
        Self {
            draft,
            focus: SaleFocus::Item,
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> FormAction {
        match (key.code, key.modifiers) {
            (KeyCode::Char('s'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                return self.submit();
            }
            (KeyCode::Tab, _) => {
                self.move_focus(1);
                return FormAction::Stay;
            }
            (KeyCode::BackTab, _) => {
                self.move_focus(-1);
                return FormAction::Stay;
            }
            _ => {}
        }

        match self.focus {
            SaleFocus::Item => self.item_key(key, now),
            SaleFocus::Customer => self.customer_key(key, now),
            SaleFocus::Quantity => {
                let mut text = self.draft.quantity().to_owned();
                match edit_text(&mut text, key) {
                    TextEdit::Changed => self.draft.set_quantity(&text),
                    TextEdit::Enter => return self.submit(),
                    TextEdit::Ignored => {}
                }
                FormAction::Stay
            }
            SaleFocus::Date => {
                let mut text = self.draft.date().to_owned();
                match edit_text(&mut text, key) {
                    TextEdit::Changed => self.draft.set_date(&text),
                    TextEdit::Enter => return self.submit(),
                    TextEdit::Ignored => {}
                }
                FormAction::Stay
            }
            SaleFocus::Cash => match key.code {
                KeyCode::Char(' ') => {
                    let is_cash = !self.draft.is_cash();
                    self.draft.set_cash(is_cash);
                    FormAction::Stay
                }
                KeyCode::Enter => self.submit(),
                _ => FormAction::Stay,
            },
        }
    }

    fn item_key(&mut self, key: KeyEvent, now: Instant) -> FormAction {
        match key.code {
            KeyCode::Down => self.draft.item_mut().highlight_next(),
            KeyCode::Up => self.draft.item_mut().highlight_prev(),
            KeyCode::Enter => {
                if !self.draft.select_highlighted_item() {
                    return self.submit();
                }
            }
            KeyCode::Backspace if self.draft.item().input().is_empty() => {
                self.draft.item_mut().clear_selection();
            }
            _ => {
                let mut text = self.draft.item().input().to_owned();
                if edit_text(&mut text, key) == TextEdit::Changed {
                    self.draft.edit_item(&text, now);
                }
            }
        }
        FormAction::Stay
    }

    fn customer_key(&mut self, key: KeyEvent, now: Instant) -> FormAction {
        match key.code {
            KeyCode::Down => self.draft.customer_mut().highlight_next(),
            KeyCode::Up => self.draft.customer_mut().highlight_prev(),
            KeyCode::Enter => {
                if !self.draft.select_highlighted_customer() {
                    return self.submit();
                }
            }
            KeyCode::Backspace if self.draft.customer().input().is_empty() => {
                self.draft.customer_mut().clear_selection();
            }
            _ => {
                let mut text = self.draft.customer().input().to_owned();
                if edit_text(&mut text, key) == TextEdit::Changed {
                    self.draft.edit_customer(&text, now);
                }
            }
        }
        FormAction::Stay
    }

    fn submit(&mut self) -> FormAction {
        match self.draft.submit() {
            Some(submission) => FormAction::Submit(FormPayload::Sale {
                id: self.draft.editing().cloned(),
                submission,
            }),
            None => FormAction::Stay,
        }
    }

    pub(crate) fn move_focus(&mut self, delta: isize) {
        self.set_focus(self.focus.step(delta));
    }

    fn set_focus(&mut self, focus: SaleFocus) {
        if focus == self.focus {
            return;
        }
        match self.focus {
            SaleFocus::Item => {
                self.draft.item_mut().blur();
                self.draft.item_mut().close();
            }
            SaleFocus::Customer => {
                self.draft.customer_mut().blur();
                self.draft.customer_mut().close();
            }
            _ => {}
        }
        match focus {
            SaleFocus::Item => self.draft.item_mut().focus(),
            SaleFocus::Customer => self.draft.customer_mut().focus(),
            _ => {}
        }
        self.focus = focus;
    }

    /// A mouse press inside the form. Each lookup learns whether the press
    /// landed on its input, its dropdown or elsewhere; a press on a dropdown
    /// row picks that candidate.
    pub(crate) fn pointer_down(&mut self, area: Rect, column: u16, row: u16) {
        let layout = SaleFormLayout::compute(area, &self.draft);
        let position = Position::new(column, row);

        let item_target = pointer_target(position, layout.item, layout.item_dropdown);
        let customer_target = pointer_target(position, layout.customer, layout.customer_dropdown);

        match (item_target, layout.item_dropdown) {
            (PointerTarget::Dropdown, Some(dropdown)) => {
                let item = self.draft.item();
                let window = dropdown_window(item.candidates().len(), item.highlighted());
                if let Some(index) = dropdown_row(dropdown, row) {
                    self.draft.select_item(window.start + index);
                }
            }
            (target, _) => self.draft.item_mut().pointer_down(target),
        }
        match (customer_target, layout.customer_dropdown) {
            (PointerTarget::Dropdown, Some(dropdown)) => {
                let customer = self.draft.customer();
                let window = dropdown_window(customer.candidates().len(), customer.highlighted());
                if let Some(index) = dropdown_row(dropdown, row) {
                    self.draft.select_customer(window.start + index);
                }
            }
            (target, _) => self.draft.customer_mut().pointer_down(target),
        }
        if item_target == PointerTarget::Dropdown || customer_target == PointerTarget::Dropdown {
            return;
        }

        let clicked = [
            (layout.item, SaleFocus::Item),
            (layout.quantity, SaleFocus::Quantity),
            (layout.cash, SaleFocus::Cash),
            (layout.customer, SaleFocus::Customer),
            (layout.date, SaleFocus::Date),
        ]
        .into_iter()
        .find(|(rect, _)| rect.contains(position))
        .map(|(_, focus)| focus);
        if let Some(focus) = clicked {
            self.focus = focus;
            if focus == SaleFocus::Cash {
                let is_cash = !self.draft.is_cash();
                self.draft.set_cash(is_cash);
            }
        }
    }
}

fn pointer_target(position: Position, input: Rect, dropdown: Option<Rect>) -> PointerTarget {
    if input.contains(position) {
        PointerTarget::Input
    } else if dropdown.is_some_and(|dropdown| dropdown.contains(position)) {
        PointerTarget::Dropdown
    } else {
        PointerTarget::Outside
    }
}

/// Candidate index under `row`, skipping the dropdown's top border.
fn dropdown_row(dropdown: Rect, row: u16) -> Option<usize> {
    let offset = row.checked_sub(dropdown.y + 1)?;
    let index = usize::from(offset);
    (index < usize::from(dropdown.height.saturating_sub(2))).then_some(index)
}

/// Screen regions of the sale form, shared by rendering and mouse hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SaleFormLayout {
    pub(crate) outer: Rect,
    pub(crate) item: Rect,
    pub(crate) quantity: Rect,
    pub(crate) cash: Rect,
    pub(crate) customer: Rect,
    pub(crate) date: Rect,
    pub(crate) summary: Rect,
    pub(crate) item_dropdown: Option<Rect>,
    pub(crate) customer_dropdown: Option<Rect>,
}

impl SaleFormLayout {
    pub(crate) fn compute(area: Rect, draft: &SaleDraft) -> Self {
        let outer = crate::centered_rect(70, 80, area);
        let inner = Rect {
            x: outer.x.saturating_add(1),
            y: outer.y.saturating_add(1),
            width: outer.width.saturating_sub(2),
            height: outer.height.saturating_sub(2),
        };
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(inner);

        let item_rows = draft.item().is_open().then(|| draft.item().candidates().len());
        let customer_rows = draft
            .customer()
            .is_open()
            .then(|| draft.customer().candidates().len());

        Self {
            outer,
            item: rows[0],
            quantity: rows[1],
            cash: rows[2],
            customer: rows[3],
            date: rows[4],
            summary: rows[5],
            item_dropdown: item_rows.map(|count| dropdown_rect(rows[0], count, outer)),
            customer_dropdown: customer_rows.map(|count| dropdown_rect(rows[3], count, outer)),
        }
    }
}

/// Box directly under `input`; an empty candidate set still needs one row
/// for the "no results" line.
fn dropdown_rect(input: Rect, candidates: usize, bounds: Rect) -> Rect {
    let rows = candidates.clamp(1, DROPDOWN_ROWS) as u16;
    let top = input.y.saturating_add(input.height);
    let bottom = bounds.y.saturating_add(bounds.height);
    Rect {
        x: input.x,
        y: top,
        width: input.width,
        height: (rows + 2).min(bottom.saturating_sub(top)),
    }
}

#[derive(Debug)]
pub(crate) struct ItemForm {
    pub(crate) id: Option<ItemId>,
    pub(crate) input: ItemFormInput,
    pub(crate) field: ItemField,
    pub(crate) errors: FormErrors<ItemField>,
    pub(crate) submit_error: Option<String>,
}

impl ItemForm {
    pub(crate) fn new() -> Self {
        Self::with_input(None, ItemFormInput::default())
    }

    pub(crate) fn edit(item: &Item) -> Self {
        Self::with_input(Some(item.id.clone()), ItemFormInput::from_item(item))
    }

    fn with_input(id: Option<ItemId>, input: ItemFormInput) -> Self {
        Self {
            id,
            input,
            field: ItemField::Name,
            errors: FormErrors::default(),
            submit_error: None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        match (key.code, key.modifiers) {
            (KeyCode::Tab, _) => self.field = step_field(&ItemField::ALL, self.field, 1),
            (KeyCode::BackTab, _) => self.field = step_field(&ItemField::ALL, self.field, -1),
            (KeyCode::Char('s'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                return self.submit();
            }
            _ => match edit_text(self.input.field_mut(self.field), key) {
                TextEdit::Changed => {
                    self.errors.clear(self.field);
                }
                TextEdit::Enter => return self.submit(),
                TextEdit::Ignored => {}
            },
        }
        FormAction::Stay
    }

    fn submit(&mut self) -> FormAction {
        self.submit_error = None;
        match self.input.validate() {
            Ok(submission) => {
                self.errors = FormErrors::default();
                FormAction::Submit(FormPayload::Item {
                    id: self.id.clone(),
                    submission,
                })
            }
            Err(errors) => {
                self.errors = errors;
                FormAction::Stay
            }
        }
    }
}

#[derive(Debug)]
pub(crate) struct CustomerForm {
    pub(crate) id: Option<CustomerId>,
    pub(crate) input: CustomerFormInput,
    pub(crate) field: CustomerField,
    pub(crate) errors: FormErrors<CustomerField>,
    pub(crate) submit_error: Option<String>,
}

impl CustomerForm {
    pub(crate) fn new() -> Self {
        Self::with_input(None, CustomerFormInput::default())
    }

    pub(crate) fn edit(customer: &Customer) -> Self {
        Self::with_input(
            Some(customer.id.clone()),
            CustomerFormInput::from_customer(customer),
        )
    }

    fn with_input(id: Option<CustomerId>, input: CustomerFormInput) -> Self {
        Self {
            id,
            input,
            field: CustomerField::Name,
            errors: FormErrors::default(),
            submit_error: None,
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> FormAction {
        match (key.code, key.modifiers) {
            (KeyCode::Tab, _) => self.field = step_field(&CustomerField::ALL, self.field, 1),
            (KeyCode::BackTab, _) => {
                self.field = step_field(&CustomerField::ALL, self.field, -1);
            }
            (KeyCode::Char('s'), modifiers) if modifiers.contains(KeyModifiers::CONTROL) => {
                return self.submit();
            }
            _ => match edit_text(self.input.field_mut(self.field), key) {
                TextEdit::Changed => {
                    self.errors.clear(self.field);
                }
                TextEdit::Enter => return self.submit(),
                TextEdit::Ignored => {}
            },
        }
        FormAction::Stay
    }

    fn submit(&mut self) -> FormAction {
        self.submit_error = None;
        match self.input.validate() {
            Ok(submission) => {
                self.errors = FormErrors::default();
                FormAction::Submit(FormPayload::Customer {
                    id: self.id.clone(),
                    submission,
                })
            }
            Err(errors) => {
                self.errors = errors;
                FormAction::Stay
            }
        }
    }
}

fn step_field<F: Copy + PartialEq>(fields: &[F], current: F, delta: isize) -> F {
    let index = fields
        .iter()
        .position(|field| *field == current)
        .unwrap_or(0) as isize;
    let len = fields.len() as isize;
    fields[(index + delta).rem_euclid(len) as usize]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TextEdit {
    Changed,
    Enter,
    Ignored,
}

/// Single-line editing shared by every text input in the console.
pub(crate) fn edit_text(text: &mut String, key: KeyEvent) -> TextEdit {
    match key.code {
        KeyCode::Enter => TextEdit::Enter,
        KeyCode::Backspace => {
            if text.pop().is_some() {
                TextEdit::Changed
            } else {
                TextEdit::Ignored
            }
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            if text.is_empty() {
                TextEdit::Ignored
            } else {
                text.clear();
                TextEdit::Changed
            }
        }
        KeyCode::Char(ch)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            text.push(ch);
            TextEdit::Changed
        }
        _ => TextEdit::Ignored,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DROPDOWN_ROWS, FormAction, FormUi, ItemForm, SaleFocus, SaleForm, SaleFormLayout,
        TextEdit, dropdown_row, dropdown_window, edit_text,
    };
    use crate::render::dropdown_lines;
    use anyhow::{Result, anyhow};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::layout::Rect;
    use std::time::{Duration, Instant};
    use tally_app::{FieldError, FormPayload, Item, ItemField, ItemId, SaleField};
    use time::{Date, Month};

    const DELAY: Duration = Duration::from_millis(300);

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn item(id: &str, name: &str, stock: i64) -> Item {
        Item {
            id: ItemId::new(id),
            name: name.to_owned(),
            description: String::new(),
            stock_quantity: stock,
            unit_price_cents: 2_500,
        }
    }

    fn sale_form() -> Result<SaleForm> {
        Ok(SaleForm::new(
            Date::from_calendar_date(2026, Month::March, 1)?,
            DELAY,
        ))
    }

    fn searched(form: &mut SaleForm, term: &str, rows: Vec<Item>) -> Result<()> {
        let now = Instant::now();
        for ch in term.chars() {
            form.handle_key(key(KeyCode::Char(ch)), now);
        }
        let requests = form.draft.tick(now + DELAY);
        let Some(tally_query::SaleLookupRequest::Item(ticket)) = requests.into_iter().next()
        else {
            return Err(anyhow!("expected an item lookup"));
        };
        form.draft.complete_item(ticket, Ok(rows));
        Ok(())
    }

    #[test]
    fn text_editing_keys() {
        let mut text = "ab".to_owned();
        assert_eq!(edit_text(&mut text, key(KeyCode::Char('c'))), TextEdit::Changed);
        assert_eq!(edit_text(&mut text, key(KeyCode::Backspace)), TextEdit::Changed);
        assert_eq!(text, "ab");
        assert_eq!(
            edit_text(
                &mut text,
                KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL)
            ),
            TextEdit::Changed
        );
        assert!(text.is_empty());
        assert_eq!(edit_text(&mut text, key(KeyCode::Backspace)), TextEdit::Ignored);
        assert_eq!(edit_text(&mut text, key(KeyCode::Enter)), TextEdit::Enter);
    }

    #[test]
    fn focus_cycles_and_blurs_lookups() -> Result<()> {
        let mut form = sale_form()?;
        assert!(form.draft.item().is_focused());
        form.handle_key(key(KeyCode::Tab), Instant::now());
        assert_eq!(form.focus, SaleFocus::Quantity);
        assert!(!form.draft.item().is_focused());
        form.handle_key(key(KeyCode::BackTab), Instant::now());
        form.handle_key(key(KeyCode::BackTab), Instant::now());
        assert_eq!(form.focus, SaleFocus::Date);
        Ok(())
    }

    #[test]
    fn arrow_and_enter_pick_a_candidate() -> Result<()> {
        let mut form = sale_form()?;
        searched(
            &mut form,
            "oil",
            vec![item("i1", "Oil Filter", 4), item("i2", "Oil Pump", 2)],
        )?;
        assert!(form.draft.item().is_open());

        form.handle_key(key(KeyCode::Down), Instant::now());
        form.handle_key(key(KeyCode::Down), Instant::now());
        form.handle_key(key(KeyCode::Enter), Instant::now());
        assert_eq!(
            form.draft.item().selection().map(|item| item.name.as_str()),
            Some("Oil Pump")
        );
        assert!(!form.draft.item().is_open());
        Ok(())
    }

    #[test]
    fn enter_without_highlight_submits_and_reports_errors() -> Result<()> {
        let mut form = sale_form()?;
        let action = form.handle_key(key(KeyCode::Enter), Instant::now());
        assert!(matches!(action, FormAction::Stay));
        assert_eq!(form.draft.error(SaleField::Item), Some(FieldError::Required));
        assert_eq!(
            form.draft.error(SaleField::Customer),
            Some(FieldError::CustomerOrCash)
        );
        Ok(())
    }

    #[test]
    fn space_on_cash_toggles() -> Result<()> {
        let mut form = sale_form()?;
        form.move_focus(2);
        assert_eq!(form.focus, SaleFocus::Cash);
        form.handle_key(key(KeyCode::Char(' ')), Instant::now());
        assert!(form.draft.is_cash());
        form.handle_key(key(KeyCode::Char(' ')), Instant::now());
        assert!(!form.draft.is_cash());
        Ok(())
    }

    #[test]
    fn pointer_presses_follow_input_and_dropdown_regions() -> Result<()> {
        let area = Rect::new(0, 0, 100, 40);
        let mut form = sale_form()?;
        searched(&mut form, "oil", vec![item("i1", "Oil Filter", 4)])?;
        let layout = SaleFormLayout::compute(area, &form.draft);
        let dropdown = layout
            .item_dropdown
            .ok_or_else(|| anyhow!("dropdown should be laid out"))?;

        form.pointer_down(area, dropdown.x + 1, dropdown.y);
        assert!(form.draft.item().is_open(), "dropdown border is inside");

        form.pointer_down(area, 0, 0);
        assert!(!form.draft.item().is_open());

        form.pointer_down(area, layout.item.x + 1, layout.item.y + 1);
        assert!(form.draft.item().is_open(), "focusing the input re-opens");

        form.pointer_down(area, dropdown.x + 1, dropdown.y + 1);
        assert_eq!(
            form.draft.item().selection().map(|item| item.id.as_str()),
            Some("i1")
        );
        Ok(())
    }

    #[test]
    fn dropdown_rows_skip_the_border() {
        let dropdown = Rect::new(4, 10, 20, 4);
        assert_eq!(dropdown_row(dropdown, 10), None);
        assert_eq!(dropdown_row(dropdown, 11), Some(0));
        assert_eq!(dropdown_row(dropdown, 12), Some(1));
        assert_eq!(dropdown_row(dropdown, 13), None);
    }

    #[test]
    fn dropdown_window_follows_the_highlight() {
        assert_eq!(dropdown_window(3, None), 0..3);
        assert_eq!(dropdown_window(10, None), 0..DROPDOWN_ROWS);
        assert_eq!(dropdown_window(10, Some(5)), 0..6);
        assert_eq!(dropdown_window(10, Some(7)), 2..8);
        assert_eq!(dropdown_window(10, Some(9)), 4..10);
        assert_eq!(dropdown_window(4, Some(9)), 0..4);
    }

    #[test]
    fn highlighted_candidate_is_always_drawn_and_clickable() -> Result<()> {
        let area = Rect::new(0, 0, 100, 40);
        let mut form = sale_form()?;
        let rows = (0..10)
            .map(|n| item(&format!("i{n}"), &format!("part {n}"), 5))
            .collect();
        searched(&mut form, "part", rows)?;

        for _ in 0..8 {
            form.handle_key(key(KeyCode::Down), Instant::now());
        }
        assert_eq!(form.draft.item().highlighted(), Some(7));
        let lines = dropdown_lines(form.draft.item(), |item| item.name.clone());
        assert_eq!(lines.len(), DROPDOWN_ROWS);
        assert_eq!(lines.first().map(|(text, _)| text.as_str()), Some("part 2"));
        assert_eq!(
            lines.last().map(|(text, highlighted)| (text.as_str(), *highlighted)),
            Some(("part 7", true))
        );

        let layout = SaleFormLayout::compute(area, &form.draft);
        let dropdown = layout
            .item_dropdown
            .ok_or_else(|| anyhow!("dropdown should be laid out"))?;
        form.pointer_down(area, dropdown.x + 1, dropdown.y + 1);
        assert_eq!(
            form.draft.item().selection().map(|item| item.name.as_str()),
            Some("part 2")
        );
        Ok(())
    }

    #[test]
    fn leaving_a_lookup_drops_a_fragment_typed_over_the_selection() -> Result<()> {
        let mut form = sale_form()?;
        searched(&mut form, "oil", vec![item("i1", "Oil Filter", 4)])?;
        form.handle_key(key(KeyCode::Down), Instant::now());
        form.handle_key(key(KeyCode::Enter), Instant::now());
        for ch in "bra".chars() {
            form.handle_key(key(KeyCode::Char(ch)), Instant::now());
        }
        assert_eq!(form.draft.item().display_text(), "bra");

        form.handle_key(key(KeyCode::Tab), Instant::now());
        assert_eq!(form.draft.item().input(), "");
        assert_eq!(form.draft.item().display_text(), "Oil Filter");
        assert!(form.draft.tick(Instant::now() + DELAY * 2).is_empty());
        Ok(())
    }

    #[test]
    fn item_form_validates_before_submitting() {
        let mut form = FormUi::Item(ItemForm::new());
        let action = form.handle_key(key(KeyCode::Enter), Instant::now());
        assert!(matches!(action, FormAction::Stay));
        let FormUi::Item(inner) = &mut form else {
            unreachable!("item form");
        };
        assert_eq!(inner.errors.get(ItemField::Name), Some(FieldError::Required));

        inner.input.name = "Spark Plug".to_owned();
        inner.input.description = "Iridium".to_owned();
        inner.input.quantity = "12".to_owned();
        inner.input.price = "180".to_owned();
        let action = form.handle_key(
            KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL),
            Instant::now(),
        );
        let FormAction::Submit(FormPayload::Item { id, submission }) = action else {
            panic!("expected an item submission");
        };
        assert_eq!(id, None);
        assert_eq!(submission.unit_price_cents, 18_000);
    }

    #[test]
    fn typing_clears_that_fields_error() {
        let mut form = ItemForm::new();
        form.handle_key(key(KeyCode::Enter));
        assert!(form.errors.contains(ItemField::Name));
        form.handle_key(key(KeyCode::Char('x')));
        assert!(!form.errors.contains(ItemField::Name));
        assert!(form.errors.contains(ItemField::Price));
    }
}
