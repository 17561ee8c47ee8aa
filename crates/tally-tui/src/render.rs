// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::time::Instant;
use tally_app::{
    AppMode, AppState, CustomerField, Entity, FormErrors, ItemField, LOW_STOCK_THRESHOLD,
    PageMarker, QueryState, RECOMPUTED_MARK, ReportKind, ResultPage, SaleField, TabKind, format_count, format_date,
    format_money, page_window, resolve_sale_total, sale_customer_label, sale_item_name,
};
use tally_query::{DropdownState, ListController, LocationStore, LookupController};

use crate::{DashboardView, ViewData};
use crate::form::{CustomerForm, FormUi, ItemForm, SaleFocus, SaleForm, SaleFormLayout};

pub(crate) fn render(
    frame: &mut ratatui::Frame<'_>,
    state: &AppState,
    view_data: &ViewData,
    now: Instant,
) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let selected = TabKind::ALL
        .iter()
        .position(|tab| *tab == state.active_tab)
        .unwrap_or(0);
    let tabs = Tabs::new(TabKind::ALL.iter().map(|tab| tab.label()).collect::<Vec<_>>())
        .block(Block::default().title("tally").borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    let location_style = if state.mode == AppMode::Location {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    frame.render_widget(
        Paragraph::new(location_text(state, view_data)).style(location_style),
        layout[1],
    );

    match state.active_tab {
        TabKind::Items => render_list(frame, layout[2], state, &view_data.items, view_data, now),
        TabKind::Customers => {
            render_list(frame, layout[2], state, &view_data.customers, view_data, now);
        }
        TabKind::Sales => render_list(frame, layout[2], state, &view_data.sales, view_data, now),
        TabKind::Reports => render_report(frame, layout[2], state, view_data),
    }

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status_widget, layout[3]);

    match &view_data.form {
        Some(FormUi::Sale(form)) => render_sale_form(frame, form, view_data.submitting),
        Some(FormUi::Item(form)) => {
            render_plain_form(frame, item_form_title(form), item_form_lines(form));
        }
        Some(FormUi::Customer(form)) => {
            render_plain_form(frame, customer_form_title(form), customer_form_lines(form));
        }
        None => {}
    }

    if view_data.dashboard.visible {
        let area = crate::centered_rect(70, 70, frame.area());
        frame.render_widget(Clear, area);
        let dashboard = Paragraph::new(dashboard_overlay_text(&view_data.dashboard))
            .block(Block::default().title("dashboard").borders(Borders::ALL));
        frame.render_widget(dashboard, area);
    }

    if view_data.help_visible {
        let area = crate::centered_rect(76, 70, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn location_text(state: &AppState, view_data: &ViewData) -> String {
    if state.mode == AppMode::Location {
        format!(" go to: {}_", view_data.location_input)
    } else {
        format!(" {}", view_data.location.href())
    }
}

/// Column headers and cell text for one list tab. Sales resolve their item
/// and customer through whatever records the console has seen.
pub(crate) trait ListRows {
    fn columns() -> &'static [&'static str];
    fn cells(&self, view_data: &ViewData) -> Vec<String>;
}

impl ListRows for tally_app::Item {
    fn columns() -> &'static [&'static str] {
        &["name", "description", "stock", "price"]
    }

    fn cells(&self, _view_data: &ViewData) -> Vec<String> {
        vec![
            self.name.clone(),
            self.description.clone(),
            format_count(self.stock_quantity),
            format_money(self.unit_price_cents),
        ]
    }
}

impl ListRows for tally_app::Customer {
    fn columns() -> &'static [&'static str] {
        &["name", "address", "mobile"]
    }

    fn cells(&self, _view_data: &ViewData) -> Vec<String> {
        vec![
            self.name.clone(),
            self.address.clone(),
            self.mobile_number.clone(),
        ]
    }
}

impl ListRows for tally_app::Sale {
    fn columns() -> &'static [&'static str] {
        &["date", "item", "qty", "customer", "total"]
    }

    fn cells(&self, view_data: &ViewData) -> Vec<String> {
        vec![
            format_date(self.date),
            sale_item_name(self, &view_data.known_items),
            format_count(self.quantity),
            sale_customer_label(self, &view_data.known_customers),
            resolve_sale_total(self, &view_data.known_items).display(),
        ]
    }
}

fn render_list<T: ListRows>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    list: &ListController<T, LocationStore>,
    view_data: &ViewData,
    now: Instant,
) {
    let banner = list_banner(list);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(u16::from(banner.is_some())),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    let searching = state.mode == AppMode::Search;
    let search_style = if searching {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    frame.render_widget(
        Paragraph::new(search_line_text(list, searching, now)).style(search_style),
        layout[0],
    );

    if let Some(banner) = banner {
        frame.render_widget(
            Paragraph::new(banner).style(Style::default().fg(Color::White).bg(Color::Red)),
            layout[1],
        );
    }

    let header = Row::new(T::columns().iter().map(|column| {
        Cell::from(*column).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let cursor = crate::selected_row(view_data, state.active_tab).unwrap_or(0);
    let rows = list.rows().iter().enumerate().map(|(index, row)| {
        let style = if index == cursor {
            Style::default().bg(Color::DarkGray)
        } else {
            Style::default()
        };
        Row::new(row.cells(view_data)).style(style)
    });
    let widths = vec![Constraint::Min(8); T::columns().len()];
    let title = if list.rows().is_empty() && !list.is_loading() && list.error().is_none() {
        format!("{} (no results)", state.active_tab.label())
    } else {
        state.active_tab.label().to_owned()
    };
    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, layout[2]);

    frame.render_widget(
        Paragraph::new(pager_text(list.page(), list.query())),
        layout[3],
    );
}

pub(crate) fn search_line_text<T, S: tally_query::QueryStore>(
    list: &ListController<T, S>,
    searching: bool,
    now: Instant,
) -> String {
    let cursor = if searching { "_" } else { "" };
    let mut text = format!(" search: {}{cursor}", list.input());
    if list.remaining_debounce(now).is_some() {
        text.push_str("  (typing)");
    } else if list.is_loading() {
        text.push_str("  loading...");
    }
    text
}

/// A fetch error outranks an action message.
pub(crate) fn list_banner<T, S: tally_query::QueryStore>(
    list: &ListController<T, S>,
) -> Option<String> {
    list.error()
        .map(|error| format!(" failed to load: {error}"))
        .or_else(|| list.message().map(|message| format!(" {message}")))
}

pub(crate) fn pager_text<T>(page: Option<&ResultPage<T>>, query: &QueryState) -> String {
    let per_page = format!("{} per page", query.page_size());
    let Some(page) = page else {
        return format!(" page {} | {per_page}", query.page());
    };
    let (first, last) = page.showing_range();
    let strip = page_window(page.page, page.total_pages)
        .into_iter()
        .map(|marker| match marker {
            PageMarker::Page(number) if number == page.page => format!("[{number}]"),
            PageMarker::Page(number) => number.to_string(),
            PageMarker::Gap => "…".to_owned(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    let prev = if page.has_prev() { "‹" } else { " " };
    let next = if page.has_next() { "›" } else { " " };
    format!(
        " showing {first} to {last} of {} | {prev} {strip} {next} | {per_page}",
        page.total
    )
}

fn render_report(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let report = &view_data.report;
    let title = report_title(state, view_data);
    let block = Block::default().title(title).borders(Borders::ALL);

    let Some(table) = &report.table else {
        let text = if report.loading {
            "loading...".to_owned()
        } else if let Some(error) = &report.error {
            format!("failed to load report: {error}")
        } else if state.report == ReportKind::CustomerLedger && report.request.is_none() {
            "pick a customer on the customers tab and press l".to_owned()
        } else {
            String::new()
        };
        frame.render_widget(Paragraph::new(text).block(block), area);
        return;
    };

    if table.is_empty() {
        frame.render_widget(Paragraph::new("nothing to report").block(block), area);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(1),
            Constraint::Length(u16::from(table.has_recomputed_totals)),
        ])
        .split(area);

    let header = Row::new(table.columns.iter().map(|column| {
        Cell::from(*column).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let mut rows = table
        .rows
        .iter()
        .map(|row| Row::new(row.clone()))
        .collect::<Vec<_>>();
    if let Some(footer) = &table.footer {
        rows.push(Row::new(footer.clone()).style(Style::default().add_modifier(Modifier::BOLD)));
    }
    let widths = vec![Constraint::Min(8); table.columns.len()];
    frame.render_widget(
        Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .block(block),
        layout[0],
    );

    if table.has_recomputed_totals {
        frame.render_widget(
            Paragraph::new(recomputed_note()).style(Style::default().fg(Color::DarkGray)),
            layout[1],
        );
    }
}

fn report_title(state: &AppState, view_data: &ViewData) -> String {
    let picker = ReportKind::ALL
        .iter()
        .map(|kind| {
            if *kind == state.report {
                format!("[{}]", kind.label())
            } else {
                kind.label().to_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ");
    match (&view_data.report.table, state.report) {
        (Some(table), _) => format!("{} | {picker}", table.title),
        (None, ReportKind::CustomerLedger) => match &view_data.ledger_customer {
            Some((_, name)) => format!("ledger: {name} | {picker}"),
            None => picker,
        },
        (None, _) => picker,
    }
}

fn recomputed_note() -> String {
    format!(" {RECOMPUTED_MARK} total recomputed from the current item price")
}

fn render_sale_form(frame: &mut ratatui::Frame<'_>, form: &SaleForm, submitting: bool) {
    let layout = SaleFormLayout::compute(frame.area(), &form.draft);
    let draft = &form.draft;
    let title = if draft.editing().is_some() {
        "edit sale"
    } else {
        "new sale"
    };
    frame.render_widget(Clear, layout.outer);
    frame.render_widget(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::White)),
        layout.outer,
    );

    let cash_text = if draft.is_cash() { "[x] cash" } else { "[ ] cash" };
    let fields = [
        (SaleFocus::Item, layout.item, lookup_input_text(draft.item()), Some(SaleField::Item)),
        (
            SaleFocus::Quantity,
            layout.quantity,
            draft.quantity().to_owned(),
            Some(SaleField::Quantity),
        ),
        (SaleFocus::Cash, layout.cash, cash_text.to_owned(), None),
        (
            SaleFocus::Customer,
            layout.customer,
            customer_input_text(form),
            Some(SaleField::Customer),
        ),
        (SaleFocus::Date, layout.date, draft.date().to_owned(), Some(SaleField::Date)),
    ];
    for (focus, area, text, field) in fields {
        let error = field.and_then(|field| draft.error(field));
        let focused = form.focus == focus;
        let title = match error {
            Some(error) => format!("{}: {error}", focus.label()),
            None => focus.label().to_owned(),
        };
        let border = match (error.is_some(), focused) {
            (true, _) => Style::default().fg(Color::Red),
            (false, true) => Style::default().fg(Color::Cyan),
            (false, false) => Style::default().fg(Color::DarkGray),
        };
        let cursor = if focused && focus != SaleFocus::Cash { "_" } else { "" };
        frame.render_widget(
            Paragraph::new(format!("{text}{cursor}")).block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(border),
            ),
            area,
        );
    }

    frame.render_widget(
        Paragraph::new(sale_summary_lines(form, submitting).join("\n")),
        layout.summary,
    );

    if let Some(area) = layout.item_dropdown {
        render_dropdown(frame, area, draft.item(), |item| {
            format!(
                "{} | {} in stock | {}",
                item.name,
                format_count(item.stock_quantity),
                format_money(item.unit_price_cents)
            )
        });
    }
    if let Some(area) = layout.customer_dropdown {
        render_dropdown(frame, area, draft.customer(), |customer| {
            format!("{} | {}", customer.name, customer.mobile_number)
        });
    }
}

fn lookup_input_text<T: Entity>(lookup: &LookupController<T>) -> String {
    let mut text = lookup.display_text().to_owned();
    if lookup.is_loading() {
        text.push_str("  searching...");
    } else if let Some(error) = lookup.error() {
        text.push_str(&format!("  ({error})"));
    }
    text
}

fn customer_input_text(form: &SaleForm) -> String {
    if form.draft.is_cash() && form.draft.customer().display_text().is_empty() {
        return "cash sale, no customer".to_owned();
    }
    lookup_input_text(form.draft.customer())
}

pub(crate) fn sale_summary_lines(form: &SaleForm, submitting: bool) -> Vec<String> {
    let draft = &form.draft;
    let mut lines = Vec::new();
    match draft.item().selection() {
        Some(item) => {
            lines.push(format!(
                "{} at {} | {} in stock",
                item.name,
                format_money(item.unit_price_cents),
                format_count(item.stock_quantity)
            ));
            lines.push(format!("total: {}", format_money(draft.total_cents())));
        }
        None => lines.push("total: -".to_owned()),
    }
    if let Some(error) = draft.submit_error() {
        lines.push(format!("not saved: {error}"));
    }
    if submitting {
        lines.push("saving...".to_owned());
    }
    lines.push(String::new());
    lines.push(
        "tab/shift+tab field | up/down pick | enter choose or save | ctrl+s save | esc cancel"
            .to_owned(),
    );
    lines
}

pub(crate) fn dropdown_lines<T: Entity>(
    lookup: &LookupController<T>,
    describe: impl Fn(&T) -> String,
) -> Vec<(String, bool)> {
    match lookup.state() {
        DropdownState::Closed => Vec::new(),
        DropdownState::OpenEmpty => vec![(
            format!("no results for \"{}\"", lookup.query().term()),
            false,
        )],
        DropdownState::OpenWithResults => {
            let candidates = lookup.candidates();
            let window = crate::form::dropdown_window(candidates.len(), lookup.highlighted());
            candidates[window.clone()]
                .iter()
                .zip(window)
                .map(|(candidate, index)| {
                    (describe(candidate), lookup.highlighted() == Some(index))
                })
                .collect()
        }
    }
}

fn render_dropdown<T: Entity>(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    lookup: &LookupController<T>,
    describe: impl Fn(&T) -> String,
) {
    let lines = dropdown_lines(lookup, describe)
        .into_iter()
        .map(|(text, highlighted)| {
            let style = if highlighted {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::styled(text, style)
        })
        .collect::<Vec<_>>();
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        ),
        area,
    );
}

fn render_plain_form(frame: &mut ratatui::Frame<'_>, title: &str, lines: Vec<String>) {
    let area = crate::centered_rect(60, 50, frame.area());
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines.join("\n"))
            .block(Block::default().title(title.to_owned()).borders(Borders::ALL)),
        area,
    );
}

fn item_form_title(form: &ItemForm) -> &'static str {
    match form.id {
        Some(_) => "edit item",
        None => "new item",
    }
}

fn customer_form_title(form: &CustomerForm) -> &'static str {
    match form.id {
        Some(_) => "edit customer",
        None => "new customer",
    }
}

fn field_line<F: Copy + Ord>(
    label: &str,
    value: &str,
    focused: bool,
    errors: &FormErrors<F>,
    field: F,
) -> String {
    let marker = if focused { ">" } else { " " };
    let cursor = if focused { "_" } else { "" };
    match errors.get(field) {
        Some(error) => format!("{marker} {label}: {value}{cursor}  ! {error}"),
        None => format!("{marker} {label}: {value}{cursor}"),
    }
}

pub(crate) fn item_form_lines(form: &ItemForm) -> Vec<String> {
    let mut lines = ItemField::ALL
        .iter()
        .map(|field| {
            field_line(
                field.label(),
                form.input.field(*field),
                form.field == *field,
                &form.errors,
                *field,
            )
        })
        .collect::<Vec<_>>();
    push_form_footer(&mut lines, form.submit_error.as_deref());
    lines
}

pub(crate) fn customer_form_lines(form: &CustomerForm) -> Vec<String> {
    let mut lines = CustomerField::ALL
        .iter()
        .map(|field| {
            field_line(
                field.label(),
                form.input.field(*field),
                form.field == *field,
                &form.errors,
                *field,
            )
        })
        .collect::<Vec<_>>();
    push_form_footer(&mut lines, form.submit_error.as_deref());
    lines
}

fn push_form_footer(lines: &mut Vec<String>, submit_error: Option<&str>) {
    if let Some(error) = submit_error {
        lines.push(String::new());
        lines.push(format!("not saved: {error}"));
    }
    lines.push(String::new());
    lines.push("tab/shift+tab field | enter or ctrl+s save | esc cancel".to_owned());
}

pub(crate) fn dashboard_overlay_text(dashboard: &DashboardView) -> String {
    let mut lines = Vec::new();
    if dashboard.loading {
        lines.push("loading...".to_owned());
    } else if let Some(error) = &dashboard.error {
        lines.push(format!("dashboard failed: {error}"));
    }
    if let Some(snapshot) = &dashboard.snapshot {
        lines.push(format!(
            "items: {} | customers: {} | sales: {} | revenue: {}",
            snapshot.total_items,
            snapshot.total_customers,
            snapshot.total_sales,
            snapshot.revenue_display()
        ));
        lines.push(String::new());
        lines.push(format!("low stock (under {LOW_STOCK_THRESHOLD})"));
        if snapshot.low_stock.is_empty() {
            lines.push("  no items with low stock".to_owned());
        }
        for item in &snapshot.low_stock {
            lines.push(format!("  {} | qty {}", item.name, format_count(item.stock_quantity)));
        }
        lines.push(String::new());
        lines.push("recent sales".to_owned());
        if snapshot.recent_sales.is_empty() {
            lines.push("  no recent sales".to_owned());
        }
        for sale in &snapshot.recent_sales {
            lines.push(format!(
                "  {} | {} | qty {} | {}",
                format_date(sale.date),
                sale.item_name,
                format_count(sale.quantity),
                sale.total.display()
            ));
        }
        if snapshot.has_recomputed_revenue {
            lines.push(String::new());
            lines.push(recomputed_note());
        }
    }
    lines.push(String::new());
    lines.push("r reload | D or esc close".to_owned());
    lines.join("\n")
}

pub(crate) fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if view_data.help_visible {
        return String::new();
    }

    let mode = match state.mode {
        AppMode::Nav => "NAV",
        AppMode::Search => "SEARCH",
        AppMode::Location => "GO",
        AppMode::Form(_) => "FORM",
    };
    let hints = match state.mode {
        AppMode::Nav if state.active_tab == TabKind::Reports => {
            "tab tabs | c report | m email | n sale | r reload | g go | D dash | ? help | ctrl+q"
        }
        AppMode::Nav => {
            "tab tabs | / search | j/k rows | [/] page | +/- size | n new | e edit | d del | g go | D dash | ? help | ctrl+q"
        }
        AppMode::Search => "type to search | enter done | esc nav",
        AppMode::Location => "type a path like /sales?q=oil | enter go | esc cancel",
        AppMode::Form(_) => "esc cancel",
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints}"),
        None => format!("{mode} | {hints}"),
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | ? help | D dashboard\n\
tabs: tab/shift+tab switch | g go to location | < back\n\
lists: / search | j/k or up/down rows | [/] page | +/- page size | r reload\n\
lists: n new | e edit | d twice delete | l ledger (customers)\n\
reports: c cycle report | m email sales report | r reload | n new sale\n\
sale form: tab field | type to search | up/down pick | enter choose | space cash | ctrl+s save\n\
forms: esc cancel"
}
