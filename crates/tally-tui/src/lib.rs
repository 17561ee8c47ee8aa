// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod form;
mod render;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyModifiers,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use std::collections::HashMap;
use std::hash::Hash;
use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tally_app::{
    AppCommand, AppEvent, AppMode, AppState, Customer, CustomerId, DashboardSnapshot, Entity,
    FormKind, FormPayload, Item, ItemId, LookupSource, PageSize, PageSource, ReportKind, ReportTable, ResultPage, Sale, SaleId,
    TabKind,
};
use tally_query::{
    DEFAULT_DEBOUNCE, ListController, LocationHandle, LocationStore, RequestTicket,
    SaleLookupRequest, href_for,
};
use time::{Date, OffsetDateTime};
use tracing::{debug, info, warn};

use form::{CustomerForm, FormAction, FormUi, ItemForm, SaleForm, TextEdit, edit_text};

const POLL_INTERVAL: Duration = Duration::from_millis(120);
const STATUS_TTL: Duration = Duration::from_secs(4);

/// A row the console can ask the backend to delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowTarget {
    Item(ItemId),
    Customer(CustomerId),
    Sale(SaleId),
}

impl RowTarget {
    pub const fn noun(&self) -> &'static str {
        match self {
            Self::Item(_) => "item",
            Self::Customer(_) => "customer",
            Self::Sale(_) => "sale",
        }
    }

    const fn tab(&self) -> TabKind {
        match self {
            Self::Item(_) => TabKind::Items,
            Self::Customer(_) => TabKind::Customers,
            Self::Sale(_) => TabKind::Sales,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportRequest {
    Sales,
    Items,
    CustomerLedger { id: CustomerId, name: String },
}

impl ReportRequest {
    pub const fn kind(&self) -> ReportKind {
        match self {
            Self::Sales => ReportKind::Sales,
            Self::Items => ReportKind::Items,
            Self::CustomerLedger { .. } => ReportKind::CustomerLedger,
        }
    }
}

/// Backend operations the console needs. Every call blocks; the console runs
/// them on worker threads, so implementations must be shareable.
pub trait AppRuntime:
    PageSource<Item>
    + PageSource<Customer>
    + PageSource<Sale>
    + LookupSource<Item>
    + LookupSource<Customer>
{
    fn submit_form(&self, payload: &FormPayload) -> Result<()>;
    fn delete_row(&self, target: &RowTarget) -> Result<()>;
    fn load_report(&self, request: &ReportRequest) -> Result<ReportTable>;
    fn load_dashboard(&self) -> Result<DashboardSnapshot>;
    fn email_sales_report(&self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleOptions {
    pub debounce: Duration,
    pub page_size: PageSize,
    /// Where the console opens, e.g. `/sales?q=oil&page=2&limit=20`.
    pub location: String,
}

impl Default for ConsoleOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            page_size: PageSize::default(),
            location: TabKind::Items.path().to_owned(),
        }
    }
}

#[derive(Debug)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    Page(PageLoaded),
    /// Lookup results for the form opened as generation `form`.
    Candidates {
        form: u64,
        loaded: CandidatesLoaded,
    },
    Submitted {
        form: u64,
        kind: FormKind,
        result: Result<()>,
    },
    Deleted {
        target: RowTarget,
        result: Result<()>,
    },
    Report {
        request_id: u64,
        result: Result<ReportTable>,
    },
    Dashboard {
        request_id: u64,
        result: Result<DashboardSnapshot>,
    },
    Emailed {
        result: Result<()>,
    },
}

#[derive(Debug)]
pub enum PageLoaded {
    Items(RequestTicket, Result<ResultPage<Item>>),
    Customers(RequestTicket, Result<ResultPage<Customer>>),
    Sales(RequestTicket, Result<ResultPage<Sale>>),
}

#[derive(Debug)]
pub enum CandidatesLoaded {
    Items(RequestTicket, Result<Vec<Item>>),
    Customers(RequestTicket, Result<Vec<Customer>>),
}

#[derive(Debug, Default)]
struct ReportView {
    request: Option<ReportRequest>,
    request_id: u64,
    loading: bool,
    table: Option<ReportTable>,
    error: Option<String>,
}

/// Overlay toggled from any list or report; reloaded each time it opens.
#[derive(Debug, Default)]
struct DashboardView {
    visible: bool,
    request_id: u64,
    loading: bool,
    snapshot: Option<DashboardSnapshot>,
    error: Option<String>,
}

#[derive(Debug)]
struct ViewData {
    options: ConsoleOptions,
    location: LocationHandle,
    location_input: String,
    items: ListController<Item, LocationStore>,
    customers: ListController<Customer, LocationStore>,
    sales: ListController<Sale, LocationStore>,
    selected_rows: [usize; 3],
    form: Option<FormUi>,
    form_generation: u64,
    submitting: bool,
    deleting: bool,
    pending_delete: Option<RowTarget>,
    report: ReportView,
    dashboard: DashboardView,
    emailing: bool,
    ledger_customer: Option<(CustomerId, String)>,
    known_items: HashMap<ItemId, Item>,
    known_customers: HashMap<CustomerId, Customer>,
    help_visible: bool,
    status_token: u64,
    area: Rect,
}

impl ViewData {
    fn new(options: ConsoleOptions) -> Self {
        let location = LocationHandle::new(tally_query::Location::parse(&options.location));
        Self {
            items: mount_list(&location, TabKind::Items, &options),
            customers: mount_list(&location, TabKind::Customers, &options),
            sales: mount_list(&location, TabKind::Sales, &options),
            location_input: String::new(),
            location,
            options,
            selected_rows: [0; 3],
            form: None,
            form_generation: 0,
            submitting: false,
            deleting: false,
            pending_delete: None,
            report: ReportView::default(),
            dashboard: DashboardView::default(),
            emailing: false,
            ledger_customer: None,
            known_items: HashMap::new(),
            known_customers: HashMap::new(),
            help_visible: false,
            status_token: 0,
            area: Rect::new(0, 0, 100, 30),
        }
    }

    fn busy(&self) -> bool {
        let lookups = match &self.form {
            Some(FormUi::Sale(form)) => {
                form.draft.item().is_loading() || form.draft.customer().is_loading()
            }
            _ => false,
        };
        self.items.is_loading()
            || self.customers.is_loading()
            || self.sales.is_loading()
            || lookups
            || self.submitting
            || self.deleting
            || self.report.loading
            || self.dashboard.loading
            || self.emailing
    }
}

/// Runs `$body` against the list controller for `$tab`, binding it as
/// `$list`. Evaluates to `None` on the reports tab.
macro_rules! on_list {
    ($view:expr, $tab:expr, |$list:ident| $body:expr) => {
        match $tab {
            TabKind::Items => {
                let $list = &mut $view.items;
                Some($body)
            }
            TabKind::Customers => {
                let $list = &mut $view.customers;
                Some($body)
            }
            TabKind::Sales => {
                let $list = &mut $view.sales;
                Some($body)
            }
            TabKind::Reports => None,
        }
    };
}

/// Mounts a list on the shared location. The configured page size applies
/// unless the starting location names its own `limit`.
fn mount_list<T>(
    location: &LocationHandle,
    tab: TabKind,
    options: &ConsoleOptions,
) -> ListController<T, LocationStore> {
    let mut list = ListController::new(
        LocationStore::mount(location.clone(), tab.path()),
        options.debounce,
    );
    let snapshot = location.snapshot();
    let bookmarked = snapshot.path() == tab.path() && snapshot.get("limit").is_some();
    if !bookmarked && options.page_size != PageSize::default() {
        list.set_page_size(options.page_size);
        list.teardown();
    }
    list
}

const fn list_slot(tab: TabKind) -> Option<usize> {
    match tab {
        TabKind::Items => Some(0),
        TabKind::Customers => Some(1),
        TabKind::Sales => Some(2),
        TabKind::Reports => None,
    }
}

pub fn run_app<R: AppRuntime + 'static>(
    state: &mut AppState,
    runtime: Arc<R>,
    options: ConsoleOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
        .context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::new(options);
    let (internal_tx, internal_rx) = mpsc::channel();
    follow_location(state, &runtime, &mut view_data, &internal_tx);

    let mut result = Ok(());
    loop {
        process_internal_events(state, &runtime, &mut view_data, &internal_tx, &internal_rx);
        let now = Instant::now();
        tick_controllers(state, &runtime, &mut view_data, &internal_tx, now);

        let mut area = view_data.area;
        if let Err(error) = terminal.draw(|frame| {
            area = frame.area();
            render::render(frame, state, &view_data, now);
        }) {
            result = Err(error).context("draw frame");
            break;
        }
        view_data.area = area;

        let has_event = match event::poll(poll_timeout(&view_data, now)) {
            Ok(has_event) => has_event,
            Err(error) => {
                result = Err(error).context("poll event");
                break;
            }
        };
        if !has_event {
            continue;
        }
        match event::read() {
            Ok(Event::Key(key)) => {
                if handle_key_event(
                    state,
                    &runtime,
                    &mut view_data,
                    &internal_tx,
                    key,
                    Instant::now(),
                ) {
                    break;
                }
            }
            Ok(Event::Mouse(mouse)) => handle_mouse_event(state, &mut view_data, mouse),
            Ok(_) => {}
            Err(error) => {
                result = Err(error).context("read event");
                break;
            }
        }
    }

    if let Some(form) = view_data.form.as_mut() {
        form.teardown();
    }
    disable_raw_mode().context("disable raw mode")?;
    execute!(
        io::stdout(),
        DisableMouseCapture,
        terminal::LeaveAlternateScreen
    )
    .context("leave alternate screen")?;
    result
}

/// Sleeps no longer than the nearest debounce deadline.
fn poll_timeout(view_data: &ViewData, now: Instant) -> Duration {
    let lookups = match &view_data.form {
        Some(FormUi::Sale(form)) => form.draft.remaining_debounce(now),
        _ => None,
    };
    [
        view_data.items.remaining_debounce(now),
        view_data.customers.remaining_debounce(now),
        view_data.sales.remaining_debounce(now),
        lookups,
    ]
    .into_iter()
    .flatten()
    .min()
    .map_or(POLL_INTERVAL, |remaining| remaining.min(POLL_INTERVAL))
}

fn spawn_job<R, F>(runtime: &Arc<R>, tx: &Sender<InternalEvent>, job: F)
where
    R: AppRuntime + 'static,
    F: FnOnce(&R) -> InternalEvent + Send + 'static,
{
    let runtime = Arc::clone(runtime);
    let tx = tx.clone();
    thread::spawn(move || {
        if tx.send(job(runtime.as_ref())).is_err() {
            debug!("console closed before a background job finished");
        }
    });
}

fn spawn_page_fetch<R: AppRuntime + 'static>(
    runtime: &Arc<R>,
    tx: &Sender<InternalEvent>,
    tab: TabKind,
    ticket: RequestTicket,
) {
    debug!(tab = tab.as_str(), sequence = ticket.sequence(), "fetch page");
    spawn_job(runtime, tx, move |runtime| {
        let loaded = match tab {
            TabKind::Customers => {
                let result = PageSource::<Customer>::fetch_page(runtime, ticket.query());
                PageLoaded::Customers(ticket, result)
            }
            TabKind::Sales => {
                let result = PageSource::<Sale>::fetch_page(runtime, ticket.query());
                PageLoaded::Sales(ticket, result)
            }
            TabKind::Items | TabKind::Reports => {
                let result = PageSource::<Item>::fetch_page(runtime, ticket.query());
                PageLoaded::Items(ticket, result)
            }
        };
        InternalEvent::Page(loaded)
    });
}

fn spawn_lookup<R: AppRuntime + 'static>(
    runtime: &Arc<R>,
    tx: &Sender<InternalEvent>,
    form: u64,
    request: SaleLookupRequest,
) {
    spawn_job(runtime, tx, move |runtime| {
        let loaded = match request {
            SaleLookupRequest::Item(ticket) => {
                let result = LookupSource::<Item>::candidates(runtime, ticket.query().term());
                CandidatesLoaded::Items(ticket, result)
            }
            SaleLookupRequest::Customer(ticket) => {
                let result = LookupSource::<Customer>::candidates(runtime, ticket.query().term());
                CandidatesLoaded::Customers(ticket, result)
            }
        };
        InternalEvent::Candidates { form, loaded }
    });
}

fn fetch_if_issued<R: AppRuntime + 'static>(
    runtime: &Arc<R>,
    tx: &Sender<InternalEvent>,
    tab: TabKind,
    ticket: Option<RequestTicket>,
) {
    if let Some(ticket) = ticket {
        spawn_page_fetch(runtime, tx, tab, ticket);
    }
}

fn tick_controllers<R: AppRuntime + 'static>(
    state: &AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    now: Instant,
) {
    let tab = state.active_tab;
    let ticket = on_list!(view_data, tab, |list| list.tick(now)).flatten();
    fetch_if_issued(runtime, tx, tab, ticket);

    let generation = view_data.form_generation;
    if let Some(FormUi::Sale(form)) = &mut view_data.form {
        for request in form.draft.tick(now) {
            spawn_lookup(runtime, tx, generation, request);
        }
    }
}

fn process_internal_events<R: AppRuntime + 'static>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        handle_internal_event(state, runtime, view_data, tx, event);
    }
}

fn handle_internal_event<R: AppRuntime + 'static>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    event: InternalEvent,
) {
    match event {
        InternalEvent::ClearStatus { token } if token == view_data.status_token => {
            state.dispatch(AppCommand::ClearStatus);
        }
        InternalEvent::ClearStatus { .. } => {}
        InternalEvent::Page(loaded) => {
            let tab = match loaded {
                PageLoaded::Items(ticket, result) => {
                    if let Ok(page) = &result {
                        remember(&mut view_data.known_items, &page.rows);
                    }
                    view_data.items.complete(ticket, result);
                    TabKind::Items
                }
                PageLoaded::Customers(ticket, result) => {
                    if let Ok(page) = &result {
                        remember(&mut view_data.known_customers, &page.rows);
                    }
                    view_data.customers.complete(ticket, result);
                    TabKind::Customers
                }
                PageLoaded::Sales(ticket, result) => {
                    view_data.sales.complete(ticket, result);
                    TabKind::Sales
                }
            };
            clamp_cursor(view_data, tab);
        }
        InternalEvent::Candidates { form, loaded } => {
            if form != view_data.form_generation {
                debug!(form, "lookup result for a closed form");
                return;
            }
            let Some(FormUi::Sale(sale_form)) = &mut view_data.form else {
                return;
            };
            match loaded {
                CandidatesLoaded::Items(ticket, result) => {
                    if let Ok(rows) = &result {
                        remember(&mut view_data.known_items, rows);
                    }
                    sale_form.draft.complete_item(ticket, result);
                }
                CandidatesLoaded::Customers(ticket, result) => {
                    if let Ok(rows) = &result {
                        remember(&mut view_data.known_customers, rows);
                    }
                    sale_form.draft.complete_customer(ticket, result);
                }
            }
        }
        InternalEvent::Submitted { form, kind, result } => {
            view_data.submitting = false;
            match result {
                Ok(()) => {
                    if form == view_data.form_generation {
                        close_form(state, view_data);
                    }
                    emit_status(state, view_data, tx, format!("{} saved", kind.label()));
                    refresh_active(state, runtime, view_data, tx);
                }
                Err(error) => {
                    let detail = format!("{error:#}");
                    warn!(kind = kind.label(), error = %detail, "save failed");
                    let current = form == view_data.form_generation;
                    match view_data.form.as_mut().filter(|_| current) {
                        Some(open) => open.record_submit_failure(&error),
                        None => {
                            let message = format!("{} not saved: {detail}", kind.label());
                            emit_status(state, view_data, tx, message);
                        }
                    }
                }
            }
        }
        InternalEvent::Deleted { target, result } => {
            view_data.deleting = false;
            match result {
                Ok(()) => {
                    emit_status(state, view_data, tx, format!("{} deleted", target.noun()));
                    refresh_active(state, runtime, view_data, tx);
                }
                Err(error) => {
                    let message = format!("delete failed: {error:#}");
                    warn!(noun = target.noun(), error = %message, "row not deleted");
                    on_list!(view_data, target.tab(), |list| list.record_failure(message));
                }
            }
        }
        InternalEvent::Report { request_id, result } => {
            if request_id != view_data.report.request_id {
                debug!(request_id, "stale report discarded");
                return;
            }
            view_data.report.loading = false;
            match result {
                Ok(table) => {
                    view_data.report.table = Some(table);
                    view_data.report.error = None;
                }
                Err(error) => {
                    view_data.report.table = None;
                    view_data.report.error = Some(format!("{error:#}"));
                }
            }
        }
        InternalEvent::Dashboard { request_id, result } => {
            let dashboard = &mut view_data.dashboard;
            if request_id != dashboard.request_id {
                debug!(request_id, "stale dashboard discarded");
                return;
            }
            dashboard.loading = false;
            match result {
                Ok(snapshot) => {
                    dashboard.snapshot = Some(snapshot);
                    dashboard.error = None;
                }
                Err(error) => {
                    dashboard.snapshot = None;
                    dashboard.error = Some(format!("{error:#}"));
                }
            }
        }
        InternalEvent::Emailed { result } => {
            view_data.emailing = false;
            match result {
                Ok(()) => emit_status(state, view_data, tx, "sales report emailed"),
                Err(error) => {
                    let message = format!("email failed: {error:#}");
                    warn!(error = %message, "sales report not emailed");
                    emit_status(state, view_data, tx, message);
                }
            }
        }
    }
}

/// Keeps the newest copy of each record seen, for resolving sale references.
fn remember<T>(known: &mut HashMap<T::Id, T>, rows: &[T])
where
    T: Entity,
    T::Id: Eq + Hash,
{
    known.extend(rows.iter().map(|row| (row.id().clone(), row.clone())));
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(STATUS_TTL);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn dispatch_and_refresh<R: AppRuntime + 'static>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    command: AppCommand,
    internal_tx: &Sender<InternalEvent>,
) {
    let previous = state.active_tab;
    let events = state.dispatch(command);
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::TabChanged(_)))
    {
        leave_tab(view_data, previous);
        enter_tab(state, runtime, view_data, internal_tx);
    }
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::ReportChanged(_)))
        && state.active_tab == TabKind::Reports
    {
        request_report(state, runtime, view_data, internal_tx);
    }
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
}

/// Unmounting a list drops its pending search and strands its fetch.
fn leave_tab(view_data: &mut ViewData, tab: TabKind) {
    view_data.pending_delete = None;
    on_list!(view_data, tab, |list| list.teardown());
}

/// Pushes the tab's location and reloads it.
fn enter_tab<R: AppRuntime + 'static>(
    state: &AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let tab = state.active_tab;
    let href = on_list!(view_data, tab, |list| href_for(tab.path(), list.query()))
        .unwrap_or_else(|| tab.path().to_owned());
    if view_data.location.href() != href {
        view_data.location.navigate(&href);
    }
    match tab {
        TabKind::Reports => request_report(state, runtime, view_data, tx),
        tab => {
            let ticket = on_list!(view_data, tab, |list| list.refresh());
            fetch_if_issued(runtime, tx, tab, ticket);
        }
    }
}

/// Brings the console in line with the location after outside navigation:
/// the location bar, history, or the starting location.
fn follow_location<R: AppRuntime + 'static>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let path = view_data.location.path();
    let Some(tab) = TabKind::from_path(&path) else {
        emit_status(state, view_data, tx, format!("nothing at {path} -- try /items"));
        return;
    };
    let previous = state.active_tab;
    let switched = tab != previous;
    if switched {
        leave_tab(view_data, previous);
        state.dispatch(AppCommand::SelectTab(tab));
    }
    match tab {
        TabKind::Reports => {
            if switched || view_data.report.request.is_none() {
                request_report(state, runtime, view_data, tx);
            }
        }
        tab => {
            let ticket = on_list!(view_data, tab, |list| {
                let synced = list.sync_location();
                match synced {
                    Some(ticket) => Some(ticket),
                    None if switched || list.page().is_none() => Some(list.refresh()),
                    None => None,
                }
            })
            .flatten();
            fetch_if_issued(runtime, tx, tab, ticket);
        }
    }
}

fn refresh_active<R: AppRuntime + 'static>(
    state: &AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    match state.active_tab {
        TabKind::Reports => request_report(state, runtime, view_data, tx),
        tab => {
            let ticket = on_list!(view_data, tab, |list| list.refresh());
            fetch_if_issued(runtime, tx, tab, ticket);
        }
    }
}

fn report_request(state: &AppState, view_data: &ViewData) -> Option<ReportRequest> {
    match state.report {
        ReportKind::Sales => Some(ReportRequest::Sales),
        ReportKind::Items => Some(ReportRequest::Items),
        ReportKind::CustomerLedger => view_data
            .ledger_customer
            .clone()
            .map(|(id, name)| ReportRequest::CustomerLedger { id, name }),
    }
}

fn request_report<R: AppRuntime + 'static>(
    state: &AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let request = report_request(state, view_data);
    let report = &mut view_data.report;
    report.request_id = report.request_id.saturating_add(1);
    report.request = request.clone();
    report.table = None;
    report.error = None;
    let Some(request) = request else {
        report.loading = false;
        return;
    };
    report.loading = true;
    let request_id = report.request_id;
    debug!(request_id, report = request.kind().label(), "load report");
    spawn_job(runtime, tx, move |runtime| InternalEvent::Report {
        request_id,
        result: runtime.load_report(&request),
    });
}

fn request_dashboard<R: AppRuntime + 'static>(
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    let dashboard = &mut view_data.dashboard;
    dashboard.request_id = dashboard.request_id.saturating_add(1);
    dashboard.loading = true;
    dashboard.error = None;
    let request_id = dashboard.request_id;
    debug!(request_id, "load dashboard");
    spawn_job(runtime, tx, move |runtime| InternalEvent::Dashboard {
        request_id,
        result: runtime.load_dashboard(),
    });
}

fn send_sales_report_email<R: AppRuntime + 'static>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
) {
    if state.report != ReportKind::Sales {
        emit_status(state, view_data, tx, "only the sales report can be emailed");
        return;
    }
    if view_data.emailing {
        emit_status(state, view_data, tx, "already sending the sales report");
        return;
    }
    info!("emailing sales report");
    view_data.emailing = true;
    emit_status(state, view_data, tx, "sending sales report");
    spawn_job(runtime, tx, |runtime| InternalEvent::Emailed {
        result: runtime.email_sales_report(),
    });
}

fn row_count(view_data: &ViewData, tab: TabKind) -> usize {
    match tab {
        TabKind::Items => view_data.items.rows().len(),
        TabKind::Customers => view_data.customers.rows().len(),
        TabKind::Sales => view_data.sales.rows().len(),
        TabKind::Reports => view_data
            .report
            .table
            .as_ref()
            .map_or(0, |table| table.rows.len()),
    }
}

fn selected_row(view_data: &ViewData, tab: TabKind) -> Option<usize> {
    list_slot(tab).map(|slot| view_data.selected_rows[slot])
}

fn clamp_cursor(view_data: &mut ViewData, tab: TabKind) {
    let rows = row_count(view_data, tab);
    if let Some(slot) = list_slot(tab) {
        let cursor = &mut view_data.selected_rows[slot];
        *cursor = (*cursor).min(rows.saturating_sub(1));
    }
}

fn move_row(view_data: &mut ViewData, tab: TabKind, delta: isize) {
    let rows = row_count(view_data, tab);
    let Some(slot) = list_slot(tab) else {
        return;
    };
    if rows == 0 {
        view_data.selected_rows[slot] = 0;
        return;
    }
    let current = view_data.selected_rows[slot] as isize;
    view_data.selected_rows[slot] = (current + delta).clamp(0, rows as isize - 1) as usize;
}

/// The highlighted row as a delete target, with a label for the prompt.
fn selected_target(state: &AppState, view_data: &ViewData) -> Option<(RowTarget, String)> {
    let tab = state.active_tab;
    let index = selected_row(view_data, tab)?;
    match tab {
        TabKind::Items => view_data
            .items
            .rows()
            .get(index)
            .map(|item| (RowTarget::Item(item.id.clone()), item.name.clone())),
        TabKind::Customers => view_data
            .customers
            .rows()
            .get(index)
            .map(|customer| (RowTarget::Customer(customer.id.clone()), customer.name.clone())),
        TabKind::Sales => view_data.sales.rows().get(index).map(|sale| {
            let label = tally_app::sale_item_name(sale, &view_data.known_items);
            (RowTarget::Sale(sale.id.clone()), label)
        }),
        TabKind::Reports => None,
    }
}

fn today() -> Date {
    OffsetDateTime::now_utc().date()
}

fn open_form(state: &mut AppState, view_data: &mut ViewData, form: FormUi) {
    if let Some(mut previous) = view_data.form.take() {
        previous.teardown();
    }
    view_data.form_generation = view_data.form_generation.saturating_add(1);
    let kind = form.kind();
    view_data.form = Some(form);
    state.dispatch(AppCommand::OpenForm(kind));
}

fn close_form(state: &mut AppState, view_data: &mut ViewData) {
    if let Some(mut form) = view_data.form.take() {
        form.teardown();
    }
    state.dispatch(AppCommand::ExitToNav);
}

fn open_new_form(state: &mut AppState, view_data: &mut ViewData) {
    let form = match state.active_tab {
        TabKind::Items => FormUi::Item(ItemForm::new()),
        TabKind::Customers => FormUi::Customer(CustomerForm::new()),
        TabKind::Sales | TabKind::Reports => {
            FormUi::Sale(SaleForm::new(today(), view_data.options.debounce))
        }
    };
    open_form(state, view_data, form);
}

fn open_edit_form(state: &mut AppState, view_data: &mut ViewData) -> bool {
    let tab = state.active_tab;
    let Some(index) = selected_row(view_data, tab) else {
        return false;
    };
    let form = match tab {
        TabKind::Items => view_data
            .items
            .rows()
            .get(index)
            .map(|item| FormUi::Item(ItemForm::edit(item))),
        TabKind::Customers => view_data
            .customers
            .rows()
            .get(index)
            .map(|customer| FormUi::Customer(CustomerForm::edit(customer))),
        TabKind::Sales => view_data.sales.rows().get(index).map(|sale| {
            FormUi::Sale(SaleForm::edit(
                sale,
                &view_data.known_items,
                &view_data.known_customers,
                view_data.options.debounce,
            ))
        }),
        TabKind::Reports => None,
    };
    match form {
        Some(form) => {
            open_form(state, view_data, form);
            true
        }
        None => false,
    }
}

fn handle_key_event<R: AppRuntime + 'static>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
    now: Instant,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.dashboard.visible {
        match key.code {
            KeyCode::Esc | KeyCode::Char('D') => view_data.dashboard.visible = false,
            KeyCode::Char('r') => request_dashboard(runtime, view_data, internal_tx),
            _ => {}
        }
        return false;
    }

    match state.mode {
        AppMode::Form(_) => {
            handle_form_key(state, runtime, view_data, internal_tx, key, now);
            return false;
        }
        AppMode::Search => {
            handle_search_key(state, view_data, key, now);
            return false;
        }
        AppMode::Location => {
            handle_location_key(state, runtime, view_data, internal_tx, key);
            return false;
        }
        AppMode::Nav => {}
    }

    let confirm_delete = view_data.pending_delete.take();
    let tab = state.active_tab;
    match (key.code, key.modifiers) {
        (KeyCode::Tab, _) => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::NextTab, internal_tx);
        }
        (KeyCode::BackTab, _) => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::PrevTab, internal_tx);
        }
        (KeyCode::Char('?'), _) => view_data.help_visible = true,
        (KeyCode::Char('D'), _) => {
            view_data.dashboard.visible = true;
            request_dashboard(runtime, view_data, internal_tx);
        }
        (KeyCode::Char('/'), _) => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::EnterSearch, internal_tx);
        }
        (KeyCode::Char('g'), KeyModifiers::NONE) => {
            view_data.location_input = view_data.location.href();
            state.dispatch(AppCommand::EnterLocation);
        }
        (KeyCode::Char('<'), _) => {
            if view_data.location.back() {
                follow_location(state, runtime, view_data, internal_tx);
            } else {
                emit_status(state, view_data, internal_tx, "no earlier location");
            }
        }
        (KeyCode::Char('j'), _) | (KeyCode::Down, _) => move_row(view_data, tab, 1),
        (KeyCode::Char('k'), _) | (KeyCode::Up, _) => move_row(view_data, tab, -1),
        (KeyCode::Char(']'), _) => {
            let ticket = on_list!(view_data, tab, |list| list.next_page()).flatten();
            fetch_if_issued(runtime, internal_tx, tab, ticket);
        }
        (KeyCode::Char('['), _) => {
            let ticket = on_list!(view_data, tab, |list| list.prev_page()).flatten();
            fetch_if_issued(runtime, internal_tx, tab, ticket);
        }
        (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => {
            let ticket = on_list!(view_data, tab, |list| {
                let next = list.query().page_size().next();
                list.set_page_size(next)
            })
            .flatten();
            fetch_if_issued(runtime, internal_tx, tab, ticket);
        }
        (KeyCode::Char('-'), _) => {
            let ticket = on_list!(view_data, tab, |list| {
                let prev = list.query().page_size().prev();
                list.set_page_size(prev)
            })
            .flatten();
            fetch_if_issued(runtime, internal_tx, tab, ticket);
        }
        (KeyCode::Char('r'), KeyModifiers::NONE) => {
            refresh_active(state, runtime, view_data, internal_tx);
        }
        (KeyCode::Char('n'), KeyModifiers::NONE) => open_new_form(state, view_data),
        (KeyCode::Char('e'), KeyModifiers::NONE) => {
            if !open_edit_form(state, view_data) {
                emit_status(state, view_data, internal_tx, "nothing selected to edit");
            }
        }
        (KeyCode::Char('d'), KeyModifiers::NONE) => {
            let Some((target, label)) = selected_target(state, view_data) else {
                emit_status(state, view_data, internal_tx, "nothing selected to delete");
                return false;
            };
            if confirm_delete.as_ref() == Some(&target) {
                info!(noun = target.noun(), "deleting row");
                view_data.deleting = true;
                emit_status(state, view_data, internal_tx, format!("deleting {label}"));
                spawn_job(runtime, internal_tx, move |runtime| InternalEvent::Deleted {
                    result: runtime.delete_row(&target),
                    target,
                });
            } else {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("press d again to delete {} {label}", target.noun()),
                );
                view_data.pending_delete = Some(target);
            }
        }
        (KeyCode::Char('l'), KeyModifiers::NONE) if tab == TabKind::Customers => {
            let selected = selected_row(view_data, tab)
                .and_then(|index| view_data.customers.rows().get(index))
                .map(|customer| (customer.id.clone(), customer.name.clone()));
            let Some(customer) = selected else {
                emit_status(state, view_data, internal_tx, "select a customer first");
                return false;
            };
            view_data.ledger_customer = Some(customer);
            state.dispatch(AppCommand::SelectReport(ReportKind::CustomerLedger));
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::SelectTab(TabKind::Reports),
                internal_tx,
            );
        }
        (KeyCode::Char('c'), KeyModifiers::NONE) if tab == TabKind::Reports => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::NextReport, internal_tx);
        }
        (KeyCode::Char('m'), KeyModifiers::NONE) if tab == TabKind::Reports => {
            send_sales_report_email(state, runtime, view_data, internal_tx);
        }
        _ => {}
    }
    false
}

fn handle_search_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    key: KeyEvent,
    now: Instant,
) {
    if key.code == KeyCode::Esc {
        state.dispatch(AppCommand::ExitToNav);
        return;
    }
    let tab = state.active_tab;
    let outcome = on_list!(view_data, tab, |list| {
        let mut text = list.input().to_owned();
        let outcome = edit_text(&mut text, key);
        if outcome == TextEdit::Changed {
            list.edit_term(&text, now);
        }
        outcome
    });
    if outcome == Some(TextEdit::Enter) {
        state.dispatch(AppCommand::ExitToNav);
    }
}

fn handle_location_key<R: AppRuntime + 'static>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    if key.code == KeyCode::Esc {
        state.dispatch(AppCommand::ExitToNav);
        return;
    }
    if edit_text(&mut view_data.location_input, key) != TextEdit::Enter {
        return;
    }
    state.dispatch(AppCommand::ExitToNav);
    let typed = view_data.location_input.trim();
    if typed.is_empty() {
        return;
    }
    let href = if typed.starts_with('/') {
        typed.to_owned()
    } else {
        format!("/{typed}")
    };
    if href == view_data.location.href() {
        return;
    }
    view_data.location.navigate(&href);
    follow_location(state, runtime, view_data, internal_tx);
}

fn handle_form_key<R: AppRuntime + 'static>(
    state: &mut AppState,
    runtime: &Arc<R>,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
    now: Instant,
) {
    let Some(form) = view_data.form.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    match form.handle_key(key, now) {
        FormAction::Stay => {}
        FormAction::Close => close_form(state, view_data),
        FormAction::Submit(_) if view_data.submitting => {
            emit_status(state, view_data, internal_tx, "still saving");
        }
        FormAction::Submit(payload) => {
            view_data.submitting = true;
            let form = view_data.form_generation;
            let kind = payload.kind();
            info!(kind = kind.label(), update = payload.is_update(), "submitting form");
            spawn_job(runtime, internal_tx, move |runtime| InternalEvent::Submitted {
                form,
                kind,
                result: runtime.submit_form(&payload),
            });
        }
    }
}

fn handle_mouse_event(state: &AppState, view_data: &mut ViewData, mouse: MouseEvent) {
    if mouse.kind != MouseEventKind::Down(MouseButton::Left) {
        return;
    }
    if !matches!(state.mode, AppMode::Form(FormKind::Sale)) {
        return;
    }
    let area = view_data.area;
    if let Some(FormUi::Sale(form)) = &mut view_data.form {
        form.pointer_down(area, mouse.column, mouse.row);
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
