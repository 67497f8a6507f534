//! Clinic Dashboard UI
//!
//! Browser bindings for the clinic dashboard page (WASM). The page is
//! rendered by the server; this crate attaches the charts and the page
//! behaviour to it.
//!
//! # Usage
//!
//! ```js
//! import init, { ClinicDashboard } from "./pkg/clinic_ui.js";
//!
//! await init();
//! const dashboard = new ClinicDashboard();
//! dashboard.initializeCharts(dashboardData);
//! ```
//!
//! # Features
//!
//! - Revenue, category and timeline charts on canvas
//! - Timeline reload every 5 minutes
//! - Patient table search, required-field checks, upload size limit
//! - Smooth in-page scrolling and Bootstrap tooltips

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use gloo_timers::callback::Interval;
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, HtmlInputElement, HtmlTableElement, ScrollBehavior, ScrollIntoViewOptions,
    ScrollLogicalPosition,
};

use clinic_dashboard::{
    anchor_target, apply_search, apply_timeline, on_file_change, on_submit, DashboardPayload,
    DashboardView, DomConfig, ReloadOutcome, SubmitDecision, TIMELINE_ENDPOINT,
};

pub mod api;
pub mod canvas;
pub mod geometry;
pub mod page;

use canvas::CanvasSurface;
use page::{log_error, query_all, AlertNotifier, FileField, FormControl, Listener, TableRows};

/// Default timeline reload period (5 minutes)
pub const REFRESH_INTERVAL_MS: u32 = 300_000;

#[wasm_bindgen(start)]
pub fn start() {
    // Set up panic hook for better error messages in WASM
    console_error_panic_hook::set_once();
}

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = bootstrap, js_name = Tooltip)]
    type BootstrapTooltip;

    #[wasm_bindgen(constructor, js_namespace = bootstrap, js_class = "Tooltip", catch)]
    fn new(element: &Element) -> Result<BootstrapTooltip, JsValue>;
}

/// Options accepted by the constructor: the DOM contract plus data source
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiOptions {
    #[serde(flatten)]
    pub dom: DomConfig,
    pub endpoint: String,
    pub refresh_interval_ms: u32,
}

impl UiOptions {
    /// Parse options from JSON; a zero refresh period means the default
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let mut options: UiOptions = serde_json::from_str(text)?;
        if options.refresh_interval_ms == 0 {
            options.refresh_interval_ms = REFRESH_INTERVAL_MS;
        }
        Ok(options)
    }
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            dom: DomConfig::default(),
            endpoint: TIMELINE_ENDPOINT.to_string(),
            refresh_interval_ms: REFRESH_INTERVAL_MS,
        }
    }
}

/// State shared with event handlers and in-flight reloads
struct Page {
    document: Document,
    options: UiOptions,
    view: RefCell<DashboardView<CanvasSurface>>,
    torn_down: Cell<bool>,
}

/// The dashboard attached to the current page
#[wasm_bindgen]
pub struct ClinicDashboard {
    page: Rc<Page>,
    listeners: Vec<Listener>,
    refresh: Option<Interval>,
}

#[wasm_bindgen]
impl ClinicDashboard {
    /// Attach to the page; `options` is an object or JSON string, all keys optional
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<ClinicDashboard, JsValue> {
        let options: UiOptions = match json_text(&options)? {
            Some(text) => UiOptions::from_json(&text)
                .map_err(|e| JsValue::from_str(&format!("Invalid options: {}", e)))?,
            None => UiOptions::default(),
        };
        let document = page::document().ok_or_else(|| JsValue::from_str("No document"))?;

        let view = DashboardView::new(
            CanvasSurface::new(document.clone()),
            options.dom.mounts.clone(),
        );
        let page = Rc::new(Page {
            document,
            options,
            view: RefCell::new(view),
            torn_down: Cell::new(false),
        });

        let mut listeners = Vec::new();
        listeners.extend(bind_search(&page));
        listeners.extend(bind_forms(&page));
        listeners.extend(bind_file_inputs(&page));
        listeners.extend(bind_anchors(&page));
        init_tooltips(&page);

        let refresh = start_refresh(&page);

        Ok(Self {
            page,
            listeners,
            refresh: Some(refresh),
        })
    }

    /// Render the charts present in `payload`, then load the timeline once
    ///
    /// Returns the names of the rendered slots.
    #[wasm_bindgen(js_name = initializeCharts)]
    pub fn initialize_charts(&self, payload: JsValue) -> Result<js_sys::Array, JsValue> {
        let text = json_text(&payload)?.unwrap_or_else(|| "{}".to_string());
        let payload = DashboardPayload::from_json(&text)
            .map_err(|e| JsValue::from_str(&format!("Invalid dashboard data: {}", e)))?;

        let rendered = self.page.view.borrow_mut().initialize(&payload);

        let page = Rc::clone(&self.page);
        wasm_bindgen_futures::spawn_local(async move {
            reload(&page).await;
        });

        Ok(rendered
            .into_iter()
            .map(|slot| JsValue::from_str(slot.name()))
            .collect())
    }

    /// Fetch and redraw the timeline; resolves to the outcome name
    #[wasm_bindgen(js_name = reloadTimeline)]
    pub fn reload_timeline(&self) -> js_sys::Promise {
        let page = Rc::clone(&self.page);
        wasm_bindgen_futures::future_to_promise(async move {
            let outcome = reload(&page).await;
            Ok(JsValue::from_str(outcome_name(outcome)))
        })
    }

    #[wasm_bindgen(js_name = toggleMobileMenu)]
    pub fn toggle_mobile_menu(&self) {
        if let Ok(Some(navbar)) = self
            .page
            .document
            .query_selector(&self.page.options.dom.navbar_selector)
        {
            let _ = navbar.class_list().toggle("show");
        }
    }

    /// Mark the element with id `id` as loading; false when absent
    #[wasm_bindgen(js_name = showLoading)]
    pub fn show_loading(&self, id: &str) -> bool {
        self.set_loading(id, true)
    }

    #[wasm_bindgen(js_name = hideLoading)]
    pub fn hide_loading(&self, id: &str) -> bool {
        self.set_loading(id, false)
    }

    /// Run `callback` only if the user confirms `message`
    #[wasm_bindgen(js_name = confirmAction)]
    pub fn confirm_action(&self, message: &str, callback: &js_sys::Function) -> Result<bool, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("No window"))?;
        if window.confirm_with_message(message)? {
            callback.call0(&JsValue::NULL)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Stop the refresh, detach every handler and dispose the charts
    pub fn teardown(&mut self) {
        // Dropping the interval cancels it
        self.refresh = None;
        self.listeners.clear();
        self.page.torn_down.set(true);
        self.page.view.borrow_mut().teardown();
    }

    #[wasm_bindgen(getter, js_name = isRefreshing)]
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_some()
    }

    #[wasm_bindgen(getter, js_name = refreshIntervalMs)]
    pub fn refresh_interval_ms(&self) -> u32 {
        self.page.options.refresh_interval_ms
    }
}

impl ClinicDashboard {
    fn set_loading(&self, id: &str, loading: bool) -> bool {
        let Some(element) = self.page.document.get_element_by_id(id) else {
            return false;
        };
        let class = &self.page.options.dom.loading_class;
        let classes = element.class_list();
        let _ = if loading {
            classes.add_1(class)
        } else {
            classes.remove_1(class)
        };
        true
    }

    /// Chart handles, for callers embedding the crate from Rust
    pub fn with_view<R>(&self, f: impl FnOnce(&DashboardView<CanvasSurface>) -> R) -> R {
        f(&self.page.view.borrow())
    }
}

/// JSON text of a JS value: strings as-is, objects stringified, nullish as `None`
fn json_text(value: &JsValue) -> Result<Option<String>, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    if let Some(text) = value.as_string() {
        return Ok(Some(text));
    }
    Ok(js_sys::JSON::stringify(value)?.as_string())
}

async fn reload(page: &Page) -> ReloadOutcome {
    let result = api::fetch_timeline(&page.options.endpoint).await;
    // A fetch that outlives teardown must not mount the chart again
    if page.torn_down.get() {
        return ReloadOutcome::Skipped;
    }
    if let Err(e) = &result {
        log_error(&format!("Error loading timeline data: {}", e));
    }
    apply_timeline(&mut *page.view.borrow_mut(), result)
}

fn outcome_name(outcome: ReloadOutcome) -> &'static str {
    match outcome {
        ReloadOutcome::Rendered => "rendered",
        ReloadOutcome::Skipped => "skipped",
        ReloadOutcome::NoData => "no_data",
        ReloadOutcome::Failed => "failed",
    }
}

fn start_refresh(page: &Rc<Page>) -> Interval {
    let page = Rc::clone(page);
    Interval::new(page.options.refresh_interval_ms, move || {
        let page = Rc::clone(&page);
        wasm_bindgen_futures::spawn_local(async move {
            reload(&page).await;
        });
    })
}

fn bind_search(page: &Rc<Page>) -> Option<Listener> {
    let dom = &page.options.dom;
    let input = page
        .document
        .get_element_by_id(&dom.search_input)?
        .dyn_into::<HtmlInputElement>()
        .ok()?;
    let table = page
        .document
        .get_element_by_id(&dom.table)?
        .dyn_into::<HtmlTableElement>()
        .ok()?;

    let source = input.clone();
    Some(Listener::new(input.as_ref(), "keyup", move |_| {
        let mut rows = TableRows::of(&table);
        apply_search(&mut rows, &source.value());
    }))
}

fn bind_forms(page: &Rc<Page>) -> Vec<Listener> {
    let dom = &page.options.dom;
    query_all(&page.document, &dom.form_selector)
        .into_iter()
        .map(|form| {
            let target = form.clone();
            let selector = dom.required_selector.clone();
            let invalid_class = dom.invalid_class.clone();
            Listener::new(target.as_ref(), "submit", move |event| {
                let mut fields = FormControl::collect(&form, &selector, &invalid_class);
                if on_submit(&mut fields, &AlertNotifier) == SubmitDecision::Block {
                    event.prevent_default();
                }
            })
        })
        .collect()
}

fn bind_file_inputs(page: &Rc<Page>) -> Vec<Listener> {
    query_all(&page.document, &page.options.dom.file_input_selector)
        .into_iter()
        .filter_map(|element| element.dyn_into::<HtmlInputElement>().ok())
        .map(|input| {
            let target = input.clone();
            Listener::new(target.as_ref(), "change", move |_| {
                on_file_change(&mut FileField::new(input.clone()), &AlertNotifier);
            })
        })
        .collect()
}

fn bind_anchors(page: &Rc<Page>) -> Vec<Listener> {
    query_all(&page.document, &page.options.dom.anchor_selector)
        .into_iter()
        .map(|anchor| {
            let target = anchor.clone();
            let document = page.document.clone();
            Listener::new(target.as_ref(), "click", move |event| {
                event.prevent_default();

                let href = anchor.get_attribute("href").unwrap_or_default();
                let Some(selector) = anchor_target(&href) else {
                    return;
                };
                if let Ok(Some(section)) = document.query_selector(selector) {
                    let options = ScrollIntoViewOptions::new();
                    options.set_behavior(ScrollBehavior::Smooth);
                    options.set_block(ScrollLogicalPosition::Start);
                    section.scroll_into_view_with_scroll_into_view_options(&options);
                }
            })
        })
        .collect()
}

/// Bootstrap tooltips, when the page loaded Bootstrap
fn init_tooltips(page: &Page) {
    let has_bootstrap =
        js_sys::Reflect::has(&js_sys::global(), &JsValue::from_str("bootstrap")).unwrap_or(false);
    if !has_bootstrap {
        return;
    }

    for element in query_all(&page.document, &page.options.dom.tooltip_selector) {
        if let Err(e) = BootstrapTooltip::new(&element) {
            log_error(&format!("Tooltip failed: {:?}", e));
        }
    }
}
