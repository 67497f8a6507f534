//! Page Adapters
//!
//! Live DOM elements behind the view-model traits: the patient table, form
//! fields, file inputs and `alert` notifications.

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{
    Document, Element, Event, EventTarget, HtmlElement, HtmlInputElement, HtmlSelectElement,
    HtmlTableElement, HtmlTextAreaElement,
};

use clinic_dashboard::{FileInput, FilterableTable, Notifier, RequiredField};

/// Log an error to the browser console
pub fn log_error(message: &str) {
    web_sys::console::error_1(&message.into());
}

pub fn document() -> Option<Document> {
    web_sys::window()?.document()
}

/// Elements of `document` matching `selector`; an invalid selector matches nothing
pub fn query_all(document: &Document, selector: &str) -> Vec<Element> {
    match document.query_selector_all(selector) {
        Ok(list) => elements(&list),
        Err(e) => {
            log_error(&format!("Invalid selector {}: {:?}", selector, e));
            Vec::new()
        }
    }
}

/// Descendants of `root` matching `selector`
pub fn query_all_in(root: &Element, selector: &str) -> Vec<Element> {
    match root.query_selector_all(selector) {
        Ok(list) => elements(&list),
        Err(e) => {
            log_error(&format!("Invalid selector {}: {:?}", selector, e));
            Vec::new()
        }
    }
}

fn elements(list: &web_sys::NodeList) -> Vec<Element> {
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .collect()
}

/// Event listener removed from its target when dropped
pub struct Listener {
    target: EventTarget,
    event: &'static str,
    callback: Closure<dyn FnMut(Event)>,
}

impl Listener {
    pub fn new<F>(target: &EventTarget, event: &'static str, handler: F) -> Self
    where
        F: FnMut(Event) + 'static,
    {
        let callback = Closure::wrap(Box::new(handler) as Box<dyn FnMut(Event)>);
        if let Err(e) =
            target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())
        {
            log_error(&format!("Failed to listen for {}: {:?}", event, e));
        }

        Self {
            target: target.clone(),
            event,
            callback,
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event, self.callback.as_ref().unchecked_ref());
    }
}

/// Body rows of an HTML table
pub struct TableRows {
    rows: Vec<HtmlElement>,
}

impl TableRows {
    /// Rows of the first `<tbody>`, or every row when the table has none
    pub fn of(table: &HtmlTableElement) -> Self {
        let collection = match table.t_bodies().item(0) {
            Some(body) => match body.dyn_into::<web_sys::HtmlTableSectionElement>() {
                Ok(body) => body.rows(),
                Err(_) => table.rows(),
            },
            None => table.rows(),
        };

        let rows = (0..collection.length())
            .filter_map(|i| collection.item(i))
            .filter_map(|row| row.dyn_into::<HtmlElement>().ok())
            .collect();

        Self { rows }
    }
}

impl FilterableTable for TableRows {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row_text(&self, index: usize) -> String {
        self.rows
            .get(index)
            .and_then(|row| row.text_content())
            .unwrap_or_default()
    }

    fn set_row_visible(&mut self, index: usize, visible: bool) {
        if let Some(row) = self.rows.get(index) {
            let display = if visible { "" } else { "none" };
            let _ = row.style().set_property("display", display);
        }
    }
}

/// A required `input`, `select` or `textarea`
pub struct FormControl {
    element: Element,
    invalid_class: String,
}

impl FormControl {
    pub fn new(element: Element, invalid_class: &str) -> Self {
        Self {
            element,
            invalid_class: invalid_class.to_string(),
        }
    }

    /// Every control of `form` matching `selector`
    pub fn collect(form: &Element, selector: &str, invalid_class: &str) -> Vec<Self> {
        query_all_in(form, selector)
            .into_iter()
            .map(|element| Self::new(element, invalid_class))
            .collect()
    }
}

impl RequiredField for FormControl {
    fn name(&self) -> String {
        self.element
            .get_attribute("name")
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.element.id())
    }

    fn value(&self) -> String {
        if let Some(input) = self.element.dyn_ref::<HtmlInputElement>() {
            input.value()
        } else if let Some(select) = self.element.dyn_ref::<HtmlSelectElement>() {
            select.value()
        } else if let Some(area) = self.element.dyn_ref::<HtmlTextAreaElement>() {
            area.value()
        } else {
            self.element.text_content().unwrap_or_default()
        }
    }

    fn set_invalid(&mut self, invalid: bool) {
        let classes = self.element.class_list();
        let _ = if invalid {
            classes.add_1(&self.invalid_class)
        } else {
            classes.remove_1(&self.invalid_class)
        };
    }
}

/// `<input type="file">`
pub struct FileField {
    input: HtmlInputElement,
}

impl FileField {
    pub fn new(input: HtmlInputElement) -> Self {
        Self { input }
    }
}

impl FileInput for FileField {
    fn first_file_size(&self) -> Option<u64> {
        let file = self.input.files()?.item(0)?;
        Some(file.size() as u64)
    }

    fn clear(&mut self) {
        self.input.set_value("");
    }
}

/// Blocking `window.alert`
#[derive(Debug, Default, Clone, Copy)]
pub struct AlertNotifier;

impl Notifier for AlertNotifier {
    fn notify(&self, message: &str) {
        match web_sys::window() {
            Some(window) => {
                if let Err(e) = window.alert_with_message(message) {
                    log_error(&format!("Alert failed: {:?}", e));
                }
            }
            None => log_error(message),
        }
    }
}
