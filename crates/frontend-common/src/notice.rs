//! Session-ended notices
//!
//! The UI registers a toast callback once; the session reports through
//! [`ToastNotifier`] without knowing which component shows it.

use kolabo_http::Notifier;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsValue;

type ToastCallback = Rc<dyn Fn(&str, &str)>;

thread_local! {
    /// Toast callback registered by the UI
    static TOAST_CALLBACK: RefCell<Option<ToastCallback>> = RefCell::new(None);
}

/// Set the callback used to show error toasts
pub fn set_toast_callback(callback: ToastCallback) {
    TOAST_CALLBACK.with(|cb| {
        *cb.borrow_mut() = Some(callback);
    });
}

/// Clear the toast callback
pub fn clear_toast_callback() {
    TOAST_CALLBACK.with(|cb| {
        *cb.borrow_mut() = None;
    });
}

/// Show an error toast, falling back to the browser console
pub fn show_error(message: &str, title: &str) {
    let callback = TOAST_CALLBACK.with(|cb| cb.borrow().clone());
    match callback {
        Some(callback) => callback(message, title),
        None => web_sys::console::error_1(&JsValue::from(format!("{title}: {message}"))),
    }
}

/// [`Notifier`] that shows the registered toast
#[derive(Debug, Default, Clone, Copy)]
pub struct ToastNotifier;

impl Notifier for ToastNotifier {
    fn notify_error(&self, message: &str, title: &str) {
        show_error(message, title);
    }
}
