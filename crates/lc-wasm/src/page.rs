//! [`HostPage`] over the real DOM.
//!
//! Selector set targets the hosted chat application's conversation markup:
//! turn articles tagged with `data-testid="conversation-turn-*"` and a
//! role in `data-turn`, scrolling inside a `react-scroll-to-bottom`
//! container.

use std::cell::RefCell;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, HtmlElement, MutationObserver, MutationObserverInit, MutationRecord};

use lc_core::{HostPage, ObserveTarget, PageError, TurnHandle, TurnRole};

pub const TURN_SELECTOR: &str = "article[data-testid^=\"conversation-turn-\"]";
pub const CONTAINER_SELECTOR: &str = "[class^=\"react-scroll-to-bottom--\"]";
const CODE_BLOCK_SELECTOR: &str = "pre code, .hljs";
const IMAGE_SELECTOR: &str = "img";
const CANVAS_SELECTOR: &str = "canvas";
const TURN_ROLE_ATTR: &str = "data-turn";
const HIGHLIGHT_CLASS: &str = "hljs";

/// Live-document implementation of the host page seam.
///
/// Turn handles index into the element snapshot taken by the most recent
/// `conversation_turns` call; a trim pass queries and removes within one
/// synchronous scan, so the snapshot cannot go stale under it.
pub struct DomPage {
    document: Document,
    observer: MutationObserver,
    // Kept alive for the observer; dropped with the page.
    _callback: Closure<dyn FnMut(js_sys::Array, MutationObserver)>,
    snapshot: RefCell<Vec<Element>>,
}

impl DomPage {
    /// Bind to the current window's document. The mutation callback reports
    /// insertion batches back through `on_batch`.
    pub fn new(on_batch: fn(bool)) -> Result<Self, JsValue> {
        let document = web_sys::window()
            .ok_or_else(|| JsValue::from_str("no window"))?
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;

        let callback = Closure::<dyn FnMut(js_sys::Array, MutationObserver)>::new(
            move |records: js_sys::Array, _observer: MutationObserver| {
                on_batch(batch_contains_turn(&records));
            },
        );
        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())?;

        Ok(Self {
            document,
            observer,
            _callback: callback,
            snapshot: RefCell::new(Vec::new()),
        })
    }

    fn container(&self) -> Option<Element> {
        self.document.query_selector(CONTAINER_SELECTOR).ok().flatten()
    }

    fn observe(&self, node: &web_sys::Node) -> Result<(), JsValue> {
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        self.observer.observe_with_options(node, &init)
    }
}

impl HostPage for DomPage {
    fn conversation_turns(&self) -> Vec<TurnHandle> {
        let mut snapshot = self.snapshot.borrow_mut();
        snapshot.clear();

        let list = match self.document.query_selector_all(TURN_SELECTOR) {
            Ok(list) => list,
            Err(_) => return Vec::new(),
        };

        let mut turns = Vec::with_capacity(list.length() as usize);
        for i in 0..list.length() {
            let Some(node) = list.item(i) else { continue };
            let Ok(element) = node.dyn_into::<Element>() else {
                continue;
            };
            let role = element
                .get_attribute(TURN_ROLE_ATTR)
                .map(|value| TurnRole::from_attr(&value))
                .unwrap_or(TurnRole::Unknown);
            turns.push(TurnHandle {
                ordinal: snapshot.len() as u32,
                role,
            });
            snapshot.push(element);
        }
        turns
    }

    fn remove_turn(&mut self, handle: &TurnHandle) -> Result<(), PageError> {
        let element = match self.snapshot.borrow().get(handle.ordinal as usize) {
            Some(element) => element.clone(),
            // Stale handle: the snapshot moved on, nothing to do.
            None => return Ok(()),
        };

        if !element.is_connected() {
            // The host page got there first.
            return Ok(());
        }

        match element.matches(TURN_SELECTOR) {
            Ok(true) => {
                element.remove();
                Ok(())
            }
            _ => Err(PageError::RemovalRefused {
                ordinal: handle.ordinal,
                reason: "node no longer matches the turn predicate".to_string(),
            }),
        }
    }

    fn acquire_container(&mut self) -> ObserveTarget {
        self.observer.disconnect();
        if let Some(container) = self.container() {
            if self.observe(&container).is_ok() {
                return ObserveTarget::Container;
            }
        }
        if self.observe(&self.document).is_err() {
            log::warn!("failed to observe the document for insertions");
        }
        ObserveTarget::WholeDocument
    }

    fn release_container(&mut self) {
        self.observer.disconnect();
    }

    fn inject_style(&mut self, id: &str, css: &str) -> bool {
        if self.document.get_element_by_id(id).is_some() {
            return false;
        }
        let Ok(style) = self.document.create_element("style") else {
            return false;
        };
        style.set_id(id);
        style.set_text_content(Some(css));

        let appended = match self.document.head() {
            Some(head) => head.append_child(&style).is_ok(),
            None => self
                .document
                .document_element()
                .is_some_and(|root| root.append_child(&style).is_ok()),
        };
        if !appended {
            log::warn!("failed to inject style rule {id:?}");
        }
        appended
    }

    fn set_instant_scroll(&mut self) {
        let Some(container) = self.container() else {
            return;
        };
        if let Some(element) = container.dyn_ref::<HtmlElement>() {
            let style = element.style();
            let _ = style.set_property("scroll-behavior", "auto");
            let _ = style.set_property("will-change", "scroll-position");
        }
    }

    fn strip_code_highlighting(&mut self) -> usize {
        let Ok(blocks) = self.document.query_selector_all(CODE_BLOCK_SELECTOR) else {
            return 0;
        };
        let mut touched = 0;
        for i in 0..blocks.length() {
            let Some(node) = blocks.item(i) else { continue };
            let Ok(element) = node.dyn_into::<Element>() else {
                continue;
            };
            element.class_list().remove_1(HIGHLIGHT_CLASS).ok();
            if let Some(html) = element.dyn_ref::<HtmlElement>() {
                let style = html.style();
                let _ = style.set_property("background-color", "transparent");
                let _ = style.set_property("color", "inherit");
            }
            touched += 1;
        }
        touched
    }

    fn tune_media_rendering(&mut self) -> usize {
        let mut touched = 0;
        if let Ok(images) = self.document.query_selector_all(IMAGE_SELECTOR) {
            for i in 0..images.length() {
                let Some(node) = images.item(i) else { continue };
                if let Some(html) = node.dyn_ref::<HtmlElement>() {
                    let _ = html.style().set_property("image-rendering", "auto");
                    touched += 1;
                }
            }
        }
        if let Ok(canvases) = self.document.query_selector_all(CANVAS_SELECTOR) {
            for i in 0..canvases.length() {
                let Some(node) = canvases.item(i) else { continue };
                if let Some(html) = node.dyn_ref::<HtmlElement>() {
                    let _ = html.style().set_property("will-change", "transform");
                    touched += 1;
                }
            }
        }
        touched
    }
}

/// Does an insertion batch contain a conversation turn, directly or among
/// descendants of an added node?
fn batch_contains_turn(records: &js_sys::Array) -> bool {
    for record in records.iter() {
        let Some(record) = record.dyn_ref::<MutationRecord>() else {
            continue;
        };
        let added = record.added_nodes();
        for i in 0..added.length() {
            let Some(node) = added.item(i) else { continue };
            let Some(element) = node.dyn_ref::<Element>() else {
                continue;
            };
            if element.matches(TURN_SELECTOR).unwrap_or(false) {
                return true;
            }
            if element.query_selector(TURN_SELECTOR).ok().flatten().is_some() {
                return true;
            }
        }
    }
    false
}
