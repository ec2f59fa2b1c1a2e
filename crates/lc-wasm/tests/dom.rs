//! Browser-side tests for the DOM page implementation.

use wasm_bindgen_test::*;

use lc_core::{HostPage, TurnRole};
use lc_wasm::DomPage;

wasm_bindgen_test_configure!(run_in_browser);

fn ignore_batch(_matched: bool) {}

fn body() -> web_sys::HtmlElement {
    web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.body())
        .expect("test page has a body")
}

fn append_turn(n: u32, role: &str) {
    let document = web_sys::window().unwrap().document().unwrap();
    let article = document.create_element("article").unwrap();
    article
        .set_attribute("data-testid", &format!("conversation-turn-{n}"))
        .unwrap();
    article.set_attribute("data-turn", role).unwrap();
    body().append_child(&article).unwrap();
}

fn reset_page() {
    body().set_inner_html("");
}

#[wasm_bindgen_test]
fn queries_turns_in_document_order() {
    reset_page();
    append_turn(1, "user");
    append_turn(2, "assistant");

    let page = DomPage::new(ignore_batch).unwrap();
    let turns = page.conversation_turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, TurnRole::User);
    assert_eq!(turns[1].role, TurnRole::Assistant);
}

#[wasm_bindgen_test]
fn remove_detaches_and_tolerates_the_race() {
    reset_page();
    for n in 0..4 {
        append_turn(n, "user");
    }

    let mut page = DomPage::new(ignore_batch).unwrap();
    let turns = page.conversation_turns();
    assert_eq!(turns.len(), 4);

    let oldest = turns[0];
    assert!(page.remove_turn(&oldest).is_ok());
    // Second removal of the same handle: the node is gone, still Ok.
    assert!(page.remove_turn(&oldest).is_ok());
    assert_eq!(page.conversation_turns().len(), 3);
}

#[wasm_bindgen_test]
fn style_injection_is_idempotent() {
    reset_page();
    let mut page = DomPage::new(ignore_batch).unwrap();
    assert!(page.inject_style("lc-test-style", "* { transition-duration: 0.01ms; }"));
    assert!(!page.inject_style("lc-test-style", "* { transition-duration: 0.01ms; }"));

    let document = web_sys::window().unwrap().document().unwrap();
    assert!(document.get_element_by_id("lc-test-style").is_some());
}
