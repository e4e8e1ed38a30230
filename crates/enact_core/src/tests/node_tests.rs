use std::cell::{Cell, RefCell};

use super::*;

fn button(id: &str, disabled: bool, clicks: Rc<Cell<u32>>) -> Element {
    Element::new("button")
        .attr("id", id)
        .flag("disabled", disabled)
        .on_click(move || clicks.set(clicks.get() + 1))
        .child("Go")
}

#[test]
fn markup_serializes_attributes_and_children() {
    let node = UiNode::fragment([
        UiNode::from(Element::new("h3").child("Time passed: ").child("0.000")),
        UiNode::from(Element::new("button").attr("type", "button").flag("disabled", true).child("Start")),
    ]);

    assert_eq!(
        node.markup(),
        "<h3>Time passed: 0.000</h3><button type=\"button\" disabled>Start</button>"
    );
    assert_eq!(node.text_content(), "Time passed: 0.000Start");
}

#[test]
fn markup_escapes_text_and_attribute_values() {
    let node = UiNode::from(
        Element::new("a")
            .attr("href", "https://example.com/?q=a&b\"c")
            .child("<script> & more"),
    );

    assert_eq!(
        node.markup(),
        "<a href=\"https://example.com/?q=a&amp;b&quot;c\">&lt;script&gt; &amp; more</a>"
    );
    assert_eq!(node.text_content(), "<script> & more");
}

#[test]
fn slots_render_their_current_content() {
    let slot = RenderSlot::new();
    let node = UiNode::from(Element::new("p").child("count is ").child(slot.clone()));
    assert_eq!(node.text_content(), "count is ");

    slot.replace(Some(UiNode::text("3")));
    assert_eq!(node.text_content(), "count is 3");
    assert_eq!(node.markup(), "<p>count is 3</p>");
}

#[test]
fn find_looks_through_nested_slots() {
    let clicks = Rc::new(Cell::new(0));
    let slot = RenderSlot::new();
    slot.replace(Some(button("inner", false, clicks.clone()).into()));
    let tree = UiNode::from(Element::new("div").child(slot.clone()));

    let found = tree.find("inner").unwrap();
    assert_eq!(found.tag, "button");
    assert!(tree.find("missing").is_none());
    assert!(slot.dispatch("inner", &UiEvent::Click));
    assert_eq!(clicks.get(), 1);
}

#[test]
fn disabled_elements_ignore_events() {
    let clicks = Rc::new(Cell::new(0));
    let enabled = button("go", false, clicks.clone());
    let disabled = button("go", true, clicks.clone());

    assert!(enabled.dispatch(&UiEvent::Click));
    assert!(!disabled.dispatch(&UiEvent::Click));
    assert!(!enabled.dispatch(&UiEvent::Input("x".into())));
    assert_eq!(clicks.get(), 1);
}

#[test]
fn input_handlers_receive_the_event_payload() {
    let typed = Rc::new(RefCell::new(String::new()));
    let sink = typed.clone();
    let input = Element::new("input").on(EventKind::Input, move |event| {
        if let UiEvent::Input(text) = event {
            *sink.borrow_mut() = text.clone();
        }
    });

    assert!(input.dispatch(&UiEvent::Input("react".into())));
    assert_eq!(*typed.borrow(), "react");
}
