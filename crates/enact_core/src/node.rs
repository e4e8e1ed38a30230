//! The retained UI tree handed to the host renderer.

use std::{fmt, rc::Rc};

use crate::render::RenderSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Click,
    Input,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    Click,
    Input(String),
}

impl UiEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Click => EventKind::Click,
            Self::Input(_) => EventKind::Input,
        }
    }
}

#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&UiEvent)>);

impl Handler {
    pub fn new(f: impl Fn(&UiEvent) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &UiEvent) {
        (self.0)(event)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler")
    }
}

impl PartialEq for Handler {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiNode {
    Text(String),
    Element(Element),
    Fragment(Vec<UiNode>),
    /// Live output of a nested mount.
    Slot(RenderSlot),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<UiNode>,
    pub handlers: Vec<(EventKind, Handler)>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
            handlers: Vec::new(),
        }
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Adds a boolean attribute only when `on` is set.
    pub fn flag(self, name: &str, on: bool) -> Self {
        if on {
            self.attr(name, "")
        } else {
            self
        }
    }

    pub fn child(mut self, child: impl Into<UiNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I>(mut self, children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<UiNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn on(mut self, kind: EventKind, f: impl Fn(&UiEvent) + 'static) -> Self {
        self.handlers.push((kind, Handler::new(f)));
        self
    }

    pub fn on_click(self, f: impl Fn() + 'static) -> Self {
        self.on(EventKind::Click, move |_| f())
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_disabled(&self) -> bool {
        self.get_attr("disabled").is_some()
    }

    /// Runs the handlers registered for `event`. Disabled elements ignore
    /// events. Returns whether any handler ran.
    pub fn dispatch(&self, event: &UiEvent) -> bool {
        if self.is_disabled() {
            return false;
        }
        let mut handled = false;
        for (kind, handler) in &self.handlers {
            if *kind == event.kind() {
                handler.call(event);
                handled = true;
            }
        }
        handled
    }
}

impl From<Element> for UiNode {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl From<&str> for UiNode {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for UiNode {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<RenderSlot> for UiNode {
    fn from(slot: RenderSlot) -> Self {
        Self::Slot(slot)
    }
}

impl UiNode {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn fragment<I>(children: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<UiNode>,
    {
        Self::Fragment(children.into_iter().map(Into::into).collect())
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.write_text(&mut out);
        out
    }

    fn write_text(&self, out: &mut String) {
        match self {
            Self::Text(text) => out.push_str(text),
            Self::Element(element) => element.children.iter().for_each(|c| c.write_text(out)),
            Self::Fragment(children) => children.iter().for_each(|c| c.write_text(out)),
            Self::Slot(slot) => {
                if let Some(node) = slot.current() {
                    node.write_text(out);
                }
            }
        }
    }

    /// HTML-like serialization. Slots are inlined with their current
    /// content; handlers are not shown.
    pub fn markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        match self {
            Self::Text(text) => escape_into(out, text),
            Self::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attrs {
                    if value.is_empty() {
                        out.push_str(&format!(" {name}"));
                    } else {
                        out.push_str(&format!(" {name}=\""));
                        escape_into(out, value);
                        out.push('"');
                    }
                }
                out.push('>');
                element.children.iter().for_each(|c| c.write_markup(out));
                out.push_str(&format!("</{}>", element.tag));
            }
            Self::Fragment(children) => children.iter().for_each(|c| c.write_markup(out)),
            Self::Slot(slot) => {
                if let Some(node) = slot.current() {
                    node.write_markup(out);
                }
            }
        }
    }

    /// Depth-first search for the element whose `id` attribute is `id`,
    /// looking through nested slots.
    pub fn find(&self, id: &str) -> Option<Element> {
        match self {
            Self::Text(_) => None,
            Self::Element(element) => {
                if element.get_attr("id") == Some(id) {
                    return Some(element.clone());
                }
                element.children.iter().find_map(|c| c.find(id))
            }
            Self::Fragment(children) => children.iter().find_map(|c| c.find(id)),
            Self::Slot(slot) => slot.current().and_then(|node| node.find(id)),
        }
    }
}

fn escape_into(out: &mut String, raw: &str) {
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

#[cfg(test)]
#[path = "tests/node_tests.rs"]
mod tests;
