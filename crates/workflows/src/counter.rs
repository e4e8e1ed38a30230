use enact_core::{Element, Scope, UiNode, Value};

/// A `#count` button reading `count is N`; each click adds one.
pub async fn counter(scope: Scope, initial: u64) -> anyhow::Result<Option<UiNode>> {
    let count = Value::new(initial);
    let label = count.react(&scope)?;
    Ok(Some(
        Element::new("button")
            .attr("id", "count")
            .attr("type", "button")
            .on_click(move || {
                count.update(|n| n + 1);
            })
            .child("count is ")
            .child(label)
            .into(),
    ))
}
