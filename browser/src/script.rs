//! JavaScript snippets evaluated in the page.
//!
//! Elements are addressed across evaluations through a tag attribute: every
//! lookup stamps its matches with `data-listmover-handle="<batch>-<index>"`
//! and returns the tags. An element that is re-rendered or re-tagged by a
//! later lookup no longer answers to its old tag, which is how stale handles
//! are detected.
//!
//! Every string coming from configuration or from the page is embedded as a
//! JSON string literal.

use serde::Deserialize;

pub(crate) const HANDLE_ATTR: &str = "data-listmover-handle";

/// Reply of a script that operates on one tagged element.
#[derive(Debug, Deserialize)]
pub(crate) struct Reply<T> {
    #[serde(default)]
    pub stale: bool,
    pub value: Option<T>,
}

/// Result of resolving the enclosing container of an element.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub(crate) struct ContainerProbe {
    pub found: bool,
    pub identifier: Option<String>,
}

fn lit(raw: &str) -> String {
    serde_json::Value::from(raw).to_string()
}

/// CSS selector of a tagged element.
pub(crate) fn handle_css(handle: &str) -> String {
    format!("[{HANDLE_ATTR}=\"{handle}\"]")
}

fn handle_selector(handle: &str) -> String {
    lit(&handle_css(handle))
}

/// Tags every element matching `selector` and returns the tags in document
/// order.
pub(crate) fn tag_all(selector: &str, batch: u64) -> String {
    format!(
        r#"(() => {{
  const els = Array.from(document.querySelectorAll({sel}));
  return els.map((el, i) => {{
    const handle = "{batch}-" + i;
    el.setAttribute({attr}, handle);
    return handle;
  }});
}})()"#,
        sel = lit(selector),
        attr = lit(HANDLE_ATTR),
    )
}

/// Wraps `body` so it runs with `el` bound to the tagged element, or
/// replies `{ stale: true }` when the tag no longer resolves. `body` must
/// return `{ value: ... }`.
pub(crate) fn on_handle(handle: &str, body: &str) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return {{ stale: true }};
  {body}
}})()"#,
        sel = handle_selector(handle),
    )
}

pub(crate) fn closest_container(container_selector: &str, identifier_attr: &str) -> String {
    format!(
        r#"const c = el.closest({sel});
  if (!c) return {{ value: {{ found: false, identifier: null }} }};
  return {{ value: {{ found: true, identifier: c.getAttribute({attr}) }} }};"#,
        sel = lit(container_selector),
        attr = lit(identifier_attr),
    )
}

pub(crate) fn text_of_descendant(selector: &str) -> String {
    format!(
        r#"const t = el.querySelector({sel});
  return {{ value: t ? t.textContent : null }};"#,
        sel = lit(selector),
    )
}

pub(crate) const SCROLL_INTO_VIEW: &str =
    "el.scrollIntoView({ block: 'center', inline: 'nearest' });\n  return { value: true };";

/// Dispatches one bubbling, cancelable `MouseEvent` per name, in order.
pub(crate) fn dispatch_mouse_events(names: &[&str]) -> String {
    let names = serde_json::Value::from(names.to_vec()).to_string();
    format!(
        r#"for (const type of {names}) {{
    el.dispatchEvent(new MouseEvent(type, {{ bubbles: true, cancelable: true, view: window }}));
  }}
  return {{ value: true }};"#
    )
}

/// Finds the container carrying `identifier`, then the first descendant
/// matching `selector`, and tags it. Replies with the tag or `null`.
pub(crate) fn tag_within(
    container_selector: &str,
    identifier_attr: &str,
    identifier: &str,
    selector: &str,
    batch: u64,
) -> String {
    format!(
        r#"(() => {{
  const scope = Array.from(document.querySelectorAll({csel}))
    .find((c) => c.getAttribute({attr}) === {id});
  if (!scope) return null;
  const el = scope.querySelector({sel});
  if (!el) return null;
  const handle = "{batch}-0";
  el.setAttribute({hattr}, handle);
  return handle;
}})()"#,
        csel = lit(container_selector),
        attr = lit(identifier_attr),
        id = lit(identifier),
        sel = lit(selector),
        hattr = lit(HANDLE_ATTR),
    )
}

/// Tags the first element matching `selector` if it is rendered and not
/// hidden. Replies with the tag or `null`.
pub(crate) fn tag_if_visible(selector: &str, batch: u64) -> String {
    format!(
        r#"(() => {{
  const el = document.querySelector({sel});
  if (!el) return null;
  const style = window.getComputedStyle(el);
  const rect = el.getBoundingClientRect();
  if (style.display === "none" || style.visibility === "hidden") return null;
  if (rect.width === 0 || rect.height === 0) return null;
  const handle = "{batch}-0";
  el.setAttribute({hattr}, handle);
  return handle;
}})()"#,
        sel = lit(selector),
        hattr = lit(HANDLE_ATTR),
    )
}

pub(crate) fn all_identifiers(identifier_attr: &str) -> String {
    format!(
        r#"(() => {{
  const attr = {attr};
  return Array.from(document.querySelectorAll("[" + attr + "]"))
    .map((el) => el.getAttribute(attr))
    .filter(Boolean);
}})()"#,
        attr = lit(identifier_attr),
    )
}
