use std::time::Duration;

use core_test_support::FakeDocument;
use core_test_support::id;
use core_test_support::ids;
use listmover_core::InteractiveSurface;
use listmover_core::config::Selectors;
use listmover_core::drain::DrainCursor;
use listmover_core::surface::SurfaceError;
use pretty_assertions::assert_eq;

#[tokio::test]
async fn yields_each_item_once_even_when_controls_survive() {
    let selectors = Selectors::default();
    let doc = FakeDocument::new().with_saved(&ids(&["a", "b", "c"]));
    let mut cursor = DrainCursor::new(
        &doc,
        &selectors.add_to_list,
        &selectors.saved_item_container,
        Duration::ZERO,
    );

    let mut seen = Vec::new();
    while let Some(item) = cursor.next().await.unwrap() {
        seen.push(item.identifier);
    }

    assert_eq!(seen, ids(&["a", "b", "c"]));
    assert_eq!(cursor.queries(), 4);
    assert_eq!(doc.find_all_calls(&selectors.add_to_list), 4);
}

#[tokio::test]
async fn requeries_after_every_mutation() {
    let selectors = Selectors::default();
    let doc = FakeDocument::new().with_cart(&ids(&["a", "b"]));
    let mut cursor = DrainCursor::new(
        &doc,
        &selectors.save_for_later,
        &selectors.cart_item_container,
        Duration::ZERO,
    );

    let first = cursor.next().await.unwrap().unwrap();
    doc.activate(&first.control).await.unwrap();

    let second = cursor.next().await.unwrap().unwrap();
    assert_eq!(second.identifier, id("b"));
    // The fresh handle is usable; the first one is not.
    doc.scroll_into_view(&second.control).await.unwrap();
    assert!(matches!(
        doc.scroll_into_view(&first.control).await,
        Err(SurfaceError::Stale(_))
    ));
    assert!(cursor.next().await.unwrap().is_none());
}

#[tokio::test]
async fn missing_identifier_surfaces_as_error() {
    let selectors = Selectors::default();
    let doc = FakeDocument::new()
        .with_saved(&ids(&["a"]))
        .with_unidentified(&id("a"));
    let mut cursor = DrainCursor::new(
        &doc,
        &selectors.add_to_list,
        &selectors.saved_item_container,
        Duration::ZERO,
    );

    assert!(matches!(
        cursor.next().await,
        Err(SurfaceError::MissingIdentifier)
    ));
}

#[tokio::test]
async fn skipping_cursor_passes_over_unresolvable_controls() {
    let selectors = Selectors::default();
    let doc = FakeDocument::new()
        .with_saved(&ids(&["a", "b"]))
        .with_unidentified(&id("a"));
    let mut cursor = DrainCursor::new(
        &doc,
        &selectors.add_to_list,
        &selectors.saved_item_container,
        Duration::ZERO,
    )
    .skip_unresolved();

    let item = cursor.next().await.unwrap().unwrap();
    assert_eq!(item.identifier, id("b"));
    assert_eq!(cursor.unresolved(), 1);
    assert!(cursor.next().await.unwrap().is_none());
    assert_eq!(cursor.unresolved(), 1);
}

#[tokio::test]
async fn skipping_cursor_still_fails_on_engine_errors() {
    let selectors = Selectors::default();
    let doc = FakeDocument::new()
        .with_saved(&ids(&["a"]))
        .with_engine_down_after(1);
    let mut cursor = DrainCursor::new(
        &doc,
        &selectors.add_to_list,
        &selectors.saved_item_container,
        Duration::ZERO,
    )
    .skip_unresolved();

    assert!(matches!(cursor.next().await, Err(SurfaceError::Engine(_))));
}

#[tokio::test]
async fn empty_document_yields_nothing() {
    let selectors = Selectors::default();
    let doc = FakeDocument::new();
    let mut cursor = DrainCursor::new(
        &doc,
        &selectors.save_for_later,
        &selectors.cart_item_container,
        Duration::ZERO,
    );

    assert!(cursor.next().await.unwrap().is_none());
    assert_eq!(cursor.queries(), 1);
}
