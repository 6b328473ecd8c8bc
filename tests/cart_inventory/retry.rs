use std::sync::atomic::Ordering;

use cart_ledger::{Cart, CartError, CartInventoryCoordinator, RecordsExt};

use crate::support::{fast_config, seeded, FaultyStore};

#[test]
fn injected_conflicts_are_retried() {
    let coordinator = seeded(
        FaultyStore::new().inject_conflicts(2),
        fast_config(5),
        &[("sku-1", 10)],
    );

    let cart = coordinator.adjust_cart_item("user-1", "sku-1", 3).unwrap();
    assert_eq!(cart.version, 2);
    assert_eq!(coordinator.store().transact_calls(), 3);

    let product = coordinator.get_product("sku-1").unwrap();
    assert_eq!((product.stock, product.reserved, product.version), (7, 3, 2));
}

#[test]
fn exhausted_retries_surface_conflict() {
    let coordinator = seeded(
        FaultyStore::new().inject_conflicts(10),
        fast_config(3),
        &[("sku-1", 10)],
    );

    let err = coordinator.adjust_cart_item("user-1", "sku-1", 3).unwrap_err();
    assert!(matches!(err, CartError::Conflict(_)));
    assert_eq!(coordinator.store().transact_calls(), 3);

    // Rejected attempts leave both records where they were.
    let product = coordinator.get_product("sku-1").unwrap();
    assert_eq!((product.stock, product.reserved, product.version), (10, 0, 1));

    // Cart creation is its own step and is kept, unmutated.
    let cart = coordinator.get_cart("user-1").unwrap();
    assert!(cart.is_empty());
    assert_eq!(cart.version, 1);
}

#[test]
fn storage_failures_are_not_retried() {
    let coordinator = seeded(FaultyStore::new().failing(), fast_config(5), &[("sku-1", 10)]);

    let err = coordinator.adjust_cart_item("user-1", "sku-1", 1).unwrap_err();
    assert_eq!(
        err,
        CartError::Storage("record storage error: store unreachable".into())
    );
    assert_eq!(coordinator.store().transact_calls(), 1);
    assert_eq!(coordinator.get_product("sku-1").unwrap().version, 1);
}

#[test]
fn validation_failures_never_reach_the_store() {
    let coordinator = seeded(FaultyStore::new(), fast_config(5), &[("sku-1", 2)]);

    assert!(coordinator.adjust_cart_item("user-1", "sku-1", -1).is_err());
    assert!(coordinator.adjust_cart_item("user-1", "sku-1", 3).is_err());
    assert!(coordinator.adjust_cart_item("user-1", "sku-9", 1).is_err());

    assert_eq!(coordinator.store().transact_calls(), 0);
    // Only the empty cart created on first use was written.
    let carts = coordinator.store().inner.records::<Cart>().all().unwrap();
    assert_eq!(carts, vec![Cart::new("user-1", "EUR")]);
    assert_eq!(coordinator.get_product("sku-1").unwrap().version, 1);
}

#[test]
fn racing_writer_forces_fresh_read() {
    let store = FaultyStore::new().before_transact(|inner| {
        // Another shopper reserves two units between our read and our commit.
        let rival = CartInventoryCoordinator::new(inner.clone());
        rival.adjust_cart_item("rival", "sku-1", 2).unwrap();
    });
    let coordinator = seeded(store, fast_config(5), &[("sku-1", 10)]);

    let cart = coordinator.adjust_cart_item("user-1", "sku-1", 3).unwrap();
    assert_eq!(cart.quantity_of("sku-1"), 3);
    // First attempt conflicted on the product, second committed.
    assert_eq!(coordinator.store().transact_calls(), 2);

    let product = coordinator.get_product("sku-1").unwrap();
    assert_eq!((product.stock, product.reserved, product.version), (5, 5, 3));
    assert_eq!(coordinator.get_cart("rival").unwrap().quantity_of("sku-1"), 2);
}

#[test]
fn racing_writer_can_exhaust_stock() {
    let store = FaultyStore::new().before_transact(|inner| {
        let rival = CartInventoryCoordinator::new(inner.clone());
        rival.adjust_cart_item("rival", "sku-1", 4).unwrap();
    });
    let coordinator = seeded(store, fast_config(5), &[("sku-1", 5)]);

    // Fresh read after the conflict shows only one unit left.
    let err = coordinator.adjust_cart_item("user-1", "sku-1", 2).unwrap_err();
    assert!(matches!(err, CartError::InsufficientStock { stock: 1, reserved: 4, .. }));

    let product = coordinator.get_product("sku-1").unwrap();
    assert_eq!((product.stock, product.reserved), (1, 4));
}

#[test]
fn duplicate_carts_are_an_integrity_error() {
    let coordinator = seeded(FaultyStore::new(), fast_config(5), &[("sku-1", 10)]);
    coordinator.adjust_cart_item("user-1", "sku-1", 1).unwrap();
    coordinator
        .store()
        .duplicate_carts
        .store(true, Ordering::SeqCst);

    let queries_before = coordinator.store().query_calls.load(Ordering::SeqCst);
    let err = coordinator.adjust_cart_item("user-1", "sku-1", 1).unwrap_err();
    assert!(matches!(err, CartError::Integrity(_)));
    // Not retried: a single read, no commit.
    assert_eq!(
        coordinator.store().query_calls.load(Ordering::SeqCst),
        queries_before + 1
    );
    assert_eq!(coordinator.store().transact_calls(), 1);

    assert!(matches!(
        coordinator.get_cart("user-1"),
        Err(CartError::Integrity(_))
    ));
}

#[test]
fn duplicating_store_fails_fresh_reads_too() {
    let coordinator = seeded(
        FaultyStore::new().duplicating_carts(),
        fast_config(5),
        &[("sku-1", 10)],
    );
    // No cart stored yet, so nothing to duplicate.
    let cart = coordinator.adjust_cart_item("user-1", "sku-1", 1).unwrap();
    assert_eq!(cart.version, 2);
    assert!(matches!(
        coordinator.get_cart("user-1"),
        Err(CartError::Integrity(_))
    ));
}
