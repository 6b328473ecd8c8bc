use std::thread;

use cart_ledger::{CartError, InMemoryRecordStore};

use crate::support::{fast_config, seeded};

#[test]
fn contended_reservations_never_oversell() {
    let coordinator = seeded(InMemoryRecordStore::new(), fast_config(200), &[("sku-1", 5)]);
    let users: Vec<String> = (0..12).map(|i| format!("user-{}", i)).collect();

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = users
            .iter()
            .map(|user| {
                let coordinator = &coordinator;
                scope.spawn(move || (user, coordinator.adjust_cart_item(user, "sku-1", 1)))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut committed = 0;
    for (user, result) in &results {
        match result {
            Ok(cart) => {
                committed += 1;
                assert_eq!(cart.quantity_of("sku-1"), 1);
                assert_eq!(&coordinator.get_cart(user).unwrap(), cart);
            }
            Err(CartError::InsufficientStock { .. }) | Err(CartError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error for {}: {}", user, other),
        }
    }

    let product = coordinator.get_product("sku-1").unwrap();
    assert_eq!(product.stock + product.reserved, 5);
    assert_eq!(product.reserved, committed);
    assert_eq!(product.version, 1 + committed);
    assert!(committed <= 5);
}

#[test]
fn same_user_concurrent_adds_all_land() {
    let coordinator = seeded(InMemoryRecordStore::new(), fast_config(500), &[("sku-1", 100)]);

    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = &coordinator;
                scope.spawn(move || coordinator.adjust_cart_item("user-1", "sku-1", 1))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let committed = results.iter().filter(|r| r.is_ok()).count() as u64;
    for result in &results {
        if let Err(err) = result {
            assert!(matches!(err, CartError::Conflict(_)), "unexpected {}", err);
        }
    }

    let cart = coordinator.get_cart("user-1").unwrap();
    let product = coordinator.get_product("sku-1").unwrap();
    assert_eq!(u64::from(cart.quantity_of("sku-1")), committed);
    assert_eq!(product.reserved, committed);
    assert_eq!(product.stock, 100 - committed);
    // Created at version 1, then one bump per committed adjustment.
    assert_eq!(cart.version, 1 + committed);
}

#[test]
fn disjoint_carts_and_products_do_not_interfere() {
    let coordinator = seeded(
        InMemoryRecordStore::new(),
        fast_config(5),
        &[("sku-a", 10), ("sku-b", 10), ("sku-c", 10)],
    );

    thread::scope(|scope| {
        for (user, product) in [("user-a", "sku-a"), ("user-b", "sku-b"), ("user-c", "sku-c")] {
            let coordinator = &coordinator;
            scope.spawn(move || {
                for _ in 0..4 {
                    coordinator.adjust_cart_item(user, product, 2).unwrap();
                }
                coordinator.adjust_cart_item(user, product, -3).unwrap();
            });
        }
    });

    for (user, product_id) in [("user-a", "sku-a"), ("user-b", "sku-b"), ("user-c", "sku-c")] {
        let cart = coordinator.get_cart(user).unwrap();
        assert_eq!(cart.quantity_of(product_id), 5);
        assert_eq!(cart.version, 6);

        let product = coordinator.get_product(product_id).unwrap();
        assert_eq!((product.stock, product.reserved, product.version), (5, 5, 6));
    }
}
