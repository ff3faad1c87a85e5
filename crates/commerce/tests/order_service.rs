//! Order placement transaction behavior.

mod common;

use common::{email, harness, money};

use pomelo_commerce::CommerceError;
use pomelo_commerce::store::{CommerceStore, StoreTx};
use pomelo_core::{AddressId, Money, OrderStatus};

#[tokio::test]
async fn place_order_freezes_cart_into_order_and_clears_it() {
    let h = harness();
    let product = h.store.insert_product("Keyboard", money(1000), 5).await;
    let address = h.store.insert_address("1 Main St", "Springfield").await;
    let buyer = email("ada@example.com");

    let cart = h
        .carts
        .add_to_cart(&buyer, product.id, 2)
        .await
        .expect("add");

    let order = h
        .orders
        .place_order(&buyer, address.id, "card")
        .await
        .expect("place order");

    assert_eq!(order.email, buyer);
    assert_eq!(order.status, OrderStatus::Accepted);
    assert_eq!(order.total_amount, money(2000));
    assert_eq!(order.payment_method, "card");
    assert_eq!(order.address.id, address.id);
    assert_eq!(order.lines.len(), 1);
    let line = order.lines.first().expect("one line");
    assert_eq!(line.quantity, 2);
    assert_eq!(line.ordered_product_price, money(1000));
    assert_eq!(line.line_total, money(2000));

    let state = h.store.snapshot().await;
    let stored = state
        .products
        .get(&product.id.as_i64())
        .expect("product survives");
    assert_eq!(stored.stock_quantity, 3);

    // The cart still exists but is empty with a zero total.
    let emptied = h.carts.get_cart(&buyer, cart.id).await.expect("cart");
    assert!(emptied.lines.is_empty());
    assert_eq!(emptied.total_price, Money::ZERO);
}

#[tokio::test]
async fn place_order_validates_inputs_before_writing() {
    let h = harness();
    let product = h.store.insert_product("Keyboard", money(1000), 5).await;
    let address = h.store.insert_address("1 Main St", "Springfield").await;
    let buyer = email("ada@example.com");

    // Payment method shorter than four characters.
    let err = h
        .orders
        .place_order(&buyer, address.id, "upi")
        .await
        .expect_err("method too short");
    assert!(matches!(err, CommerceError::InvalidPaymentMethod(_)));

    // No cart at all for this buyer.
    let err = h
        .orders
        .place_order(&buyer, address.id, "card")
        .await
        .expect_err("no cart");
    assert!(matches!(err, CommerceError::CartNotFound(_)));

    // Cart exists but was emptied back to zero lines.
    h.carts
        .add_to_cart(&buyer, product.id, 1)
        .await
        .expect("add");
    h.carts
        .update_line_quantity(&buyer, product.id, -1)
        .await
        .expect("empty the cart");
    let err = h
        .orders
        .place_order(&buyer, address.id, "card")
        .await
        .expect_err("empty cart");
    assert!(matches!(err, CommerceError::EmptyCart));

    // Unknown address.
    h.carts
        .add_to_cart(&buyer, product.id, 1)
        .await
        .expect("add again");
    let err = h
        .orders
        .place_order(&buyer, AddressId::new(404), "card")
        .await
        .expect_err("unknown address");
    assert!(matches!(err, CommerceError::AddressNotFound(id) if id == AddressId::new(404)));

    // None of the failures left an order behind.
    let state = h.store.snapshot().await;
    assert!(state.orders.is_empty());
    assert!(state.payments.is_empty());
    assert!(state.order_lines.is_empty());
}

#[tokio::test]
async fn failed_stock_decrement_rolls_back_everything() {
    let h = harness();
    let product = h.store.insert_product("Keyboard", money(1000), 5).await;
    let address = h.store.insert_address("1 Main St", "Springfield").await;
    let buyer = email("ada@example.com");

    let cart = h
        .carts
        .add_to_cart(&buyer, product.id, 5)
        .await
        .expect("add");

    // Stock shrinks between the cart check and checkout.
    let mut tx = h.store.begin().await.expect("begin");
    assert!(tx.decrement_stock(product.id, 3).await.expect("decrement"));
    tx.commit().await.expect("commit");

    let err = h
        .orders
        .place_order(&buyer, address.id, "card")
        .await
        .expect_err("cart wants 5, only 2 left");
    assert!(matches!(
        err,
        CommerceError::InsufficientStock {
            requested: 5,
            available: 2,
            ..
        }
    ));

    // No partial writes: no order, no payment, no frozen lines, cart intact,
    // and the failed attempt did not consume any stock.
    let state = h.store.snapshot().await;
    assert!(state.orders.is_empty());
    assert!(state.payments.is_empty());
    assert!(state.order_lines.is_empty());
    assert_eq!(
        state
            .products
            .get(&product.id.as_i64())
            .expect("product")
            .stock_quantity,
        2
    );

    let untouched = h.carts.get_cart(&buyer, cart.id).await.expect("cart");
    assert_eq!(untouched.lines.len(), 1);
    assert_eq!(untouched.total_price, money(5000));
}

#[tokio::test]
async fn racing_checkouts_on_the_last_unit_have_one_winner() {
    let h = harness();
    let product = h.store.insert_product("Keyboard", money(1000), 1).await;
    let address = h.store.insert_address("1 Main St", "Springfield").await;
    let ada = email("ada@example.com");
    let grace = email("grace@example.com");

    // Both buyers cart the last unit; adds only check stock, never reserve it.
    h.carts
        .add_to_cart(&ada, product.id, 1)
        .await
        .expect("ada adds");
    h.carts
        .add_to_cart(&grace, product.id, 1)
        .await
        .expect("grace adds");

    let ada_orders = h.orders.clone();
    let grace_orders = h.orders.clone();
    let ada_task = tokio::spawn({
        let ada = ada.clone();
        let address_id = address.id;
        async move { ada_orders.place_order(&ada, address_id, "card").await }
    });
    let grace_task = tokio::spawn({
        let grace = grace.clone();
        let address_id = address.id;
        async move { grace_orders.place_order(&grace, address_id, "card").await }
    });

    let ada_result = ada_task.await.expect("ada task");
    let grace_result = grace_task.await.expect("grace task");

    let wins = usize::from(ada_result.is_ok()) + usize::from(grace_result.is_ok());
    assert_eq!(wins, 1, "exactly one checkout may take the last unit");
    for result in [&ada_result, &grace_result] {
        if let Err(err) = result {
            assert!(matches!(err, CommerceError::InsufficientStock { .. }));
        }
    }

    let state = h.store.snapshot().await;
    assert_eq!(state.orders.len(), 1);
    assert_eq!(state.payments.len(), 1);
    assert_eq!(state.order_lines.len(), 1);
    assert_eq!(
        state
            .products
            .get(&product.id.as_i64())
            .expect("product")
            .stock_quantity,
        0
    );
}

#[tokio::test]
async fn order_lines_are_immune_to_later_catalog_changes() {
    let h = harness();
    let product = h.store.insert_product("Keyboard", money(1000), 5).await;
    let address = h.store.insert_address("1 Main St", "Springfield").await;
    let buyer = email("ada@example.com");

    h.carts
        .add_to_cart(&buyer, product.id, 2)
        .await
        .expect("add");
    let order = h
        .orders
        .place_order(&buyer, address.id, "card")
        .await
        .expect("place order");

    h.catalog
        .product_updated(product.id, money(9999), 50)
        .await
        .expect("update product");

    let mut tx = h.store.begin().await.expect("begin");
    let stored = tx
        .order(order.id)
        .await
        .expect("get order")
        .expect("order exists");
    let lines = tx.order_lines(order.id).await.expect("lines");

    assert_eq!(stored.total_amount, money(2000));
    assert_eq!(lines.len(), 1);
    assert_eq!(
        lines.first().expect("line").ordered_product_price,
        money(1000)
    );
}

#[tokio::test]
async fn second_checkout_needs_a_refilled_cart() {
    let h = harness();
    let product = h.store.insert_product("Keyboard", money(1000), 5).await;
    let address = h.store.insert_address("1 Main St", "Springfield").await;
    let buyer = email("ada@example.com");

    h.carts
        .add_to_cart(&buyer, product.id, 1)
        .await
        .expect("add");
    h.orders
        .place_order(&buyer, address.id, "card")
        .await
        .expect("first order");

    // The cart survives checkout empty, so a second checkout is rejected
    // until the buyer adds something again.
    let err = h
        .orders
        .place_order(&buyer, address.id, "card")
        .await
        .expect_err("cart is empty now");
    assert!(matches!(err, CommerceError::EmptyCart));

    h.carts
        .add_to_cart(&buyer, product.id, 2)
        .await
        .expect("refill");
    let order = h
        .orders
        .place_order(&buyer, address.id, "card")
        .await
        .expect("second order");
    assert_eq!(order.total_amount, money(2000));

    let state = h.store.snapshot().await;
    assert_eq!(state.orders.len(), 2);
    assert_eq!(
        state
            .products
            .get(&product.id.as_i64())
            .expect("product")
            .stock_quantity,
        2
    );
}
