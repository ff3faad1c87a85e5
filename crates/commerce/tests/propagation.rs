//! Price/stock propagation into carts.

mod common;

use common::{email, harness, money};

use pomelo_commerce::CommerceError;
use pomelo_core::{CartId, Money, ProductId};

#[tokio::test]
async fn product_update_reprices_every_cart_holding_it() {
    let h = harness();
    let keyboard = h.store.insert_product("Keyboard", money(1000), 10).await;
    let mouse = h.store.insert_product("Mouse", money(250), 10).await;
    let ada = email("ada@example.com");
    let grace = email("grace@example.com");
    let linus = email("linus@example.com");

    let ada_cart = h
        .carts
        .add_to_cart(&ada, keyboard.id, 2)
        .await
        .expect("ada adds keyboard");
    let grace_cart = {
        h.carts
            .add_to_cart(&grace, keyboard.id, 1)
            .await
            .expect("grace adds keyboard");
        h.carts
            .add_to_cart(&grace, mouse.id, 4)
            .await
            .expect("grace adds mouse")
    };
    // Linus never carted the keyboard and must not be touched.
    let linus_cart = h
        .carts
        .add_to_cart(&linus, mouse.id, 1)
        .await
        .expect("linus adds mouse");

    let updated = h
        .catalog
        .product_updated(keyboard.id, money(1500), 8)
        .await
        .expect("update");
    assert_eq!(updated.price, money(1500));
    assert_eq!(updated.stock_quantity, 8);

    let ada_after = h.carts.get_cart(&ada, ada_cart.id).await.expect("ada cart");
    assert_eq!(
        ada_after.lines.first().expect("line").unit_price,
        money(1500)
    );
    assert_eq!(ada_after.total_price, money(3000));

    let grace_after = h
        .carts
        .get_cart(&grace, grace_cart.id)
        .await
        .expect("grace cart");
    let grace_keyboard = grace_after
        .lines
        .iter()
        .find(|l| l.product_id == keyboard.id)
        .expect("keyboard line");
    assert_eq!(grace_keyboard.unit_price, money(1500));
    let grace_mouse = grace_after
        .lines
        .iter()
        .find(|l| l.product_id == mouse.id)
        .expect("mouse line");
    assert_eq!(grace_mouse.unit_price, money(250));
    assert_eq!(grace_after.total_price, money(2500));

    let linus_after = h
        .carts
        .get_cart(&linus, linus_cart.id)
        .await
        .expect("linus cart");
    assert_eq!(linus_after, linus_cart);
}

#[tokio::test]
async fn product_update_rejects_unknown_product() {
    let h = harness();

    let err = h
        .catalog
        .product_updated(ProductId::new(404), money(100), 1)
        .await
        .expect_err("unknown product");
    assert!(matches!(err, CommerceError::ProductNotFound(id) if id == ProductId::new(404)));
}

#[tokio::test]
async fn product_deletion_evicts_lines_and_fixes_totals() {
    let h = harness();
    let keyboard = h.store.insert_product("Keyboard", money(1000), 10).await;
    let mouse = h.store.insert_product("Mouse", money(250), 10).await;
    let ada = email("ada@example.com");
    let grace = email("grace@example.com");

    h.carts
        .add_to_cart(&ada, keyboard.id, 2)
        .await
        .expect("ada adds keyboard");
    let ada_cart = h
        .carts
        .add_to_cart(&ada, mouse.id, 1)
        .await
        .expect("ada adds mouse");
    let grace_cart = h
        .carts
        .add_to_cart(&grace, keyboard.id, 3)
        .await
        .expect("grace adds keyboard");

    let deleted = h
        .catalog
        .product_deleted(keyboard.id)
        .await
        .expect("delete");
    assert_eq!(deleted.id, keyboard.id);

    let ada_after = h.carts.get_cart(&ada, ada_cart.id).await.expect("ada cart");
    assert_eq!(ada_after.lines.len(), 1);
    assert_eq!(
        ada_after.lines.first().expect("line").product_id,
        mouse.id
    );
    assert_eq!(ada_after.total_price, money(250));

    // Grace's cart held only the deleted product; it stays behind, empty.
    let grace_after = h
        .carts
        .get_cart(&grace, grace_cart.id)
        .await
        .expect("grace cart");
    assert!(grace_after.lines.is_empty());
    assert_eq!(grace_after.total_price, Money::ZERO);

    let state = h.store.snapshot().await;
    assert!(!state.products.contains_key(&keyboard.id.as_i64()));
    assert!(
        state
            .cart_lines
            .values()
            .all(|line| line.product_id != keyboard.id)
    );
}

#[tokio::test]
async fn product_deletion_rejects_unknown_product() {
    let h = harness();

    let err = h
        .catalog
        .product_deleted(ProductId::new(404))
        .await
        .expect_err("unknown product");
    assert!(matches!(err, CommerceError::ProductNotFound(id) if id == ProductId::new(404)));
}

#[tokio::test]
async fn reconcile_requires_an_existing_cart_and_line() {
    let h = harness();
    let product = h.store.insert_product("Keyboard", money(1000), 10).await;
    let buyer = email("ada@example.com");

    let err = h
        .carts
        .reconcile_product_change(CartId::new(404), product.id)
        .await
        .expect_err("no such cart");
    assert!(matches!(err, CommerceError::CartNotFound(_)));

    let other = h.store.insert_product("Mouse", money(250), 10).await;
    let cart = h
        .carts
        .add_to_cart(&buyer, product.id, 1)
        .await
        .expect("add");

    // Reconciling a product the cart does not hold is an error when called
    // directly; the catalog fan-out skips it instead.
    let err = h
        .carts
        .reconcile_product_change(cart.id, other.id)
        .await
        .expect_err("cart has no line for this product");
    assert!(matches!(err, CommerceError::LineNotFound { product_id } if product_id == other.id));
}
