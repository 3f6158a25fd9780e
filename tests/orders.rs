mod support;

use medimart_orderservice::{
    app_error::AppError,
    domain::{OrderEventKind, OrderStatus, PaymentMethod, PaymentStatus},
    services::orders::CreateOrder,
};
use support::TestApp;
use uuid::Uuid;

fn checkout(payment_method: &str) -> CreateOrder {
    CreateOrder {
        delivery_address: "221B Baker Street".to_string(),
        phone: "+91 90000 00000".to_string(),
        payment_method: payment_method.to_string(),
    }
}

#[tokio::test]
async fn below_minimum_order_leaves_cart_and_stock_untouched() {
    let app = TestApp::new();
    let pharmacy = app.pharmacy(200.0).await;
    let medicine = app.medicine(pharmacy.id, 50.0, 100).await;
    let user_id = Uuid::new_v4();

    app.state.carts.add(user_id, medicine.id, 3).await.unwrap();

    let result = app
        .state
        .orders
        .create_from_cart(user_id, checkout("cod"))
        .await;

    assert!(matches!(result, Err(AppError::InvalidState(_))));
    assert_eq!(app.store.cart(user_id).await.unwrap().total_amount, 150.0);
    assert_eq!(app.store.medicine(medicine.id).await.unwrap().stock_quantity, 100);
    assert!(app.events.events().await.is_empty());
}

#[tokio::test]
async fn cash_on_delivery_consumes_cart_and_stock() {
    let app = TestApp::new();
    let pharmacy = app.pharmacy(200.0).await;
    let a = app.medicine(pharmacy.id, 50.0, 100).await;
    let b = app.medicine(pharmacy.id, 75.0, 10).await;
    let user_id = Uuid::new_v4();

    app.state.carts.add(user_id, a.id, 4).await.unwrap();
    app.state.carts.add(user_id, b.id, 2).await.unwrap();

    let order = app
        .state
        .orders
        .create_from_cart(user_id, checkout("cod"))
        .await
        .unwrap();

    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.payment_method, PaymentMethod::Cod);
    assert_eq!(order.payment_status, PaymentStatus::Completed);
    assert_eq!(order.total_amount, 350.0);
    assert_eq!(order.items.len(), 2);

    assert!(app.store.cart(user_id).await.is_none());
    assert_eq!(app.store.medicine(a.id).await.unwrap().stock_quantity, 96);
    assert_eq!(app.store.medicine(b.id).await.unwrap().stock_quantity, 8);
    assert!(app.store.order(order.id).await.unwrap().fulfilled_at.is_some());
}

#[tokio::test]
async fn failed_cash_on_delivery_checkout_leaves_nothing_behind() {
    let app = TestApp::with_failing_fulfillment(1);
    let pharmacy = app.pharmacy(100.0).await;
    let medicine = app.medicine(pharmacy.id, 50.0, 100).await;
    let user_id = Uuid::new_v4();

    app.state.carts.add(user_id, medicine.id, 4).await.unwrap();

    let result = app
        .state
        .orders
        .create_from_cart(user_id, checkout("cod"))
        .await;

    assert!(matches!(result, Err(AppError::Other(_))));
    assert!(app.state.orders.list(user_id).await.unwrap().is_empty());
    assert_eq!(app.store.cart(user_id).await.unwrap().total_amount, 200.0);
    assert_eq!(app.store.medicine(medicine.id).await.unwrap().stock_quantity, 100);
    assert!(app.events.events().await.is_empty());

    // Retrying the checkout places exactly one order.
    let order = app
        .state
        .orders
        .create_from_cart(user_id, checkout("cod"))
        .await
        .unwrap();

    assert!(order.fulfilled_at.is_some());
    assert_eq!(app.state.orders.list(user_id).await.unwrap().len(), 1);
    assert!(app.store.cart(user_id).await.is_none());
    assert_eq!(app.store.medicine(medicine.id).await.unwrap().stock_quantity, 96);
    assert_eq!(app.events.events().await.len(), 1);
}

#[tokio::test]
async fn online_order_waits_for_payment() {
    let app = TestApp::new();
    let pharmacy = app.pharmacy(100.0).await;
    let medicine = app.medicine(pharmacy.id, 60.0, 20).await;
    let user_id = Uuid::new_v4();

    app.state.carts.add(user_id, medicine.id, 2).await.unwrap();

    let order = app
        .state
        .orders
        .create_from_cart(user_id, checkout("online"))
        .await
        .unwrap();

    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert!(order.fulfilled_at.is_none());
    assert!(app.store.cart(user_id).await.is_some());
    assert_eq!(app.store.medicine(medicine.id).await.unwrap().stock_quantity, 20);
}

#[tokio::test]
async fn order_creation_is_announced_to_its_owner() {
    let app = TestApp::new();
    let pharmacy = app.pharmacy(0.0).await;
    let medicine = app.medicine(pharmacy.id, 10.0, 5).await;
    let user_id = Uuid::new_v4();

    app.state.carts.add(user_id, medicine.id, 1).await.unwrap();
    let order = app
        .state
        .orders
        .create_from_cart(user_id, checkout("online"))
        .await
        .unwrap();

    let events = app.events.events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, OrderEventKind::Created);
    assert_eq!(events[0].order_id, order.id);
    assert_eq!(events[0].user_id, user_id);
    assert_eq!(events[0].status, OrderStatus::Placed);
}

#[tokio::test]
async fn checkout_input_is_validated() {
    let app = TestApp::new();
    let pharmacy = app.pharmacy(0.0).await;
    let medicine = app.medicine(pharmacy.id, 10.0, 5).await;
    let user_id = Uuid::new_v4();

    let result = app
        .state
        .orders
        .create_from_cart(user_id, checkout("cod"))
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    app.state.carts.add(user_id, medicine.id, 1).await.unwrap();
    let result = app
        .state
        .orders
        .create_from_cart(user_id, checkout("cheque"))
        .await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));
    assert!(app.store.cart(user_id).await.is_some());
}

#[tokio::test]
async fn orders_are_scoped_to_their_owner() {
    let app = TestApp::new();
    let pharmacy = app.pharmacy(0.0).await;
    let medicine = app.medicine(pharmacy.id, 10.0, 50).await;
    let user_id = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    app.state.carts.add(user_id, medicine.id, 1).await.unwrap();
    let first = app
        .state
        .orders
        .create_from_cart(user_id, checkout("cod"))
        .await
        .unwrap();
    app.state.carts.add(user_id, medicine.id, 2).await.unwrap();
    let second = app
        .state
        .orders
        .create_from_cart(user_id, checkout("cod"))
        .await
        .unwrap();

    let orders = app.state.orders.list(user_id).await.unwrap();
    let ids: Vec<Uuid> = orders.iter().map(|order| order.id).collect();
    assert_eq!(ids, vec![second.id, first.id]);

    assert_eq!(app.state.orders.get(first.id, user_id).await.unwrap().id, first.id);
    let result = app.state.orders.get(first.id, stranger).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    assert!(app.state.orders.list(stranger).await.unwrap().is_empty());
}

#[tokio::test]
async fn status_updates_are_validated_and_announced() {
    let app = TestApp::new();
    let pharmacy = app.pharmacy(0.0).await;
    let medicine = app.medicine(pharmacy.id, 10.0, 5).await;
    let user_id = Uuid::new_v4();

    app.state.carts.add(user_id, medicine.id, 1).await.unwrap();
    let order = app
        .state
        .orders
        .create_from_cart(user_id, checkout("cod"))
        .await
        .unwrap();

    let result = app.state.orders.update_status(order.id, "shipped").await;
    assert!(matches!(result, Err(AppError::InvalidInput(_))));

    let result = app
        .state
        .orders
        .update_status(Uuid::new_v4(), "confirmed")
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    let updated = app
        .state
        .orders
        .update_status(order.id, "out_for_delivery")
        .await
        .unwrap();
    assert_eq!(updated.status, OrderStatus::OutForDelivery);

    let events = app.events.events().await;
    let last = events.last().unwrap();
    assert_eq!(last.kind, OrderEventKind::StatusUpdated);
    assert_eq!(last.status, OrderStatus::OutForDelivery);
    assert_eq!(last.user_id, user_id);
}
