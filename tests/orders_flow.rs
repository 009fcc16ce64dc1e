mod common;

use rust_decimal::{Decimal, dec};
use sea_orm::{IntoActiveModel, Set};
use shop_backoffice_api::{
    dto::orders::GuestLookupRequest,
    entity::{coupons::CouponType, users::Role},
    error::AppError,
    repo::{coupon_repo, product_repo},
    services::order_service,
};

#[tokio::test]
async fn order_snapshots_prices_and_decrements_stock() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let buyer = common::seed_user(&state, Role::User).await?;
    let product = common::seed_product(&state, dec!(9.99), 5).await?;

    let placed = order_service::place_order(
        &state,
        Some(&buyer),
        common::order_request(&[(product.id, 2)]),
    )
    .await?
    .data
    .expect("order data");

    assert_eq!(placed.order.total_amount, dec!(19.98));
    assert_eq!(placed.order.final_amount, dec!(19.98));
    assert_eq!(placed.order.user_id, Some(buyer.user_id));
    assert!(!placed.order.is_guest_order);
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].price, dec!(9.99));

    let after = product_repo::get_by_id(&state.orm, product.id).await?;
    assert_eq!(after.stock, 3);

    // Later price changes do not touch the stored line.
    let mut active = after.into_active_model();
    active.price = Set(dec!(20.00));
    product_repo::update(&state.orm, active).await?;

    let tracked = order_service::track_order(&state, &placed.order.order_number)
        .await?
        .data
        .expect("tracked order");
    assert_eq!(tracked.items[0].price, dec!(9.99));
    assert_eq!(tracked.items[0].total, dec!(19.98));
    Ok(())
}

#[tokio::test]
async fn out_of_stock_line_rolls_back_the_whole_order() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let plenty = common::seed_product(&state, dec!(10), 5).await?;
    let scarce = common::seed_product(&state, dec!(10), 1).await?;
    let request = common::order_request(&[(plenty.id, 2), (scarce.id, 2)]);
    let email = request.customer_email.clone();

    let err = order_service::place_order(&state, None, request)
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::OutOfStock { product_id } if product_id == scarce.id),
        "unexpected error: {err:?}"
    );

    assert_eq!(product_repo::get_by_id(&state.orm, plenty.id).await?.stock, 5);
    assert_eq!(product_repo::get_by_id(&state.orm, scarce.id).await?.stock, 1);

    let found = order_service::lookup_guest_orders(
        &state,
        GuestLookupRequest {
            email_or_phone: email,
        },
    )
    .await?
    .data
    .expect("lookup data");
    assert!(found.items.is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_orders_cannot_oversell() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let product = common::seed_product(&state, dec!(50), 1).await?;

    let requests: Vec<_> = (0..2)
        .map(|_| common::order_request(&[(product.id, 1)]))
        .collect();
    let emails: Vec<String> = requests.iter().map(|r| r.customer_email.clone()).collect();

    let tasks: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let state = state.clone();
            tokio::spawn(async move { order_service::place_order(&state, None, request).await })
        })
        .collect();

    let mut placed = 0;
    let mut rejected = 0;
    for task in tasks {
        match task.await? {
            Ok(_) => placed += 1,
            Err(AppError::OutOfStock { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!((placed, rejected), (1, 1));
    assert_eq!(product_repo::get_by_id(&state.orm, product.id).await?.stock, 0);

    // The rejected order's row was inserted before its stock check and must be gone.
    let mut stored = 0;
    for email in emails {
        stored += order_service::lookup_guest_orders(
            &state,
            GuestLookupRequest {
                email_or_phone: email,
            },
        )
        .await?
        .data
        .expect("lookup data")
        .items
        .len();
    }
    assert_eq!(stored, 1);
    Ok(())
}

#[tokio::test]
async fn percentage_coupon_is_capped_and_redeemed() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let product = common::seed_product(&state, dec!(100), 10).await?;
    let coupon =
        common::seed_coupon(&state, CouponType::Percentage, dec!(10), Some(dec!(5)), 10).await?;

    let mut request = common::order_request(&[(product.id, 1)]);
    request.coupon_code = Some(coupon.code.to_lowercase());

    let placed = order_service::place_order(&state, None, request)
        .await?
        .data
        .expect("order data");
    assert_eq!(placed.order.total_amount, dec!(100));
    assert_eq!(placed.order.discount_amount, dec!(5));
    assert_eq!(
        placed.order.final_amount,
        dec!(95) + state.config.shipping_fee
    );
    assert_eq!(placed.order.coupon_code.as_deref(), Some(coupon.code.as_str()));

    let redeemed = coupon_repo::get_by_id(&state.orm, coupon.id).await?;
    assert_eq!(redeemed.used_count, 1);
    Ok(())
}

#[tokio::test]
async fn exhausted_coupon_rejects_the_order() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let product = common::seed_product(&state, dec!(40), 3).await?;
    let coupon = common::seed_coupon(&state, CouponType::Fixed, dec!(10), None, 1).await?;
    let mut active = coupon.clone().into_active_model();
    active.used_count = Set(1);
    coupon_repo::update(&state.orm, active).await?;

    let mut request = common::order_request(&[(product.id, 1)]);
    request.coupon_code = Some(coupon.code.clone());

    let err = order_service::place_order(&state, None, request)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "unexpected error: {err:?}");
    assert_eq!(product_repo::get_by_id(&state.orm, product.id).await?.stock, 3);

    let mut request = common::order_request(&[(product.id, 1)]);
    request.coupon_code = Some("NO-SUCH-CODE".into());
    let err = order_service::place_order(&state, None, request)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "unexpected error: {err:?}");
    Ok(())
}

#[tokio::test]
async fn guest_orders_are_tracked_and_looked_up() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let product = common::seed_product(&state, dec!(12.50), 10).await?;
    let buyer = common::seed_user(&state, Role::User).await?;

    let guest_request = common::order_request(&[(product.id, 1)]);
    let email = guest_request.customer_email.clone();
    let guest = order_service::place_order(&state, None, guest_request)
        .await?
        .data
        .expect("guest order");
    assert!(guest.order.is_guest_order);
    assert_eq!(guest.order.user_id, None);
    assert_eq!(guest.order.billing_address, guest.order.shipping_address);

    // A registered order with the same contact never shows up in guest lookup.
    let mut registered_request = common::order_request(&[(product.id, 1)]);
    registered_request.customer_email = email.clone();
    order_service::place_order(&state, Some(&buyer), registered_request).await?;

    let tracked = order_service::track_order(&state, &guest.order.order_number)
        .await?
        .data
        .expect("tracked order");
    assert_eq!(tracked.order.id, guest.order.id);

    let found = order_service::lookup_guest_orders(
        &state,
        GuestLookupRequest {
            email_or_phone: email.to_uppercase(),
        },
    )
    .await?
    .data
    .expect("lookup data");
    assert_eq!(found.items.len(), 1);
    assert_eq!(found.items[0].order.id, guest.order.id);
    assert_eq!(found.items[0].items.len(), 1);

    let missing = order_service::track_order(&state, "ORD-00000000000000-NOPE").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn orders_are_private_to_their_owner() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let product = common::seed_product(&state, dec!(5), 10).await?;
    let owner = common::seed_user(&state, Role::User).await?;
    let stranger = common::seed_user(&state, Role::User).await?;
    let admin = common::seed_user(&state, Role::Admin).await?;

    let placed = order_service::place_order(
        &state,
        Some(&owner),
        common::order_request(&[(product.id, 1)]),
    )
    .await?
    .data
    .expect("order data");
    let id = placed.order.id;

    assert!(order_service::get_order(&state, &owner, id).await.is_ok());
    assert!(order_service::get_order(&state, &admin, id).await.is_ok());
    assert!(matches!(
        order_service::get_order(&state, &stranger, id).await,
        Err(AppError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn unknown_or_inactive_products_are_not_orderable() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let product = common::seed_product(&state, dec!(5), 10).await?;
    let mut active = product.clone().into_active_model();
    active.is_active = Set(false);
    product_repo::update(&state.orm, active).await?;

    for product_id in [product.id, i64::MAX] {
        let err = order_service::place_order(
            &state,
            None,
            common::order_request(&[(product_id, 1)]),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)), "unexpected error: {err:?}");
    }
    assert_eq!(
        product_repo::get_by_id(&state.orm, product.id).await?.stock,
        10
    );
    Ok(())
}

#[tokio::test]
async fn duplicate_lines_are_merged() -> anyhow::Result<()> {
    let Some(state) = common::db_state().await? else {
        return Ok(());
    };
    let product = common::seed_product(&state, dec!(3), 10).await?;

    let placed = order_service::place_order(
        &state,
        None,
        common::order_request(&[(product.id, 2), (product.id, 3)]),
    )
    .await?
    .data
    .expect("order data");
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].quantity, 5);
    assert_eq!(placed.order.total_amount, Decimal::from(15));
    assert_eq!(product_repo::get_by_id(&state.orm, product.id).await?.stock, 5);
    Ok(())
}
