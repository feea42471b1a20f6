use std::str::FromStr;

use cucumber::{given, then, when};
use settlement_engine::{
    db_types::{Cfa, NewProfile, PaymentMethod, PayoutRequestStatus, PayoutStatus, Role, UserId},
    order_objects::{CartItem, CheckoutOptions},
    LedgerManagement,
    SettlementDatabase,
};

use crate::{cucumber::SettlementWorld, support::prepare_env::fund_wallet};

#[given(expr = "a(n) {word} profile '{word}'")]
async fn create_profile(world: &mut SettlementWorld, role: String, id: String) {
    let role = Role::from_str(&role).expect("Invalid role");
    world.system().db.upsert_profile(NewProfile::new(id, role)).await.expect("Error creating profile");
}

#[given(expr = "a(n) {word} profile '{word}' with a commission rate of {float}")]
async fn create_profile_with_rate(world: &mut SettlementWorld, role: String, id: String, rate: f64) {
    let role = Role::from_str(&role).expect("Invalid role");
    let profile = NewProfile::new(id, role).with_commission_rate(rate);
    world.system().db.upsert_profile(profile).await.expect("Error creating profile");
}

#[given(expr = "'{word}' has {int} FCFA in their wallet")]
async fn given_wallet_balance(world: &mut SettlementWorld, id: String, amount: i64) {
    fund_wallet(&world.system().db, &UserId::from(id), amount).await;
}

#[when(expr = "'{word}' adds {int} x '{word}' at {int} FCFA from '{word}' to their cart")]
async fn add_to_cart(world: &mut SettlementWorld, buyer: String, qty: i64, product: String, price: i64, seller: String) {
    let seller = (seller != "nobody").then(|| UserId::from(seller));
    let item = CartItem::new(product, seller, qty, Cfa::from(price));
    world.system_mut().carts.entry(UserId::from(buyer)).or_default().push(item);
}

#[when(expr = "'{word}' checks out with {word}")]
async fn checkout(world: &mut SettlementWorld, buyer: String, method: String) {
    let method = PaymentMethod::from_str(&method).expect("Invalid payment method");
    let buyer = UserId::from(buyer);
    let system = world.system_mut();
    let items = system.carts.remove(&buyer).unwrap_or_default();
    let result =
        system.order_flow().split_and_create_orders(&buyer, method, items, CheckoutOptions::default()).await;
    match result {
        Ok(checkout) => {
            system.last_checkout = Some(checkout);
            system.last_error = None;
        },
        Err(e) => system.last_error = Some(e),
    }
}

#[when(expr = "the buyer pays from phone '{word}'")]
async fn initiate_payment(world: &mut SettlementWorld, phone: String) {
    let system = world.system_mut();
    let checkout = system.checkout();
    let response = system.gateway().initiate(checkout.total(), &phone, &checkout.payment_ref).await;
    assert!(response.success, "Payment initiation failed: {response:?}");
    system.last_transaction_id = response.transaction_id;
}

#[when(expr = "the payment processor reports {string}")]
async fn processor_callback(world: &mut SettlementWorld, status: String) {
    let system = world.system();
    let txid = system.last_transaction_id.as_deref().expect("No payment has been initiated");
    let response = system.gateway().callback(Some(txid), None, &status).await;
    assert!(response.success, "Callback failed: {response:?}");
}

#[when(expr = "'{word}' confirms delivery of the order from '{word}'")]
async fn confirm_delivery(world: &mut SettlementWorld, actor: String, seller: String) {
    let system = world.system_mut();
    let order_id = system.order_for_seller(&seller).id;
    match system.escrow().mark_delivered(order_id, &UserId::from(actor)).await {
        Ok(_) => system.last_error = None,
        Err(e) => system.last_error = Some(e),
    }
}

#[when(expr = "'{word}' requests a payout of {int} FCFA to {word} number '{word}'")]
async fn request_payout(world: &mut SettlementWorld, seller: String, amount: i64, method: String, phone: String) {
    let method = PaymentMethod::from_str(&method).expect("Invalid payment method");
    let system = world.system_mut();
    let result = system.payouts().request_payout(&UserId::from(seller), Cfa::from(amount), method, &phone).await;
    match result {
        Ok((request, _)) => {
            system.last_payout_request = Some(request);
            system.last_error = None;
        },
        Err(e) => system.last_error = Some(e),
    }
}

#[when(expr = "admin '{word}' {word} the payout request")]
async fn resolve_payout(world: &mut SettlementWorld, admin: String, decision: String) {
    let system = world.system_mut();
    let id = system.last_payout_request.as_ref().expect("No payout request").id;
    let admin = UserId::from(admin);
    let api = system.payouts();
    let result = match decision.as_str() {
        "approves" => api.approve(id, &admin).await,
        "rejects" => api.reject(id, &admin).await,
        _ => panic!("Unknown decision {decision}"),
    };
    match result {
        Ok(resolution) => {
            system.last_payout_request = Some(resolution.request);
            system.last_error = None;
        },
        Err(e) => system.last_error = Some(e),
    }
}

#[then(expr = "the checkout creates {int} order(s)")]
async fn check_order_count(world: &mut SettlementWorld, count: usize) {
    assert_eq!(world.system().checkout().orders.len(), count, "Wrong number of orders");
}

#[then(expr = "the order from '{word}' has a total of {int}, a commission of {int} and a seller amount of {int}")]
async fn check_order_split(world: &mut SettlementWorld, seller: String, total: i64, commission: i64, net: i64) {
    let order = world.system().order_for_seller(&seller);
    assert_eq!(order.total_amount, Cfa::from(total), "Total is incorrect");
    assert_eq!(order.commission_amount, Cfa::from(commission), "Commission is incorrect");
    assert_eq!(order.seller_amount, Cfa::from(net), "Seller amount is incorrect");
}

#[then(expr = "the order from '{word}' has payout status {word} and {int} FCFA in escrow")]
async fn check_payout_status(world: &mut SettlementWorld, seller: String, status: String, escrow: i64) {
    let system = world.system();
    let id = system.order_for_seller(&seller).id;
    let order = system.db.fetch_order(id).await.expect("Error fetching order").expect("Order does not exist");
    let expected = PayoutStatus::from_str(&status).expect("Invalid payout status");
    assert_eq!(order.payout_status, expected, "Payout status is incorrect");
    assert_eq!(order.escrow_amount, Cfa::from(escrow), "Escrow amount is incorrect");
}

#[then(expr = "'{word}' has a wallet balance of {int} FCFA")]
async fn check_balance(world: &mut SettlementWorld, id: String, amount: i64) {
    let profile = world
        .system()
        .db
        .fetch_profile(&UserId::from(id))
        .await
        .expect("Error fetching profile")
        .expect("Profile does not exist");
    assert_eq!(profile.wallet_balance, Cfa::from(amount), "Wallet balance is incorrect");
}

#[then(expr = "the wallet of '{word}' reconciles with its ledger")]
async fn check_reconciliation(world: &mut SettlementWorld, id: String) {
    let reconciliation = world.system().wallets().reconcile(&UserId::from(id)).await.expect("Error reconciling");
    assert!(reconciliation.is_consistent, "Ledger does not match the balance: {reconciliation:?}");
}

#[then(expr = "the payout request is {word}")]
async fn check_payout_request(world: &mut SettlementWorld, status: String) {
    let expected = PayoutRequestStatus::from_str(&status).expect("Invalid payout request status");
    let request = world.system().last_payout_request.as_ref().expect("No payout request");
    assert_eq!(request.status, expected, "Payout request status is incorrect");
}

#[then(expr = "the last operation fails with {string}")]
async fn check_error(world: &mut SettlementWorld, message: String) {
    let err = world.system().last_error.as_ref().expect("The last operation did not fail");
    assert!(err.to_string().contains(&message), "Unexpected error: {err}");
}
