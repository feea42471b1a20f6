use std::{collections::BTreeMap, fmt::Debug};

use log::*;

use crate::{
    db_types::{
        Cfa,
        NewOrder,
        NewOrderItem,
        Order,
        OrderItem,
        OrderStatusType,
        PaymentMethod,
        PayoutStatus,
        UserId,
        UNKNOWN_SELLER,
    },
    events::{EventProducers, OrderPaidEvent},
    helpers::PaymentReference,
    se_api::order_objects::{CartItem, CheckoutOptions, CheckoutResult, OrderQueryFilter},
    traits::{SettlementDatabase, SettlementError},
};

/// `OrderFlowApi` turns a buyer's cart into orders.
///
/// A cart may hold products from several sellers. It is split into one order per seller, each with its own commission
/// split, and all the orders of a checkout share one payment reference.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: SettlementDatabase
{
    /// Splits the cart by seller and persists one order per seller.
    ///
    /// * Wallet checkouts are all-or-nothing. The buyer is debited for the whole cart and every order is created in
    ///   one transaction, or nothing happens at all (e.g. if the balance is too low).
    /// * Mobile-money checkouts create each seller order independently. Retrying with the same payment reference
    ///   only creates the orders that are missing, and returns the full set.
    ///
    /// The cart is validated before anything is written.
    pub async fn split_and_create_orders(
        &self,
        buyer: &UserId,
        payment_method: PaymentMethod,
        items: Vec<CartItem>,
        options: CheckoutOptions,
    ) -> Result<CheckoutResult, SettlementError> {
        let payment_ref = match options.payment_ref.clone() {
            Some(r) => r,
            None => self.unused_purchase_reference(buyer).await?,
        };
        let new_orders = self.price_cart(buyer, payment_method, items, &payment_ref, options.status).await?;
        trace!("🔄️ Cart for {buyer} split into {} seller orders under [{payment_ref}]", new_orders.len());
        let (orders, wallet_debit) = if payment_method.is_wallet() {
            let checkout = self.db.wallet_checkout(buyer, new_orders).await?;
            (checkout.orders, Some(checkout.debit))
        } else {
            let mut orders = Vec::with_capacity(new_orders.len());
            for order in new_orders {
                let (order, _inserted) = self.db.insert_order(order, buyer.as_str()).await?;
                orders.push(order);
            }
            (orders, None)
        };
        self.call_order_paid_hook(&orders).await;
        debug!("🔄️ Checkout [{payment_ref}] for {buyer} complete. {} orders.", orders.len());
        Ok(CheckoutResult { payment_ref, orders, wallet_debit, payment: None })
    }

    /// Validates the cart and prices one [`NewOrder`] per seller. Nothing is written.
    ///
    /// Items without a seller are grouped together under the unknown seller and charged the default commission.
    pub async fn price_cart(
        &self,
        buyer: &UserId,
        payment_method: PaymentMethod,
        items: Vec<CartItem>,
        payment_ref: &str,
        status: Option<OrderStatusType>,
    ) -> Result<Vec<NewOrder>, SettlementError> {
        validate_cart(&items)?;
        let status = status.unwrap_or(if payment_method.is_wallet() {
            OrderStatusType::Paid
        } else {
            OrderStatusType::Pending
        });
        let mut groups: BTreeMap<Option<UserId>, Vec<NewOrderItem>> = BTreeMap::new();
        for item in items {
            groups.entry(item.seller_id.clone()).or_default().push(item.into());
        }
        let mut orders = Vec::with_capacity(groups.len());
        for (seller_id, items) in groups {
            let rate = match &seller_id {
                Some(seller) => self.db.resolve_commission_rate(seller).await?,
                None => Default::default(),
            };
            let total_amount = items
                .iter()
                .map(|i| i.line_total())
                .collect::<Option<Vec<Cfa>>>()
                .and_then(Cfa::checked_sum)
                .ok_or_else(|| SettlementError::InvalidCartItem(CART_TOO_LARGE.into()))?;
            let (commission_amount, seller_amount) = rate.split(total_amount);
            let (payout_status, escrow_amount) = match status {
                OrderStatusType::Pending => (PayoutStatus::Pending, Cfa::default()),
                _ => (PayoutStatus::Escrow, seller_amount),
            };
            trace!(
                "🔄️ Seller {}: total {total_amount}, commission {commission_amount} at {rate}",
                seller_id.as_ref().map(|s| s.as_str()).unwrap_or(UNKNOWN_SELLER)
            );
            orders.push(NewOrder {
                buyer_id: buyer.clone(),
                seller_id,
                payment_method,
                payment_ref: payment_ref.to_string(),
                status,
                payout_status,
                total_amount,
                commission_rate: rate,
                commission_amount,
                seller_amount,
                escrow_amount,
                items,
            });
        }
        Ok(orders)
    }

    pub async fn fetch_order(&self, id: i64) -> Result<Option<Order>, SettlementError> {
        self.db.fetch_order(id).await
    }

    pub async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementError> {
        self.db.fetch_order_items(order_id).await
    }

    pub async fn orders_for_payment_ref(&self, payment_ref: &str) -> Result<Vec<Order>, SettlementError> {
        self.db.fetch_orders_for_payment_ref(payment_ref).await
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, SettlementError> {
        trace!("🔄️ Searching orders. {query}");
        self.db.search_orders(query).await
    }

    /// A fresh checkout reference that no order uses yet.
    async fn unused_purchase_reference(&self, buyer: &UserId) -> Result<String, SettlementError> {
        for _ in 0..MAX_REFERENCE_ATTEMPTS {
            let reference = PaymentReference::purchase(buyer).to_string();
            if self.db.fetch_orders_for_payment_ref(&reference).await?.is_empty() {
                return Ok(reference);
            }
            debug!("🔄️ Checkout reference [{reference}] is already in use. Generating another.");
        }
        Err(SettlementError::PaymentReferenceExhausted(buyer.clone()))
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    async fn call_order_paid_hook(&self, orders: &[Order]) {
        for order in orders.iter().filter(|o| o.payout_status == PayoutStatus::Escrow) {
            trace!("🔄️ Notifying order paid hook subscribers of order #{}", order.id);
            self.producers.publish_order_paid(OrderPaidEvent::new(order.clone())).await;
        }
    }
}

const MAX_REFERENCE_ATTEMPTS: usize = 5;
const CART_TOO_LARGE: &str = "The cart total is too large";

fn validate_cart(items: &[CartItem]) -> Result<(), SettlementError> {
    if items.is_empty() {
        return Err(SettlementError::EmptyCart);
    }
    for item in items {
        if item.product_id.trim().is_empty() {
            return Err(SettlementError::InvalidCartItem("Every item needs a product id".into()));
        }
        if item.quantity <= 0 {
            return Err(SettlementError::InvalidCartItem(format!(
                "Quantity of {} must be positive, not {}",
                item.product_id, item.quantity
            )));
        }
        if item.price.is_negative() {
            return Err(SettlementError::InvalidCartItem(format!(
                "Price of {} cannot be negative ({})",
                item.product_id, item.price
            )));
        }
        if item.seller_id.as_ref().map(|s| s.as_str().trim().is_empty()).unwrap_or(false) {
            return Err(SettlementError::InvalidCartItem(format!("Seller of {} is blank", item.product_id)));
        }
    }
    // Every sum taken over the cart later on is bounded by this one
    let line_totals = items.iter().map(|i| i.line_total()).collect::<Option<Vec<Cfa>>>();
    line_totals
        .and_then(Cfa::checked_sum)
        .map(|_| ())
        .ok_or_else(|| SettlementError::InvalidCartItem(CART_TOO_LARGE.into()))
}
