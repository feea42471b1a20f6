use std::collections::HashMap;

use cucumber::World;
use log::*;
use settlement_engine::{
    db_types::{Order, PayoutRequest, UserId},
    events::EventProducers,
    order_objects::{CartItem, CheckoutResult},
    EscrowApi,
    OrderFlowApi,
    PaymentGatewayApi,
    PayoutApi,
    SettlementError,
    SqliteDatabase,
    WalletApi,
};

use crate::support::{
    fake_processor::FakeProcessor,
    prepare_env::{create_database, random_db_path},
};

#[derive(Default, Debug, World)]
pub struct SettlementWorld {
    pub system: Option<MarketplaceSystem>,
}

#[derive(Debug)]
pub struct MarketplaceSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub processor: FakeProcessor,
    /// Items added to each buyer's cart, not yet checked out.
    pub carts: HashMap<UserId, Vec<CartItem>>,
    pub last_checkout: Option<CheckoutResult>,
    pub last_transaction_id: Option<String>,
    pub last_payout_request: Option<PayoutRequest>,
    pub last_error: Option<SettlementError>,
}

impl SettlementWorld {
    pub fn system(&self) -> &MarketplaceSystem {
        self.system.as_ref().expect("System not initialised")
    }

    pub fn system_mut(&mut self) -> &mut MarketplaceSystem {
        self.system.as_mut().expect("System not initialised")
    }
}

impl MarketplaceSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        create_database(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        db.migrate().await.expect("Error running DB migrations");
        debug!("🚀️ Created database: {url}");
        Self {
            db_path: url,
            db,
            processor: FakeProcessor::default(),
            carts: HashMap::new(),
            last_checkout: None,
            last_transaction_id: None,
            last_payout_request: None,
            last_error: None,
        }
    }

    pub fn order_flow(&self) -> OrderFlowApi<SqliteDatabase> {
        OrderFlowApi::new(self.db.clone(), EventProducers::default())
    }

    pub fn escrow(&self) -> EscrowApi<SqliteDatabase> {
        EscrowApi::new(self.db.clone(), EventProducers::default())
    }

    pub fn gateway(&self) -> PaymentGatewayApi<SqliteDatabase, FakeProcessor> {
        PaymentGatewayApi::new(self.db.clone(), self.processor.clone(), EventProducers::default())
    }

    pub fn payouts(&self) -> PayoutApi<SqliteDatabase> {
        PayoutApi::new(self.db.clone(), EventProducers::default())
    }

    pub fn wallets(&self) -> WalletApi<SqliteDatabase> {
        WalletApi::new(self.db.clone())
    }

    pub fn checkout(&self) -> &CheckoutResult {
        self.last_checkout.as_ref().expect("No checkout has been made")
    }

    /// The order in the last checkout that belongs to `seller`.
    pub fn order_for_seller(&self, seller: &str) -> &Order {
        self.checkout()
            .orders
            .iter()
            .find(|o| o.seller_id.as_ref().map(|s| s.as_str()) == Some(seller))
            .unwrap_or_else(|| panic!("No order for seller {seller}"))
    }
}
