use cucumber::given;

use crate::cucumber::{MarketplaceSystem, SettlementWorld};

#[given("a fresh install")]
async fn fresh_database(world: &mut SettlementWorld) {
    let system = MarketplaceSystem::new().await;
    world.system = Some(system);
}
