//! Opening orders of a run

use echonade_market::{InMemoryMarketplace, MarketError};
use echonade_types::JobId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::template::AgentTemplate;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    #[error("No agent named '{0}' in the roster")]
    UnknownAgent(String),

    #[error(transparent)]
    Market(#[from] MarketError),
}

/// A job one roster agent opens with another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioOrder {
    pub buyer: String,
    pub seller: String,
    pub description: String,
    pub price: f64,
}

impl ScenarioOrder {
    pub fn new(buyer: &str, seller: &str, description: &str, price: f64) -> Self {
        Self {
            buyer: buyer.to_string(),
            seller: seller.to_string(),
            description: description.to_string(),
            price,
        }
    }
}

/// Lemo stocks up for the business; Pixie orders the first lemonade
pub fn default_scenario() -> Vec<ScenarioOrder> {
    vec![
        ScenarioOrder::new("Lemo", "Zestie", "A basket of fresh lemons", 2.0),
        ScenarioOrder::new("Lemo", "Lexie", "A business permit for a lemonade stand", 5.0),
        ScenarioOrder::new("Lemo", "Pixie", "A sunny poster announcing the grand opening", 3.0),
        ScenarioOrder::new("Pixie", "Lemo", "One glass of signature lemonade", 1.5),
    ]
}

/// Register every roster agent with the marketplace
pub async fn register_roster(
    market: &InMemoryMarketplace,
    roster: &[AgentTemplate],
) -> Result<(), ScenarioError> {
    for template in roster {
        market
            .register_agent(template.entity_id, template.name.clone())
            .await?;
    }
    Ok(())
}

/// Open every order, in order
pub async fn place_orders(
    market: &InMemoryMarketplace,
    roster: &[AgentTemplate],
    orders: &[ScenarioOrder],
) -> Result<Vec<JobId>, ScenarioError> {
    let find = |name: &str| {
        roster
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
            .map(|t| t.entity_id)
            .ok_or_else(|| ScenarioError::UnknownAgent(name.to_string()))
    };

    let mut job_ids = Vec::with_capacity(orders.len());
    for order in orders {
        let buyer = find(&order.buyer)?;
        let seller = find(&order.seller)?;
        job_ids.push(
            market
                .initiate_job(buyer, seller, order.description.clone(), order.price)
                .await?,
        );
    }
    Ok(job_ids)
}
