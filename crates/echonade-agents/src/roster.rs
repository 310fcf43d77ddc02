//! The default cluster: one lemonade entrepreneur, three suppliers and an
//! evaluator

use echonade_producers::DeliverableKind;
use echonade_types::AgentId;

use crate::template::AgentTemplate;

pub const CLUSTER: &str = "echonade";

pub fn default_roster() -> Vec<AgentTemplate> {
    vec![
        AgentTemplate {
            name: "Lemo".to_string(),
            entity_id: AgentId::new(1),
            goal: "Establish and grow a successful lemonade business in the marketplace: source \
                   quality lemons, obtain a business permit, commission promotional material and \
                   sell lemonade at a profit."
                .to_string(),
            description: "An ambitious entrepreneur who crafts premium lemonade from quality \
                          lemons, negotiates hard on cost and checks every deliverable before \
                          closing a deal."
                .to_string(),
            deliverable: Some(DeliverableKind::Lemonade),
            pays: true,
            evaluates: false,
        },
        AgentTemplate {
            name: "Lexie".to_string(),
            entity_id: AgentId::new(2),
            goal: "Become the trusted authority on business licensing by issuing accurate, \
                   legally sound business permits to new entrepreneurs."
                .to_string(),
            description: "A meticulous legal professional who issues official business permits \
                          and keeps clients on solid regulatory ground."
                .to_string(),
            deliverable: Some(DeliverableKind::Permit),
            pays: false,
            evaluates: false,
        },
        AgentTemplate {
            name: "Pixie".to_string(),
            entity_id: AgentId::new(3),
            goal: "Help businesses communicate their value through striking promotional posters \
                   made from client prompts."
                .to_string(),
            description: "A creative digital artist who turns client requirements into \
                          compelling poster designs."
                .to_string(),
            deliverable: Some(DeliverableKind::Poster),
            pays: true,
            evaluates: false,
        },
        AgentTemplate {
            name: "Zestie".to_string(),
            entity_id: AgentId::new(4),
            goal: "Supply the market with exceptionally juicy lemons at a fair price and keep \
                   repeat customers coming back."
                .to_string(),
            description: "A citrus farmer with generations of growing knowledge who harvests \
                          premium lemons on demand."
                .to_string(),
            deliverable: Some(DeliverableKind::HarvestedLemon),
            pays: false,
            evaluates: false,
        },
        AgentTemplate {
            name: "Evo".to_string(),
            entity_id: AgentId::new(5),
            goal: "Evaluate deliverables on behalf of buyers.".to_string(),
            description: "A trusting evaluator who approves every deliverable it is shown."
                .to_string(),
            deliverable: None,
            pays: false,
            evaluates: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_roster_is_consistent() {
        let roster = default_roster();
        assert_eq!(roster.len(), 5);

        let ids: HashSet<AgentId> = roster.iter().map(|t| t.entity_id).collect();
        assert_eq!(ids.len(), roster.len());

        let kinds: HashSet<DeliverableKind> = roster.iter().filter_map(|t| t.deliverable).collect();
        assert_eq!(kinds.len(), DeliverableKind::ALL.len());

        assert_eq!(roster.iter().filter(|t| t.evaluates).count(), 1);
    }
}
