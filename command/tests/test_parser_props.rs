// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

use proptest::prelude::*;
use std::sync::Arc;
use treasury_command::handlers::{HandlerContext, HandlerOutput};
use treasury_command::{CommandParser, CommandRegistry, GroupSnapshot};
use treasury_types::{
    Currency, CurrencyTable, Group, GroupId, Member, TreasuryBalance, WalletAddress,
};

fn parser() -> CommandParser {
    CommandParser::new(
        Arc::new(CommandRegistry::treasury(90).unwrap()),
        &["@bot".to_string(), "@treasury ai".to_string()],
    )
    .unwrap()
}

fn snapshot() -> GroupSnapshot {
    GroupSnapshot {
        group: Group {
            id: GroupId::new(1),
            name: "apes".to_string(),
            creator: WalletAddress::new([1; 20]),
            required_deposit: 0,
            is_private: false,
            member_count: 1,
        },
        members: vec![Member {
            wallet: WalletAddress::new([1; 20]),
            display_name: "alice".to_string(),
            joined_at: 0,
            deposit_amount: 0,
            has_deposited: true,
            is_active: true,
        }],
        treasury: TreasuryBalance {
            native_balance: 0,
            currency: Currency::new("ETH"),
            decimals: 18,
            nft_count: 0,
        },
        open_proposals: vec![],
    }
}

proptest! {
    #[test]
    fn test_no_mention_is_never_a_command(message in "[^@]*") {
        let parsed = parser().parse(&message);
        prop_assert!(!parsed.is_command);
        prop_assert!(!parsed.mentioned);
        prop_assert!(parsed.command.is_none());
    }

    #[test]
    fn test_arbitrary_text_without_mention(message in any::<String>()) {
        let lower = message.to_lowercase();
        prop_assume!(!lower.contains("@bot") && !lower.contains("@treasury"));
        prop_assert!(!parser().parse(&message).is_command);
    }

    #[test]
    fn test_parse_and_handle_never_panic(rest in any::<String>()) {
        let parser = parser();
        let parsed = parser.parse(&format!("@bot {}", rest));
        prop_assert!(parsed.mentioned);
        if let Some(matched) = parsed.command {
            let registry: &CommandRegistry = parser.registry();
            let command = registry.get(matched.kind).unwrap();
            let snapshot = snapshot();
            let currencies = CurrencyTable::default();
            let output = (command.handler)(&HandlerContext {
                group_id: GroupId::new(1),
                sender: WalletAddress::new([1; 20]),
                args: &matched.args,
                snapshot: &snapshot,
                currencies: &currencies,
                registry,
            });
            if let Ok(HandlerOutput::Propose(action)) = output {
                prop_assert_eq!(Some(action.proposal_type()), command.proposal_type);
            }
        }
    }
}
