// Copyright (c) The Treasury Core Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command handlers. Each one applies a strict extractor to the text that
//! follows the trigger and either answers directly or returns the action of
//! a proposal; none of them touches the ledger.

use crate::dispatcher::GroupSnapshot;
use crate::error::{CommandError, CommandResult};
use crate::grammar::{CommandKind, CommandRegistry};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use treasury_types::{
    CollectionRef, Currency, CurrencyTable, DecimalAmount, GroupId, ProposalAction, TokenId,
    WalletAddress, WantedToken,
};

pub const BUY_USAGE: &str = "@bot buy <Collection> #<TokenId> | @bot buy 0x<contract> <TokenId>";
pub const SELL_USAGE: &str = "@bot sell <Collection> #<TokenId> for <Price> <Currency>";
pub const RENT_OUT_USAGE: &str = "@bot rent out <Collection> #<TokenId> for <Price> <Currency>/day with <Min> day min and <Max> day max";
pub const SWAP_USAGE: &str =
    "@bot swap <Collection> #<TokenId> for <WantedCollection> #<TokenId|any>";
pub const TRANSFER_USAGE: &str = "@bot transfer <Amount> <Currency> to 0x<address>";
pub const BALANCE_USAGE: &str = "@bot balance";
pub const PROPOSALS_USAGE: &str = "@bot proposals";
pub const ADD_MEMBER_USAGE: &str = "@bot add member @<username> 0x<address>";
pub const REMOVE_MEMBER_USAGE: &str = "@bot remove member @<username>";
pub const LEAVE_USAGE: &str = "@bot i want to leave";
pub const HELP_USAGE: &str = "@bot help";

pub type Handler = fn(&HandlerContext<'_>) -> CommandResult<HandlerOutput>;

/// Everything a handler may look at.
pub struct HandlerContext<'a> {
    pub group_id: GroupId,
    pub sender: WalletAddress,
    /// Message text starting at the matched trigger, mentions removed.
    pub args: &'a str,
    pub snapshot: &'a GroupSnapshot,
    pub currencies: &'a CurrencyTable,
    pub registry: &'a CommandRegistry,
}

impl<'a> HandlerContext<'a> {
    fn args(&self) -> &'a str {
        self.args
            .trim()
            .trim_end_matches(|c| matches!(c, '.' | '!' | '?'))
            .trim_end()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerOutput {
    Reply(String),
    Propose(ProposalAction),
}

const COLLECTION: &str = r"[A-Za-z0-9][\w.\-]*(?:\s+[A-Za-z0-9][\w.\-]*)*?";
const AMOUNT: &str = r"(?P<amount>\d+(?:\.\d+)?)\s+(?P<currency>[A-Za-z]{2,10})";
const ADDRESS: &str = r"0x[0-9a-fA-F]{40}";

/// `<Collection> #<token>` or `0x<contract> <token>`, groups prefixed with `prefix`.
fn token_ref(prefix: &str, token: &str) -> String {
    format!(
        r"(?:(?P<{p}address>{a})\s+#?|(?P<{p}collection>{c})\s+#)(?P<{p}token>{t})",
        p = prefix,
        a = ADDRESS,
        c = COLLECTION,
        t = token
    )
}

static BUY: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"(?i)^buy\s+{}$", token_ref("", r"\d+"))).unwrap());
static SELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^sell\s+{}\s+for\s+{}$",
        token_ref("", r"\d+"),
        AMOUNT
    ))
    .unwrap()
});
static RENT_OUT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^rent\s+out\s+{}\s+for\s+{}\s*/\s*day\s+with\s+(?P<min>\d+)\s+days?\s+min(?:imum)?\s+and\s+(?P<max>\d+)\s+days?\s+max(?:imum)?$",
        token_ref("", r"\d+"),
        AMOUNT
    ))
    .unwrap()
});
static SWAP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^swap\s+{}\s+for\s+{}$",
        token_ref("", r"\d+"),
        token_ref("wanted_", r"\d+|any")
    ))
    .unwrap()
});
static TRANSFER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^transfer\s+{}\s+to\s+(?P<recipient>{})$",
        AMOUNT, ADDRESS
    ))
    .unwrap()
});
static ADD_MEMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)^add\s+member\s+@?(?P<username>[\w.\-]+)\s+(?P<wallet>{})$",
        ADDRESS
    ))
    .unwrap()
});
static REMOVE_MEMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^remove\s+member\s+@?(?P<username>[\w.\-]+)$").unwrap());
static LEAVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:i\s+want\s+to\s+leave|leave)(?:\s+(?:the\s+)?group)?$").unwrap()
});

fn extract<'t>(
    regex: &Regex,
    text: &'t str,
    command: CommandKind,
    usage: &'static str,
) -> CommandResult<Captures<'t>> {
    regex
        .captures(text)
        .ok_or_else(|| CommandError::parse(command, usage))
}

fn collection_ref(
    caps: &Captures<'_>,
    prefix: &str,
    command: CommandKind,
    usage: &'static str,
) -> CommandResult<(CollectionRef, String)> {
    let group = |name: &str| caps.name(&format!("{}{}", prefix, name));
    let collection = match (group("address"), group("collection")) {
        (Some(address), _) => CollectionRef::Address(
            WalletAddress::from_hex_literal(address.as_str())
                .map_err(|e| CommandError::parse_with(command, usage, e))?,
        ),
        (None, Some(name)) => {
            CollectionRef::Named(name.as_str().split_whitespace().collect::<Vec<_>>().join(" "))
        }
        (None, None) => return Err(CommandError::parse(command, usage)),
    };
    let token = group("token")
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| CommandError::parse(command, usage))?;
    Ok((collection, token))
}

fn token_id(token: &str, command: CommandKind, usage: &'static str) -> CommandResult<TokenId> {
    token
        .parse()
        .map_err(|e| CommandError::parse_with(command, usage, e))
}

/// Validate a price against the currency table without converting it yet.
fn priced_amount(
    caps: &Captures<'_>,
    currencies: &CurrencyTable,
    command: CommandKind,
    usage: &'static str,
) -> CommandResult<(DecimalAmount, Currency)> {
    let (amount, currency) = match (caps.name("amount"), caps.name("currency")) {
        (Some(amount), Some(currency)) => (amount.as_str(), currency.as_str()),
        _ => return Err(CommandError::parse(command, usage)),
    };
    let fail = |e: treasury_types::amount::AmountError| CommandError::parse_with(command, usage, e);
    let amount: DecimalAmount = amount.parse().map_err(fail)?;
    let currency = currencies.resolve(currency).map_err(fail)?;
    currencies.to_base_units(&amount, &currency).map_err(fail)?;
    if amount.is_zero() {
        return Err(CommandError::parse_with(
            command,
            usage,
            "the amount must be greater than zero",
        ));
    }
    Ok((amount, currency))
}

fn wallet(text: &str, command: CommandKind, usage: &'static str) -> CommandResult<WalletAddress> {
    WalletAddress::from_hex_literal(text).map_err(|e| CommandError::parse_with(command, usage, e))
}

fn named<'t>(
    caps: &Captures<'t>,
    name: &str,
    command: CommandKind,
    usage: &'static str,
) -> CommandResult<&'t str> {
    caps.name(name)
        .map(|m| m.as_str())
        .ok_or_else(|| CommandError::parse(command, usage))
}

pub fn buy(ctx: &HandlerContext<'_>) -> CommandResult<HandlerOutput> {
    let (kind, usage) = (CommandKind::Buy, BUY_USAGE);
    let caps = extract(&BUY, ctx.args(), kind, usage)?;
    let (collection, token) = collection_ref(&caps, "", kind, usage)?;
    Ok(HandlerOutput::Propose(ProposalAction::BuyNft {
        collection,
        token_id: token_id(&token, kind, usage)?,
    }))
}

pub fn sell(ctx: &HandlerContext<'_>) -> CommandResult<HandlerOutput> {
    let (kind, usage) = (CommandKind::Sell, SELL_USAGE);
    let caps = extract(&SELL, ctx.args(), kind, usage)?;
    let (collection, token) = collection_ref(&caps, "", kind, usage)?;
    let (price, currency) = priced_amount(&caps, ctx.currencies, kind, usage)?;
    Ok(HandlerOutput::Propose(ProposalAction::SellNft {
        collection,
        token_id: token_id(&token, kind, usage)?,
        price,
        currency,
    }))
}

pub fn rent_out(ctx: &HandlerContext<'_>) -> CommandResult<HandlerOutput> {
    let (kind, usage) = (CommandKind::RentOut, RENT_OUT_USAGE);
    let caps = extract(&RENT_OUT, ctx.args(), kind, usage)?;
    let (collection, token) = collection_ref(&caps, "", kind, usage)?;
    let (price_per_day, currency) = priced_amount(&caps, ctx.currencies, kind, usage)?;
    let days = |name: &str| -> CommandResult<u32> {
        named(&caps, name, kind, usage)?
            .parse::<u32>()
            .map_err(|e| CommandError::parse_with(kind, usage, e))
    };
    let (min_days, max_days) = (days("min")?, days("max")?);
    if min_days == 0 || min_days > max_days {
        return Err(CommandError::parse_with(
            kind,
            usage,
            format!(
                "rental days need 1 <= min <= max, got {} and {}",
                min_days, max_days
            ),
        ));
    }
    Ok(HandlerOutput::Propose(ProposalAction::RentNft {
        collection,
        token_id: token_id(&token, kind, usage)?,
        price_per_day,
        currency,
        min_days,
        max_days,
    }))
}

pub fn swap(ctx: &HandlerContext<'_>) -> CommandResult<HandlerOutput> {
    let (kind, usage) = (CommandKind::Swap, SWAP_USAGE);
    let caps = extract(&SWAP, ctx.args(), kind, usage)?;
    let (offered_collection, offered_token) = collection_ref(&caps, "", kind, usage)?;
    let (wanted_collection, wanted_token) = collection_ref(&caps, "wanted_", kind, usage)?;
    let wanted_token = if wanted_token.eq_ignore_ascii_case("any") {
        WantedToken::Any
    } else {
        WantedToken::Id(token_id(&wanted_token, kind, usage)?)
    };
    Ok(HandlerOutput::Propose(ProposalAction::SwapNft {
        offered_collection,
        offered_token_id: token_id(&offered_token, kind, usage)?,
        wanted_collection,
        wanted_token,
    }))
}

pub fn transfer(ctx: &HandlerContext<'_>) -> CommandResult<HandlerOutput> {
    let (kind, usage) = (CommandKind::Transfer, TRANSFER_USAGE);
    let caps = extract(&TRANSFER, ctx.args(), kind, usage)?;
    let (amount, currency) = priced_amount(&caps, ctx.currencies, kind, usage)?;
    let recipient = wallet(named(&caps, "recipient", kind, usage)?, kind, usage)?;
    Ok(HandlerOutput::Propose(ProposalAction::TransferFunds {
        amount,
        currency,
        recipient,
    }))
}

pub fn balance(ctx: &HandlerContext<'_>) -> CommandResult<HandlerOutput> {
    let snapshot = ctx.snapshot;
    let treasury = &snapshot.treasury;
    Ok(HandlerOutput::Reply(format!(
        "{} treasury: {} {}, {} NFT(s), {} active member(s).",
        snapshot.group.name,
        treasury.native_balance_str(),
        treasury.currency,
        treasury.nft_count,
        snapshot.active_member_count()
    )))
}

pub fn proposals(ctx: &HandlerContext<'_>) -> CommandResult<HandlerOutput> {
    let open = &ctx.snapshot.open_proposals;
    if open.is_empty() {
        return Ok(HandlerOutput::Reply("No proposals are open.".to_string()));
    }
    let mut reply = format!("{} open proposal(s):", open.len());
    for view in open {
        reply.push_str("\n  ");
        reply.push_str(&view.summary());
    }
    Ok(HandlerOutput::Reply(reply))
}

pub fn add_member(ctx: &HandlerContext<'_>) -> CommandResult<HandlerOutput> {
    let (kind, usage) = (CommandKind::AddMember, ADD_MEMBER_USAGE);
    let caps = extract(&ADD_MEMBER, ctx.args(), kind, usage)?;
    Ok(HandlerOutput::Propose(ProposalAction::AddMember {
        username: named(&caps, "username", kind, usage)?.to_string(),
        wallet: wallet(named(&caps, "wallet", kind, usage)?, kind, usage)?,
    }))
}

pub fn remove_member(ctx: &HandlerContext<'_>) -> CommandResult<HandlerOutput> {
    let (kind, usage) = (CommandKind::RemoveMember, REMOVE_MEMBER_USAGE);
    let caps = extract(&REMOVE_MEMBER, ctx.args(), kind, usage)?;
    let username = named(&caps, "username", kind, usage)?;
    let member = ctx
        .snapshot
        .find_active_member(username)
        .ok_or_else(|| CommandError::UnknownMember(username.to_string()))?;
    Ok(HandlerOutput::Propose(ProposalAction::RemoveMember {
        username: member.display_name.trim_start_matches('@').to_string(),
        wallet: member.wallet,
    }))
}

pub fn leave(ctx: &HandlerContext<'_>) -> CommandResult<HandlerOutput> {
    extract(&LEAVE, ctx.args(), CommandKind::Leave, LEAVE_USAGE)?;
    Ok(HandlerOutput::Propose(ProposalAction::WithdrawMember {
        wallet: ctx.sender,
    }))
}

pub fn help(ctx: &HandlerContext<'_>) -> CommandResult<HandlerOutput> {
    Ok(HandlerOutput::Reply(ctx.registry.help_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use treasury_types::{Group, Member, TreasuryBalance};

    fn snapshot() -> GroupSnapshot {
        let member = |i: u8, name: &str, is_active: bool| Member {
            wallet: WalletAddress::new([i; 20]),
            display_name: name.to_string(),
            joined_at: 0,
            deposit_amount: 0,
            has_deposited: true,
            is_active,
        };
        GroupSnapshot {
            group: Group {
                id: GroupId::new(1),
                name: "apes".to_string(),
                creator: WalletAddress::new([1; 20]),
                required_deposit: 0,
                is_private: false,
                member_count: 2,
            },
            members: vec![
                member(1, "alice", true),
                member(2, "@Bob", true),
                member(3, "carol", false),
            ],
            treasury: TreasuryBalance {
                native_balance: 1_500_000_000_000_000_000,
                currency: Currency::new("ETH"),
                decimals: 18,
                nft_count: 3,
            },
            open_proposals: vec![],
        }
    }

    fn run(handler: Handler, args: &str) -> CommandResult<HandlerOutput> {
        let snapshot = snapshot();
        let registry = CommandRegistry::treasury(90).unwrap();
        let currencies = CurrencyTable::default();
        handler(&HandlerContext {
            group_id: GroupId::new(1),
            sender: WalletAddress::new([2; 20]),
            args,
            snapshot: &snapshot,
            currencies: &currencies,
            registry: &registry,
        })
    }

    fn proposed(handler: Handler, args: &str) -> ProposalAction {
        match run(handler, args).unwrap() {
            HandlerOutput::Propose(action) => action,
            other => panic!("expected a proposal, got {:?}", other),
        }
    }

    fn parse_error(handler: Handler, args: &str) -> CommandError {
        let err = run(handler, args).unwrap_err();
        assert_eq!(err.kind(), treasury_types::ErrorKind::Parse);
        err
    }

    #[test]
    fn test_buy() {
        assert_eq!(
            proposed(buy, "Buy Bored  Ape #42"),
            ProposalAction::BuyNft {
                collection: CollectionRef::Named("Bored Ape".to_string()),
                token_id: "42".parse().unwrap(),
            }
        );
        let address = "0xbc4ca0eda7647a8ab7c2061c2e118a18a936f13d";
        match proposed(buy, &format!("buy {} 7", address)) {
            ProposalAction::BuyNft {
                collection: CollectionRef::Address(contract),
                token_id,
            } => {
                assert_eq!(contract.to_hex_literal(), address);
                assert_eq!(token_id.as_str(), "7");
            }
            other => panic!("unexpected {:?}", other),
        }
        parse_error(buy, "buy BAYC");
        parse_error(buy, "buy BAYC #42 and MAYC #1");
    }

    #[test]
    fn test_sell_checks_currency() {
        match proposed(sell, "sell MAYC #537 for 5 ETH") {
            ProposalAction::SellNft {
                price, currency, ..
            } => {
                assert_eq!(price.as_str(), "5");
                assert_eq!(currency, Currency::new("ETH"));
            }
            other => panic!("unexpected {:?}", other),
        }
        let err = parse_error(sell, "sell MAYC #537 for 5 DOGE");
        assert!(err.to_string().contains("DOGE"));
        parse_error(sell, "sell MAYC #537 for 1.0000001 USDC");
        parse_error(sell, "sell MAYC #537 for 0 ETH");
        parse_error(sell, "sell MAYC #537 for five ETH");
    }

    #[test]
    fn test_rent_out_days() {
        match proposed(
            rent_out,
            "rent out BAYC #1 for 0.05 ETH/day with 1 day min and 30 days max",
        ) {
            ProposalAction::RentNft {
                price_per_day,
                min_days,
                max_days,
                ..
            } => {
                assert_eq!(price_per_day.as_str(), "0.05");
                assert_eq!((min_days, max_days), (1, 30));
            }
            other => panic!("unexpected {:?}", other),
        }
        parse_error(
            rent_out,
            "rent out BAYC #1 for 0.05 ETH/day with 0 day min and 3 day max",
        );
        parse_error(
            rent_out,
            "rent out BAYC #1 for 0.05 ETH/day with 5 day min and 3 day max",
        );
    }

    #[test]
    fn test_swap_any_is_not_zero() {
        let wanted = |args: &str| match proposed(swap, args) {
            ProposalAction::SwapNft { wanted_token, .. } => wanted_token,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(wanted("swap BAYC #1 for MAYC #ANY"), WantedToken::Any);
        assert_eq!(
            wanted("swap BAYC #1 for MAYC #0"),
            WantedToken::Id("0".parse().unwrap())
        );
        parse_error(swap, "swap BAYC #1 for MAYC");
    }

    #[test]
    fn test_transfer() {
        let recipient = "0x00000000000000000000000000000000000000aa";
        match proposed(transfer, &format!("transfer 12.5 usdc to {}", recipient)) {
            ProposalAction::TransferFunds {
                amount,
                currency,
                recipient: to,
            } => {
                assert_eq!(amount.as_str(), "12.5");
                assert_eq!(currency.symbol(), "USDC");
                assert_eq!(to.to_hex_literal(), recipient);
            }
            other => panic!("unexpected {:?}", other),
        }
        parse_error(transfer, "transfer 12.5 usdc to bob");
    }

    #[test]
    fn test_membership_commands() {
        let wallet_hex = "0x00000000000000000000000000000000000000bb";
        assert_eq!(
            proposed(add_member, &format!("add member @dave {}", wallet_hex)),
            ProposalAction::AddMember {
                username: "dave".to_string(),
                wallet: WalletAddress::from_hex_literal(wallet_hex).unwrap(),
            }
        );
        assert_eq!(
            proposed(remove_member, "remove member @bob"),
            ProposalAction::RemoveMember {
                username: "Bob".to_string(),
                wallet: WalletAddress::new([2; 20]),
            }
        );
        let err = run(remove_member, "remove member @carol").unwrap_err();
        assert_eq!(err, CommandError::UnknownMember("carol".to_string()));
        assert_eq!(
            proposed(leave, "I want to leave."),
            ProposalAction::WithdrawMember {
                wallet: WalletAddress::new([2; 20]),
            }
        );
        parse_error(leave, "leave the money alone");
    }

    #[test]
    fn test_replies() {
        match run(balance, "balance").unwrap() {
            HandlerOutput::Reply(reply) => {
                assert!(reply.contains("1.5 ETH"));
                assert!(reply.contains("3 NFT(s)"));
                assert!(reply.contains("2 active member(s)"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match run(proposals, "proposals").unwrap() {
            HandlerOutput::Reply(reply) => assert_eq!(reply, "No proposals are open."),
            other => panic!("unexpected {:?}", other),
        }
    }
}
