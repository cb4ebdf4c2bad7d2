//! Token Templates
//!
//! Generates Cadence for the enabled fungible tokens by substituting the
//! token's name forms and contract addresses into generic sources.

mod strings;
mod token;

pub use token::{canon_name, parse_name, Token};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::WalletError;
use crate::flow::{validate_address, ChainEvent, ChainId, FlowAddress};

static NAME_PLACEHOLDERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"TokenName|TOKEN_NAME|tokenName").unwrap());

const UFIX64_DECIMALS: usize = 8;

/// Address of the standard `FungibleToken` contract.
pub fn fungible_token_address(chain: ChainId) -> FlowAddress {
    FlowAddress::from_u64(match chain {
        ChainId::Emulator => 0xee82856bf20e2aa6,
        ChainId::Testnet => 0x9a0766d93b6608b7,
        ChainId::Mainnet => 0xf233dcee88fe0abe,
    })
}

/// Address of the `FlowToken` contract.
pub fn flow_token_address(chain: ChainId) -> FlowAddress {
    FlowAddress::from_u64(match chain {
        ChainId::Emulator => 0x0ae53cb6e3f42a79,
        ChainId::Testnet => 0x7e60df042a9c0868,
        ChainId::Mainnet => 0x1654653399040a61,
    })
}

/// Enabled tokens for one chain.
pub struct Templates {
    chain: ChainId,
    enabled: Vec<Token>,
}

impl Templates {
    /// `FlowToken` is always enabled; `tokens` adds to it.
    pub fn new(chain: ChainId, tokens: Vec<Token>) -> Self {
        let mut enabled = vec![Token::new("FlowToken", flow_token_address(chain))];
        for token in tokens {
            if enabled.iter().any(|t| t.canon_name() == token.canon_name()) {
                log::warn!("[Templates] Token {} listed twice, keeping the first", token.name);
                continue;
            }
            enabled.push(token);
        }
        log::info!(
            "[Templates] Enabled tokens on {}: {}",
            chain,
            enabled
                .iter()
                .map(|t| t.canon_name())
                .collect::<Vec<_>>()
                .join(", ")
        );
        Self { chain, enabled }
    }

    pub fn chain(&self) -> ChainId {
        self.chain
    }

    pub fn enabled_tokens(&self) -> &[Token] {
        &self.enabled
    }

    /// Looks an enabled token up by name, in any casing.
    pub fn token(&self, name: &str) -> Result<Token, WalletError> {
        let canon = canon_name(name);
        self.enabled
            .iter()
            .find(|t| t.canon_name() == canon)
            .cloned()
            .ok_or_else(|| WalletError::Validation(format!("token {} not enabled", canon)))
    }

    pub fn is_enabled(&self, token: &Token) -> bool {
        self.enabled
            .iter()
            .any(|t| t.name == token.name && t.address == token.address)
    }

    /// Token that emitted `event`, from its type `A.<address>.<Contract>.<Event>`.
    pub fn token_from_event(&self, event: &ChainEvent) -> Result<Token, WalletError> {
        let parts: Vec<&str> = event.event_type.split('.').collect();
        if parts.len() < 4 || parts[0] != "A" {
            return Err(WalletError::Validation(format!(
                "not a contract event: {}",
                event.event_type
            )));
        }
        let address = validate_address(parts[1], self.chain)?;
        Ok(Token::new(parts[2], address))
    }

    /// Event types the listener should follow, one per enabled token.
    pub fn deposit_event_types(&self) -> Vec<String> {
        self.enabled
            .iter()
            .map(|t| format!("A.{}.{}.TokensDeposited", t.address.hex(), t.canon_name()))
            .collect()
    }

    pub fn transfer_code(&self, token: &Token) -> String {
        self.fungible_code(strings::GENERIC_FUNGIBLE_TRANSFER, token)
    }

    pub fn setup_code(&self, token: &Token) -> String {
        self.fungible_code(strings::GENERIC_FUNGIBLE_SETUP, token)
    }

    pub fn balance_code(&self, token: &Token) -> String {
        self.fungible_code(strings::GENERIC_FUNGIBLE_BALANCE, token)
    }

    fn fungible_code(&self, source: &str, token: &Token) -> String {
        let [camel, snake, lower] = token.parse_name();

        let named = NAME_PLACEHOLDERS.replace_all(source, |caps: &Captures| {
            match &caps[0] {
                "TokenName" => camel.clone(),
                "TOKEN_NAME" => snake.clone(),
                _ => lower.clone(),
            }
        });

        let mut code = replace_placeholder(
            &named,
            "FUNGIBLE_TOKEN_ADDRESS",
            &fungible_token_address(self.chain),
        );
        code = replace_placeholder(&code, &format!("{}_ADDRESS", snake), &token.address);
        replace_placeholder(&code, "FLOW_TOKEN_ADDRESS", &flow_token_address(self.chain))
    }
}

/// Replaces `placeholder` only where it stands as a whole word, so
/// `TOKEN_ADDRESS` leaves `FUNGIBLE_TOKEN_ADDRESS` alone.
fn replace_placeholder(source: &str, placeholder: &str, address: &FlowAddress) -> String {
    let pattern = format!(r"\b{}\b", regex::escape(placeholder));
    match Regex::new(&pattern) {
        Ok(re) => re
            .replace_all(source, address.to_string().as_str())
            .into_owned(),
        Err(_) => source.to_string(),
    }
}

/// Normalizes a decimal amount to UFix64 text with eight fraction digits.
pub fn format_ufix64(amount: &str) -> Result<String, WalletError> {
    let invalid = || WalletError::Validation(format!("not a valid amount: {}", amount));
    let amount = amount.trim();

    let (whole, fraction) = amount.split_once('.').unwrap_or((amount, ""));
    if whole.is_empty()
        || !whole.chars().all(|c| c.is_ascii_digit())
        || !fraction.chars().all(|c| c.is_ascii_digit())
        || fraction.len() > UFIX64_DECIMALS
    {
        return Err(invalid());
    }

    let whole: u64 = whole.parse().map_err(|_| invalid())?;
    Ok(format!("{}.{:0<width$}", whole, fraction, width = UFIX64_DECIMALS))
}

/// JSON-Cadence arguments for the transfer template: `(amount, recipient)`.
pub fn transfer_arguments(amount: &str, recipient: &FlowAddress) -> Result<Vec<serde_json::Value>, WalletError> {
    Ok(vec![
        serde_json::json!({"type": "UFix64", "value": format_ufix64(amount)?}),
        serde_json::json!({"type": "Address", "value": recipient.to_string()}),
    ])
}
