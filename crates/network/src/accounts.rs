use scarlet_types::{Instruction, Pubkey, TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

use crate::service::{NetworkService, TokenAccount};
use crate::NetworkError;

/// Token programs whose accounts the wallet tracks
pub fn token_programs() -> [Pubkey; 2] {
    [*TOKEN_PROGRAM_ID, *TOKEN_2022_PROGRAM_ID]
}

/// Zero-balance token accounts under both token programs, in program order
pub async fn find_empty_token_accounts(
    network: &dyn NetworkService,
    owner: &Pubkey,
) -> Result<Vec<TokenAccount>, NetworkError> {
    let mut empty = Vec::new();
    for program in token_programs() {
        let accounts = network.get_token_accounts(owner, &program).await?;
        empty.extend(accounts.into_iter().filter(TokenAccount::is_empty));
    }

    debug!(owner = %owner, count = empty.len(), "found empty token accounts");
    Ok(empty)
}

/// One close instruction per account, returning rent to `owner`
pub fn close_instructions(accounts: &[TokenAccount], owner: &Pubkey) -> Vec<Instruction> {
    accounts
        .iter()
        .map(|account| Instruction::close_account(&account.program, &account.address, owner, owner))
        .collect()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyedAccount {
    pubkey: String,
    account: RawAccount,
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    data: RawData,
}

#[derive(Debug, Deserialize)]
struct RawData {
    parsed: ParsedData,
}

#[derive(Debug, Deserialize)]
struct ParsedData {
    info: TokenInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenInfo {
    mint: String,
    owner: String,
    #[serde(default)]
    state: String,
    token_amount: TokenAmount,
}

#[derive(Debug, Deserialize)]
struct TokenAmount {
    amount: String,
    decimals: u8,
}

fn parse_pubkey(field: &str, value: &str) -> Result<Pubkey, NetworkError> {
    Pubkey::from_str(value)
        .map_err(|e| NetworkError::InvalidResponse(format!("invalid {field}: {e}")))
}

/// Decode one entry of a `getTokenAccountsByOwner` response in `jsonParsed` encoding
pub fn parse_token_account(program: &Pubkey, value: Value) -> Result<TokenAccount, NetworkError> {
    let keyed: KeyedAccount = serde_json::from_value(value)
        .map_err(|e| NetworkError::InvalidResponse(format!("invalid token account: {e}")))?;
    let info = keyed.account.data.parsed.info;

    Ok(TokenAccount {
        address: parse_pubkey("pubkey", &keyed.pubkey)?,
        owner: parse_pubkey("owner", &info.owner)?,
        program: *program,
        amount: info
            .token_amount
            .amount
            .parse()
            .map_err(|e| NetworkError::InvalidResponse(format!("invalid amount: {e}")))?,
        decimals: info.token_amount.decimals,
        frozen: info.state == "frozen",
        mint: info.mint,
    })
}
