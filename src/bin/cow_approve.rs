//! cow_approve - Check and top up the vault relayer allowance for a token
//!
//! This binary:
//! 1. Loads the signer configuration from config.json or COW_* environment variables
//! 2. Derives the signer address from COW_PRIVATE_KEY
//! 3. Reports the token balance and current vault relayer allowance
//! 4. If a required amount is given, approves it and waits until the node reflects it
//!
//! Usage:
//!   cargo run --bin cow_approve -- <token> [amount] [decimals]
//!
//! `amount` is in whole token units when `decimals` is given, base units otherwise.

use anyhow::{bail, Context};
use cow_signer::{
    codec::{bytes_to_hex, from_base_units, to_base_units},
    init_logging, AllowanceOutcome, Address, CowSigner, PrivateKey, SignerConfig,
};
use num_bigint::BigUint;
use std::env;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

const CONFIG_FILE: &str = "config.json";

fn load_config() -> anyhow::Result<SignerConfig> {
    if Path::new(CONFIG_FILE).exists() {
        let config = SignerConfig::from_json_file(CONFIG_FILE)
            .with_context(|| format!("failed to load {}", CONFIG_FILE))?;
        println!("✓ Loaded configuration from {}", CONFIG_FILE);
        return Ok(config);
    }
    let config = SignerConfig::from_env().context("failed to load COW_* environment variables")?;
    println!("✓ Loaded configuration from environment");
    Ok(config)
}

fn parse_amount(amount: &str, decimals: Option<&String>) -> anyhow::Result<(BigUint, u8)> {
    match decimals {
        Some(decimals) => {
            let decimals: u8 = decimals.parse().with_context(|| format!("invalid decimals: {}", decimals))?;
            Ok((to_base_units(amount, decimals)?, decimals))
        }
        None => {
            let value = BigUint::from_str(amount).with_context(|| format!("invalid base-unit amount: {}", amount))?;
            Ok((value, 0))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() || args.len() > 3 {
        bail!("usage: cow_approve <token> [amount] [decimals]");
    }
    let token = Address::from_str(&args[0])?;
    let required = args
        .get(1)
        .map(|amount| parse_amount(amount, args.get(2)))
        .transpose()?;

    let config = load_config()?;
    let key_hex = env::var("COW_PRIVATE_KEY").context("COW_PRIVATE_KEY is not set")?;
    let key = PrivateKey::from_hex(&key_hex)?;
    let signer = CowSigner::from_config(key, &config)?;

    println!("═══════════════════════════════════════════════════════════");
    println!("   CoW Protocol Vault Relayer Allowance");
    println!("═══════════════════════════════════════════════════════════\n");
    println!("  Network:        {}", signer.network().network());
    println!("  Signer:         {}", signer.address().to_checksum());
    println!("  Token:          {}", token.to_checksum());
    println!("  Vault relayer:  {}\n", signer.network().vault_relayer().to_checksum());

    let decimals = required.as_ref().map(|(_, d)| *d).unwrap_or(0);
    let balance = signer.balance_of(&token).await?;
    let allowance = signer.vault_allowance(&token).await?;
    println!("  Balance:        {}", from_base_units(&balance, decimals));
    println!("  Allowance:      {}\n", from_base_units(&allowance, decimals));

    let Some((required, _)) = required else {
        return Ok(());
    };

    if balance < required {
        info!(
            "Balance {} is below the requested allowance {}",
            from_base_units(&balance, decimals),
            from_base_units(&required, decimals)
        );
    }

    match signer.ensure_vault_allowance(&token, &required).await? {
        AllowanceOutcome::AlreadySufficient { allowance } => {
            println!("✓ Allowance already sufficient: {}", from_base_units(&allowance, decimals));
        }
        AllowanceOutcome::Approved { tx_hash, allowance, polls } => {
            println!("✓ Approve transaction: {}", bytes_to_hex(&tx_hash));
            println!(
                "✓ Allowance now {} (observed after {} polls)",
                from_base_units(&allowance, decimals),
                polls
            );
        }
    }

    Ok(())
}
