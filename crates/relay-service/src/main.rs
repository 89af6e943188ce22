//! Main entry point for the gasless swap relayer.
//!
//! Each invocation loads the configuration, builds the relay engine over the
//! configured storage (restoring the committed state) and runs one command
//! against it: escrow movements, devnet token operations, signing a swap
//! authorization as the authority, or relaying a signed payload.

use alloy_primitives::{Address, U160, U256};
use clap::{Parser, Subcommand};
use relay_account::implementations::local::address_from_private_key;
use relay_config::Config;
use relay_core::RelayEngine;
use relay_types::{
	current_timestamp, parse_hex_bytes, with_0x_prefix, Authorization, CallbackContext,
	RecoverableSignature, RelaySubmission, SecretString, SwapDirection, SwapPayload,
};
use std::path::PathBuf;

mod factory_registry;

use factory_registry::{build_authority, build_engine_from_config};

/// Command-line arguments for the relayer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config/relay.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,

	#[command(subcommand)]
	command: Command,
}

/// Private key identifying the caller of an owner-gated command.
#[derive(clap::Args, Debug)]
struct Caller {
	/// Hex private key of the caller
	#[arg(long, env = "RELAY_PRIVATE_KEY", hide_env_values = true)]
	private_key: String,
}

impl Caller {
	fn address(&self) -> Result<Address, Box<dyn std::error::Error>> {
		let key = SecretString::from(self.private_key.as_str());
		Ok(address_from_private_key(&key)?)
	}
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Credit the caller's escrow with native value
	Deposit {
		#[command(flatten)]
		caller: Caller,
		value: U256,
	},
	/// Withdraw from the caller's escrow
	Withdraw {
		#[command(flatten)]
		caller: Caller,
		value: U256,
	},
	/// Show an escrow balance
	Balance { owner: Address },
	/// Show an owner's next expected nonce
	Nonce { owner: Address },
	/// Mint devnet tokens
	Mint {
		token: Address,
		holder: Address,
		amount: U256,
	},
	/// Approve a spender (the relay by default) for the caller's tokens
	Approve {
		#[command(flatten)]
		caller: Caller,
		token: Address,
		amount: U256,
		#[arg(long)]
		spender: Option<Address>,
	},
	/// Show a token balance
	TokenBalance { token: Address, holder: Address },
	/// List deployed pools
	Pools,
	/// Sign a swap authorization with the configured authority
	Sign(SignArgs),
	/// Submit a signed payload as relayer
	Relay {
		#[command(flatten)]
		caller: Caller,
		/// Hex payload produced by `sign`
		#[arg(long)]
		payload: String,
		/// Hex 65-byte signature (r || s || v)
		#[arg(long)]
		signature: String,
		/// Fee rate the relayer paid
		#[arg(long, default_value = "0")]
		fee_rate: U256,
		/// Sequencing time in unix seconds; defaults to now
		#[arg(long)]
		timestamp: Option<u64>,
		/// Run as a static call and commit nothing
		#[arg(long)]
		preview: bool,
	},
	/// Show the receipt of a settled authorization
	Receipt { owner: Address, nonce: U256 },
}

#[derive(clap::Args, Debug)]
struct SignArgs {
	/// Owner whose escrow and nonce the swap consumes; also receives output
	#[arg(long)]
	owner: Address,
	#[arg(long)]
	input: Address,
	#[arg(long)]
	output: Address,
	/// Pool fee tier in hundredths of a basis point
	#[arg(long, default_value_t = 3000)]
	fee: u32,
	/// Input amount (exact input) or output amount (exact output)
	#[arg(long)]
	amount: U256,
	/// Minimum output (exact input) or maximum input (exact output)
	#[arg(long)]
	limit: U256,
	/// Treat `amount` as the exact input
	#[arg(long)]
	exact_input: bool,
	/// Maximum fee rate the relayer is reimbursed at
	#[arg(long, default_value = "0")]
	max_incentive: U256,
	/// Seconds from now until the authorization expires
	#[arg(long, default_value_t = 600)]
	ttl: u64,
	/// Nonce to sign; defaults to the owner's next expected nonce
	#[arg(long)]
	nonce: Option<U256>,
	/// Q64.96 sqrt price bound; zero leaves only `limit` in force
	#[arg(long, default_value = "0")]
	price_limit: U160,
}

/// Main entry point for the relayer.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.with_writer(std::io::stderr)
		.init();

	let config_path = args
		.config
		.to_str()
		.ok_or("Configuration path is not valid UTF-8")?;
	let config = Config::from_file(config_path).await?;
	tracing::info!("Loaded configuration [{}]", config.relay.id);

	let engine = build_engine_from_config(config.clone()).await?;
	run(&engine, &config, args.command).await
}

async fn run(
	engine: &RelayEngine,
	config: &Config,
	command: Command,
) -> Result<(), Box<dyn std::error::Error>> {
	match command {
		Command::Deposit { caller, value } => {
			let owner = caller.address()?;
			engine.deposit(owner, value).await?;
			println!("{}", engine.balance_of(owner).await);
		}
		Command::Withdraw { caller, value } => {
			let owner = caller.address()?;
			engine.withdraw(owner, value).await?;
			println!("{}", engine.balance_of(owner).await);
		}
		Command::Balance { owner } => {
			println!("{}", engine.balance_of(owner).await);
		}
		Command::Nonce { owner } => {
			println!("{}", engine.nonces(owner).await);
		}
		Command::Mint {
			token,
			holder,
			amount,
		} => {
			engine.mint(token, holder, amount).await?;
			println!("{}", engine.token_balance(token, holder).await);
		}
		Command::Approve {
			caller,
			token,
			amount,
			spender,
		} => {
			let owner = caller.address()?;
			let spender = spender.unwrap_or(config.relay.address);
			engine.approve(owner, token, spender, amount).await?;
		}
		Command::TokenBalance { token, holder } => {
			println!("{}", engine.token_balance(token, holder).await);
		}
		Command::Pools => {
			for pool in engine.pools().await {
				println!(
					"{} {} {} {}",
					pool.address, pool.token0, pool.token1, pool.fee
				);
			}
		}
		Command::Sign(sign) => {
			let authority_config = config
				.authority
				.as_ref()
				.ok_or("Signing requires an [authority] section in the configuration")?;
			let authority = build_authority(authority_config)?;

			let payload = authorization_from_args(engine, &sign).await?;
			let signed = authority.sign_payload(&payload).await?;
			let signature = signed.signature;

			println!("payload   {}", with_0x_prefix(&hex::encode(&signed.payload)));
			println!("signature {}", with_0x_prefix(&hex::encode(signature.to_bytes())));
			println!("v {}", signature.v);
			println!("r {}", signature.r);
			println!("s {}", signature.s);
		}
		Command::Relay {
			caller,
			payload,
			signature,
			fee_rate,
			timestamp,
			preview,
		} => {
			let submission = RelaySubmission {
				relayer: caller.address()?,
				fee_rate,
				timestamp: timestamp.unwrap_or_else(current_timestamp),
			};
			let payload = parse_hex_bytes(&payload)?;
			let signature = RecoverableSignature::from_bytes(&parse_hex_bytes(&signature)?)?;

			if preview {
				let settled = engine
					.preview_relayed_swap(submission, signature, &payload)
					.await?;
				println!("{}", settled);
			} else {
				let receipt = engine
					.relayed_swap(submission, signature, &payload)
					.await?;
				println!("{}", serde_json::to_string_pretty(&receipt)?);
			}
		}
		Command::Receipt { owner, nonce } => {
			let receipt = engine.receipt(owner, nonce).await?;
			println!("{}", serde_json::to_string_pretty(&receipt)?);
		}
	}
	Ok(())
}

/// Builds the payload to sign, resolving the pool and filling the nonce
/// from the committed state when not given.
async fn authorization_from_args(
	engine: &RelayEngine,
	args: &SignArgs,
) -> Result<SwapPayload, Box<dyn std::error::Error>> {
	let nonce = match args.nonce {
		Some(nonce) => nonce,
		None => engine.nonces(args.owner).await,
	};
	let pool = engine
		.relay()
		.resolver()
		.resolve(args.input, args.output, args.fee);

	let context = CallbackContext {
		input_asset: args.input,
		output_asset: args.output,
		beneficiary: args.owner,
		fee_tier: args.fee,
	};
	context.validate()?;

	let authorization = Authorization {
		amount: args.amount,
		limit: args.limit,
		deadline: U256::from(current_timestamp().saturating_add(args.ttl)),
		nonce,
		max_incentive: args.max_incentive,
		pool,
		price_limit: args.price_limit,
		direction: SwapDirection::from_exact_input(args.exact_input),
	};
	authorization.validate()?;

	Ok(SwapPayload::new(authorization, context))
}
