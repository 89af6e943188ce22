//! Async relay engine.
//!
//! [`RelayEngine`] owns the committed [`ChainState`] and the pool directory
//! behind a single mutex. Every mutating operation computes its result on a
//! copy, persists the copy and only then swaps it in, so a failure at any
//! point (including in storage) leaves the committed state as it was. Events
//! are published after the swap-in.

pub mod event_bus;

use crate::relay::Relay;
use crate::state::ChainState;
use crate::RelayError;
use alloy_primitives::{Address, U256};
use event_bus::EventBus;
use relay_pool::implementations::constant_product::ConstantProductPool;
use relay_pool::{PoolDescriptor, PoolDirectory, PoolError, PoolKey, FEE_DENOMINATOR};
use relay_storage::StorageService;
use relay_types::{
	receipt_id, EscrowEvent, RecoverableSignature, RelayEvent, RelaySubmission, StorageKey,
	SwapEvent, SwapReceipt,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::instrument;

/// Storage id of the committed ledger snapshot.
const LEDGER_ID: &str = "state";
/// Storage id of the deployed pool descriptors.
const POOLS_ID: &str = "directory";

#[derive(Debug, Default)]
struct EngineState {
	chain: ChainState,
	pools: PoolDirectory,
}

/// Serialized, persisted front end of the relay.
pub struct RelayEngine {
	state: Mutex<EngineState>,
	relay: Relay,
	storage: Arc<StorageService>,
	event_bus: EventBus,
}

impl RelayEngine {
	/// Creates an engine with empty state. Call [`RelayEngine::restore`] to
	/// pick up previously committed state.
	pub fn new(relay: Relay, storage: Arc<StorageService>, event_bus: EventBus) -> Self {
		Self {
			state: Mutex::new(EngineState::default()),
			relay,
			storage,
			event_bus,
		}
	}

	pub fn relay(&self) -> &Relay {
		&self.relay
	}

	pub fn event_bus(&self) -> &EventBus {
		&self.event_bus
	}

	/// Replaces the in-memory state with whatever storage holds.
	///
	/// Missing entries leave the corresponding part empty.
	pub async fn restore(&self) -> Result<(), RelayError> {
		let mut state = self.state.lock().await;

		let chain: Option<ChainState> = self
			.storage
			.retrieve_optional(StorageKey::Ledger, LEDGER_ID)
			.await?;
		let descriptors: Option<Vec<PoolDescriptor>> = self
			.storage
			.retrieve_optional(StorageKey::Pools, POOLS_ID)
			.await?;

		let mut pools = PoolDirectory::new();
		for descriptor in descriptors.unwrap_or_default() {
			pools.insert(Arc::new(ConstantProductPool::new(
				descriptor.address,
				descriptor.token0,
				descriptor.token1,
				descriptor.fee,
			)))?;
		}

		state.chain = chain.unwrap_or_default();
		state.pools = pools;
		tracing::info!(pools = state.pools.len(), "Restored relay state");
		Ok(())
	}

	async fn persist_chain(&self, chain: &ChainState) -> Result<(), RelayError> {
		self.storage
			.store(StorageKey::Ledger, LEDGER_ID, chain)
			.await
			.map_err(RelayError::from)
	}

	fn publish(&self, event: RelayEvent) {
		// No subscribers is not an error for the engine.
		self.event_bus.publish(event).ok();
	}

	/// Credits `owner`'s escrow with `value`.
	#[instrument(skip_all, fields(owner = %owner, value = %value))]
	pub async fn deposit(&self, owner: Address, value: U256) -> Result<(), RelayError> {
		let mut state = self.state.lock().await;
		let mut chain = state.chain.clone();
		chain.escrow.deposit(owner, value)?;
		self.persist_chain(&chain).await?;
		state.chain = chain;
		drop(state);

		tracing::info!("Deposited");
		self.publish(RelayEvent::Escrow(EscrowEvent::Deposited { owner, value }));
		Ok(())
	}

	/// Debits the caller's own escrow.
	#[instrument(skip_all, fields(caller = %caller, value = %value))]
	pub async fn withdraw(&self, caller: Address, value: U256) -> Result<(), RelayError> {
		let mut state = self.state.lock().await;
		let mut chain = state.chain.clone();
		chain.escrow.withdraw(caller, value)?;
		self.persist_chain(&chain).await?;
		state.chain = chain;
		drop(state);

		tracing::info!("Withdrawn");
		self.publish(RelayEvent::Escrow(EscrowEvent::Withdrawn {
			owner: caller,
			value,
		}));
		Ok(())
	}

	pub async fn balance_of(&self, owner: Address) -> U256 {
		self.state.lock().await.chain.escrow.balance_of(owner)
	}

	/// Next nonce the owner's authorization must carry.
	pub async fn nonces(&self, owner: Address) -> U256 {
		self.state.lock().await.chain.nonces.expected(owner)
	}

	pub async fn token_balance(&self, token: Address, holder: Address) -> U256 {
		self.state.lock().await.chain.tokens.balance_of(token, holder)
	}

	pub async fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
		self.state
			.lock()
			.await
			.chain
			.tokens
			.allowance(token, owner, spender)
	}

	/// Sets `owner`'s allowance of `token` for `spender`.
	#[instrument(skip_all, fields(owner = %owner, token = %token, spender = %spender))]
	pub async fn approve(
		&self,
		owner: Address,
		token: Address,
		spender: Address,
		amount: U256,
	) -> Result<(), RelayError> {
		let mut state = self.state.lock().await;
		let mut chain = state.chain.clone();
		chain.tokens.approve(token, owner, spender, amount);
		self.persist_chain(&chain).await?;
		state.chain = chain;
		tracing::info!(amount = %amount, "Approved");
		Ok(())
	}

	/// Creates devnet token balance.
	#[instrument(skip_all, fields(token = %token, holder = %holder))]
	pub async fn mint(&self, token: Address, holder: Address, amount: U256) -> Result<(), RelayError> {
		let mut state = self.state.lock().await;
		let mut chain = state.chain.clone();
		chain.tokens.mint(token, holder, amount)?;
		self.persist_chain(&chain).await?;
		state.chain = chain;
		tracing::info!(amount = %amount, "Minted");
		Ok(())
	}

	/// Deploys a constant-product pool at the address the resolver derives
	/// for the pair and fee, seeded with the given reserves.
	#[instrument(skip_all, fields(token_a = %token_a, token_b = %token_b, fee = fee))]
	pub async fn deploy_pool(
		&self,
		token_a: Address,
		token_b: Address,
		fee: u32,
		reserve_a: U256,
		reserve_b: U256,
	) -> Result<Address, RelayError> {
		if token_a == token_b {
			return Err(RelayError::Deployment(format!(
				"pool needs two distinct tokens, got {} twice",
				token_a
			)));
		}
		if fee == 0 || fee >= FEE_DENOMINATOR {
			return Err(RelayError::Deployment(format!(
				"fee tier {} outside 1..{}",
				fee, FEE_DENOMINATOR
			)));
		}

		let address = self.relay.resolver().resolve(token_a, token_b, fee);
		let mut state = self.state.lock().await;
		if state.pools.contains(&address) {
			return Err(PoolError::AlreadyDeployed(address).into());
		}

		let mut chain = state.chain.clone();
		chain.tokens.mint(token_a, address, reserve_a)?;
		chain.tokens.mint(token_b, address, reserve_b)?;
		let mut pools = state.pools.clone();
		pools.insert(Arc::new(ConstantProductPool::new(
			address, token_a, token_b, fee,
		)))?;

		self.persist_chain(&chain).await?;
		self.storage
			.store(StorageKey::Pools, POOLS_ID, &pools.descriptors())
			.await?;
		state.chain = chain;
		state.pools = pools;

		tracing::info!(pool = %address, key = ?PoolKey::new(token_a, token_b, fee), "Deployed pool");
		Ok(address)
	}

	/// Descriptors of every deployed pool.
	pub async fn pools(&self) -> Vec<PoolDescriptor> {
		self.state.lock().await.pools.descriptors()
	}

	/// Settles a signed payload for `submission.relayer`.
	///
	/// Rejections are published on the event bus and returned; nothing is
	/// committed for them.
	#[instrument(skip_all, fields(relayer = %submission.relayer))]
	pub async fn relayed_swap(
		&self,
		submission: RelaySubmission,
		signature: RecoverableSignature,
		payload: &[u8],
	) -> Result<SwapReceipt, RelayError> {
		let result = self.try_relayed_swap(&submission, &signature, payload).await;
		match &result {
			Ok(receipt) => {
				tracing::info!(
					owner = %receipt.owner,
					nonce = %receipt.nonce,
					settled = %receipt.settled,
					incentive = %receipt.incentive,
					"Settled"
				);
				self.publish(RelayEvent::Swap(SwapEvent::Settled {
					receipt: receipt.clone(),
				}));
			}
			Err(e) => {
				tracing::warn!(error = %e, "Rejected");
				self.publish(RelayEvent::Swap(SwapEvent::Rejected {
					relayer: submission.relayer,
					reason: e.to_string(),
				}));
			}
		}
		result
	}

	async fn try_relayed_swap(
		&self,
		submission: &RelaySubmission,
		signature: &RecoverableSignature,
		payload: &[u8],
	) -> Result<SwapReceipt, RelayError> {
		let mut state = self.state.lock().await;
		let mut chain = state.chain.clone();
		let receipt =
			self.relay
				.relayed_swap(&mut chain, &state.pools, submission, signature, payload)?;

		// The ledger snapshot is the commit point; the receipt is derived from it.
		self.persist_chain(&chain).await?;
		state.chain = chain;
		drop(state);

		if let Err(e) = self
			.storage
			.store(StorageKey::Receipts, &receipt.id(), &receipt)
			.await
		{
			tracing::error!(
				owner = %receipt.owner,
				nonce = %receipt.nonce,
				error = %e,
				"Settled but failed to store receipt"
			);
		}
		Ok(receipt)
	}

	/// Static-call preview: same checks, same amounts, nothing committed.
	#[instrument(skip_all, fields(relayer = %submission.relayer))]
	pub async fn preview_relayed_swap(
		&self,
		submission: RelaySubmission,
		signature: RecoverableSignature,
		payload: &[u8],
	) -> Result<U256, RelayError> {
		let state = self.state.lock().await;
		self.relay
			.preview_relayed_swap(&state.chain, &state.pools, &submission, &signature, payload)
	}

	/// Receipt of the settlement that consumed `owner`'s `nonce`.
	pub async fn receipt(&self, owner: Address, nonce: U256) -> Result<SwapReceipt, RelayError> {
		let id = receipt_id(owner, nonce);
		self.storage
			.retrieve_optional(StorageKey::Receipts, &id)
			.await?
			.ok_or(RelayError::NotFound(format!("receipt {}", id)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{address, U160};
	use alloy_signer::SignerSync;
	use alloy_signer_local::PrivateKeySigner;
	use relay_account::SignatureVerifier;
	use relay_pool::PoolResolver;
	use relay_settlement::SwapExecutor;
	use relay_storage::implementations::file::FileStorage;
	use relay_storage::implementations::memory::MemoryStorage;
	use relay_storage::{StorageError, StorageInterface};
	use relay_types::{
		payload_digest, Authorization, CallbackContext, ConfigSchema, SwapDirection, SwapPayload,
	};

	const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
	const DAI: Address = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
	const RAI: Address = address!("03ab458634910AaD20eF5f1C8ee96F1D6ac54919");
	const RELAY_ADDRESS: Address = Address::repeat_byte(0x7e);
	const OWNER: Address = Address::repeat_byte(0x01);
	const NOW: u64 = 1_700_000_000;

	fn ether(n: u64) -> U256 {
		U256::from(n) * U256::from(10u64).pow(U256::from(18))
	}

	fn engine(authority: &PrivateKeySigner, storage: StorageService) -> RelayEngine {
		let relay = Relay::new(
			SignatureVerifier::new(authority.address()),
			PoolResolver::default(),
			SwapExecutor::new(WETH, RELAY_ADDRESS),
			189_000,
		);
		RelayEngine::new(relay, Arc::new(storage), EventBus::new(16))
	}

	fn memory_engine(authority: &PrivateKeySigner) -> RelayEngine {
		engine(authority, StorageService::new(Box::new(MemoryStorage::new())))
	}

	fn signed(
		authority: &PrivateKeySigner,
		auth: Authorization,
		ctx: CallbackContext,
	) -> (RecoverableSignature, Vec<u8>) {
		let payload = SwapPayload::new(auth, ctx).encode();
		let signature = authority
			.sign_message_sync(payload_digest(&payload).as_slice())
			.unwrap()
			.into();
		(signature, payload.to_vec())
	}

	fn buy_dai(pool: Address, nonce: u64) -> (Authorization, CallbackContext) {
		(
			Authorization {
				amount: ether(4_000),
				limit: ether(3),
				deadline: U256::from(NOW + 600),
				nonce: U256::from(nonce),
				max_incentive: U256::from(101),
				pool,
				price_limit: U160::ZERO,
				direction: SwapDirection::ExactOutput,
			},
			CallbackContext {
				input_asset: WETH,
				output_asset: DAI,
				beneficiary: OWNER,
				fee_tier: 3000,
			},
		)
	}

	fn submission(relayer: Address) -> RelaySubmission {
		RelaySubmission {
			relayer,
			fee_rate: U256::from(100),
			timestamp: NOW,
		}
	}

	#[tokio::test]
	async fn test_deposit_withdraw_and_events() {
		let authority = PrivateKeySigner::random();
		let engine = memory_engine(&authority);
		let mut events = engine.event_bus().subscribe();

		engine.deposit(OWNER, U256::from(10)).await.unwrap();
		assert_eq!(engine.balance_of(OWNER).await, U256::from(10));

		let err = engine.withdraw(OWNER, U256::from(11)).await.unwrap_err();
		assert!(matches!(err, RelayError::InsufficientEscrow { .. }));
		engine.withdraw(OWNER, U256::from(4)).await.unwrap();
		assert_eq!(engine.balance_of(OWNER).await, U256::from(6));

		assert!(matches!(
			events.recv().await.unwrap(),
			RelayEvent::Escrow(EscrowEvent::Deposited { .. })
		));
		assert!(matches!(
			events.recv().await.unwrap(),
			RelayEvent::Escrow(EscrowEvent::Withdrawn { .. })
		));
	}

	#[tokio::test]
	async fn test_deploy_pool_at_resolved_address() {
		let authority = PrivateKeySigner::random();
		let engine = memory_engine(&authority);

		let pool = engine
			.deploy_pool(DAI, WETH, 3000, ether(2_000_000), ether(1_000))
			.await
			.unwrap();
		assert_eq!(pool, address!("C2e9F25Be6257c210d7Adf0D4Cd6E3E881ba25f8"));
		assert_eq!(engine.token_balance(WETH, pool).await, ether(1_000));
		assert_eq!(engine.pools().await.len(), 1);

		let err = engine
			.deploy_pool(WETH, DAI, 3000, ether(1), ether(1))
			.await
			.unwrap_err();
		assert!(matches!(err, RelayError::Deployment(_)));
		assert_eq!(engine.token_balance(WETH, pool).await, ether(1_000));
	}

	#[tokio::test]
	async fn test_relayed_swap_commits_receipt_and_publishes() {
		let authority = PrivateKeySigner::random();
		let engine = memory_engine(&authority);
		let relayer = Address::repeat_byte(0x02);
		let pool = engine
			.deploy_pool(WETH, DAI, 3000, ether(1_000), ether(2_000_000))
			.await
			.unwrap();
		engine.deposit(OWNER, ether(10)).await.unwrap();
		let mut events = engine.event_bus().subscribe();

		let (auth, ctx) = buy_dai(pool, 0);
		let (signature, payload) = signed(&authority, auth, ctx);

		let previewed = engine
			.preview_relayed_swap(submission(relayer), signature, &payload)
			.await
			.unwrap();
		assert_eq!(engine.nonces(OWNER).await, U256::ZERO);

		let receipt = engine
			.relayed_swap(submission(relayer), signature, &payload)
			.await
			.unwrap();
		assert_eq!(receipt.settled, previewed);
		assert_eq!(engine.nonces(OWNER).await, U256::from(1));
		assert_eq!(engine.token_balance(DAI, OWNER).await, ether(4_000));
		assert_eq!(engine.balance_of(relayer).await, U256::from(100u64 * 189_000));
		assert_eq!(engine.receipt(OWNER, U256::ZERO).await.unwrap(), receipt);
		assert!(matches!(
			engine.receipt(OWNER, U256::from(1)).await,
			Err(RelayError::NotFound(_))
		));

		match events.recv().await.unwrap() {
			RelayEvent::Swap(SwapEvent::Settled { receipt: published }) => {
				assert_eq!(published, receipt)
			}
			other => panic!("unexpected event {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_racing_relayers_settle_once() {
		let authority = PrivateKeySigner::random();
		let engine = Arc::new(memory_engine(&authority));
		let pool = engine
			.deploy_pool(WETH, DAI, 3000, ether(1_000), ether(2_000_000))
			.await
			.unwrap();
		engine.deposit(OWNER, ether(10)).await.unwrap();

		let (auth, ctx) = buy_dai(pool, 0);
		let (signature, payload) = signed(&authority, auth, ctx);

		let mut handles = Vec::new();
		for byte in [0x02u8, 0x03] {
			let engine = engine.clone();
			let payload = payload.clone();
			handles.push(tokio::spawn(async move {
				engine
					.relayed_swap(submission(Address::repeat_byte(byte)), signature, &payload)
					.await
			}));
		}

		let mut settled = 0;
		let mut replayed = 0;
		for handle in handles {
			match handle.await.unwrap() {
				Ok(_) => settled += 1,
				Err(RelayError::NonceMismatch { expected, presented }) => {
					assert_eq!(expected, U256::from(1));
					assert_eq!(presented, U256::ZERO);
					replayed += 1;
				}
				Err(e) => panic!("unexpected error {}", e),
			}
		}
		assert_eq!((settled, replayed), (1, 1));
		assert_eq!(engine.token_balance(DAI, OWNER).await, ether(4_000));
	}

	#[tokio::test]
	async fn test_token_funded_swap_through_allowance() {
		let authority = PrivateKeySigner::random();
		let engine = memory_engine(&authority);
		let pool = engine
			.deploy_pool(DAI, RAI, 500, ether(3_000_000), ether(1_000_000))
			.await
			.unwrap();
		engine.mint(DAI, OWNER, ether(300)).await.unwrap();
		engine.deposit(OWNER, ether(1)).await.unwrap();

		let (auth, ctx) = (
			Authorization {
				amount: ether(300),
				limit: ether(99),
				deadline: U256::from(NOW + 600),
				nonce: U256::ZERO,
				max_incentive: U256::from(101),
				pool,
				price_limit: U160::ZERO,
				direction: SwapDirection::ExactInput,
			},
			CallbackContext {
				input_asset: DAI,
				output_asset: RAI,
				beneficiary: OWNER,
				fee_tier: 500,
			},
		);
		let (signature, payload) = signed(&authority, auth, ctx);

		let err = engine
			.relayed_swap(submission(Address::repeat_byte(0x02)), signature, &payload)
			.await
			.unwrap_err();
		assert!(matches!(err, RelayError::SwapFailed(_)));
		assert_eq!(engine.nonces(OWNER).await, U256::ZERO);

		engine
			.approve(OWNER, DAI, RELAY_ADDRESS, ether(300))
			.await
			.unwrap();
		let receipt = engine
			.relayed_swap(submission(Address::repeat_byte(0x02)), signature, &payload)
			.await
			.unwrap();
		assert_eq!(receipt.amount_in, ether(300));
		assert_eq!(receipt.escrow_value, U256::ZERO);
		assert_eq!(engine.token_balance(DAI, OWNER).await, U256::ZERO);
		assert_eq!(engine.token_balance(RAI, OWNER).await, receipt.amount_out);
		assert_eq!(engine.allowance(DAI, OWNER, RELAY_ADDRESS).await, U256::ZERO);
	}

	#[tokio::test]
	async fn test_state_survives_restart_on_file_backend() {
		let dir = tempfile::tempdir().unwrap();
		let authority = PrivateKeySigner::random();
		let relayer = Address::repeat_byte(0x02);

		let receipt = {
			let engine = engine(
				&authority,
				StorageService::new(Box::new(FileStorage::new(dir.path().to_path_buf()))),
			);
			let pool = engine
				.deploy_pool(WETH, DAI, 3000, ether(1_000), ether(2_000_000))
				.await
				.unwrap();
			engine.deposit(OWNER, ether(10)).await.unwrap();
			let (auth, ctx) = buy_dai(pool, 0);
			let (signature, payload) = signed(&authority, auth, ctx);
			engine
				.relayed_swap(submission(relayer), signature, &payload)
				.await
				.unwrap()
		};

		let restarted = engine(
			&authority,
			StorageService::new(Box::new(FileStorage::new(dir.path().to_path_buf()))),
		);
		restarted.restore().await.unwrap();

		assert_eq!(restarted.nonces(OWNER).await, U256::from(1));
		assert_eq!(restarted.balance_of(relayer).await, receipt.incentive);
		assert_eq!(restarted.token_balance(DAI, OWNER).await, ether(4_000));
		assert_eq!(restarted.pools().await.len(), 1);
		assert_eq!(restarted.receipt(OWNER, U256::ZERO).await.unwrap(), receipt);

		// The restored pool is live.
		let (auth, ctx) = buy_dai(receipt.pool, 1);
		let (signature, payload) = signed(&authority, auth, ctx);
		restarted
			.relayed_swap(submission(relayer), signature, &payload)
			.await
			.unwrap();
		assert_eq!(restarted.token_balance(DAI, OWNER).await, ether(8_000));
	}

	/// Memory backend that records writes and can refuse one namespace.
	#[derive(Default)]
	struct FlakyStorage {
		inner: MemoryStorage,
		failing: std::sync::Mutex<Option<&'static str>>,
		writes: std::sync::Mutex<Vec<String>>,
	}

	impl FlakyStorage {
		fn fail(&self, namespace: StorageKey) {
			*self.failing.lock().unwrap() = Some(namespace.as_str());
		}

		fn writes_to(&self, namespace: StorageKey) -> usize {
			let prefix = format!("{}:", namespace.as_str());
			self.writes
				.lock()
				.unwrap()
				.iter()
				.filter(|key| key.starts_with(&prefix))
				.count()
		}
	}

	struct SharedStorage(Arc<FlakyStorage>);

	#[async_trait::async_trait]
	impl StorageInterface for SharedStorage {
		async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
			self.0.inner.get_bytes(key).await
		}

		async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
			let failing = *self.0.failing.lock().unwrap();
			if failing.is_some_and(|namespace| key.starts_with(&format!("{}:", namespace))) {
				return Err(StorageError::Backend("disk full".into()));
			}
			self.0.writes.lock().unwrap().push(key.to_string());
			self.0.inner.set_bytes(key, value).await
		}

		async fn delete(&self, key: &str) -> Result<(), StorageError> {
			self.0.inner.delete(key).await
		}

		async fn exists(&self, key: &str) -> Result<bool, StorageError> {
			self.0.inner.exists(key).await
		}

		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			self.0.inner.config_schema()
		}
	}

	async fn flaky_engine(
		authority: &PrivateKeySigner,
	) -> (RelayEngine, Arc<FlakyStorage>, Vec<u8>, RecoverableSignature) {
		let storage = Arc::new(FlakyStorage::default());
		let engine = engine(
			authority,
			StorageService::new(Box::new(SharedStorage(storage.clone()))),
		);
		let pool = engine
			.deploy_pool(WETH, DAI, 3000, ether(1_000), ether(2_000_000))
			.await
			.unwrap();
		engine.deposit(OWNER, ether(10)).await.unwrap();

		let (auth, ctx) = buy_dai(pool, 0);
		let (signature, payload) = signed(authority, auth, ctx);
		(engine, storage, payload, signature)
	}

	#[tokio::test]
	async fn test_ledger_write_failure_stores_no_receipt() {
		let authority = PrivateKeySigner::random();
		let (engine, storage, payload, signature) = flaky_engine(&authority).await;
		storage.fail(StorageKey::Ledger);

		let err = engine
			.relayed_swap(submission(Address::repeat_byte(0x02)), signature, &payload)
			.await
			.unwrap_err();
		assert!(matches!(err, RelayError::Storage(_)));
		assert_eq!(engine.nonces(OWNER).await, U256::ZERO);
		assert_eq!(engine.balance_of(OWNER).await, ether(10));
		assert_eq!(storage.writes_to(StorageKey::Receipts), 0);
	}

	#[tokio::test]
	async fn test_receipt_write_failure_keeps_settlement() {
		let authority = PrivateKeySigner::random();
		let (engine, storage, payload, signature) = flaky_engine(&authority).await;
		storage.fail(StorageKey::Receipts);

		let receipt = engine
			.relayed_swap(submission(Address::repeat_byte(0x02)), signature, &payload)
			.await
			.unwrap();
		assert_eq!(receipt.nonce, U256::ZERO);
		assert_eq!(engine.nonces(OWNER).await, U256::from(1));
		assert!(matches!(
			engine.receipt(OWNER, U256::ZERO).await,
			Err(RelayError::NotFound(_))
		));
	}
}
