//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each pluggable module (storage backends, authority signers) provides a
/// `Registry` struct implementing this trait, naming the key it is configured
/// under and the factory that builds it:
/// - "memory" for `storage.implementations.memory`
/// - "local" for `authority.implementations.local`
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
