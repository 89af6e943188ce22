//! Broadcast channel for relay events.

use relay_types::RelayEvent;
use tokio::sync::broadcast;

/// Fan-out of committed relay events to any number of subscribers.
///
/// Publishing never blocks; subscribers that fall more than `capacity`
/// events behind observe a lag error and resume from the oldest retained
/// event.
#[derive(Debug, Clone)]
pub struct EventBus {
	sender: broadcast::Sender<RelayEvent>,
}

impl EventBus {
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Subscribes to events published from now on.
	pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event, returning the number of subscribers reached.
	///
	/// Fails only when nobody is subscribed.
	pub fn publish(
		&self,
		event: RelayEvent,
	) -> Result<usize, broadcast::error::SendError<RelayEvent>> {
		self.sender.send(event)
	}
}
