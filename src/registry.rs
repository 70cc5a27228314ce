use crate::{error::HostError, Callback, ElementId, HostTree};
use hashbrown::{hash_map::Entry, HashMap};
use tracing::{instrument, trace, trace_span};

/// Identifies an element's bindings.
///
/// The mirrored key is part of it so that keyed siblings that trade places over time can't cross-contaminate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingKey {
	pub id: ElementId,
	pub key: Option<String>,
}

#[derive(Debug)]
struct Binding<N, L> {
	element: N,
	handler: Callback,
	unsubscribe: L,
}

/// Element → event type → currently bound handler and the host listener that delivers it.
///
/// Entries must not outlive their element. Every removal path purges them through [`unbind`](`EventRegistry::unbind`).
#[derive(Debug)]
pub struct EventRegistry<N, L> {
	bindings: HashMap<BindingKey, HashMap<String, Binding<N, L>>>,
}

impl<N, L> Default for EventRegistry<N, L> {
	fn default() -> Self {
		Self { bindings: HashMap::new() }
	}
}

impl<N: Clone, L: 'static> EventRegistry<N, L> {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Binds `handler` for `event_type` on `element`.
	///
	/// Rebinding the same (non-live) handler is a no-op, anything else replaces the previous listener.
	/// Returns whether a listener was (re)installed.
	///
	/// # Errors
	///
	/// Iff the host can't subscribe. The previous binding (if any) is gone in that case.
	#[instrument(level = "trace", skip(self, host, element, handler))]
	pub fn bind<H: HostTree<Node = N, Listener = L>>(&mut self, host: &H, element: &H::Node, key: BindingKey, event_type: &str, handler: &Callback) -> Result<bool, HostError> {
		let slot = self.bindings.entry(key.clone()).or_default();
		if let Some(existing) = slot.get(event_type) {
			if existing.handler == *handler && !handler.is_live() {
				trace!("Handler unchanged. Not rebinding.");
				return Ok(false);
			}
		}

		if let Some(previous) = slot.remove(event_type) {
			trace!(previous = ?previous.handler, "Unsubscribing previous handler.");
			host.remove_event_listener(element, event_type, previous.unsubscribe);
		}

		match host.add_event_listener(element, event_type, handler) {
			Ok(unsubscribe) => {
				slot.insert(
					event_type.to_owned(),
					Binding {
						element: element.clone(),
						handler: handler.clone(),
						unsubscribe,
					},
				);
				Ok(true)
			}
			Err(error) => {
				if slot.is_empty() {
					self.bindings.remove(&key);
				}
				Err(error)
			}
		}
	}

	/// Removes one binding, or all of them if `event_type` is [`None`].
	///
	/// Returns how many listeners were removed.
	#[instrument(level = "trace", skip(self, host, element))]
	pub fn unbind<H: HostTree<Node = N, Listener = L>>(&mut self, host: &H, element: &H::Node, key: &BindingKey, event_type: Option<&str>) -> usize {
		let mut entry = match self.bindings.entry(key.clone()) {
			Entry::Occupied(entry) => entry,
			Entry::Vacant(_) => return 0,
		};

		let removed = match event_type {
			Some(event_type) => match entry.get_mut().remove(event_type) {
				Some(binding) => {
					host.remove_event_listener(element, event_type, binding.unsubscribe);
					1
				}
				None => 0,
			},
			None => {
				let mut count = 0;
				for (event_type, binding) in entry.get_mut().drain() {
					let span = trace_span!("Unsubscribing", event_type = event_type.as_str());
					let _enter = span.enter();
					host.remove_event_listener(element, &event_type, binding.unsubscribe);
					count += 1;
				}
				count
			}
		};

		if entry.get().is_empty() {
			entry.remove();
		}
		removed
	}

	#[must_use]
	pub fn exists(&self, key: &BindingKey, event_type: &str, handler: &Callback) -> bool {
		self.bindings
			.get(key)
			.and_then(|slot| slot.get(event_type))
			.map_or(false, |binding| binding.handler == *handler)
	}

	/// The event types currently bound for an element, sorted.
	#[must_use]
	pub fn event_types(&self, key: &BindingKey) -> Vec<String> {
		let mut event_types: Vec<String> = self.bindings.get(key).map_or_else(Vec::new, |slot| slot.keys().cloned().collect());
		event_types.sort_unstable();
		event_types
	}

	/// The number of elements with at least one binding.
	#[must_use]
	pub fn len(&self) -> usize {
		self.bindings.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.bindings.is_empty()
	}

	/// Unsubscribes and forgets every binding.
	///
	/// Returns how many listeners were removed.
	#[instrument(level = "trace", skip(self, host))]
	pub fn clear<H: HostTree<Node = N, Listener = L>>(&mut self, host: &H) -> usize {
		let mut count = 0;
		for (key, slot) in self.bindings.drain() {
			for (event_type, binding) in slot {
				trace!(id = %key.id, event_type = event_type.as_str(), "Unsubscribing.");
				host.remove_event_listener(&binding.element, &event_type, binding.unsubscribe);
				count += 1;
			}
		}
		count
	}
}
