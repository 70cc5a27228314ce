use crate::{
	registry::{BindingKey, EventRegistry},
	HostNode, HostTree,
};
use core::{
	cell::{Cell, RefCell},
	fmt,
};
use tracing::trace;

/// Engine-assigned element identity. Never reassigned or recycled while its [`Context`] lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElementId(u64);

impl ElementId {
	#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
	pub(crate) fn from_raw(id: u64) -> Self {
		Self(id)
	}

	#[must_use]
	pub fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for ElementId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// The mutable state shared by every mount root of one [`Engine`](`crate::Engine`):
/// the identity counter and the event binding registry.
pub(crate) struct Context<H: HostTree> {
	last_id: Cell<u64>,
	pub(crate) registry: RefCell<EventRegistry<H::Node, H::Listener>>,
}

impl<H: HostTree> Context<H> {
	pub(crate) fn new() -> Self {
		Self {
			last_id: Cell::new(0),
			registry: RefCell::new(EventRegistry::new()),
		}
	}

	pub(crate) fn allocate(&self) -> ElementId {
		let id = self.last_id.get() + 1;
		self.last_id.set(id);
		ElementId(id)
	}

	/// The node's identity, assigning a new one if it has none yet.
	pub(crate) fn identify(&self, node: &H::Node) -> ElementId {
		node.identity().unwrap_or_else(|| {
			let id = self.allocate();
			trace!(%id, "Assigned identity to foreign node.");
			node.set_identity(id);
			id
		})
	}

	pub(crate) fn binding_key(&self, node: &H::Node) -> BindingKey {
		BindingKey {
			id: self.identify(node),
			key: node.dom_key(),
		}
	}

	/// Like [`binding_key`](`Context::binding_key`), but [`None`] for nodes the engine has never identified,
	/// which can't have bindings.
	pub(crate) fn existing_binding_key(node: &H::Node) -> Option<BindingKey> {
		node.identity().map(|id| BindingKey { id, key: node.dom_key() })
	}

	/// Purges the bindings of `root` and all of its descendants and [releases](`HostTree::release`) them.
	///
	/// Returns the number of listeners removed.
	pub(crate) fn release_tree(&self, host: &H, root: &H::Node) -> usize {
		let mut registry = self.registry.borrow_mut();
		let mut removed = 0;
		let mut stack = vec![root.clone()];
		while let Some(node) = stack.pop() {
			if !registry.is_empty() {
				if let Some(key) = Self::existing_binding_key(&node) {
					removed += registry.unbind(host, &node, &key, None);
				}
			}
			stack.extend(host.child_nodes(&node));
			host.release(&node);
		}
		removed
	}

	/// Unsubscribes and forgets all bindings. The identity counter keeps going, since nodes identified before may still be around.
	pub(crate) fn reset(&self, host: &H) {
		let removed = self.registry.borrow_mut().clear(host);
		trace!(removed, "Reset event bindings.");
	}
}
