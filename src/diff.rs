use crate::{
	config::EngineConfig,
	context::Context,
	error::DiffError,
	node::is_reserved_attribute,
	patch::{remove_trailing, Patch},
	trace::content,
	Attribute, ElementNode, EventProp, HostNode, HostTree, NodeKind, VNode,
};
use serde_json::Value;
use tracing::{error, instrument, trace, trace_span};

/// The child list of one parent as it will look once the patches emitted so far are applied.
///
/// Keeping this up to date while diffing siblings means positional lookups, keyed lookups and emitted indices
/// all agree with what the applier will find, even though nothing is mutated until the diff is complete.
struct Slots<N> {
	nodes: Vec<N>,
}

impl<N: HostNode> Slots<N> {
	fn live<H: HostTree<Node = N>>(host: &H, parent: &N) -> Self {
		Self {
			nodes: host.child_nodes(parent),
		}
	}

	/// The (empty) child list of a node created during this diff.
	fn detached() -> Self {
		Self { nodes: Vec::new() }
	}

	fn len(&self) -> usize {
		self.nodes.len()
	}

	fn get(&self, index: usize) -> Option<&N> {
		self.nodes.get(index)
	}

	fn position_of_key(&self, key: &str) -> Option<usize> {
		self.nodes.iter().position(|node| node.dom_key().as_deref() == Some(key))
	}

	/// Returns the position the node ended up at.
	fn move_to(&mut self, from: usize, to: usize) -> usize {
		let node = self.nodes.remove(from);
		let to = to.min(self.nodes.len());
		self.nodes.insert(to, node);
		to
	}

	fn insert(&mut self, index: usize, node: N) -> usize {
		let index = index.min(self.nodes.len());
		self.nodes.insert(index, node);
		index
	}

	fn replace(&mut self, index: usize, node: N) {
		if let Some(slot) = self.nodes.get_mut(index) {
			*slot = node
		}
	}
}

/// Accumulates the patches that reconcile one [`VNode`] with a slot of a live parent.
pub(crate) struct Differ<'a, H: HostTree> {
	host: &'a H,
	context: &'a Context<H>,
	depth_limit: usize,
	patches: Vec<Patch<H::Node>>,
}

impl<'a, H: HostTree> Differ<'a, H> {
	pub(crate) fn new(host: &'a H, context: &'a Context<H>, config: &EngineConfig) -> Self {
		Self {
			host,
			context,
			depth_limit: config.depth_limit,
			patches: Vec::new(),
		}
	}

	pub(crate) fn finish(self) -> Vec<Patch<H::Node>> {
		self.patches
	}

	/// Diffs `node` against the child of `parent` at `index` (or, if keyed, the child with the same key).
	#[instrument(level = "trace", skip(self, node))]
	pub(crate) fn diff_at(&mut self, node: &VNode, parent: &H::Node, index: usize) -> Result<(), DiffError> {
		let mut slots = Slots::live(self.host, parent);
		self.diff_node(node, parent, &mut slots, index, self.depth_limit)
	}

	fn diff_node(&mut self, node: &VNode, parent: &H::Node, slots: &mut Slots<H::Node>, index: usize, depth_limit: usize) -> Result<(), DiffError> {
		if depth_limit == 0 {
			error!("Depth limit reached");
			return Err(DiffError::DepthLimit { limit: self.depth_limit });
		}

		match node {
			VNode::Text(text) => {
				self.diff_text(text, parent, slots, index);
				Ok(())
			}
			VNode::Element(element) => self.diff_element(element, parent, slots, index, depth_limit),
		}
	}

	fn diff_text(&mut self, text: &str, parent: &H::Node, slots: &mut Slots<H::Node>, index: usize) {
		let span = trace_span!("Diffing text node", text = content(text), index);
		let _enter = span.enter();

		match slots.get(index).cloned() {
			Some(current) => match self.host.kind(&current) {
				NodeKind::Text(data) if data == text => trace!("Text unchanged."),
				NodeKind::Text(_) => self.patches.push(Patch::UpdateText {
					node: current,
					text: text.to_owned(),
				}),
				// Keyed elements are found by key, so text never takes their place.
				NodeKind::Element(_) if current.dom_key().is_some() => {
					trace!("Slot holds a keyed element. Inserting text before it.");
					self.insert_text(text, parent, slots, index)
				}
				NodeKind::Element(_) | NodeKind::Other => {
					trace!("Slot holds a non-text node. Replacing it.");
					let new = self.host.create_text(text);
					self.patches.push(Patch::ReplaceNode {
						parent: parent.clone(),
						old: current,
						new: new.clone(),
					});
					slots.replace(index, new);
				}
			},
			None => self.insert_text(text, parent, slots, index),
		}
	}

	fn insert_text(&mut self, text: &str, parent: &H::Node, slots: &mut Slots<H::Node>, index: usize) {
		let node = self.host.create_text(text);
		self.patches.push(Patch::CreateText {
			parent: parent.clone(),
			node: node.clone(),
			index,
		});
		slots.insert(index, node);
	}

	fn diff_element(&mut self, element: &ElementNode, parent: &H::Node, slots: &mut Slots<H::Node>, index: usize, depth_limit: usize) -> Result<(), DiffError> {
		let span = trace_span!("Diffing element", tag = element.tag(), key = element.key(), index);
		let _enter = span.enter();

		let (target, fresh) = self.resolve(element, parent, slots, index)?;

		self.diff_attributes(element, &target, fresh);

		if fresh {
			if let Some(callback) = element.reference() {
				self.patches.push(Patch::InvokeReferenceCallback {
					element: target.clone(),
					callback: callback.clone(),
				})
			}
		}

		if element.is_widget() {
			self.diff_widget(element, &target, fresh)
		}

		self.diff_events(element, &target);

		if let Some(html) = element.inner_html() {
			if fresh || self.host.inner_html(&target) != html {
				self.patches.push(Patch::SetInnerHtml {
					element: target,
					html: html.to_owned(),
				})
			} else {
				trace!("Raw HTML unchanged.")
			}
			return Ok(());
		}

		if element.is_widget() {
			trace!("Widgets render their own children.");
			return Ok(());
		}

		self.diff_children(element, &target, fresh, depth_limit)
	}

	/// Finds the live element `element` reconciles with, creating or replacing one as needed.
	///
	/// Returns the element and whether it is new.
	fn resolve(&mut self, element: &ElementNode, parent: &H::Node, slots: &mut Slots<H::Node>, index: usize) -> Result<(H::Node, bool), DiffError> {
		let existing = match element.key() {
			Some(key) => slots.position_of_key(key).map(|position| {
				let found = slots.nodes[position].clone();
				if position == index {
					(found, position)
				} else {
					trace!(from = position, to = index, "Keyed element moved.");
					self.patches.push(Patch::SortNode {
						parent: parent.clone(),
						element: found.clone(),
						index,
					});
					(found, slots.move_to(position, index))
				}
			}),
			None => slots.get(index).cloned().map(|found| (found, index)),
		};

		match existing {
			None => {
				let created = self.create(element)?;
				self.patches.push(Patch::CreateNode {
					parent: parent.clone(),
					element: created.clone(),
					index,
				});
				slots.insert(index, created.clone());
				Ok((created, true))
			}
			Some((existing, position)) => match self.host.kind(&existing) {
				NodeKind::Element(tag) if tag.eq_ignore_ascii_case(element.tag()) => Ok((existing, false)),
				_ => {
					trace!("Type mismatch. Replacing.");
					let created = self.create(element)?;
					self.patches.push(Patch::ReplaceNode {
						parent: parent.clone(),
						old: existing,
						new: created.clone(),
					});
					slots.replace(position, created.clone());
					Ok((created, true))
				}
			},
		}
	}

	fn create(&self, element: &ElementNode) -> Result<H::Node, DiffError> {
		let created = self.host.create_element(element.tag())?;
		let id = self.context.allocate();
		created.set_identity(id);
		if let Some(key) = element.key() {
			created.set_dom_key(key)
		}
		trace!(%id, "Created element.");
		Ok(created)
	}

	fn diff_attributes(&mut self, element: &ElementNode, target: &H::Node, fresh: bool) {
		let live: Vec<String> = if fresh {
			Vec::new()
		} else {
			self.host.attribute_names(target).into_iter().filter(|name| !is_reserved_attribute(name)).collect()
		};

		let declared = || element.attributes().iter().filter_map(|Attribute { name, value }| value.rendered().map(|rendered| (name, value, rendered)));

		for (name, value, rendered) in declared() {
			if !live.iter().any(|live| live.eq_ignore_ascii_case(name)) {
				trace!(name = name.as_str(), value = content(rendered), "Creating attribute.");
				self.patches.push(Patch::CreateAttr {
					element: target.clone(),
					name: name.clone(),
					value: value.clone(),
				})
			} else if self.host.get_attribute(target, name).as_deref() != Some(rendered) {
				trace!(name = name.as_str(), value = content(rendered), "Updating attribute.");
				self.patches.push(Patch::UpdateAttr {
					element: target.clone(),
					name: name.clone(),
					value: value.clone(),
				})
			}
		}

		for name in live {
			if !declared().any(|(declared, _, _)| declared.eq_ignore_ascii_case(&name)) {
				self.patches.push(Patch::RemoveAttr {
					element: target.clone(),
					name,
				})
			}
		}
	}

	fn diff_widget(&mut self, element: &ElementNode, target: &H::Node, fresh: bool) {
		let children = element.children().unwrap_or_default().to_vec();
		if fresh {
			self.patches.push(Patch::InitialiseWidget {
				element: target.clone(),
				state: element.state().cloned(),
				children,
			})
		} else if !element.propagates() {
			trace!("Widget opted out of state propagation.")
		} else if let Some(state) = element.state().filter(|state| !is_empty_state(state)) {
			self.patches.push(Patch::PropagateWidgetProps {
				element: target.clone(),
				state: state.clone(),
				children,
			})
		}
	}

	/// Maps declared events unless the exact handler is already bound, and unmaps bound events that are no longer declared.
	fn diff_events(&mut self, element: &ElementNode, target: &H::Node) {
		let context = self.context;
		let registry = context.registry.borrow();
		let key = Context::<H>::existing_binding_key(target);

		for EventProp { event_type, handler } in element.events() {
			let bound = key.as_ref().map_or(false, |key| registry.exists(key, event_type, handler));
			if bound && !handler.is_live() {
				trace!(event_type = event_type.as_str(), "Handler already bound.");
				continue;
			}
			self.patches.push(Patch::MapEvent {
				element: target.clone(),
				event_type: event_type.clone(),
				handler: handler.clone(),
			})
		}

		if let Some(key) = key {
			for event_type in registry.event_types(&key) {
				if !element.events().iter().any(|event| event.event_type == event_type) {
					self.patches.push(Patch::RemoveEvent {
						element: target.clone(),
						event_type,
					})
				}
			}
		}
	}

	fn diff_children(&mut self, element: &ElementNode, target: &H::Node, fresh: bool, depth_limit: usize) -> Result<(), DiffError> {
		let children = element.children().unwrap_or_default();
		let mut slots = if fresh { Slots::detached() } else { Slots::live(self.host, target) };

		for (index, child) in children.iter().enumerate() {
			self.diff_node(child, target, &mut slots, index, depth_limit - 1)?;
		}

		if slots.len() <= children.len() {
			return Ok(());
		}

		if element.has_keyed_children() {
			// Every declared key was sorted into place above, so whatever is left over isn't declared anymore.
			for node in &slots.nodes[children.len()..] {
				trace!(key = ?node.dom_key(), "Removing undeclared keyed node.");
				self.patches.push(Patch::RemoveNode {
					parent: target.clone(),
					node: node.clone(),
				})
			}
		} else if let Some(patch) = remove_trailing(target, slots.len(), children.len()) {
			self.patches.push(patch)
		}
		Ok(())
	}
}

fn is_empty_state(state: &Value) -> bool {
	match state {
		Value::Null => true,
		Value::String(text) => text.is_empty(),
		Value::Array(items) => items.is_empty(),
		Value::Object(fields) => fields.is_empty(),
		Value::Bool(_) | Value::Number(_) => false,
	}
}
