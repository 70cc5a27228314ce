//! The immutable node model and its builder.
//!
//! Properties are classified exactly once, in [`build`], into attributes, event bindings and engine-internal [`Directive`]s.
//! Nothing downstream inspects property names again.

use crate::{error::BuildError, style};
use core::{
	any::{type_name, Any},
	fmt,
	hash::{Hash, Hasher},
};
use hashbrown::HashSet;
use serde_json::{Map, Value};
use std::rc::Rc;
use tracing::{instrument, warn};

/// Tags starting with this prefix are [widgets](`crate::Widget`).
pub const WIDGET_PREFIX: &str = "xy-";

/// The attribute a host may use to mirror [`ElementId`](`crate::ElementId`)s into markup.
///
/// It is filtered from attribute diffs and can't be set through [`build`].
pub const IDENTITY_ATTRIBUTE: &str = "data-xylem-id";

/// Property names that become [`Directive`]s instead of attributes.
pub const DIRECTIVE_NAMES: &[&str] = &["key", "ref", "state", "propagate", "innerhtml"];

const LEGACY_PROPS: &str = "props";

#[must_use]
pub fn is_reserved_attribute(name: &str) -> bool {
	name.eq_ignore_ascii_case(IDENTITY_ATTRIBUTE)
}

/// A shared, type-erased callback used for event handlers and `ref`s.
///
/// Event handlers receive the host's event value, `ref` callbacks the host node, both as [`&dyn Any`](`Any`).
/// Two [`Callback`]s are equal iff they are clones of the same allocation,
/// which is what makes rebinding an unchanged handler a no-op.
#[derive(Clone)]
pub struct Callback {
	function: Rc<dyn Fn(&dyn Any)>,
	live: bool,
}

impl Callback {
	pub fn new(function: impl Fn(&dyn Any) + 'static) -> Self {
		Self {
			function: Rc::new(function),
			live: false,
		}
	}

	/// A callback that is rebound on every diff, even if unchanged.
	pub fn live(function: impl Fn(&dyn Any) + 'static) -> Self {
		Self {
			function: Rc::new(function),
			live: true,
		}
	}

	/// Wraps a callback that only accepts arguments of type `T`.
	///
	/// Arguments of any other type are ignored with a warning.
	pub fn on<T: Any>(function: impl Fn(&T) + 'static) -> Self {
		Self::new(move |argument| match argument.downcast_ref::<T>() {
			Some(argument) => function(argument),
			None => warn!("Callback expected a `{}` argument but received something else. Ignoring.", type_name::<T>()),
		})
	}

	#[must_use]
	pub fn is_live(&self) -> bool {
		self.live
	}

	pub fn call(&self, argument: &dyn Any) {
		(self.function)(argument)
	}

	pub(crate) fn address(&self) -> usize {
		Rc::as_ptr(&self.function).cast::<()>() as usize
	}
}

impl PartialEq for Callback {
	fn eq(&self, other: &Self) -> bool {
		self.address() == other.address() && self.live == other.live
	}
}
impl Eq for Callback {}

impl Hash for Callback {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.address().hash(state)
	}
}

impl fmt::Debug for Callback {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Callback")
			.field("address", &format_args!("{:#x}", self.address()))
			.field("live", &self.live)
			.finish()
	}
}

/// A raw property value, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Prop {
	Value(Value),
	Callback(Callback),
}

impl Prop {
	fn type_name(&self) -> &'static str {
		match self {
			Prop::Value(value) => json_type_name(value),
			Prop::Callback(_) => "callback",
		}
	}
}

impl From<Value> for Prop {
	fn from(value: Value) -> Self {
		Self::Value(value)
	}
}
impl From<Callback> for Prop {
	fn from(callback: Callback) -> Self {
		Self::Callback(callback)
	}
}
impl From<&str> for Prop {
	fn from(value: &str) -> Self {
		Self::Value(Value::String(value.to_owned()))
	}
}
impl From<String> for Prop {
	fn from(value: String) -> Self {
		Self::Value(Value::String(value))
	}
}
impl From<bool> for Prop {
	fn from(value: bool) -> Self {
		Self::Value(Value::Bool(value))
	}
}
impl From<i32> for Prop {
	fn from(value: i32) -> Self {
		Self::Value(value.into())
	}
}
impl From<i64> for Prop {
	fn from(value: i64) -> Self {
		Self::Value(value.into())
	}
}
impl From<f64> for Prop {
	fn from(value: f64) -> Self {
		Self::Value(value.into())
	}
}

/// An ordered property bag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props(Vec<(String, Prop)>);

impl Props {
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	#[must_use]
	pub fn with(mut self, name: impl Into<String>, value: impl Into<Prop>) -> Self {
		self.push(name, value);
		self
	}

	pub fn push(&mut self, name: impl Into<String>, value: impl Into<Prop>) {
		self.0.push((name.into(), value.into()))
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Prop)> {
		self.0.iter().map(|(name, prop)| (name.as_str(), prop))
	}
}

impl<K: Into<String>, V: Into<Prop>> FromIterator<(K, V)> for Props {
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Self(iter.into_iter().map(|(name, value)| (name.into(), value.into())).collect())
	}
}

impl From<Map<String, Value>> for Props {
	fn from(map: Map<String, Value>) -> Self {
		map.into_iter().collect()
	}
}

/// The category a property is sorted into by [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropKind {
	Attribute,
	Event,
	Internal,
}

/// Decides which category a property belongs to.
///
/// Directive names (and the engine's identity attribute) are internal.
/// Names starting with `on`, and any callback value, are events. Everything else is an attribute.
#[must_use]
pub fn classify(name: &str, value: &Prop) -> PropKind {
	if DIRECTIVE_NAMES.contains(&name) || is_reserved_attribute(name) {
		PropKind::Internal
	} else if (name.len() > 2 && name.starts_with("on")) || matches!(value, Prop::Callback(_)) {
		PropKind::Event
	} else {
		PropKind::Attribute
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrValue {
	Text(String),
	/// A boolean attribute. `false` means absent.
	Flag(bool),
}

impl AttrValue {
	/// The attribute string this value renders as, or [`None`] if the attribute should be absent.
	#[must_use]
	pub fn rendered(&self) -> Option<&str> {
		match self {
			AttrValue::Text(text) => Some(text),
			AttrValue::Flag(true) => Some(""),
			AttrValue::Flag(false) => None,
		}
	}
}

impl From<&str> for AttrValue {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}
impl From<String> for AttrValue {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}
impl From<bool> for AttrValue {
	fn from(flag: bool) -> Self {
		Self::Flag(flag)
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
	pub name: String,
	pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventProp {
	pub event_type: String,
	pub handler: Callback,
}

/// Engine-internal directives. These never reach the host as attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
	Key(String),
	Ref(Callback),
	State(Value),
	Propagate(bool),
	InnerHtml(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementNode {
	tag: String,
	children: Option<Vec<VNode>>,
	attributes: Vec<Attribute>,
	events: Vec<EventProp>,
	internal: Vec<Directive>,
	is_widget: bool,
}

impl ElementNode {
	pub(crate) fn reflected(tag: String, attributes: Vec<Attribute>, key: Option<String>, children: Option<Vec<VNode>>) -> Self {
		Self {
			is_widget: tag.starts_with(WIDGET_PREFIX),
			tag,
			children,
			attributes,
			events: Vec::new(),
			internal: key.map(Directive::Key).into_iter().collect(),
		}
	}

	#[must_use]
	pub fn tag(&self) -> &str {
		&self.tag
	}

	/// [`None`] if no children were given at all, which is treated like an empty list.
	#[must_use]
	pub fn children(&self) -> Option<&[VNode]> {
		self.children.as_deref()
	}

	#[must_use]
	pub fn attributes(&self) -> &[Attribute] {
		&self.attributes
	}

	#[must_use]
	pub fn attribute(&self, name: &str) -> Option<&AttrValue> {
		self.attributes.iter().find(|attribute| attribute.name == name).map(|attribute| &attribute.value)
	}

	#[must_use]
	pub fn events(&self) -> &[EventProp] {
		&self.events
	}

	#[must_use]
	pub fn internal(&self) -> &[Directive] {
		&self.internal
	}

	#[must_use]
	pub fn is_widget(&self) -> bool {
		self.is_widget
	}

	#[must_use]
	pub fn key(&self) -> Option<&str> {
		self.internal.iter().find_map(|directive| match directive {
			Directive::Key(key) => Some(key.as_str()),
			_ => None,
		})
	}

	#[must_use]
	pub fn reference(&self) -> Option<&Callback> {
		self.internal.iter().find_map(|directive| match directive {
			Directive::Ref(callback) => Some(callback),
			_ => None,
		})
	}

	#[must_use]
	pub fn state(&self) -> Option<&Value> {
		self.internal.iter().find_map(|directive| match directive {
			Directive::State(state) => Some(state),
			_ => None,
		})
	}

	/// Whether widget state is pushed into an existing widget on re-render. Defaults to `true`.
	#[must_use]
	pub fn propagates(&self) -> bool {
		self.internal
			.iter()
			.find_map(|directive| match directive {
				Directive::Propagate(propagate) => Some(*propagate),
				_ => None,
			})
			.unwrap_or(true)
	}

	#[must_use]
	pub fn inner_html(&self) -> Option<&str> {
		self.internal.iter().find_map(|directive| match directive {
			Directive::InnerHtml(html) => Some(html.as_str()),
			_ => None,
		})
	}

	#[must_use]
	pub fn has_keyed_children(&self) -> bool {
		self.children().unwrap_or_default().iter().any(|child| child.key().is_some())
	}
}

/// A declarative description of one host node.
#[derive(Debug, Clone, PartialEq)]
pub enum VNode {
	Text(String),
	Element(ElementNode),
}

impl VNode {
	pub fn text(text: impl Into<String>) -> Self {
		Self::Text(text.into())
	}

	/// The empty text node, which is what `null` children turn into.
	#[must_use]
	pub fn empty() -> Self {
		Self::Text(String::new())
	}

	#[must_use]
	pub fn as_element(&self) -> Option<&ElementNode> {
		match self {
			VNode::Element(element) => Some(element),
			VNode::Text(_) => None,
		}
	}

	#[must_use]
	pub fn key(&self) -> Option<&str> {
		self.as_element().and_then(ElementNode::key)
	}

	/// Builds a node from a JSON description.
	///
	/// Strings are text, `null` is the empty text node, and objects need a string `type`.
	/// An object's `children` field holds its children, all other fields are properties.
	///
	/// # Errors
	///
	/// Any [`BuildError`] [`build`] can return, or [`BuildError::InvalidNode`] for any other JSON value.
	pub fn from_json(value: Value) -> Result<Self, BuildError> {
		match value {
			Value::String(text) => Ok(Self::Text(text)),
			Value::Null => Ok(Self::empty()),
			Value::Object(fields) => {
				let mut tag = None;
				let mut children = Children::default();
				let mut props = Props::new();
				for (name, value) in fields {
					match name.as_str() {
						"type" => tag = Some(value),
						"children" => children = value.into(),
						_ => props.push(name, value),
					}
				}
				match tag {
					Some(Value::String(tag)) => build(&tag, props, children),
					_ => Err(BuildError::InvalidNode { found: "object" }),
				}
			}
			other => Err(BuildError::InvalidNode {
				found: json_type_name(&other),
			}),
		}
	}
}

impl From<&str> for VNode {
	fn from(text: &str) -> Self {
		Self::text(text)
	}
}
impl From<String> for VNode {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

/// One not-yet-validated child.
#[derive(Debug, Clone)]
pub struct Child(ChildRepr);

#[derive(Debug, Clone)]
enum ChildRepr {
	Node(VNode),
	Json(Value),
	Failed(BuildError),
}

impl Child {
	fn into_node(self) -> Result<VNode, BuildError> {
		match self.0 {
			ChildRepr::Node(node) => Ok(node),
			ChildRepr::Json(value) => VNode::from_json(value),
			ChildRepr::Failed(error) => Err(error),
		}
	}
}

impl From<VNode> for Child {
	fn from(node: VNode) -> Self {
		Self(ChildRepr::Node(node))
	}
}
impl From<&str> for Child {
	fn from(text: &str) -> Self {
		Self(ChildRepr::Node(VNode::text(text)))
	}
}
impl From<String> for Child {
	fn from(text: String) -> Self {
		Self(ChildRepr::Node(VNode::Text(text)))
	}
}
impl From<Value> for Child {
	fn from(value: Value) -> Self {
		Self(ChildRepr::Json(value))
	}
}
/// Lets nested builder calls be passed without `?`. The first failure fails the parent.
impl From<Result<VNode, BuildError>> for Child {
	fn from(result: Result<VNode, BuildError>) -> Self {
		Self(match result {
			Ok(node) => ChildRepr::Node(node),
			Err(error) => ChildRepr::Failed(error),
		})
	}
}

/// The `children` argument of [`build`]: nothing, one child, or a sequence.
#[derive(Debug, Clone, Default)]
pub struct Children(Option<Vec<Child>>);

impl From<()> for Children {
	fn from((): ()) -> Self {
		Self(None)
	}
}
impl From<VNode> for Children {
	fn from(node: VNode) -> Self {
		Self(Some(vec![node.into()]))
	}
}
impl From<&str> for Children {
	fn from(text: &str) -> Self {
		Self(Some(vec![text.into()]))
	}
}
impl From<String> for Children {
	fn from(text: String) -> Self {
		Self(Some(vec![text.into()]))
	}
}
impl From<Result<VNode, BuildError>> for Children {
	fn from(result: Result<VNode, BuildError>) -> Self {
		Self(Some(vec![result.into()]))
	}
}
impl From<Value> for Children {
	fn from(value: Value) -> Self {
		match value {
			Value::Null => Self(None),
			Value::Array(items) => Self(Some(items.into_iter().map(Child::from).collect())),
			other => Self(Some(vec![other.into()])),
		}
	}
}
impl<T: Into<Child>> From<Vec<T>> for Children {
	fn from(children: Vec<T>) -> Self {
		Self(Some(children.into_iter().map(Into::into).collect()))
	}
}
impl<T: Into<Child>, const N: usize> From<[T; N]> for Children {
	fn from(children: [T; N]) -> Self {
		Self(Some(children.into_iter().map(Into::into).collect()))
	}
}

/// Builds an element node.
///
/// # Errors
///
/// See [`BuildError`]. In particular, sibling elements must either all be keyed with unique keys or all be unkeyed.
#[instrument(level = "trace", skip(props, children))]
pub fn build(tag: &str, props: Props, children: impl Into<Children>) -> Result<VNode, BuildError> {
	let mut attributes: Vec<Attribute> = Vec::new();
	let mut events: Vec<EventProp> = Vec::new();
	let mut internal = Vec::new();

	for (name, value) in props.0 {
		if name == LEGACY_PROPS {
			return Err(BuildError::DeprecatedProps);
		}

		match (classify(&name, &value), value) {
			(PropKind::Internal, value) => internal.push(directive(tag, &name, value)?),
			(PropKind::Event | PropKind::Attribute, Prop::Callback(handler)) => {
				let event_type = event_type(&name);
				events.retain(|event| event.event_type != event_type);
				events.push(EventProp { event_type, handler })
			}
			(PropKind::Event, Prop::Value(value)) => {
				return Err(BuildError::HandlerNotCallable {
					tag: tag.to_owned(),
					name,
					found: json_type_name(&value),
				})
			}
			(PropKind::Attribute, Prop::Value(value)) => {
				let attribute = attribute(name, value);
				attributes.retain(|existing| existing.name != attribute.name);
				attributes.push(attribute)
			}
		}
	}

	let children = match children.into().0 {
		None => None,
		Some(children) => Some(children.into_iter().map(Child::into_node).collect::<Result<Vec<_>, _>>()?),
	};
	if let Some(children) = &children {
		check_keys(tag, children)?
	}

	Ok(VNode::Element(ElementNode {
		tag: tag.to_owned(),
		children,
		attributes,
		events,
		internal,
		is_widget: tag.starts_with(WIDGET_PREFIX),
	}))
}

fn event_type(name: &str) -> String {
	match name.strip_prefix("on") {
		Some(event_type) if !event_type.is_empty() => event_type.to_ascii_lowercase(),
		_ => name.to_ascii_lowercase(),
	}
}

fn attribute(name: String, value: Value) -> Attribute {
	if name == "class" || name == "classes" {
		return Attribute {
			name: "class".to_owned(),
			value: AttrValue::Text(style::serialize_classes(&value)),
		};
	}

	let value = match value {
		Value::Object(declarations) if name == "style" => AttrValue::Text(style::serialize_style(&declarations)),
		Value::String(text) => AttrValue::Text(text),
		Value::Bool(flag) => AttrValue::Flag(flag),
		Value::Null => AttrValue::Flag(false),
		Value::Number(number) => AttrValue::Text(number.to_string()),
		other @ (Value::Array(_) | Value::Object(_)) => AttrValue::Text(other.to_string()),
	};
	Attribute { name, value }
}

fn directive(tag: &str, name: &str, value: Prop) -> Result<Directive, BuildError> {
	let invalid = |name: &'static str, expected: &'static str, value: &Prop| BuildError::InvalidDirective {
		tag: tag.to_owned(),
		name,
		expected,
		found: value.type_name(),
	};

	Ok(match (name, value) {
		("key", Prop::Value(Value::String(key))) => Directive::Key(key),
		("key", Prop::Value(Value::Number(key))) => Directive::Key(key.to_string()),
		("key", other) => return Err(invalid("key", "a string or a number", &other)),
		("ref", Prop::Callback(callback)) => Directive::Ref(callback),
		("ref", Prop::Value(value)) => {
			return Err(BuildError::RefNotCallable {
				tag: tag.to_owned(),
				found: json_type_name(&value),
			})
		}
		("state", Prop::Value(state)) => Directive::State(state),
		("state", other) => return Err(invalid("state", "a JSON value", &other)),
		("propagate", Prop::Value(Value::Bool(propagate))) => Directive::Propagate(propagate),
		("propagate", other) => return Err(invalid("propagate", "a boolean", &other)),
		("innerhtml", Prop::Value(Value::String(html))) => Directive::InnerHtml(html),
		("innerhtml", other) => return Err(invalid("innerhtml", "a string", &other)),
		(name, _) => return Err(BuildError::ReservedName { name: name.to_owned() }),
	})
}

/// Enforces that keyed element siblings are consistently and uniquely keyed.
///
/// Text siblings can't carry keys and are exempt.
fn check_keys(tag: &str, children: &[VNode]) -> Result<(), BuildError> {
	let keys: Vec<Option<&str>> = children.iter().filter_map(VNode::as_element).map(ElementNode::key).collect();
	let declared = keys.iter().flatten().count();
	if declared == 0 {
		return Ok(());
	}
	if declared != keys.len() {
		return Err(BuildError::MixedKeys { tag: tag.to_owned() });
	}

	let mut seen = HashSet::with_capacity(declared);
	let mut duplicates: Vec<&str> = Vec::new();
	for key in keys.into_iter().flatten() {
		if !seen.insert(key) && !duplicates.contains(&key) {
			duplicates.push(key)
		}
	}

	if duplicates.is_empty() {
		Ok(())
	} else {
		Err(BuildError::DuplicateKeys {
			tag: tag.to_owned(),
			keys: duplicates.into_iter().map(str::to_owned).collect(),
		})
	}
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(_) => "number",
		Value::String(_) => "string",
		Value::Array(_) => "array",
		Value::Object(_) => "object",
	}
}
