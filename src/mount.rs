//! The engine's public entry point and its per-parent mount queues.
//!
//! Every parent element that anything is mounted into gets one unbounded channel and one worker task that drains it,
//! so cycles for the same parent never interleave their host writes, no matter how long deferred input takes to resolve.
//! Queues are created lazily and live as long as the [`Engine`].

use crate::{
	apply::{self, Rerender},
	config::EngineConfig,
	context::Context,
	diff::Differ,
	error::{ApplyError, DiffError, ErrorCategory, HostError, MountError},
	host::Widget,
	patch::{remove_trailing, Patch, PatchKind},
	reflect, BuildError, Callback, ElementId, HostTree, VNode,
};
use core::{
	fmt::{self, Debug, Display},
	pin::Pin,
	task::{Context as TaskContext, Poll},
};
use futures::{
	channel::{mpsc, oneshot},
	future::{self, FutureExt, LocalBoxFuture},
	task::{LocalSpawn, LocalSpawnExt},
	Future, StreamExt,
};
use hashbrown::HashMap;
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use tracing::{error, instrument, trace, trace_span, warn};

/// What can be mounted into a parent element.
pub enum Mountable {
	/// Reconciled against the parent's first child.
	Node(VNode),
	/// Reconciled against the parent's children by index. Children beyond the list are removed.
	List(Vec<VNode>),
	/// Replaces the parent's content with opaque markup.
	Html(String),
	/// Resolved inside the parent's queue, so it can't overtake or be overtaken by other mounts into the same parent.
	Deferred(LocalBoxFuture<'static, Result<Mountable, MountError>>),
}

impl Mountable {
	/// Wraps a future that produces the input later. Its error is forwarded as [`MountError::Input`].
	pub fn deferred<F, E>(future: F) -> Self
	where
		F: Future<Output = Result<Mountable, E>> + 'static,
		E: Display,
	{
		Self::Deferred(future.map(|result| result.map_err(|error| MountError::Input(error.to_string()))).boxed_local())
	}
}

impl Debug for Mountable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Node(node) => f.debug_tuple("Node").field(node).finish(),
			Self::List(nodes) => f.debug_tuple("List").field(nodes).finish(),
			Self::Html(_) => f.debug_tuple("Html").finish_non_exhaustive(),
			Self::Deferred(_) => f.debug_tuple("Deferred").finish_non_exhaustive(),
		}
	}
}

impl From<VNode> for Mountable {
	fn from(node: VNode) -> Self {
		Self::Node(node)
	}
}

impl From<Vec<VNode>> for Mountable {
	fn from(nodes: Vec<VNode>) -> Self {
		Self::List(nodes)
	}
}

/// A construction error is reported through the queue like any other cycle failure.
impl From<Result<VNode, BuildError>> for Mountable {
	fn from(node: Result<VNode, BuildError>) -> Self {
		Self::Deferred(future::ready(node.map(Self::Node).map_err(MountError::from)).boxed_local())
	}
}

/// [`Mountable`] with deferred input resolved.
enum Ready {
	Node(VNode),
	List(Vec<VNode>),
	Html(String),
}

async fn resolve(mut input: Mountable) -> Result<Ready, MountError> {
	loop {
		input = match input {
			Mountable::Node(node) => return Ok(Ready::Node(node)),
			Mountable::List(nodes) => return Ok(Ready::List(nodes)),
			Mountable::Html(html) => return Ok(Ready::Html(html)),
			Mountable::Deferred(future) => future.await?,
		}
	}
}

/// The outcome of one successful mount cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountReport {
	/// The kinds of all patches emitted, in order.
	pub kinds: Vec<PatchKind>,
	/// How many of them actually changed something live.
	pub mutations: usize,
}

impl MountReport {
	#[must_use]
	pub fn count(&self, kind: PatchKind) -> usize {
		self.kinds.iter().filter(|k| **k == kind).count()
	}
}

/// Resolves once the mount cycle has settled.
///
/// Dropping the handle does not cancel the cycle.
#[derive(Debug)]
pub struct MountHandle {
	receiver: oneshot::Receiver<Result<MountReport, MountError>>,
}

impl Future for MountHandle {
	type Output = Result<MountReport, MountError>;

	fn poll(mut self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Self::Output> {
		self.receiver.poll_unpin(cx).map(|received| received.unwrap_or(Err(MountError::Dropped)))
	}
}

/// Receives every mount cycle failure.
pub trait ErrorReporter {
	fn report(&self, error: &MountError, category: ErrorCategory);
}

impl<F: Fn(&MountError, ErrorCategory)> ErrorReporter for F {
	fn report(&self, error: &MountError, category: ErrorCategory) {
		self(error, category)
	}
}

/// Logs mount cycle failures as [`tracing`] errors. This is the default [`ErrorReporter`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
	fn report(&self, error: &MountError, category: ErrorCategory) {
		error!(?category, %error, "Mount cycle failed.")
	}
}

struct Job {
	work: Work,
	done: Option<oneshot::Sender<Result<MountReport, MountError>>>,
	/// Widget re-render re-entry depth.
	depth: usize,
}

enum Work {
	Mount(Mountable),
	Render(Rc<dyn Widget>),
}

struct Shared<H: HostTree> {
	host: H,
	context: Context<H>,
	config: EngineConfig,
	spawner: Box<dyn LocalSpawn>,
	reporter: Box<dyn ErrorReporter>,
	queues: RefCell<HashMap<ElementId, mpsc::UnboundedSender<Job>>>,
}

/// Reconciles virtual nodes into a host tree.
///
/// Cloning an [`Engine`] is cheap and yields a handle to the same engine (and the same identities, bindings and queues).
///
/// # Example
///
/// ```rust
/// use futures::executor::LocalPool;
/// use xylem_dom::{build, Engine, MemoryDom, Props};
///
/// let mut pool = LocalPool::new();
/// let engine = Engine::new(MemoryDom::new(), pool.spawner());
/// let root = engine.host().root();
///
/// let handle = engine.mount(build("p", Props::new(), "Hello!"), &root);
/// let report = pool.run_until(handle).unwrap();
///
/// assert_eq!(report.mutations, 2);
/// assert_eq!(root.inner_html(), "<p>Hello!</p>");
/// ```
pub struct Engine<H: HostTree> {
	shared: Rc<Shared<H>>,
}

impl<H: HostTree> Clone for Engine<H> {
	fn clone(&self) -> Self {
		Self {
			shared: Rc::clone(&self.shared),
		}
	}
}

impl<H: HostTree> Debug for Engine<H> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Engine")
			.field("config", &self.shared.config)
			.field("queues", &self.shared.queues.borrow().len())
			.field("bindings", &self.shared.context.registry.borrow().len())
			.finish_non_exhaustive()
	}
}

impl<H: HostTree> Engine<H> {
	/// Creates an engine with the default [`EngineConfig`] that reports errors through [`TracingReporter`].
	///
	/// Queue workers are spawned onto `spawner`.
	#[must_use]
	pub fn new(host: H, spawner: impl LocalSpawn + 'static) -> Self {
		Self::with_options(host, spawner, EngineConfig::default(), TracingReporter)
	}

	#[must_use]
	pub fn with_options(host: H, spawner: impl LocalSpawn + 'static, config: EngineConfig, reporter: impl ErrorReporter + 'static) -> Self {
		Self {
			shared: Rc::new(Shared {
				host,
				context: Context::new(),
				config,
				spawner: Box::new(spawner),
				reporter: Box::new(reporter),
				queues: RefCell::default(),
			}),
		}
	}

	#[must_use]
	pub fn host(&self) -> &H {
		&self.shared.host
	}

	#[must_use]
	pub fn config(&self) -> &EngineConfig {
		&self.shared.config
	}

	/// Queues `input` for reconciliation into `parent`.
	///
	/// The cycle runs after every cycle queued earlier for the same parent has settled.
	/// Failures are reported to this engine's [`ErrorReporter`] and also resolve the returned handle.
	#[instrument(skip(self, input))]
	pub fn mount(&self, input: impl Into<Mountable>, parent: &H::Node) -> MountHandle {
		let (done, receiver) = oneshot::channel();
		enqueue(
			&self.shared,
			parent,
			Job {
				work: Work::Mount(input.into()),
				done: Some(done),
				depth: 0,
			},
		);
		MountHandle { receiver }
	}

	/// Diffs `node` against the child of `parent` at `index` without applying anything.
	///
	/// Nodes referenced by creating patches are created detached and already carry their identity.
	///
	/// # Errors
	///
	/// Iff the host fails to create a node or the tree is nested deeper than [`EngineConfig::depth_limit`].
	pub fn diff(&self, node: &VNode, parent: &H::Node, index: usize) -> Result<Vec<Patch<H::Node>>, DiffError> {
		let mut differ = Differ::new(&self.shared.host, &self.shared.context, &self.shared.config);
		differ.diff_at(node, parent, index)?;
		Ok(differ.finish())
	}

	/// Applies one patch. Widget re-renders it causes are queued.
	///
	/// Returns whether anything live changed.
	///
	/// # Errors
	///
	/// Iff the host fails, or a widget patch targets an element without widget.
	pub fn apply(&self, patch: &Patch<H::Node>) -> Result<bool, ApplyError> {
		let mut rerenders = Vec::new();
		let applied = apply::apply(&self.shared.host, &self.shared.context, patch, &mut rerenders);
		schedule_rerenders(&self.shared, rerenders, 1);
		applied
	}

	/// Reflects a rendered node back into a [`VNode`]. See [`reflect`](`crate::reflect::reflect`).
	#[must_use]
	pub fn reflect(&self, node: &H::Node, recurse: bool, strip_empty_text: bool) -> Option<VNode> {
		reflect::reflect(&self.shared.host, node, recurse, strip_empty_text)
	}

	/// Binds `callback` as `element`'s `event_type` handler, replacing the previous one.
	///
	/// Returns whether a listener was (re)installed.
	///
	/// # Errors
	///
	/// Iff the host can't subscribe.
	pub fn bind(&self, element: &H::Node, event_type: &str, callback: &Callback) -> Result<bool, HostError> {
		let key = self.shared.context.binding_key(element);
		self.shared.context.registry.borrow_mut().bind(&self.shared.host, element, key, event_type, callback)
	}

	/// Removes `element`'s handler for `event_type`, or all of its handlers.
	///
	/// Returns how many were removed.
	pub fn unbind(&self, element: &H::Node, event_type: Option<&str>) -> usize {
		match Context::<H>::existing_binding_key(element) {
			Some(key) => self.shared.context.registry.borrow_mut().unbind(&self.shared.host, element, &key, event_type),
			None => 0,
		}
	}

	#[must_use]
	pub fn exists(&self, element: &H::Node, event_type: &str, callback: &Callback) -> bool {
		Context::<H>::existing_binding_key(element).map_or(false, |key| self.shared.context.registry.borrow().exists(&key, event_type, callback))
	}

	/// Unsubscribes and forgets all event bindings. Element identities are kept.
	pub fn reset(&self) {
		self.shared.context.reset(&self.shared.host)
	}
}

fn enqueue<H: HostTree>(shared: &Rc<Shared<H>>, parent: &H::Node, job: Job) {
	let id = shared.context.identify(parent);

	let existing = shared.queues.borrow().get(&id).cloned();
	let sender = match existing {
		Some(sender) => sender,
		None => {
			let (sender, receiver) = mpsc::unbounded();
			if let Err(error) = shared.spawner.spawn_local(drain(Rc::downgrade(shared), parent.clone(), receiver)) {
				return settle(shared, job.done, Err(MountError::Spawn(error.to_string())));
			}
			trace!(%id, "Started mount queue.");
			shared.queues.borrow_mut().insert(id, sender.clone());
			sender
		}
	};

	if let Err(error) = sender.unbounded_send(job) {
		warn!(%id, "Mount queue worker is gone.");
		settle(shared, error.into_inner().done, Err(MountError::Dropped))
	}
}

/// Reports failures and hands the outcome to the waiting [`MountHandle`], if there still is one.
fn settle<H: HostTree>(shared: &Shared<H>, done: Option<oneshot::Sender<Result<MountReport, MountError>>>, result: Result<MountReport, MountError>) {
	if let Err(error) = &result {
		shared.reporter.report(error, error.category())
	}
	if let Some(done) = done {
		if done.send(result).is_err() {
			trace!("Mount handle was dropped.")
		}
	}
}

/// The queue worker of one parent.
async fn drain<H: HostTree>(shared: Weak<Shared<H>>, parent: H::Node, mut jobs: mpsc::UnboundedReceiver<Job>) {
	while let Some(Job { work, done, depth }) = jobs.next().await {
		let input = match work {
			Work::Mount(input) => resolve(input).await,
			Work::Render(widget) => {
				let span = trace_span!("Rendering widget", depth);
				let _enter = span.enter();
				widget.render().map(Ready::Node).map_err(MountError::from)
			}
		};

		let engine = match shared.upgrade() {
			Some(engine) => engine,
			None => {
				trace!("Engine dropped. Stopping mount queue.");
				if let Some(done) = done {
					if done.send(Err(MountError::Dropped)).is_err() {
						trace!("Mount handle was dropped.")
					}
				}
				return;
			}
		};

		let result = input.and_then(|input| cycle(&engine, &parent, input, depth));
		settle(&engine, done, result);
	}
}

#[instrument(level = "trace", skip(shared, parent, input))]
fn cycle<H: HostTree>(shared: &Rc<Shared<H>>, parent: &H::Node, input: Ready, depth: usize) -> Result<MountReport, MountError> {
	let mut report = MountReport::default();
	let mut rerenders = Vec::new();
	let outcome = reconcile(shared, parent, input, &mut report, &mut rerenders);

	// Widgets initialised before a failure still get their first render.
	schedule_rerenders(shared, rerenders, depth + 1);
	outcome.map(|()| report)
}

fn reconcile<H: HostTree>(shared: &Shared<H>, parent: &H::Node, input: Ready, report: &mut MountReport, rerenders: &mut Vec<Rerender<H::Node>>) -> Result<(), MountError> {
	match input {
		Ready::Html(html) => run(
			shared,
			vec![Patch::SetInnerHtml {
				element: parent.clone(),
				html,
			}],
			report,
			rerenders,
		),
		Ready::Node(node) => patch_at(shared, &node, parent, 0, report, rerenders),
		Ready::List(nodes) => {
			for (index, node) in nodes.iter().enumerate() {
				patch_at(shared, node, parent, index, report, rerenders)?;
			}
			let live = shared.host.child_nodes(parent).len();
			match remove_trailing(parent, live, nodes.len()) {
				Some(patch) => run(shared, vec![patch], report, rerenders),
				None => Ok(()),
			}
		}
	}
}

fn patch_at<H: HostTree>(
	shared: &Shared<H>,
	node: &VNode,
	parent: &H::Node,
	index: usize,
	report: &mut MountReport,
	rerenders: &mut Vec<Rerender<H::Node>>,
) -> Result<(), MountError> {
	let mut differ = Differ::new(&shared.host, &shared.context, &shared.config);
	differ.diff_at(node, parent, index)?;
	run(shared, differ.finish(), report, rerenders)
}

fn run<H: HostTree>(shared: &Shared<H>, patches: Vec<Patch<H::Node>>, report: &mut MountReport, rerenders: &mut Vec<Rerender<H::Node>>) -> Result<(), MountError> {
	for patch in &patches {
		report.kinds.push(patch.kind());
		if apply::apply(&shared.host, &shared.context, patch, rerenders)? {
			report.mutations += 1;
		}
	}
	Ok(())
}

fn schedule_rerenders<H: HostTree>(shared: &Rc<Shared<H>>, rerenders: Vec<Rerender<H::Node>>, depth: usize) {
	for Rerender { element, widget } in rerenders {
		if depth > shared.config.max_rerender_depth {
			let error = MountError::RerenderDepth {
				id: shared.context.identify(&element),
				limit: shared.config.max_rerender_depth,
			};
			shared.reporter.report(&error, error.category());
			continue;
		}

		enqueue(
			shared,
			&element,
			Job {
				work: Work::Render(widget),
				done: None,
				depth,
			},
		)
	}
}
