
use futures::channel::oneshot;
use memory_fixture_::Fixture;
use serde_json::{json, Value};
use std::{
	cell::{Cell, RefCell},
	rc::{Rc, Weak},
};
use xylem_dom::{
	build,
	tags::{div, p, span},
	ApplyError, BuildError, DiffError, EngineConfig, ErrorCategory, HostTree, MountError, Mountable, PatchKind, Props, VNode, Widget,
};

#[test]
fn deferred_inputs_keep_queue_order() {
	let mut fixture = Fixture::new();
	let (first_sender, first) = oneshot::channel::<Mountable>();
	let (second_sender, second) = oneshot::channel::<Mountable>();

	let first = fixture.engine.mount(Mountable::deferred(first), &fixture.root);
	let second = fixture.engine.mount(Mountable::deferred(second), &fixture.root);

	second_sender.send(p(Props::new(), "second").unwrap().into()).unwrap();
	fixture.pool.run_until_stalled();
	assert_eq!(fixture.html(), "");

	first_sender.send(p(Props::new(), "first").unwrap().into()).unwrap();
	let first = fixture.pool.run_until(first).unwrap();
	let second = fixture.pool.run_until(second).unwrap();

	assert_eq!(first.kinds, [PatchKind::CreateNode, PatchKind::CreateText]);
	assert_eq!(second.kinds, [PatchKind::UpdateText]);
	assert_eq!(fixture.html(), "<p>second</p>");
}

#[test]
fn failed_input_does_not_jam_the_queue() {
	let mut fixture = Fixture::new();
	let failing = fixture.engine.mount(Mountable::deferred(async { Err::<Mountable, _>("offline") }), &fixture.root);
	let (dropped_sender, dropped) = oneshot::channel::<Mountable>();
	let dropped = fixture.engine.mount(Mountable::deferred(dropped), &fixture.root);
	let fine = fixture.engine.mount(p(Props::new(), "fine"), &fixture.root);
	drop(dropped_sender);

	assert_eq!(fixture.pool.run_until(failing), Err(MountError::Input("offline".to_owned())));
	assert!(matches!(fixture.pool.run_until(dropped), Err(MountError::Input(_))));
	assert!(fixture.pool.run_until(fine).is_ok());
	assert_eq!(fixture.html(), "<p>fine</p>");
	assert_eq!(fixture.error_categories(), [ErrorCategory::Input, ErrorCategory::Input]);
}

#[test]
fn parents_have_separate_queues() {
	let mut fixture = Fixture::new();
	let (_pending_sender, pending) = oneshot::channel::<Mountable>();
	let _blocked = fixture.engine.mount(Mountable::deferred(pending), &fixture.root);

	let other = fixture.engine.host().create_element("section").unwrap();
	let report = fixture.pool.run_until(fixture.engine.mount(p(Props::new(), "elsewhere"), &other)).unwrap();

	assert_eq!(report.mutations, 2);
	assert_eq!(other.inner_html(), "<p>elsewhere</p>");
	assert_eq!(fixture.html(), "");
}

#[test]
fn dropped_handle_still_mounts() {
	let mut fixture = Fixture::new();
	drop(fixture.engine.mount(p(Props::new(), "anyway"), &fixture.root));
	fixture.pool.run_until_stalled();
	assert_eq!(fixture.html(), "<p>anyway</p>");
}

#[test]
fn dropped_engine_fails_pending_cycles() {
	let mut fixture = Fixture::new();
	let (sender, pending) = oneshot::channel::<Mountable>();
	let handle = fixture.engine.mount(Mountable::deferred(pending), &fixture.root);
	fixture.pool.run_until_stalled();

	drop(fixture.engine);
	sender.send(p(Props::new(), "late").unwrap().into()).unwrap();

	assert_eq!(fixture.pool.run_until(handle), Err(MountError::Dropped));
	assert_eq!(fixture.root.inner_html(), "");
}

#[test]
fn depth_limit_fails_the_cycle_only() {
	let mut fixture = Fixture::with_config(EngineConfig::default().with_depth_limit(2));

	let result = fixture.mount(div(Props::new(), div(Props::new(), span(Props::new(), ()))));
	assert_eq!(result, Err(MountError::Diff(DiffError::DepthLimit { limit: 2 })));
	assert_eq!(fixture.error_categories(), [ErrorCategory::Diff]);
	assert_eq!(fixture.html(), "");

	assert!(fixture.mount(div(Props::new(), "shallow")).is_ok());
	assert_eq!(fixture.html(), "<div>shallow</div>");
}

struct Label {
	state: RefCell<Value>,
	renders: Rc<Cell<usize>>,
}

impl Widget for Label {
	fn set_state(&self, next: &Value, _trigger_update: bool) -> bool {
		if *self.state.borrow() == *next {
			return false;
		}
		*self.state.borrow_mut() = next.clone();
		true
	}

	fn render(&self) -> Result<VNode, BuildError> {
		self.renders.set(self.renders.get() + 1);
		span(Props::new(), self.state.borrow()["label"].as_str().unwrap_or_default().to_owned())
	}
}

fn label(text: &str) -> Result<VNode, BuildError> {
	build("xy-label", Props::new().with("state", json!({ "label": text })), ())
}

#[test]
fn widget_rerenders_until_state_settles() {
	let mut fixture = Fixture::new();
	let renders = Rc::new(Cell::new(0));
	fixture.engine.host().define_widget("xy-label", {
		let renders = Rc::clone(&renders);
		move || -> Rc<dyn Widget> {
			Rc::new(Label {
				state: RefCell::new(Value::Null),
				renders: Rc::clone(&renders),
			})
		}
	});

	let report = fixture.mount(label("hi")).unwrap();
	assert_eq!(report.kinds, [PatchKind::CreateNode, PatchKind::InitialiseWidget]);
	assert_eq!(fixture.html(), "<xy-label><span>hi</span></xy-label>");
	assert_eq!(renders.get(), 1);

	let report = fixture.mount(label("hi")).unwrap();
	assert_eq!(report.kinds, [PatchKind::PropagateWidgetProps]);
	assert_eq!(report.mutations, 0);
	assert_eq!(renders.get(), 1);

	fixture.mount(label("ho")).unwrap();
	assert_eq!(fixture.html(), "<xy-label><span>ho</span></xy-label>");
	assert_eq!(renders.get(), 2);

	let pinned = build("xy-label", Props::new().with("state", json!({ "label": "no" })).with("propagate", false), ()).unwrap();
	let report = fixture.mount(pinned).unwrap();
	assert!(report.kinds.is_empty());
	assert_eq!(renders.get(), 2);
}

#[test]
fn removed_widgets_are_released() {
	let mut fixture = Fixture::new();
	let instances = Rc::new(RefCell::new(Vec::<Weak<dyn Widget>>::new()));
	fixture.engine.host().define_widget("xy-label", {
		let instances = Rc::clone(&instances);
		move || -> Rc<dyn Widget> {
			let widget: Rc<dyn Widget> = Rc::new(Label {
				state: RefCell::new(Value::Null),
				renders: Rc::new(Cell::new(0)),
			});
			instances.borrow_mut().push(Rc::downgrade(&widget));
			widget
		}
	});

	fixture.mount(vec![label("kept").unwrap(), label("gone").unwrap()]).unwrap();
	let gone = fixture.root.child(1).unwrap();
	assert!(fixture.engine.host().widget(&gone).is_some());

	let report = fixture.mount(vec![label("kept").unwrap()]).unwrap();
	assert_eq!(report.kinds, [PatchKind::PropagateWidgetProps, PatchKind::RemoveNodeAtIndex]);

	assert!(fixture.engine.host().widget(&gone).is_none());
	let alive: Vec<bool> = instances.borrow().iter().map(|instance| instance.upgrade().is_some()).collect();
	assert_eq!(alive, [true, false]);
}

struct Nest {
	renders: Rc<Cell<usize>>,
}

impl Widget for Nest {
	fn set_state(&self, _next: &Value, _trigger_update: bool) -> bool {
		true
	}

	fn render(&self) -> Result<VNode, BuildError> {
		self.renders.set(self.renders.get() + 1);
		build("xy-nest", Props::new(), ())
	}
}

#[test]
fn rerender_depth_is_bounded() {
	let mut fixture = Fixture::with_config(EngineConfig::default().with_max_rerender_depth(3));
	let renders = Rc::new(Cell::new(0));
	fixture.engine.host().define_widget("xy-nest", {
		let renders = Rc::clone(&renders);
		move || -> Rc<dyn Widget> { Rc::new(Nest { renders: Rc::clone(&renders) }) }
	});

	fixture.mount(build("xy-nest", Props::new(), ())).unwrap();

	assert_eq!(renders.get(), 3);
	assert!(matches!(
		fixture.errors.borrow().as_slice(),
		[(MountError::RerenderDepth { limit: 3, .. }, ErrorCategory::Scheduling)]
	));
	assert_eq!(fixture.html(), "<xy-nest><xy-nest><xy-nest><xy-nest></xy-nest></xy-nest></xy-nest></xy-nest>");
}

#[test]
fn unknown_widget_fails() {
	let mut fixture = Fixture::new();
	let result = fixture.mount(build("xy-missing", Props::new(), ()));

	assert!(matches!(result, Err(MountError::Apply(ApplyError::NotAWidget { id: Some(_) }))));
	assert_eq!(fixture.error_categories(), [ErrorCategory::Patch]);
}
