
use memory_fixture_::Fixture;
use std::{cell::Cell, rc::Rc};
use xylem_dom::{
	tags::{div, li, span, ul},
	BuildError, Callback, Child, HostNode, MemoryEvent, PatchKind, Props, VNode,
};

fn item(key: &str, text: &str) -> VNode {
	li(Props::new().with("key", key), text).unwrap()
}

fn list(keys: &[&str]) -> VNode {
	ul(Props::new(), keys.iter().map(|key| item(key, key)).collect::<Vec<_>>()).unwrap()
}

#[test]
fn reorder_only_sorts() {
	let mut fixture = Fixture::new();
	fixture.mount(vec![item("1", "x"), item("2", "y")]).unwrap();
	let (a, b) = (fixture.root.child(0).unwrap(), fixture.root.child(1).unwrap());

	let report = fixture.mount(vec![item("2", "y"), item("1", "x")]).unwrap();

	assert_eq!(report.kinds, [PatchKind::SortNode]);
	assert_eq!(fixture.root.children(), [b, a]);
	assert_eq!(fixture.html(), "<li>y</li><li>x</li>");
}

#[test]
fn reorder_within_element() {
	let mut fixture = Fixture::new();
	fixture.mount(list(&["a", "b", "c"])).unwrap();
	let ul = fixture.root.child(0).unwrap();
	let identities = ul.children().iter().map(HostNode::identity).collect::<Vec<_>>();

	let report = fixture.mount(list(&["c", "a", "b"])).unwrap();
	assert_eq!(report.kinds, [PatchKind::SortNode]);
	assert_eq!(
		ul.children().iter().map(HostNode::identity).collect::<Vec<_>>(),
		[identities[2], identities[0], identities[1]]
	);
	assert_eq!(ul.inner_html(), "<li>c</li><li>a</li><li>b</li>");
}

#[test]
fn undeclared_keys_are_removed() {
	let mut fixture = Fixture::new();
	fixture.mount(list(&["a", "b", "c"])).unwrap();

	let report = fixture.mount(list(&["c", "a"])).unwrap();
	assert_eq!(report.kinds, [PatchKind::SortNode, PatchKind::RemoveNode]);
	assert_eq!(fixture.html(), "<ul><li>c</li><li>a</li></ul>");
}

#[test]
fn insertion_between_keys() {
	let mut fixture = Fixture::new();
	fixture.mount(list(&["a", "b"])).unwrap();
	let b = fixture.root.child(0).unwrap().child(1).unwrap();

	let report = fixture.mount(list(&["a", "new", "b"])).unwrap();
	assert_eq!(report.kinds, [PatchKind::CreateNode, PatchKind::CreateText]);
	assert_eq!(fixture.html(), "<ul><li>a</li><li>new</li><li>b</li></ul>");
	assert_eq!(fixture.root.child(0).unwrap().child(2), Some(b));
}

#[test]
fn key_is_mirrored() {
	let mut fixture = Fixture::new();
	fixture.mount(list(&["only"])).unwrap();
	let li = fixture.root.child(0).unwrap().child(0).unwrap();

	assert_eq!(li.dom_key().as_deref(), Some("only"));
	assert!(li.identity().is_some());
	assert_eq!(li.attribute("key"), None);
}

#[test]
fn bindings_follow_sorted_elements() {
	let mut fixture = Fixture::new();
	let clicked = Rc::new(Cell::new(0));
	let handler = Callback::on::<MemoryEvent>({
		let clicked = Rc::clone(&clicked);
		move |event| {
			assert_eq!(event.event_type, "click");
			clicked.set(clicked.get() + 1)
		}
	});
	let tree = |order: [&str; 2]| {
		div(
			Props::new(),
			order
				.iter()
				.map(|key| span(Props::new().with("key", *key).with("onclick", handler.clone()), *key))
				.collect::<Vec<_>>(),
		)
		.unwrap()
	};

	fixture.mount(tree(["a", "b"])).unwrap();
	let a = fixture.root.child(0).unwrap().child(0).unwrap();

	let report = fixture.mount(tree(["b", "a"])).unwrap();
	assert_eq!(report.kinds, [PatchKind::SortNode]);
	assert_eq!(a.listener_count(), 1);
	assert!(fixture.engine.exists(&a, "click", &handler));

	assert_eq!(a.dispatch("click"), 1);
	assert_eq!(clicked.get(), 1);
}

#[test]
fn duplicate_keys_fail_to_build() {
	let error = div(Props::new(), [span(Props::new().with("key", "a"), ()), span(Props::new().with("key", "a"), ())]).unwrap_err();
	assert_eq!(
		error,
		BuildError::DuplicateKeys {
			tag: "div".to_owned(),
			keys: vec!["a".to_owned()],
		}
	);
}

#[test]
fn mixed_keys_fail_to_build() {
	let error = div(Props::new(), [span(Props::new().with("key", "a"), ()), span(Props::new(), ())]).unwrap_err();
	assert_eq!(error, BuildError::MixedKeys { tag: "div".to_owned() });
}

#[test]
fn text_siblings_are_exempt() {
	let node = div(Props::new(), vec![item("a", "a").into(), Child::from("between"), item("b", "b").into()]);
	assert!(node.is_ok());
}

#[test]
fn text_does_not_displace_keyed_element() {
	let mut fixture = Fixture::new();
	let references = Rc::new(Cell::new(0));
	let counted = || {
		let references = Rc::clone(&references);
		span(
			Props::new().with("key", "a").with("ref", Callback::new(move |_| references.set(references.get() + 1))),
			"A",
		)
	};

	fixture.mount(div(Props::new(), vec![Child::from(counted()), "t".into()])).unwrap();
	let a = fixture.root.child(0).unwrap().child(0).unwrap();
	let identity = a.identity();

	let report = fixture.mount(div(Props::new(), vec![Child::from("t"), counted().into()])).unwrap();

	assert_eq!(report.kinds, [PatchKind::CreateText, PatchKind::RemoveNode]);
	assert_eq!(fixture.root.child(0).unwrap().child(1), Some(a.clone()));
	assert_eq!(a.identity(), identity);
	assert_eq!(references.get(), 1);
	assert_eq!(fixture.html(), "<div>t<span>A</span></div>");
}

fn spaced(keys: &[&str]) -> VNode {
	let mut children = Vec::new();
	for (i, key) in keys.iter().enumerate() {
		if i > 0 {
			children.push(Child::from("x"));
		}
		children.push(span(Props::new().with("key", *key), *key).into());
	}
	div(Props::new(), children).unwrap()
}

#[test]
fn reorder_with_text_between_keys() {
	let mut fixture = Fixture::new();
	fixture.mount(spaced(&["a", "b"])).unwrap();
	let parent = fixture.root.child(0).unwrap();
	let (a, b) = (parent.child(0).unwrap(), parent.child(2).unwrap());
	let identities = (a.identity(), b.identity());

	let report = fixture.mount(spaced(&["b", "a"])).unwrap();

	assert_eq!(report.kinds, [PatchKind::SortNode, PatchKind::CreateText, PatchKind::RemoveNode]);
	assert!(!report.kinds.iter().any(|kind| matches!(kind, PatchKind::CreateNode | PatchKind::ReplaceNode)));
	assert_eq!(parent.child(0), Some(b.clone()));
	assert_eq!(parent.child(2), Some(a.clone()));
	assert_eq!((a.identity(), b.identity()), identities);
	assert_eq!(parent.inner_html(), "<span>b</span>x<span>a</span>");
}
