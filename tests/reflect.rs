
use memory_fixture_::Fixture;
use xylem_dom::{
	tags::{li, ul},
	Child, Mountable, Props, VNode,
};

fn list() -> VNode {
	ul(Props::new().with("class", "list"), [li(Props::new(), "a"), li(Props::new(), "b")]).unwrap()
}

#[test]
fn reflects_what_was_mounted() {
	let mut fixture = Fixture::new();
	fixture.mount(list()).unwrap();

	let rendered = fixture.root.child(0).unwrap();
	assert_eq!(fixture.engine.reflect(&rendered, true, false), Some(list()));
	assert_eq!(xylem_dom::reflect(fixture.engine.host(), &rendered, true, false), Some(list()));
}

#[test]
fn shallow_reflection_has_no_children() {
	let mut fixture = Fixture::new();
	fixture.mount(list()).unwrap();

	let reflected = fixture.engine.reflect(&fixture.root.child(0).unwrap(), false, false).unwrap();
	let element = reflected.as_element().unwrap();
	assert_eq!(element.tag(), "ul");
	assert_eq!(element.children(), None);
	assert_eq!(element.attributes(), list().as_element().unwrap().attributes());
}

fn padded() -> VNode {
	ul(Props::new(), vec![Child::from("\n  "), li(Props::new(), "a").into(), "\n".into()]).unwrap()
}

#[test]
fn strips_whitespace_text() {
	let mut fixture = Fixture::new();
	fixture.mount(padded()).unwrap();
	let rendered = fixture.root.child(0).unwrap();

	let stripped = fixture.engine.reflect(&rendered, true, true).unwrap();
	assert_eq!(stripped, ul(Props::new(), [li(Props::new(), "a")]).unwrap());

	let full = fixture.engine.reflect(&rendered, true, false).unwrap();
	assert_eq!(full.as_element().unwrap().children().unwrap().len(), 3);
}

#[test]
fn reflection_reconciles_to_nothing() {
	let mut fixture = Fixture::new();
	fixture.mount(padded()).unwrap();

	let reflected = fixture.engine.reflect(&fixture.root.child(0).unwrap(), true, false).unwrap();
	assert!(fixture.engine.diff(&reflected, &fixture.root, 0).unwrap().is_empty());
}

#[test]
fn keys_are_mirrored() {
	let mut fixture = Fixture::new();
	let keyed = ul(Props::new(), [li(Props::new().with("key", 1), "one"), li(Props::new().with("key", "two"), "two")]).unwrap();
	fixture.mount(keyed.clone()).unwrap();

	let reflected = fixture.engine.reflect(&fixture.root.child(0).unwrap(), true, false).unwrap();
	let keys: Vec<_> = reflected.as_element().unwrap().children().unwrap().iter().map(VNode::key).collect();
	assert_eq!(keys, [Some("1"), Some("two")]);
	assert_eq!(reflected, keyed);
}

#[test]
fn raw_markup_is_skipped() {
	let mut fixture = Fixture::new();
	fixture.mount(Mountable::Html("<p>opaque</p>".to_owned())).unwrap();

	let reflected = fixture.engine.reflect(&fixture.root, true, false).unwrap();
	let body = reflected.as_element().unwrap();
	assert_eq!(body.tag(), "body");
	assert_eq!(body.children(), Some(&[][..]));
	assert_eq!(fixture.engine.reflect(&fixture.root.child(0).unwrap(), true, false), None);
}
