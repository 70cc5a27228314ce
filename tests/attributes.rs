
use memory_fixture_::Fixture;
use serde_json::json;
use xylem_dom::{
	tags::{button, div, input},
	ApplyError, AttrValue, ErrorCategory, HostError, MountError, Patch, PatchKind, PropertyValue, Props,
};

#[test]
fn unchanged_value_updates_once() {
	let mut fixture = Fixture::new();
	fixture.mount(div(Props::new().with("title", "a"), ())).unwrap();

	let report = fixture.mount(div(Props::new().with("title", "b"), ())).unwrap();
	assert_eq!(report.kinds, [PatchKind::UpdateAttr]);

	let report = fixture.mount(div(Props::new().with("title", "b"), ())).unwrap();
	assert!(report.kinds.is_empty());

	let element = fixture.root.child(0).unwrap();
	let same = Patch::UpdateAttr {
		element: element.clone(),
		name: "title".to_owned(),
		value: AttrValue::Text("b".to_owned()),
	};
	assert!(!fixture.engine.apply(&same).unwrap());
	assert_eq!(element.attribute("title").as_deref(), Some("b"));
}

#[test]
fn undeclared_attributes_are_removed() {
	let mut fixture = Fixture::new();
	fixture.mount(div(Props::new().with("id", "x").with("class", "y"), ())).unwrap();

	let report = fixture.mount(div(Props::new().with("id", "x"), ())).unwrap();
	assert_eq!(report.kinds, [PatchKind::RemoveAttr]);
	assert_eq!(fixture.html(), r#"<div id="x"></div>"#);
}

#[test]
fn focused_value_is_left_alone() {
	let mut fixture = Fixture::new();
	fixture.mount(input(Props::new().with("value", "a"), ())).unwrap();
	let element = fixture.root.child(0).unwrap();
	assert_eq!(element.property("value"), Some(PropertyValue::Text("a".to_owned())));

	fixture.engine.host().focus(Some(&element));
	let report = fixture.mount(input(Props::new().with("value", "b"), ())).unwrap();
	assert_eq!(report.kinds, [PatchKind::UpdateAttr]);
	assert_eq!(report.mutations, 0);
	assert_eq!(element.attribute("value").as_deref(), Some("a"));

	fixture.engine.host().focus(None);
	let report = fixture.mount(input(Props::new().with("value", "b"), ())).unwrap();
	assert_eq!(report.mutations, 1);
	assert_eq!(element.attribute("value").as_deref(), Some("b"));
	assert_eq!(element.property("value"), Some(PropertyValue::Text("b".to_owned())));
}

#[test]
fn checked_is_a_property() {
	let mut fixture = Fixture::new();
	fixture.mount(input(Props::new().with("type", "checkbox").with("checked", true), ())).unwrap();
	let element = fixture.root.child(0).unwrap();
	assert_eq!(element.property("checked"), Some(PropertyValue::Flag(true)));
	assert_eq!(fixture.html(), r#"<input type="checkbox" checked="">"#);

	let report = fixture.mount(input(Props::new().with("type", "checkbox").with("checked", false), ())).unwrap();
	assert_eq!(report.kinds, [PatchKind::RemoveAttr]);
	assert_eq!(element.property("checked"), Some(PropertyValue::Flag(false)));
	assert_eq!(element.attribute("checked"), None);
}

#[test]
fn false_flags_are_absent() {
	let mut fixture = Fixture::new();
	fixture.mount(button(Props::new().with("disabled", false).with("readonly", json!(null)), ())).unwrap();
	assert_eq!(fixture.html(), "<button></button>");

	fixture.mount(button(Props::new().with("disabled", true), ())).unwrap();
	assert_eq!(fixture.html(), r#"<button disabled=""></button>"#);

	let element = fixture.root.child(0).unwrap();
	let remove = Patch::UpdateAttr {
		element,
		name: "disabled".to_owned(),
		value: AttrValue::Flag(false),
	};
	assert!(fixture.engine.apply(&remove).unwrap());
	assert_eq!(fixture.html(), "<button></button>");
}

#[test]
fn host_failures_are_isolated() {
	let mut fixture = Fixture::new();
	fixture.engine.host().reject_attribute("title");

	let result = fixture.mount(div(Props::new().with("title", "nope"), ()));
	assert!(matches!(
		result,
		Err(MountError::Apply(ApplyError::Host(HostError::Operation { operation: "setAttribute", .. })))
	));
	assert_eq!(fixture.error_categories(), [ErrorCategory::Patch]);

	fixture.mount(div(Props::new().with("lang", "en"), ())).unwrap();
	assert_eq!(fixture.html(), r#"<div lang="en"></div>"#);
}
