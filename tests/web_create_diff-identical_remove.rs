#![cfg(target_arch = "wasm32")]

use serde_json::Value;
use std::rc::Rc;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use xylem_dom::{
	build,
	tags::{li, p, ul},
	BuildError, HostTree, Mountable, Props, VNode, Widget,
};

wasm_bindgen_test_configure!(run_in_browser);


async fn create_diff_identical_remove(nodes: Vec<VNode>, expected: &str) {
	let (engine, container) = web_fixture_::engine();

	engine.mount(nodes.clone(), &container).await.unwrap();
	assert_eq!(web_fixture_::html(&container), expected);

	for (index, node) in nodes.iter().enumerate() {
		assert!(engine.diff(node, &container, index).unwrap().is_empty());
	}
	let report = engine.mount(nodes, &container).await.unwrap();
	assert_eq!(report.mutations, 0);

	engine.mount(Vec::<VNode>::new(), &container).await.unwrap();
	assert_eq!(web_fixture_::html(&container), "");
}

#[wasm_bindgen_test]
async fn text() {
	create_diff_identical_remove(vec![VNode::text("Hello xylem-dom text!")], "Hello xylem-dom text!").await
}

#[wasm_bindgen_test]
async fn element() {
	create_diff_identical_remove(
		vec![p(Props::new().with("class", "greeting").with("hidden", false), "Hello!").unwrap()],
		r#"<p class="greeting">Hello!</p>"#,
	)
	.await
}

#[wasm_bindgen_test]
async fn keyed() {
	create_diff_identical_remove(
		vec![ul(Props::new(), [li(Props::new().with("key", "a"), "A"), li(Props::new().with("key", "b"), "B")]).unwrap()],
		"<ul><li>A</li><li>B</li></ul>",
	)
	.await
}

#[wasm_bindgen_test]
async fn raw_html() {
	let (engine, container) = web_fixture_::engine();
	engine.mount(Mountable::Html("<b>raw</b>".to_owned()), &container).await.unwrap();
	assert_eq!(web_fixture_::html(&container), "<b>raw</b>");
	assert_eq!(engine.reflect(&container, true, false).unwrap().as_element().unwrap().children().unwrap().len(), 1);
}

struct Static;

impl Widget for Static {
	fn set_state(&self, _next: &Value, _trigger_update: bool) -> bool {
		false
	}

	fn render(&self) -> Result<VNode, BuildError> {
		p(Props::new(), "static")
	}
}

#[wasm_bindgen_test]
async fn removed_widget_is_released() {
	let (engine, container) = web_fixture_::engine();
	engine.host().define_widget("xy-static", || -> Rc<dyn Widget> { Rc::new(Static) });

	engine.mount(vec![build("xy-static", Props::new(), ()).unwrap()], &container).await.unwrap();
	let widget = container.first_child().unwrap();
	assert!(engine.host().widget(&widget).is_some());

	engine.mount(Vec::<VNode>::new(), &container).await.unwrap();
	assert!(engine.host().widget(&widget).is_none());
}
