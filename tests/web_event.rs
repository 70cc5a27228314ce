#![cfg(target_arch = "wasm32")]

use std::{cell::Cell, rc::Rc};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::HtmlElement;
use xylem_dom::{tags::button, Callback, Props};

wasm_bindgen_test_configure!(run_in_browser);


#[wasm_bindgen_test]
async fn click() {
	let (engine, container) = web_fixture_::engine();

	let clicks = Rc::new(Cell::new(0));
	let on_click = Callback::on::<web_sys::Event>({
		let clicks = Rc::clone(&clicks);
		move |event| {
			assert_eq!(event.type_(), "click");
			clicks.set(clicks.get() + 1)
		}
	});

	let declared = || button(Props::new().with("id", "test-button").with("onclick", on_click.clone()), "Click me");
	engine.mount(declared(), &container).await.unwrap();
	assert_eq!(clicks.get(), 0);

	let element: HtmlElement = container.first_child().unwrap().dyn_into().unwrap();
	element.click();
	assert_eq!(clicks.get(), 1);

	// Mounting the same handler again doesn't bind it twice.
	let report = engine.mount(declared(), &container).await.unwrap();
	assert_eq!(report.mutations, 0);
	element.click();
	assert_eq!(clicks.get(), 2);

	engine.mount(button(Props::new().with("id", "test-button"), "Click me"), &container).await.unwrap();
	element.click();
	assert_eq!(clicks.get(), 2);
	assert!(!engine.exists(&element, "click", &on_click));
}
