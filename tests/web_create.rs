#![cfg(target_arch = "wasm32")]

use sapling_dom::{element, reconcile, text, web::WebHost, Classification, VirtualNode};
use wasm_bindgen::JsCast;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
use web_sys::HtmlElement;

wasm_bindgen_test_configure!(run_in_browser);

#[wasm_bindgen_test]
fn text_node() {
	test_create(&text("Hello sapling-dom!"), "Hello sapling-dom!");
}

#[wasm_bindgen_test]
fn nested_elements() {
	test_create(
		&element("div").prop("id", "outer").child(element("p").child("Hello")).child(" sapling-dom!").into(),
		r#"<div id="outer"><p>Hello</p> sapling-dom!</div>"#,
	);
}

#[wasm_bindgen_test]
fn properties_are_assigned_not_attributes() {
	let mut host = WebHost::from_window().unwrap();
	let container = fresh_container(&host);
	let vdom: VirtualNode = element("input").prop("value", "typed").into();

	reconcile(&mut host, None, Some(&vdom), &container, 0);

	let input: web_sys::HtmlInputElement = container.first_child().unwrap().dyn_into().unwrap();
	assert_eq!(input.value(), "typed");
	assert_eq!(input.get_attribute("value"), None);
}

fn fresh_container(host: &WebHost) -> web_sys::Node {
	let container = host.document().create_element("div").unwrap();
	host.document().body().unwrap().append_child(&container).unwrap();
	container.into()
}

fn test_create(vdom: &VirtualNode, expected_html: &str) {
	let mut host = WebHost::from_window().unwrap();
	let container = fresh_container(&host);

	let report = reconcile(&mut host, None, Some(vdom), &container, 0);

	assert_eq!(report.count(Classification::Added), 1);
	assert_eq!(container.dyn_ref::<HtmlElement>().unwrap().inner_html(), expected_html);
}
