#![cfg(target_arch = "wasm32")]

use sapling_dom::{element, load::load_child_nodes, reconcile, text, web::WebHost, Callback, VirtualNode};
use std::sync::Once;
use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};

wasm_bindgen_test_configure!(run_in_browser);

static LOG_INIT: Once = Once::new();

#[wasm_bindgen_test]
fn text_node() {
	test_create_diff_identical_remove(&text("Hello sapling-dom text!"));
}

#[wasm_bindgen_test]
fn several_children() {
	test_create_diff_identical_remove(
		&element("p")
			.child("Hello sapling-dom")
			.child(element("b").child(" multiple "))
			.child("nodes!")
			.into(),
	);
}

#[wasm_bindgen_test]
fn minimal_div() {
	test_create_diff_identical_remove(&element("div").into());
}

#[wasm_bindgen_test]
fn clickable_div() {
	test_create_diff_identical_remove(&element("div").prop("onclick", Callback::new(|_| ())).into());
}

fn test_create_diff_identical_remove(vdom: &VirtualNode) {
	LOG_INIT.call_once(tracing_wasm::set_as_global_default);

	let mut host = WebHost::from_window().unwrap();
	let container: web_sys::Node = host.document().create_element("div").unwrap().into();
	host.document().body().unwrap().append_child(&container).unwrap();

	reconcile(&mut host, None, Some(vdom), &container, 0);
	assert_eq!(container.child_nodes().length(), 1);
	let live = container.first_child().unwrap();

	let report = reconcile(&mut host, Some(vdom), Some(vdom), &container, 0);
	assert!(report.is_noop());
	assert!(container.first_child().unwrap().is_same_node(Some(&live)));
	if !vdom.callbacks().any(|_| true) {
		assert_eq!(load_child_nodes(&host, &container), vec![vdom.clone()]);
	}

	reconcile(&mut host, Some(vdom), None, &container, 0);
	assert_eq!(container.child_nodes().length(), 0);
}
