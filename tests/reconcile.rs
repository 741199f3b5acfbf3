use sapling_dom::{
	diff::{classify, Change},
	element,
	memory::{MemoryHost, Mutation, NodeId},
	reconcile, text, Callback, Classification, Differ, Host, PropValue, VirtualNode,
};

fn init_tracing() {
	let _ = tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).with_test_writer().try_init();
}

fn mounted(tree: &VirtualNode) -> (MemoryHost, NodeId) {
	init_tracing();
	let mut host = MemoryHost::recording();
	let root = host.create_root("body");
	let report = reconcile(&mut host, None, Some(tree), &root, 0);
	assert_eq!(report.count(Classification::Added), 1);
	host.take_mutations();
	(host, root)
}

fn list(items: &[&str]) -> VirtualNode {
	element("ul").children(items.iter().map(|&item| element("li").child(item))).into()
}

#[test]
fn mount_builds_whole_subtree() {
	let tree: VirtualNode = element("div").prop("class", "a").child(element("p").child("hello")).child("world").into();
	let (host, root) = mounted(&tree);
	assert_eq!(host.to_html(root), r#"<body><div class="a"><p>hello</p>world</div></body>"#);
}

#[test]
fn text_update_replaces() {
	let (mut host, root) = mounted(&text("hello"));
	let report = reconcile(&mut host, Some(&text("hello")), Some(&text("world")), &root, 0);

	assert_eq!(report.changes(), &[Change { depth: 0, index: 0, kind: Classification::Replaced, properties: 0 }]);
	assert_eq!(host.text(host.children(root)[0]), Some("world"));
	assert_eq!(host.children(root).len(), 1);
}

#[test]
fn element_update_keeps_identity() {
	let a: VirtualNode = element("div").prop("class", "a").into();
	let b: VirtualNode = element("div").prop("class", "b").into();
	let (mut host, root) = mounted(&a);
	let live = host.children(root)[0];

	let report = reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	assert_eq!(report.changes(), &[Change { depth: 0, index: 0, kind: Classification::Updated, properties: 1 }]);
	assert_eq!(host.children(root), &[live]);
	assert_eq!(host.property(live, "class"), Some(&PropValue::from("b")));
	assert_eq!(
		host.take_mutations(),
		vec![Mutation::SetProperty {
			node: live,
			name: "class".to_owned(),
			value: Some("b".into()),
		}]
	);
}

#[test]
fn tag_change_replaces_even_with_identical_props() {
	let a: VirtualNode = element("div").into();
	let b: VirtualNode = element("span").into();
	let (mut host, root) = mounted(&a);
	let old = host.children(root)[0];

	let report = reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	assert_eq!(report.count(Classification::Replaced), 1);
	assert_eq!(report.count(Classification::Updated), 0);
	let new = host.children(root)[0];
	assert_ne!(old, new);
	assert_eq!(host.tag(new), Some("span"));
	assert_eq!(host.parent(old), None);
}

#[test]
fn node_kind_change_replaces() {
	let a: VirtualNode = element("b").child("bold").into();
	let b = text("plain");
	let (mut host, root) = mounted(&a);

	let report = reconcile(&mut host, Some(&a), Some(&b), &root, 0);
	assert_eq!(report.count(Classification::Replaced), 1);
	assert_eq!(host.to_html(root), "<body>plain</body>");

	let report = reconcile(&mut host, Some(&b), Some(&a), &root, 0);
	assert_eq!(report.count(Classification::Replaced), 1);
	assert_eq!(host.to_html(root), "<body><b>bold</b></body>");
}

#[test]
fn nested_add() {
	let a: VirtualNode = element("ul").into();
	let b: VirtualNode = element("ul").child(element("li").child("x")).into();
	let (mut host, root) = mounted(&a);

	let report = reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	assert_eq!(
		report.changes(),
		&[
			Change { depth: 0, index: 0, kind: Classification::Updated, properties: 0 },
			Change { depth: 1, index: 0, kind: Classification::Added, properties: 0 },
		]
	);
	assert_eq!(host.to_html(root), "<body><ul><li>x</li></ul></body>");
}

#[test]
fn positional_removal() {
	let a = list(&["A", "B", "C"]);
	let b = list(&["A", "B"]);
	let (mut host, root) = mounted(&a);

	let report = reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	assert_eq!(report.count(Classification::Removed), 1);
	assert_eq!(report.count(Classification::Added), 0);
	assert_eq!(report.count(Classification::Replaced), 0);
	let removed: Vec<_> = report.changes().iter().filter(|change| change.kind == Classification::Removed).collect();
	assert_eq!(removed[0].index, 2);
	assert_eq!(removed[0].depth, 1);
	assert_eq!(host.to_html(root), "<body><ul><li>A</li><li>B</li></ul></body>");
}

#[test]
fn several_trailing_removals_keep_positions() {
	let a = list(&["A", "B", "C", "D", "E"]);
	let b = list(&["A", "X"]);
	let (mut host, root) = mounted(&a);

	let report = reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	assert_eq!(report.count(Classification::Removed), 3);
	assert_eq!(host.to_html(root), "<body><ul><li>A</li><li>X</li></ul></body>");
}

#[test]
fn several_additions_append_in_order() {
	let a = list(&["A"]);
	let b = list(&["A", "B", "C"]);
	let (mut host, root) = mounted(&a);

	let report = reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	assert_eq!(report.count(Classification::Added), 2);
	assert_eq!(host.to_html(root), "<body><ul><li>A</li><li>B</li><li>C</li></ul></body>");
}

#[test]
fn reorder_is_positional() {
	let a = list(&["A", "B"]);
	let b = list(&["B", "A"]);
	let (mut host, root) = mounted(&a);
	let items = host.children(host.children(root)[0]).to_vec();

	let report = reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	// Both <li> are kept, only their text is swapped out.
	assert_eq!(host.children(host.children(root)[0]), items.as_slice());
	assert_eq!(report.count(Classification::Replaced), 2);
	assert_eq!(report.count(Classification::Added), 0);
	assert_eq!(report.count(Classification::Removed), 0);
	assert_eq!(host.to_html(root), "<body><ul><li>B</li><li>A</li></ul></body>");
}

#[test]
fn identical_trees_are_a_noop() {
	let tree: VirtualNode = element("main")
		.prop("id", "app")
		.prop("hidden", false)
		.prop("tabindex", 1)
		.child(list(&["A", "B"]))
		.child("tail")
		.into();
	let (mut host, root) = mounted(&tree);

	let report = reconcile(&mut host, Some(&tree), Some(&tree), &root, 0);

	assert!(report.is_noop());
	assert!(host.mutations().is_empty());
}

#[test]
fn add_then_remove_restores_parent() {
	init_tracing();
	let mut host = MemoryHost::new();
	let root = host.create_root("body");
	let existing = host.create_text("existing").unwrap();
	host.append_child(&root, &existing).unwrap();
	let before = host.children(root).to_vec();

	let tree = list(&["A"]);
	reconcile(&mut host, None, Some(&tree), &root, 1);
	assert_eq!(host.children(root).len(), 2);
	reconcile(&mut host, Some(&tree), None, &root, 1);

	assert_eq!(host.children(root), before.as_slice());
}

#[test]
fn removed_property_is_cleared() {
	let a: VirtualNode = element("input").prop("value", "x").prop("disabled", true).into();
	let b: VirtualNode = element("input").prop("value", "x").into();
	let (mut host, root) = mounted(&a);
	let live = host.children(root)[0];

	let report = reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	assert_eq!(report.changes()[0].properties, 1);
	assert_eq!(host.property(live, "disabled"), None);
	assert_eq!(host.property(live, "value"), Some(&PropValue::from("x")));
}

#[test]
fn callbacks_are_released_with_their_nodes() {
	let on_click = Callback::new(|_| ());
	let a: VirtualNode = element("div").child(element("button").prop("onclick", on_click.clone())).child(element("button").prop("onclick", on_click.clone())).into();
	let (mut host, root) = mounted(&a);
	assert_eq!(host.callback_references(&on_click), 2);

	reconcile(&mut host, Some(&a), None, &root, 0);

	assert_eq!(host.callback_references(&on_click), 0);
	assert_eq!(host.live_callback_count(), 0);
}

#[test]
fn changed_callback_swaps_registration() {
	let first = Callback::new(|_| ());
	let second = Callback::new(|_| ());
	let a: VirtualNode = element("button").prop("onclick", first.clone()).into();
	let b: VirtualNode = element("button").prop("onclick", second.clone()).into();
	let (mut host, root) = mounted(&a);

	let report = reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	assert_eq!(report.changes()[0].properties, 1);
	assert_eq!(host.callback_references(&first), 0);
	assert_eq!(host.callback_references(&second), 1);
	assert_eq!(host.live_callback_count(), 1);
}

#[test]
fn same_callback_is_unchanged() {
	let on_click = Callback::new(|_| ());
	let a: VirtualNode = element("button").prop("onclick", on_click.clone()).into();
	let b: VirtualNode = element("button").prop("onclick", on_click.clone()).into();
	let (mut host, root) = mounted(&a);

	let report = reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	assert!(report.is_noop());
	assert_eq!(host.callback_references(&on_click), 1);
}

#[test]
fn depth_limit_stops_descent() {
	init_tracing();
	let mut host = MemoryHost::new();
	let root = host.create_root("body");
	let a: VirtualNode = element("div").into();
	let b: VirtualNode = element("div").child(element("span")).into();
	let differ = Differ::new().with_depth_limit(0);
	differ.reconcile(&mut host, None, Some(&a), &root, 0);

	let report = differ.reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	assert_eq!(report.count(Classification::Updated), 1);
	assert_eq!(report.count(Classification::Added), 0);
	assert_eq!(host.to_html(root), "<body><div></div></body>");
}

#[test]
fn missing_live_node_is_not_fatal() {
	init_tracing();
	let mut host = MemoryHost::new();
	let root = host.create_root("body");
	let tree: VirtualNode = element("div").into();

	let report = reconcile(&mut host, Some(&tree), None, &root, 0);
	assert!(report.changes().is_empty());

	let span: VirtualNode = element("span").into();
	let report = reconcile(&mut host, Some(&tree), Some(&span), &root, 0);
	assert_eq!(report.count(Classification::Added), 1);
	assert_eq!(host.to_html(root), "<body><span></span></body>");
}

#[test]
fn classification_is_total() {
	let t1 = text("a");
	let t2 = text("b");
	let div: VirtualNode = element("div").into();
	let div_b: VirtualNode = element("div").prop("class", "b").into();
	let span: VirtualNode = element("span").into();

	assert_eq!(classify(None, None), None);
	assert_eq!(classify(None, Some(&t1)), Some(Classification::Added));
	assert_eq!(classify(Some(&div), None), Some(Classification::Removed));
	assert_eq!(classify(Some(&t1), Some(&t1)), Some(Classification::Unchanged));
	assert_eq!(classify(Some(&t1), Some(&t2)), Some(Classification::Replaced));
	assert_eq!(classify(Some(&t1), Some(&div)), Some(Classification::Replaced));
	assert_eq!(classify(Some(&div), Some(&t1)), Some(Classification::Replaced));
	assert_eq!(classify(Some(&div), Some(&span)), Some(Classification::Replaced));
	assert_eq!(classify(Some(&div), Some(&div_b)), Some(Classification::Updated));
}

#[test]
fn addition_below_the_end_still_appends() {
	init_tracing();
	let mut host = MemoryHost::new();
	let root = host.create_root("body");
	for item in &["A", "B"] {
		reconcile(&mut host, None, Some(&text(*item)), &root, 0);
	}

	let added = text("C");
	reconcile(&mut host, None, Some(&added), &root, 0);
	assert_eq!(host.to_html(root), "<body>ABC</body>");

	// Removal goes by position, so this takes out "A" rather than the node just added.
	reconcile(&mut host, Some(&added), None, &root, 0);
	assert_eq!(host.to_html(root), "<body>BC</body>");
}

/// Delegates to a [`MemoryHost`], but fails on request.
#[derive(Debug, Default)]
struct FailingHost {
	inner: MemoryHost,
	failing_tag: Option<&'static str>,
	fail_append: bool,
	fail_replace: bool,
}

#[derive(Debug)]
struct Refused;

impl Host for FailingHost {
	type Node = NodeId;
	type Error = Refused;

	fn create_element(&mut self, tag: &str) -> Result<NodeId, Refused> {
		if self.failing_tag == Some(tag) {
			return Err(Refused);
		}
		self.inner.create_element(tag).map_err(|_| Refused)
	}
	fn create_text(&mut self, text: &str) -> Result<NodeId, Refused> {
		self.inner.create_text(text).map_err(|_| Refused)
	}
	fn set_property(&mut self, node: &NodeId, name: &str, value: Option<&PropValue>) -> Result<(), Refused> {
		self.inner.set_property(node, name, value).map_err(|_| Refused)
	}
	fn append_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<(), Refused> {
		if self.fail_append {
			return Err(Refused);
		}
		self.inner.append_child(parent, child).map_err(|_| Refused)
	}
	fn remove_child(&mut self, node: &NodeId) -> Result<(), Refused> {
		self.inner.remove_child(node).map_err(|_| Refused)
	}
	fn replace_child(&mut self, old: &NodeId, new: &NodeId) -> Result<(), Refused> {
		if self.fail_replace {
			return Err(Refused);
		}
		self.inner.replace_child(old, new).map_err(|_| Refused)
	}
	fn child_at(&self, parent: &NodeId, index: usize) -> Option<NodeId> {
		self.inner.child_at(parent, index)
	}
	fn release_callback(&mut self, callback: &Callback) {
		self.inner.release_callback(callback)
	}
	fn flush(&mut self) {
		self.inner.flush()
	}
}

fn failing_host() -> (FailingHost, NodeId) {
	init_tracing();
	let mut host = FailingHost::default();
	let root = host.inner.create_root("body");
	(host, root)
}

#[test]
fn failed_child_creation_releases_callbacks() {
	let (mut host, root) = failing_host();
	host.failing_tag = Some("bad");
	let on_click = Callback::new(|_| ());
	let tree: VirtualNode = element("div")
		.prop("onclick", on_click.clone())
		.child(element("button").prop("onclick", on_click.clone()))
		.child(element("bad"))
		.into();

	for _ in 0..3 {
		let report = reconcile(&mut host, None, Some(&tree), &root, 0);
		assert!(report.changes().is_empty());
	}

	assert_eq!(host.inner.children(root).len(), 0);
	assert_eq!(host.inner.callback_references(&on_click), 0);
	assert_eq!(host.inner.live_callback_count(), 0);
}

#[test]
fn failed_append_releases_callbacks() {
	let (mut host, root) = failing_host();
	host.fail_append = true;
	let on_click = Callback::new(|_| ());
	let tree: VirtualNode = element("button").prop("onclick", on_click.clone()).into();

	let report = reconcile(&mut host, None, Some(&tree), &root, 0);

	assert!(report.changes().is_empty());
	assert_eq!(host.inner.callback_references(&on_click), 0);
	assert_eq!(host.inner.live_callback_count(), 0);
}

#[test]
fn failed_replacement_releases_new_callbacks_only() {
	let (mut host, root) = failing_host();
	let old_click = Callback::new(|_| ());
	let new_click = Callback::new(|_| ());
	let a: VirtualNode = element("div").prop("onclick", old_click.clone()).into();
	let b: VirtualNode = element("span").prop("onclick", new_click.clone()).into();
	reconcile(&mut host, None, Some(&a), &root, 0);
	host.fail_replace = true;

	let report = reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	assert!(report.changes().is_empty());
	assert_eq!(host.inner.callback_references(&old_click), 1);
	assert_eq!(host.inner.callback_references(&new_click), 0);
	assert_eq!(host.inner.live_callback_count(), 1);
}

#[test]
fn removed_subtrees_are_freed() {
	let a = list(&["A", "B", "C"]);
	let b = list(&["A"]);
	let (mut host, root) = mounted(&a);
	let removed = host.children(host.children(root)[0])[2];
	assert_eq!(host.node_count(), 8);

	reconcile(&mut host, Some(&a), Some(&b), &root, 0);

	assert_eq!(host.node_count(), 4);
	assert_eq!(host.tag(removed), None);
	assert_eq!(host.parent(removed), None);
	assert_eq!(host.to_html(root), "<body><ul><li>A</li></ul></body>");

	// Freed slots are reused, and stale ids don't resolve to their successors.
	reconcile(&mut host, Some(&b), Some(&a), &root, 0);
	assert_eq!(host.slot_count(), 8);
	assert_eq!(host.tag(removed), None);
}
