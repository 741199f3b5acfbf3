use crate::{
	host::Host,
	node::{Element, PropValue, VirtualNode},
};
use tracing::{instrument, trace, trace_span};

/// Builds a detached live node for `node`, including its whole subtree.
///
/// Existing live nodes are never touched. Every property is assigned directly,
/// so callbacks become live handlers and primitives become live fields.
///
/// # Errors
///
/// Iff the host fails to create or wire up a node. The partially built subtree is dropped in that case,
/// and every callback it had registered is released again through [`Host::release_callback`].
#[instrument(skip(host, node))]
pub fn materialize<H: Host>(host: &mut H, node: &VirtualNode) -> Result<H::Node, H::Error> {
	match node {
		VirtualNode::Text(text) => {
			let span = if cfg!(feature = "dangerous-logging") {
				trace_span!("Creating text node", text = %text)
			} else {
				trace_span!("Creating text node", len = text.len())
			};
			let _enter = span.enter();
			host.create_text(text)
		}
		VirtualNode::Element(element) => materialize_element(host, element),
	}
}

fn materialize_element<H: Host>(host: &mut H, Element { tag, props, children }: &Element) -> Result<H::Node, H::Error> {
	let span = trace_span!("Creating element", %tag, props = props.len(), children = children.len());
	let _enter = span.enter();

	let live = host.create_element(tag)?;
	for (i, (name, value)) in props.iter().enumerate() {
		if let Err(error) = host.set_property(&live, name, Some(value)) {
			abandon(host, props.values().take(i), &[]);
			return Err(error);
		}
	}
	for (i, child) in children.iter().enumerate() {
		let attached = match materialize(host, child) {
			Ok(child) => host.append_child(&live, &child).map_err(|error| (error, i + 1)),
			Err(error) => Err((error, i)),
		};
		if let Err((error, built)) = attached {
			abandon(host, props.values(), &children[..built]);
			return Err(error);
		}
	}
	Ok(live)
}

/// Releases the callbacks registered for a partially built element that is being dropped.
fn abandon<'a, H: Host>(host: &mut H, assigned: impl Iterator<Item = &'a PropValue>, built_children: &[VirtualNode]) {
	let mut released = 0_usize;
	for value in assigned {
		if let PropValue::Callback(callback) = value {
			host.release_callback(callback);
			released += 1;
		}
	}
	for callback in built_children.iter().flat_map(VirtualNode::callbacks) {
		host.release_callback(callback);
		released += 1;
	}
	trace!("Released {} callback(s) of an abandoned subtree.", released);
}
