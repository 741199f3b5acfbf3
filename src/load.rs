use crate::{
	host::{Inspect, LiveView},
	node::{Element, Props, VirtualNode},
};
use tracing::warn;

pub fn load_child_nodes<H: Inspect>(host: &H, parent: &H::Node) -> Vec<VirtualNode> {
	match host.inspect(parent) {
		Some(LiveView::Element { children, .. }) => children.iter().filter_map(|child| load_node(host, child)).collect(),
		Some(LiveView::Text(_)) | None => Vec::new(),
	}
}

pub fn load_node<H: Inspect>(host: &H, node: &H::Node) -> Option<VirtualNode> {
	match host.inspect(node) {
		Some(LiveView::Text(text)) => Some(VirtualNode::Text(text)),
		Some(LiveView::Element { tag, properties, children }) => Some(VirtualNode::Element(Element {
			tag,
			props: properties.into_iter().collect::<Props>(),
			children: children.iter().filter_map(|child| load_node(host, child)).collect(),
		})),
		None => {
			warn!("Unrecognised live node {:?}. Skipping it, which will shift the positions of its siblings.", node);
			None
		}
	}
}
