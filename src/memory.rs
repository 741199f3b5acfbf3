//! An in-memory [`Host`], for tests and for embedders that render somewhere other than a browser.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Removing or replacing a node frees it together with its subtree,
//! and its slot is reused by later nodes. Ids of freed nodes are stale: lookups through them find nothing.
//!
//! A host created with [`MemoryHost::recording`] also logs every mutation as a [`Mutation`],
//! which makes it easy to assert how much work a reconciliation did.

use crate::{
	host::{Host, Inspect, LiveView},
	node::{Callback, Event, PropValue, Props},
	rc_hash_map::RcHashMap,
};
use core::fmt::{self, Display, Formatter};
use thiserror::Error;
use tracing::{instrument, trace, warn};

/// Handle to a node in a [`MemoryHost`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
	index: usize,
	generation: u32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MemoryError {
	#[error("unknown node {0:?}")]
	UnknownNode(NodeId),
	#[error("{0:?} is a text node, but an element was required")]
	NotAnElement(NodeId),
	#[error("{0:?} has no parent")]
	Detached(NodeId),
	#[error("{0:?} is already attached to {1:?}")]
	AlreadyAttached(NodeId, NodeId),
}

/// A single change to a [`MemoryHost`]'s live tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
	CreateElement { node: NodeId, tag: String },
	CreateText { node: NodeId, text: String },
	SetProperty { node: NodeId, name: String, value: Option<PropValue> },
	AppendChild { parent: NodeId, child: NodeId },
	RemoveChild { parent: NodeId, child: NodeId },
	ReplaceChild { parent: NodeId, old: NodeId, new: NodeId },
}

#[derive(Debug)]
enum Content {
	Text(String),
	Element { tag: String, props: Props, children: Vec<NodeId> },
}

#[derive(Debug)]
struct LiveNode {
	content: Content,
	parent: Option<NodeId>,
}

#[derive(Debug)]
struct Slot {
	generation: u32,
	node: Option<LiveNode>,
}

#[derive(Debug, Default)]
pub struct MemoryHost {
	slots: Vec<Slot>,
	vacant: Vec<usize>,
	mutations: Option<Vec<Mutation>>,
	callbacks: RcHashMap<Callback, u32, ()>,
}

impl MemoryHost {
	/// Creates an empty host that doesn't log mutations.
	#[must_use]
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates an empty host that logs every mutation. See [`MemoryHost::mutations`].
	#[must_use]
	pub fn recording() -> Self {
		Self {
			mutations: Some(Vec::new()),
			..Self::default()
		}
	}

	/// Creates a detached element to mount an application into. Not logged as a mutation.
	pub fn create_root(&mut self, tag: &str) -> NodeId {
		self.push(Content::Element {
			tag: tag.to_owned(),
			props: Props::new(),
			children: Vec::new(),
		})
	}

	/// Mutations logged since creation or the last [`MemoryHost::take_mutations`].
	/// Always empty unless the host was created with [`MemoryHost::recording`].
	#[must_use]
	pub fn mutations(&self) -> &[Mutation] {
		self.mutations.as_deref().unwrap_or(&[])
	}

	pub fn take_mutations(&mut self) -> Vec<Mutation> {
		self.mutations.as_mut().map(core::mem::take).unwrap_or_default()
	}

	/// Number of nodes currently allocated, attached or not.
	#[must_use]
	pub fn node_count(&self) -> usize {
		self.slots.len() - self.vacant.len()
	}

	/// Number of arena slots, including vacant ones awaiting reuse.
	#[must_use]
	pub fn slot_count(&self) -> usize {
		self.slots.len()
	}

	/// Number of distinct callbacks currently registered as live handlers.
	///
	/// Released callbacks are only forgotten on [`Host::flush`].
	#[must_use]
	pub fn live_callback_count(&self) -> usize {
		self.callbacks.len()
	}

	/// How many live properties currently hold `callback`.
	#[must_use]
	pub fn callback_references(&self, callback: &Callback) -> u32 {
		self.callbacks.count(callback).copied().unwrap_or(0)
	}

	#[must_use]
	pub fn children(&self, node: NodeId) -> &[NodeId] {
		match self.get(node).map(|live| &live.content) {
			Some(Content::Element { children, .. }) => children,
			_ => &[],
		}
	}

	#[must_use]
	pub fn parent(&self, node: NodeId) -> Option<NodeId> {
		self.get(node)?.parent
	}

	#[must_use]
	pub fn tag(&self, node: NodeId) -> Option<&str> {
		match &self.get(node)?.content {
			Content::Element { tag, .. } => Some(tag),
			Content::Text(_) => None,
		}
	}

	#[must_use]
	pub fn text(&self, node: NodeId) -> Option<&str> {
		match &self.get(node)?.content {
			Content::Text(text) => Some(text),
			Content::Element { .. } => None,
		}
	}

	#[must_use]
	pub fn property(&self, node: NodeId, name: &str) -> Option<&PropValue> {
		self.properties(node)?.get(name)
	}

	#[must_use]
	pub fn properties(&self, node: NodeId) -> Option<&Props> {
		match &self.get(node)?.content {
			Content::Element { props, .. } => Some(props),
			Content::Text(_) => None,
		}
	}

	/// Finds the first node in document order below `root` (inclusive) whose property `name` equals `value`.
	#[must_use]
	pub fn find(&self, root: NodeId, name: &str, value: &PropValue) -> Option<NodeId> {
		if self.property(root, name) == Some(value) {
			return Some(root);
		}
		self.children(root).iter().find_map(|&child| self.find(child, name, value))
	}

	/// Finds the first element below `root` (inclusive) with the given tag.
	#[must_use]
	pub fn find_tag(&self, root: NodeId, tag: &str) -> Option<NodeId> {
		if self.tag(root) == Some(tag) {
			return Some(root);
		}
		self.children(root).iter().find_map(|&child| self.find_tag(child, tag))
	}

	/// Invokes the handler stored in `node`'s `on{event.name}` property, like a browser would.
	///
	/// The handler runs after the host is no longer borrowed, so it may freely re-enter an application that owns this host
	/// as long as the caller doesn't hold a borrow either. See [`MemoryHost::handler`].
	///
	/// Returns whether a handler was found.
	pub fn dispatch(&self, node: NodeId, event: &Event) -> bool {
		match self.handler(node, &event.name) {
			Some(handler) => {
				handler.call(event);
				true
			}
			None => false,
		}
	}

	/// The callback stored in `node`'s `on{event_name}` property, if any.
	#[must_use]
	pub fn handler(&self, node: NodeId, event_name: &str) -> Option<Callback> {
		match self.property(node, &format!("on{}", event_name)) {
			Some(PropValue::Callback(callback)) => Some(callback.clone()),
			Some(other) => {
				warn!("Handler property for {:?} is not a callback: {:?}", event_name, other);
				None
			}
			None => None,
		}
	}

	/// Serializes the subtree at `node` as HTML-ish markup.
	///
	/// Primitive properties are written as sorted attributes, callbacks are omitted. Text is not escaped.
	#[must_use]
	pub fn to_html(&self, node: NodeId) -> String {
		Html { host: self, node }.to_string()
	}

	fn get(&self, node: NodeId) -> Option<&LiveNode> {
		self.slots
			.get(node.index)
			.filter(|slot| slot.generation == node.generation)
			.and_then(|slot| slot.node.as_ref())
	}

	fn get_mut(&mut self, node: NodeId) -> Result<&mut LiveNode, MemoryError> {
		self.slots
			.get_mut(node.index)
			.filter(|slot| slot.generation == node.generation)
			.and_then(|slot| slot.node.as_mut())
			.ok_or(MemoryError::UnknownNode(node))
	}

	fn push(&mut self, content: Content) -> NodeId {
		let node = Some(LiveNode { content, parent: None });
		match self.vacant.pop() {
			Some(index) => {
				let slot = &mut self.slots[index];
				slot.node = node;
				NodeId {
					index,
					generation: slot.generation,
				}
			}
			None => {
				self.slots.push(Slot { generation: 0, node });
				NodeId {
					index: self.slots.len() - 1,
					generation: 0,
				}
			}
		}
	}

	/// Frees `node` and its subtree. Their ids become stale.
	fn free(&mut self, node: NodeId) {
		let mut pending = vec![node];
		while let Some(node) = pending.pop() {
			let slot = match self.slots.get_mut(node.index) {
				Some(slot) if slot.generation == node.generation => slot,
				_ => continue,
			};
			if let Some(LiveNode {
				content: Content::Element { children, .. },
				..
			}) = slot.node.take()
			{
				pending.extend(children);
			}
			slot.generation = slot.generation.wrapping_add(1);
			self.vacant.push(node.index);
		}
	}

	fn record(&mut self, mutation: impl FnOnce() -> Mutation) {
		if let Some(mutations) = &mut self.mutations {
			mutations.push(mutation());
		}
	}

	fn children_mut(&mut self, node: NodeId) -> Result<&mut Vec<NodeId>, MemoryError> {
		match &mut self.get_mut(node)?.content {
			Content::Element { children, .. } => Ok(children),
			Content::Text(_) => Err(MemoryError::NotAnElement(node)),
		}
	}

	fn detach(&mut self, node: NodeId) -> Result<(NodeId, usize), MemoryError> {
		let parent = self.get_mut(node)?.parent.ok_or(MemoryError::Detached(node))?;
		let siblings = self.children_mut(parent)?;
		let index = siblings.iter().position(|&sibling| sibling == node).ok_or(MemoryError::Detached(node))?;
		siblings.remove(index);
		self.get_mut(node)?.parent = None;
		Ok((parent, index))
	}

	fn ensure_detached(&mut self, node: NodeId) -> Result<(), MemoryError> {
		match self.get_mut(node)?.parent {
			Some(parent) => Err(MemoryError::AlreadyAttached(node, parent)),
			None => Ok(()),
		}
	}
}

struct Html<'a> {
	host: &'a MemoryHost,
	node: NodeId,
}

impl Display for Html<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.host.get(self.node).map(|live| &live.content) {
			None => {
				warn!("Tried to serialize unknown node {:?}", self.node);
				Ok(())
			}
			Some(Content::Text(text)) => f.write_str(text),
			Some(Content::Element { tag, props, children }) => {
				let mut attributes: Vec<_> = props.iter().filter(|(_, value)| !matches!(value, PropValue::Callback(_))).collect();
				attributes.sort_by(|(a, _), (b, _)| a.cmp(b));

				write!(f, "<{}", tag)?;
				for (name, value) in attributes {
					match value {
						PropValue::String(string) => write!(f, " {}=\"{}\"", name, string)?,
						PropValue::Number(number) => write!(f, " {}=\"{}\"", name, number)?,
						PropValue::Boolean(boolean) => write!(f, " {}=\"{}\"", name, boolean)?,
						PropValue::Callback(_) => (),
					}
				}
				f.write_str(">")?;
				for &node in children {
					Html { host: self.host, node }.fmt(f)?;
				}
				write!(f, "</{}>", tag)
			}
		}
	}
}

impl Host for MemoryHost {
	type Node = NodeId;
	type Error = MemoryError;

	fn create_element(&mut self, tag: &str) -> Result<Self::Node, Self::Error> {
		let node = self.push(Content::Element {
			tag: tag.to_owned(),
			props: Props::new(),
			children: Vec::new(),
		});
		self.record(|| Mutation::CreateElement { node, tag: tag.to_owned() });
		Ok(node)
	}

	fn create_text(&mut self, text: &str) -> Result<Self::Node, Self::Error> {
		let node = self.push(Content::Text(text.to_owned()));
		self.record(|| Mutation::CreateText { node, text: text.to_owned() });
		Ok(node)
	}

	fn set_property(&mut self, node: &Self::Node, name: &str, value: Option<&PropValue>) -> Result<(), Self::Error> {
		let node = *node;
		let props = match &mut self.get_mut(node)?.content {
			Content::Element { props, .. } => props,
			Content::Text(_) => return Err(MemoryError::NotAnElement(node)),
		};
		match value {
			Some(value) => {
				props.insert(name.to_owned(), value.clone());
			}
			None => {
				props.remove(name);
			}
		}
		if let Some(PropValue::Callback(callback)) = value {
			if self.callbacks.increment_or_insert_with(callback.clone(), || ()).is_err() {
				warn!("Callback reference count saturated: {:?}", callback);
			}
		}
		self.record(|| Mutation::SetProperty {
			node,
			name: name.to_owned(),
			value: value.cloned(),
		});
		Ok(())
	}

	fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), Self::Error> {
		let (parent, child) = (*parent, *child);
		self.ensure_detached(child)?;
		self.children_mut(parent)?.push(child);
		self.get_mut(child)?.parent = Some(parent);
		self.record(|| Mutation::AppendChild { parent, child });
		Ok(())
	}

	fn remove_child(&mut self, node: &Self::Node) -> Result<(), Self::Error> {
		let (parent, _) = self.detach(*node)?;
		self.free(*node);
		self.record(|| Mutation::RemoveChild { parent, child: *node });
		Ok(())
	}

	fn replace_child(&mut self, old: &Self::Node, new: &Self::Node) -> Result<(), Self::Error> {
		let (old, new) = (*old, *new);
		self.ensure_detached(new)?;
		let (parent, index) = self.detach(old)?;
		self.children_mut(parent)?.insert(index, new);
		self.get_mut(new)?.parent = Some(parent);
		self.free(old);
		self.record(|| Mutation::ReplaceChild { parent, old, new });
		Ok(())
	}

	fn child_at(&self, parent: &Self::Node, index: usize) -> Option<Self::Node> {
		self.children(*parent).get(index).copied()
	}

	fn release_callback(&mut self, callback: &Callback) {
		match self.callbacks.weak_decrement(callback) {
			Ok(Some(_)) => (),
			Ok(None) => warn!("Released a callback that was never registered: {:?}", callback),
			Err(_) => warn!("Released a callback more often than it was registered: {:?}", callback),
		}
	}

	#[instrument(skip(self))]
	fn flush(&mut self) {
		let freed = self.callbacks.drain_weak().count();
		trace!("Freed {} callback(s).", freed);
	}
}

impl Inspect for MemoryHost {
	fn inspect(&self, node: &Self::Node) -> Option<LiveView<Self::Node>> {
		Some(match &self.get(*node)?.content {
			Content::Text(text) => LiveView::Text(text.clone()),
			Content::Element { tag, props, children } => LiveView::Element {
				tag: tag.clone(),
				properties: props.iter().map(|(name, value)| (name.clone(), value.clone())).collect(),
				children: children.clone(),
			},
		})
	}
}
