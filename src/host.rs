//! The boundary to the environment that owns the live tree.
//!
//! The differ never holds on to live nodes beyond a single call. It locates them through their parent and position,
//! via [`Host::child_at`], and mutates them only through this trait.

use crate::node::{Callback, PropValue};
use core::fmt::Debug;

/// A live UI tree that can be patched.
///
/// Implementations are expected to behave like the DOM: appending places the child last,
/// removing or replacing a node detaches it from its current parent.
pub trait Host {
	/// A handle to a live node. Cloning it must not clone the node itself.
	type Node: Clone + Debug;
	type Error: Debug;

	fn create_element(&mut self, tag: &str) -> Result<Self::Node, Self::Error>;
	fn create_text(&mut self, text: &str) -> Result<Self::Node, Self::Error>;

	/// Assigns `value` directly onto `node`, or clears the property if `value` is [`None`].
	///
	/// Assigning a [`PropValue::Callback`] registers it as a live handler, but only if the assignment succeeds.
	/// Each such registration is later matched by exactly one [`Host::release_callback`] call once the differ stops using it.
	fn set_property(&mut self, node: &Self::Node, name: &str, value: Option<&PropValue>) -> Result<(), Self::Error>;

	fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), Self::Error>;

	/// Detaches `node` (and with it its subtree) from its parent.
	fn remove_child(&mut self, node: &Self::Node) -> Result<(), Self::Error>;

	/// Puts `new` in the place of `old` within `old`'s parent.
	fn replace_child(&mut self, old: &Self::Node, new: &Self::Node) -> Result<(), Self::Error>;

	fn child_at(&self, parent: &Self::Node, index: usize) -> Option<Self::Node>;

	/// Called once for each callback registration that left the live tree, either through a property change
	/// or because its node was removed or replaced.
	fn release_callback(&mut self, _callback: &Callback) {}

	/// Called after each top-level reconciliation. Hosts may free unreferenced handler resources here.
	fn flush(&mut self) {}
}

/// A read-only view of one live node, as reported by [`Inspect::inspect`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiveView<N> {
	Text(String),
	Element {
		tag: String,
		properties: Vec<(String, PropValue)>,
		children: Vec<N>,
	},
}

/// A [`Host`] whose live nodes can be read back.
pub trait Inspect: Host {
	/// Returns [`None`] for live nodes that have no virtual counterpart (comments, processing instructions…).
	fn inspect(&self, node: &Self::Node) -> Option<LiveView<Self::Node>>;
}
