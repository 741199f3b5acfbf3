//! The virtual tree: immutable descriptions of the desired live tree.
//!
//! A [`VirtualNode`] is never mutated by the differ. Components produce a fresh tree on every render,
//! and the previous one is only ever compared against.

use core::{
	fmt::{self, Debug, Formatter},
	hash::{Hash, Hasher},
};
use hashbrown::HashMap;
use std::rc::Rc;

/// Property bag of an [`Element`]. Iteration order is not meaningful.
pub type Props = HashMap<String, PropValue>;

/// A node of the virtual tree.
#[derive(Debug, Clone, PartialEq)]
pub enum VirtualNode {
	/// A text leaf. Has neither properties nor children.
	Text(String),
	Element(Element),
}

/// An element of the virtual tree, identified by its `tag`.
///
/// `children` are correlated with the previous render purely by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
	pub tag: String,
	pub props: Props,
	pub children: Vec<VirtualNode>,
}

/// A property value, assigned directly onto a live node.
///
/// Primitives compare by value. [`Callback`]s compare by reference, never by behaviour.
#[derive(Clone)]
pub enum PropValue {
	String(String),
	Number(f64),
	Boolean(bool),
	Callback(Callback),
}

/// A shared event handler.
///
/// Two [`Callback`]s are equal only if they were cloned from the same [`Callback::new`] call.
#[derive(Clone)]
pub struct Callback(Rc<dyn Fn(&Event)>);

/// What a live event handler receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
	/// The event type, like `"click"` or `"input"`.
	pub name: String,
	/// The current value of the event target, if it has one (for example a text input).
	pub value: Option<String>,
}

impl Event {
	#[must_use]
	pub fn new(name: impl Into<String>) -> Self {
		Self { name: name.into(), value: None }
	}

	#[must_use]
	pub fn with_value(mut self, value: impl Into<String>) -> Self {
		self.value = Some(value.into());
		self
	}
}

impl Callback {
	pub fn new(handler: impl Fn(&Event) + 'static) -> Self {
		Self(Rc::new(handler))
	}

	pub fn call(&self, event: &Event) {
		(self.0)(event)
	}

	#[must_use]
	pub fn ptr_eq(&self, other: &Self) -> bool {
		self.as_ptr() == other.as_ptr()
	}

	fn as_ptr(&self) -> *const () {
		Rc::as_ptr(&self.0).cast::<()>()
	}
}

impl PartialEq for Callback {
	fn eq(&self, other: &Self) -> bool {
		self.ptr_eq(other)
	}
}
impl Eq for Callback {}
impl Hash for Callback {
	fn hash<H: Hasher>(&self, state: &mut H) {
		self.as_ptr().hash(state)
	}
}
impl Debug for Callback {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Callback").field(&self.as_ptr()).finish()
	}
}

impl PartialEq for PropValue {
	#[allow(clippy::float_cmp)]
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::String(a), Self::String(b)) => a == b,
			(Self::Number(a), Self::Number(b)) => a == b,
			(Self::Boolean(a), Self::Boolean(b)) => a == b,
			(Self::Callback(a), Self::Callback(b)) => a.ptr_eq(b),
			_ => false,
		}
	}
}

impl Debug for PropValue {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Self::String(string) => Debug::fmt(string, f),
			Self::Number(number) => Debug::fmt(number, f),
			Self::Boolean(boolean) => Debug::fmt(boolean, f),
			Self::Callback(callback) => Debug::fmt(callback, f),
		}
	}
}

impl From<&str> for PropValue {
	fn from(value: &str) -> Self {
		Self::String(value.to_owned())
	}
}
impl From<String> for PropValue {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}
impl From<f64> for PropValue {
	fn from(value: f64) -> Self {
		Self::Number(value)
	}
}
impl From<i32> for PropValue {
	fn from(value: i32) -> Self {
		Self::Number(value.into())
	}
}
impl From<bool> for PropValue {
	fn from(value: bool) -> Self {
		Self::Boolean(value)
	}
}
impl From<Callback> for PropValue {
	fn from(value: Callback) -> Self {
		Self::Callback(value)
	}
}

impl VirtualNode {
	/// The element tag, or [`None`] for text.
	#[must_use]
	pub fn tag(&self) -> Option<&str> {
		match self {
			Self::Text(_) => None,
			Self::Element(element) => Some(&element.tag),
		}
	}

	/// Child nodes. Text is treated as childless.
	#[must_use]
	pub fn children(&self) -> &[Self] {
		match self {
			Self::Text(_) => &[],
			Self::Element(element) => &element.children,
		}
	}

	#[must_use]
	pub fn is_text(&self) -> bool {
		matches!(self, Self::Text(_))
	}

	/// Every [`Callback`] in this subtree, once per occurrence.
	pub fn callbacks(&self) -> impl Iterator<Item = &Callback> + '_ {
		let mut pending = vec![self];
		let mut props: Vec<&Callback> = Vec::new();
		core::iter::from_fn(move || loop {
			if let Some(callback) = props.pop() {
				return Some(callback);
			}
			match pending.pop()? {
				Self::Text(_) => (),
				Self::Element(element) => {
					props.extend(element.props.values().filter_map(|value| match value {
						PropValue::Callback(callback) => Some(callback),
						_ => None,
					}));
					pending.extend(element.children.iter().rev());
				}
			}
		})
	}
}

impl Element {
	#[must_use]
	pub fn new(tag: impl Into<String>) -> Self {
		Self {
			tag: tag.into(),
			props: Props::new(),
			children: Vec::new(),
		}
	}

	#[must_use]
	pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
		self.props.insert(name.into(), value.into());
		self
	}

	#[must_use]
	pub fn child(mut self, child: impl Into<VirtualNode>) -> Self {
		self.children.push(child.into());
		self
	}

	#[must_use]
	pub fn children<I>(mut self, children: I) -> Self
	where
		I: IntoIterator,
		I::Item: Into<VirtualNode>,
	{
		self.children.extend(children.into_iter().map(Into::into));
		self
	}
}

impl From<Element> for VirtualNode {
	fn from(element: Element) -> Self {
		Self::Element(element)
	}
}
impl From<&str> for VirtualNode {
	fn from(text: &str) -> Self {
		Self::Text(text.to_owned())
	}
}
impl From<String> for VirtualNode {
	fn from(text: String) -> Self {
		Self::Text(text)
	}
}

/// Shorthand for [`Element::new`].
#[must_use]
pub fn element(tag: impl Into<String>) -> Element {
	Element::new(tag)
}

/// Shorthand for [`VirtualNode::Text`].
#[must_use]
pub fn text(text: impl Into<String>) -> VirtualNode {
	VirtualNode::Text(text.into())
}

/// Shallow node equality.
///
/// Elements are equal if their tags match and their property sets are identical per [`PropValue`]'s equality.
/// Children are not compared. Text nodes are equal if their strings are.
#[must_use]
pub fn equals(a: &VirtualNode, b: &VirtualNode) -> bool {
	match (a, b) {
		(VirtualNode::Text(a), VirtualNode::Text(b)) => a == b,
		(VirtualNode::Element(a), VirtualNode::Element(b)) => a.tag == b.tag && a.props.len() == b.props.len() && a.props.iter().all(|(name, value)| b.props.get(name) == Some(value)),
		_ => false,
	}
}
