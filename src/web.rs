//! A [`Host`] for the browser DOM.
//!
//! Properties are assigned directly onto DOM objects (`node[name] = value`), like a plain script would.
//! Callback properties are wrapped in [***JavaScript***](https://developer.mozilla.org/en-US/docs/Web/JavaScript) functions
//! that are shared and reference-counted per [`Callback`], so assigning the same callback to many elements creates one closure.

use crate::{
	host::{Host, Inspect, LiveView},
	node::{Callback, Event, PropValue},
	rc_hash_map::RcHashMap,
};
use core::convert::TryFrom;
use js_sys::Reflect;
use tracing::{error, info, instrument, trace, warn};
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

/// Attached to a [`web_sys::Document`], this `struct` creates and patches its nodes.
///
/// # Correct Use
///
/// Event handlers stay valid only while the [`WebHost`] exists.
/// After it is dropped, handlers that are still attached to elements will throw into JavaScript when invoked.
#[derive(Debug)]
pub struct WebHost {
	document: web_sys::Document,
	handler_handles: RcHashMap<Callback, u16, Closure<dyn Fn(web_sys::Event)>>,
	/// Closures freed by the previous flush. Dropped one flush later, since the flush may run inside one of them.
	retired: Vec<Closure<dyn Fn(web_sys::Event)>>,
}

impl WebHost {
	#[must_use]
	#[instrument]
	pub fn new(document: web_sys::Document) -> Self {
		Self {
			document,
			handler_handles: RcHashMap::new(),
			retired: Vec::new(),
		}
	}

	/// Attaches to the current window's document, if there is one.
	#[must_use]
	pub fn from_window() -> Option<Self> {
		Some(Self::new(web_sys::window()?.document()?))
	}

	/// Looks up an element to mount an application into.
	#[must_use]
	pub fn element_by_id(&self, id: &str) -> Option<web_sys::Node> {
		self.document.get_element_by_id(id).map(Into::into)
	}

	#[must_use]
	pub fn document(&self) -> &web_sys::Document {
		&self.document
	}

	fn get_or_create_listener(&mut self, callback: &Callback) -> Result<&Closure<dyn Fn(web_sys::Event)>, JsValue> {
		self.handler_handles
			.increment_or_insert_with(callback.clone(), || {
				let callback = callback.clone();
				Closure::wrap(Box::new(move |event: web_sys::Event| {
					let span = tracing::trace_span!("common_handler", event = %event.type_());
					let _enter = span.enter();
					callback.call(&event_from_web(&event))
				}) as Box<dyn Fn(web_sys::Event)>)
			})
			.map(|closure| &*closure)
			.map_err(|_| JsValue::from_str("Too many (more than 65k) active references to the same `Callback`"))
	}
}

fn event_from_web(event: &web_sys::Event) -> Event {
	Event {
		name: event.type_(),
		value: event.target().and_then(|target| target.dyn_into::<web_sys::HtmlInputElement>().ok()).map(|input| input.value()),
	}
}

fn parent_of(node: &web_sys::Node) -> Result<web_sys::Node, JsValue> {
	node.parent_node().ok_or_else(|| JsValue::from_str("sapling-dom: Node has no parent."))
}

impl Host for WebHost {
	type Node = web_sys::Node;
	type Error = JsValue;

	fn create_element(&mut self, tag: &str) -> Result<Self::Node, Self::Error> {
		self.document.create_element(tag).map(Into::into)
	}

	fn create_text(&mut self, text: &str) -> Result<Self::Node, Self::Error> {
		Ok(self.document.create_text_node(text).into())
	}

	fn set_property(&mut self, node: &Self::Node, name: &str, value: Option<&PropValue>) -> Result<(), Self::Error> {
		let key = JsValue::from_str(name);
		let assigned = match value {
			None => Reflect::set(node, &key, &JsValue::UNDEFINED)?,
			Some(PropValue::String(string)) => Reflect::set(node, &key, &JsValue::from_str(string))?,
			Some(PropValue::Number(number)) => Reflect::set(node, &key, &JsValue::from_f64(*number))?,
			Some(PropValue::Boolean(boolean)) => Reflect::set(node, &key, &JsValue::from_bool(*boolean))?,
			Some(PropValue::Callback(callback)) => {
				let listener = self.get_or_create_listener(callback)?;
				match Reflect::set(node, &key, listener.as_ref()) {
					Ok(assigned) => assigned,
					Err(error) => {
						self.release_callback(callback);
						return Err(error);
					}
				}
			}
		};
		if !assigned {
			warn!("Property {:?} could not be assigned (read-only?).", name);
		}
		Ok(())
	}

	fn append_child(&mut self, parent: &Self::Node, child: &Self::Node) -> Result<(), Self::Error> {
		parent.append_child(child).map(drop)
	}

	fn remove_child(&mut self, node: &Self::Node) -> Result<(), Self::Error> {
		parent_of(node)?.remove_child(node).map(drop)
	}

	fn replace_child(&mut self, old: &Self::Node, new: &Self::Node) -> Result<(), Self::Error> {
		parent_of(old)?.replace_child(new, old).map(drop)
	}

	fn child_at(&self, parent: &Self::Node, index: usize) -> Option<Self::Node> {
		let index = match u32::try_from(index) {
			Ok(index) => index,
			Err(_) => return None,
		};
		parent.child_nodes().item(index)
	}

	fn release_callback(&mut self, callback: &Callback) {
		match self.handler_handles.weak_decrement(callback) {
			Ok(Some(_)) => (),
			Ok(None) => error!("Tried to release a callback that was never bound: {:?}", callback),
			Err(_) => error!("Tried to release a callback more often than it was bound: {:?}", callback),
		}
	}

	#[instrument(skip(self))]
	fn flush(&mut self) {
		self.retired.clear();
		self.retired.extend(self.handler_handles.drain_weak().map(|(_, closure)| closure));
		trace!("Retired {} event handler closure(s).", self.retired.len());
		info!("Event handler count/cached capacity: {}/{}", self.handler_handles.len(), self.handler_handles.capacity());
	}
}

impl Inspect for WebHost {
	fn inspect(&self, node: &Self::Node) -> Option<LiveView<Self::Node>> {
		if let Some(element) = node.dyn_ref::<web_sys::Element>() {
			let attributes = element.attributes();
			let properties = (0..attributes.length())
				.filter_map(|i| attributes.item(i))
				.map(|attribute| (attribute.local_name(), PropValue::String(attribute.value())))
				.collect();
			let child_nodes = node.child_nodes();
			let children = (0..child_nodes.length()).filter_map(|i| child_nodes.item(i)).collect();
			Some(LiveView::Element {
				tag: element.local_name(),
				properties,
				children,
			})
		} else if let Some(text) = node.dyn_ref::<web_sys::Text>() {
			Some(LiveView::Text(text.data()))
		} else {
			None
		}
	}
}
