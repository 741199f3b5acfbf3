#![doc(html_root_url = "https://docs.rs/sapling-dom/0.1.0")]
#![warn(clippy::pedantic)]
//! A minimal positional VDOM reconciler.
//!
//! Components describe the desired UI as an immutable [`VirtualNode`] tree.
//! A [`Differ`] compares that tree against the previous one and patches a live tree through a [`Host`],
//! reusing live nodes wherever the tag (or text) stayed the same.
//!
//! [`App`](app::App) ties this together with a state container that re-renders synchronously on every update.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

pub mod app;
pub mod create;
pub mod diff;
pub mod host;
pub mod load;
pub mod memory;
pub mod node;
pub mod props;
mod rc_hash_map;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use diff::{reconcile, Classification, Differ, Report};
pub use host::Host;
pub use node::{element, equals, text, Callback, Element, Event, PropValue, VirtualNode};
