//! A minimal application shell: state, a component function and the render loop tying them to a [`Differ`].

use crate::{
	diff::{Differ, Report},
	host::{Host, Inspect},
	load::load_node,
	memory::{MemoryHost, NodeId},
	node::{Event, VirtualNode},
};
use std::{
	cell::RefCell,
	rc::{Rc, Weak},
};
use thiserror::Error;
use tracing::{instrument, trace};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AppError {
	/// State was updated or read mutably while a render was in progress, for example from inside a component function.
	#[error("the application is already rendering")]
	Reentrant,
	#[error("the application was dropped")]
	Dropped,
}

/// Produces the virtual tree for a state. Must not have side effects other than creating callbacks.
type Component<S> = dyn Fn(&S, &Updater<S>) -> VirtualNode;

/// Owns the application state, the live root and the tree retained from the previous render.
///
/// Every state update synchronously re-invokes the component, reconciles the retained tree against the new one at index 0
/// of the root, and then retains the new tree. There is no batching or scheduling.
pub struct App<S, H: Host> {
	shell: Rc<RefCell<Shell<S, H>>>,
	updater: Updater<S>,
	root: H::Node,
}

struct Shell<S, H: Host> {
	state: S,
	component: Box<Component<S>>,
	retained: Option<VirtualNode>,
	host: H,
	root: H::Node,
	differ: Differ,
	updater: Updater<S>,
}

trait Transition<S> {
	fn transition(&mut self, change: Box<dyn FnOnce(&S) -> S + '_>) -> Report;
}

/// Handle for replacing an [`App`]'s state. Cheap to clone into callbacks.
///
/// The new state is always derived from the state current at the time of the call, never from a captured copy.
pub struct Updater<S> {
	shell: Weak<RefCell<dyn Transition<S>>>,
}
impl<S> Clone for Updater<S> {
	fn clone(&self) -> Self {
		Self { shell: self.shell.clone() }
	}
}

impl<S> Updater<S> {
	/// Replaces the state wholesale and re-renders.
	///
	/// # Errors
	///
	/// [`AppError::Reentrant`] if called during a render, [`AppError::Dropped`] if the [`App`] no longer exists.
	pub fn set(&self, state: S) -> Result<Report, AppError> {
		self.update(move |_| state)
	}

	/// Derives the next state from the current one and re-renders.
	///
	/// # Errors
	///
	/// See [`Updater::set`].
	pub fn update(&self, change: impl FnOnce(&S) -> S) -> Result<Report, AppError> {
		let shell = self.shell.upgrade().ok_or(AppError::Dropped)?;
		let mut shell = shell.try_borrow_mut().map_err(|_| AppError::Reentrant)?;
		Ok(shell.transition(Box::new(change)))
	}
}

impl<S, H: Host> Transition<S> for Shell<S, H> {
	fn transition(&mut self, change: Box<dyn FnOnce(&S) -> S + '_>) -> Report {
		self.state = change(&self.state);
		self.render()
	}
}

impl<S, H: Host> Shell<S, H> {
	fn render(&mut self) -> Report {
		let next = (self.component)(&self.state, &self.updater);
		let report = self.differ.reconcile(&mut self.host, self.retained.as_ref(), Some(&next), &self.root, 0);
		self.retained = Some(next);
		report
	}
}

impl<S: 'static, H: Host + 'static> App<S, H> {
	/// Creates an application mounted below `root`. Nothing is rendered until [`App::render`].
	pub fn new(host: H, root: H::Node, state: S, component: impl Fn(&S, &Updater<S>) -> VirtualNode + 'static) -> Self {
		Self::with_differ(host, root, state, Differ::new(), component)
	}

	pub fn with_differ(host: H, root: H::Node, state: S, differ: Differ, component: impl Fn(&S, &Updater<S>) -> VirtualNode + 'static) -> Self {
		let shell = Rc::new_cyclic(|shell: &Weak<RefCell<Shell<S, H>>>| {
			let shell: Weak<RefCell<dyn Transition<S>>> = shell.clone();
			RefCell::new(Shell {
				state,
				component: Box::new(component),
				retained: None,
				host,
				root: root.clone(),
				differ,
				updater: Updater { shell },
			})
		});
		let updater = shell.borrow().updater.clone();
		Self { shell, updater, root }
	}
}

impl<S, H: Host> App<S, H> {
	/// Renders the current state. The first call mounts the application.
	///
	/// # Errors
	///
	/// [`AppError::Reentrant`] if called during a render.
	#[instrument(skip(self))]
	pub fn render(&self) -> Result<Report, AppError> {
		let mut shell = self.shell.try_borrow_mut().map_err(|_| AppError::Reentrant)?;
		Ok(shell.render())
	}

	/// Removes the rendered tree from the root and forgets it. The state is kept.
	///
	/// # Errors
	///
	/// [`AppError::Reentrant`] if called during a render.
	#[instrument(skip(self))]
	pub fn unmount(&self) -> Result<Report, AppError> {
		let mut shell = self.shell.try_borrow_mut().map_err(|_| AppError::Reentrant)?;
		let shell = &mut *shell;
		let previous = shell.retained.take();
		Ok(shell.differ.reconcile(&mut shell.host, previous.as_ref(), None, &shell.root, 0))
	}

	#[must_use]
	pub fn updater(&self) -> Updater<S> {
		self.updater.clone()
	}

	/// Reads the current state.
	///
	/// # Errors
	///
	/// [`AppError::Reentrant`] if called during a render.
	pub fn state<R>(&self, read: impl FnOnce(&S) -> R) -> Result<R, AppError> {
		let shell = self.shell.try_borrow().map_err(|_| AppError::Reentrant)?;
		Ok(read(&shell.state))
	}

	/// Reads the host.
	///
	/// # Errors
	///
	/// [`AppError::Reentrant`] if called during a render.
	pub fn host<R>(&self, read: impl FnOnce(&H) -> R) -> Result<R, AppError> {
		let shell = self.shell.try_borrow().map_err(|_| AppError::Reentrant)?;
		Ok(read(&shell.host))
	}

	/// The tree produced by the most recent render.
	///
	/// # Errors
	///
	/// [`AppError::Reentrant`] if called during a render.
	pub fn retained(&self) -> Result<Option<VirtualNode>, AppError> {
		let shell = self.shell.try_borrow().map_err(|_| AppError::Reentrant)?;
		Ok(shell.retained.clone())
	}

	#[must_use]
	pub fn root(&self) -> &H::Node {
		&self.root
	}
}

impl<S, H: Inspect> App<S, H> {
	/// Adopts the live content at index 0 of the root as the retained tree, so that the next render patches it
	/// instead of appending a second copy.
	///
	/// # Errors
	///
	/// [`AppError::Reentrant`] if called during a render.
	#[instrument(skip(self))]
	pub fn hydrate(&self) -> Result<(), AppError> {
		let mut shell = self.shell.try_borrow_mut().map_err(|_| AppError::Reentrant)?;
		let shell = &mut *shell;
		shell.retained = shell.host.child_at(&shell.root, 0).and_then(|live| load_node(&shell.host, &live));
		trace!(hydrated = shell.retained.is_some());
		Ok(())
	}
}

impl<S> App<S, MemoryHost> {
	/// Fires `event` at `node`'s handler, if it has one. The handler may update the application.
	///
	/// # Errors
	///
	/// [`AppError::Reentrant`] if called during a render.
	pub fn dispatch(&self, node: NodeId, event: &Event) -> Result<bool, AppError> {
		let handler = self.host(|host| host.handler(node, &event.name))?;
		Ok(match handler {
			Some(handler) => {
				handler.call(event);
				true
			}
			None => false,
		})
	}
}
