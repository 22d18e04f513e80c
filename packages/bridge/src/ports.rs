//! Named port handlers reachable from the controller.

use std::collections::{btree_map::Entry, BTreeMap};

use crate::{
    context::BridgeContext, controller::PortDispatch, error::BridgeError, keeper::Keeper,
};

/// A handler for requests sent by the controller to one named port.
pub trait PortHandler<K: Keeper> {
    /// Handle one textual request and produce a textual response.
    ///
    /// # Errors
    /// Returns an error if the request is malformed or cannot be carried out.
    fn receive(&self, ctx: &mut BridgeContext<'_, K>, request: &str) -> Result<String, BridgeError>;
}

/// Registry of port handlers, keyed by port name.
pub struct PortRouter<K: Keeper> {
    handlers: BTreeMap<String, Box<dyn PortHandler<K>>>,
}

impl<K: Keeper> PortRouter<K> {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// A registry serving a single port.
    pub(crate) fn with_port<H>(name: impl Into<String>, handler: H) -> Self
    where
        H: PortHandler<K> + 'static,
    {
        let mut handlers: BTreeMap<String, Box<dyn PortHandler<K>>> = BTreeMap::new();
        handlers.insert(name.into(), Box::new(handler));
        Self { handlers }
    }

    /// Register `handler` under `name`.
    ///
    /// # Errors
    /// Returns [`BridgeError::PortAlreadyRegistered`] if `name` is taken.
    pub fn register<H>(&mut self, name: impl Into<String>, handler: H) -> Result<(), BridgeError>
    where
        H: PortHandler<K> + 'static,
    {
        match self.handlers.entry(name.into()) {
            Entry::Occupied(entry) => Err(BridgeError::PortAlreadyRegistered(entry.key().clone())),
            Entry::Vacant(entry) => {
                tracing::debug!(port = %entry.key(), "registered port handler");
                entry.insert(Box::new(handler));
                Ok(())
            }
        }
    }

    /// Whether a handler is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Names of all registered ports.
    pub fn ports(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Deliver `request` to the handler registered under `port`.
    ///
    /// # Errors
    /// Returns [`BridgeError::UnknownPort`] if nothing is registered under
    /// `port`, otherwise whatever the handler returns.
    pub fn dispatch(
        &self,
        ctx: &mut BridgeContext<'_, K>,
        port: &str,
        request: &str,
    ) -> Result<String, BridgeError> {
        let handler = self
            .handlers
            .get(port)
            .ok_or_else(|| BridgeError::UnknownPort(port.to_string()))?;
        tracing::debug!(port, "dispatching port request");
        handler.receive(ctx, request)
    }
}

impl<K: Keeper> Default for PortRouter<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Keeper> core::fmt::Debug for PortRouter<K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PortRouter")
            .field("ports", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A [`PortRouter`] bound to a live [`BridgeContext`].
///
/// This is what the controller receives as its re-entry handle.
pub struct PortCaller<'r, 'c, 'a, K: Keeper> {
    router: &'r PortRouter<K>,
    ctx: &'c mut BridgeContext<'a, K>,
}

impl<'r, 'c, 'a, K: Keeper> PortCaller<'r, 'c, 'a, K> {
    /// Bind `router` to `ctx`.
    pub fn new(router: &'r PortRouter<K>, ctx: &'c mut BridgeContext<'a, K>) -> Self {
        Self { router, ctx }
    }
}

impl<K: Keeper> PortDispatch for PortCaller<'_, '_, '_, K> {
    fn call_port(&mut self, port: &str, request: &str) -> Result<String, BridgeError> {
        self.router.dispatch(self.ctx, port, request)
    }
}
