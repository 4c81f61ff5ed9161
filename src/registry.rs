//! Controller and global-middleware registration.

use std::sync::Arc;

use crate::controller::Controller;
use crate::error::StartupError;
use crate::middleware::{order_and_attach, GlobalMiddleware};
use crate::route::RouteTable;
use crate::router::Router;

/// Everything the application wants served, collected by its composition
/// root and handed to [`Server::start`](crate::Server::start).
#[derive(Default)]
pub struct Registry {
    controllers: Vec<Controller>,
    global: Vec<Arc<dyn GlobalMiddleware>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_controller(&mut self, controller: Controller) -> &mut Self {
        self.controllers.push(controller);
        self
    }

    pub fn register_global_middleware(&mut self, middleware: impl GlobalMiddleware) -> &mut Self {
        self.global.push(Arc::new(middleware));
        self
    }

    pub fn controllers(&self) -> &[Controller] {
        &self.controllers
    }

    pub fn global_middleware(&self) -> &[Arc<dyn GlobalMiddleware>] {
        &self.global
    }

    /// Builds the router: global middleware in priority order first, then the
    /// route table of every controller under `context_path`.
    ///
    /// Assembling the same registry twice gives identical routers.
    pub fn assemble(&self, context_path: &str) -> Result<Router, StartupError> {
        let mut router = Router::new();
        order_and_attach(&self.global, &mut router);
        router.install(RouteTable::build(context_path, &self.controllers)?)?;
        Ok(router)
    }
}
