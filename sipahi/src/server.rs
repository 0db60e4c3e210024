//! The server facade.
//!
//! A [`Server`] collects services, method bindings and hooks during setup.
//! [`Server::listen`] freezes them into one shared pipeline, hands a method
//! table per service to the [`Transport`], and binds. After that the setup is
//! read-only: every registration call fails with
//! [`ServerError::AlreadyListening`].

use crate::{
    config::{ListenOptions, ServerConfig},
    error::ServerError,
};
use serde::{Serialize, de::DeserializeOwned};
use sipahi_core::{
    BoxError, CallContext, ErrorHook, Handler, Logger, Phase, RequestHook, ResponseHook,
    TypedHandler,
};
use sipahi_std::{
    BoundAddress, HookRegistryBuilder, MethodBindings, MethodTable, Pipeline, PhaseHook,
    ServiceDescriptor, Transport,
};
use std::{fmt, sync::Arc};

#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Configuring,
    Listening(BoundAddress),
    Closed,
}

/// An RPC server running every bound method through the shared hook pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let mut server = Server::new(transport, ServerConfig::default())?;
/// server
///     .add_service(ServiceDescriptor::new("Greeter").with_method("SayHello"))?
///     .bind_typed("SayHello", say_hello)?
///     .on_request(auth)?
///     .on_error(LoggingHook::named("greeter"))?;
///
/// let address = server.listen(ListenOptions::new(50051)).await?;
/// ```
pub struct Server<T: Transport> {
    transport: T,
    config: ServerConfig,
    logger: Logger,
    services: Vec<ServiceDescriptor>,
    bindings: MethodBindings,
    hooks: HookRegistryBuilder,
    state: State,
}

impl<T: Transport> Server<T> {
    /// Create a server over `transport`, building its logger from `config`.
    pub fn new(transport: T, config: ServerConfig) -> Result<Self, ServerError> {
        let logger = config.logger.build()?;
        Ok(Self::with_logger(transport, config, logger))
    }

    /// Create a server with an already configured logger.
    pub fn with_logger(transport: T, config: ServerConfig, logger: Logger) -> Self {
        Self {
            transport,
            config,
            logger,
            services: Vec::new(),
            bindings: MethodBindings::new(),
            hooks: HookRegistryBuilder::new(),
            state: State::Configuring,
        }
    }

    /// The logger handed to every hook and handler.
    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether the server is bound and serving.
    pub fn is_listening(&self) -> bool {
        matches!(self.state, State::Listening(_))
    }

    /// The bound address while listening.
    pub fn local_address(&self) -> Option<&BoundAddress> {
        match &self.state {
            State::Listening(address) => Some(address),
            _ => None,
        }
    }

    /// Expose a service. Its methods are served once bound to a handler.
    pub fn add_service(&mut self, service: ServiceDescriptor) -> Result<&mut Self, ServerError> {
        self.ensure_configuring()?;
        self.logger
            .debug(format_args!("service added: {}", service.name()));
        self.services.push(service);
        Ok(self)
    }

    /// Bind `handler` to `method`. A method can be bound only once.
    pub fn bind<H: Handler>(
        &mut self,
        method: impl Into<String>,
        handler: H,
    ) -> Result<&mut Self, ServerError> {
        self.ensure_configuring()?;
        self.bindings.insert(method, handler)?;
        Ok(self)
    }

    /// Bind a function taking a typed request to `method`.
    ///
    /// The request payload is decoded into `Req` before the call and the
    /// returned `Resp` is encoded back into a payload.
    pub fn bind_typed<F, Req, Resp, Fut>(
        &mut self,
        method: impl Into<String>,
        func: F,
    ) -> Result<&mut Self, ServerError>
    where
        F: Fn(Req, CallContext) -> Fut + Send + Sync + 'static,
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + 'static,
        Fut: Future<Output = Result<Resp, BoxError>> + Send + 'static,
    {
        self.bind(method, TypedHandler::new(func))
    }

    /// Register a hook under a phase.
    ///
    /// Fails with [`RegistryError::PhaseMismatch`](sipahi_core::RegistryError::PhaseMismatch)
    /// if the hook implements a different phase.
    pub fn add_hook(&mut self, phase: Phase, hook: PhaseHook) -> Result<&mut Self, ServerError> {
        self.ensure_configuring()?;
        self.hooks.register(phase, hook)?;
        Ok(self)
    }

    /// Append a pre-request hook.
    pub fn on_request<H: RequestHook>(&mut self, hook: H) -> Result<&mut Self, ServerError> {
        self.ensure_configuring()?;
        self.hooks.on_request_mut(hook);
        Ok(self)
    }

    /// Append a post-response hook.
    pub fn on_response<H: ResponseHook>(&mut self, hook: H) -> Result<&mut Self, ServerError> {
        self.ensure_configuring()?;
        self.hooks.on_response_mut(hook);
        Ok(self)
    }

    /// Append a post-error hook.
    pub fn on_error<H: ErrorHook>(&mut self, hook: H) -> Result<&mut Self, ServerError> {
        self.ensure_configuring()?;
        self.hooks.on_error_mut(hook);
        Ok(self)
    }

    /// Freeze the setup, register every service with the transport and bind.
    ///
    /// The host defaults to `0.0.0.0`; a port is required.
    pub async fn listen(&mut self, options: ListenOptions) -> Result<BoundAddress, ServerError> {
        self.ensure_configuring()?;
        let (host, port) = options.resolve()?;

        let pipeline = Pipeline::new(Arc::new(self.hooks.clone().build()), self.logger.clone());
        for service in &self.services {
            for method in service.methods() {
                if !self.bindings.contains(method) {
                    self.logger.warn(format_args!(
                        "{}/{method} has no handler and will be rejected",
                        service.name()
                    ));
                }
            }
        }
        for method in self.bindings.methods() {
            if !self.exposes(method) {
                self.logger
                    .warn(format_args!("{method} is bound but no service exposes it"));
            }
        }

        let mut registered = Vec::with_capacity(self.services.len());
        let address = match self
            .start(&pipeline, &host, port, &mut registered)
            .await
        {
            Ok(address) => address,
            Err(err) => {
                self.rollback(&registered);
                return Err(ServerError::Transport(err));
            }
        };

        self.logger.info(format_args!(
            "listening on {address} ({} hooks, {} methods)",
            pipeline.hooks().len(),
            self.bindings.len()
        ));
        self.state = State::Listening(address.clone());
        Ok(address)
    }

    /// Shut the transport down. The server cannot be reused afterwards.
    pub async fn close(&mut self) -> Result<(), ServerError> {
        match self.state {
            State::Listening(_) => {}
            State::Closed => return Err(ServerError::Closed),
            State::Configuring => return Err(ServerError::NotListening),
        }
        self.transport
            .shutdown()
            .await
            .map_err(ServerError::Transport)?;
        self.state = State::Closed;
        self.logger.info("server closed");
        Ok(())
    }

    async fn start(
        &mut self,
        pipeline: &Pipeline,
        host: &str,
        port: u16,
        registered: &mut Vec<String>,
    ) -> Result<BoundAddress, BoxError> {
        for service in &self.services {
            let table = MethodTable::build(service, &self.bindings, pipeline);
            self.transport.add_service(service, table)?;
            registered.push(service.name().to_string());
        }
        self.transport
            .bind(host, port, self.config.transport_options())
            .await
    }

    // Withdraw services added by a failed `listen` so a retry starts clean.
    fn rollback(&mut self, registered: &[String]) {
        for name in registered.iter().rev() {
            if let Err(err) = self.transport.remove_service(name) {
                self.logger
                    .warn(format_args!("failed to withdraw service {name}: {err}"));
            }
        }
    }

    fn exposes(&self, method: &str) -> bool {
        self.services
            .iter()
            .any(|service| service.methods().iter().any(|m| m == method))
    }

    fn ensure_configuring(&self) -> Result<(), ServerError> {
        match self.state {
            State::Configuring => Ok(()),
            State::Listening(_) => Err(ServerError::AlreadyListening),
            State::Closed => Err(ServerError::Closed),
        }
    }
}

impl<T: Transport> fmt::Debug for Server<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("services", &self.services)
            .field("bindings", &self.bindings)
            .field("hooks", &self.hooks.len())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
