// src/core/environment.rs

use crate::core::cmdlet::Cmdlet;
use crate::core::modules::ModuleManager;
use crate::core::pool::{PoolBounds, PoolHolder};
use crate::core::session::Session;
use crate::error::{Error, Result};
use crate::models::EngineConfig;
use crate::system::engine::HostFactory;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// The entry point: a pooled PowerShell host with one shared session on top.
///
/// One environment serves one caller at a time. The session is shared through
/// `Rc<RefCell<_>>`, so an environment and its cmdlets stay on the thread that created
/// them. For parallel work, create one environment per thread over a shared
/// [`PoolHolder`] with [`Environment::with_pool`]; each leases its own host.
///
/// If the host dies during a call, that call fails with the engine error and the host
/// is discarded from the pool. Modules imported into it are gone, so the environment
/// does not quietly lease a replacement: every later operation fails with
/// [`Error::HostLost`]. Close it and open a new environment; over a shared pool the
/// new one gets a freshly spawned host.
#[derive(Debug)]
pub struct Environment {
    pools: Arc<PoolHolder>,
    owns_pool: bool,
    session: Rc<RefCell<Session>>,
    modules: ModuleManager,
    closed: bool,
}

impl Environment {
    /// Starts an environment from `config.toml` settings, spawning real PowerShell hosts.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let factory = config.host_factory()?;
        let bounds = config.bounds()?;
        Self::with_factory(Arc::new(factory), bounds)
    }

    /// Starts an environment over any host factory. The environment owns the pool.
    pub fn with_factory(factory: Arc<dyn HostFactory>, bounds: PoolBounds) -> Result<Self> {
        let pools = Arc::new(PoolHolder::new(factory, bounds));
        Self::build(pools, true)
    }

    /// Starts an environment that leases its host from a pool owned elsewhere.
    /// Closing it returns the host but leaves the pool open.
    pub fn with_pool(pools: Arc<PoolHolder>) -> Result<Self> {
        Self::build(pools, false)
    }

    fn build(pools: Arc<PoolHolder>, owns_pool: bool) -> Result<Self> {
        let runspace = pools.pool()?.acquire()?;
        let session = Rc::new(RefCell::new(Session::new(runspace)));
        let modules = ModuleManager::new(Rc::clone(&session));
        Ok(Self {
            pools,
            owns_pool,
            session,
            modules,
            closed: false,
        })
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    /// Installs modules in order; see [`ModuleManager::install`].
    pub fn install_module<S: AsRef<str>>(&self, modules: &[S]) -> Result<()> {
        self.ensure_open()?;
        self.modules.install(modules)
    }

    /// Imports modules in order; see [`ModuleManager::import`].
    pub fn import_module<S: AsRef<str>>(&self, modules: &[S]) -> Result<()> {
        self.ensure_open()?;
        self.modules.import(modules)
    }

    /// Whether any version of the module is available; see [`ModuleManager::is_installed`].
    pub fn is_module_installed(&self, module: &str) -> Result<bool> {
        self.ensure_open()?;
        self.modules.is_installed(module)
    }

    /// A fresh cmdlet builder bound to the shared session.
    pub fn cmdlet(&self) -> Cmdlet {
        Cmdlet::new(Rc::clone(&self.session))
    }

    /// True once [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Releases the session's host, then disposes the pool if this environment owns it.
    ///
    /// Closing twice fails with [`Error::Disposed`]. Cmdlets created earlier fail the same
    /// way once the environment is closed.
    pub fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        self.session.borrow_mut().close()?;
        if self.owns_pool {
            self.pools.dispose();
        }
        log::debug!("PowerShell environment closed.");
        Ok(())
    }
}

impl Drop for Environment {
    fn drop(&mut self) {
        if !self.closed
            && let Err(e) = self.close()
        {
            log::warn!("Failed to close PowerShell environment: {}", e);
        }
    }
}
