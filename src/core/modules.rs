// src/core/modules.rs

use crate::constants::{GET_MODULE, IMPORT_MODULE, INSTALL_MODULE, INSTALL_SCOPE, SELECT_OBJECT};
use crate::core::session::Session;
use crate::error::{Error, Result};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

/// Installs and imports modules through the shared session, one module at a time.
///
/// Every operation clears the session's pipeline before staging its own command, so
/// nothing staged elsewhere survives a call here.
#[derive(Debug)]
pub struct ModuleManager {
    session: Rc<RefCell<Session>>,
}

impl ModuleManager {
    /// A manager over the given shared session.
    pub fn new(session: Rc<RefCell<Session>>) -> Self {
        Self { session }
    }

    /// Imports each module in order. The first failure stops the sequence.
    ///
    /// `-ErrorAction Stop` turns a missing or broken module into a terminating error,
    /// which surfaces as `Error::Engine`.
    pub fn import<S: AsRef<str>>(&self, modules: &[S]) -> Result<()> {
        let mut session = self.session.borrow_mut();
        for module in modules {
            let module = module.as_ref();
            session.clear();
            session
                .add_command(IMPORT_MODULE)
                .argument(module)
                .parameter("ErrorAction", "Stop");
            session.invoke()?;
            log::debug!("Imported module: {}", module);
        }
        Ok(())
    }

    /// Installs each module in order for the current user, overwriting clashing commands.
    /// Stops at the first module whose install reports errors.
    pub fn install<S: AsRef<str>>(&self, modules: &[S]) -> Result<()> {
        log::info!("Starting installation of PowerShell modules.");
        let mut session = self.session.borrow_mut();

        for module in modules {
            let module = module.as_ref();
            session.clear();
            session
                .add_command(INSTALL_MODULE)
                .parameter("Name", module)
                .parameter("AllowClobber", true)
                .parameter("Scope", INSTALL_SCOPE);
            session.invoke()?;

            if session.had_errors() {
                return Err(Error::ModuleInstall {
                    module: module.to_string(),
                    errors: session.errors().to_vec(),
                });
            }

            log::info!("Successfully installed module: {}", module);
        }
        Ok(())
    }

    /// True iff `Get-Module -ListAvailable` finds at least one module by that name.
    pub fn is_installed(&self, module: &str) -> Result<bool> {
        let mut session = self.session.borrow_mut();
        session.clear();
        session
            .add_command(GET_MODULE)
            .parameter("Name", module)
            .parameter("ListAvailable", true);
        session
            .add_command(SELECT_OBJECT)
            .parameter("Property", json!(["Name", "Version"]));
        Ok(!session.invoke()?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pool::{PoolBounds, PoolHolder};
    use crate::core::testing::{FakeFactory, failed, name_param, records};
    use crate::system::engine::EngineError;
    use std::sync::Arc;

    fn manager(factory: &FakeFactory) -> (PoolHolder, ModuleManager) {
        let holder = PoolHolder::new(Arc::new(factory.clone()), PoolBounds::new(1, 5).unwrap());
        let runspace = holder.pool().unwrap().acquire().unwrap();
        let session = Rc::new(RefCell::new(Session::new(runspace)));
        (holder, ModuleManager::new(session))
    }

    #[test]
    fn test_install_uses_fixed_options() {
        let factory = FakeFactory::new();
        let (_holder, manager) = manager(&factory);
        manager.install(&["Pester"]).unwrap();

        let invocations = factory.invocations();
        assert_eq!(invocations.len(), 1);
        let install = &invocations[0][0];
        assert_eq!(install.name, "Install-Module");
        assert_eq!(install.get_parameter("Name"), Some(&json!("Pester")));
        assert_eq!(install.get_parameter("AllowClobber"), Some(&json!(true)));
        assert_eq!(install.get_parameter("Scope"), Some(&json!("CurrentUser")));
    }

    #[test]
    fn test_install_stops_at_first_failing_module() {
        let factory = FakeFactory::with_responder(|pipeline| {
            if name_param(pipeline).as_deref() == Some("B") {
                Ok(failed("No match was found for the specified search criteria"))
            } else {
                Ok(Default::default())
            }
        });
        let (_holder, manager) = manager(&factory);

        let err = manager.install(&["A", "B", "C"]).unwrap_err();
        match err {
            Error::ModuleInstall { module, errors } => {
                assert_eq!(module, "B");
                assert_eq!(errors.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }

        let installed: Vec<String> = factory
            .invocations()
            .iter()
            .filter_map(|p| name_param(p))
            .collect();
        assert_eq!(installed, vec!["A", "B"]);
    }

    #[test]
    fn test_import_is_ordered_and_fail_fast() {
        let factory = FakeFactory::with_responder(|pipeline| {
            if pipeline[0].arguments.first() == Some(&json!("Missing")) {
                return Err(EngineError::Invocation(
                    "The specified module 'Missing' was not loaded".to_string(),
                ));
            }
            Ok(Default::default())
        });
        let (_holder, manager) = manager(&factory);

        manager.import(&["PSReadLine", "Pester"]).unwrap();
        let err = manager
            .import(&["Az".to_string(), "Missing".to_string(), "Never".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::Engine(EngineError::Invocation(_))));

        let imported: Vec<_> = factory
            .invocations()
            .iter()
            .map(|p| {
                assert_eq!(p[0].name, "Import-Module");
                assert_eq!(p[0].get_parameter("ErrorAction"), Some(&json!("Stop")));
                p[0].arguments[0].clone()
            })
            .collect();
        assert_eq!(
            imported,
            vec![json!("PSReadLine"), json!("Pester"), json!("Az"), json!("Missing")]
        );
    }

    #[test]
    fn test_is_installed_depends_on_record_count() {
        let factory = FakeFactory::with_responder(|pipeline| {
            match name_param(pipeline).as_deref() {
                Some("Pester") => Ok(records(vec![json!({"Name": "Pester"})])),
                Some("Az") => Ok(records(vec![
                    json!({"Name": "Az", "Version": "11.0.0"}),
                    json!({"Name": "Az", "Version": "12.0.0"}),
                ])),
                _ => Ok(Default::default()),
            }
        });
        let (_holder, manager) = manager(&factory);

        assert!(manager.is_installed("Pester").unwrap());
        assert!(manager.is_installed("Az").unwrap());
        assert!(!manager.is_installed("NotThere").unwrap());

        let invocations = factory.invocations();
        let query = &invocations[0][0];
        assert_eq!(query.name, "Get-Module");
        assert_eq!(query.get_parameter("ListAvailable"), Some(&json!(true)));
    }

    #[test]
    fn test_empty_module_list_does_nothing() {
        let factory = FakeFactory::new();
        let (_holder, manager) = manager(&factory);
        manager.install::<&str>(&[]).unwrap();
        manager.import::<&str>(&[]).unwrap();
        assert!(factory.invocations().is_empty());
    }
}
