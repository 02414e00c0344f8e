use crate::alerts::AlertRepository;
use crate::catalog::FieldCatalog;
use crate::config::{CompilerSettings, ValidatorConfig};
use crate::store::DataStore;
use crate::validation::ValidatorSettings;
use std::sync::Arc;

/// Shared state threaded into every handler. Cloned per request (all
/// fields are cheap `Arc`/`Copy` handles), mirroring the
/// `Extension(service)` pattern the `ui`-feature example pack uses.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DataStore>,
    pub alerts: Arc<dyn AlertRepository>,
    pub catalog: &'static FieldCatalog,
    pub validator_settings: ValidatorSettings,
    pub compiler_settings: CompilerSettings,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DataStore>,
        alerts: Arc<dyn AlertRepository>,
        catalog: &'static FieldCatalog,
        validator_config: &ValidatorConfig,
        compiler_settings: CompilerSettings,
    ) -> Self {
        Self {
            store,
            alerts,
            catalog,
            validator_settings: ValidatorSettings::from(validator_config),
            compiler_settings,
        }
    }
}
