//! Configuration for the screener (§6.5).
//!
//! A TOML config file with `${VAR}` environment-variable expansion,
//! mirroring the scheduler/compiler/validator/database sections a
//! deployment needs to tune.

mod settings;

pub use settings::{
    expand_env_vars, CompilerSettings, DatabaseSettings, SchedulerSettings, Settings,
    SettingsError, ValidatorConfig,
};
