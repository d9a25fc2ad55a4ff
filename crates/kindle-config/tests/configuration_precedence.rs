//! Behavioural tests for configuration layering.
//!
//! Scenarios mutate process environment variables, so every scenario holds
//! `ENV_LOCK` for its whole lifetime and restores what it touched on drop.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use once_cell::sync::Lazy;
use ortho_config::OrthoConfig;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use tempfile::TempDir;

use kindle_config::{
    Config, DiscoveryMode, IntegrityPolicy, default_evaluation_budget, default_log_filter,
    default_log_format,
};

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[derive(Default)]
struct Layers {
    file_lines: Vec<String>,
    flags: Vec<OsString>,
    restore: Vec<(String, Option<OsString>)>,
    resolved: Option<Result<Config, String>>,
}

struct World {
    dir: TempDir,
    layers: RefCell<Layers>,
    _env: MutexGuard<'static, ()>,
}

impl World {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temporary directory"),
            layers: RefCell::new(Layers::default()),
            _env: ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    fn argv(&self) -> Vec<OsString> {
        let layers = self.layers.borrow();
        let mut argv = vec![OsString::from("kindle")];
        if !layers.file_lines.is_empty() {
            let path = self.dir.path().join("kindle.toml");
            fs::write(&path, layers.file_lines.join("\n")).expect("config file written");
            argv.push(OsString::from("--config-path"));
            argv.push(path.into_os_string());
        }
        argv.extend(layers.flags.iter().cloned());
        argv
    }

    fn resolve(&self) {
        let outcome = Config::load_from_iter(self.argv()).map_err(|error| error.to_string());
        self.layers.borrow_mut().resolved = Some(outcome);
    }

    fn config(&self) -> Config {
        match self.layers.borrow().resolved.as_ref() {
            Some(Ok(config)) => config.clone(),
            Some(Err(error)) => panic!("configuration failed to resolve: {error}"),
            None => panic!("configuration was never resolved"),
        }
    }
}

impl Drop for World {
    fn drop(&mut self) {
        for (key, previous) in self.layers.get_mut().restore.drain(..).rev() {
            // Serialised by `ENV_LOCK`.
            match previous {
                Some(value) => unsafe { std::env::set_var(&key, value) },
                None => unsafe { std::env::remove_var(&key) },
            }
        }
    }
}

#[fixture]
fn world() -> World {
    World::new()
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

#[given("the file sets \"{key}\" to the text \"{value}\"")]
fn given_file_text(world: &World, key: String, value: String) {
    world
        .layers
        .borrow_mut()
        .file_lines
        .push(format!("{key} = \"{value}\""));
}

#[given("the file sets \"{key}\" to the number {value}")]
fn given_file_number(world: &World, key: String, value: u64) {
    world
        .layers
        .borrow_mut()
        .file_lines
        .push(format!("{key} = {value}"));
}

#[given("the variable \"{key}\" is \"{value}\"")]
fn given_variable(world: &World, key: String, value: String) {
    let previous = std::env::var_os(&key);
    // Serialised by `ENV_LOCK`.
    unsafe { std::env::set_var(&key, &value) };
    world.layers.borrow_mut().restore.push((key, previous));
}

#[given("the flag \"{flag}\" is \"{value}\"")]
fn given_flag(world: &World, flag: String, value: String) {
    let mut layers = world.layers.borrow_mut();
    layers.flags.push(OsString::from(flag));
    layers.flags.push(OsString::from(value));
}

#[when("the configuration is resolved")]
fn when_resolved(world: &World) {
    world.resolve();
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[then("every setting has its built-in value")]
fn then_built_in(world: &World) {
    let config = world.config();
    assert_eq!(config.log_filter(), default_log_filter());
    assert_eq!(config.log_format(), default_log_format());
    assert_eq!(config.evaluation_budget(), default_evaluation_budget());
    assert_eq!(config.discovery_mode(), DiscoveryMode::Shallow);
    assert_eq!(config.integrity(), IntegrityPolicy::Warn);
}

#[then("the evaluation budget is {millis} milliseconds")]
fn then_budget(world: &World, millis: u64) {
    assert_eq!(world.config().evaluation_budget(), Duration::from_millis(millis));
}

#[then("missing components are fatal")]
fn then_fatal(world: &World) {
    assert!(world.config().integrity().is_fatal());
}

#[then("the log filter is \"{filter}\"")]
fn then_log_filter(world: &World, filter: String) {
    assert_eq!(world.config().log_filter(), filter);
}

#[then("discovery is recursive")]
fn then_recursive(world: &World) {
    assert_eq!(world.config().discovery_mode(), DiscoveryMode::Recursive);
}

#[scenario(path = "tests/features/configuration_precedence.feature")]
fn configuration_precedence(#[from(world)] world: World) {
    let _ = world;
}
