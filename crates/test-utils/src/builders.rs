#![allow(dead_code)]

use initdag::config::{ConfigFile, RawConfigFile, RawTaskSettings};
use initdag::types::Wiring;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from fast delays so tests don't wait on the production latencies.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        let mut config = RawConfigFile::default();
        for (name, delay) in [("config", "40ms"), ("preferences", "20ms"), ("feature-flags", "10ms")] {
            config
                .task
                .insert(name.to_string(), TaskSettingsBuilder::new().delay(delay).build());
        }
        Self { config }
    }

    pub fn with_wiring(mut self, wiring: Wiring) -> Self {
        self.config.settings.wiring = wiring;
        self
    }

    pub fn with_task(mut self, name: &str, task: RawTaskSettings) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn with_api_url(mut self, url: &str) -> Self {
        self.config.settings.api_url = url.to_string();
        self
    }

    pub fn with_items_per_page(mut self, n: u64) -> Self {
        self.config.settings.items_per_page = n;
        self
    }

    pub fn with_default_timeout(mut self, timeout: &str) -> Self {
        self.config.settings.default_timeout = Some(timeout.to_string());
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `RawTaskSettings`.
pub struct TaskSettingsBuilder {
    task: RawTaskSettings,
}

impl TaskSettingsBuilder {
    pub fn new() -> Self {
        Self {
            task: RawTaskSettings::default(),
        }
    }

    pub fn delay(mut self, delay: &str) -> Self {
        self.task.delay = Some(delay.to_string());
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.task.timeout = Some(timeout.to_string());
        self
    }

    pub fn fail(mut self, val: bool) -> Self {
        self.task.fail = val;
        self
    }

    pub fn build(self) -> RawTaskSettings {
        self.task
    }
}

impl Default for TaskSettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
