use std::env;

use sitebench_core::Config as CoreConfig;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub core: CoreConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4173),
            core: CoreConfig::from_env(),
        }
    }
}
