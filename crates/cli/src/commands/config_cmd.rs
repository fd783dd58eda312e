//! `skylark config` — Print the default configuration as TOML.

use skylark_config::AppConfig;

pub fn run() {
    println!("{}", AppConfig::default_toml());
}
