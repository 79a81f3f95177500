//! Environment overrides applied by the default engine constructor.
//!
//! Kept in its own test binary: it mutates process environment variables.

use fluree_db_generate::options::{ENV_DEBUG_TEMPLATE, ENV_INDENT_UNIT};
use fluree_db_generate::{GenerateEngine, GenerateOptions};

#[test]
fn default_engine_applies_env_overrides() {
    std::env::set_var(ENV_DEBUG_TEMPLATE, "1");
    std::env::set_var(ENV_INDENT_UNIT, "3");

    let engine = GenerateEngine::with_default_fetchers(GenerateOptions::default(), None).unwrap();
    assert!(engine.options().debug_template);
    assert_eq!(engine.options().indent_unit, 3);
    assert_eq!(engine.options().json_accept, "application/json");

    std::env::remove_var(ENV_DEBUG_TEMPLATE);
    std::env::remove_var(ENV_INDENT_UNIT);
}
