// Reserved configuration keys understood by flyrun itself. Everything else
// passes through to the migration engine verbatim.
pub const URL_KEY: &str = "url";
pub const USER_KEY: &str = "user";
pub const PASSWORD_KEY: &str = "password";
pub const TARGET_KEY: &str = "target";
pub const LOCATIONS_KEY: &str = "locations";
pub const RUNTIME_KEY: &str = "runtime";
pub const ENGINE_KEY: &str = "engine";
pub const CLEAN_DISABLED_KEY: &str = "cleanDisabled";

// Convention defaults
pub const CONFIG_FILENAME: &str = "flyrun.conf";
pub const DEFAULT_LOCATIONS: &str = "db/migration";
pub const DEFAULT_ENGINE: &str = "flyway";

// Environment namespace collected as a configuration layer
pub const ENV_PREFIX: &str = "FLYRUN_";

// Location descriptor protocol recognized by the engine
pub const FILESYSTEM_PREFIX: &str = "filesystem:";

// The engine reads the password from its environment, never from argv
pub const ENGINE_PASSWORD_ENV: &str = "FLYWAY_PASSWORD";
