//! Environment variable names and fixed defaults.

pub mod envs {
    /// Overrides the ComposeDB home directory.
    pub const COMPOSEDB_HOME: &str = "COMPOSEDB_HOME";

    /// Current environment identifier, selecting `docker-compose.<env>.yml`.
    pub const COMPOSEDB_ENV: &str = "COMPOSEDB_ENV";
}

pub mod dirs {
    /// Home directory name under the user's home.
    pub const COMPOSEDB_DIR: &str = ".composedb";

    /// Backup directory inside service containers.
    pub const BACKUP_DIR: &str = "/backups";
}

pub mod snapshot {
    pub const POLL_ATTEMPTS: u32 = 30;
    pub const POLL_INTERVAL_MS: u64 = 1000;
}
