//! ComposeDB: discover a compose project and run uniform database
//! operations against the engines inside its containers.
//!
//! The crate is split along the two halves of the problem:
//! - [`project`]: descriptor parsing, layered merging and cached resolution
//! - [`adapters`]: one [`DatabaseAdapter`] per engine family, selected through
//!   an [`AdapterRegistry`]
//!
//! Container access, environment loading and query validation are
//! collaborator traits ([`CommandExecutor`], [`EnvironmentProvider`],
//! [`QueryValidator`]) wired together by [`ComposeDbRuntime`].

pub mod adapters;
pub mod env;
pub mod exec;
pub mod project;
pub mod runtime;
pub mod validator;

pub use adapters::{
    AdapterContext, AdapterRegistry, BackupFormat, BackupOptions, ConnectionInfo, DatabaseAdapter,
    DbHealth, DbStatus, PostgresAdapter, QueryFormat, QueryOptions, RedisAdapter, ResolvedService,
    RestoreOptions, ServiceTarget, SnapshotPolicy, SqliteAdapter,
};
pub use composedb_shared::{ComposeDbError, ComposeDbResult};
pub use env::{DotEnvProvider, EnvironmentProvider};
pub use exec::{CommandExecutor, ComposeExecutor, ExecOptions, ServiceLocation};
pub use project::{
    BuildConfig, FindProjectOptions, ProjectConfig, ProjectResolver, ServiceConfig, ServiceType,
};
pub use runtime::ComposeDbRuntime;
pub use runtime::options::ComposeDbOptions;
pub use validator::{QueryValidator, SqlGuard};
