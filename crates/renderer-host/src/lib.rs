//! renderer-host - Grammar and theme resolution for the notebook code renderer.
//!
//! The host runs where installed extensions are visible. It answers the
//! renderer client's three requests (tokenizer engine, language grammar,
//! color theme) by scanning extension manifests, reading the files they
//! point at, and converting themes into the editor widget's rule format.
//!
//! Every lookup fails soft: a missing or unreadable resource produces a
//! well-formed empty or default payload, never a protocol error.

pub mod config;
pub mod grammar;
pub mod manifest;
pub mod resolver;
pub mod server;
pub mod theme;

pub use config::HostConfig;
pub use manifest::{ExtensionDirectory, ExtensionProvider, InstalledExtension, StaticExtensions};
pub use resolver::{ResolveError, Resolver};
pub use server::HostServer;
