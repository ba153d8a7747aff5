//! Typed workflow model.
//!
//! The merged front-matter mapping is inherently untyped; this crate is the
//! single conversion pass that turns it into a [`Workflow`] value. All
//! `unknown field` and `wrong type` findings surface here, once, with the
//! full key path. Engines, tools, and safe-output specs are tagged
//! variants; downstream code branches on the tag.

pub mod engine;
pub mod extract;
pub mod network;
pub mod permissions;
pub mod safe_outputs;
pub mod tools;
pub mod triggers;
pub mod workflow;

pub use engine::EngineSpec;
pub use network::{Ecosystem, NetworkPolicy};
pub use permissions::{Access, PermissionSet, Scope};
pub use safe_outputs::{SafeOutputKind, SafeOutputSpec, SafeOutputs};
pub use tools::{
    BashTool, BrowserTool, GithubMode, GithubTool, McpHttpTool, McpStdioTool, SafeInputField,
    SafeInputKind, SafeInputTool, ToolSpec,
};
pub use triggers::{Trigger, TriggerSet};
pub use workflow::{CacheEntry, Packages, Workflow};
