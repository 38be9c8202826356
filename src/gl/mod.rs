//! Native OpenGL / OpenGL ES / WebGL layer.
//!
//! - [`interface`]: the [`GlInterface`] seam every native call goes through
//! - [`functions`]: a function table resolved from a platform loader
//! - [`headless`]: an in-memory implementation for tests and offscreen tooling
//! - [`caps`] / [`format_table`] / [`version`]: what a context can do
//! - [`convert`]: backend-agnostic enums to native values
//! - [`registry`]: version-keyed cache of resolved interfaces
//! - [`state`]: redundant-call elimination for driver state

pub mod caps;
pub mod consts;
pub mod convert;
pub mod format_table;
pub mod functions;
pub mod headless;
pub mod interface;
pub mod registry;
pub mod state;
pub mod version;

pub use caps::{Extensions, GlCaps, MsaaResolve};
pub use format_table::{FormatInfo, FormatTable, pixel_format_from_sized};
pub use functions::{GlFunctions, Loader};
pub use headless::{HeadlessGl, UniformValue};
pub use interface::{GlInterface, GlSync, allocation_failed, clear_errors};
pub use registry::{GlContextInterface, InterfaceRegistry};
pub use state::StateCache;
pub use version::{GlStandard, GlVersion};
