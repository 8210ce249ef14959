//! Java code model: declaration index, model builder, resolver and the
//! read-only inspection surface.

pub mod classpath;
pub mod config;
pub mod diagnostics;
pub mod encode;
pub mod error;
pub mod index;
pub mod inspect;
pub mod logging;
pub mod model;
pub mod session;

pub(crate) mod builder;
pub(crate) mod program;
pub(crate) mod resolve;

#[cfg(test)]
mod testing;

pub use classpath::ClasspathEntry;
pub use config::SessionConfig;
pub use error::{CoreError, Result};
pub use index::{ModuleOrigin, ModuleRecord};
pub use inspect::{CodeModel, FieldView, MethodView, TypeView};
pub use model::{Body, BodyOwner};
pub use session::Session;
