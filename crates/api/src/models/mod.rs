pub mod diagnostic;
pub mod kinds;
pub mod modifiers;
pub mod module;
pub mod symbol;
pub mod types;

pub use diagnostic::*;
pub use kinds::*;
pub use modifiers::*;
pub use module::*;
pub use symbol::*;
pub use types::*;
