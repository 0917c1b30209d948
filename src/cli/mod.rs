pub mod compare;
pub mod inspect;
pub mod restore;
pub mod secure;

pub use compare::*;
pub use inspect::*;
pub use restore::*;
pub use secure::*;
