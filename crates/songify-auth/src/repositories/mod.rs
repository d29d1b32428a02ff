pub mod principals;

pub use principals::{InMemoryPrincipalStore, PrincipalStore};
