pub mod forum;
pub use self::forum::*;
