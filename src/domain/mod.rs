mod money;
mod order;
mod user;

pub use money::*;
pub use order::*;
pub use user::*;
