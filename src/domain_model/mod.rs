mod duration;
mod maintenance;
mod permission;
mod session;
mod user;

pub use duration::*;
pub use maintenance::*;
pub use permission::*;
pub use session::*;
pub use user::*;
