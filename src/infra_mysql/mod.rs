mod credential_repo_mysql;
mod settings_store_mysql;

pub use credential_repo_mysql::*;
pub use settings_store_mysql::*;

mod util;
