//! CLI command implementations, one module per subcommand.

mod crawl;
mod discover;
mod import;
mod init;
mod status;

pub use crawl::cmd_crawl;
pub use discover::cmd_discover;
pub use import::cmd_import;
pub use init::cmd_init;
pub use status::cmd_status;
