pub mod prompt;
pub mod server;
pub mod utils;

pub use server::{doors_error_to_mcp, read_resource_contents, VERSION_RESOURCE_URI};
pub use utils::DoorsWrapper;
