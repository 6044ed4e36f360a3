pub mod atomic;
pub mod error;

pub use atomic::atomic_write_json;
pub use atomic::read_json_opt;
pub use error::SessionError;
