pub mod error;
pub mod stamp;
pub mod utils;
pub mod verdict;

pub use error::{ExecError, ExecResult};
pub use utils::ScopedFile;
pub use verdict::Verdict;
