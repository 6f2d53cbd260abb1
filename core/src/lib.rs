pub mod diagnostics;
pub mod rox;
pub mod scanner;
pub mod token;
pub mod types;

pub use crate::rox::{Rox, RoxError, RoxResult};
pub use crate::scanner::{scan, ScanError, ScanErrorKind, Scanned, Scanner};
