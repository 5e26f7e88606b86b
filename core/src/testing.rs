pub mod checker;
pub mod compare;
pub mod monitor;
pub mod process;
pub mod result;
pub mod runner;
pub mod testcase;
pub mod verdict;

pub use checker::*;
pub use result::*;
pub use runner::*;
pub use testcase::*;
pub use verdict::*;
