//! Action dispatcher
//!
//! Runs one workflow per non-empty bucket, in a fixed order:
//! 1. No change - wait for `clean`, merge
//! 2. With diff - unlock + ignore comments, ignore label
//! 3. Dismissed - re-approve, merge if the latest comment reports no change
//! 4. No comment + error - plan comment (or conflict handling when dirty)
//! 5. To be closed - close notice + unlock comments, close

mod approve;
mod execute;

pub use approve::approve_all;
pub use execute::{DispatchOptions, DispatchReport, Dispatcher};
