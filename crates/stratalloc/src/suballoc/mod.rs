//! The bump-then-bitmap sub-allocators.
//!
//! Both engines share one discipline, at different granularities: objects
//! are placed at a monotonically advancing cursor, only the first slot of
//! each span is recorded in the owner bitmap `bs`, and the cursor is
//! retracted whenever `rfind` proves nothing live remains above a freed
//! span. Foreign threads never touch `bs`; they mark `xbs` atomically and
//! the owner folds those marks back in on its slow path.

pub mod large;
pub mod small;

pub use large::LargeAlloc;
pub use small::SmallAlloc;
