pub mod huge;
pub mod large;

pub use huge::HugeBlock;
pub use large::LargeBlock;
