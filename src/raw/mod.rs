mod arena;
mod handle;
mod node;
mod overflow;
mod tree;
mod underflow;
mod validate;

pub(crate) use handle::Handle;
pub(crate) use tree::RawTree;
