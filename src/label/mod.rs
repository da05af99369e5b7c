//! Display label resolution.

mod composer;
mod merge;
mod pool;

pub use composer::LabelComposer;
pub use merge::LabelMerger;
pub use pool::{LabelHandle, LabelPool, LabelResolver};
