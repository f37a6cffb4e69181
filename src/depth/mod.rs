//! Depth-walk slippage core.
//!
//! Data flows strictly `ladder -> walker -> reducer -> merger`.

pub mod ladder;
pub mod merger;
pub mod reducer;
pub mod walker;

pub use ladder::{Ladder, LadderBuilder, LadderSet};
pub use merger::{MergeOutcome, SideMerger};
pub use reducer::{ClearingPolicy, ClearingReducer};
pub use walker::{ClearingState, DepthWalker, LadderWalk, SlippageCandidate, WalkRow};
