//! Cursor implementations behind every stream stage.
//!
//! Each stage wraps the upstream cursor it consumes. Nothing is pulled until
//! a terminal operation drives the outermost cursor.

pub mod core;
pub mod constructors;
pub mod advanced;
pub mod utility;
pub mod select;
pub mod specialized;
pub mod ordering;
pub mod parallel;

// Re-export core types
pub use core::{
    ConcatCursor, Cursor, EmptyCursor, FilterCursor, FlatMapCursor, IterCursor, Lookahead,
    MapCursor, PeekCursor, VecCursor,
};

// Re-export generated sources
pub use constructors::{IterateCursor, RangeCursor, RepeatCursor};

// Re-export stateful combinators
pub use advanced::{CollapseCursor, DistinctCursor, ScanCursor, SeededScanCursor, SetOpCursor};

// Re-export positional combinators
pub use utility::{DropWhileCursor, LimitCursor, SkipCursor, StepCursor, TakeWhileCursor};

// Re-export two-input combinators
pub use select::{
    MergeCursor, MergeResult, Zip3Cursor, Zip3PaddedCursor, ZipCursor, ZipPaddedCursor,
};

// Re-export windowing combinators
pub use specialized::{ChunkCursor, Segment, SlidingCursor, SplitCursor, SplitOnCursor};

// Re-export barrier stages
pub use ordering::{ReversedCursor, SortedCursor};

pub use parallel::SharedCursor;
