pub mod error;
pub mod numeric;
pub mod source;
pub mod stream;

pub mod stream_configuration;
pub mod worker_pool;
pub mod resource_chain;

mod coordinator;
pub mod rstream;
mod terminal;
pub mod combinators;

// Re-export the facade and its collaborators at the crate root
pub use rstream::RStream;
pub use combinators::{
    concat, concat_all, merge, merge3, try_merge, try_merge3, try_zip, try_zip3, try_zip3_padded,
    try_zip_padded, zip, zip3, zip3_padded, zip_padded,
};
pub use error::{BoxError, CallbackError, StreamError, StreamResult};
pub use numeric::Numeric;
pub use resource_chain::{CloseHandler, ResourceChain};
pub use stream::{Cursor, MergeResult};
pub use stream_configuration::{ExecutionConfig, Splitor};
pub use worker_pool::{ExecutionContext, Task, TaskExecutor, TaskHandle, WorkerPool};
