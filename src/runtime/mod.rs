//! Delegates that drive a manager: an explicitly pumped, nestable run loop
//! and a tokio adapter.

pub mod run_loop;
#[cfg(feature = "tokio-runtime")]
pub mod tokio_delegate;

pub use run_loop::RunLoop;
#[cfg(feature = "tokio-runtime")]
pub use tokio_delegate::TokioDelegate;
