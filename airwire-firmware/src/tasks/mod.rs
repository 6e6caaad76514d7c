//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod control;
pub mod encode;
pub mod sampling;
pub mod transform;

pub use control::control_task;
pub use encode::encode_task;
pub use sampling::sampling_task;
pub use transform::transform_task;
