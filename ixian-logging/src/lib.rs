// Copyright (c) 2022 MASSA LABS <info@massa.net>
//! Structured trace events shared by the node workers.

/// Emits a `trace` level event tagged `ixian_trace:<event>` with json parameters.
///
/// ```
/// # use ixian_logging::ixian_trace;
/// let block_num = 12u64;
/// ixian_trace!("sync.roll_forward.apply", { "block_num": block_num });
/// ```
#[macro_export]
macro_rules! ixian_trace {
    ($evt:expr, $params:tt) => {
        tracing::trace!("ixian_trace:{}:{}", $evt, serde_json::json!($params));
    };
}
