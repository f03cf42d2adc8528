/*!
 * Monitoring
 * Structured tracing bootstrap and wait spans
 */

mod tracer;

pub use tracer::{init_tracing, WaitSpan};
