pub mod context;

pub use context::{build_render_context, RenderContext};
