mod codecli;
mod plan;
mod stream_json;

pub use codecli::CodeCliProvider;
pub use plan::{build_args, AgentKind};
pub use stream_json::StreamJsonEventMapper;
