mod messages;

pub use messages::{
    AgentMessage, AssistantBlock, ImageSource, ResultMessage, ToolResultContent, ToolResultPart,
    UserBlock, parse_line,
};
