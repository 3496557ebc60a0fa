use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("Failed to parse KDL")]
    #[diagnostic(code(flowkeys::config::parse_error))]
    ParseError {
        #[source_code]
        src: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source]
        source: kdl::KdlError,
    },

    #[error("Invalid configuration: {message}")]
    #[diagnostic(code(flowkeys::config::invalid))]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    #[diagnostic(code(flowkeys::config::missing_field))]
    MissingField { field: String },

    #[error("{}", format_invalid_steps(.invalid_steps))]
    #[diagnostic(
        code(flowkeys::config::invalid_step),
        help("Steps are single keys (\"g\") or keys joined by '+' (\"Control+k\")")
    )]
    InvalidSteps { invalid_steps: Vec<InvalidStepInfo> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Position of a node or entry in the config source (1-indexed line/column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
    pub len: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize, offset: usize, len: usize) -> Self {
        Self {
            line,
            column,
            offset,
            len,
        }
    }
}

/// A `bind` step that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidStepInfo {
    pub step: String,
    pub reason: String,
    pub location: SourceLocation,
}

fn format_invalid_steps(steps: &[InvalidStepInfo]) -> String {
    let mut message = format!("Invalid step(s) in bind sequences ({} found)", steps.len());
    for info in steps {
        message.push_str(&format!(
            "\n  line {}, column {}: '{}': {}",
            info.location.line, info.location.column, info.step, info.reason
        ));
    }
    message
}
