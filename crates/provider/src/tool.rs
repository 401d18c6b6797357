//! Tools served over `tools/list` and `tools/call`.

mod error;
mod toolbox;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use toolbridge_protocol::Content;

pub use error::{ToolError, ToolErrorKind};
pub use toolbox::Toolbox;

/// The content items of a successful call, or why the call failed.
pub type ToolOutput = Result<Vec<Content>, ToolError>;

/// A tool a client can discover and call.
///
/// The input schema advertised for the tool is generated from
/// [`Tool::Arguments`], and the arguments of every call are deserialized
/// into it before [`Tool::call`] runs. Calls that don't fit are answered
/// as failed results without reaching the tool.
pub trait Tool: Send + Sync + 'static {
    /// The name the tool is listed and called by.
    const NAME: &'static str;

    /// The arguments of a call.
    type Arguments: DeserializeOwned + JsonSchema;

    /// Tells the model what the tool does and what it returns.
    fn description(&self) -> &str;

    /// Runs the tool.
    ///
    /// The future must not borrow `self`, a call may outlive the request
    /// that started it.
    fn call(
        &self,
        arguments: Self::Arguments,
    ) -> impl Future<Output = ToolOutput> + Send + 'static;
}
