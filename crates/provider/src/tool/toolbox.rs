use std::future::ready;
use std::pin::Pin;

use schemars::schema_for;
use serde_json::Value;
use toolbridge_protocol::{CallToolResult, ToolDescriptor};

use super::{Tool, ToolError};

type CallFuture = Pin<Box<dyn Future<Output = CallToolResult> + Send>>;
type Invoker = Box<dyn Fn(Value) -> CallFuture + Send + Sync>;

/// A registered tool with its type erased: what `tools/list` shows for it,
/// and how raw arguments become a finished result.
struct Entry {
    descriptor: ToolDescriptor,
    invoke: Invoker,
}

impl Entry {
    fn new<T: Tool>(tool: T) -> Self {
        let descriptor = ToolDescriptor {
            name: T::NAME.to_owned(),
            description: tool.description().to_owned(),
            input_schema: schema_for!(T::Arguments).to_value(),
        };
        let invoke: Invoker = Box::new(move |arguments: Value| -> CallFuture {
            let arguments: T::Arguments = match serde_json::from_value(arguments)
            {
                Ok(arguments) => arguments,
                Err(err) => {
                    let err = ToolError::invalid_arguments(err.to_string());
                    warn!("rejecting call of `{}`: {err}", T::NAME);
                    return Box::pin(ready(CallToolResult::from(err)));
                }
            };
            let call = tool.call(arguments);
            Box::pin(async move {
                match call.await {
                    Ok(content) => CallToolResult {
                        content,
                        is_error: false,
                    },
                    Err(err) => {
                        warn!("tool `{}` failed: {err}", T::NAME);
                        CallToolResult::from(err)
                    }
                }
            })
        });
        Self { descriptor, invoke }
    }
}

/// The tools of a provider, in registration order.
#[derive(Default)]
pub struct Toolbox {
    entries: Vec<Entry>,
}

impl Toolbox {
    /// Registers a tool. A tool with the same name is replaced, keeping
    /// its position.
    pub fn add_tool<T: Tool>(&mut self, tool: T) {
        let entry = Entry::new(tool);
        match self
            .entries
            .iter_mut()
            .find(|existing| existing.descriptor.name == T::NAME)
        {
            Some(existing) => {
                warn!("replacing tool `{}`", T::NAME);
                *existing = entry;
            }
            None => self.entries.push(entry),
        }
    }

    /// Registers a tool, builder style.
    #[inline]
    pub fn with_tool<T: Tool>(mut self, tool: T) -> Self {
        self.add_tool(tool);
        self
    }

    /// Returns the number of tools.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether no tool is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Describes the tools the way `tools/list` reports them.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.entries
            .iter()
            .map(|entry| entry.descriptor.clone())
            .collect()
    }

    /// Starts a call of the named tool, or returns `None` if there is no
    /// such tool. Failures of the tool end up in the result.
    pub fn call(&self, name: &str, arguments: Value) -> Option<CallFuture> {
        let entry = self
            .entries
            .iter()
            .find(|entry| entry.descriptor.name == name)?;
        trace!("calling tool `{name}` with args: {arguments:?}");
        Some((entry.invoke)(arguments))
    }
}

#[cfg(test)]
mod tests {
    use schemars::JsonSchema;
    use serde::Deserialize;
    use serde_json::json;
    use toolbridge_protocol::Content;

    use super::*;
    use crate::tool::ToolOutput;

    #[derive(Deserialize, JsonSchema)]
    struct EchoArguments {
        text: String,
    }

    struct EchoTool(&'static str);

    impl Tool for EchoTool {
        const NAME: &'static str = "echo";
        type Arguments = EchoArguments;

        fn description(&self) -> &str {
            self.0
        }

        fn call(
            &self,
            arguments: EchoArguments,
        ) -> impl Future<Output = ToolOutput> + Send + 'static {
            ready(Ok(vec![Content::text(arguments.text)]))
        }
    }

    #[derive(Deserialize, JsonSchema)]
    struct NoArguments {}

    struct FailingTool;

    impl Tool for FailingTool {
        const NAME: &'static str = "fail";
        type Arguments = NoArguments;

        fn description(&self) -> &str {
            "Always fails"
        }

        fn call(
            &self,
            _arguments: NoArguments,
        ) -> impl Future<Output = ToolOutput> + Send + 'static {
            ready(Err(ToolError::failed("no luck")))
        }
    }

    #[tokio::test]
    async fn test_call() {
        let toolbox = Toolbox::default()
            .with_tool(EchoTool("Echoes text"))
            .with_tool(FailingTool);

        let result = toolbox
            .call("echo", json!({ "text": "hi" }))
            .unwrap()
            .await;
        assert_eq!(result, CallToolResult::text("hi"));

        let result = toolbox.call("echo", json!({})).unwrap().await;
        assert!(result.is_error);
        assert!(result.render_text().starts_with("Invalid arguments: "));

        let result = toolbox.call("fail", json!({})).unwrap().await;
        assert_eq!(result, CallToolResult::error("no luck"));

        assert!(toolbox.call("missing", json!({})).is_none());
    }

    #[test]
    fn test_descriptors() {
        let toolbox = Toolbox::default()
            .with_tool(EchoTool("first"))
            .with_tool(FailingTool)
            .with_tool(EchoTool("second"));
        assert_eq!(toolbox.len(), 2);

        let descriptors = toolbox.descriptors();
        assert_eq!(descriptors[0].name, "echo");
        assert_eq!(descriptors[0].description, "second");
        assert_eq!(descriptors[0].input_schema["type"], "object");
        assert_eq!(
            descriptors[0].input_schema["required"],
            json!(["text"])
        );
        assert_eq!(descriptors[1].name, "fail");
    }
}
