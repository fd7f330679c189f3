use std::collections::BTreeMap;
use std::path::PathBuf;

use parrot::prelude::*;

/// A recordable fixture with one string attribute and a spread of
/// operations covering required, defaulted and composite parameters.
#[derive(Default)]
pub struct Device {
    pub name: String,
    /// Every successful invocation, rendered as a statement.
    pub calls: Vec<String>,
    /// When set, the invocation with this index fails.
    pub fail_on_call: Option<usize>,
}

impl Target for Device {
    fn operations(&self) -> Vec<OperationSpec> {
        vec![
            OperationSpec::new("test1").with_defaulted("arg1", Value::None),
            OperationSpec::new("test2")
                .with_defaulted("arg1", Value::None)
                .with_defaulted("arg2", 2i64),
            OperationSpec::new("test3")
                .with_defaulted("arg1", Value::None)
                .with_defaulted("arg2", 2i64)
                .with_defaulted("arg3", Value::List(Vec::new())),
            OperationSpec::new("test4")
                .with_required("arg1")
                .with_defaulted("arg2", Value::Map(BTreeMap::new()))
                .with_defaulted("arg3", "hello,world")
                .with_defaulted("arg4", Value::None),
            OperationSpec::new("rename").with_required("name"),
            OperationSpec::new("dont_test"),
            OperationSpec::new("_hidden"),
        ]
    }

    fn invoke(&mut self, operation: &str, args: &[Value]) -> Result<Option<Value>, InvokeError> {
        if self.fail_on_call == Some(self.calls.len()) {
            return Err(InvokeError::new("injected failure"));
        }
        if operation == "rename" {
            if let Some(Value::Str(name)) = args.first() {
                self.name = name.clone();
            }
        }
        let rendered: Vec<String> = args.iter().map(|v| v.to_string()).collect();
        self.calls
            .push(format!("{operation}({})", rendered.join(", ")));
        Ok(None)
    }

    fn attributes(&self) -> BTreeMap<String, Value> {
        BTreeMap::from([("name".to_owned(), Value::from(self.name.clone()))])
    }

    fn set_attribute(&mut self, name: &str, value: Value) -> Result<(), InvokeError> {
        match (name, value) {
            ("name", Value::Str(s)) => {
                self.name = s;
                Ok(())
            }
            _ => Err(InvokeError::unknown_attribute(name)),
        }
    }
}

/// A unique path under the system temp directory; the artifact writer
/// normalizes the extension.
pub fn scratch_path(stem: &str) -> PathBuf {
    std::env::temp_dir().join(format!("parrot-{}-{stem}", std::process::id()))
}
