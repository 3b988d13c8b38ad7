use serde::{Serialize, Deserialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArgSchema {
    pub name: String,
    pub arg_type: String,
    pub description: String,
    pub required: bool,
}

impl ArgSchema {
    /// Schema for the usual single free-text argument.
    pub fn string(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arg_type: "string".to_string(),
            description: description.into(),
            required: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub args: Vec<ArgSchema>,
}

impl ToolSchema {
    /// JSON object keyed by argument name, e.g. `{"query":{"description":"...","type":"string"}}`.
    ///
    /// Keys are inserted in sorted order, so the rendering is the same whether
    /// or not serde_json's `preserve_order` feature is enabled.
    pub fn args_json(&self) -> Value {
        let mut args: Vec<&ArgSchema> = self.args.iter().collect();
        args.sort_by(|a, b| a.name.cmp(&b.name));

        let mut map = Map::new();
        for arg in args {
            let mut entry = Map::new();
            entry.insert("description".to_string(), Value::String(arg.description.clone()));
            entry.insert("type".to_string(), Value::String(arg.arg_type.clone()));
            map.insert(arg.name.clone(), Value::Object(entry));
        }
        Value::Object(map)
    }

    /// One prompt line: `<name>: <description>, args: <schema>`.
    pub fn render(&self) -> String {
        format!("{}: {}, args: {}", self.name, self.description, self.args_json())
    }
}
