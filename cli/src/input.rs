use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tokio::io::AsyncReadExt;

/// Read a JSON document from `path`, or from stdin when `path` is `-`.
pub(crate) async fn read_json(path: &Path) -> Result<Value> {
    let text = if path == Path::new("-") {
        let mut text = String::new();
        tokio::io::stdin()
            .read_to_string(&mut text)
            .await
            .context("Unable to read from stdin")?;
        text
    } else {
        tokio::fs::read_to_string(path)
            .await
            .context(format!("Unable to read '{}'", path.display()))?
    };
    serde_json::from_str(&text).context(format!("'{}' is not valid JSON", path.display()))
}

/// Read an optional JSON document, an empty object when no path is given.
pub(crate) async fn read_optional_json(path: Option<&Path>) -> Result<Value> {
    match path {
        Some(path) => read_json(path).await,
        None => Ok(Value::Object(Default::default())),
    }
}
