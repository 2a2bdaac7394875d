use snafu::Snafu;

#[derive(Debug, Snafu)]
pub struct Error(OpaqueError);
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum OpaqueError {
    #[snafu(display("Error deserializing state: {}", source))]
    StateDeserialization { source: serde_json::Error },

    #[snafu(display("Error serializing state: {}", source))]
    StateSerialization { source: serde_json::Error },

    #[snafu(display("Error serializing state: expected Value::Object type but got something else."))]
    StateWrongValueType {},

    #[snafu(display("Parse error: {}", source))]
    SerdePlain { source: serde_plain::Error },
}
