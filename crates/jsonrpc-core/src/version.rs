use std::fmt;

/// The `jsonrpc` version string an endpoint was configured to speak.
///
/// `V1` is only meaningful for the response shape: spec.md §4.2 says a
/// configured version other than `"2.0"` uses the legacy
/// `{result: null | value, error: .., id}` response object instead of
/// tagging the object with `jsonrpc: "2.0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcVersion {
    V2,
    V1,
}

impl JsonRpcVersion {
    pub const fn as_str(self) -> &'static str {
        match self {
            JsonRpcVersion::V2 => "2.0",
            JsonRpcVersion::V1 => "1.0",
        }
    }
}

impl Default for JsonRpcVersion {
    fn default() -> Self {
        JsonRpcVersion::V2
    }
}

impl fmt::Display for JsonRpcVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
