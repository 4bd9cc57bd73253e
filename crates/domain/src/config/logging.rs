use serde::{Deserialize, Serialize};

/// Local log output of the `pushwire` binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "d_filter")]
    pub filter: String,

    /// Emit JSON lines instead of compact human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: d_filter(),
            json: false,
        }
    }
}

fn d_filter() -> String {
    "info,pw_channel=debug".into()
}
