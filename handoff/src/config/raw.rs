use serde::Deserialize;

// --- Top Level Config ---
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ProducerConfigRaw {
  #[serde(default = "default_version")]
  pub version: u32,
  /// Human readable duration, e.g. `"200ms"` or `"1s"`.
  #[serde(default)]
  pub interval: Option<String>,
  #[serde(default)]
  pub start_delay: Option<String>,
  #[serde(default)]
  pub thread_name: Option<String>,
}

fn default_version() -> u32 {
  1
}

impl Default for ProducerConfigRaw {
  fn default() -> Self {
    Self {
      version: default_version(),
      interval: None,
      start_delay: None,
      thread_name: None,
    }
  }
}
