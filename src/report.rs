use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

const LATENCIES: &str = "latencies";

/// Final report produced by an engine.
///
/// The driver treats it as an opaque document except for `latencies`, which
/// holds every raw sample and is kept out of the logged summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Report(Map<String, Value>);

impl Report {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// The canned result of a simulated invocation.
    pub fn simulated() -> Self {
        let mut fields = Map::new();
        fields.insert("errors".to_string(), json!(0));
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn latencies(&self) -> Option<&Value> {
        self.0.get(LATENCIES)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Pretty JSON of everything except `latencies`.
    ///
    /// The samples are taken out for the duration of the serialization and
    /// put back before returning, so the report is unchanged afterwards.
    pub fn summary_json(&mut self) -> serde_json::Result<String> {
        let latencies = self.0.remove(LATENCIES);
        let summary = serde_json::to_string_pretty(&self.0);
        if let Some(latencies) = latencies {
            self.0.insert(LATENCIES.to_string(), latencies);
        }
        summary
    }
}

impl From<Map<String, Value>> for Report {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
