use serde::{Deserialize, Serialize};

/// Editing-surface constraints on a proposed cap, in percent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CapBounds {
    pub min:  f64,
    pub max:  f64,
    pub step: f64,
}

impl Default for CapBounds {
    fn default() -> Self {
        Self { min: 0.0, max: 5.0, step: 0.1 }
    }
}

impl CapBounds {
    /// Ok(()) if `value` is finite, in [min, max] and on the step grid.
    /// Err carries the human-readable reason.
    pub fn check(&self, value: f64) -> Result<(), String> {
        if !value.is_finite() {
            return Err("cap must be a finite number".into());
        }
        if value < self.min || value > self.max {
            return Err(format!(
                "cap must be between {:.1}% and {:.1}%",
                self.min, self.max
            ));
        }
        if self.step > 0.0 {
            let steps = (value - self.min) / self.step;
            if (steps - steps.round()).abs() > 1e-6 {
                return Err(format!("cap must be a multiple of {}%", self.step));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorConfig {
    /// Historical period of the flow extract, e.g. "2023".
    pub period: String,
    /// Tier label that carries no enforced cap.
    pub unregulated_label: String,
    /// Sentinel cap used for the unregulated tier.
    pub unregulated_cap_percent: f64,
    #[serde(default)]
    pub cap_bounds: CapBounds,
    /// Warehouse query results are reused for this many seconds.
    pub query_ttl_seconds: i64,
}

impl CalculatorConfig {
    /// Load from the data/ directory.
    /// In tests, use CalculatorConfig::default_test().
    pub fn load(data_dir: &str) -> anyhow::Result<Self> {
        let path = format!("{data_dir}/calculator.json");
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: CalculatorConfig = serde_json::from_str(&content)?;
        if config.query_ttl_seconds < 0 {
            anyhow::bail!("{path}: query_ttl_seconds must be >= 0");
        }
        if config.cap_bounds.min > config.cap_bounds.max {
            anyhow::bail!("{path}: cap_bounds.min exceeds cap_bounds.max");
        }
        Ok(config)
    }

    pub fn default_test() -> Self {
        Self {
            period: "2023".into(),
            unregulated_label: "Unregulated".into(),
            unregulated_cap_percent: 5.0,
            cap_bounds: CapBounds::default(),
            query_ttl_seconds: 3600,
        }
    }
}

/// Where the warehouse extract and data directory live.
/// Read from the environment; the runner loads `.env` first.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub db_path:  String,
    pub data_dir: String,
}

impl WarehouseConfig {
    pub fn from_env() -> Self {
        Self {
            db_path:  std::env::var("ICF_WAREHOUSE_PATH").unwrap_or_else(|_| "icf.db".into()),
            data_dir: std::env::var("ICF_DATA_DIR").unwrap_or_else(|_| "./data".into()),
        }
    }
}
