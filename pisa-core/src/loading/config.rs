use std::path::PathBuf;

/// Location of the network tables and how to complete them
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// CSV with `id,x,y` columns
    pub nodes_path: PathBuf,
    /// CSV with `u,v,length` and optional `time`, `geometry` (WKT) columns
    pub edges_path: PathBuf,
    /// Speed used to derive `time` weights for edges that have none
    pub default_speed_kph: Option<f64>,
}

impl NetworkConfig {
    pub fn new(nodes_path: impl Into<PathBuf>, edges_path: impl Into<PathBuf>) -> Self {
        Self {
            nodes_path: nodes_path.into(),
            edges_path: edges_path.into(),
            default_speed_kph: None,
        }
    }

    #[must_use]
    pub fn with_default_speed(mut self, speed_kph: f64) -> Self {
        self.default_speed_kph = Some(speed_kph);
        self
    }
}
