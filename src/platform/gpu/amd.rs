use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use super::locator::ToolLocator;
use super::runner::CommandRunner;
use crate::error::{MonitorError, Result};

/// Queries issued against rocm-smi / amd-smi.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmiQuery {
    Utilization,
    Memory,
    Temperature,
    ProductName,
    DriverVersion,
    SmiVersion,
}

impl SmiQuery {
    /// Per-cycle telemetry queries, in the order they are issued.
    pub const TELEMETRY: [SmiQuery; 4] = [
        SmiQuery::Utilization,
        SmiQuery::Memory,
        SmiQuery::Temperature,
        SmiQuery::ProductName,
    ];

    pub fn args(self) -> &'static [&'static str] {
        match self {
            SmiQuery::Utilization => &["--showuse"],
            SmiQuery::Memory => &["--showmeminfo", "vram"],
            SmiQuery::Temperature => &["--showtemp"],
            SmiQuery::ProductName => &["--showproductname"],
            SmiQuery::DriverVersion => &["--showdriverversion"],
            SmiQuery::SmiVersion => &["--showversion"],
        }
    }

    /// Whether the query is issued with `--json`.
    pub fn is_structured(self) -> bool {
        !matches!(self, SmiQuery::DriverVersion | SmiQuery::SmiVersion)
    }

    pub fn name(self) -> &'static str {
        match self {
            SmiQuery::Utilization => "utilization",
            SmiQuery::Memory => "memory",
            SmiQuery::Temperature => "temperature",
            SmiQuery::ProductName => "product name",
            SmiQuery::DriverVersion => "driver version",
            SmiQuery::SmiVersion => "smi version",
        }
    }
}

/// A resolved AMD SMI executable.
#[derive(Debug, Clone)]
pub struct AmdSmi {
    path: PathBuf,
    runner: CommandRunner,
}

impl AmdSmi {
    pub fn new<P: Into<PathBuf>>(path: P, runner: CommandRunner) -> Self {
        Self {
            path: path.into(),
            runner,
        }
    }

    /// Resolve the tool through `locator`.
    pub fn locate(locator: &ToolLocator, runner: CommandRunner) -> Result<Self> {
        locator
            .locate()
            .map(|path| Self::new(path, runner))
            .ok_or(MonitorError::ToolNotFound)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a structured query. Raw-text queries yield an empty mapping.
    pub async fn query_structured(&self, query: SmiQuery) -> Map<String, Value> {
        if !query.is_structured() {
            return Map::new();
        }
        self.runner.run_json(&self.path, query.args()).await
    }

    pub async fn query_text(&self, query: SmiQuery) -> String {
        self.runner.run_text(&self.path, query.args()).await
    }
}
