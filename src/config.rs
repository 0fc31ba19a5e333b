use chrono::NaiveTime;
use serde::Deserialize;

use std::path::PathBuf;

use crate::accuracy::Granularity;
use crate::breakout::BreakoutCondition;
use crate::candle::{Resolution, TouchLabel, TouchLevel};
use crate::error::ConfigError;
use crate::moves::CandleNumbering;
use crate::pipeline::{BreakoutStage, PipelineConfig, StageKind, TouchStage};
use crate::records::{CategoryFilter, PrevMoveBucket};
use crate::window::{OFFSET_WINDOW_LEN, OPENING_CANDLES, WindowPolicy};

/// Value meaning "no filter" in every selector.
pub const ANY: &str = "Any";

fn any() -> String {
    ANY.to_string()
}

/// Top-level analyzer settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzerConfig {
    /// Daily summary CSV (Date, Signal, Candles, Prev_Move, Move, Move.1)
    pub summary: PathBuf,

    /// 5-minute series CSV (time, open, high, low, close)
    pub fine_series: PathBuf,

    /// 30-minute series CSV, optionally with touch flag columns
    pub coarse_series: PathBuf,

    /// Entry/exit rules CSV (Signal, View, Entry, Exit)
    #[serde(default)]
    pub rules: Option<PathBuf>,

    /// Period used by the accuracy breakdown
    #[serde(default)]
    pub group_by: Granularity,

    #[serde(default)]
    pub filter: FilterSettings,

    #[serde(default)]
    pub fine: Option<BreakoutSettings>,

    #[serde(default)]
    pub coarse: Option<BreakoutSettings>,

    #[serde(default)]
    pub flag: Option<TouchSettings>,

    #[serde(default)]
    pub untouched: Option<TouchSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FilterSettings {
    #[serde(default = "any")]
    pub signal: String,
    #[serde(default = "any")]
    pub candles: String,
    /// Either the bucket name or its selector label, e.g. "Moderate Long (0.40% to 1.00%)"
    #[serde(default = "any")]
    pub prev_move: String,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            signal: any(),
            candles: any(),
            prev_move: any(),
        }
    }
}

/// Candle selection as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum WindowSettings {
    TimeRange {
        start: String,
        end: String,
    },
    IndexOffset {
        #[serde(default)]
        skip: Option<usize>,
        #[serde(default)]
        len: Option<usize>,
    },
    CandleNumbers {
        numbers: Vec<usize>,
    },
    Auto,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BreakoutSettings {
    #[serde(default)]
    pub enabled: bool,

    pub condition: BreakoutCondition,

    /// Defaults to 09:45-10:10 for 5-min and "auto" for 30-min
    #[serde(default)]
    pub window: Option<WindowSettings>,

    /// Search the 5-min window up to 15:30 instead of 10:10
    #[serde(default)]
    pub extended: bool,

    #[serde(default)]
    pub numbering: CandleNumbering,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TouchSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "any")]
    pub level: String,

    #[serde(default = "any")]
    pub result: String,

    /// Defaults to "auto" (09:15-15:15)
    #[serde(default)]
    pub window: Option<WindowSettings>,

    #[serde(default)]
    pub numbering: CandleNumbering,
}

fn parse_hm(section: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value.trim(), "%H:%M:%S"))
        .map_err(|_| ConfigError::InvalidTime {
            section: section.to_string(),
            value: value.to_string(),
        })
}

impl WindowSettings {
    pub fn to_policy(&self, section: &str) -> Result<WindowPolicy, ConfigError> {
        Ok(match self {
            WindowSettings::TimeRange { start, end } => WindowPolicy::TimeRange {
                start: parse_hm(section, start)?,
                end: parse_hm(section, end)?,
            },
            WindowSettings::IndexOffset { skip, len } => WindowPolicy::IndexOffset {
                skip: skip.unwrap_or(OPENING_CANDLES),
                len: len.unwrap_or(OFFSET_WINDOW_LEN),
            },
            WindowSettings::CandleNumbers { numbers } => {
                WindowPolicy::CandleNumbers(numbers.clone())
            }
            WindowSettings::Auto => WindowPolicy::FullSession,
        })
    }
}

fn selector(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty() && value != ANY).then(|| value.to_string())
}

impl FilterSettings {
    pub fn to_filter(&self) -> Result<CategoryFilter, ConfigError> {
        let prev_move = match selector(&self.prev_move) {
            Some(value) => match PrevMoveBucket::parse(&value) {
                PrevMoveBucket::Other => return Err(ConfigError::InvalidPrevMove { value }),
                bucket => Some(bucket),
            },
            None => None,
        };
        Ok(CategoryFilter {
            signal: selector(&self.signal),
            candle_shape: selector(&self.candles),
            prev_move,
        })
    }
}

impl BreakoutSettings {
    fn to_stage(&self, kind: StageKind) -> Result<Option<BreakoutStage>, ConfigError> {
        if !self.enabled {
            return Ok(None);
        }
        let resolution = kind.resolution();
        if !self.condition.applies_to(resolution) {
            return Err(ConfigError::ConditionNotAllowed {
                stage: resolution.to_string(),
                condition: self.condition.label().to_string(),
            });
        }

        let section = match kind {
            StageKind::Fine => "fine",
            _ => "coarse",
        };
        let window = match (&self.window, resolution) {
            (Some(w), _) => w.to_policy(section)?,
            (None, Resolution::Fine) if self.extended => WindowPolicy::fine_extended(),
            (None, Resolution::Fine) => WindowPolicy::fine_default(),
            (None, Resolution::Coarse) => WindowPolicy::FullSession,
        };

        Ok(Some(BreakoutStage {
            condition: self.condition,
            window,
            numbering: self.numbering,
        }))
    }
}

impl TouchSettings {
    fn to_stage(&self, kind: StageKind) -> Result<Option<TouchStage>, ConfigError> {
        let section = match kind {
            StageKind::Untouched => "untouched",
            _ => "flag",
        };
        if !self.enabled {
            return Ok(None);
        }
        let (Some(level), Some(result)) = (selector(&self.level), selector(&self.result)) else {
            log::info!("[{section}] level or result is \"Any\"; stage skipped");
            return Ok(None);
        };

        let level = TouchLevel::parse(&level)
            .filter(|l| l.is_untouched() == (kind == StageKind::Untouched))
            .ok_or_else(|| ConfigError::InvalidLevel {
                section: section.to_string(),
                level: level.clone(),
            })?;
        let label = match TouchLabel::parse(&result) {
            TouchLabel::Other => return Err(ConfigError::InvalidResult { result }),
            label => label,
        };
        let window = match &self.window {
            Some(w) => w.to_policy(section)?,
            None => WindowPolicy::FullSession,
        };

        Ok(Some(TouchStage {
            level,
            label,
            window,
            numbering: self.numbering,
        }))
    }
}

impl AnalyzerConfig {
    pub fn load(path: PathBuf) -> Result<Self, ConfigError> {
        let filename = path
            .into_os_string()
            .into_string()
            .map_err(|_| ConfigError::FilePathIntoString)?;
        let config = config::Config::builder()
            .add_source(config::File::with_name(&filename))
            .build()
            .map_err(|err| ConfigError::SettingsInit(err.to_string()))?
            .try_deserialize()
            .map_err(|err| ConfigError::Deserialize(err.to_string()))?;
        Ok(config)
    }

    /// Validated pipeline configuration; disabled stages become None.
    pub fn pipeline(&self) -> Result<PipelineConfig, ConfigError> {
        Ok(PipelineConfig {
            filter: self.filter.to_filter()?,
            fine: match &self.fine {
                Some(s) => s.to_stage(StageKind::Fine)?,
                None => None,
            },
            coarse: match &self.coarse {
                Some(s) => s.to_stage(StageKind::Coarse)?,
                None => None,
            },
            flag: match &self.flag {
                Some(s) => s.to_stage(StageKind::Flag)?,
                None => None,
            },
            untouched: match &self.untouched {
                Some(s) => s.to_stage(StageKind::Untouched)?,
                None => None,
            },
        })
    }
}
