use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use serde::{Deserialize, Serialize};

use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct RuleRow {
    #[serde(rename = "Signal", default)]
    signal: Option<String>,
    #[serde(rename = "View", default)]
    view: Option<String>,
    #[serde(rename = "Entry", default)]
    entry: Option<String>,
    #[serde(rename = "Exit", default)]
    exit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub signal: String,
    /// Lower-cased, e.g. "long" or "short".
    pub view: String,
    pub entry: Option<String>,
    pub exit: Option<String>,
}

/// Entry and exit rules of one view of a signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewRules {
    pub view: String,
    pub entries: Vec<String>,
    pub exits: Vec<String>,
}

/// Trading rules per signal. The sheet only names a signal and a view on the
/// first row of each block, so both are carried down to following rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RuleBook {
    rules: Vec<Rule>,
}

fn clean(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl RuleBook {
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Long view first, then short; views without rules are left out.
    pub fn for_signal(&self, signal: &str) -> Vec<ViewRules> {
        ["long", "short"]
            .into_iter()
            .filter_map(|view| {
                let rows: Vec<&Rule> = self
                    .rules
                    .iter()
                    .filter(|r| r.signal == signal && r.view == view)
                    .collect();
                if rows.is_empty() {
                    return None;
                }
                Some(ViewRules {
                    view: view.to_string(),
                    entries: rows.iter().filter_map(|r| r.entry.clone()).collect(),
                    exits: rows.iter().filter_map(|r| r.exit.clone()).collect(),
                })
            })
            .collect()
    }
}

pub fn read_rules<R: Read>(input: R) -> Result<RuleBook> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .flexible(true)
        .from_reader(input);

    let mut rules = Vec::new();
    let mut signal: Option<String> = None;
    let mut view: Option<String> = None;

    for (line, result) in rdr.deserialize::<RuleRow>().enumerate() {
        let row: RuleRow =
            result.with_context(|| format!("failed to deserialize rules row {}", line + 2))?;
        if let Some(s) = clean(row.signal) {
            signal = Some(s);
        }
        if let Some(v) = clean(row.view) {
            view = Some(v.to_lowercase());
        }
        let (Some(signal), Some(view)) = (&signal, &view) else {
            continue;
        };
        rules.push(Rule {
            signal: signal.clone(),
            view: view.clone(),
            entry: clean(row.entry),
            exit: clean(row.exit),
        });
    }

    Ok(RuleBook { rules })
}

pub fn load_rules(input: &Path) -> Result<RuleBook> {
    let file =
        File::open(input).with_context(|| format!("failed to open rules file: {:?}", input))?;
    read_rules(file)
}
