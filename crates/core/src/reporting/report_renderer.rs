use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::classification::domain::demographics::{AgeBucket, Gender};

use super::prediction_summary::PredictionSummary;

const BAR_WIDTH: usize = 40;
const BAR_CHAR: char = '█';
const DEFAULT_RECENT_ROWS: usize = 10;

/// Which parts of the summary a report shows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSections {
    pub stats: bool,
    pub age_chart: bool,
    pub gender_chart: bool,
    pub crosstab: bool,
    pub recent: bool,
}

impl Default for ReportSections {
    fn default() -> Self {
        Self {
            stats: true,
            age_chart: true,
            gender_chart: true,
            crosstab: false,
            recent: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    pub recent_rows: usize,
    pub sections: ReportSections,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            recent_rows: DEFAULT_RECENT_ROWS,
            sections: ReportSections::default(),
        }
    }
}

/// Plain-text report with horizontal bar charts.
pub fn render_text(summary: &PredictionSummary, options: &ReportOptions) -> String {
    let mut out = String::new();
    let sections = &options.sections;

    if sections.stats {
        let _ = writeln!(out, "Total predictions: {}", summary.total);
        for gender in Gender::ALL {
            let _ = writeln!(out, "{:<6} {}", format!("{gender}:"), summary.count(gender));
        }
        out.push('\n');
    }

    if sections.age_chart {
        out.push_str("Age distribution\n");
        let bars: Vec<(String, usize)> = summary
            .ages
            .iter()
            .map(|(age, &n)| (age.to_string(), n))
            .collect();
        push_bars(&mut out, &bars);
        out.push('\n');
    }

    if sections.gender_chart {
        out.push_str("Gender distribution\n");
        let bars: Vec<(String, usize)> = Gender::ALL
            .iter()
            .map(|&g| (g.to_string(), summary.count(g)))
            .collect();
        push_bars(&mut out, &bars);
        out.push('\n');
    }

    if sections.crosstab {
        out.push_str("Age by gender\n");
        let _ = write!(out, "{:<6}", "");
        for gender in Gender::ALL {
            let _ = write!(out, "{:>7}", gender.label());
        }
        out.push('\n');
        for age in AgeBucket::ALL {
            let Some(counts) = summary.crosstab.get(&age) else {
                continue;
            };
            let _ = write!(out, "{:<6}", age.label());
            for gender in Gender::ALL {
                let _ = write!(out, "{:>7}", counts.get(&gender).copied().unwrap_or(0));
            }
            out.push('\n');
        }
        out.push('\n');
    }

    if sections.recent && options.recent_rows > 0 {
        let _ = writeln!(out, "Most recent predictions");
        if summary.recent.is_empty() {
            out.push_str("  (none)\n");
        }
        let skip = summary.recent.len().saturating_sub(options.recent_rows);
        for row in summary.recent.iter().skip(skip) {
            let when = row
                .timestamp
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(out, "  {when:<19}  {:<6} {}", row.age, row.gender);
        }
    }

    out.trim_end().to_string()
}

/// JSON object holding only the enabled sections.
pub fn render_json(
    summary: &PredictionSummary,
    options: &ReportOptions,
) -> Result<String, serde_json::Error> {
    let sections = &options.sections;
    let mut map = serde_json::Map::new();

    if sections.stats {
        map.insert("total".into(), serde_json::to_value(summary.total)?);
    }
    if sections.stats || sections.gender_chart {
        map.insert("genders".into(), serde_json::to_value(&summary.genders)?);
    }
    if sections.age_chart {
        map.insert("ages".into(), serde_json::to_value(&summary.ages)?);
    }
    if sections.crosstab {
        map.insert("crosstab".into(), serde_json::to_value(&summary.crosstab)?);
    }
    if sections.recent {
        let skip = summary.recent.len().saturating_sub(options.recent_rows);
        let recent: Vec<_> = summary.recent.iter().skip(skip).collect();
        map.insert("recent".into(), serde_json::to_value(recent)?);
    }

    serde_json::to_string_pretty(&serde_json::Value::Object(map))
}

fn push_bars(out: &mut String, bars: &[(String, usize)]) {
    if bars.is_empty() {
        out.push_str("  (no data)\n");
        return;
    }
    let max = bars.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);
    let label_width = bars.iter().map(|(l, _)| l.len()).max().unwrap_or(0);
    for (label, n) in bars {
        let len = n * BAR_WIDTH / max;
        let bar: String = std::iter::repeat(BAR_CHAR).take(len).collect();
        let _ = writeln!(out, "  {label:<label_width$} {bar} {n}");
    }
}
