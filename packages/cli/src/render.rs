//! Turns a pipeline result into the dashboard view the CLI prints.

use std::fmt::Write as _;

use clap::Args;
use serde::Serialize;
use shelter_stats_analytics::{
    AnalyticsError, filter_records, group_by_region, parse_metric, summarize, top_regions,
};
use shelter_stats_analytics_models::{DashboardSummary, RecordFilter, RegionRank, SortOrder};
use shelter_stats_shelter_models::{CapacityLevel, ShelterRecord};
use shelter_stats_source_models::{MissingValuePolicy, NormalizationReport, PayloadShape, PipelineOutput};

/// Presentation options shared by every data-producing subcommand.
#[derive(Debug, Clone, Args)]
pub struct ReportArgs {
    /// Missing-value policy: `keep_missing` or `zero_fill`
    #[arg(long)]
    pub missing_values: Option<MissingValuePolicy>,
    /// Print the full result as JSON instead of a table
    #[arg(long)]
    pub json: bool,
    /// Number of regions to show in the ranking
    #[arg(long, default_value = "10")]
    pub top: usize,
    /// Metric to rank regions by
    #[arg(long, default_value = "occupancy_rate")]
    pub rank_by: String,
    /// Rank lowest values first
    #[arg(long)]
    pub ascending: bool,
    /// Only keep regions whose label contains this text
    #[arg(long)]
    pub region: Option<String>,
    /// Only keep these capacity levels (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub level: Vec<CapacityLevel>,
    /// Minimum occupancy rate (percent)
    #[arg(long)]
    pub min_rate: Option<f64>,
    /// Maximum occupancy rate (percent)
    #[arg(long)]
    pub max_rate: Option<f64>,
    /// Merge rows that share a region label before summarizing
    #[arg(long)]
    pub group_by_region: bool,
}

impl Default for ReportArgs {
    fn default() -> Self {
        Self {
            missing_values: None,
            json: false,
            top: 10,
            rank_by: "occupancy_rate".to_string(),
            ascending: false,
            region: None,
            level: Vec::new(),
            min_rate: None,
            max_rate: None,
            group_by_region: false,
        }
    }
}

impl ReportArgs {
    /// The missing-value policy, falling back to `default`.
    #[must_use]
    pub fn policy_or(&self, default: MissingValuePolicy) -> MissingValuePolicy {
        self.missing_values.unwrap_or(default)
    }

    fn filter(&self) -> RecordFilter {
        RecordFilter {
            region_contains: self.region.clone(),
            levels: self.level.clone(),
            min_rate: self.min_rate,
            max_rate: self.max_rate,
        }
    }
}

/// Everything the CLI prints for one result set.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Label of the data origin (source id, file name, or `sample`).
    pub origin: String,
    /// Shape the records were extracted from.
    pub shape: PayloadShape,
    /// Aggregates over the filtered records.
    pub summary: DashboardSummary,
    /// Nationwide total row reported by the upstream, if any.
    pub total_row: Option<ShelterRecord>,
    /// Ranked regions.
    pub top: Vec<RegionRank>,
    /// Filtered records.
    pub records: Vec<ShelterRecord>,
    /// Normalization diagnostics.
    pub normalization: NormalizationReport,
}

impl Report {
    /// Returns `true` when no regional record survived normalization and
    /// filtering. The upstream total row does not count.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Applies filters, grouping, and ranking to a pipeline result.
///
/// # Errors
///
/// Returns [`AnalyticsError::UnknownMetric`] if `--rank-by` names an unknown
/// metric.
pub fn build_report(
    origin: &str,
    output: PipelineOutput,
    args: &ReportArgs,
) -> Result<Report, AnalyticsError> {
    let metric = parse_metric(&args.rank_by)?;
    let order = if args.ascending {
        SortOrder::Ascending
    } else {
        SortOrder::Descending
    };

    let records = if args.group_by_region {
        group_by_region(&output.records)
    } else {
        output.records
    };
    let records = filter_records(&records, &args.filter());

    Ok(Report {
        origin: origin.to_string(),
        shape: output.shape,
        summary: summarize(&records),
        total_row: output.summary,
        top: top_regions(&records, metric, args.top, order),
        records,
        normalization: output.report,
    })
}

/// Renders a report as JSON.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn render_json(report: &Report) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// Renders a report as a plain-text dashboard.
#[must_use]
pub fn render_table(report: &Report, rank_by: &str) -> String {
    let mut out = String::new();

    if report.is_empty() {
        writeln!(
            out,
            "[{}] No data matched the current filters or response shape ({}).",
            report.origin,
            shape_label(&report.shape)
        )
        .unwrap();
        write_total_row(&mut out, report.total_row.as_ref());
        write_diagnostics(&mut out, &report.normalization);
        return out;
    }

    let s = &report.summary;
    writeln!(out, "Shelter statistics: {}", report.origin).unwrap();
    writeln!(out, "{}", "=".repeat(60)).unwrap();
    writeln!(out, "{:<28} {}", "Regions", s.region_count).unwrap();
    writeln!(out, "{:<28} {}", "Records", s.record_count).unwrap();
    writeln!(
        out,
        "{:<28} {:.0}",
        "Target population", s.total_target_population
    )
    .unwrap();
    writeln!(
        out,
        "{:<28} {:.0}",
        "Shelter-capable population", s.total_shelter_capable_population
    )
    .unwrap();
    writeln!(
        out,
        "{:<28} {:.1}%",
        "Overall occupancy rate", s.overall_occupancy_rate
    )
    .unwrap();
    writeln!(
        out,
        "{:<28} {}",
        "Mean occupancy rate",
        percent(s.mean_occupancy_rate)
    )
    .unwrap();
    writeln!(
        out,
        "{:<28} {} / {} / {}",
        "P25 / median / P75",
        percent(s.p25_occupancy_rate),
        percent(s.median_occupancy_rate),
        percent(s.p75_occupancy_rate)
    )
    .unwrap();
    writeln!(out, "{:<28} {:.0}", "Facilities", s.total_facility_count).unwrap();
    writeln!(out, "{:<28} {:.0}", "Facility area", s.total_facility_area).unwrap();

    writeln!(out).unwrap();
    writeln!(out, "Capacity levels").unwrap();
    for level in &s.level_distribution {
        writeln!(
            out,
            "  {:<14} {:>6}",
            level_label(Some(level.level)),
            level.count
        )
        .unwrap();
    }
    writeln!(
        out,
        "  {:<14} {:>6}",
        level_label(None),
        s.undefined_level_count
    )
    .unwrap();

    if report.total_row.is_some() {
        writeln!(out).unwrap();
        write_total_row(&mut out, report.total_row.as_ref());
    }

    writeln!(out).unwrap();
    writeln!(out, "Top {} by {rank_by}", report.top.len()).unwrap();
    writeln!(
        out,
        "{:>4}  {:<28} {:>14} {:>10}  LEVEL",
        "#", "REGION", "VALUE", "RATE"
    )
    .unwrap();
    writeln!(out, "{}", "-".repeat(72)).unwrap();
    for row in &report.top {
        writeln!(
            out,
            "{:>4}  {:<28} {:>14.1} {:>10}  {}",
            row.rank,
            row.region,
            row.value,
            percent(row.occupancy_rate),
            level_label(row.capacity_level)
        )
        .unwrap();
    }

    writeln!(out).unwrap();
    write_diagnostics(&mut out, &report.normalization);
    out
}

fn write_total_row(out: &mut String, total: Option<&ShelterRecord>) {
    if let Some(total) = total {
        writeln!(
            out,
            "Upstream total row '{}': occupancy {}, {}",
            total.region,
            percent(total.occupancy_rate),
            level_label(total.capacity_level)
        )
        .unwrap();
    }
}

fn write_diagnostics(out: &mut String, report: &NormalizationReport) {
    writeln!(
        out,
        "Rows seen: {}, dropped: {}, blanked fields: {}, zero-target rates: {}",
        report.rows_seen,
        report.dropped_count(),
        report.coercion_failures.len(),
        report.division_guards
    )
    .unwrap();
}

fn shape_label(shape: &PayloadShape) -> String {
    match shape {
        PayloadShape::ArrayItems { path } => format!("items array at {path}"),
        PayloadShape::SingletonWrappedItems { path } => format!("wrapped item at {path}"),
        PayloadShape::EmptyItems { path } => format!("empty items at {path}"),
        PayloadShape::BareArray => "bare array".to_string(),
        PayloadShape::BlockRowArray { key } => format!("row blocks under {key}"),
        PayloadShape::Unrecognized => "unrecognized".to_string(),
    }
}

fn level_label(level: Option<CapacityLevel>) -> String {
    level.map_or_else(
        || "undefined".to_string(),
        |l| format!("{l} ({})", l.local_label()),
    )
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.1}%"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shelter_stats_source::{NormalizeConfig, process_payload, sample::sample_payload};

    use super::*;

    fn sample_output() -> PipelineOutput {
        process_payload(&sample_payload(), &NormalizeConfig::default())
    }

    #[test]
    fn ranks_sample_by_occupancy() {
        let report = build_report("sample", sample_output(), &ReportArgs::default()).unwrap();
        assert_eq!(report.top.len(), 2);
        assert_eq!(report.top[0].region, "서울특별시 종로구");

        let table = render_table(&report, "occupancy_rate");
        assert!(table.contains("서울특별시 종로구"));
        assert!(table.contains("sufficient (충분)"));
        assert!(table.contains("Rows seen: 2, dropped: 0"));
    }

    #[test]
    fn filters_apply_before_summary() {
        let args = ReportArgs {
            level: vec![CapacityLevel::Good],
            ..ReportArgs::default()
        };
        let report = build_report("sample", sample_output(), &args).unwrap();
        assert_eq!(report.summary.record_count, 1);
        assert_eq!(report.records[0].region, "부산광역시 중구");
    }

    #[test]
    fn empty_result_prints_no_data_message() {
        let output = process_payload(&json!({}), &NormalizeConfig::default());
        let report = build_report("file", output, &ReportArgs::default()).unwrap();
        assert!(report.is_empty());
        let table = render_table(&report, "occupancy_rate");
        assert!(table.contains("No data matched"));
        assert!(table.contains("unrecognized"));
    }

    #[test]
    fn filtered_out_regions_print_no_data_message_with_total_row() {
        let payload = json!([
            {"regi": "합계", "target_popl": 1000, "shelt_abl_popl_smry": 1100},
            {"regi": "Seoul", "target_popl": 400, "shelt_abl_popl_smry": 500},
        ]);
        let output = process_payload(&payload, &NormalizeConfig::default());
        let args = ReportArgs {
            region: Some("Nowhere".to_string()),
            ..ReportArgs::default()
        };
        let report = build_report("file", output, &args).unwrap();
        assert!(report.is_empty());
        assert!(report.total_row.is_some());

        let table = render_table(&report, "occupancy_rate");
        assert!(table.contains("No data matched"));
        assert!(table.contains("Upstream total row '합계'"));
        assert!(!table.contains("Top 0"));
    }

    #[test]
    fn unknown_rank_metric_is_an_error() {
        let args = ReportArgs {
            rank_by: "crime_rate".to_string(),
            ..ReportArgs::default()
        };
        assert!(matches!(
            build_report("sample", sample_output(), &args),
            Err(AnalyticsError::UnknownMetric { .. })
        ));
    }

    #[test]
    fn json_output_includes_summary_and_records() {
        let report = build_report("sample", sample_output(), &ReportArgs::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();
        assert_eq!(value["origin"], "sample");
        assert_eq!(value["shape"]["type"], "bare_array");
        assert_eq!(value["summary"]["recordCount"], 2);
        assert_eq!(value["records"][0]["capacity_level"], "sufficient");
    }
}
