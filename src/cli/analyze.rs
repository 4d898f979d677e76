use super::chart::{self, Level};
use super::ui;
use crate::core::analysis::{self, StructureParams, TickerReport};
use crate::core::{DescriptionProvider, Fundamentals, HistoryProvider, ProfileProvider};
use anyhow::{Result, bail};
use chrono::NaiveDate;
use comfy_table::Cell;
use futures::future::join_all;
use tracing::{debug, info, warn};

const CHART_HEIGHT: usize = 12;
/// Room for the price axis and the level labels beside the chart.
const AXIS_MARGIN: usize = 24;

/// Options that shape a run but not the backtest itself.
#[derive(Debug, Clone)]
pub struct AnalyzeOptions {
    pub start: NaiveDate,
    pub chart_years: u32,
    pub json: bool,
}

/// Reports for the tickers that could be fetched, and the errors of those that could not.
#[derive(Debug)]
pub struct AnalysisOutcome {
    pub reports: Vec<TickerReport>,
    pub failed: Vec<(String, String)>,
}

impl AnalysisOutcome {
    /// Warning naming the tickers that could not be fetched, if any.
    pub fn failure_warning(&self) -> Option<String> {
        if self.failed.is_empty() {
            return None;
        }
        let symbols: Vec<&str> = self.failed.iter().map(|(s, _)| s.as_str()).collect();
        Some(format!("Could not fetch data for: {}", symbols.join(", ")))
    }
}

impl TickerReport {
    fn levels(&self) -> Vec<Level> {
        let mut levels = vec![
            Level {
                label: "KO".to_string(),
                price: self.thresholds.ko_price,
            },
            Level {
                label: "Strike".to_string(),
                price: self.thresholds.strike_price,
            },
        ];
        if let Some(ki_price) = self.thresholds.knock_in() {
            levels.push(Level {
                label: "KI".to_string(),
                price: ki_price,
            });
        }
        levels
    }

    pub fn display(&self, params: &StructureParams, chart_width: usize) -> String {
        let title = match &self.short_name {
            Some(name) => format!("{} ({name})", self.symbol),
            None => self.symbol.clone(),
        };
        let ki_display = self
            .thresholds
            .knock_in()
            .map_or("none".to_string(), |p| format!("{p:.2}"));

        let mut output = format!(
            "{}\n\n{}\n\n",
            ui::style_text(&title, ui::StyleType::Title),
            ui::style_text(
                &format!(
                    "Latest: {:.2} {} | KO: {:.2} | Strike: {:.2} | KI: {}",
                    self.reference_price,
                    self.currency,
                    self.thresholds.ko_price,
                    self.thresholds.strike_price,
                    ki_display
                ),
                ui::StyleType::Label
            )
        );

        for line in chart::render(&self.chart, &self.levels(), chart_width, CHART_HEIGHT) {
            output.push_str(&line);
            output.push('\n');
        }

        output.push('\n');
        output.push_str(&self.metrics_table(params).to_string());

        if let Some(fundamentals) = &self.fundamentals {
            output.push_str("\n\n");
            output.push_str(&fundamentals_table(fundamentals).to_string());
        }

        let description = self
            .description
            .as_deref()
            .map_or(ui::style_text("N/A", ui::StyleType::Subtle), str::to_string);
        output.push_str(&format!(
            "\n\n{} {}",
            ui::style_text("Business:", ui::StyleType::Label),
            description
        ));

        output
    }

    fn metrics_table(&self, params: &StructureParams) -> comfy_table::Table {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Backtest"), ui::header_cell("Value")]);

        table.add_row(vec![
            Cell::new(format!(
                "Probability of closing at or above strike after {} months",
                params.period_months
            )),
            ui::probability_cell(self.profit_probability),
        ]);
        table.add_row(vec![
            Cell::new("Ever closed below strike"),
            ui::breached_cell(self.breach.strike.breached),
        ]);
        table.add_row(vec![
            Cell::new("Strike recovery (trading days)"),
            ui::recovery_cell(self.breach.strike.breached, self.breach.strike.recovery_days),
        ]);

        if self.thresholds.ki_enabled {
            table.add_row(vec![
                Cell::new("Ever closed below KI"),
                ui::breached_cell(self.breach.knock_in.breached),
            ]);
            table.add_row(vec![
                Cell::new("KI recovery (trading days)"),
                ui::recovery_cell(
                    self.breach.knock_in.breached,
                    self.breach.knock_in.recovery_days,
                ),
            ]);
        }

        table.add_row(vec![
            Cell::new("Observations"),
            Cell::new(self.observations.to_string()),
        ]);
        table
    }
}

fn fundamentals_table(fundamentals: &Fundamentals) -> comfy_table::Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("EPS"),
        ui::header_cell("P/E"),
        ui::header_cell("EPS next Y"),
        ui::header_cell("Forward P/E"),
        ui::header_cell("Gross Margin"),
        ui::header_cell("Debt/Eq"),
    ]);
    table.add_row(vec![
        ui::format_optional_cell(fundamentals.trailing_eps, |v| format!("${v:.2}")),
        ui::format_optional_cell(fundamentals.trailing_pe, |v| format!("{v:.2}")),
        ui::format_optional_cell(fundamentals.forward_eps, |v| format!("${v:.2}")),
        ui::format_optional_cell(fundamentals.forward_pe, |v| format!("{v:.2}")),
        ui::format_optional_cell(fundamentals.gross_margin, |v| format!("{:.2}%", v * 100.0)),
        ui::format_optional_cell(fundamentals.debt_to_equity, |v| format!("{v:.2}")),
    ]);
    table
}

/// Backtest for one ticker, enriched with best-effort fundamentals and description.
///
/// The description prefers MoneyDJ, then Yahoo's business summary.
async fn analyze_ticker(
    symbol: &str,
    params: &StructureParams,
    options: &AnalyzeOptions,
    history_provider: &(dyn HistoryProvider + Send + Sync),
    profile_provider: &(dyn ProfileProvider + Send + Sync),
    description_provider: &(dyn DescriptionProvider + Send + Sync),
) -> Result<TickerReport> {
    let history = history_provider.fetch_history(symbol, options.start).await?;
    let mut report = analysis::build_report(&history, params, options.chart_years)?;

    let (fundamentals, description) = futures::join!(
        profile_provider.fetch_fundamentals(symbol),
        description_provider.fetch_description(symbol)
    );
    let fundamentals = fundamentals
        .inspect_err(|e| debug!("Fundamentals unavailable for {}: {}", symbol, e))
        .ok();
    report.description = description
        .inspect_err(|e| debug!("Description unavailable for {}: {}", symbol, e))
        .ok()
        .flatten()
        .or_else(|| {
            fundamentals
                .as_ref()
                .and_then(|f| f.business_summary.clone())
        });
    report.fundamentals = fundamentals;
    Ok(report)
}

/// Fetches every ticker concurrently and runs the backtest on each history.
///
/// Tickers whose history cannot be fetched are collected in `failed`; it is
/// an error only when none succeed.
pub async fn collect_reports(
    tickers: &[String],
    params: &StructureParams,
    options: &AnalyzeOptions,
    history_provider: &(dyn HistoryProvider + Send + Sync),
    profile_provider: &(dyn ProfileProvider + Send + Sync),
    description_provider: &(dyn DescriptionProvider + Send + Sync),
) -> Result<AnalysisOutcome> {
    let pb = ui::new_progress_bar(tickers.len() as u64);
    pb.set_message("Fetching price history...");

    let report_futures = tickers.iter().map(|symbol| {
        let pb_clone = pb.clone();
        async move {
            let report = analyze_ticker(
                symbol,
                params,
                options,
                history_provider,
                profile_provider,
                description_provider,
            )
            .await;
            pb_clone.inc(1);
            (symbol.clone(), report)
        }
    });

    let results = join_all(report_futures).await;
    pb.finish_and_clear();

    let mut outcome = AnalysisOutcome {
        reports: Vec::new(),
        failed: Vec::new(),
    };
    for (symbol, result) in results {
        match result {
            Ok(report) => outcome.reports.push(report),
            Err(e) => {
                warn!("Analysis failed for {}: {}", symbol, e);
                outcome.failed.push((symbol, e.to_string()));
            }
        }
    }

    if outcome.reports.is_empty() {
        let symbols: Vec<&str> = outcome.failed.iter().map(|(s, _)| s.as_str()).collect();
        bail!(
            "Could not fetch data for any ticker: {}",
            symbols.join(", ")
        );
    }
    Ok(outcome)
}

pub async fn run(
    tickers: &[String],
    params: &StructureParams,
    options: &AnalyzeOptions,
    history_provider: &(dyn HistoryProvider + Send + Sync),
    profile_provider: &(dyn ProfileProvider + Send + Sync),
    description_provider: &(dyn DescriptionProvider + Send + Sync),
) -> Result<()> {
    info!("Analyzing {} tickers from {}", tickers.len(), options.start);

    let outcome = collect_reports(
        tickers,
        params,
        options,
        history_provider,
        profile_provider,
        description_provider,
    )
    .await?;

    // With --json the warning goes to stderr so stdout stays parseable
    if let Some(warning) = outcome.failure_warning() {
        let warning = ui::style_text(&warning, ui::StyleType::Warning);
        if options.json {
            eprintln!("{warning}");
        } else {
            println!("{warning}");
        }
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&outcome.reports)?);
        return Ok(());
    }

    let chart_width = ui::term_width().saturating_sub(AXIS_MARGIN).clamp(20, 120);
    let num_reports = outcome.reports.len();
    for (i, report) in outcome.reports.iter().enumerate() {
        println!("\n{}", report.display(params, chart_width));
        if i < num_reports - 1 {
            ui::print_separator();
        }
    }

    println!(
        "\n{}",
        ui::style_text(
            &format!(
                "Backtest from {} using Yahoo Finance closes. Prices cached for the session. \
                 For education and simulation only, not investment advice.",
                options.start
            ),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}
