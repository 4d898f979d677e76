//! Plain-text line chart of closing prices with horizontal threshold rules.
use crate::core::price::PriceSeries;

const AXIS_WIDTH: usize = 10;
const PRICE_MARK: char = '•';
const LEVEL_MARK: char = '─';

/// A horizontal rule drawn across the chart.
#[derive(Debug, Clone)]
pub struct Level {
    pub label: String,
    pub price: f64,
}

/// One close per column, taking the last close of each bucket.
fn sample_columns(closes: &[f64], width: usize) -> Vec<f64> {
    if closes.len() <= width {
        return closes.to_vec();
    }
    (0..width)
        .map(|col| closes[(col + 1) * closes.len() / width - 1])
        .collect()
}

/// Renders `series` into at most `width` columns and `height` rows.
///
/// Returns the chart rows followed by an x axis and a line with the first and
/// last dates. An empty series renders nothing.
pub fn render(series: &PriceSeries, levels: &[Level], width: usize, height: usize) -> Vec<String> {
    if series.is_empty() || width == 0 || height < 2 {
        return Vec::new();
    }

    let columns = sample_columns(series.closes(), width);
    let (mut low, mut high) = columns
        .iter()
        .chain(levels.iter().map(|level| &level.price))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    if high - low < f64::EPSILON {
        high += 1.0;
        low -= 1.0;
    }

    let to_row = |price: f64| (((high - price) / (high - low)) * (height - 1) as f64).round() as usize;

    let mut grid = vec![vec![' '; columns.len()]; height];
    let level_rows: Vec<(usize, &Level)> = levels
        .iter()
        .map(|level| (to_row(level.price), level))
        .collect();
    for (row, _) in &level_rows {
        grid[*row].fill(LEVEL_MARK);
    }

    let mut prev_row: Option<usize> = None;
    for (col, close) in columns.iter().enumerate() {
        let row = to_row(*close);
        let (from, to) = prev_row.map_or((row, row), |prev| (prev.min(row), prev.max(row)));
        for line in grid.iter_mut().take(to + 1).skip(from) {
            line[col] = PRICE_MARK;
        }
        prev_row = Some(row);
    }

    let mut lines: Vec<String> = grid
        .into_iter()
        .enumerate()
        .map(|(row, cells)| {
            let on_row: Vec<&Level> = level_rows
                .iter()
                .filter(|(r, _)| *r == row)
                .map(|(_, level)| *level)
                .collect();
            let axis = match on_row.first() {
                Some(level) => format!("{:>AXIS_WIDTH$.2}", level.price),
                None if row == 0 => format!("{high:>AXIS_WIDTH$.2}"),
                None if row == height - 1 => format!("{low:>AXIS_WIDTH$.2}"),
                None => " ".repeat(AXIS_WIDTH),
            };
            let tags = on_row
                .iter()
                .map(|level| level.label.as_str())
                .collect::<Vec<_>>()
                .join("/");
            let plot: String = cells.into_iter().collect();
            format!("{axis} ┤{plot} {tags}").trim_end().to_string()
        })
        .collect();

    lines.push(format!(
        "{} └{}",
        " ".repeat(AXIS_WIDTH),
        "─".repeat(columns.len())
    ));

    if let (Some(first), Some(last)) = (series.dates().first(), series.dates().last()) {
        let first = first.format("%Y-%m-%d").to_string();
        let last = last.format("%Y-%m-%d").to_string();
        let gap = columns.len().saturating_sub(first.len() + last.len()).max(1);
        lines.push(format!(
            "{}  {first}{}{last}",
            " ".repeat(AXIS_WIDTH),
            " ".repeat(gap)
        ));
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn series(closes: &[f64]) -> PriceSeries {
        PriceSeries::from_closes(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), closes).unwrap()
    }

    #[test]
    fn test_empty_series_renders_nothing() {
        assert!(render(&PriceSeries::default(), &[], 40, 10).is_empty());
    }

    #[test]
    fn test_rising_series() {
        let closes: Vec<f64> = (1..=10).map(f64::from).collect();
        let lines = render(&series(&closes), &[], 10, 5);

        assert_eq!(lines.len(), 7);
        assert!(lines[0].contains("10.00"));
        assert!(lines[0].ends_with(PRICE_MARK));
        assert!(lines[4].contains("1.00"));
        assert!(lines[4].contains(&format!("┤{PRICE_MARK}")));
        assert!(lines[6].contains("2024-01-01"));
        assert!(lines[6].contains("2024-01-10"));
    }

    #[test]
    fn test_levels_are_drawn_and_labelled() {
        let closes = vec![100.0; 30];
        let levels = [
            Level {
                label: "KO".to_string(),
                price: 100.0,
            },
            Level {
                label: "Strike".to_string(),
                price: 80.0,
            },
        ];
        let lines = render(&series(&closes), &levels, 30, 5);

        assert!(lines[0].contains("100.00"));
        assert!(lines[0].ends_with("KO"));
        assert!(lines[4].contains("80.00"));
        assert!(lines[4].contains(&LEVEL_MARK.to_string().repeat(30)));
        assert!(lines[4].ends_with("Strike"));
    }

    #[test]
    fn test_long_series_is_sampled_to_width() {
        let closes: Vec<f64> = (1..=1000).map(f64::from).collect();
        let lines = render(&series(&closes), &[], 50, 8);
        let axis = &lines[8];
        assert_eq!(axis.chars().filter(|c| *c == '─').count(), 50);
    }

    #[test]
    fn test_sample_columns_keeps_last_close() {
        let closes: Vec<f64> = (1..=10).map(f64::from).collect();
        assert_eq!(sample_columns(&closes, 5), vec![2.0, 4.0, 6.0, 8.0, 10.0]);
        assert_eq!(sample_columns(&closes[..3], 5), vec![1.0, 2.0, 3.0]);
    }
}
