use anyhow::ensure;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use slad::analysis::Aggregated;
use slad::constants::{
    distance_label_short, ALPHA_CORRUPTED, ALPHA_OUTLIER_FREE, DISTANCE_COLORS, N_EUCLIDEAN,
    TUMOR_DISTANCE_NAMES,
};
use slad::problem::{ProblemType, Regime};

const FONT: &str = "sans-serif";
const FONTSIZE_BIG: i32 = 24;
const FONTSIZE_MEDIUM: i32 = 18;
const FONTSIZE_SMALL: i32 = 14;
/// Height of a bar in units of the distance axis
const BAR_HEIGHT: f64 = 0.4;

/// A bar of a panel, one per distance and regime.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub distance_idx: usize,
    pub regime: Regime,
    /// Centre of the bar on the distance axis, the first distance at the top
    pub y: f64,
    pub mean: f64,
    pub std: f64,
}

pub fn bars(aggregated: &Aggregated, value_idx: usize) -> Vec<Bar> {
    //! The bars of the `value_idx`-th value: the outlier-free bar above the
    //! corrupted one for each distance.
    let n = aggregated.distances.len();
    let mut bars = Vec::with_capacity(2 * n);
    for distance_idx in 0..n {
        let y = (n - 1 - distance_idx) as f64;
        for (regime_idx, regime) in Regime::BOTH.into_iter().enumerate() {
            let offset = match regime {
                Regime::OutlierFree => BAR_HEIGHT / 2.,
                Regime::Corrupted => -BAR_HEIGHT / 2.,
            };
            bars.push(Bar {
                distance_idx,
                regime,
                y: y + offset,
                mean: aggregated.means[distance_idx][regime_idx][value_idx],
                std: aggregated.stds[distance_idx][regime_idx][value_idx],
            });
        }
    }
    bars
}

pub fn x_max(bars: &[Bar]) -> f64 {
    //! Upper limit of the value axis fitting all bars with their error.
    let max = bars
        .iter()
        .map(|b| b.mean + b.std)
        .filter(|v| v.is_finite())
        .fold(0., f64::max);
    if max > 0. {
        max * 1.1
    } else {
        1.
    }
}

pub fn coverage_by_level(
    aggregated: &Aggregated,
    levels: &[f64],
    distance_idx: usize,
    regime_idx: usize,
) -> anyhow::Result<Vec<(f64, f64)>> {
    //! The coverage of each credible level averaged over the parameters, the
    //! values being ordered by parameter then level.
    ensure!(
        !levels.is_empty() && aggregated.labels.len() % levels.len() == 0,
        "Found {} values for {} levels",
        aggregated.labels.len(),
        levels.len()
    );
    let n_par = aggregated.labels.len() / levels.len();
    let means = &aggregated.means[distance_idx][regime_idx];
    Ok(levels
        .iter()
        .enumerate()
        .map(|(l, level)| {
            let coverage =
                (0..n_par).map(|p| means[p * levels.len() + l]).sum::<f64>() / n_par as f64;
            (*level, coverage)
        })
        .collect())
}

fn color(distance_idx: usize, alpha: f64) -> RGBAColor {
    let (r, g, b) = DISTANCE_COLORS[distance_idx % DISTANCE_COLORS.len()];
    RGBColor(r, g, b).mix(alpha)
}

fn alpha(regime: Regime) -> f64 {
    match regime {
        Regime::OutlierFree => ALPHA_OUTLIER_FREE,
        Regime::Corrupted => ALPHA_CORRUPTED,
    }
}

fn distance_label(distances: &[String], y: f64) -> String {
    //! The label of the distance drawn at `y`, empty between two distances.
    let n = distances.len() as f64;
    let idx = n - 1. - y;
    if (idx - idx.round()).abs() > 1e-6 || idx.round() < 0. || idx.round() >= n {
        return String::new();
    }
    distance_label_short(&distances[idx.round() as usize]).to_string()
}

fn draw_bar_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    aggregated: &Aggregated,
    value_idx: usize,
    title: &str,
    xlabel: &str,
    ylabels: bool,
    legend: bool,
) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let bars = bars(aggregated, value_idx);
    let n = aggregated.distances.len();
    let x_max = x_max(&bars);
    let max_mean = aggregated.max_mean(value_idx);

    let mut chart = ChartBuilder::on(area)
        .caption(title, (FONT, FONTSIZE_BIG))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(if ylabels { 150 } else { 0 })
        .build_cartesian_2d(0f64..x_max, -0.5f64..(n as f64 - 0.5))?;

    let distances = aggregated.distances.clone();
    chart
        .configure_mesh()
        .disable_y_mesh()
        .x_desc(xlabel)
        .x_labels(4)
        .y_labels(n)
        .y_label_formatter(&|y| distance_label(&distances, *y))
        .label_style((FONT, FONTSIZE_SMALL))
        .axis_desc_style((FONT, FONTSIZE_MEDIUM))
        .draw()?;

    chart.draw_series(bars.iter().map(|bar| {
        Rectangle::new(
            [(0., bar.y - BAR_HEIGHT / 2.), (bar.mean, bar.y + BAR_HEIGHT / 2.)],
            color(bar.distance_idx, alpha(bar.regime)).filled(),
        )
    }))?;
    chart.draw_series(bars.iter().filter(|bar| bar.std > 0.).map(|bar| {
        PathElement::new(
            vec![(bar.mean - bar.std, bar.y), (bar.mean + bar.std, bar.y)],
            BLACK.mix(0.5),
        )
    }))?;

    let value_style = TextStyle::from((FONT, FONTSIZE_SMALL).into_font())
        .pos(Pos::new(HPos::Right, VPos::Center));
    chart.draw_series(bars.iter().filter(|bar| bar.mean != 0.).map(|bar| {
        Text::new(format!("{:.1}", bar.mean), (max_mean * 0.9, bar.y), value_style.clone())
    }))?;

    if n > N_EUCLIDEAN {
        let separator = (n - N_EUCLIDEAN) as f64 - 0.5;
        chart.draw_series(DashedLineSeries::new(
            vec![(0., separator), (x_max, separator)],
            2,
            4,
            BLACK.mix(0.5).stroke_width(1),
        ))?;
    }

    if legend {
        for regime in Regime::BOTH {
            chart
                .draw_series(std::iter::empty::<Rectangle<(f64, f64)>>())?
                .label(regime.label())
                .legend(move |(x, y)| {
                    Rectangle::new(
                        [(x, y - 6), (x + 16, y + 6)],
                        BLACK.mix(alpha(regime) / 2.).filled(),
                    )
                });
        }
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::LowerRight)
            .label_font((FONT, FONTSIZE_SMALL))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

pub fn draw_ess<DB>(root: DrawingArea<DB, Shift>, panels: &[Aggregated]) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    //! One panel per problem with the effective sample size of each distance
    //! in both regimes.
    root.fill(&WHITE)?;
    let areas = root.split_evenly((1, panels.len()));
    for (i, (area, aggregated)) in areas.iter().zip(panels.iter()).enumerate() {
        draw_bar_panel(
            area,
            aggregated,
            0,
            aggregated.problem_type.label(),
            "Effective sample size",
            i == 0,
            i == panels.len() - 1,
        )?;
    }
    root.present()?;
    Ok(())
}

pub fn draw_rmse<DB>(root: DrawingArea<DB, Shift>, panels: &[Aggregated]) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    //! One row per problem and one panel per parameter with the RMSE of each
    //! distance in both regimes.
    root.fill(&WHITE)?;
    let n_cols = panels.iter().map(|p| p.labels.len()).max().unwrap_or(1);
    let areas = root.split_evenly((panels.len(), n_cols));
    for (row, aggregated) in panels.iter().enumerate() {
        for (col, parameter) in aggregated.labels.iter().enumerate() {
            draw_bar_panel(
                &areas[row * n_cols + col],
                aggregated,
                col,
                &format!("{}: {}", aggregated.problem_type.label(), parameter),
                "RMSE",
                col == 0,
                row == panels.len() - 1 && col == aggregated.labels.len() - 1,
            )?;
        }
    }
    root.present()?;
    Ok(())
}

pub fn draw_calibration<DB>(
    root: DrawingArea<DB, Shift>,
    panels: &[Aggregated],
    levels: &[f64],
) -> anyhow::Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    //! One panel per problem with the empirical coverage of the credible
    //! intervals against their level, the diagonal being a perfect
    //! calibration. Dashed lines for the outlier-free regime.
    root.fill(&WHITE)?;
    let areas = root.split_evenly((2, panels.len().div_ceil(2)));
    for (area, aggregated) in areas.iter().zip(panels.iter()) {
        let mut chart = ChartBuilder::on(area)
            .caption(aggregated.problem_type.label(), (FONT, FONTSIZE_BIG))
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..1f64, 0f64..1f64)?;
        chart
            .configure_mesh()
            .x_desc("Credible level")
            .y_desc("Coverage")
            .label_style((FONT, FONTSIZE_SMALL))
            .axis_desc_style((FONT, FONTSIZE_MEDIUM))
            .draw()?;
        chart.draw_series(DashedLineSeries::new(
            vec![(0., 0.), (1., 1.)],
            4,
            4,
            BLACK.mix(0.5).stroke_width(1),
        ))?;

        for (distance_idx, distance) in aggregated.distances.iter().enumerate() {
            if aggregated.problem_type == ProblemType::Tumor
                && !TUMOR_DISTANCE_NAMES.contains(&distance.as_str())
            {
                continue;
            }
            for (regime_idx, regime) in Regime::BOTH.into_iter().enumerate() {
                let points = coverage_by_level(aggregated, levels, distance_idx, regime_idx)?;
                let style = color(distance_idx, alpha(regime)).stroke_width(2);
                match regime {
                    Regime::OutlierFree => {
                        chart.draw_series(DashedLineSeries::new(points, 6, 4, style))?;
                    }
                    Regime::Corrupted => {
                        chart
                            .draw_series(LineSeries::new(points, style))?
                            .label(distance_label_short(distance))
                            .legend(move |(x, y)| {
                                PathElement::new(vec![(x, y), (x + 20, y)], style)
                            });
                    }
                }
            }
        }
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font((FONT, FONTSIZE_SMALL))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregated(labels: &[&str], means: Vec<[Vec<f64>; 2]>) -> Aggregated {
        let stds = means
            .iter()
            .map(|m| [vec![0.5; m[0].len()], vec![0.5; m[1].len()]])
            .collect();
        Aggregated {
            problem_type: ProblemType::Gaussian,
            distances: (0..means.len()).map(|i| format!("d{}", i)).collect(),
            labels: labels.iter().map(|l| l.to_string()).collect(),
            means,
            stds,
        }
    }

    #[test]
    fn outlier_free_bar_above_corrupted() {
        let agg = aggregated(&["ess"], vec![[vec![10.], vec![5.]], [vec![8.], vec![2.]]]);
        let bars = bars(&agg, 0);
        assert_eq!(bars.len(), 4);
        // first distance at the top
        assert!((bars[0].y - 1.2).abs() < 1e-12);
        assert!((bars[1].y - 0.8).abs() < 1e-12);
        assert_eq!(bars[0].regime, Regime::OutlierFree);
        assert_eq!(bars[3].mean, 2.);
        assert!((x_max(&bars) - 10.5 * 1.1).abs() < 1e-12);
    }

    #[test]
    fn empty_panel_axis() {
        let agg = aggregated(&["ess"], vec![[vec![0.], vec![0.]]]);
        let mut bars = bars(&agg, 0);
        bars.iter_mut().for_each(|b| b.std = 0.);
        assert_eq!(x_max(&bars), 1.);
    }

    #[test]
    fn coverage_averaged_over_parameters() {
        let levels = [0.5, 0.9];
        // values ordered a_0.5, a_0.9, b_0.5, b_0.9
        let agg = aggregated(
            &["a_0.50", "a_0.90", "b_0.50", "b_0.90"],
            vec![[vec![0.4, 1., 0.6, 0.8], vec![0., 0.5, 0., 0.5]]],
        );
        let free = coverage_by_level(&agg, &levels, 0, 0).unwrap();
        assert!((free[0].1 - 0.5).abs() < 1e-12);
        assert!((free[1].1 - 0.9).abs() < 1e-12);
        assert_eq!(coverage_by_level(&agg, &levels, 0, 1).unwrap(), vec![(0.5, 0.), (0.9, 0.5)]);
        assert!(coverage_by_level(&agg, &[0.1, 0.2, 0.3], 0, 0).is_err());
    }

    #[test]
    fn labels_only_at_distances() {
        let distances =
            vec!["Calibrated__Euclidean__mad".to_string(), "Adaptive__Manhattan__mad".to_string()];
        assert_eq!(distance_label(&distances, 1.), "L2, Cal., MAD");
        assert_eq!(distance_label(&distances, 0.), "L1, Ada., MAD");
        assert_eq!(distance_label(&distances, 0.5), "");
        assert_eq!(distance_label(&distances, 2.), "");
    }
}
