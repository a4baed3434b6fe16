//! Settings shared by the analyses: the distances, the layout of the run
//! databases and the labels and colours of the figures.

/// Number of repetitions of each analysis
pub const N_REP: usize = 20;
/// Directory of the run databases
pub const DATA_DIR: &str = "data_robust";
/// Directory of the run databases using the histogram-based data
pub const DATA_DIR_HIST: &str = "data_hist";
pub const FIGURES_DIR: &str = "figures_robust";

/// The distances compared, Euclidean first then Manhattan.
pub const DISTANCE_NAMES: [&str; 8] = [
    "Calibrated__Euclidean__mad",
    "Adaptive__Euclidean__mad",
    "Adaptive__Euclidean__cmad",
    "Adaptive__Euclidean__mad_or_cmad",
    "Calibrated__Manhattan__mad",
    "Adaptive__Manhattan__mad",
    "Adaptive__Manhattan__cmad",
    "Adaptive__Manhattan__mad_or_cmad",
];

/// The subset of distances run on the expensive tumour problem.
pub const TUMOR_DISTANCE_NAMES: [&str; 4] = [
    "Calibrated__Euclidean__mad",
    "Adaptive__Euclidean__mad",
    "Adaptive__Manhattan__mad",
    "Adaptive__Manhattan__mad_or_cmad",
];

/// Number of Euclidean distances in `DISTANCE_NAMES`, after which a separator
/// is drawn in the figures.
pub const N_EUCLIDEAN: usize = 4;

pub fn distance_label_short(name: &str) -> &'static str {
    match name {
        "Calibrated__Euclidean__mad" => "L2, Cal., MAD",
        "Adaptive__Euclidean__mad" => "L2, Ada., MAD",
        "Adaptive__Euclidean__cmad" => "L2, Ada., CMAD",
        "Adaptive__Euclidean__mad_or_cmad" => "L2, Ada., (C)MAD",
        "Calibrated__Manhattan__mad" => "L1, Cal., MAD",
        "Adaptive__Manhattan__mad" => "L1, Ada., MAD",
        "Adaptive__Manhattan__cmad" => "L1, Ada., CMAD",
        "Adaptive__Manhattan__mad_or_cmad" => "L1, Ada., (C)MAD",
        _ => "unknown",
    }
}

/// One colour per distance in the order of `DISTANCE_NAMES`, the same scale
/// sharing a hue across the two norms.
pub const DISTANCE_COLORS: [(u8, u8, u8); 8] = [
    (31, 119, 180),
    (255, 127, 14),
    (44, 160, 44),
    (214, 39, 40),
    (23, 190, 207),
    (255, 187, 120),
    (152, 223, 138),
    (255, 152, 150),
];

/// Opacity of the bars of the outlier-free regime.
pub const ALPHA_OUTLIER_FREE: f64 = 0.3;
/// Opacity of the bars of the outlier-corrupted regime.
pub const ALPHA_CORRUPTED: f64 = 0.8;

/// Levels of the credible intervals used to assess the calibration.
pub fn credible_levels() -> Vec<f64> {
    (1..=19).map(|i| i as f64 * 0.05).collect()
}
