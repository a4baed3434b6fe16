//! A tumour spheroid growing in two dimensions, described by concentric
//! layers of cells and the extracellular matrix (ECM) they produce.
//!
//! Only the cells close enough to the rim and surrounded by enough ECM
//! divide, the daughter cells are pushed to the rim and enlarge the spheroid.
//! The data are the radius over time and, at the end of the simulation, the
//! fraction of proliferating cells and the ECM density in function of the
//! distance to the rim.
use anyhow::{ensure, Context};
use rand_distr::{Binomial, Distribution};
use rand_pcg::Pcg64Mcg;
use std::f64::consts::PI;

use crate::models::{add_gaussian_noise, exp_parameters};
use crate::outlier::{ErrorKind, ErrorModel};
use crate::problem::{Parameter, Prior, Problem, ProblemType, SumStats};

/// Diameter of a cell in μm
pub const CELL_SIZE: f64 = 10.;
/// Time step in hours
pub const DT: f64 = 1.;
/// Simulated time in hours
pub const MAX_TIME: usize = 480;
/// The radius is recorded every `RECORD_EVERY` hours
pub const RECORD_EVERY: usize = 24;
/// Width in μm of the bins of the profiles
pub const PROFILE_BIN: f64 = 20.;
pub const N_BINS: usize = 20;
/// The spheroid cannot grow beyond this number of layers
pub const MAX_LAYERS: usize = 2000;
/// Relative standard deviation of the measurement noise
pub const RELATIVE_NOISE: f64 = 0.05;

const NAMES: [&str; 7] = [
    "log_division_rate",
    "log_division_depth",
    "log_initial_spheroid_radius",
    "log_initial_quiescent_cell_fraction",
    "log_ecm_production_rate",
    "log_ecm_degradation_rate",
    "log_ecm_division_threshold",
];

#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(derive(Debug), build_fn(validate = "Self::validate"))]
pub struct TumorErrorProblem {
    /// Add relative gaussian noise to the simulations
    #[builder(default = "true")]
    pub noisy: bool,
    /// Fraction of the observations corrupted by outliers
    #[builder(default = "0.1")]
    pub frac_error: f64,
}

impl TumorErrorProblemBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(frac) = self.frac_error {
            if !(0. ..=1.).contains(&frac) {
                return Err(format!("Fraction of errors {} not in [0, 1]", frac));
            }
        }
        Ok(())
    }
}

impl Default for TumorErrorProblem {
    fn default() -> Self {
        TumorErrorProblem { noisy: true, frac_error: 0.1 }
    }
}

impl TumorErrorProblem {
    /// Outliers are the observations multiplied by a factor in
    /// `[LOW_FACTOR, HIGH_FACTOR)`
    pub const LOW_FACTOR: f64 = 2.;
    pub const HIGH_FACTOR: f64 = 5.;
}

impl Problem for TumorErrorProblem {
    fn name(&self) -> ProblemType {
        ProblemType::Tumor
    }

    fn get_prior_bounds(&self) -> Prior {
        Prior::new(&[
            (NAMES[0], -3., -1.),
            (NAMES[1], 1., 3.),
            (NAMES[2], 0., 1.2),
            (NAMES[3], -5., 0.),
            (NAMES[4], -5., 0.),
            (NAMES[5], -5., 0.),
            (NAMES[6], -5., 0.),
        ])
    }

    fn get_gt_par(&self) -> Parameter {
        Parameter::from([
            (NAMES[0], 4.17e-2f64.log10()),
            (NAMES[1], 100f64.log10()),
            (NAMES[2], 12f64.log10()),
            (NAMES[3], 0.75f64.log10()),
            (NAMES[4], 5e-3f64.log10()),
            (NAMES[5], 8e-4f64.log10()),
            (NAMES[6], 1e-2f64.log10()),
        ])
    }

    fn get_y_keys(&self) -> Vec<String> {
        vec![
            "extracellular_matrix_profile".to_string(),
            "growth_curve".to_string(),
            "proliferation_profile".to_string(),
        ]
    }

    /// The flag is capitalised, as in the names of the run directories
    /// written by the sampler, e.g. `tumor_True_0.1`.
    fn get_id(&self) -> String {
        let noisy = if self.noisy { "True" } else { "False" };
        format!("tumor_{}_{}", noisy, self.frac_error)
    }

    fn error_model(&self) -> ErrorModel {
        ErrorModel::new(ErrorKind::Fraction {
            frac: self.frac_error,
            low: Self::LOW_FACTOR,
            high: Self::HIGH_FACTOR,
        })
    }

    fn simulate(
        &self,
        par: &Parameter,
        rng: &mut Pcg64Mcg,
    ) -> anyhow::Result<SumStats> {
        let rates = TumorRates::try_from(par)?;
        let mut spheroid =
            Spheroid::new(rates.initial_radius, rates.initial_quiescent_fraction);

        let mut growth_curve = Vec::with_capacity(MAX_TIME / RECORD_EVERY);
        for hour in 1..=MAX_TIME {
            spheroid
                .step(&rates, rng)
                .with_context(|| format!("Cannot grow the spheroid at hour {}", hour))?;
            if hour % RECORD_EVERY == 0 {
                growth_curve.push(spheroid.radius());
            }
        }
        let (mut proliferation, mut ecm) = spheroid.profiles(&rates);

        if self.noisy {
            for values in [&mut growth_curve, &mut proliferation, &mut ecm] {
                add_relative_noise(values, rng)?;
            }
        }

        let mut data = SumStats::default();
        data.insert("growth_curve", growth_curve);
        data.insert("proliferation_profile", proliferation);
        data.insert("extracellular_matrix_profile", ecm);
        Ok(data)
    }
}

fn add_relative_noise(values: &mut [f64], rng: &mut Pcg64Mcg) -> anyhow::Result<()> {
    //! Multiply each value by `1 + ε` with `ε ~ N(0, RELATIVE_NOISE²)`.
    let mut factors = vec![1.; values.len()];
    add_gaussian_noise(&mut factors, RELATIVE_NOISE, rng)?;
    for (v, f) in values.iter_mut().zip(factors) {
        *v *= f;
    }
    Ok(())
}

/// The parameters of the spheroid growth on linear scale.
#[derive(Debug, Clone, PartialEq)]
pub struct TumorRates {
    /// Divisions per hour of a proliferating cell
    pub division_rate: f64,
    /// Maximal distance to the rim in μm for a cell to divide
    pub division_depth: f64,
    /// In cell diameters
    pub initial_radius: f64,
    pub initial_quiescent_fraction: f64,
    /// ECM produced per hour by a full layer
    pub ecm_production_rate: f64,
    pub ecm_degradation_rate: f64,
    /// Minimal ECM density for a cell to divide
    pub ecm_division_threshold: f64,
}

impl TryFrom<&Parameter> for TumorRates {
    type Error = anyhow::Error;

    fn try_from(par: &Parameter) -> Result<Self, Self::Error> {
        let [division_rate, division_depth, initial_radius, initial_quiescent_fraction, ecm_production_rate, ecm_degradation_rate, ecm_division_threshold] =
            exp_parameters(par, NAMES, 10.)?;
        ensure!(
            initial_quiescent_fraction <= 1.,
            "Found quiescent fraction {} greater than one",
            initial_quiescent_fraction
        );
        Ok(TumorRates {
            division_rate,
            division_depth,
            initial_radius,
            initial_quiescent_fraction,
            ecm_production_rate,
            ecm_degradation_rate,
            ecm_division_threshold,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct Layer {
    proliferating: u64,
    quiescent: u64,
    ecm: f64,
}

impl Layer {
    fn cells(&self) -> u64 {
        self.proliferating + self.quiescent
    }
}

fn capacity(layer: usize) -> u64 {
    //! Number of cells fitting in the ring of the `layer`-th layer.
    ((2. * PI * (layer as f64 + 0.5)).round() as u64).max(1)
}

#[derive(Debug, Clone)]
struct Spheroid {
    layers: Vec<Layer>,
}

impl Spheroid {
    fn new(radius: f64, quiescent_fraction: f64) -> Self {
        //! Full layers up to `radius`, measured in cell diameters.
        let nb_layers = (radius.ceil() as usize).clamp(1, MAX_LAYERS);
        let layers = (0..nb_layers)
            .map(|k| {
                let cap = capacity(k);
                let quiescent =
                    ((quiescent_fraction * cap as f64).round() as u64).min(cap);
                Layer { proliferating: cap - quiescent, quiescent, ecm: 0. }
            })
            .collect();
        Spheroid { layers }
    }

    fn radius_in_layers(&self) -> f64 {
        let last = self.layers.len() - 1;
        last as f64 + self.layers[last].cells() as f64 / capacity(last) as f64
    }

    fn radius(&self) -> f64 {
        //! Radius in μm.
        self.radius_in_layers() * CELL_SIZE
    }

    fn depth(&self, layer: usize) -> f64 {
        //! Distance in μm from the centre of `layer` to the rim.
        ((self.radius_in_layers() - (layer as f64 + 0.5)) * CELL_SIZE).max(0.)
    }

    fn can_divide(&self, layer: usize, rates: &TumorRates) -> bool {
        self.depth(layer) < rates.division_depth
            && self.layers[layer].ecm >= rates.ecm_division_threshold
    }

    fn step(&mut self, rates: &TumorRates, rng: &mut Pcg64Mcg) -> anyhow::Result<()> {
        let p_division = 1. - (-rates.division_rate * DT).exp();
        let mut new_cells = 0u64;
        for k in 0..self.layers.len() {
            let proliferating = self.layers[k].proliferating;
            if proliferating > 0 && self.can_divide(k, rates) {
                new_cells += Binomial::new(proliferating, p_division)?.sample(rng);
            }
        }

        for (k, layer) in self.layers.iter_mut().enumerate() {
            let density = layer.cells() as f64 / capacity(k) as f64;
            layer.ecm += DT
                * (rates.ecm_production_rate * density
                    - rates.ecm_degradation_rate * layer.ecm);
        }

        self.push_to_rim(new_cells);
        Ok(())
    }

    fn push_to_rim(&mut self, mut new_cells: u64) {
        //! Fill the outer layer with proliferating cells and add new layers
        //! until all the cells are placed or the maximal size is reached.
        while new_cells > 0 {
            let last = self.layers.len() - 1;
            let free = capacity(last) - self.layers[last].cells();
            if free == 0 {
                if self.layers.len() == MAX_LAYERS {
                    return;
                }
                self.layers.push(Layer::default());
                continue;
            }
            let placed = free.min(new_cells);
            self.layers[last].proliferating += placed;
            new_cells -= placed;
        }
    }

    fn profiles(&self, rates: &TumorRates) -> (Vec<f64>, Vec<f64>) {
        //! Fraction of cells able to divide and mean ECM density per bin of
        //! distance to the rim, zero for bins without cells.
        let mut cells = [0u64; N_BINS];
        let mut dividing = [0u64; N_BINS];
        let mut ecm = [0f64; N_BINS];
        let mut nb_layers = [0usize; N_BINS];
        for (k, layer) in self.layers.iter().enumerate() {
            let bin = (self.depth(k) / PROFILE_BIN).floor() as usize;
            if bin >= N_BINS {
                continue;
            }
            cells[bin] += layer.cells();
            if self.can_divide(k, rates) {
                dividing[bin] += layer.proliferating;
            }
            ecm[bin] += layer.ecm;
            nb_layers[bin] += 1;
        }
        let proliferation = cells
            .iter()
            .zip(dividing.iter())
            .map(|(c, d)| if *c == 0 { 0. } else { *d as f64 / *c as f64 })
            .collect();
        let ecm = ecm
            .iter()
            .zip(nb_layers.iter())
            .map(|(e, n)| if *n == 0 { 0. } else { e / *n as f64 })
            .collect();
        (proliferation, ecm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_util::{check_obs, check_simulation_shape};
    use rand::SeedableRng;

    fn gt_rates() -> TumorRates {
        TumorRates::try_from(&TumorErrorProblem::default().get_gt_par()).unwrap()
    }

    #[quickcheck]
    fn tumor_simulation_shape(seed: u64) -> bool {
        check_simulation_shape(&TumorErrorProblem::default().into(), seed)
    }

    #[test]
    fn builder_defaults_and_validation() {
        let problem = TumorErrorProblemBuilder::default().build().unwrap();
        assert_eq!(problem, TumorErrorProblem::default());
        assert_eq!(problem.get_id(), "tumor_True_0.1");
        let free = TumorErrorProblemBuilder::default()
            .frac_error(0.)
            .build()
            .unwrap();
        assert_eq!(free.get_id(), "tumor_True_0");
        let smooth = TumorErrorProblemBuilder::default().noisy(false).build().unwrap();
        assert_eq!(smooth.get_id(), "tumor_False_0.1");
        assert!(TumorErrorProblemBuilder::default().frac_error(1.5).build().is_err());
    }

    #[test]
    fn data_lengths() {
        let problem = TumorErrorProblemBuilder::default().noisy(false).build().unwrap();
        let mut rng = Pcg64Mcg::seed_from_u64(26);
        let data = problem.simulate(&problem.get_gt_par(), &mut rng).unwrap();
        assert_eq!(data.get("growth_curve").unwrap().len(), MAX_TIME / RECORD_EVERY);
        assert_eq!(data.get("proliferation_profile").unwrap().len(), N_BINS);
        assert_eq!(data.get("extracellular_matrix_profile").unwrap().len(), N_BINS);
    }

    #[test]
    fn spheroid_grows_without_noise() {
        let problem = TumorErrorProblemBuilder::default().noisy(false).build().unwrap();
        let mut rng = Pcg64Mcg::seed_from_u64(26);
        let data = problem.simulate(&problem.get_gt_par(), &mut rng).unwrap();
        let growth = data.get("growth_curve").unwrap();
        assert!(growth.windows(2).all(|w| w[0] <= w[1]));
        assert!(growth[growth.len() - 1] > 12. * CELL_SIZE);
        assert!(data
            .get("proliferation_profile")
            .unwrap()
            .iter()
            .all(|p| (0. ..=1.).contains(p)));
    }

    #[test]
    fn initial_spheroid_full_layers() {
        let spheroid = Spheroid::new(2.5, 0.5);
        assert_eq!(spheroid.layers.len(), 3);
        // capacities 3, 9, 16
        assert_eq!(spheroid.layers[0], Layer { proliferating: 1, quiescent: 2, ecm: 0. });
        assert_eq!(spheroid.layers[2].cells(), 16);
        assert_eq!(spheroid.radius(), 3. * CELL_SIZE);
        assert_eq!(spheroid.depth(2), 0.5 * CELL_SIZE);
    }

    #[test]
    fn push_to_rim_adds_layers() {
        let mut spheroid = Spheroid::new(1., 0.);
        spheroid.push_to_rim(10);
        // 3 cells in the first layer, 9 in the second, 1 in the third
        assert_eq!(spheroid.layers.len(), 3);
        assert_eq!(spheroid.layers[1].proliferating, 9);
        assert_eq!(spheroid.layers[2].proliferating, 1);
    }

    #[test]
    fn quiescent_cells_do_not_divide() {
        let mut spheroid = Spheroid::new(3., 1.);
        let mut rates = gt_rates();
        rates.ecm_division_threshold = 0.;
        let mut rng = Pcg64Mcg::seed_from_u64(26);
        for _ in 0..100 {
            spheroid.step(&rates, &mut rng).unwrap();
        }
        assert_eq!(spheroid.layers.len(), 3);
        assert_eq!(spheroid.radius(), 3. * CELL_SIZE);
    }

    #[test]
    fn obs_with_fraction_of_outliers() {
        let corrupted = TumorErrorProblem::default().get_obs_with_outliers().unwrap();
        // round(0.1 * 60)
        assert_eq!(corrupted.outliers.len(), 6);
        for (key, idx) in corrupted.outliers.iter() {
            assert_ne!(corrupted.data.get(key).unwrap()[*idx], 0.);
        }
        check_obs(
            &TumorErrorProblem::default().into(),
            &TumorErrorProblemBuilder::default().frac_error(0.).build().unwrap().into(),
        );
    }
}
