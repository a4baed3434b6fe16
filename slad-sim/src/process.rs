//! Processes that can be simulated and the loop recording their state at the
//! observation times.
use anyhow::{bail, ensure};
use rand_pcg::Pcg64Mcg;

use crate::event::{GillespieTime, ReactionNetwork};
use crate::rate::GillespieRate;
use crate::NbIndividuals;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The state has been recorded at all the observation times
    Completed,
    /// All propensities are zero, the state cannot change anymore
    NoReactionsLeft,
    /// The maximal number of reactions has been simulated before reaching the
    /// last observation time
    MaxIterations,
}

/// The states of the system recorded at the observation times.
#[derive(Debug, Clone)]
pub struct Trajectory<const S: usize> {
    pub timepoints: Vec<GillespieTime>,
    pub states: Vec<[NbIndividuals; S]>,
    pub stop: StopReason,
    pub iterations: usize,
}

impl<const S: usize> Trajectory<S> {
    pub fn species(&self, idx: usize) -> Vec<NbIndividuals> {
        //! The counts of the `idx`-th species over time.
        self.states.iter().map(|state| state[idx]).collect()
    }
}

pub fn simulate<P, const S: usize, const R: usize>(
    process: &P,
    initial_state: [NbIndividuals; S],
    timepoints: &[GillespieTime],
    max_iter: usize,
    rng: &mut Pcg64Mcg,
) -> anyhow::Result<Trajectory<S>>
where
    P: ReactionNetwork<S, R>,
{
    //! Simulate `process` starting from `initial_state` at time 0 and record
    //! the state at each of the sorted `timepoints`.
    //!
    //! When the simulation stops early, either because no reaction can occur
    //! anymore or because `max_iter` reactions have been simulated, the
    //! remaining timepoints record the last state.
    ensure!(
        timepoints.windows(2).all(|w| w[0] <= w[1]),
        "Timepoints must be sorted"
    );
    ensure!(
        timepoints.iter().all(|t| t.is_finite() && *t >= 0.),
        "Timepoints must be finite and positive"
    );

    let mut state = initial_state;
    let mut states = Vec::with_capacity(timepoints.len());
    let mut time: GillespieTime = 0.;
    let mut iterations = 0usize;
    let mut stop = StopReason::Completed;

    while states.len() < timepoints.len() {
        if iterations >= max_iter {
            stop = StopReason::MaxIterations;
            break;
        }
        let event = process.next_event(&state, rng);
        if event.time.is_nan() {
            bail!("Found NaN waiting time with state {:?}", state);
        }
        if event.time.is_infinite() {
            stop = StopReason::NoReactionsLeft;
            break;
        }
        let new_time = time + event.time;
        while states.len() < timepoints.len()
            && timepoints[states.len()] < new_time
        {
            states.push(state);
        }
        process.update(event.kind, &mut state);
        time = new_time;
        iterations += 1;
    }
    while states.len() < timepoints.len() {
        states.push(state);
    }

    Ok(Trajectory {
        timepoints: timepoints.to_vec(),
        states,
        stop,
        iterations,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotkaVolterraReaction {
    /// A prey gives birth to a new prey
    PreyBirth,
    /// A predator eats a prey and gives birth to a new predator
    Predation,
    /// A predator dies
    PredatorDeath,
}

/// Stochastic predator-prey process where the species are `[prey, predator]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LotkaVolterra {
    pub prey_birth: GillespieRate,
    pub predation: GillespieRate,
    pub predator_death: GillespieRate,
}

impl ReactionNetwork<2, 3> for LotkaVolterra {
    type Reaction = LotkaVolterraReaction;

    fn reactions(&self) -> [Self::Reaction; 3] {
        [
            LotkaVolterraReaction::PreyBirth,
            LotkaVolterraReaction::Predation,
            LotkaVolterraReaction::PredatorDeath,
        ]
    }

    fn propensities(&self, state: &[NbIndividuals; 2]) -> [GillespieRate; 3] {
        let [prey, predator] = *state;
        [
            self.prey_birth * prey as f64,
            self.predation * prey as f64 * predator as f64,
            self.predator_death * predator as f64,
        ]
    }

    fn update(&self, reaction: Self::Reaction, state: &mut [NbIndividuals; 2]) {
        match reaction {
            LotkaVolterraReaction::PreyBirth => state[0] += 1,
            LotkaVolterraReaction::Predation => {
                state[0] = state[0].saturating_sub(1);
                state[1] += 1;
            }
            LotkaVolterraReaction::PredatorDeath => {
                state[1] = state[1].saturating_sub(1)
            }
        }
    }
}
