//! Events simulated by the reaction network, also known as reactions in the
//! chemical litterature (see Gillespie 2007).
use crate::{rate::GillespieRate, NbIndividuals};
use rand_pcg::Pcg64Mcg;

/// The time sampled from Gillespie for the next `Event`. This time does not
/// represent actual time but it is relative to the previous simulated `Event`.
pub type GillespieTime = f64;

/// The action that will be simulated (reaction in the chemical literature)
/// determined by Gillespie sampling algorithm.
#[derive(Clone, Debug, PartialEq)]
pub struct Event<R> {
    /// The type of action simulated
    pub kind: R,
    /// The time of appearance of this event (Gillespie time) relative to the
    /// previous simulated `Event`
    pub time: GillespieTime,
}

/// A network of `R` reactions acting on `S` species.
pub trait ReactionNetwork<const S: usize, const R: usize> {
    type Reaction: Copy + std::fmt::Debug + PartialEq;

    /// The reactions in the same order as the propensities.
    fn reactions(&self) -> [Self::Reaction; R];

    /// The rate of each reaction given the current state of the system.
    fn propensities(&self, state: &[NbIndividuals; S]) -> [GillespieRate; R];

    /// Apply the stoichiometry of `reaction` to `state`.
    fn update(&self, reaction: Self::Reaction, state: &mut [NbIndividuals; S]);

    fn compute_times_events(
        &self,
        state: &[NbIndividuals; S],
        rng: &mut Pcg64Mcg,
    ) -> ([GillespieTime; R], [Self::Reaction; R]) {
        //! Compute the next reaction times with the associated reactions
        let propensities = self.propensities(state);
        let mut times = [f64::INFINITY; R];
        for (time, propensity) in times.iter_mut().zip(propensities) {
            *time = crate::rate::exprand(propensity, rng);
        }
        (times, self.reactions())
    }

    fn next_event(
        &self,
        state: &[NbIndividuals; S],
        rng: &mut Pcg64Mcg,
    ) -> Event<Self::Reaction> {
        //! Determine the next `Event` using the first-reaction Gillespie
        //! algorithm: the reaction with the smallest waiting time occurs.
        let (times, events) = self.compute_times_events(state, rng);

        let mut selected_event = 0_usize;
        let mut smaller_waiting_time = times[selected_event];
        for (idx, &waiting_time) in times.iter().enumerate() {
            if waiting_time < smaller_waiting_time
                || smaller_waiting_time.is_nan()
            {
                smaller_waiting_time = waiting_time;
                selected_event = idx;
            }
        }
        Event { kind: events[selected_event], time: smaller_waiting_time }
    }
}
