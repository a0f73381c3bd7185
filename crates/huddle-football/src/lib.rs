// Season analytics for head-to-head fantasy football leagues.
//
// Everything here is a pure function of a `LeagueSnapshot`; the only
// randomness is the playoff simulator's seedable generator.

pub mod awards;
pub mod power;
pub mod roi;
pub mod simulation;
pub mod standings;

#[cfg(test)]
mod fixtures;
