// Commentary generation: Claude streaming client, typed narrative results,
// and prompt templates built from league analytics.

pub mod client;
pub mod narrative;
pub mod prompt;
