// Library root for the huddle binary: provider wiring, dashboard
// orchestration, and report output. Exposed so integration tests can drive
// the full pipeline.

pub mod app;
pub mod espn;
pub mod report;
