mod docs_scenario;
mod resolutions;
mod stacked_sessions;
