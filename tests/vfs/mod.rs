mod indexing;
mod plan_checks;
mod quarantine;
