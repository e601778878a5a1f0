mod bootstrap;
mod factories;
mod loop_runner;
mod shell;
mod tour;

pub(crate) use bootstrap::build_app;
pub(crate) use loop_runner::run;
