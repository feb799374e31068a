use std::env;
use std::process;

mod app;
mod cli;
mod logging;
mod output;

// Usage: recount [OPTIONS] <PATTERN> [INPUT]
fn main() {
    let cfg = match cli::parse_args(env::args().collect()) {
        Ok(cfg) => cfg,
        Err(err) => err.exit(),
    };
    logging::init(cfg.verbosity);

    let code = match app::run(cfg) {
        Ok(code) => code,
        Err(err) => {
            log::error!("{err:#}");
            2
        }
    };
    process::exit(code);
}
