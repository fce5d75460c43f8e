use des_wifi::{logger, sim::Scenario};
use std::process::ExitCode;
use tracing::{error, info};

fn main() -> ExitCode {
    logger::init();

    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: des-wifi <scenario.yml>");
        return ExitCode::FAILURE;
    };

    let scenario = match Scenario::load(&path) {
        Ok(scenario) => scenario,
        Err(e) => {
            error!("invalid scenario {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    let rt = match scenario.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!("failed to build scenario {path}: {e}");
            return ExitCode::FAILURE;
        }
    };

    match rt.run() {
        Ok((sim, time, profiler)) => {
            info!(
                "finished at {time} after {} events ({:?} wall time)",
                profiler.event_count, profiler.duration
            );
            print!("{}", sim.metrics.report());
            for node in sim.nodes() {
                let stats = sim.energy().stats(node.address());
                println!(
                    "node {}: tx {:?} ({} frames), rx {:?} ({} frames, {} failed), cw {}",
                    node.address(),
                    stats.tx_time,
                    stats.tx_frames,
                    stats.rx_time,
                    stats.rx_frames,
                    stats.rx_failures,
                    node.dcf().cw()
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
