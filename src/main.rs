//! Break Sim demo
//!
//! Racks nine balls, breaks, runs the event simulation to rest and logs a summary.
//! Usage: `break-sim [seed]`

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use std::collections::BTreeMap;

    use break_sim::config::{ResolverConfig, SimConfig};
    use break_sim::sim::rack::nine_ball_break;
    use break_sim::sim::{EventClass, MotionPhase, simulate};

    env_logger::init();

    let seed = std::env::args().nth(1).and_then(|s| s.parse::<u64>().ok()).unwrap_or(42);
    log::info!("Break Sim starting (seed {})", seed);

    let resolver = match ResolverConfig::default().build() {
        Ok(resolver) => resolver,
        Err(e) => {
            log::error!("Bad resolver configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match simulate(nine_ball_break(seed), &SimConfig::default(), &resolver) {
        Ok(result) => result,
        Err(e) => {
            log::error!("Simulation rejected: {}", e);
            std::process::exit(1);
        }
    };

    let mut per_class: BTreeMap<EventClass, usize> = BTreeMap::new();
    for entry in result.history() {
        *per_class.entry(entry.event.class()).or_default() += 1;
    }

    println!("\nBreak finished at t = {:.3} s ({} events)", result.system.t, result.events);
    if !result.complete {
        println!("  stopped at the event cap before the balls came to rest");
    }
    for (class, count) in &per_class {
        if *class != EventClass::Null {
            println!("  {:<24} {}", class.as_str(), count);
        }
    }

    let pocketed: Vec<u32> = result
        .system
        .balls
        .iter()
        .filter(|b| b.phase() == MotionPhase::Pocketed)
        .map(|b| b.id)
        .collect();
    if pocketed.is_empty() {
        println!("  nothing pocketed");
    } else {
        println!("  pocketed: {:?}", pocketed);
    }
    if pocketed.contains(&0) {
        println!("  scratch!");
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The simulation core runs anywhere; the demo binary is native only
}
