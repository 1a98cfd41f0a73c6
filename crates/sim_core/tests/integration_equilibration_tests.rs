mod support;

use sim_core::equilibration::EquilibrationConfig;
use sim_core::pricing::PricingConfig;
use sim_core::runner::{run_until_done_with_hook, simulation_schedule};
use sim_core::summary::summarize;
use sim_core::telemetry::History;
use support::world::TestWorldBuilder;

/// Driver price 1 and reservation wage 0.5 put the equilibrium at a busy
/// fraction `b` of one half, so the fleet settles where `n·b = λ·E[ride]`.
/// Uniform trips on a 10×10 torus average 5 blocks (2.5 per axis); a ride
/// takes its distance plus at most one U-turn block, so with `λ = 2` the
/// break-even fleet lies between 2·5/0.5 = 20 and 2·6/0.5 = 24.
#[test]
fn supply_equilibration_converges_to_break_even_fleet() {
    const DEMAND: f64 = 2.0;
    const MEAN_TRIP_DISTANCE: f64 = 5.0;
    let pricing = PricingConfig {
        price: 1.0,
        platform_commission: 0.0,
        reservation_wage: 0.5,
        ..PricingConfig::default()
    };
    let mut world = TestWorldBuilder::new()
        .with_city_size(10)
        .with_fleet(10)
        .with_demand(DEMAND)
        .with_pricing(pricing)
        .with_equilibration(EquilibrationConfig::supply(10))
        .with_windows(20, 1_000)
        .with_time_blocks(3_000)
        .with_seed(17)
        .build();
    let mut schedule = simulation_schedule();

    let mut late_fleet = Vec::new();
    run_until_done_with_hook(&mut world, &mut schedule, 10_000, |world, block| {
        if block >= 2_000 {
            let stats = world.resource::<History>().latest().copied().expect("recorded block");
            late_fleet.push(stats.vehicles as f64);
        }
    });

    let break_even = 0.5;
    assert_eq!(pricing.break_even_busy_fraction(), Some(break_even));
    let lowest = DEMAND * MEAN_TRIP_DISTANCE / break_even;
    let highest = DEMAND * (MEAN_TRIP_DISTANCE + 1.0) / break_even;
    assert_eq!((lowest, highest), (20.0, 24.0));

    let summary = summarize(&mut world);
    let results = summary.results;
    assert!(
        (MEAN_TRIP_DISTANCE - 0.1..=MEAN_TRIP_DISTANCE + 1.1).contains(&results.mean_ride_time),
        "mean ride {}",
        results.mean_ride_time
    );
    assert!(
        (results.occupied_fraction - break_even).abs() < 0.08,
        "busy fraction {} vs {break_even}",
        results.occupied_fraction
    );
    assert!(
        (0.85 * lowest..=1.15 * highest).contains(&results.mean_vehicle_count),
        "mean fleet {} vs equilibrium [{lowest}, {highest}]",
        results.mean_vehicle_count
    );
    assert!(summary.driver_utility.abs() < 0.08);

    let (low, high) = (0.6 * lowest, 1.4 * highest);
    assert!(late_fleet.iter().all(|&fleet| (low..=high).contains(&fleet)), "fleet left [{low}, {high}]");
}
