use anyhow::Context;
use arcflow::boundary::Session;
use arcflow::graph::{ArcMap, DigraphStore, ValueKind};
use arcflow::{FlowComputation, ParallelConfig};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Arcflow v{}", arcflow::version());
    println!("==========================================");
    println!();

    // Demo 1: Failure scenarios on a small backbone
    demo_scenarios().context("scenario demo")?;

    // Demo 2: Handle-based session
    demo_session().context("session demo")?;

    Ok(())
}

fn demo_scenarios() -> Result<(), arcflow::FlowError> {
    println!("=== Demo 1: Failure Scenarios ===");
    let mut graph = DigraphStore::new();

    // s -> {a, b} -> t, plus a cross link a -> b
    let s = graph.add_node();
    let a = graph.add_node();
    let b = graph.add_node();
    let t = graph.add_node();
    let sa = graph.add_arc(s, a);
    let sb = graph.add_arc(s, b);
    let ab = graph.add_arc(a, b);
    let at = graph.add_arc(a, t);
    let bt = graph.add_arc(b, t);

    let mut capacities: ArcMap<u32> = ArcMap::new(&graph);
    for (arc, cap) in [(sa, 100), (sb, 50), (ab, 50), (at, 50), (bt, 100)] {
        capacities.set(arc, cap);
    }
    println!("✓ Built network: {} nodes, {} arcs", graph.node_count(), graph.arc_count());

    let mut flow = FlowComputation::new(&graph, &capacities, s, t)?;
    println!("  Baseline max flow: {}", flow.baseline()?);
    println!("  Without s->a:      {}", flow.run_scenario(&[sa])?);
    println!("  Without a->b, b->t: {}", flow.run_scenario(&[ab, bt])?);
    println!("  Baseline again:    {}", flow.baseline()?);

    println!("\nMost critical arcs:");
    for impact in flow.single_arc_sweep()?.iter().take(3) {
        println!("  {} → flow {} (loss {})", impact.arc, impact.value, impact.loss);
    }

    let scenarios = vec![vec![sa], vec![sb], vec![at], vec![bt], vec![sa, bt]];
    let values = arcflow::evaluate_scenarios_parallel(&flow, &scenarios, &ParallelConfig::default())?;
    println!("\nParallel batch: {:?}", values);
    Ok(())
}

fn demo_session() -> Result<(), arcflow::ApiError> {
    println!("\n=== Demo 2: Handle-based Session ===");
    let mut session = Session::new();
    let g = session.graph_create();
    let a = session.node_add(g)?;
    let b = session.node_add(g)?;
    let four = session.arc_add(g, a, b)?;
    let six = session.arc_add(g, a, b)?;

    let caps = session.map_create(g, ValueKind::Int32)?;
    session.map_set_int(caps, four, 4)?;
    session.map_set_int(caps, six, 6)?;

    let flow = session.flow_create(g, caps, a, b)?;
    println!("✓ Parallel arcs, baseline: {}", session.flow_run(flow, &[])?);
    println!("✓ Capacity-6 arc disabled: {}", session.flow_run(flow, &[six])?);
    println!("  compare(4.0) = {}", session.flow_compare(flow, 4.0)?);

    session.flow_destroy(flow)?;
    session.map_destroy(caps)?;
    for arc in [four, six] {
        session.arc_destroy(arc)?;
    }
    for node in [a, b] {
        session.node_destroy(node)?;
    }
    session.graph_destroy(g)?;
    println!("✓ All handles released ({} live)", session.live_handles());
    Ok(())
}
