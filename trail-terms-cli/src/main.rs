//! Command-line driver for the trail-terms query core.
//!
//! Builds generated terms on a fresh [`Query`] and runs unification,
//! standard-order comparison and cycle detection over them, printing what
//! each walk reports.  Useful for checking how the depth bound behaves on
//! deep and cyclic input.
//!
//! [`Query`]: trail_terms::Query

use clap::{Parser as ClapParser, Subcommand};
use std::mem;
use trail_terms::{
    Cell, CellRef, Comparison, Query, QueryConfig, QueryError, Slot, TermRef, TrailEntry,
    MAX_DEPTH,
};

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Command
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Unifies and compares two copies of a deeply nested term
    Stress {
        /// Nesting depth of the generated terms
        #[arg(short, long, default_value_t = 10_000)]
        depth: u32,
        /// Recursion bound of the query
        #[arg(short, long, default_value_t = MAX_DEPTH)]
        max_depth: usize,
    },
    /// Builds a cyclic list and scans it
    Cycle {
        /// Number of elements in the cycle
        #[arg(short, long, default_value_t = 5)]
        length: u32,
        /// Elements to skip before stopping; unbounded when omitted
        #[arg(short, long)]
        max: Option<usize>,
    },
    /// Prints sizes
    Sizes {},
}

/// Builds `f(f(...f(Leaf)...))` nested `depth` times.
fn nested(q: &mut Query, depth: u32, leaf: TermRef) -> Result<TermRef, QueryError> {
    let mut b = q.heap_mut().builder();
    for _ in 0..depth {
        b.open("f", 1);
    }
    b.term(leaf.cell);
    let t = b.finish()?;
    Ok(q.at(t))
}

fn stress(depth: u32, max_depth: usize) -> Result<(), QueryError> {
    let mut q = Query::with_config(QueryConfig {
        max_depth,
        ..QueryConfig::default()
    });
    let x = q.fresh_var();
    let a = q.heap_mut().atom("a");
    let a = q.at(a);
    let lhs = nested(&mut q, depth, x)?;
    let rhs = nested(&mut q, depth, a)?;
    log::info!("built two terms of depth {depth}");

    let cp = q.choice_point();
    let unified = q.unify(lhs, rhs);
    println!(
        "unify: {unified}, cycle_error: {}, X = {}",
        q.cycle_error(),
        q.display(x).max_depth(8)
    );
    q.backtrack(&cp)?;

    let order = q.compare(lhs, rhs);
    println!("compare: {order:?}, cycle_error: {}", q.cycle_error());
    if order == Comparison::Undecidable {
        println!("order undecided within depth {max_depth}");
    }

    let cyclic = q.check_cyclic(lhs);
    println!("cyclic: {cyclic:?}");
    Ok(())
}

fn cycle(length: u32, max: Option<usize>) -> Result<(), QueryError> {
    let mut q = Query::new();
    let x = q.fresh_var();
    let items: Vec<CellRef> = (1..=length).map(|i| q.heap_mut().int(i)).collect();
    let ring = q.heap_mut().list_with_tail(&items, x.cell);
    let ring = q.at(ring);
    if !q.unify(x, ring) {
        println!("could not close the cycle");
        return Ok(());
    }

    let scan = q.detect_cycle(x, max);
    println!("count: {}", scan.count);
    match scan.cycle {
        Some(c) => println!("cycle: start {}, length {}", c.start, c.length),
        None => println!("cycle: none"),
    }
    println!("stop: {}", q.display(scan.stop).max_depth(12));
    println!("term: {}", q.display(x).max_depth(12));
    Ok(())
}

fn main() -> Result<(), QueryError> {
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Stress { depth, max_depth } => stress(depth, max_depth)?,
        Commands::Cycle { length, max } => cycle(length, max)?,
        Commands::Sizes {} => {
            println!("Size of Cell: {}", mem::size_of::<Cell>());
            println!("Size of Option<Cell>: {}", mem::size_of::<Option<Cell>>());
            println!("Size of TermRef: {}", mem::size_of::<TermRef>());
            println!("Size of Slot: {}", mem::size_of::<Slot>());
            println!("Size of TrailEntry: {}", mem::size_of::<TrailEntry>());
        }
    }

    Ok(())
}
