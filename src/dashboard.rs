use clap::{App, ArgMatches, SubCommand};
use quill_models::{analytics::{Analytics, DashboardStats}, Connection};

pub fn command<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("dashboard")
        .about("Blog statistics")
        .subcommand(SubCommand::with_name("stats").about("Print the dashboard numbers"))
        .subcommand(SubCommand::with_name("snapshot").about("Record today's analytics snapshot"))
}

pub fn run<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    match args.subcommand() {
        ("stats", Some(_)) => stats(conn),
        ("snapshot", Some(_)) => snapshot(conn),
        ("", None) => command().print_help().unwrap(),
        _ => println!("Unknown subcommand"),
    }
}

fn stats(conn: &Connection) {
    let stats = DashboardStats::compute(conn).expect("Couldn't compute the statistics");
    println!(
        "{}",
        serde_json::to_string_pretty(&stats).expect("Couldn't serialize the statistics")
    );
}

fn snapshot(conn: &Connection) {
    let snap = Analytics::record_today(conn).expect("Couldn't record the snapshot");
    println!(
        "Recorded {}: {} posts, {} comments, {} views, {} new subscribers",
        snap.date, snap.posts_count, snap.comments_count, snap.views_count, snap.new_subscribers
    );
}
