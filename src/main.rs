use clap::App;
use diesel::Connection;
use quill_models::{Connection as Conn, CONFIG};
use std::io::{self, prelude::*};

mod dashboard;
mod migration;
mod newsletter;
mod posts;
mod users;

fn main() {
    tracing_subscriber::fmt().init();

    let mut app = App::new("Quill CLI")
        .bin_name("quill")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Collection of tools to manage your Quill blog.")
        .subcommand(dashboard::command())
        .subcommand(migration::command())
        .subcommand(newsletter::command())
        .subcommand(posts::command())
        .subcommand(users::command());
    let matches = app.clone().get_matches();

    match dotenv::dotenv() {
        Ok(path) => println!("Configuration read from {}", path.display()),
        Err(ref e) if e.not_found() => eprintln!("no .env was found"),
        e => e.map(|_| ()).unwrap(),
    }
    let conn = Conn::establish(CONFIG.database_url.as_str());

    match matches.subcommand() {
        ("dashboard", Some(args)) => {
            dashboard::run(args, &conn.expect("Couldn't connect to the database."))
        }
        ("migration", Some(args)) => {
            migration::run(args, &conn.expect("Couldn't connect to the database."))
        }
        ("newsletter", Some(args)) => {
            newsletter::run(args, &conn.expect("Couldn't connect to the database."))
        }
        ("posts", Some(args)) => {
            posts::run(args, &conn.expect("Couldn't connect to the database."))
        }
        ("users", Some(args)) => {
            users::run(args, &conn.expect("Couldn't connect to the database."))
        }
        _ => app.print_help().expect("Couldn't print help"),
    };
}

pub fn ask_for(something: &str) -> String {
    print!("{}: ", something);
    io::stdout().flush().expect("Couldn't flush STDOUT");
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .expect("Unable to read line");
    input.retain(|c| c != '\n');
    input
}
