use clap::{App, Arg, ArgMatches, SubCommand};
use quill_models::{users::*, Connection};
use std::io::{self, Write};

pub fn command<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("users")
        .about("Manage users")
        .subcommand(
            SubCommand::with_name("new")
                .arg(
                    Arg::with_name("name")
                        .short("n")
                        .long("name")
                        .alias("username")
                        .takes_value(true)
                        .help("The username of the new user"),
                )
                .arg(
                    Arg::with_name("email")
                        .short("e")
                        .long("email")
                        .takes_value(true)
                        .help("Email address of the new user"),
                )
                .arg(
                    Arg::with_name("biography")
                        .short("b")
                        .long("bio")
                        .alias("biography")
                        .takes_value(true)
                        .help("The biography of the new user"),
                )
                .arg(
                    Arg::with_name("password")
                        .short("p")
                        .long("password")
                        .takes_value(true)
                        .help("The password of the new user"),
                )
                .arg(
                    Arg::with_name("admin")
                        .short("a")
                        .long("admin")
                        .help("Makes the user an administrator of the blog"),
                )
                .arg(
                    Arg::with_name("moderator")
                        .short("m")
                        .long("moderator")
                        .help("Makes the user a moderator of the blog"),
                )
                .about("Create a new user"),
        )
        .subcommand(
            SubCommand::with_name("reset-password")
                .arg(
                    Arg::with_name("name")
                        .short("n")
                        .long("name")
                        .takes_value(true)
                        .help("The username of the user"),
                )
                .about("Set a new password for a user"),
        )
        .subcommand(SubCommand::with_name("list").about("List the most recent accounts"))
}

pub fn run<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    match args.subcommand() {
        ("new", Some(x)) => new(x, conn),
        ("reset-password", Some(x)) => reset_password(x, conn),
        ("list", Some(_)) => list(conn),
        ("", None) => command().print_help().unwrap(),
        _ => println!("Unknown subcommand"),
    }
}

fn new<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    let username = args
        .value_of("name")
        .map(String::from)
        .unwrap_or_else(|| super::ask_for("Username"));
    let email = args
        .value_of("email")
        .map(String::from)
        .unwrap_or_else(|| super::ask_for("Email address"));
    let bio = args.value_of("biography").unwrap_or("").to_string();
    let role = if args.is_present("admin") {
        Role::Admin
    } else if args.is_present("moderator") {
        Role::Moderator
    } else {
        Role::Normal
    };
    let password = args.value_of("password").map(String::from).unwrap_or_else(|| {
        print!("Password: ");
        io::stdout().flush().expect("Couldn't flush STDOUT");
        rpassword::read_password().expect("Couldn't read your password.")
    });

    let user = NewUser::new_local(conn, username, email, role, &bio, &password)
        .expect("Couldn't create the user");
    println!("Created user {} (#{})", user.username, user.id);
}

fn reset_password<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    let username = args
        .value_of("name")
        .map(String::from)
        .unwrap_or_else(|| super::ask_for("Username"));
    let user = User::find_by_username(conn, &username).expect("No such user");

    print!("New password: ");
    io::stdout().flush().expect("Couldn't flush STDOUT");
    let password = rpassword::read_password().expect("Couldn't read your password.");
    user.reset_password(conn, &password)
        .expect("Couldn't change the password");
    println!("Password updated for {}", user.username);
}

fn list(conn: &Connection) {
    let users = User::page(conn, (0, 20)).expect("Couldn't list users");
    for user in users {
        let role = if user.is_admin() {
            "admin"
        } else if user.is_moderator() {
            "moderator"
        } else {
            "user"
        };
        println!("#{}\t{}\t{}\t{}", user.id, user.username, user.email, role);
    }
}
