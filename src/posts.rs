use clap::{App, Arg, ArgMatches, SubCommand};
use quill_models::{posts::Post, Connection, ITEMS_PER_PAGE};

pub fn command<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("posts")
        .about("Manage posts")
        .subcommand(
            SubCommand::with_name("publish")
                .arg(
                    Arg::with_name("slug")
                        .short("s")
                        .long("slug")
                        .takes_value(true)
                        .help("The slug of the post to publish"),
                )
                .about("Publish a draft"),
        )
        .subcommand(SubCommand::with_name("list").about("List the most recent posts"))
}

pub fn run<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    match args.subcommand() {
        ("publish", Some(x)) => publish(x, conn),
        ("list", Some(_)) => list(conn),
        ("", None) => command().print_help().unwrap(),
        _ => println!("Unknown subcommand"),
    }
}

fn publish<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    let slug = args
        .value_of("slug")
        .map(String::from)
        .unwrap_or_else(|| super::ask_for("Slug"));
    let post = Post::find_by_slug(conn, &slug).expect("No such post");
    let post = post.publish(conn).expect("Couldn't publish the post");
    println!(
        "Published \"{}\" at {}",
        post.title,
        post.published_at
            .map(|date| date.to_string())
            .unwrap_or_default()
    );
}

fn list(conn: &Connection) {
    let posts = Post::admin_page(conn, (0, ITEMS_PER_PAGE)).expect("Couldn't list posts");
    for post in posts {
        println!(
            "#{}\t{}\t{}\t{} views",
            post.id, post.slug, post.status, post.views
        );
    }
}
