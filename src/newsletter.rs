use clap::{App, Arg, ArgMatches, SubCommand};
use quill_models::{
    mail::{DebugMailer, SmtpMailer},
    newsletter::Newsletter,
    posts::Post,
    Connection, Error,
};

pub fn command<'a, 'b>() -> App<'a, 'b> {
    SubCommand::with_name("newsletter")
        .about("Send the newsletter")
        .subcommand(
            SubCommand::with_name("send")
                .arg(
                    Arg::with_name("subject")
                        .short("s")
                        .long("subject")
                        .takes_value(true)
                        .help("The subject line"),
                )
                .arg(
                    Arg::with_name("message")
                        .short("m")
                        .long("message")
                        .takes_value(true)
                        .help("The body of the newsletter"),
                )
                .arg(
                    Arg::with_name("to")
                        .short("t")
                        .long("to")
                        .takes_value(true)
                        .help("Send to a single address instead of the whole list"),
                )
                .arg(
                    Arg::with_name("debug")
                        .short("d")
                        .long("debug")
                        .help("Log the emails instead of sending them"),
                )
                .about("Send a newsletter to the subscribers"),
        )
}

pub fn run<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    match args.subcommand() {
        ("send", Some(x)) => send(x, conn),
        ("", None) => command().print_help().unwrap(),
        _ => println!("Unknown subcommand"),
    }
}

fn send<'a>(args: &ArgMatches<'a>, conn: &Connection) {
    let subject = args
        .value_of("subject")
        .map(String::from)
        .unwrap_or_else(|| super::ask_for("Subject"));
    let message = args
        .value_of("message")
        .map(String::from)
        .unwrap_or_else(|| super::ask_for("Message"));
    let target = args.value_of("to");

    let newsletter = Newsletter {
        subject,
        message,
        posts: Post::recents(conn, 5).expect("Couldn't load recent posts"),
    };
    let recipients = Newsletter::recipients(conn, target.is_none(), target)
        .expect("Couldn't resolve the recipients");

    let result = if args.is_present("debug") {
        newsletter.dispatch(&mut DebugMailer, &recipients)
    } else {
        let mut mailer = SmtpMailer::init().expect("Mail is not configured, set the MAIL_* variables");
        newsletter.dispatch(&mut mailer, &recipients)
    };

    match result {
        Ok(report) => {
            println!("Sent {} emails", report.sent);
            for (email, reason) in report.failed {
                eprintln!("Couldn't send to {}: {}", email, reason);
            }
        }
        Err(Error::NoRecipients) => eprintln!("Nobody to send to"),
        Err(Error::DeliveryFailed(report)) => {
            eprintln!("No email could be delivered:");
            for (email, reason) in report.failed {
                eprintln!("  {}: {}", email, reason);
            }
        }
        Err(err) => eprintln!("Couldn't send the newsletter: {:?}", err),
    }
}
