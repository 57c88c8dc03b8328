use crate::{mail::Mailer, posts::Post, subscribers::Subscriber, Connection, Error, Result, CONFIG};

/// The outcome of a dispatch: how many messages went out, and which
/// addresses failed with what reason.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: Vec<(String, String)>,
}

pub struct Newsletter {
    pub subject: String,
    pub message: String,
    pub posts: Vec<Post>,
}

impl Newsletter {
    /// Resolves who the newsletter goes to. Broadcasts go to the whole
    /// subscriber list; a target address short-circuits the lookup.
    pub fn recipients(
        conn: &Connection,
        send_to_all: bool,
        target: Option<&str>,
    ) -> Result<Vec<String>> {
        match target {
            Some(email) if !send_to_all => Ok(vec![email.to_owned()]),
            _ => Ok(Subscriber::list(conn)?
                .into_iter()
                .map(|sub| sub.email)
                .collect()),
        }
    }

    /// Sends the newsletter to every recipient, one at a time, so that
    /// a bad address never stops the rest of the batch. At least one
    /// message has to make it out for the dispatch to count as a
    /// success.
    pub fn dispatch(&self, mailer: &mut dyn Mailer, recipients: &[String]) -> Result<DeliveryReport> {
        if recipients.is_empty() {
            return Err(Error::NoRecipients);
        }
        let mut report = DeliveryReport::default();
        for to in recipients {
            match mailer.send(to, &self.subject, &self.html_body(to), &self.text_body(to)) {
                Ok(()) => report.sent += 1,
                Err(reason) => report.failed.push((to.clone(), reason)),
            }
        }
        if report.sent == 0 {
            return Err(Error::DeliveryFailed(report));
        }
        Ok(report)
    }

    pub fn text_body(&self, recipient: &str) -> String {
        let mut body = format!("{}\n\n{}\n", CONFIG.blog_name, self.message);
        if !self.posts.is_empty() {
            body.push_str("\nLatest posts:\n");
            for post in &self.posts {
                body.push_str(&format!("- {}: {}\n", post.title, post.url()));
            }
        }
        body.push_str(&format!(
            "\nYou receive this email because {} is subscribed to {}. Unsubscribe: {}/unsubscribe\n",
            recipient, CONFIG.blog_name, CONFIG.base_url
        ));
        body
    }

    pub fn html_body(&self, recipient: &str) -> String {
        let mut body = format!(
            "<h1>{}</h1>\n<p>{}</p>\n",
            CONFIG.blog_name, self.message
        );
        if !self.posts.is_empty() {
            body.push_str("<h2>Latest posts</h2>\n<ul>\n");
            for post in &self.posts {
                body.push_str(&format!(
                    "<li><a href=\"{}\">{}</a></li>\n",
                    post.url(),
                    post.title
                ));
            }
            body.push_str("</ul>\n");
        }
        body.push_str(&format!(
            "<p><small>You receive this email because {} is subscribed to {}. <a href=\"{}/unsubscribe\">Unsubscribe</a></small></p>\n",
            recipient, CONFIG.blog_name, CONFIG.base_url
        ));
        body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{subscribers::tests::fill_database, tests::db};
    use diesel::Connection as _;

    struct MockMailer {
        sent: Vec<String>,
        fail_for: Vec<String>,
    }

    impl MockMailer {
        fn new(fail_for: &[&str]) -> Self {
            MockMailer {
                sent: vec![],
                fail_for: fail_for.iter().map(|s| (*s).to_owned()).collect(),
            }
        }
    }

    impl Mailer for MockMailer {
        fn send(
            &mut self,
            to: &str,
            _subject: &str,
            _html: &str,
            _text: &str,
        ) -> std::result::Result<(), String> {
            if self.fail_for.iter().any(|f| f == to) {
                return Err("connection refused".to_owned());
            }
            self.sent.push(to.to_owned());
            Ok(())
        }
    }

    fn newsletter() -> Newsletter {
        Newsletter {
            subject: "News of the week".to_owned(),
            message: "Here is what happened.".to_owned(),
            posts: vec![],
        }
    }

    #[test]
    fn recipients_resolution() {
        let conn = db();
        conn.test_transaction::<_, (), _>(|| {
            fill_database(&conn);

            // a broadcast reaches the whole list, opted-out included
            let all = Newsletter::recipients(&conn, true, None).unwrap();
            assert_eq!(all.len(), 3);

            let one =
                Newsletter::recipients(&conn, false, Some("someone@example.com")).unwrap();
            assert_eq!(one, vec!["someone@example.com".to_owned()]);

            // no target and no broadcast still means everyone
            let fallback = Newsletter::recipients(&conn, false, None).unwrap();
            assert_eq!(fallback.len(), 3);
            Ok(())
        });
    }

    #[test]
    fn one_bad_address_does_not_stop_the_batch() {
        let mut mailer = MockMailer::new(&["grace@example.com"]);
        let recipients = vec![
            "ada@example.com".to_owned(),
            "grace@example.com".to_owned(),
            "linus@example.com".to_owned(),
        ];
        let report = newsletter().dispatch(&mut mailer, &recipients).unwrap();
        assert_eq!(report.sent, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "grace@example.com");
        assert_eq!(mailer.sent.len(), 2);
    }

    #[test]
    fn empty_recipient_list_is_an_error() {
        let mut mailer = MockMailer::new(&[]);
        match newsletter().dispatch(&mut mailer, &[]) {
            Err(Error::NoRecipients) => (),
            other => panic!("unexpected result: {:?}", other.map(|r| r.sent)),
        }
        assert!(mailer.sent.is_empty());
    }

    #[test]
    fn total_failure_is_an_error() {
        let mut mailer = MockMailer::new(&["ada@example.com", "grace@example.com"]);
        let recipients = vec!["ada@example.com".to_owned(), "grace@example.com".to_owned()];
        match newsletter().dispatch(&mut mailer, &recipients) {
            Err(Error::DeliveryFailed(report)) => {
                assert_eq!(report.sent, 0);
                assert_eq!(report.failed.len(), 2);
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.sent)),
        }
    }

    #[test]
    fn bodies_are_personalized() {
        let news = newsletter();
        let text = news.text_body("ada@example.com");
        assert!(text.contains("ada@example.com"));
        assert!(text.contains(&CONFIG.blog_name));
        assert!(text.contains("Here is what happened."));

        let html = news.html_body("ada@example.com");
        assert!(html.contains("ada@example.com"));
        assert!(html.contains("Unsubscribe"));
    }
}
